//! TOML session configuration for the headless driver.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use skirmish_core::{
    IVec2, Vec2, DEFAULT_CELL_SIZE, DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH,
};
use skirmish_system_bootstrap::SimulationConfig;
use skirmish_system_movement::{CollisionTest, MovementConfig};
use skirmish_system_pathfinding::PathfinderConfig;
use skirmish_system_spawning::{self as spawning, DEFAULT_MAX_ATTEMPTS, DEFAULT_MONSTER_COUNT};

/// Complete description of a scripted session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    pub(crate) world: WorldSection,
    /// Collision map, relative to the configuration file when not absolute.
    pub(crate) collision_map: Option<PathBuf>,
    pub(crate) seed: u64,
    pub(crate) monsters: u32,
    pub(crate) max_attempts: u32,
    pub(crate) ticks: u32,
    pub(crate) pathfinding: PathfindingSection,
    pub(crate) movement: MovementSection,
    pub(crate) orders: Vec<Order>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            world: WorldSection::default(),
            collision_map: None,
            seed: 0,
            monsters: DEFAULT_MONSTER_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            ticks: 400,
            pathfinding: PathfindingSection::default(),
            movement: MovementSection::default(),
            orders: Vec::new(),
        }
    }
}

impl CliConfig {
    /// Reads and validates a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        let mut config = Self::parse(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        if let (Some(map), Some(base)) = (config.collision_map.as_mut(), path.parent()) {
            if map.is_relative() {
                *map = base.join(&*map);
            }
        }
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse session configuration toml")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let world = &self.world;
        ensure!(world.cell_size > 0, "cell_size must be positive");
        ensure!(
            world.width >= world.cell_size && world.height >= world.cell_size,
            "world of {}x{} cannot hold a single {} unit cell",
            world.width,
            world.height,
            world.cell_size
        );
        ensure!(self.max_attempts > 0, "max_attempts must be positive");
        ensure!(
            self.movement.avoidance_increment_degrees > 0.0,
            "avoidance_increment_degrees must be positive"
        );
        Ok(())
    }

    /// Translates the file layout into the simulation's typed configuration.
    pub(crate) fn simulation(&self) -> SimulationConfig {
        let movement = &self.movement;
        SimulationConfig::new(
            self.world.width,
            self.world.height,
            self.world.cell_size,
            Duration::from_millis(self.world.move_interval_ms),
            PathfinderConfig::new(self.pathfinding.occupancy_blocks_search),
            MovementConfig::new(
                movement.collision_test.into(),
                movement.group_halting,
                movement.avoidance_steps,
                movement.avoidance_increment_degrees,
            ),
            spawning::Config::new(self.seed, self.monsters, self.max_attempts),
        )
    }

    /// Orders scheduled for `tick`, in file order.
    pub(crate) fn orders_at(&self, tick: u32) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(move |order| order.tick() == tick)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldSection {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) cell_size: u32,
    pub(crate) move_interval_ms: u64,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            width: DEFAULT_WORLD_WIDTH,
            height: DEFAULT_WORLD_HEIGHT,
            cell_size: DEFAULT_CELL_SIZE,
            move_interval_ms: 25,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PathfindingSection {
    pub(crate) occupancy_blocks_search: bool,
}

impl Default for PathfindingSection {
    fn default() -> Self {
        Self {
            occupancy_blocks_search: PathfinderConfig::default().occupancy_blocks_search(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MovementSection {
    pub(crate) collision_test: CollisionTestSetting,
    pub(crate) group_halting: bool,
    pub(crate) avoidance_steps: u16,
    pub(crate) avoidance_increment_degrees: f32,
}

impl Default for MovementSection {
    fn default() -> Self {
        Self {
            collision_test: CollisionTestSetting::Swept,
            group_halting: true,
            avoidance_steps: 180,
            avoidance_increment_degrees: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum CollisionTestSetting {
    Swept,
    Static,
}

impl From<CollisionTestSetting> for CollisionTest {
    fn from(setting: CollisionTestSetting) -> Self {
        match setting {
            CollisionTestSetting::Swept => CollisionTest::Swept,
            CollisionTestSetting::Static => CollisionTest::Static,
        }
    }
}

/// Scripted player action fired before the named tick.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Order {
    /// Drags a selection rectangle between two corners.
    Select {
        tick: u32,
        first: [i32; 2],
        second: [i32; 2],
    },
    /// Clicks a destination for the current selection.
    Designate { tick: u32, target: [i32; 2] },
    /// Presses the clear-selection key.
    ClearSelection { tick: u32 },
    /// Sends the player toward a point.
    MovePlayer { tick: u32, target: [i32; 2] },
    /// Fires a missile from `origin` along `heading`.
    Launch {
        tick: u32,
        origin: [i32; 2],
        heading: [f32; 2],
    },
}

impl Order {
    pub(crate) const fn tick(&self) -> u32 {
        match self {
            Self::Select { tick, .. }
            | Self::Designate { tick, .. }
            | Self::ClearSelection { tick }
            | Self::MovePlayer { tick, .. }
            | Self::Launch { tick, .. } => *tick,
        }
    }
}

pub(crate) fn point([x, y]: [i32; 2]) -> IVec2 {
    IVec2::new(x, y)
}

pub(crate) fn heading([x, y]: [f32; 2]) -> Vec2 {
    Vec2::new(x, y)
}
