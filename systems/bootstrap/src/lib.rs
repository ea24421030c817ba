#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bootstrap system that prepares the Skirmish world, and the simulation
//! context that owns it together with every system.

use std::{io::Read, path::Path, time::Duration};

use log::{info, warn};
use skirmish_core::{
    AgentId, AgentKind, Command, Event, IVec2, InitError, InputEvent, SpawnError, TickSource,
    Vec2, DEFAULT_CELL_SIZE, DEFAULT_MOVE_INTERVAL, DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH,
};
use skirmish_system_movement::{Movement, MovementConfig};
use skirmish_system_pathfinding::{PathfinderConfig, Pathfinding};
use skirmish_system_selection::Selection;
use skirmish_system_spawning::{self as spawning, Spawning};
use skirmish_world::{
    self as world,
    collision_map::{self, CollisionSummary},
    query, Grid, GridOverlay, World,
};

/// Every tunable needed to assemble a simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    world_width: u32,
    world_height: u32,
    cell_size: u32,
    move_interval: Duration,
    pathfinder: PathfinderConfig,
    movement: MovementConfig,
    spawning: spawning::Config,
}

impl SimulationConfig {
    /// Creates a configuration from explicit values.
    #[must_use]
    pub const fn new(
        world_width: u32,
        world_height: u32,
        cell_size: u32,
        move_interval: Duration,
        pathfinder: PathfinderConfig,
        movement: MovementConfig,
        spawning: spawning::Config,
    ) -> Self {
        Self {
            world_width,
            world_height,
            cell_size,
            move_interval,
            pathfinder,
            movement,
            spawning,
        }
    }

    /// Width of the play area in world units.
    #[must_use]
    pub const fn world_width(&self) -> u32 {
        self.world_width
    }

    /// Height of the play area in world units.
    #[must_use]
    pub const fn world_height(&self) -> u32 {
        self.world_height
    }

    /// Side length of a grid cell.
    #[must_use]
    pub const fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Minimum delay between two movement updates of one agent.
    #[must_use]
    pub const fn move_interval(&self) -> Duration {
        self.move_interval
    }

    /// Pathfinder configuration.
    #[must_use]
    pub const fn pathfinder(&self) -> PathfinderConfig {
        self.pathfinder
    }

    /// Movement controller configuration.
    #[must_use]
    pub const fn movement(&self) -> MovementConfig {
        self.movement
    }

    /// Roster spawning configuration.
    #[must_use]
    pub const fn spawning(&self) -> spawning::Config {
        self.spawning
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_WORLD_WIDTH,
            DEFAULT_WORLD_HEIGHT,
            DEFAULT_CELL_SIZE,
            DEFAULT_MOVE_INTERVAL,
            PathfinderConfig::default(),
            MovementConfig::default(),
            spawning::Config::default(),
        )
    }
}

/// Prepares the grid and its terrain before a simulation starts.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Partitions the configured play area into cells, outlining each one on
    /// the overlay.
    pub fn build_grid(
        &self,
        config: &SimulationConfig,
        overlay: &mut impl GridOverlay,
    ) -> Result<Grid, InitError> {
        let grid = Grid::build(
            config.world_width,
            config.world_height,
            config.cell_size,
            overlay,
        )?;
        info!("grid of {}x{} cells ready", grid.columns(), grid.rows());
        Ok(grid)
    }

    /// Marks solid cells from a collision map.
    pub fn load_collision(
        &self,
        grid: &mut Grid,
        source: impl Read,
    ) -> Result<CollisionSummary, InitError> {
        Ok(collision_map::load(grid, source)?)
    }

    /// Marks solid cells from a collision map file.
    pub fn load_collision_file(
        &self,
        grid: &mut Grid,
        path: &Path,
    ) -> Result<CollisionSummary, InitError> {
        Ok(collision_map::load_file(grid, path)?)
    }
}

/// World plus every system, driven one tick at a time.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    pathfinding: Pathfinding,
    movement: Movement,
    selection: Selection,
    spawning: Spawning,
    events: Vec<Event>,
}

impl Simulation {
    /// Wraps a prepared grid in a simulation without any agents.
    #[must_use]
    pub fn new(config: &SimulationConfig, grid: Grid) -> Self {
        let mut simulation = Self {
            world: World::new(grid),
            pathfinding: Pathfinding::new(config.pathfinder),
            movement: Movement::new(config.movement),
            selection: Selection::new(),
            spawning: Spawning::new(config.spawning),
            events: Vec::new(),
        };
        let _ = simulation.submit(Command::ConfigureMoveInterval {
            interval: config.move_interval,
        });
        simulation
    }

    /// Read access to the world for queries and presentation.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Spawns the player and the configured monsters.
    pub fn populate(&mut self) -> Result<Vec<AgentId>, InitError> {
        let mut commands = Vec::new();
        self.spawning.populate(&self.world, &mut commands)?;

        let mut spawned = Vec::with_capacity(commands.len());
        for command in commands {
            let events = self.submit(command);
            spawned.push(spawn_outcome(&events)?);
        }
        info!("populated world with {} agents", spawned.len());
        Ok(spawned)
    }

    /// Places an agent with its draw anchor at `point`.
    pub fn spawn_agent(&mut self, kind: AgentKind, point: IVec2) -> Result<AgentId, SpawnError> {
        let events = self.submit(Command::SpawnAgent {
            kind,
            origin: point,
        });
        spawn_outcome(&events)
    }

    /// Places a missile at `point` flying along `heading`.
    pub fn launch_missile(&mut self, point: IVec2, heading: Vec2) -> Result<AgentId, SpawnError> {
        let missile = self.spawn_agent(AgentKind::Missile, point)?;
        let _ = self.submit(Command::SetHeading {
            agent: missile,
            heading,
        });
        Ok(missile)
    }

    /// Removes an agent. Returns `false` when no such agent exists.
    pub fn remove_agent(&mut self, agent: AgentId) -> bool {
        self.submit(Command::RemoveAgent { agent })
            .iter()
            .any(|event| matches!(event, Event::AgentRemoved { .. }))
    }

    /// Sends an agent toward `point`. Returns whether a path was found.
    pub fn set_goal(&mut self, agent: AgentId, point: IVec2) -> bool {
        self.submit(Command::SetGoal { agent, goal: point })
            .iter()
            .any(|event| matches!(event, Event::PathAssigned { .. }))
    }

    /// Adds the live monsters inside the rectangle to the selection.
    pub fn select_group(&mut self, first: IVec2, second: IVec2) {
        let _ = self.submit(Command::SelectGroup { first, second });
    }

    /// Empties the selection.
    pub fn clear_selection(&mut self) {
        let _ = self.submit(Command::ClearSelection);
    }

    /// Overwrites an agent's health.
    pub fn set_health(&mut self, agent: AgentId, health: i32) {
        let _ = self.submit(Command::SetHealth { agent, health });
    }

    /// Routes one input event through the selection system.
    pub fn handle_input(&mut self, input: InputEvent) {
        let mut commands = Vec::new();
        self.selection
            .handle_input(input, &self.world, &mut commands);
        for command in commands {
            let _ = self.submit(command);
        }
    }

    /// Advances the simulation to the clock's current time and moves every
    /// ready agent.
    pub fn tick(&mut self, clock: &impl TickSource) {
        let _ = self.submit(Command::Tick {
            now_ms: clock.now(),
        });
    }

    /// Takes every event produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Applies a command, then lets the pathfinder and the movement
    /// controller react to what it changed.
    fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        let mut follow_up = Vec::new();
        self.pathfinding
            .handle(&events, &self.world, &mut follow_up);
        let mut path_events = Vec::new();
        for command in follow_up {
            world::apply(&mut self.world, command, &mut path_events);
        }

        let mut movement_events = Vec::new();
        self.movement
            .handle(&events, &mut self.world, &mut movement_events);

        events.extend(path_events);
        events.extend(movement_events);
        debug_assert!(query::index_is_consistent(&self.world));
        self.events.extend(events.iter().cloned());
        events
    }
}

fn spawn_outcome(events: &[Event]) -> Result<AgentId, SpawnError> {
    for event in events {
        match event {
            Event::AgentSpawned { agent, .. } => return Ok(*agent),
            Event::SpawnRejected { reason, .. } => return Err(*reason),
            _ => {}
        }
    }
    warn!("spawn produced no outcome");
    // the arena only refuses a spawn once its identifiers run out
    Err(SpawnError::PlacementExhausted { attempts: 1 })
}
