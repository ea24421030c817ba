#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for placing the initial roster.

use log::{debug, warn};
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use skirmish_core::{AgentKind, CellCoord, Command, IVec2, SpawnError};
use skirmish_world::{query, World};

/// Fixed draw anchor of the player at the start of a session.
pub const PLAYER_ORIGIN: IVec2 = IVec2::new(100, 100);

/// Number of monsters placed when no count is configured.
pub const DEFAULT_MONSTER_COUNT: u32 = 10;

/// Random placement attempts allowed per agent before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    rng_seed: u64,
    monster_count: u32,
    max_attempts: u32,
}

impl Config {
    /// Creates a new configuration using the provided seed, roster size and
    /// retry bound.
    #[must_use]
    pub const fn new(rng_seed: u64, monster_count: u32, max_attempts: u32) -> Self {
        Self {
            rng_seed,
            monster_count,
            max_attempts,
        }
    }

    /// Seed of the placement generator.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Number of monsters placed next to the player.
    #[must_use]
    pub const fn monster_count(&self) -> u32 {
        self.monster_count
    }

    /// Random placement attempts allowed per agent.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(0, DEFAULT_MONSTER_COUNT, DEFAULT_MAX_ATTEMPTS)
    }
}

/// Pure system that deterministically emits spawn commands.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> Config {
        self.config
    }

    /// Emits spawn commands for the player and the configured monsters.
    ///
    /// Every emitted command is valid against `world` and against the
    /// commands emitted before it, so applying them in order never produces a
    /// rejection. Nothing is emitted when any placement fails.
    pub fn populate(&mut self, world: &World, out: &mut Vec<Command>) -> Result<(), SpawnError> {
        let mut reserved = Vec::new();
        let mut roster = Vec::new();

        let player = AgentKind::Player;
        if let Some(reason) = rejection(world, player, PLAYER_ORIGIN, &reserved) {
            warn!("player cannot start at {PLAYER_ORIGIN}: {reason}");
            return Err(reason);
        }
        reserve(world, player, PLAYER_ORIGIN, &mut reserved);
        roster.push(Command::SpawnAgent {
            kind: player,
            origin: PLAYER_ORIGIN,
        });

        for _ in 0..self.config.monster_count {
            let kind = self.monster_kind();
            let origin = self.place_avoiding(kind, world, &reserved)?;
            reserve(world, kind, origin, &mut reserved);
            roster.push(Command::SpawnAgent { kind, origin });
        }

        debug!("roster of {} agents placed", roster.len());
        out.extend(roster);
        Ok(())
    }

    /// Draws random draw anchors until one is valid for `kind`.
    ///
    /// Candidates never put the agent in the bottom row of cells.
    pub fn place(&mut self, kind: AgentKind, world: &World) -> Result<IVec2, SpawnError> {
        self.place_avoiding(kind, world, &[])
    }

    fn place_avoiding(
        &mut self,
        kind: AgentKind,
        world: &World,
        reserved: &[CellCoord],
    ) -> Result<IVec2, SpawnError> {
        let grid = query::grid(world);
        let width = to_coordinate(grid.columns() * grid.cell_size());
        let height = to_coordinate(grid.rows().saturating_sub(1) * grid.cell_size());
        if width > 0 && height > 0 {
            for _ in 0..self.config.max_attempts {
                let origin =
                    IVec2::new(self.rng.gen_range(0..width), self.rng.gen_range(0..height));
                if rejection(world, kind, origin, reserved).is_none() {
                    debug!("placed {kind:?} at {origin}");
                    return Ok(origin);
                }
            }
        }

        let attempts = self.config.max_attempts;
        warn!("no room for {kind:?} after {attempts} attempts");
        Err(SpawnError::PlacementExhausted { attempts })
    }

    fn monster_kind(&mut self) -> AgentKind {
        if self.rng.gen_bool(0.5) {
            AgentKind::Melee
        } else {
            AgentKind::Ranged
        }
    }
}

fn rejection(
    world: &World,
    kind: AgentKind,
    origin: IVec2,
    reserved: &[CellCoord],
) -> Option<SpawnError> {
    query::placement_error(world, kind, origin).or_else(|| {
        query::grid(world)
            .cells_covered(kind.bounds_at(origin))
            .iter()
            .any(|cell| reserved.contains(cell))
            .then_some(SpawnError::Occupied)
    })
}

fn reserve(world: &World, kind: AgentKind, origin: IVec2, reserved: &mut Vec<CellCoord>) {
    reserved.extend(query::grid(world).cells_covered(kind.bounds_at(origin)));
}

fn to_coordinate(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
