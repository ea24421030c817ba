#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the simulation systems. Adapters and systems
//! submit [`Command`] values describing desired mutations, the world executes
//! them through its `apply` entry point, and then broadcasts [`Event`] values
//! describing what actually changed.

use std::{cell::Cell, io, time::Duration};

pub use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod geometry;

pub use geometry::{rotate_degrees, swept_overlap, PixelRect};

/// Width of the default play area in world units.
pub const DEFAULT_WORLD_WIDTH: u32 = 800;

/// Height of the default play area in world units.
pub const DEFAULT_WORLD_HEIGHT: u32 = 600;

/// Side length of a square grid cell in world units.
pub const DEFAULT_CELL_SIZE: u32 = 16;

/// Minimum time that must pass between two movement updates of one agent.
pub const DEFAULT_MOVE_INTERVAL: Duration = Duration::from_millis(25);

/// Peak height of the walking bob animation.
pub const BOB_AMPLITUDE: u8 = 5;

/// Cost of an orthogonal step between neighbouring cells.
pub const ORTHOGONAL_STEP_COST: u32 = 10;

/// Cost of a diagonal step between neighbouring cells.
pub const DIAGONAL_STEP_COST: u32 = 14;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock to the provided timestamp.
    Tick {
        /// Monotonic platform time in milliseconds.
        now_ms: u64,
    },
    /// Updates the minimum delay between two movement updates of one agent.
    ConfigureMoveInterval {
        /// Minimum simulated time required between successive moves.
        interval: Duration,
    },
    /// Requests that a new agent be placed with its sprite anchored at `origin`.
    SpawnAgent {
        /// Kind of agent to create.
        kind: AgentKind,
        /// Top-left draw anchor of the new agent.
        origin: IVec2,
    },
    /// Removes an agent and every reference to it.
    RemoveAgent {
        /// Identifier of the agent to remove.
        agent: AgentId,
    },
    /// Records a new goal point for an agent.
    SetGoal {
        /// Agent receiving the goal.
        agent: AgentId,
        /// Goal expressed in world units.
        goal: IVec2,
    },
    /// Replaces an agent's path. An empty path clears it.
    AssignPath {
        /// Agent receiving the path.
        agent: AgentId,
        /// Waypoints ordered goal first, nearest cell last.
        path: Vec<CellCoord>,
    },
    /// Applies one movement update computed by the movement controller.
    MoveAgent {
        /// Agent being moved.
        agent: AgentId,
        /// Movement decision for this update.
        step: MovementStep,
    },
    /// Clears an agent's path after a failed search.
    RejectPath {
        /// Agent whose search failed.
        agent: AgentId,
        /// Reason the search failed.
        reason: PathError,
    },
    /// Points an agent along a new heading without moving it.
    SetHeading {
        /// Agent being steered.
        agent: AgentId,
        /// Desired heading; normalized by the world.
        heading: Vec2,
    },
    /// Overwrites the health of an agent.
    SetHealth {
        /// Agent whose health changes.
        agent: AgentId,
        /// New health value. Values at or below zero mark the agent dead.
        health: i32,
    },
    /// Adds every live, selectable agent inside the rectangle to the selection.
    SelectGroup {
        /// First corner of the selection rectangle in world units.
        first: IVec2,
        /// Opposite corner of the selection rectangle in world units.
        second: IVec2,
    },
    /// Untags and empties the current selection.
    ClearSelection,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Monotonic platform time in milliseconds.
        now_ms: u64,
    },
    /// Confirms that an agent was created.
    AgentSpawned {
        /// Identifier assigned to the new agent.
        agent: AgentId,
        /// Kind of the new agent.
        kind: AgentKind,
        /// Cell containing the agent's center.
        cell: CellCoord,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Kind requested for the spawn.
        kind: AgentKind,
        /// Requested draw anchor.
        origin: IVec2,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that an agent and all references to it were removed.
    AgentRemoved {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Confirms that an agent received a new goal.
    GoalAssigned {
        /// Agent that received the goal.
        agent: AgentId,
        /// Goal expressed in world units.
        goal: IVec2,
    },
    /// Confirms that an agent received a non-empty path.
    PathAssigned {
        /// Agent that received the path.
        agent: AgentId,
        /// Number of waypoints in the path.
        waypoints: usize,
    },
    /// Reports that no path could be found for an agent's goal.
    PathNotFound {
        /// Agent left without a path.
        agent: AgentId,
        /// Reason the search failed.
        reason: PathError,
    },
    /// Reports that an agent's path was cleared without being walked.
    PathCleared {
        /// Agent whose path was cleared.
        agent: AgentId,
    },
    /// Reports that an agent consumed a waypoint.
    WaypointReached {
        /// Agent that consumed the waypoint.
        agent: AgentId,
        /// Cell that was consumed.
        cell: CellCoord,
    },
    /// Reports that an agent consumed the final waypoint of its path.
    PathCompleted {
        /// Agent that finished walking its path.
        agent: AgentId,
    },
    /// Confirms that an agent changed position.
    AgentMoved {
        /// Agent that moved.
        agent: AgentId,
        /// Draw anchor before the move.
        from: IVec2,
        /// Draw anchor after the move.
        to: IVec2,
    },
    /// Reports that an agent's health dropped to zero or below.
    AgentDied {
        /// Agent that died.
        agent: AgentId,
    },
    /// Confirms that agents joined the selection.
    GroupSelected {
        /// Agents newly added to the selection, in scan order.
        agents: Vec<AgentId>,
    },
    /// Confirms that the selection was emptied.
    SelectionCleared,
}

/// Decision produced by the movement controller for a single agent update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementStep {
    /// Number of waypoints popped from the near end of the path.
    pub consumed_waypoints: usize,
    /// Whether the agent tracks the local path gradient after this update.
    pub committed: bool,
    /// Unit heading the agent travels along; zero when standing still.
    pub heading: Vec2,
    /// Distance travelled along `heading` during this update.
    pub speed: f32,
}

impl MovementStep {
    /// Step that keeps the agent in place and leaves its path untouched.
    #[must_use]
    pub const fn stationary(committed: bool) -> Self {
        Self {
            consumed_waypoints: 0,
            committed,
            heading: Vec2::ZERO,
            speed: 0.0,
        }
    }

    /// Displacement requested by the step.
    #[must_use]
    pub fn displacement(&self) -> Vec2 {
        self.heading * self.speed
    }
}

/// Unique identifier assigned to an agent. Identifiers are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Group tag shared by agents that move and get selected together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(u32);

impl GroupId {
    /// Agents that belong to no group.
    pub const UNASSIGNED: Self = Self(0);
    /// Group of player-controlled agents.
    pub const PLAYER: Self = Self(1);
    /// Group of agents currently selected for orders.
    pub const SELECTED: Self = Self(2);

    /// Creates a group identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the group.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Columns advance along the world x axis and rows along the y axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Diagonal-distance cost between two cells using the 14/10 step metric.
    ///
    /// This is the exact cost of the cheapest 8-connected walk on an open
    /// grid and doubles as the pathfinding heuristic.
    #[must_use]
    pub fn octile_distance(self, other: CellCoord) -> u32 {
        let columns = self.column.abs_diff(other.column);
        let rows = self.row.abs_diff(other.row);
        let diagonal = columns.min(rows);
        let straight = columns.max(rows) - diagonal;
        DIAGONAL_STEP_COST * diagonal + ORTHOGONAL_STEP_COST * straight
    }

    /// Reports whether the two cells touch, including diagonally.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        let columns = self.column.abs_diff(other.column);
        let rows = self.row.abs_diff(other.row);
        columns <= 1 && rows <= 1 && columns + rows > 0
    }
}

/// Closed set of agent kinds known to the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    /// The player-controlled hero.
    Player,
    /// Close-combat monster.
    Melee,
    /// Monster that attacks from a distance.
    Ranged,
    /// Projectile travelling in a straight line.
    Missile,
}

/// Static attributes shared by every agent of one kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindProfile {
    /// Offset of the collision bounds from the draw origin.
    pub bounds_offset: IVec2,
    /// Size of the collision bounds.
    pub bounds_size: IVec2,
    /// Health assigned on spawn.
    pub health: i32,
    /// Maximum distance travelled per movement update.
    pub max_speed: u8,
    /// Stamina assigned on spawn, for kinds that track it.
    pub stamina: Option<i32>,
}

/// How the movement controller drives an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MovementPolicy {
    /// Follows the path produced by the pathfinder with local avoidance.
    PathFollow,
    /// Travels along its current heading and never re-plans.
    Linear,
}

impl AgentKind {
    /// Every kind in declaration order.
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Player,
        AgentKind::Melee,
        AgentKind::Ranged,
        AgentKind::Missile,
    ];

    /// Static attributes of the kind.
    #[must_use]
    pub const fn profile(self) -> KindProfile {
        match self {
            Self::Player => KindProfile {
                bounds_offset: IVec2::new(4, 4),
                bounds_size: IVec2::new(14, 16),
                health: 100,
                max_speed: 4,
                stamina: Some(100),
            },
            Self::Melee | Self::Ranged => KindProfile {
                bounds_offset: IVec2::new(0, 4),
                bounds_size: IVec2::new(14, 16),
                health: 2,
                max_speed: 2,
                stamina: None,
            },
            Self::Missile => KindProfile {
                bounds_offset: IVec2::new(4, 4),
                bounds_size: IVec2::new(8, 16),
                health: 1,
                max_speed: 3,
                stamina: None,
            },
        }
    }

    /// Movement policy applied to agents of the kind.
    #[must_use]
    pub const fn movement_policy(self) -> MovementPolicy {
        match self {
            Self::Player | Self::Melee | Self::Ranged => MovementPolicy::PathFollow,
            Self::Missile => MovementPolicy::Linear,
        }
    }

    /// Group assigned to agents of the kind when they spawn.
    #[must_use]
    pub const fn initial_group(self) -> GroupId {
        match self {
            Self::Player => GroupId::PLAYER,
            Self::Melee | Self::Ranged | Self::Missile => GroupId::UNASSIGNED,
        }
    }

    /// Reports whether agents of the kind can be rectangle-selected.
    #[must_use]
    pub const fn is_selectable(self) -> bool {
        matches!(self, Self::Melee | Self::Ranged)
    }

    /// Collision bounds of an agent of this kind drawn at `origin`.
    #[must_use]
    pub const fn bounds_at(self, origin: IVec2) -> PixelRect {
        let profile = self.profile();
        PixelRect::new(
            origin.x + profile.bounds_offset.x,
            origin.y + profile.bounds_offset.y,
            profile.bounds_size.x,
            profile.bounds_size.y,
        )
    }
}

/// Horizontal direction a sprite faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Facing {
    /// Sprite drawn unflipped.
    #[default]
    Left,
    /// Sprite drawn mirrored.
    Right,
}

impl Facing {
    /// Facing implied by a heading, or `current` when the heading is vertical.
    #[must_use]
    pub fn from_heading(heading: Vec2, current: Facing) -> Facing {
        if heading.x > 0.0 {
            Facing::Right
        } else if heading.x < 0.0 {
            Facing::Left
        } else {
            current
        }
    }
}

/// Movement state of an agent, derived from its path and commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MovementState {
    /// No path; the agent stands still.
    Idle,
    /// The agent overlaps its nearest waypoint and follows the local gradient.
    Committed,
    /// The agent heads straight for its nearest waypoint.
    Seeking,
}

/// Screen-space input consumed by the selection system.
///
/// Positions are expressed in world units; the play area is drawn unscaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// The pointer moved.
    PointerMoved {
        /// New pointer position.
        position: IVec2,
    },
    /// A pointer button was pressed.
    ButtonDown {
        /// Pointer position at the press.
        position: IVec2,
    },
    /// A pointer button was released.
    ButtonUp {
        /// Pointer position at the release.
        position: IVec2,
    },
    /// A key was pressed.
    KeyDown {
        /// Key that was pressed.
        key: Key,
    },
}

/// Keys the simulation reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Empties the current selection.
    ClearSelection,
}

/// Monotonic millisecond clock supplied by the platform layer.
pub trait TickSource {
    /// Milliseconds elapsed since an arbitrary fixed point.
    fn now(&self) -> u64;
}

/// Clock advanced explicitly by its owner.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    /// Creates a clock that reads `start` until advanced.
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Moves the clock forward by `elapsed`.
    pub fn advance(&self, elapsed: Duration) {
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.now.set(self.now.get().saturating_add(millis));
    }
}

impl TickSource for ManualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }
}

/// Reasons a spawn request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum SpawnError {
    /// Part of the collision bounds lies outside the grid.
    #[error("spawn bounds extend beyond the grid")]
    OutOfBounds,
    /// Part of the collision bounds covers a solid cell.
    #[error("spawn bounds cover a solid cell")]
    Solid,
    /// Part of the collision bounds covers a cell that already holds an agent.
    #[error("spawn bounds cover an occupied cell")]
    Occupied,
    /// No valid location was found within the allowed number of attempts.
    #[error("no valid spawn location found after {attempts} attempts")]
    PlacementExhausted {
        /// Number of candidate locations that were tried.
        attempts: u32,
    },
}

/// Reasons a path search fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PathError {
    /// The goal point maps to a solid cell.
    #[error("goal cell is solid")]
    GoalSolid,
    /// The start and goal points map to the same cell.
    #[error("start and goal share a cell")]
    AlreadyAtGoal,
    /// Every route to the goal is blocked.
    #[error("goal is unreachable")]
    Unreachable,
}

/// Failures raised while reading a collision map.
#[derive(Debug, Error)]
pub enum CollisionMapError {
    /// The collision map source could not be opened or read.
    #[error("unable to read collision map")]
    Io(#[from] io::Error),
    /// A token exceeded the maximum supported length.
    #[error("collision token {index} is longer than {max} bytes")]
    TokenTooLong {
        /// Zero-based position of the offending token.
        index: usize,
        /// Maximum supported token length.
        max: usize,
    },
}

/// Fatal failures raised while preparing the simulation.
#[derive(Debug, Error)]
pub enum InitError {
    /// The grid or its overlay target could not be created.
    #[error("Grid failed to initialize.")]
    Grid,
    /// The collision map could not be loaded.
    #[error("Collision map failed to initialize: {0}")]
    CollisionMap(#[from] CollisionMapError),
    /// The initial roster could not be placed.
    #[error("Spawn failed to initialize: {0}")]
    Spawn(#[from] SpawnError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octile_distance_matches_step_costs() {
        let origin = CellCoord::new(0, 0);
        assert_eq!(origin.octile_distance(CellCoord::new(3, 0)), 30);
        assert_eq!(origin.octile_distance(CellCoord::new(3, 3)), 42);
        assert_eq!(origin.octile_distance(CellCoord::new(5, 2)), 58);
        assert_eq!(
            CellCoord::new(5, 2).octile_distance(origin),
            origin.octile_distance(CellCoord::new(5, 2))
        );
    }

    #[test]
    fn adjacency_includes_diagonals_only_once_removed() {
        let cell = CellCoord::new(4, 4);
        assert!(cell.is_adjacent(CellCoord::new(5, 5)));
        assert!(cell.is_adjacent(CellCoord::new(4, 3)));
        assert!(!cell.is_adjacent(cell));
        assert!(!cell.is_adjacent(CellCoord::new(6, 4)));
    }

    #[test]
    fn kind_bounds_follow_profile_offsets() {
        let origin = IVec2::new(100, 100);
        assert_eq!(
            AgentKind::Player.bounds_at(origin),
            PixelRect::new(104, 104, 14, 16)
        );
        assert_eq!(
            AgentKind::Melee.bounds_at(origin),
            PixelRect::new(100, 104, 14, 16)
        );
        assert_eq!(
            AgentKind::Missile.bounds_at(origin),
            PixelRect::new(104, 104, 8, 16)
        );
    }

    #[test]
    fn bounds_never_exceed_a_cell() {
        for kind in AgentKind::ALL {
            let size = kind.profile().bounds_size;
            assert!(size.x <= DEFAULT_CELL_SIZE as i32);
            assert!(size.y <= DEFAULT_CELL_SIZE as i32);
        }
    }

    #[test]
    fn only_monsters_are_selectable() {
        let selectable: Vec<_> = AgentKind::ALL
            .into_iter()
            .filter(|kind| kind.is_selectable())
            .collect();
        assert_eq!(selectable, vec![AgentKind::Melee, AgentKind::Ranged]);
    }

    #[test]
    fn facing_keeps_current_direction_for_vertical_heading() {
        assert_eq!(
            Facing::from_heading(Vec2::new(0.0, 1.0), Facing::Right),
            Facing::Right
        );
        assert_eq!(
            Facing::from_heading(Vec2::new(-0.5, 0.5), Facing::Right),
            Facing::Left
        );
    }

    #[test]
    fn manual_clock_advances_monotonically() {
        let clock = ManualClock::new(10);
        clock.advance(Duration::from_millis(25));
        assert_eq!(clock.now(), 35);
    }

    #[test]
    fn init_errors_render_human_readable_reasons() {
        assert_eq!(InitError::Grid.to_string(), "Grid failed to initialize.");
        let error = InitError::from(SpawnError::PlacementExhausted { attempts: 64 });
        assert_eq!(
            error.to_string(),
            "Spawn failed to initialize: no valid spawn location found after 64 attempts"
        );
    }
}
