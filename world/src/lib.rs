#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Skirmish simulation.
//!
//! The world owns the cell grid, the agent arena and the selection. It only
//! changes through [`apply`], which keeps the spatial index in lockstep with
//! agent positions and reports every change as an [`Event`].

use std::time::Duration;

use log::{debug, warn};
use skirmish_core::{
    AgentId, AgentKind, CellCoord, Command, Event, GroupId, IVec2, MovementStep,
    DEFAULT_MOVE_INTERVAL,
};

mod agents;
pub mod collision_map;
mod grid;

pub use agents::Agent;
pub use grid::{AreaContents, Cell, Grid, GridOverlay, NoOverlay};

/// Represents the authoritative Skirmish world state.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    agents: Vec<Option<Agent>>,
    selection: Vec<AgentId>,
    now_ms: u64,
    move_interval: Duration,
}

impl World {
    /// Creates an empty world over a grid whose terrain is already loaded.
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            agents: Vec::new(),
            selection: Vec::new(),
            now_ms: 0,
            move_interval: DEFAULT_MOVE_INTERVAL,
        }
    }

    fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let index = usize::try_from(id.get()).ok()?;
        self.agents.get_mut(index).and_then(Option::as_mut)
    }

    fn next_id(&self) -> Option<AgentId> {
        u32::try_from(self.agents.len()).ok().map(AgentId::new)
    }

    /// Recomputes the cells covered by an agent and relinks both sides of the
    /// index.
    fn refresh_cells(&mut self, id: AgentId) {
        let Some(agent) = query::agent(self, id) else {
            return;
        };
        let previous = agent.cells().to_vec();
        let covered = self.grid.cells_covered(agent.bounds());
        for cell in previous {
            self.grid.remove_occupant(cell, id);
        }
        for cell in &covered {
            self.grid.insert_occupant(*cell, id);
        }
        if let Some(agent) = self.agent_mut(id) {
            agent.set_cells(covered);
        }
        debug_assert!(query::index_is_consistent(self));
    }

    fn unlink(&mut self, id: AgentId) {
        if let Some(agent) = query::agent(self, id) {
            let cells = agent.cells().to_vec();
            for cell in cells {
                self.grid.remove_occupant(cell, id);
            }
        }
        self.selection.retain(|selected| *selected != id);
    }

    fn spawn(&mut self, kind: AgentKind, origin: IVec2, out_events: &mut Vec<Event>) {
        let Some(id) = self.next_id() else {
            warn!("agent arena is full, dropping {kind:?} spawn");
            return;
        };
        if let Some(reason) = self.grid.placement_error(kind.bounds_at(origin)) {
            warn!("rejected {kind:?} spawn at {origin}: {reason}");
            out_events.push(Event::SpawnRejected {
                kind,
                origin,
                reason,
            });
            return;
        }

        let agent = Agent::spawn(id, kind, origin, self.now_ms);
        let cell = self.grid.locate(agent.center());
        self.agents.push(Some(agent));
        self.refresh_cells(id);
        debug!("spawned {kind:?} {} at {origin}", id.get());
        out_events.push(Event::AgentSpawned {
            agent: id,
            kind,
            cell,
        });
    }

    fn move_agent(&mut self, id: AgentId, step: MovementStep, out_events: &mut Vec<Event>) {
        let now_ms = self.now_ms;
        let Some(agent) = self.agent_mut(id) else {
            return;
        };
        if !agent.is_alive() {
            return;
        }

        if step.consumed_waypoints > 0 {
            for cell in agent.consume_waypoints(step.consumed_waypoints) {
                out_events.push(Event::WaypointReached { agent: id, cell });
            }
            if agent.path().is_empty() {
                out_events.push(Event::PathCompleted { agent: id });
            }
        }
        agent.set_committed(step.committed);
        agent.set_heading(step.heading);

        let from = agent.origin();
        let relinked = agent.displace(step.displacement(), step.speed);
        let to = agent.origin();
        agent.finish_update(now_ms);

        if relinked {
            self.refresh_cells(id);
        }
        if from != to {
            out_events.push(Event::AgentMoved {
                agent: id,
                from,
                to,
            });
        }
    }

    fn set_health(&mut self, id: AgentId, health: i32, out_events: &mut Vec<Event>) {
        let Some(agent) = self.agent_mut(id) else {
            return;
        };
        let was_alive = agent.is_alive();
        agent.set_health(health);
        if !was_alive || agent.is_alive() {
            return;
        }

        let _ = agent.clear_path();
        if agent.is_selected() {
            agent.set_group(GroupId::UNASSIGNED);
        }
        self.selection.retain(|selected| *selected != id);
        debug!("agent {} died", id.get());
        out_events.push(Event::AgentDied { agent: id });
    }

    fn select_group(&mut self, first: IVec2, second: IVec2, out_events: &mut Vec<Event>) {
        let a = self.grid.point_to_cell(first);
        let b = self.grid.point_to_cell(second);
        let (min_column, max_column) = (a.column().min(b.column()), a.column().max(b.column()));
        let (min_row, max_row) = (a.row().min(b.row()), a.row().max(b.row()));

        let mut candidates = Vec::new();
        for column in min_column..=max_column {
            for row in min_row..=max_row {
                let Some(cell) = self.grid.cell(CellCoord::new(column, row)) else {
                    continue;
                };
                if cell.is_solid() {
                    continue;
                }
                for occupant in cell.occupants() {
                    if !candidates.contains(occupant) {
                        candidates.push(*occupant);
                    }
                }
            }
        }

        let mut added = Vec::new();
        for id in candidates {
            let Some(agent) = self.agent_mut(id) else {
                continue;
            };
            if !agent.is_alive() || !agent.kind().is_selectable() || agent.is_selected() {
                continue;
            }
            agent.set_group(GroupId::SELECTED);
            self.selection.push(id);
            added.push(id);
        }

        if !added.is_empty() {
            debug!("selected {} agents", added.len());
            out_events.push(Event::GroupSelected { agents: added });
        }
    }

    fn clear_selection(&mut self, out_events: &mut Vec<Event>) {
        let selection = std::mem::take(&mut self.selection);
        for id in &selection {
            if let Some(agent) = self.agent_mut(*id) {
                agent.set_group(GroupId::UNASSIGNED);
            }
        }
        if !selection.is_empty() {
            out_events.push(Event::SelectionCleared);
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { now_ms } => {
            world.now_ms = world.now_ms.max(now_ms);
            let interval_ms = u64::try_from(world.move_interval.as_millis()).unwrap_or(u64::MAX);
            let now_ms = world.now_ms;
            for agent in world.agents.iter_mut().flatten() {
                agent.mark_ready(now_ms, interval_ms);
            }
            out_events.push(Event::TimeAdvanced { now_ms });
        }
        Command::ConfigureMoveInterval { interval } => {
            world.move_interval = interval;
        }
        Command::SpawnAgent { kind, origin } => world.spawn(kind, origin, out_events),
        Command::RemoveAgent { agent } => {
            if query::agent(world, agent).is_none() {
                return;
            }
            world.unlink(agent);
            if let Ok(index) = usize::try_from(agent.get()) {
                world.agents[index] = None;
            }
            debug!("removed agent {}", agent.get());
            out_events.push(Event::AgentRemoved { agent });
        }
        Command::SetGoal { agent, goal } => {
            if let Some(record) = world.agent_mut(agent).filter(|record| record.is_alive()) {
                record.set_goal(goal);
                out_events.push(Event::GoalAssigned { agent, goal });
            }
        }
        Command::AssignPath { agent, path } => {
            if let Some(stray) = path.iter().find(|cell| world.grid.index(**cell).is_none()) {
                warn!("discarded path for agent {} through off-grid cell {stray:?}", agent.get());
                return;
            }
            let Some(record) = world.agent_mut(agent).filter(|record| record.is_alive()) else {
                return;
            };
            if path.is_empty() {
                if record.clear_path() {
                    out_events.push(Event::PathCleared { agent });
                }
            } else {
                let waypoints = path.len();
                record.assign_path(path);
                out_events.push(Event::PathAssigned { agent, waypoints });
            }
        }
        Command::RejectPath { agent, reason } => {
            if let Some(record) = world.agent_mut(agent) {
                let _ = record.clear_path();
                debug!("no path for agent {}: {reason}", agent.get());
                out_events.push(Event::PathNotFound { agent, reason });
            }
        }
        Command::MoveAgent { agent, step } => world.move_agent(agent, step, out_events),
        Command::SetHeading { agent, heading } => {
            if let Some(record) = world.agent_mut(agent) {
                record.set_heading(heading);
            }
        }
        Command::SetHealth { agent, health } => world.set_health(agent, health, out_events),
        Command::SelectGroup { first, second } => world.select_group(first, second, out_events),
        Command::ClearSelection => world.clear_selection(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec2;
    use skirmish_core::{AgentId, AgentKind, IVec2, PixelRect, SpawnError};

    use super::{Agent, AreaContents, Grid, World};

    /// Provides read-only access to the cell grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Looks up a live or dead agent that has not been removed.
    #[must_use]
    pub fn agent(world: &World, id: AgentId) -> Option<&Agent> {
        let index = usize::try_from(id.get()).ok()?;
        world.agents.get(index).and_then(Option::as_ref)
    }

    /// Iterates over every agent in arena order.
    pub fn agents(world: &World) -> impl Iterator<Item = &Agent> {
        world.agents.iter().flatten()
    }

    /// Identifiers of every agent in arena order.
    #[must_use]
    pub fn agent_ids(world: &World) -> Vec<AgentId> {
        agents(world).map(Agent::id).collect()
    }

    /// Agents whose move interval elapsed, in arena order.
    #[must_use]
    pub fn ready_agents(world: &World) -> Vec<AgentId> {
        agents(world)
            .filter(|agent| agent.is_ready())
            .map(Agent::id)
            .collect()
    }

    /// Agents currently selected, in selection order.
    #[must_use]
    pub fn selection(world: &World) -> &[AgentId] {
        &world.selection
    }

    /// Latest timestamp delivered through a tick.
    #[must_use]
    pub fn now_ms(world: &World) -> u64 {
        world.now_ms
    }

    /// Minimum delay between two movement updates of one agent.
    #[must_use]
    pub fn move_interval(world: &World) -> Duration {
        world.move_interval
    }

    /// Neighbours and obstacles around the cell holding the agent's center.
    #[must_use]
    pub fn area_contents(world: &World, id: AgentId) -> AreaContents {
        agent(world, id).map_or_else(AreaContents::default, |agent| {
            let center = world.grid.locate(agent.center());
            world.grid.area_contents(center, Some(id))
        })
    }

    /// Bounds the agent would occupy after moving by `displacement`.
    #[must_use]
    pub fn projected_bounds(agent: &Agent, displacement: Vec2) -> PixelRect {
        PixelRect::centered_on(agent.center() + displacement, agent.bounds().size())
    }

    /// Reason a spawn of `kind` at `origin` would be rejected, if any.
    #[must_use]
    pub fn placement_error(world: &World, kind: AgentKind, origin: IVec2) -> Option<SpawnError> {
        world.grid.placement_error(kind.bounds_at(origin))
    }

    /// Verifies that agents and cells reference each other consistently.
    ///
    /// Every agent must list exactly the non-solid cells its bounds cover,
    /// and a cell must list an agent if and only if the agent lists the cell.
    #[must_use]
    pub fn index_is_consistent(world: &World) -> bool {
        for agent in agents(world) {
            let mut expected = world.grid.cells_covered(agent.bounds());
            let mut actual = agent.cells().to_vec();
            expected.sort();
            actual.sort();
            if expected != actual {
                return false;
            }
            let listed = actual.iter().all(|cell| {
                world
                    .grid
                    .cell(*cell)
                    .is_some_and(|cell| cell.occupants().contains(&agent.id()))
            });
            if !listed {
                return false;
            }
        }

        world.grid.cells().all(|cell| {
            cell.occupants().iter().all(|occupant| {
                agent(world, *occupant).is_some_and(|agent| agent.cells().contains(&cell.coord()))
            })
        })
    }
}
