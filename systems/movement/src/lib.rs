#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Local movement controller that steers agents along their paths.
//!
//! Every ready agent is planned in arena order and its decision is applied to
//! the world before the next agent is planned, so later agents observe the
//! positions earlier agents moved into during the same tick.

use log::debug;
use skirmish_core::{
    rotate_degrees, swept_overlap, AgentId, CellCoord, Command, Event, GroupId, MovementPolicy,
    MovementStep, PixelRect, Vec2,
};
use skirmish_world::{self as world, query, Agent, AreaContents, World};

/// Overlap test used when regulating speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollisionTest {
    /// Sweeps the bounds along the displacement so thin obstacles cannot be
    /// skipped over.
    Swept,
    /// Only checks the destination bounds.
    Static,
}

/// Configuration parameters required to construct the movement system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementConfig {
    collision_test: CollisionTest,
    group_halting: bool,
    avoidance_steps: u16,
    avoidance_increment_degrees: f32,
}

impl MovementConfig {
    /// Creates a new configuration.
    ///
    /// The avoidance sweep samples `avoidance_steps` headings rotated by
    /// `avoidance_increment_degrees` each, first counter-clockwise and then
    /// clockwise.
    #[must_use]
    pub const fn new(
        collision_test: CollisionTest,
        group_halting: bool,
        avoidance_steps: u16,
        avoidance_increment_degrees: f32,
    ) -> Self {
        Self {
            collision_test,
            group_halting,
            avoidance_steps,
            avoidance_increment_degrees,
        }
    }

    /// Overlap test used when regulating speed.
    #[must_use]
    pub const fn collision_test(&self) -> CollisionTest {
        self.collision_test
    }

    /// Reports whether agents stop behind stationary group members that are
    /// closer to the goal.
    #[must_use]
    pub const fn group_halting(&self) -> bool {
        self.group_halting
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self::new(CollisionTest::Swept, true, 180, 1.0)
    }
}

/// System that plans and applies one movement update per ready agent.
#[derive(Debug, Default)]
pub struct Movement {
    config: MovementConfig,
}

impl Movement {
    /// Creates a new movement system using the supplied configuration.
    #[must_use]
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    /// Moves every ready agent once the clock advanced.
    ///
    /// Decisions are applied immediately, one agent at a time, and the
    /// resulting world events are appended to `out_events`.
    pub fn handle(&mut self, events: &[Event], world: &mut World, out_events: &mut Vec<Event>) {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        for agent in query::ready_agents(world) {
            if let Some(command) = self.plan(world, agent) {
                world::apply(world, command, out_events);
            }
        }
    }

    /// Computes the movement command for a single agent.
    ///
    /// Returns `None` when the agent is missing or dead.
    #[must_use]
    pub fn plan(&self, world: &World, id: AgentId) -> Option<Command> {
        let agent = query::agent(world, id).filter(|agent| agent.is_alive())?;
        let contents = query::area_contents(world, id);
        match agent.kind().movement_policy() {
            MovementPolicy::PathFollow => Some(Command::MoveAgent {
                agent: id,
                step: self.follow_path(world, agent, &contents),
            }),
            MovementPolicy::Linear => Some(self.fly(world, agent, &contents)),
        }
    }

    fn follow_path(&self, world: &World, agent: &Agent, contents: &AreaContents) -> MovementStep {
        if agent.path().is_empty() {
            return MovementStep::stationary(false);
        }
        if self.config.group_halting && self.is_halted_by_group(world, agent, contents) {
            return MovementStep::stationary(agent.is_committed());
        }

        let grid = query::grid(world);
        let cell_bounds = |cell: CellCoord| grid.cell(cell).map(|cell| cell.bounds());
        let cell_center = |cell: CellCoord| {
            grid.cell(cell)
                .map_or(Vec2::ZERO, |cell| cell.center().as_vec2())
        };

        let bounds = agent.bounds();
        let mut remaining = agent.path();
        let mut consumed = 0;
        let mut committed = agent.is_committed();

        if committed {
            if let Some((last, rest)) = remaining.split_last() {
                if !cell_bounds(*last).is_some_and(|cell| bounds.overlaps(&cell)) {
                    remaining = rest;
                    consumed += 1;
                    committed = false;
                }
            }
        }
        if let Some(last) = remaining.last() {
            if cell_bounds(*last).is_some_and(|cell| bounds.overlaps(&cell)) {
                committed = true;
            }
        }

        let desired = match remaining {
            [] => {
                return MovementStep {
                    consumed_waypoints: consumed,
                    ..MovementStep::stationary(false)
                }
            }
            [.., next, last] if committed => {
                (cell_center(*next) - cell_center(*last)).normalize_or_zero()
            }
            [.., last] => {
                let offset = cell_center(*last) - agent.center();
                let reach = f32::from(agent.max_speed());
                if offset.x.abs().trunc() <= reach && offset.y.abs().trunc() <= reach {
                    return MovementStep {
                        consumed_waypoints: consumed + 1,
                        ..MovementStep::stationary(committed)
                    };
                }
                offset.normalize_or_zero()
            }
        };

        let (heading, speed) = self.steer(world, agent, contents, desired);
        MovementStep {
            consumed_waypoints: consumed,
            committed,
            heading,
            speed,
        }
    }

    fn fly(&self, world: &World, agent: &Agent, contents: &AreaContents) -> Command {
        let heading = agent.heading();
        if heading == Vec2::ZERO {
            return Command::MoveAgent {
                agent: agent.id(),
                step: MovementStep::stationary(false),
            };
        }

        let speed = self.regulate_speed(world, agent, contents, heading);
        if speed == 0.0 {
            debug!("agent {} blocked in flight", agent.id().get());
            return Command::RemoveAgent { agent: agent.id() };
        }
        Command::MoveAgent {
            agent: agent.id(),
            step: MovementStep {
                consumed_waypoints: 0,
                committed: false,
                heading,
                speed,
            },
        }
    }

    /// Reports whether a stationary member of the agent's group stands closer
    /// to the goal on both axes.
    fn is_halted_by_group(&self, world: &World, agent: &Agent, contents: &AreaContents) -> bool {
        if agent.group() == GroupId::UNASSIGNED {
            return false;
        }
        let goal = agent.goal().as_vec2();
        let own = (goal - agent.center()).abs().round();
        contents.agents.iter().any(|other| {
            query::agent(world, *other).is_some_and(|other| {
                let theirs = (goal - other.center()).abs().round();
                other.group() == agent.group()
                    && theirs.x < own.x
                    && theirs.y < own.y
                    && other.heading() == Vec2::ZERO
            })
        })
    }

    /// Picks the heading and speed for a desired direction, sweeping around
    /// it when the direct route is blocked.
    fn steer(
        &self,
        world: &World,
        agent: &Agent,
        contents: &AreaContents,
        desired: Vec2,
    ) -> (Vec2, f32) {
        if desired == Vec2::ZERO {
            return (Vec2::ZERO, 0.0);
        }
        let direct = self.regulate_speed(world, agent, contents, desired);
        if direct > 0.0 {
            return (desired, direct);
        }

        let mut best: Option<(Vec2, f32, f32)> = None;
        for direction in [1.0_f32, -1.0] {
            for step in 1..=self.config.avoidance_steps {
                let angle = direction * f32::from(step) * self.config.avoidance_increment_degrees;
                let candidate = rotate_degrees(desired, angle);
                let speed = self.regulate_speed(world, agent, contents, candidate);
                if speed == 0.0 {
                    continue;
                }
                let alignment = candidate.dot(desired);
                let better = best.map_or(true, |(_, best_speed, best_alignment)| {
                    speed > best_speed || (speed == best_speed && alignment > best_alignment)
                });
                if better {
                    best = Some((candidate, speed, alignment));
                }
            }
        }

        best.map_or((Vec2::ZERO, 0.0), |(heading, speed, _)| (heading, speed))
    }

    /// Highest whole speed up to the agent's maximum at which the move stays
    /// clear of every neighbour and obstacle, or zero.
    fn regulate_speed(
        &self,
        world: &World,
        agent: &Agent,
        contents: &AreaContents,
        heading: Vec2,
    ) -> f32 {
        let extent = query::grid(world).extent();
        for speed in (1..=agent.max_speed()).rev() {
            let speed = f32::from(speed);
            let candidate = query::projected_bounds(agent, heading * speed);
            if !candidate.is_within(&extent) {
                continue;
            }
            let motion = (candidate.position() - agent.bounds().position()).as_vec2();
            let neighbours = contents
                .agents
                .iter()
                .filter_map(|other| query::agent(world, *other))
                .map(Agent::bounds);
            let blocked = neighbours
                .chain(contents.obstacles.iter().copied())
                .any(|other| self.collides(agent.bounds(), candidate, motion, other));
            if !blocked {
                return speed;
            }
        }
        0.0
    }

    fn collides(&self, from: PixelRect, to: PixelRect, motion: Vec2, other: PixelRect) -> bool {
        match self.config.collision_test {
            CollisionTest::Swept => swept_overlap(from, motion, other, Vec2::ZERO),
            CollisionTest::Static => to.overlaps(&other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{AgentKind, IVec2};
    use skirmish_world::{Grid, NoOverlay};

    fn world() -> World {
        World::new(Grid::build(320, 320, 16, &mut NoOverlay).expect("grid builds"))
    }

    fn spawn(world: &mut World, kind: AgentKind, origin: IVec2) -> AgentId {
        let mut events = Vec::new();
        world::apply(world, Command::SpawnAgent { kind, origin }, &mut events);
        match events.as_slice() {
            [Event::AgentSpawned { agent, .. }] => *agent,
            other => panic!("unexpected spawn events: {other:?}"),
        }
    }

    #[test]
    fn idle_agents_stand_still() {
        let mut world = world();
        let id = spawn(&mut world, AgentKind::Melee, IVec2::new(160, 156));
        let command = Movement::default().plan(&world, id);
        assert_eq!(
            command,
            Some(Command::MoveAgent {
                agent: id,
                step: MovementStep::stationary(false),
            })
        );
    }

    #[test]
    fn committed_agent_follows_local_gradient() {
        let mut world = world();
        let id = spawn(&mut world, AgentKind::Melee, IVec2::new(161, 156));
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::AssignPath {
                agent: id,
                path: vec![
                    CellCoord::new(12, 11),
                    CellCoord::new(11, 10),
                    CellCoord::new(10, 10),
                ],
            },
            &mut events,
        );

        let Some(Command::MoveAgent { step, .. }) = Movement::default().plan(&world, id) else {
            panic!("expected a move");
        };
        assert_eq!(step.consumed_waypoints, 0);
        assert!(step.committed);
        assert_eq!(step.heading, Vec2::new(1.0, 0.0));
        assert_eq!(step.speed, 2.0);
    }

    #[test]
    fn leaving_the_tail_cell_pops_it() {
        let mut world = world();
        let id = spawn(&mut world, AgentKind::Melee, IVec2::new(177, 156));
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::AssignPath {
                agent: id,
                path: vec![
                    CellCoord::new(13, 10),
                    CellCoord::new(12, 10),
                    CellCoord::new(11, 10),
                    CellCoord::new(9, 10),
                ],
            },
            &mut events,
        );

        let Some(Command::MoveAgent { step, .. }) = Movement::default().plan(&world, id) else {
            panic!("expected a move");
        };
        assert_eq!(step.consumed_waypoints, 1);
        assert!(step.committed);
        assert_eq!(step.heading, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn arriving_within_reach_pops_the_final_waypoint() {
        let mut world = world();
        let id = spawn(&mut world, AgentKind::Melee, IVec2::new(161, 156));
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::AssignPath {
                agent: id,
                path: vec![CellCoord::new(10, 10)],
            },
            &mut events,
        );

        let Some(Command::MoveAgent { step, .. }) = Movement::default().plan(&world, id) else {
            panic!("expected a move");
        };
        assert_eq!(step.consumed_waypoints, 1);
        assert_eq!(step.heading, Vec2::ZERO);
        assert_eq!(step.speed, 0.0);
    }

    #[test]
    fn blocked_agent_sweeps_around_the_obstacle() {
        let mut world = world();
        let id = spawn(&mut world, AgentKind::Melee, IVec2::new(162, 156));
        let _blocker = spawn(&mut world, AgentKind::Melee, IVec2::new(176, 156));
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::AssignPath {
                agent: id,
                path: vec![CellCoord::new(14, 10), CellCoord::new(10, 10)],
            },
            &mut events,
        );

        let Some(Command::MoveAgent { step, .. }) = Movement::default().plan(&world, id) else {
            panic!("expected a move");
        };
        assert!(step.speed > 0.0);
        assert!(step.heading.x < 1.0);
        assert!(step.heading.dot(Vec2::new(1.0, 0.0)) >= 0.0);
    }

    #[test]
    fn speed_regulation_stops_flush_against_a_neighbour() {
        let mut world = world();
        let id = spawn(&mut world, AgentKind::Player, IVec2::new(108, 100));
        let blocker = spawn(&mut world, AgentKind::Melee, IVec2::new(128, 100));
        let movement = Movement::default();
        let agent = query::agent(&world, id).expect("agent");
        let contents = query::area_contents(&world, id);
        assert_eq!(contents.agents, vec![blocker]);

        let gap = query::agent(&world, blocker).expect("blocker").bounds().x()
            - (agent.bounds().x() + agent.bounds().width());
        let speed = movement.regulate_speed(&world, agent, &contents, Vec2::new(1.0, 0.0));
        assert_eq!(gap, 2);
        assert_eq!(speed, 2.0);
    }

    #[test]
    fn missiles_fly_straight_and_despawn_when_blocked() {
        let mut world = world();
        let missile = spawn(&mut world, AgentKind::Missile, IVec2::new(100, 92));
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::SetHeading {
                agent: missile,
                heading: Vec2::new(0.0, -1.0),
            },
            &mut events,
        );
        let movement = Movement::default();
        assert_eq!(
            movement.plan(&world, missile),
            Some(Command::MoveAgent {
                agent: missile,
                step: MovementStep {
                    consumed_waypoints: 0,
                    committed: false,
                    heading: Vec2::new(0.0, -1.0),
                    speed: 3.0,
                },
            })
        );

        let _ = spawn(&mut world, AgentKind::Melee, IVec2::new(104, 76));
        assert_eq!(
            movement.plan(&world, missile),
            Some(Command::RemoveAgent { agent: missile })
        );
    }
}
