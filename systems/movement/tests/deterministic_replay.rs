use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use skirmish_core::{AgentId, AgentKind, CellCoord, Command, Event, IVec2};
use skirmish_system_movement::Movement;
use skirmish_system_pathfinding::Pathfinding;
use skirmish_world::{self as world, collision_map, query, Grid, NoOverlay, World};

const TICK_MS: u64 = 25;
const TICKS: u64 = 240;

#[test]
fn replaying_a_session_reproduces_the_same_outcome() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first
        .events
        .iter()
        .any(|event| matches!(event, EventRecord::AgentMoved { .. })));
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut grid = Grid::build(480, 320, 16, &mut NoOverlay).expect("grid builds");
    let _ = collision_map::load(&mut grid, terrain().as_bytes()).expect("terrain loads");
    let mut world = World::new(grid);
    let mut pathfinding = Pathfinding::default();
    let mut movement = Movement::default();
    let mut log = Vec::new();

    for command in commands {
        let mut events = Vec::new();
        world::apply(&mut world, command, &mut events);
        record_events(&events, &mut log);

        let mut follow_up = Vec::new();
        pathfinding.handle(&events, &world, &mut follow_up);
        let mut path_events = Vec::new();
        for command in follow_up {
            world::apply(&mut world, command, &mut path_events);
        }
        record_events(&path_events, &mut log);

        let mut movement_events = Vec::new();
        movement.handle(&events, &mut world, &mut movement_events);
        record_events(&movement_events, &mut log);
        assert!(query::index_is_consistent(&world));
    }

    let agents = query::agents(&world)
        .map(|agent| AgentState {
            id: agent.id(),
            origin: (agent.origin().x, agent.origin().y),
            cells: agent.cells().to_vec(),
            waypoints: agent.path().len(),
            bob: agent.bob(),
        })
        .collect();

    ReplayOutcome {
        agents,
        events: log,
    }
}

/// Open field with a short vertical wall in column 12.
fn terrain() -> String {
    let mut tokens = Vec::new();
    for row in 0..20 {
        for column in 0..30 {
            let solid = column == 12 && (4..14).contains(&row);
            tokens.push(if solid { "1" } else { "0" });
        }
    }
    tokens.join(",")
}

fn scripted_commands() -> Vec<Command> {
    let mut commands = vec![
        Command::SpawnAgent {
            kind: AgentKind::Player,
            origin: IVec2::new(40, 100),
        },
        Command::SpawnAgent {
            kind: AgentKind::Melee,
            origin: IVec2::new(64, 156),
        },
        Command::SpawnAgent {
            kind: AgentKind::Ranged,
            origin: IVec2::new(96, 188),
        },
        Command::SpawnAgent {
            kind: AgentKind::Melee,
            origin: IVec2::new(64, 220),
        },
        Command::SelectGroup {
            first: IVec2::new(0, 140),
            second: IVec2::new(140, 260),
        },
    ];
    for agent in 0..4 {
        commands.push(Command::SetGoal {
            agent: AgentId::new(agent),
            goal: IVec2::new(360, 168),
        });
    }
    for tick in 1..=TICKS {
        commands.push(Command::Tick {
            now_ms: tick * TICK_MS,
        });
    }
    commands
}

fn record_events(events: &[Event], log: &mut Vec<EventRecord>) {
    log.extend(events.iter().filter_map(EventRecord::from_event));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    agents: Vec<AgentState>,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct AgentState {
    id: AgentId,
    origin: (i32, i32),
    cells: Vec<CellCoord>,
    waypoints: usize,
    bob: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    TimeAdvanced { now_ms: u64 },
    PathAssigned { agent: AgentId, waypoints: usize },
    WaypointReached { agent: AgentId, cell: CellCoord },
    AgentMoved { agent: AgentId, to: (i32, i32) },
    Other(String),
}

impl EventRecord {
    fn from_event(event: &Event) -> Option<Self> {
        let record = match event {
            Event::TimeAdvanced { now_ms } => Self::TimeAdvanced { now_ms: *now_ms },
            Event::PathAssigned { agent, waypoints } => Self::PathAssigned {
                agent: *agent,
                waypoints: *waypoints,
            },
            Event::WaypointReached { agent, cell } => Self::WaypointReached {
                agent: *agent,
                cell: *cell,
            },
            Event::AgentMoved { agent, to, .. } => Self::AgentMoved {
                agent: *agent,
                to: (to.x, to.y),
            },
            Event::GoalAssigned { .. } => return None,
            other => Self::Other(format!("{other:?}")),
        };
        Some(record)
    }
}
