use skirmish_core::{AgentId, AgentKind, CellCoord, Command, Event, IVec2, PathError};
use skirmish_system_pathfinding::{path_cost, PathfinderConfig, Pathfinding};
use skirmish_world::{self as world, collision_map, query, Grid, NoOverlay, World};

const WALL_ROW: u32 = 10;
const GAP_COLUMN: u32 = 15;

fn wall_map(gap: bool) -> String {
    let mut tokens = Vec::with_capacity(50 * 37);
    for row in 0..37 {
        for column in 0..50 {
            let solid = row == WALL_ROW && !(gap && column == GAP_COLUMN);
            tokens.push(if solid { "1" } else { "0" });
        }
    }
    tokens.join(",")
}

fn wall_world(gap: bool) -> World {
    let mut grid = Grid::build(800, 600, 16, &mut NoOverlay).expect("grid builds");
    let _ = collision_map::load(&mut grid, wall_map(gap).as_bytes()).expect("map loads");
    World::new(grid)
}

fn spawn(world: &mut World, kind: AgentKind, origin: IVec2) -> AgentId {
    let mut events = Vec::new();
    world::apply(world, Command::SpawnAgent { kind, origin }, &mut events);
    events
        .iter()
        .find_map(|event| match event {
            Event::AgentSpawned { agent, .. } => Some(*agent),
            _ => None,
        })
        .expect("agent spawned")
}

/// Places a melee agent whose bounds sit entirely inside `cell`.
fn spawn_in_cell(world: &mut World, cell: CellCoord) -> AgentId {
    let origin = IVec2::new(
        cell.column() as i32 * 16 + 1,
        cell.row() as i32 * 16 - 4,
    );
    spawn(world, AgentKind::Melee, origin)
}

fn order(
    world: &mut World,
    pathfinding: &mut Pathfinding,
    agent: AgentId,
    goal: IVec2,
) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::SetGoal { agent, goal }, &mut events);

    let mut commands = Vec::new();
    pathfinding.handle(&events, world, &mut commands);

    let mut results = Vec::new();
    for command in commands {
        world::apply(world, command, &mut results);
    }
    results
}

fn goal_point(cell: CellCoord) -> IVec2 {
    IVec2::new(cell.column() as i32 * 16 + 8, cell.row() as i32 * 16 + 8)
}

#[test]
fn wall_scenario_routes_through_the_gap() {
    let mut world = wall_world(true);
    let agent = spawn_in_cell(&mut world, CellCoord::new(6, 6));
    let mut pathfinding = Pathfinding::default();

    let events = order(&mut world, &mut pathfinding, agent, goal_point(CellCoord::new(6, 30)));

    assert!(matches!(events.as_slice(), [Event::PathAssigned { .. }]));
    let path = query::agent(&world, agent).expect("agent").path().to_vec();
    assert_eq!(path.first(), Some(&CellCoord::new(6, 30)));
    assert_eq!(path.last(), Some(&CellCoord::new(6, 6)));
    assert!(path.contains(&CellCoord::new(GAP_COLUMN, WALL_ROW)));
    assert!(path
        .iter()
        .all(|cell| !query::grid(&world).is_solid(*cell)));
    assert_eq!(path_cost(&path), 342);
    assert!(pathfinding.scratch_is_clean());
}

#[test]
fn closing_the_gap_makes_the_identical_search_fail() {
    let mut world = wall_world(false);
    let agent = spawn_in_cell(&mut world, CellCoord::new(6, 6));
    let mut pathfinding = Pathfinding::default();

    let events = order(&mut world, &mut pathfinding, agent, goal_point(CellCoord::new(6, 30)));

    assert_eq!(
        events,
        vec![Event::PathNotFound {
            agent,
            reason: PathError::Unreachable,
        }]
    );
    assert!(query::agent(&world, agent).expect("agent").path().is_empty());
    assert!(pathfinding.scratch_is_clean());
}

#[test]
fn solid_goal_is_rejected_without_searching() {
    let mut world = wall_world(true);
    let agent = spawn_in_cell(&mut world, CellCoord::new(6, 6));
    let mut pathfinding = Pathfinding::default();

    let events = order(&mut world, &mut pathfinding, agent, goal_point(CellCoord::new(3, WALL_ROW)));

    assert_eq!(
        events,
        vec![Event::PathNotFound {
            agent,
            reason: PathError::GoalSolid,
        }]
    );
}

#[test]
fn repeated_searches_are_identical() {
    let mut world = wall_world(true);
    let agent = spawn_in_cell(&mut world, CellCoord::new(6, 6));
    let mut pathfinding = Pathfinding::default();
    let grid = query::grid(&world);
    let start = query::agent(&world, agent).expect("agent").center();

    let goals = [
        CellCoord::new(40, 30),
        CellCoord::new(0, 36),
        CellCoord::new(49, 0),
    ];
    for goal in goals {
        let first = pathfinding.find_path(grid, Some(agent), start, goal_point(goal));
        assert!(pathfinding.scratch_is_clean());
        let second = pathfinding.find_path(grid, Some(agent), start, goal_point(goal));
        assert!(pathfinding.scratch_is_clean());
        assert_eq!(first, second);
    }

    let mut fresh = Pathfinding::default();
    let goal = goal_point(CellCoord::new(40, 30));
    assert_eq!(
        fresh.find_path(grid, Some(agent), start, goal),
        pathfinding.find_path(grid, Some(agent), start, goal)
    );
}

#[test]
fn occupancy_policy_decides_whether_agents_block_the_gap() {
    let mut world = wall_world(true);
    let agent = spawn_in_cell(&mut world, CellCoord::new(6, 6));
    let _plug = spawn_in_cell(&mut world, CellCoord::new(GAP_COLUMN, WALL_ROW));
    let start = query::agent(&world, agent).expect("agent").center();
    let goal = goal_point(CellCoord::new(6, 30));

    let mut strict = Pathfinding::new(PathfinderConfig::new(true));
    assert_eq!(
        strict.find_path(query::grid(&world), Some(agent), start, goal),
        Err(PathError::Unreachable)
    );

    let mut lenient = Pathfinding::new(PathfinderConfig::new(false));
    let path = lenient
        .find_path(query::grid(&world), Some(agent), start, goal)
        .expect("occupants do not block");
    assert!(path.contains(&CellCoord::new(GAP_COLUMN, WALL_ROW)));
    assert!(strict.scratch_is_clean());
    assert!(lenient.scratch_is_clean());
}

#[test]
fn searcher_never_blocks_itself() {
    let mut world = wall_world(true);
    let agent = spawn(&mut world, AgentKind::Player, IVec2::new(100, 100));
    let mut pathfinding = Pathfinding::default();

    let events = order(&mut world, &mut pathfinding, agent, goal_point(CellCoord::new(8, 8)));

    assert!(matches!(events.as_slice(), [Event::PathAssigned { .. }]));
    let record = query::agent(&world, agent).expect("agent");
    assert!(record.is_committed());
    assert_eq!(record.goal(), goal_point(CellCoord::new(8, 8)));
}
