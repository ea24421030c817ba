#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! A* pathfinding over grid cells.
//!
//! The system reacts to goal assignments by searching from the agent's
//! center to its goal and answers with either a goal-first waypoint list or a
//! rejection. Search scratch lives in a dense table reused across searches
//! and is returned to its neutral state after every search.

use std::{cmp::Reverse, collections::BinaryHeap};

use log::debug;
use skirmish_core::{
    AgentId, CellCoord, Command, Event, IVec2, MovementPolicy, PathError, Vec2,
};
use skirmish_world::{query, Grid, World};

/// Tuning knobs for the pathfinder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathfinderConfig {
    occupancy_blocks_search: bool,
}

impl PathfinderConfig {
    /// Creates a configuration with the provided occupancy policy.
    #[must_use]
    pub const fn new(occupancy_blocks_search: bool) -> Self {
        Self {
            occupancy_blocks_search,
        }
    }

    /// Reports whether cells covered by other agents are impassable.
    #[must_use]
    pub const fn occupancy_blocks_search(&self) -> bool {
        self.occupancy_blocks_search
    }
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Pure system that turns goal assignments into waypoint paths.
#[derive(Debug, Default)]
pub struct Pathfinding {
    config: PathfinderConfig,
    scratch: SearchScratch,
}

impl Pathfinding {
    /// Creates a pathfinder using the provided configuration.
    #[must_use]
    pub fn new(config: PathfinderConfig) -> Self {
        Self {
            config,
            scratch: SearchScratch::default(),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> PathfinderConfig {
        self.config
    }

    /// Consumes world events and emits a path command for every new goal.
    pub fn handle(&mut self, events: &[Event], world: &World, out: &mut Vec<Command>) {
        for event in events {
            let Event::GoalAssigned { agent, goal } = event else {
                continue;
            };
            let Some(record) = query::agent(world, *agent) else {
                continue;
            };
            if !record.is_alive() || record.kind().movement_policy() != MovementPolicy::PathFollow
            {
                continue;
            }

            let grid = query::grid(world);
            let command = match self.find_path(grid, Some(*agent), record.center(), *goal) {
                Ok(path) => Command::AssignPath {
                    agent: *agent,
                    path,
                },
                Err(reason) => Command::RejectPath {
                    agent: *agent,
                    reason,
                },
            };
            out.push(command);
        }
    }

    /// Searches for the cheapest route from `start` to `goal`.
    ///
    /// Both points are mapped to cells with clamping. The returned path lists
    /// the goal cell first and the start cell last. When `searcher` is
    /// provided and the occupancy policy is on, cells covered by any other
    /// agent are impassable.
    pub fn find_path(
        &mut self,
        grid: &Grid,
        searcher: Option<AgentId>,
        start: Vec2,
        goal: IVec2,
    ) -> Result<Vec<CellCoord>, PathError> {
        let start = grid.locate(start);
        let goal = grid.point_to_cell(goal);
        if grid.is_solid(goal) {
            return Err(PathError::GoalSolid);
        }
        if start == goal {
            return Err(PathError::AlreadyAtGoal);
        }

        let occupancy_blocks = self.config.occupancy_blocks_search;
        let blocks = |coord: CellCoord| {
            grid.cell(coord).map_or(true, |cell| {
                cell.is_solid()
                    || (occupancy_blocks
                        && match searcher {
                            Some(id) => cell.is_occupied_by_other(id),
                            None => !cell.occupants().is_empty(),
                        })
            })
        };
        let result = self.scratch.search(grid, start, goal, blocks);
        self.scratch.reset();

        match &result {
            Ok(path) => debug!(
                "path {start:?} -> {goal:?}: {} waypoints, cost {}",
                path.len(),
                path_cost(path)
            ),
            Err(reason) => debug!("path {start:?} -> {goal:?} failed: {reason}"),
        }
        result
    }

    /// Reports whether no search state survived the last search.
    #[must_use]
    pub fn scratch_is_clean(&self) -> bool {
        self.scratch.is_clean()
    }
}

/// Total step cost of a path using the 14/10 metric.
#[must_use]
pub fn path_cost(path: &[CellCoord]) -> u32 {
    path.windows(2)
        .map(|pair| pair[0].octile_distance(pair[1]))
        .sum()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SearchNode {
    g: u32,
    h: u32,
    parent: Option<usize>,
    open: bool,
    closed: bool,
}

impl SearchNode {
    const NEUTRAL: Self = Self {
        g: u32::MAX,
        h: 0,
        parent: None,
        open: false,
        closed: false,
    };
}

/// Open-set entry ordered by total cost, then heuristic, then insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    f: u32,
    h: u32,
    sequence: u64,
    index: usize,
    g: u32,
}

#[derive(Debug, Default)]
struct SearchScratch {
    nodes: Vec<SearchNode>,
    touched: Vec<usize>,
    open: BinaryHeap<Reverse<OpenEntry>>,
    sequence: u64,
}

impl SearchScratch {
    fn search<F>(
        &mut self,
        grid: &Grid,
        start: CellCoord,
        goal: CellCoord,
        blocks: F,
    ) -> Result<Vec<CellCoord>, PathError>
    where
        F: Fn(CellCoord) -> bool,
    {
        if self.nodes.len() != grid.len() {
            self.nodes = vec![SearchNode::NEUTRAL; grid.len()];
        }
        let (Some(start_index), Some(goal_index)) = (grid.index(start), grid.index(goal)) else {
            return Err(PathError::Unreachable);
        };

        self.relax(start_index, 0, start.octile_distance(goal), None);
        while let Some(Reverse(entry)) = self.open.pop() {
            let node = &mut self.nodes[entry.index];
            if node.closed || node.g != entry.g {
                continue;
            }
            node.open = false;
            node.closed = true;

            if entry.index == goal_index {
                return Ok(self.walk_back(grid, goal_index));
            }

            let current = coord_of(grid, entry.index);
            for neighbour in grid.neighbours(current) {
                let Some(index) = grid.index(neighbour) else {
                    continue;
                };
                if self.nodes[index].closed || blocks(neighbour) {
                    continue;
                }
                let g = entry.g + current.octile_distance(neighbour);
                if g < self.nodes[index].g {
                    self.relax(index, g, neighbour.octile_distance(goal), Some(entry.index));
                }
            }
        }

        Err(PathError::Unreachable)
    }

    fn relax(&mut self, index: usize, g: u32, h: u32, parent: Option<usize>) {
        let node = &mut self.nodes[index];
        if !node.open && !node.closed {
            self.touched.push(index);
        }
        node.g = g;
        node.h = h;
        node.parent = parent;
        node.open = true;
        self.sequence += 1;
        self.open.push(Reverse(OpenEntry {
            f: g + h,
            h,
            sequence: self.sequence,
            index,
            g,
        }));
    }

    fn walk_back(&self, grid: &Grid, goal_index: usize) -> Vec<CellCoord> {
        let mut path = Vec::new();
        let mut cursor = Some(goal_index);
        while let Some(index) = cursor {
            path.push(coord_of(grid, index));
            cursor = self.nodes[index].parent;
        }
        path
    }

    fn reset(&mut self) {
        for index in self.touched.drain(..) {
            self.nodes[index] = SearchNode::NEUTRAL;
        }
        self.open.clear();
        self.sequence = 0;
    }

    fn is_clean(&self) -> bool {
        self.touched.is_empty()
            && self.open.is_empty()
            && self.nodes.iter().all(|node| *node == SearchNode::NEUTRAL)
    }
}

fn coord_of(grid: &Grid, index: usize) -> CellCoord {
    let columns = grid.columns() as usize;
    CellCoord::new((index % columns) as u32, (index / columns) as u32)
}
