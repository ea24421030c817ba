//! Agent records stored in the world arena.

use glam::{IVec2, Vec2};
use skirmish_core::{
    AgentId, AgentKind, CellCoord, Facing, GroupId, MovementState, PixelRect, BOB_AMPLITUDE,
};

/// Autonomous unit living in the world arena.
///
/// The center is the authoritative position; bounds and the draw origin are
/// derived from it so fractional motion never drifts from the integer
/// rectangles used for collision.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    id: AgentId,
    kind: AgentKind,
    center: Vec2,
    bounds: PixelRect,
    heading: Vec2,
    speed: f32,
    health: i32,
    stamina: Option<i32>,
    path: Vec<CellCoord>,
    committed: bool,
    group: GroupId,
    goal: IVec2,
    cells: Vec<CellCoord>,
    bob: u8,
    bob_maxed: bool,
    facing: Facing,
    last_move_ms: u64,
    ready: bool,
}

impl Agent {
    pub(crate) fn spawn(id: AgentId, kind: AgentKind, origin: IVec2, now_ms: u64) -> Self {
        let profile = kind.profile();
        let bounds = kind.bounds_at(origin);
        Self {
            id,
            kind,
            center: bounds.center(),
            bounds,
            heading: Vec2::ZERO,
            speed: 0.0,
            health: profile.health,
            stamina: profile.stamina,
            path: Vec::new(),
            committed: false,
            group: kind.initial_group(),
            goal: bounds.center().as_ivec2(),
            cells: Vec::new(),
            bob: 0,
            bob_maxed: false,
            facing: Facing::default(),
            last_move_ms: now_ms,
            ready: false,
        }
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Kind of the agent.
    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Exact position of the bounds center.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Integer collision bounds.
    #[must_use]
    pub const fn bounds(&self) -> PixelRect {
        self.bounds
    }

    /// Top-left sprite anchor, excluding the bob offset.
    #[must_use]
    pub fn origin(&self) -> IVec2 {
        self.bounds.position() - self.kind.profile().bounds_offset
    }

    /// Sprite anchor raised by the current bob height.
    #[must_use]
    pub fn draw_origin(&self) -> IVec2 {
        self.origin() - IVec2::new(0, i32::from(self.bob))
    }

    /// Unit heading, or zero when the agent stands still.
    #[must_use]
    pub const fn heading(&self) -> Vec2 {
        self.heading
    }

    /// Distance covered during the last movement update.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Maximum distance the agent may cover per movement update.
    #[must_use]
    pub const fn max_speed(&self) -> u8 {
        self.kind.profile().max_speed
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    /// Current stamina, for kinds that track it.
    #[must_use]
    pub const fn stamina(&self) -> Option<i32> {
        self.stamina
    }

    /// Reports whether the agent still has health left.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Waypoints ordered goal first, nearest cell last.
    #[must_use]
    pub fn path(&self) -> &[CellCoord] {
        &self.path
    }

    /// Nearest waypoint, if any.
    #[must_use]
    pub fn next_waypoint(&self) -> Option<CellCoord> {
        self.path.last().copied()
    }

    /// Reports whether the agent tracks the local path gradient.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.committed
    }

    /// Movement state derived from the path and the commitment flag.
    #[must_use]
    pub fn movement_state(&self) -> MovementState {
        if self.path.is_empty() {
            MovementState::Idle
        } else if self.committed {
            MovementState::Committed
        } else {
            MovementState::Seeking
        }
    }

    /// Group the agent belongs to.
    #[must_use]
    pub const fn group(&self) -> GroupId {
        self.group
    }

    /// Reports whether the agent is part of the selection.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.group == GroupId::SELECTED
    }

    /// Last goal point assigned to the agent.
    #[must_use]
    pub const fn goal(&self) -> IVec2 {
        self.goal
    }

    /// Non-solid cells covered by the bounds.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Current walking bob height.
    #[must_use]
    pub const fn bob(&self) -> u8 {
        self.bob
    }

    /// Direction the sprite faces.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }

    /// Timestamp of the last movement update.
    #[must_use]
    pub const fn last_move_ms(&self) -> u64 {
        self.last_move_ms
    }

    /// Reports whether the move interval elapsed since the last update.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn mark_ready(&mut self, now_ms: u64, interval_ms: u64) {
        self.ready = self.is_alive() && now_ms.saturating_sub(self.last_move_ms) >= interval_ms;
    }

    pub(crate) fn finish_update(&mut self, now_ms: u64) {
        self.ready = false;
        self.last_move_ms = now_ms;
    }

    pub(crate) fn set_goal(&mut self, goal: IVec2) {
        self.goal = goal;
    }

    pub(crate) fn assign_path(&mut self, path: Vec<CellCoord>) {
        self.committed = !path.is_empty();
        self.path = path;
    }

    pub(crate) fn clear_path(&mut self) -> bool {
        let had_path = !self.path.is_empty();
        self.path.clear();
        self.committed = false;
        self.heading = Vec2::ZERO;
        self.speed = 0.0;
        had_path
    }

    /// Pops up to `count` waypoints from the near end of the path.
    pub(crate) fn consume_waypoints(&mut self, count: usize) -> Vec<CellCoord> {
        let keep = self.path.len().saturating_sub(count);
        let mut consumed = self.path.split_off(keep);
        consumed.reverse();
        consumed
    }

    pub(crate) fn set_committed(&mut self, committed: bool) {
        self.committed = committed && !self.path.is_empty();
    }

    pub(crate) fn set_heading(&mut self, heading: Vec2) {
        self.heading = heading.normalize_or_zero();
        self.facing = Facing::from_heading(self.heading, self.facing);
    }

    pub(crate) fn set_health(&mut self, health: i32) {
        self.health = health;
    }

    pub(crate) fn set_group(&mut self, group: GroupId) {
        self.group = group;
    }

    pub(crate) fn set_cells(&mut self, cells: Vec<CellCoord>) {
        self.cells = cells;
    }

    /// Advances the center by `displacement` and rebuilds the bounds.
    ///
    /// Returns `true` when the integer bounds changed.
    pub(crate) fn displace(&mut self, displacement: Vec2, speed: f32) -> bool {
        self.speed = speed;
        let previous = self.bounds;
        self.center += displacement;
        self.bounds = PixelRect::centered_on(self.center, self.bounds.size());
        self.update_bob(displacement != Vec2::ZERO);
        previous != self.bounds
    }

    fn update_bob(&mut self, moving: bool) {
        if !self.is_alive() {
            return;
        }
        if moving && !self.bob_maxed {
            self.bob += 1;
            self.bob_maxed = self.bob >= BOB_AMPLITUDE;
        } else if self.bob > 0 {
            self.bob -= 1;
            self.bob_maxed = self.bob > 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_applies_kind_profile() {
        let agent = Agent::spawn(AgentId::new(0), AgentKind::Player, IVec2::new(100, 100), 0);
        assert_eq!(agent.bounds(), PixelRect::new(104, 104, 14, 16));
        assert_eq!(agent.origin(), IVec2::new(100, 100));
        assert_eq!(agent.center(), Vec2::new(111.0, 112.0));
        assert_eq!(agent.health(), 100);
        assert_eq!(agent.stamina(), Some(100));
        assert_eq!(agent.group(), GroupId::PLAYER);
        assert_eq!(agent.movement_state(), MovementState::Idle);
    }

    #[test]
    fn fractional_motion_accumulates_without_drift() {
        let mut agent = Agent::spawn(AgentId::new(0), AgentKind::Melee, IVec2::new(0, 0), 0);
        let start = agent.bounds();
        for _ in 0..10 {
            let _ = agent.displace(Vec2::new(0.3, 0.0), 0.3);
        }
        assert_eq!(agent.bounds().x(), start.x() + 3);
        assert!((agent.center().x - (start.center().x + 3.0)).abs() < 1e-4);
    }

    #[test]
    fn bob_rises_to_amplitude_then_falls_back() {
        let mut agent = Agent::spawn(AgentId::new(0), AgentKind::Melee, IVec2::new(0, 0), 0);
        let mut heights = Vec::new();
        for _ in 0..10 {
            let _ = agent.displace(Vec2::new(1.0, 0.0), 1.0);
            heights.push(agent.bob());
        }
        assert_eq!(heights, vec![1, 2, 3, 4, 5, 4, 3, 2, 1, 0]);

        let _ = agent.displace(Vec2::new(1.0, 0.0), 1.0);
        let _ = agent.displace(Vec2::new(1.0, 0.0), 1.0);
        assert_eq!(agent.bob(), 2);
        assert_eq!(agent.draw_origin(), agent.origin() - IVec2::new(0, 2));
        let _ = agent.displace(Vec2::ZERO, 0.0);
        let _ = agent.displace(Vec2::ZERO, 0.0);
        let _ = agent.displace(Vec2::ZERO, 0.0);
        assert_eq!(agent.bob(), 0);
    }

    #[test]
    fn consuming_waypoints_pops_from_the_near_end() {
        let mut agent = Agent::spawn(AgentId::new(0), AgentKind::Melee, IVec2::new(0, 0), 0);
        agent.assign_path(vec![
            CellCoord::new(3, 0),
            CellCoord::new(2, 0),
            CellCoord::new(1, 0),
        ]);
        assert!(agent.is_committed());
        assert_eq!(agent.consume_waypoints(2), vec![CellCoord::new(1, 0), CellCoord::new(2, 0)]);
        assert_eq!(agent.path(), &[CellCoord::new(3, 0)]);
        assert_eq!(agent.consume_waypoints(5), vec![CellCoord::new(3, 0)]);
        assert!(agent.path().is_empty());
    }

    #[test]
    fn heading_updates_facing_by_horizontal_sign() {
        let mut agent = Agent::spawn(AgentId::new(0), AgentKind::Ranged, IVec2::new(0, 0), 0);
        agent.set_heading(Vec2::new(3.0, 4.0));
        assert_eq!(agent.facing(), Facing::Right);
        assert!((agent.heading().length() - 1.0).abs() < 1e-5);
        agent.set_heading(Vec2::new(0.0, -1.0));
        assert_eq!(agent.facing(), Facing::Right);
        agent.set_heading(Vec2::new(-1.0, 0.0));
        assert_eq!(agent.facing(), Facing::Left);
    }
}
