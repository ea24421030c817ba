//! Uniform cell grid that doubles as the pathfinding search space and the
//! broad-phase index of agents.

use glam::{IVec2, Vec2};
use skirmish_core::{AgentId, CellCoord, InitError, PixelRect, SpawnError};

/// Collaborator that receives the grid layout while it is being built.
///
/// Presentation layers use it to allocate a backing target and draw cell
/// outlines; headless builds pass [`NoOverlay`].
pub trait GridOverlay {
    /// Allocates a target covering `width` × `height` world units.
    ///
    /// Returning `false` aborts grid construction.
    fn allocate(&mut self, width: u32, height: u32) -> bool;

    /// Records the outline of a single cell.
    fn outline(&mut self, bounds: PixelRect);
}

/// Overlay that accepts every layout and draws nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOverlay;

impl GridOverlay for NoOverlay {
    fn allocate(&mut self, _width: u32, _height: u32) -> bool {
        true
    }

    fn outline(&mut self, _bounds: PixelRect) {}
}

/// Single square region of the play area.
#[derive(Clone, Debug)]
pub struct Cell {
    coord: CellCoord,
    bounds: PixelRect,
    center: IVec2,
    solid: bool,
    occupants: Vec<AgentId>,
}

impl Cell {
    fn new(coord: CellCoord, bounds: PixelRect) -> Self {
        Self {
            coord,
            center: bounds.position() + bounds.size() / 2,
            bounds,
            solid: false,
            occupants: Vec::new(),
        }
    }

    /// Column and row of the cell.
    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// World-space rectangle covered by the cell.
    #[must_use]
    pub const fn bounds(&self) -> PixelRect {
        self.bounds
    }

    /// Integer center of the cell.
    #[must_use]
    pub const fn center(&self) -> IVec2 {
        self.center
    }

    /// Reports whether the cell is static terrain.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.solid
    }

    /// Agents whose bounds currently cover the cell, in arrival order.
    #[must_use]
    pub fn occupants(&self) -> &[AgentId] {
        &self.occupants
    }

    /// Reports whether any agent other than `except` covers the cell.
    #[must_use]
    pub fn is_occupied_by_other(&self, except: AgentId) -> bool {
        self.occupants.iter().any(|occupant| *occupant != except)
    }
}

/// Agents and static obstacles found around a cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AreaContents {
    /// Distinct agents covering non-solid neighbourhood cells.
    pub agents: Vec<AgentId>,
    /// Bounds of solid neighbourhood cells.
    pub obstacles: Vec<PixelRect>,
}

/// Fixed-size grid of cells covering the play area.
#[derive(Clone, Debug)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cell_size: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Partitions a `width` × `height` play area into square cells.
    ///
    /// The overlay is asked to allocate its target before any cell is laid
    /// out, and then receives every cell outline in raster order.
    pub fn build(
        width: u32,
        height: u32,
        cell_size: u32,
        overlay: &mut impl GridOverlay,
    ) -> Result<Self, InitError> {
        if cell_size == 0 || width < cell_size || height < cell_size {
            return Err(InitError::Grid);
        }
        let side = i32::try_from(cell_size).map_err(|_| InitError::Grid)?;
        if !overlay.allocate(width, height) {
            return Err(InitError::Grid);
        }

        let columns = width / cell_size;
        let rows = height / cell_size;
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows))
            .map_err(|_| InitError::Grid)?;
        let mut cells = Vec::with_capacity(capacity);
        for row in 0..rows {
            for column in 0..columns {
                let bounds = PixelRect::new(
                    column as i32 * side,
                    row as i32 * side,
                    side,
                    side,
                );
                overlay.outline(bounds);
                cells.push(Cell::new(CellCoord::new(column, row), bounds));
            }
        }

        Ok(Self {
            columns,
            rows,
            cell_size,
            cells,
        })
    }

    /// Number of cell columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of cell rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Rectangle covered by the whole grid.
    #[must_use]
    pub fn extent(&self) -> PixelRect {
        let side = self.cell_size as i32;
        PixelRect::new(0, 0, self.columns as i32 * side, self.rows as i32 * side)
    }

    /// Iterator over all cells in raster order, columns advancing first.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Looks up a cell by coordinate.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    /// Dense index of the cell, or `None` when the coordinate is off-grid.
    #[must_use]
    pub fn index(&self, coord: CellCoord) -> Option<usize> {
        if coord.column() < self.columns && coord.row() < self.rows {
            let row = usize::try_from(coord.row()).ok()?;
            let column = usize::try_from(coord.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the grid holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether the cell is solid. Off-grid coordinates count as solid.
    #[must_use]
    pub fn is_solid(&self, coord: CellCoord) -> bool {
        self.cell(coord).map_or(true, Cell::is_solid)
    }

    /// Maps a world point to the cell containing it.
    ///
    /// Coordinates are floor-divided by the cell size and then clamped to
    /// the grid independently per axis, so every point maps to some cell.
    #[must_use]
    pub fn point_to_cell(&self, point: IVec2) -> CellCoord {
        let side = self.cell_size as i32;
        CellCoord::new(
            clamp_axis(point.x.div_euclid(side), self.columns),
            clamp_axis(point.y.div_euclid(side), self.rows),
        )
    }

    /// Maps a fractional world point to the cell containing it.
    #[must_use]
    pub fn locate(&self, point: Vec2) -> CellCoord {
        self.point_to_cell(point.floor().as_ivec2())
    }

    /// Cells adjacent to `coord`, including diagonals, in a fixed order.
    pub fn neighbours(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        ring(coord)
            .filter(move |(column, row)| *column < self.columns as i64 && *row < self.rows as i64)
            .filter(move |offset| *offset != (i64::from(coord.column()), i64::from(coord.row())))
            .map(|(column, row)| CellCoord::new(column as u32, row as u32))
    }

    /// Collects the agents and obstacles in the 3×3 neighbourhood of `center`.
    ///
    /// Non-solid cells contribute their occupants once each, skipping
    /// `ignore`; solid cells contribute their bounds.
    #[must_use]
    pub fn area_contents(&self, center: CellCoord, ignore: Option<AgentId>) -> AreaContents {
        let mut contents = AreaContents::default();
        for (column, row) in ring(center) {
            if column >= self.columns as i64 || row >= self.rows as i64 {
                continue;
            }
            let Some(cell) = self.cell(CellCoord::new(column as u32, row as u32)) else {
                continue;
            };
            if cell.solid {
                contents.obstacles.push(cell.bounds);
                continue;
            }
            for occupant in &cell.occupants {
                if Some(*occupant) == ignore || contents.agents.contains(occupant) {
                    continue;
                }
                contents.agents.push(*occupant);
            }
        }
        contents
    }

    /// Non-solid cells touched by the four corners of `bounds`, deduplicated.
    #[must_use]
    pub fn cells_covered(&self, bounds: PixelRect) -> Vec<CellCoord> {
        let side = self.cell_size as i32;
        let mut covered = Vec::with_capacity(4);
        for corner in bounds.corners() {
            if corner.x < 0 || corner.y < 0 {
                continue;
            }
            let coord = CellCoord::new((corner.x / side) as u32, (corner.y / side) as u32);
            let Some(cell) = self.cell(coord) else {
                continue;
            };
            if cell.solid || covered.contains(&coord) {
                continue;
            }
            covered.push(coord);
        }
        covered
    }

    /// Reason `bounds` cannot host a new agent, if any.
    ///
    /// Every corner must map to an on-grid cell that is neither solid nor
    /// occupied.
    #[must_use]
    pub fn placement_error(&self, bounds: PixelRect) -> Option<SpawnError> {
        if !bounds.is_within(&self.extent()) {
            return Some(SpawnError::OutOfBounds);
        }
        let side = self.cell_size as i32;
        let mut occupied = false;
        for corner in bounds.corners() {
            let coord = CellCoord::new((corner.x / side) as u32, (corner.y / side) as u32);
            let Some(cell) = self.cell(coord) else {
                return Some(SpawnError::OutOfBounds);
            };
            if cell.solid {
                return Some(SpawnError::Solid);
            }
            occupied |= !cell.occupants.is_empty();
        }
        occupied.then_some(SpawnError::Occupied)
    }

    pub(crate) fn set_solid(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            cell.solid = true;
        }
    }

    pub(crate) fn insert_occupant(&mut self, coord: CellCoord, agent: AgentId) {
        if let Some(index) = self.index(coord) {
            let occupants = &mut self.cells[index].occupants;
            if !occupants.contains(&agent) {
                occupants.push(agent);
            }
        }
    }

    pub(crate) fn remove_occupant(&mut self, coord: CellCoord, agent: AgentId) {
        if let Some(index) = self.index(coord) {
            self.cells[index].occupants.retain(|occupant| *occupant != agent);
        }
    }
}

fn clamp_axis(value: i32, count: u32) -> u32 {
    if value < 0 {
        0
    } else {
        (value as u32).min(count.saturating_sub(1))
    }
}

/// Coordinates of the 3×3 block around `center`, columns outermost, skipping
/// negative positions.
fn ring(center: CellCoord) -> impl Iterator<Item = (i64, i64)> {
    let column = i64::from(center.column());
    let row = i64::from(center.row());
    (-1..=1)
        .flat_map(move |dc| (-1..=1).map(move |dr| (column + dc, row + dr)))
        .filter(|(column, row)| *column >= 0 && *row >= 0)
}
