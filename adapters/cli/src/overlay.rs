//! ASCII rendition of the grid for terminal inspection.

use skirmish_core::{AgentKind, PixelRect};
use skirmish_world::{query, GridOverlay, World};

const UNDRAWN: u8 = b'?';
const OPEN: u8 = b' ';
const SOLID: u8 = b'#';
const PATH: u8 = b'.';

/// Character canvas holding one glyph per grid cell.
#[derive(Debug)]
pub(crate) struct AsciiOverlay {
    cell_size: u32,
    columns: usize,
    rows: usize,
    canvas: Vec<u8>,
}

impl AsciiOverlay {
    pub(crate) fn new(cell_size: u32) -> Self {
        Self {
            cell_size,
            columns: 0,
            rows: 0,
            canvas: Vec::new(),
        }
    }

    /// Draws terrain, planned paths and agents over the outlined canvas.
    ///
    /// Selected monsters are drawn in lower case.
    pub(crate) fn render(&self, world: &World) -> String {
        let mut canvas = self.canvas.clone();
        let grid = query::grid(world);
        for cell in grid.cells().filter(|cell| cell.is_solid()) {
            if let Some(index) = grid.index(cell.coord()) {
                canvas[index] = SOLID;
            }
        }
        for agent in query::agents(world) {
            for waypoint in agent.path() {
                if let Some(index) = grid.index(*waypoint) {
                    canvas[index] = PATH;
                }
            }
        }
        for agent in query::agents(world) {
            let mut glyph = glyph(agent.kind());
            if agent.is_selected() {
                glyph = glyph.to_ascii_lowercase();
            }
            for cell in agent.cells() {
                if let Some(index) = grid.index(*cell) {
                    canvas[index] = glyph;
                }
            }
        }

        canvas
            .chunks(self.columns.max(1))
            .map(|row| String::from_utf8_lossy(row).into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl GridOverlay for AsciiOverlay {
    fn allocate(&mut self, width: u32, height: u32) -> bool {
        if self.cell_size == 0 {
            return false;
        }
        let (Ok(columns), Ok(rows)) = (
            usize::try_from(width / self.cell_size),
            usize::try_from(height / self.cell_size),
        ) else {
            return false;
        };
        self.columns = columns;
        self.rows = rows;
        self.canvas = vec![UNDRAWN; columns * rows];
        true
    }

    fn outline(&mut self, bounds: PixelRect) {
        let size = i64::from(self.cell_size);
        let (Ok(column), Ok(row)) = (
            usize::try_from(i64::from(bounds.x()) / size),
            usize::try_from(i64::from(bounds.y()) / size),
        ) else {
            return;
        };
        if column < self.columns && row < self.rows {
            self.canvas[row * self.columns + column] = OPEN;
        }
    }
}

const fn glyph(kind: AgentKind) -> u8 {
    match kind {
        AgentKind::Player => b'P',
        AgentKind::Melee => b'M',
        AgentKind::Ranged => b'R',
        AgentKind::Missile => b'*',
    }
}
