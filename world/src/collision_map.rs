//! Loader for comma-delimited collision maps.
//!
//! A collision map lists one integer token per cell in raster order: the
//! column index advances first and wraps to the next row after `columns`
//! tokens. Any non-zero value marks the cell solid.

use std::{fs::File, io::Read, path::Path};

use log::{debug, info};
use skirmish_core::CollisionMapError;

use crate::grid::Grid;

/// Longest token accepted, in bytes, including surrounding whitespace.
pub const MAX_TOKEN_LENGTH: usize = 7;

/// Summary of a loaded collision map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionSummary {
    /// Number of tokens applied to cells.
    pub applied: usize,
    /// Number of cells marked solid.
    pub solid: usize,
    /// Number of tokens beyond the grid that were ignored.
    pub ignored: usize,
}

/// Reads a collision map from `source` and marks the matching cells solid.
///
/// Tokens are parsed leniently: leading whitespace is skipped, an optional
/// sign and the leading digits are read, and anything else reads as zero.
/// A token longer than [`MAX_TOKEN_LENGTH`] bytes aborts the load. Extra
/// tokens are ignored and missing tokens leave cells open.
pub fn load(grid: &mut Grid, mut source: impl Read) -> Result<CollisionSummary, CollisionMapError> {
    let mut text = Vec::new();
    let _ = source.read_to_end(&mut text)?;

    let mut tokens: Vec<&[u8]> = text.split(|byte| *byte == b',').collect();
    if tokens
        .last()
        .is_some_and(|token| token.iter().all(u8::is_ascii_whitespace))
    {
        let _ = tokens.pop();
    }

    let mut summary = CollisionSummary {
        applied: 0,
        solid: 0,
        ignored: 0,
    };
    for (index, token) in tokens.into_iter().enumerate() {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(CollisionMapError::TokenTooLong {
                index,
                max: MAX_TOKEN_LENGTH,
            });
        }
        if index >= grid.len() {
            summary.ignored += 1;
            continue;
        }
        summary.applied += 1;
        if parse_lenient(token) != 0 {
            grid.set_solid(index);
            summary.solid += 1;
        }
    }

    if summary.ignored > 0 {
        debug!(
            "collision map carried {} tokens beyond the grid",
            summary.ignored
        );
    }
    info!(
        "collision map applied {} tokens, {} solid cells",
        summary.applied, summary.solid
    );
    Ok(summary)
}

/// Opens the file at `path` and loads it with [`load`].
pub fn load_file(grid: &mut Grid, path: &Path) -> Result<CollisionSummary, CollisionMapError> {
    let file = File::open(path)?;
    load(grid, file)
}

fn parse_lenient(token: &[u8]) -> i64 {
    let mut bytes = token
        .iter()
        .copied()
        .skip_while(u8::is_ascii_whitespace)
        .peekable();
    let negative = match bytes.peek() {
        Some(b'-') => {
            let _ = bytes.next();
            true
        }
        Some(b'+') => {
            let _ = bytes.next();
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for byte in bytes {
        if !byte.is_ascii_digit() {
            break;
        }
        value = value * 10 + i64::from(byte - b'0');
    }

    if negative {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::NoOverlay;
    use skirmish_core::CellCoord;

    fn small_grid() -> Grid {
        Grid::build(64, 48, 16, &mut NoOverlay).expect("grid builds")
    }

    #[test]
    fn tokens_fill_columns_before_rows() {
        let mut grid = small_grid();
        let summary = load(&mut grid, "0,1,0,0,\n0,0,0,7,\n1,0,0,0".as_bytes()).expect("loads");

        assert_eq!(summary.applied, 12);
        assert_eq!(summary.solid, 3);
        assert!(grid.is_solid(CellCoord::new(1, 0)));
        assert!(grid.is_solid(CellCoord::new(3, 1)));
        assert!(grid.is_solid(CellCoord::new(0, 2)));
        assert!(!grid.is_solid(CellCoord::new(0, 1)));
    }

    #[test]
    fn lenient_parse_reads_garbage_as_open() {
        assert_eq!(parse_lenient(b"  42"), 42);
        assert_eq!(parse_lenient(b"\n-3x"), -3);
        assert_eq!(parse_lenient(b"+5"), 5);
        assert_eq!(parse_lenient(b"abc"), 0);
        assert_eq!(parse_lenient(b""), 0);
    }

    #[test]
    fn extra_tokens_are_ignored_and_missing_tokens_stay_open() {
        let mut grid = small_grid();
        let long = vec!["1"; 20].join(",");
        let summary = load(&mut grid, long.as_bytes()).expect("loads");
        assert_eq!(summary.applied, 12);
        assert_eq!(summary.ignored, 8);

        let mut sparse = small_grid();
        let summary = load(&mut sparse, "1,1".as_bytes()).expect("loads");
        assert_eq!(summary.solid, 2);
        assert!(!sparse.is_solid(CellCoord::new(3, 2)));
    }

    #[test]
    fn trailing_delimiter_is_tolerated() {
        let mut grid = small_grid();
        let summary = load(&mut grid, "0,0,1,\n".as_bytes()).expect("loads");
        assert_eq!(summary.applied, 3);
        assert!(grid.is_solid(CellCoord::new(2, 0)));
    }

    #[test]
    fn overlong_token_fails_the_load() {
        let mut grid = small_grid();
        let error = load(&mut grid, "0,12345678,0".as_bytes()).expect_err("rejects token");
        assert!(matches!(
            error,
            CollisionMapError::TokenTooLong { index: 1, max: 7 }
        ));
    }

    #[test]
    fn missing_file_reports_io_failure() {
        let mut grid = small_grid();
        let error = load_file(&mut grid, Path::new("does/not/exist.txt")).expect_err("no file");
        assert!(matches!(error, CollisionMapError::Io(_)));
    }
}
