//! Tile Grid
//!
//! Immutable spatial index of the level geometry, one cell kind per grid
//! cell. Built once at level load and queried by the collision resolver;
//! there are no mutation operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::fixed::Fixed;

/// Error raised when a parsed level cannot back a grid.
#[derive(Debug, Error)]
pub enum LevelError {
    /// The grid dimensions, cell size, or cell payload are degenerate.
    #[error("invalid map data: {0}")]
    InvalidMapData(String),
}

/// Kind of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellKind {
    /// Passable air
    Empty = 0,
    /// Blocks motion on every axis
    Solid = 1,
    /// One-way platform: blocks downward motion from above only
    Platform = 2,
    /// Passable, lethal on contact
    Hazard = 3,
    /// Passable, reported to the game-logic layer on contact
    Trigger = 4,
}

impl CellKind {
    /// Does this cell block motion on both axes?
    #[inline]
    pub fn is_solid(self) -> bool {
        matches!(self, CellKind::Solid)
    }

    /// Can this cell support an entity standing on its top edge?
    #[inline]
    pub fn supports(self) -> bool {
        matches!(self, CellKind::Solid | CellKind::Platform)
    }

    /// Is contact with this cell reported as an event?
    #[inline]
    pub fn is_event(self) -> bool {
        matches!(self, CellKind::Hazard | CellKind::Trigger)
    }
}

/// Immutable tile grid.
///
/// Coordinates outside the grid read as `Solid` (the world boundary), with
/// one exception: when the level is built with `open_bottom`, rows below the
/// grid read as `Empty` so entities can fall out of the world.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileGrid {
    width: i32,
    height: i32,
    cell_size: Fixed,
    open_bottom: bool,
    cells: Vec<CellKind>,
}

impl TileGrid {
    /// Build a grid from parsed level geometry.
    ///
    /// Fails with `InvalidMapData` if the dimensions or cell size are not
    /// positive, or if the cell payload does not match the dimensions.
    pub fn new(
        width: i32,
        height: i32,
        cell_size: Fixed,
        cells: Vec<CellKind>,
        open_bottom: bool,
    ) -> Result<Self, LevelError> {
        if width <= 0 || height <= 0 {
            return Err(LevelError::InvalidMapData(format!(
                "grid dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if cell_size <= 0 {
            return Err(LevelError::InvalidMapData(format!(
                "cell size must be positive, got {}",
                cell_size
            )));
        }
        if cells.len() != (width as usize) * (height as usize) {
            return Err(LevelError::InvalidMapData(format!(
                "expected {} cells for a {}x{} grid, got {}",
                width * height,
                width,
                height,
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cell_size,
            open_bottom,
            cells,
        })
    }

    /// Grid width in cells.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// World units per cell.
    #[inline]
    pub fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    /// Whether rows below the grid are open (fall-out) instead of solid.
    #[inline]
    pub fn open_bottom(&self) -> bool {
        self.open_bottom
    }

    /// World-space extent of the grid on the y axis.
    #[inline]
    pub fn world_height(&self) -> Fixed {
        (self.height as i64 * self.cell_size as i64) as Fixed
    }

    /// World-space extent of the grid on the x axis.
    #[inline]
    pub fn world_width(&self) -> Fixed {
        (self.width as i64 * self.cell_size as i64) as Fixed
    }

    /// Cell kind at grid coordinates.
    ///
    /// Out-of-bounds coordinates read as `Solid` - the world edge is a
    /// normal condition, never an error. Rows below an `open_bottom` grid
    /// read as `Empty`.
    #[inline]
    pub fn cell_at(&self, col: i32, row: i32) -> CellKind {
        if row >= self.height && self.open_bottom {
            return CellKind::Empty;
        }
        if col < 0 || row < 0 || col >= self.width || row >= self.height {
            return CellKind::Solid;
        }
        self.cells[(row as usize) * (self.width as usize) + (col as usize)]
    }

    /// Grid column containing world x.
    ///
    /// Floored division: negative coordinates round toward negative
    /// infinity, not toward zero. Exact because the Q16.16 scale factor
    /// cancels out of the ratio.
    #[inline]
    pub fn col_at(&self, x: Fixed) -> i32 {
        (x as i64).div_euclid(self.cell_size as i64) as i32
    }

    /// Grid row containing world y.
    #[inline]
    pub fn row_at(&self, y: Fixed) -> i32 {
        (y as i64).div_euclid(self.cell_size as i64) as i32
    }

    /// Grid coordinates of a world position.
    #[inline]
    pub fn world_to_cell(&self, x: Fixed, y: Fixed) -> (i32, i32) {
        (self.col_at(x), self.row_at(y))
    }

    /// World x of the left edge of a column.
    #[inline]
    pub fn col_edge(&self, col: i32) -> Fixed {
        (col as i64 * self.cell_size as i64) as Fixed
    }

    /// World y of the top edge of a row.
    #[inline]
    pub fn row_edge(&self, row: i32) -> Fixed {
        (row as i64 * self.cell_size as i64) as Fixed
    }

    /// Does an axis-aligned rectangle overlap any `Solid` cell?
    ///
    /// Open-interval overlap: a rectangle whose edge exactly touches a cell
    /// boundary does not overlap the cell beyond it. Platforms are excluded
    /// here; they only block the downward sweep in the resolver.
    pub fn is_solid_region(&self, x: Fixed, y: Fixed, w: Fixed, h: Fixed) -> bool {
        if w <= 0 || h <= 0 {
            return false;
        }
        let col_min = self.col_at(x);
        let col_max = self.col_at(x.wrapping_add(w).wrapping_sub(1));
        let row_min = self.row_at(y);
        let row_max = self.row_at(y.wrapping_add(h).wrapping_sub(1));
        for row in row_min..=row_max {
            for col in col_min..=col_max {
                if self.cell_at(col, row).is_solid() {
                    return true;
                }
            }
        }
        false
    }
}

// =============================================================================
// TESTS
// =============================================================================
