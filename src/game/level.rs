//! Parsed Level Input
//!
//! The surface the external map parser feeds the runtime: grid dimensions,
//! cell kinds, cell size, and initial entity spawn descriptors. The source
//! file format (TMX or otherwise) is the parser's concern; this module only
//! validates and holds the parsed result.
//!
//! The ASCII builder exists for tests and the demo binary, which have no
//! parser to lean on.

use serde::{Deserialize, Serialize};

use crate::core::fixed::Fixed;
use crate::game::grid::{CellKind, LevelError, TileGrid};

/// Initial entity placement, as parsed from the level source.
///
/// The kind is a name string so a level file can reference kinds this build
/// does not know; such spawns are rejected at world creation, not here.
/// `x`/`y` anchor the entity's bottom-left corner (its feet), so a spawn
/// sits on the cell floor regardless of the kind's height.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpawnDescriptor {
    /// Entity kind name (e.g. "player", "walker")
    pub kind: String,
    /// World x of the bottom-left anchor
    pub x: Fixed,
    /// World y of the bottom-left anchor
    pub y: Fixed,
}

/// A parsed level: everything the runtime needs to start a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelData {
    /// Level identifier (carried into save states)
    pub id: String,
    /// Grid width in cells
    pub width: i32,
    /// Grid height in cells
    pub height: i32,
    /// World units per cell
    pub cell_size: Fixed,
    /// Row-major cell kinds, `width * height` entries
    pub cells: Vec<CellKind>,
    /// Treat rows below the grid as open air (falling out is lethal)
    pub open_bottom: bool,
    /// Initial entity placements
    pub spawns: Vec<SpawnDescriptor>,
}

impl LevelData {
    /// Validate and build the immutable grid.
    pub fn build_grid(&self) -> Result<TileGrid, LevelError> {
        TileGrid::new(
            self.width,
            self.height,
            self.cell_size,
            self.cells.clone(),
            self.open_bottom,
        )
    }

    /// Decode a level from the JSON interchange form the map parser emits.
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let level: LevelData = serde_json::from_str(json)
            .map_err(|e| LevelError::InvalidMapData(format!("level json: {}", e)))?;
        // Surface geometry problems at parse time, not first query
        level.build_grid()?;
        Ok(level)
    }

    /// Encode to the JSON interchange form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Build a level from ASCII art rows.
    ///
    /// Cell characters: `.` empty, `#` solid, `-` one-way platform,
    /// `^` hazard, `!` trigger. Entity characters place a spawn anchored to
    /// the bottom of that cell and leave the cell empty: `P` player,
    /// `W` walker, `C` charger, `*` projectile, `o` pickup.
    pub fn from_ascii(
        id: &str,
        cell_size: Fixed,
        open_bottom: bool,
        rows: &[&str],
    ) -> Result<Self, LevelError> {
        if rows.is_empty() {
            return Err(LevelError::InvalidMapData("empty ascii level".into()));
        }
        let width = rows[0].chars().count() as i32;
        let height = rows.len() as i32;
        let mut cells = Vec::with_capacity((width * height) as usize);
        let mut spawns = Vec::new();

        for (row_idx, row) in rows.iter().enumerate() {
            if row.chars().count() as i32 != width {
                return Err(LevelError::InvalidMapData(format!(
                    "ascii row {} has length {}, expected {}",
                    row_idx,
                    row.chars().count(),
                    width
                )));
            }
            for (col_idx, ch) in row.chars().enumerate() {
                let spawn_kind = match ch {
                    'P' => Some("player"),
                    'W' => Some("walker"),
                    'C' => Some("charger"),
                    '*' => Some("projectile"),
                    'o' => Some("pickup"),
                    _ => None,
                };
                if let Some(kind) = spawn_kind {
                    spawns.push(SpawnDescriptor {
                        kind: kind.to_string(),
                        x: (col_idx as i64 * cell_size as i64) as Fixed,
                        y: ((row_idx as i64 + 1) * cell_size as i64) as Fixed,
                    });
                    cells.push(CellKind::Empty);
                    continue;
                }
                let kind = match ch {
                    '.' | ' ' => CellKind::Empty,
                    '#' => CellKind::Solid,
                    '-' => CellKind::Platform,
                    '^' => CellKind::Hazard,
                    '!' => CellKind::Trigger,
                    other => {
                        return Err(LevelError::InvalidMapData(format!(
                            "unknown ascii cell '{}' at {},{}",
                            other, col_idx, row_idx
                        )))
                    }
                };
                cells.push(kind);
            }
        }

        Ok(Self {
            id: id.to_string(),
            width,
            height,
            cell_size,
            cells,
            open_bottom,
            spawns,
        })
    }
}
