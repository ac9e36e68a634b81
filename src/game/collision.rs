//! Collision Resolution
//!
//! Converts an intended displacement into a collision-corrected one against
//! the tile grid. The two axes resolve independently - horizontal first,
//! then vertical from the post-horizontal box - so a fast diagonal mover
//! cannot cut a corner through two cells.
//!
//! All overlap tests use open intervals: a box whose edge exactly touches a
//! cell boundary does not overlap the cell beyond it, so resting contact
//! never sticks. Clamping lands exactly on cell boundaries because the
//! arithmetic is fixed-point; no binary search is needed for sub-cell
//! precision.

use serde::{Deserialize, Serialize};

use crate::core::fixed::{fixed_min, Fixed};
use crate::core::vec2::FixedVec2;
use crate::game::grid::{CellKind, TileGrid};

/// Axis-aligned bounding box, top-left anchored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aabb {
    /// Left edge
    pub x: Fixed,
    /// Top edge
    pub y: Fixed,
    /// Width (> 0)
    pub w: Fixed,
    /// Height (> 0)
    pub h: Fixed,
}

impl Aabb {
    /// Construct a box.
    pub const fn new(x: Fixed, y: Fixed, w: Fixed, h: Fixed) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> Fixed {
        self.x.wrapping_add(self.w)
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> Fixed {
        self.y.wrapping_add(self.h)
    }
}

/// Which grid surfaces the box ended the tick touching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFlags {
    /// Resting on a solid or platform cell below
    pub on_ground: bool,
    /// Hit a solid cell above while rising
    pub on_ceiling: bool,
    /// Hit a solid cell on the left while moving left
    pub on_left_wall: bool,
    /// Hit a solid cell on the right while moving right
    pub on_right_wall: bool,
}

/// A non-blocking special cell the box swept through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellTouch {
    /// Grid column
    pub col: i32,
    /// Grid row
    pub row: i32,
    /// Hazard or Trigger
    pub kind: CellKind,
}

/// Output of one resolution: the corrected displacement, contact flags, and
/// the hazard/trigger cells encountered along the path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionResult {
    /// Collision-corrected displacement to apply this tick
    pub displacement: FixedVec2,
    /// Surfaces in contact after the move
    pub contacts: ContactFlags,
    /// Hazard/trigger cells swept through, in scan order, deduplicated
    pub cell_events: Vec<CellTouch>,
}

impl CollisionResult {
    /// Was a hazard cell swept through?
    pub fn touched_hazard(&self) -> bool {
        self.cell_events.iter().any(|t| t.kind == CellKind::Hazard)
    }
}

/// Resolve an intended displacement for a box against the grid.
///
/// The returned displacement never moves the box into overlap with a solid
/// cell. `delta` is the full intended motion for the tick (velocity x dt).
/// One-way platforms block the downward sweep only when the box's bottom
/// edge starts at or above the platform top, so upward and lateral motion
/// pass through them.
pub fn resolve(grid: &TileGrid, aabb: Aabb, delta: FixedVec2) -> CollisionResult {
    let mut contacts = ContactFlags::default();
    let mut cell_events = Vec::new();

    // Horizontal pass over the rows the box spans
    let dx = sweep_horizontal(grid, &aabb, delta.x, &mut contacts);
    let moved = Aabb {
        x: aabb.x.wrapping_add(dx),
        ..aabb
    };
    collect_cell_events(
        grid,
        fixed_min(aabb.x, moved.x),
        aabb.y,
        aabb.w.wrapping_add(dx.abs()),
        aabb.h,
        &mut cell_events,
    );

    // Vertical pass from the post-horizontal box; the tick-start bottom
    // edge decides whether a platform blocks
    let dy = sweep_vertical(grid, &moved, delta.y, aabb.bottom(), &mut contacts);
    let settled = Aabb {
        y: moved.y.wrapping_add(dy),
        ..moved
    };
    collect_cell_events(
        grid,
        moved.x,
        fixed_min(moved.y, settled.y),
        moved.w,
        moved.h.wrapping_add(dy.abs()),
        &mut cell_events,
    );

    // Zero-distance ground probe: supports standing detection even when
    // the vertical velocity is already zero
    contacts.on_ground = standing_on_support(grid, &settled);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        ?delta,
        dx,
        dy,
        ?contacts,
        touches = cell_events.len(),
        "resolved sweep"
    );

    CollisionResult {
        displacement: FixedVec2::new(dx, dy),
        contacts,
        cell_events,
    }
}

/// Clamp a horizontal displacement against solid columns.
///
/// Scans candidate columns outward from the leading edge; the first column
/// containing a solid cell in the box's row span clamps the edge exactly to
/// that column's boundary.
fn sweep_horizontal(grid: &TileGrid, aabb: &Aabb, dx: Fixed, contacts: &mut ContactFlags) -> Fixed {
    if dx == 0 {
        return 0;
    }
    let row_min = grid.row_at(aabb.y);
    let row_max = grid.row_at(aabb.bottom().wrapping_sub(1));

    if dx > 0 {
        let right = aabb.right();
        let first = grid.col_at(right.wrapping_sub(1)) + 1;
        let last = grid.col_at(right.wrapping_add(dx).wrapping_sub(1));
        for col in first..=last {
            if column_has_solid(grid, col, row_min, row_max) {
                contacts.on_right_wall = true;
                return (grid.col_edge(col).wrapping_sub(right)).max(0);
            }
        }
        dx
    } else {
        let left = aabb.x;
        let first = grid.col_at(left) - 1;
        let last = grid.col_at(left.wrapping_add(dx));
        for col in (last..=first).rev() {
            if column_has_solid(grid, col, row_min, row_max) {
                contacts.on_left_wall = true;
                return (grid.col_edge(col + 1).wrapping_sub(left)).min(0);
            }
        }
        dx
    }
}

/// Clamp a vertical displacement against solid rows (and, downward only,
/// one-way platforms whose top the box started at or above).
fn sweep_vertical(
    grid: &TileGrid,
    aabb: &Aabb,
    dy: Fixed,
    start_bottom: Fixed,
    contacts: &mut ContactFlags,
) -> Fixed {
    if dy == 0 {
        return 0;
    }
    let col_min = grid.col_at(aabb.x);
    let col_max = grid.col_at(aabb.right().wrapping_sub(1));

    if dy > 0 {
        let bottom = aabb.bottom();
        let first = grid.row_at(bottom.wrapping_sub(1)) + 1;
        let last = grid.row_at(bottom.wrapping_add(dy).wrapping_sub(1));
        for row in first..=last {
            if row_blocks_downward(grid, row, col_min, col_max, start_bottom) {
                return (grid.row_edge(row).wrapping_sub(bottom)).max(0);
            }
        }
        dy
    } else {
        let top = aabb.y;
        let first = grid.row_at(top) - 1;
        let last = grid.row_at(top.wrapping_add(dy));
        for row in (last..=first).rev() {
            if row_has_solid(grid, row, col_min, col_max) {
                contacts.on_ceiling = true;
                return (grid.row_edge(row + 1).wrapping_sub(top)).min(0);
            }
        }
        dy
    }
}

fn column_has_solid(grid: &TileGrid, col: i32, row_min: i32, row_max: i32) -> bool {
    (row_min..=row_max).any(|row| grid.cell_at(col, row).is_solid())
}

fn row_has_solid(grid: &TileGrid, row: i32, col_min: i32, col_max: i32) -> bool {
    (col_min..=col_max).any(|col| grid.cell_at(col, row).is_solid())
}

fn row_blocks_downward(
    grid: &TileGrid,
    row: i32,
    col_min: i32,
    col_max: i32,
    start_bottom: Fixed,
) -> bool {
    (col_min..=col_max).any(|col| match grid.cell_at(col, row) {
        CellKind::Solid => true,
        // One-way: only from at-or-above the platform top
        CellKind::Platform => start_bottom <= grid.row_edge(row),
        _ => false,
    })
}

/// Is the box resting exactly on a supporting cell?
///
/// True only when the bottom edge sits on a row boundary and the row below
/// contains a solid or platform cell within the box's column span.
fn standing_on_support(grid: &TileGrid, aabb: &Aabb) -> bool {
    let bottom = aabb.bottom();
    let row = grid.row_at(bottom.wrapping_sub(1)) + 1;
    if grid.row_edge(row) != bottom {
        return false;
    }
    let col_min = grid.col_at(aabb.x);
    let col_max = grid.col_at(aabb.right().wrapping_sub(1));
    (col_min..=col_max).any(|col| grid.cell_at(col, row).supports())
}

/// Gather hazard/trigger cells inside a swept rectangle.
fn collect_cell_events(
    grid: &TileGrid,
    x: Fixed,
    y: Fixed,
    w: Fixed,
    h: Fixed,
    out: &mut Vec<CellTouch>,
) {
    if w <= 0 || h <= 0 {
        return;
    }
    let col_min = grid.col_at(x);
    let col_max = grid.col_at(x.wrapping_add(w).wrapping_sub(1));
    let row_min = grid.row_at(y);
    let row_max = grid.row_at(y.wrapping_add(h).wrapping_sub(1));
    for row in row_min..=row_max {
        for col in col_min..=col_max {
            let kind = grid.cell_at(col, row);
            if kind.is_event() && !out.iter().any(|t| t.col == col && t.row == row) {
                out.push(CellTouch { col, row, kind });
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{fixed_mul, from_int, to_fixed, TICK_DT};
    use crate::game::level::LevelData;

    fn grid_from(rows: &[&str]) -> TileGrid {
        LevelData::from_ascii("t", from_int(16), false, rows)
            .unwrap()
            .build_grid()
            .unwrap()
    }

    /// Spec scenario: standing entity with downward velocity clamps the fall
    /// to zero at the row-1 top edge and reports ground contact.
    #[test]
    fn test_fall_clamps_on_solid_row() {
        let grid = grid_from(&[
            "....", //
            "####", //
            "....",
        ]);
        // 12x16 box at origin: bottom edge exactly on row 1's top edge
        let aabb = Aabb::new(0, 0, from_int(12), from_int(16));
        // 50 units/s downward for one tick
        let dy = fixed_mul(to_fixed(50.0), TICK_DT);
        assert!(dy > 0);

        let result = resolve(&grid, aabb, FixedVec2::new(0, dy));
        assert_eq!(result.displacement.y, 0);
        assert!(result.contacts.on_ground);
    }

    #[test]
    fn test_fall_lands_exactly_on_boundary() {
        let grid = grid_from(&[
            "....", //
            "....", //
            "####",
        ]);
        // Box 10 units above the floor, falling 20 per tick
        let aabb = Aabb::new(0, from_int(6), from_int(12), from_int(16));
        let result = resolve(&grid, aabb, FixedVec2::new(0, from_int(20)));
        // Clamped so the bottom edge lands on the solid row's top (y=32)
        assert_eq!(result.displacement.y, from_int(10));
        assert!(result.contacts.on_ground);
    }

    /// Spec scenario: crossing two cells in one tick with the second solid
    /// clamps to the first cell's far boundary, not the full delta.
    #[test]
    fn test_horizontal_clamp_at_second_cell() {
        let grid = grid_from(&[
            "..#.", //
            "####",
        ]);
        // 12x16 box at origin; cell 1 of row 0 free, cell 2 solid
        let aabb = Aabb::new(0, 0, from_int(12), from_int(16));
        let result = resolve(&grid, aabb, FixedVec2::new(from_int(24), 0));
        // Right edge (12) clamps to the col-2 boundary (32): 20, not 24
        assert_eq!(result.displacement.x, from_int(20));
        assert!(result.contacts.on_right_wall);
        assert!(!result.contacts.on_left_wall);
    }

    #[test]
    fn test_left_wall_contact() {
        let grid = grid_from(&[
            "#...", //
            "####",
        ]);
        let aabb = Aabb::new(from_int(20), 0, from_int(12), from_int(16));
        let result = resolve(&grid, aabb, FixedVec2::new(-from_int(30), 0));
        // Left edge (20) clamps to the col-0 right boundary (16): -4
        assert_eq!(result.displacement.x, -from_int(4));
        assert!(result.contacts.on_left_wall);
    }

    #[test]
    fn test_ceiling_contact() {
        let grid = grid_from(&[
            "####", //
            "....", //
            "####",
        ]);
        let aabb = Aabb::new(0, from_int(20), from_int(12), from_int(10));
        let result = resolve(&grid, aabb, FixedVec2::new(0, -from_int(30)));
        // Top edge (20) clamps to row 0's bottom boundary (16): -4
        assert_eq!(result.displacement.y, -from_int(4));
        assert!(result.contacts.on_ceiling);
    }

    #[test]
    fn test_zero_delta_idempotent() {
        let grid = grid_from(&[
            ".^..", //
            "####",
        ]);
        let aabb = Aabb::new(from_int(6), 0, from_int(12), from_int(16));
        let first = resolve(&grid, aabb, FixedVec2::ZERO);
        let second = resolve(&grid, aabb, FixedVec2::ZERO);
        assert_eq!(first, second);
        assert_eq!(first.displacement, FixedVec2::ZERO);
        assert!(first.contacts.on_ground);
        // At-rest overlap with the hazard cell is still reported
        assert!(first.touched_hazard());
    }

    #[test]
    fn test_platform_blocks_only_from_above() {
        let grid = grid_from(&[
            "....", //
            "----", //
            "....",
        ]);

        // From above: bottom edge (16) at the platform top blocks the fall
        let above = Aabb::new(0, from_int(4), from_int(12), from_int(12));
        let result = resolve(&grid, above, FixedVec2::new(0, from_int(20)));
        assert_eq!(result.displacement.y, 0);
        assert!(result.contacts.on_ground);

        // From below: rising through the platform is free
        let below = Aabb::new(0, from_int(34), from_int(12), from_int(12));
        let result = resolve(&grid, below, FixedVec2::new(0, -from_int(20)));
        assert_eq!(result.displacement.y, -from_int(20));
        assert!(!result.contacts.on_ceiling);

        // Starting with the feet below the platform top (mid pass-through),
        // falling continues instead of snapping onto the platform
        let inside = Aabb::new(0, from_int(10), from_int(12), from_int(12));
        let result = resolve(&grid, inside, FixedVec2::new(0, from_int(4)));
        assert_eq!(result.displacement.y, from_int(4));
    }

    #[test]
    fn test_hazard_and_trigger_swept_not_blocking() {
        let grid = grid_from(&[
            ".^!.", //
            "####",
        ]);
        let aabb = Aabb::new(0, 0, from_int(12), from_int(16));
        let result = resolve(&grid, aabb, FixedVec2::new(from_int(40), 0));
        // Full displacement: hazard/trigger never block
        assert_eq!(result.displacement.x, from_int(40));
        let kinds: Vec<_> = result.cell_events.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&CellKind::Hazard));
        assert!(kinds.contains(&CellKind::Trigger));
    }

    #[test]
    fn test_world_edges_are_walls() {
        let grid = grid_from(&[
            "....", //
            "####",
        ]);
        let aabb = Aabb::new(from_int(2), 0, from_int(12), from_int(16));

        let left = resolve(&grid, aabb, FixedVec2::new(-from_int(50), 0));
        assert_eq!(left.displacement.x, -from_int(2));
        assert!(left.contacts.on_left_wall);

        let right = resolve(&grid, aabb, FixedVec2::new(from_int(100), 0));
        // Right edge (14) clamps to the grid's right boundary (64)
        assert_eq!(right.displacement.x, from_int(50));
        assert!(right.contacts.on_right_wall);
    }

    #[test]
    fn test_diagonal_resolves_axes_independently() {
        let grid = grid_from(&[
            "..#.", //
            "....", //
            "####",
        ]);
        // Moving right and down; wall at col 2 of row 0, floor at row 2
        let aabb = Aabb::new(0, from_int(4), from_int(12), from_int(12));
        let result = resolve(&grid, aabb, FixedVec2::new(from_int(30), from_int(30)));
        // X clamps at the col-2 boundary (32 - 12 = 20) because at X-resolve
        // time the box still spans row 0
        assert_eq!(result.displacement.x, from_int(20));
        // Y then clamps at the floor (32 - 16 = 16)
        assert_eq!(result.displacement.y, from_int(16));
        assert!(result.contacts.on_right_wall);
        assert!(result.contacts.on_ground);
    }

    proptest::proptest! {
        // The grid is small and solid-bordered, so a large share of sampled
        // start positions overlap a solid cell and are rejected by the
        // `prop_assume!` below. Raise the reject budget so the invariant can
        // still reach its success target instead of aborting on rejects.
        #![proptest_config(proptest::prelude::ProptestConfig { max_global_rejects: 100_000, ..proptest::prelude::ProptestConfig::default() })]
        /// Core safety invariant: whatever the intended displacement, the
        /// resolved box never overlaps a solid cell.
        #[test]
        fn prop_resolved_box_never_overlaps_solid(
            x in -from_int(40)..from_int(100),
            y in -from_int(40)..from_int(60),
            dx in -from_int(80)..from_int(80),
            dy in -from_int(80)..from_int(80),
        ) {
            let grid = grid_from(&[
                "......",
                "..##..",
                "......",
                "######",
            ]);
            let aabb = Aabb::new(x, y, from_int(12), from_int(14));
            // Only start from non-overlapping positions; overlap recovery
            // is the world's job, not the resolver's
            proptest::prop_assume!(!grid.is_solid_region(aabb.x, aabb.y, aabb.w, aabb.h));

            let result = resolve(&grid, aabb, FixedVec2::new(dx, dy));
            let fx = aabb.x.wrapping_add(result.displacement.x);
            let fy = aabb.y.wrapping_add(result.displacement.y);
            proptest::prop_assert!(!grid.is_solid_region(fx, fy, aabb.w, aabb.h));
        }

        /// Resolving a zero displacement twice yields identical results.
        #[test]
        fn prop_zero_delta_idempotent(
            x in -from_int(20)..from_int(80),
            y in -from_int(20)..from_int(50),
        ) {
            let grid = grid_from(&[
                "......",
                ".^..!.",
                "######",
            ]);
            let aabb = Aabb::new(x, y, from_int(10), from_int(10));
            let first = resolve(&grid, aabb, FixedVec2::ZERO);
            let second = resolve(&grid, aabb, FixedVec2::ZERO);
            proptest::prop_assert_eq!(first, second);
        }
    }
}
