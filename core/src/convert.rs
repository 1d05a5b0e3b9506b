//! Conversions between world space, grid space and viewport window space.
//!
//! The grid lies on the world XZ plane: grid x follows world X and grid y
//! follows world Z. Every component goes through these functions so that a
//! world position always lands on the same cell.

use glam::Vec3;

use crate::{CellCoord, CellRect};

/// Maps a world position onto the cell that contains it.
///
/// Uses `floor`, so positions just west or south of the origin map to
/// negative coordinates instead of collapsing onto row or column zero.
#[must_use]
pub fn world_to_grid(world: Vec3, origin: Vec3, cell_size: f32) -> CellCoord {
    let local = world - origin;
    CellCoord::new(
        (local.x / cell_size).floor() as i32,
        (local.z / cell_size).floor() as i32,
    )
}

/// World position of the cell's south-west corner at the origin's height.
#[must_use]
pub fn grid_to_world_corner(cell: CellCoord, origin: Vec3, cell_size: f32) -> Vec3 {
    Vec3::new(
        origin.x + cell.x() as f32 * cell_size,
        origin.y,
        origin.z + cell.y() as f32 * cell_size,
    )
}

/// World position of the cell's centre at the origin's height.
#[must_use]
pub fn grid_to_world_center(cell: CellCoord, origin: Vec3, cell_size: f32) -> Vec3 {
    Vec3::new(
        origin.x + (cell.x() as f32 + 0.5) * cell_size,
        origin.y,
        origin.z + (cell.y() as f32 + 0.5) * cell_size,
    )
}

/// Reports whether the cell lies inside a grid of the given dimensions.
#[must_use]
pub fn is_in_bounds(cell: CellCoord, width: u32, height: u32) -> bool {
    u32::try_from(cell.x()).map_or(false, |x| x < width)
        && u32::try_from(cell.y()).map_or(false, |y| y < height)
}

/// Reports whether the world position falls on a cell of the grid.
#[must_use]
pub fn is_world_position_in_grid(
    world: Vec3,
    origin: Vec3,
    cell_size: f32,
    width: u32,
    height: u32,
) -> bool {
    is_in_bounds(world_to_grid(world, origin, cell_size), width, height)
}

/// Clamps the cell into `[0, width - 1] x [0, height - 1]`.
///
/// An empty axis clamps to zero.
#[must_use]
pub fn clamp(cell: CellCoord, width: u32, height: u32) -> CellCoord {
    CellCoord::new(clamp_axis(cell.x(), width), clamp_axis(cell.y(), height))
}

fn clamp_axis(value: i32, extent: u32) -> i32 {
    let max = i32::try_from(extent.saturating_sub(1)).unwrap_or(i32::MAX);
    value.clamp(0, max)
}

/// Grid cell shown at a window position.
///
/// Window row 0 is the northernmost row of `window`.
#[must_use]
pub fn window_to_grid(window: CellRect, view: CellCoord) -> CellCoord {
    let height = i32::try_from(window.size().height()).unwrap_or(i32::MAX);
    let origin = window.origin();
    CellCoord::new(
        origin.x().saturating_add(view.x()),
        origin
            .y()
            .saturating_add(height.saturating_sub(1).saturating_sub(view.y())),
    )
}

/// Window position of a grid cell, or `None` when `window` does not show it.
#[must_use]
pub fn grid_to_window(window: CellRect, cell: CellCoord) -> Option<CellCoord> {
    if !window.contains(cell) {
        return None;
    }
    let height = i32::try_from(window.size().height()).ok()?;
    let origin = window.origin();
    Some(CellCoord::new(
        cell.x() - origin.x(),
        origin.y() + height - 1 - cell.y(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellRectSize;

    #[test]
    fn negative_offsets_floor_to_negative_cells() {
        let cell = world_to_grid(Vec3::new(-0.1, 3.0, -2.5), Vec3::ZERO, 1.0);
        assert_eq!(cell, CellCoord::new(-1, -3));
        assert!(!is_in_bounds(cell, 10, 10));
    }

    #[test]
    fn conversion_ignores_world_height() {
        let origin = Vec3::new(10.0, 2.0, -4.0);
        let low = world_to_grid(Vec3::new(12.5, -50.0, -1.0), origin, 0.5);
        let high = world_to_grid(Vec3::new(12.5, 50.0, -1.0), origin, 0.5);
        assert_eq!(low, high);
        assert_eq!(low, CellCoord::new(5, 6));
    }

    #[test]
    fn centre_sits_half_a_cell_past_the_corner() {
        let origin = Vec3::new(1.0, 4.0, 2.0);
        let cell = CellCoord::new(3, 2);
        let corner = grid_to_world_corner(cell, origin, 2.0);
        let centre = grid_to_world_center(cell, origin, 2.0);
        assert_eq!(corner, Vec3::new(7.0, 4.0, 6.0));
        assert_eq!(centre, Vec3::new(8.0, 4.0, 7.0));
    }

    #[test]
    fn clamp_pins_each_axis_independently() {
        assert_eq!(clamp(CellCoord::new(-4, 12), 10, 8), CellCoord::new(0, 7));
        assert_eq!(clamp(CellCoord::new(3, 3), 0, 0), CellCoord::new(0, 0));
    }

    #[test]
    fn window_rows_run_north_to_south() {
        let window =
            CellRect::from_origin_and_size(CellCoord::new(4, 10), CellRectSize::new(3, 5));
        assert_eq!(
            window_to_grid(window, CellCoord::new(0, 0)),
            CellCoord::new(4, 14)
        );
        assert_eq!(
            window_to_grid(window, CellCoord::new(2, 4)),
            CellCoord::new(6, 10)
        );
        assert_eq!(
            grid_to_window(window, CellCoord::new(5, 14)),
            Some(CellCoord::new(1, 0))
        );
        assert_eq!(grid_to_window(window, CellCoord::new(7, 14)), None);
    }
}
