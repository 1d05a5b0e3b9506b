//! Cell span covered by a scene object.

use minimap_core::{CellCoord, GridGeometry, ObjectKind, SceneObject};

use crate::object_bounds;

/// Inclusive rectangle of cells covered by an object, possibly extending
/// past the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Footprint {
    min: CellCoord,
    max: CellCoord,
}

impl Footprint {
    /// Maps the object's bounds onto the grid.
    ///
    /// Walls are thinned to a single cell line along their longer axis:
    /// a span at least as wide as it is tall collapses onto its minimum row,
    /// anything else onto its minimum column.
    #[must_use]
    pub fn of(object: &SceneObject, geometry: &GridGeometry) -> Self {
        let bounds = object_bounds(object, geometry.cell_size());
        let min = geometry.world_to_grid(bounds.min());
        let mut max = geometry.world_to_grid(bounds.max());
        if object.kind == ObjectKind::Wall {
            let width = i64::from(max.x()) - i64::from(min.x());
            let height = i64::from(max.y()) - i64::from(min.y());
            max = if width >= height {
                CellCoord::new(max.x(), min.y())
            } else {
                CellCoord::new(min.x(), max.y())
            };
        }
        Self { min, max }
    }

    /// Minimum (south-west) cell.
    #[must_use]
    pub const fn min(&self) -> CellCoord {
        self.min
    }

    /// Maximum (north-east) cell.
    #[must_use]
    pub const fn max(&self) -> CellCoord {
        self.max
    }

    /// Number of cells in the span, counting those outside the grid.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        let columns = i64::from(self.max.x()) - i64::from(self.min.x()) + 1;
        let rows = i64::from(self.max.y()) - i64::from(self.min.y()) + 1;
        let columns = u64::try_from(columns.max(0)).unwrap_or(0);
        let rows = u64::try_from(rows.max(0)).unwrap_or(0);
        columns.saturating_mul(rows)
    }

    /// Every cell of the span, row by row from south to north.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let (min, max) = (self.min, self.max);
        (min.y()..=max.y()).flat_map(move |y| (min.x()..=max.x()).map(move |x| CellCoord::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use minimap_core::{EntityHandle, Transform, WorldBounds};

    fn object(kind: ObjectKind, min: Vec3, max: Vec3) -> SceneObject {
        SceneObject {
            handle: EntityHandle::new(1),
            kind,
            bounds: Some(WorldBounds::from_corners(min, max)),
            transform: Transform::IDENTITY,
        }
    }

    fn geometry() -> GridGeometry {
        GridGeometry::new(20, 20, 1.0, Vec3::ZERO)
    }

    #[test]
    fn horizontal_wall_collapses_to_min_row() {
        let wall = object(
            ObjectKind::Wall,
            Vec3::new(1.2, 0.0, 3.1),
            Vec3::new(6.8, 2.0, 4.9),
        );
        let footprint = Footprint::of(&wall, &geometry());
        assert_eq!(footprint.min(), CellCoord::new(1, 3));
        assert_eq!(footprint.max(), CellCoord::new(6, 3));
        assert_eq!(footprint.cell_count(), 6);
    }

    #[test]
    fn vertical_wall_collapses_to_min_column() {
        let wall = object(
            ObjectKind::Wall,
            Vec3::new(2.3, 0.0, 0.5),
            Vec3::new(3.7, 2.0, 8.5),
        );
        let footprint = Footprint::of(&wall, &geometry());
        assert_eq!(footprint.min(), CellCoord::new(2, 0));
        assert_eq!(footprint.max(), CellCoord::new(2, 8));
    }

    #[test]
    fn square_wall_counts_as_horizontal() {
        let wall = object(
            ObjectKind::Wall,
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(2.5, 1.0, 2.5),
        );
        let footprint = Footprint::of(&wall, &geometry());
        assert_eq!(footprint.max(), CellCoord::new(2, 0));
    }

    #[test]
    fn floors_keep_their_full_area() {
        let slab = object(
            ObjectKind::Floor,
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(2.5, 0.1, 3.5),
        );
        let footprint = Footprint::of(&slab, &geometry());
        assert_eq!(footprint.cell_count(), 12);
        assert_eq!(footprint.cells().count(), 12);
        assert_eq!(footprint.cells().next(), Some(CellCoord::new(0, 0)));
    }

    #[test]
    fn cell_count_saturates_for_unbounded_spans() {
        let floor = object(
            ObjectKind::Floor,
            Vec3::new(-1.0e10, 0.0, -1.0e10),
            Vec3::new(1.0e10, 1.0, 1.0e10),
        );
        let footprint = Footprint::of(&floor, &geometry());
        assert_eq!(footprint.min(), CellCoord::new(i32::MIN, i32::MIN));
        assert_eq!(footprint.cell_count(), u64::MAX);
    }
}
