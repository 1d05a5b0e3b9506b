#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scene scanner that rasterizes world geometry into the minimap grid.
//!
//! A scan resets the grid, writes every floor object, then every wall object
//! thinned to a single cell line, and finally prunes the one-cell stubs that
//! overlapping walls leave behind at junctions.

pub mod footprint;
pub mod prune;

use glam::Vec3;
use minimap_core::{
    capability::{CellPainter, SceneQuery},
    CellCoord, CellType, Event, GridGeometry, ObjectKind, SceneObject, WorldBounds,
};
use minimap_grid::{GridModel, GridSettings, GridSetupError};
use serde::{Deserialize, Serialize};

pub use footprint::Footprint;

const DEFAULT_MAX_CELLS_PER_OBJECT: u64 = 10_000;

/// Scanner configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Grid placement and resolution used when a scan resets the grid.
    pub grid: GridSettings,
    /// Objects covering more cells than this are skipped.
    pub max_cells_per_object: u64,
    /// Whether one-cell wall stubs at junctions are reclassified as floor.
    pub prune_stubs: bool,
    /// Whether the grid origin is derived from the floor bounds on each scan.
    pub auto_origin: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            grid: GridSettings::default(),
            max_cells_per_object: DEFAULT_MAX_CELLS_PER_OBJECT,
            prune_stubs: true,
            auto_origin: false,
        }
    }
}

/// Totals gathered during a scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Floor objects written to the grid.
    pub floors: usize,
    /// Wall objects written to the grid.
    pub walls: usize,
    /// Objects skipped for exceeding the per-object cell cap.
    pub skipped: usize,
    /// Wall stubs reclassified as floor.
    pub pruned: usize,
}

/// Rasterizes scene objects into a [`GridModel`].
#[derive(Clone, Debug, Default)]
pub struct SceneScanner {
    settings: ScannerSettings,
}

impl SceneScanner {
    /// Creates a scanner with the provided settings.
    #[must_use]
    pub const fn new(settings: ScannerSettings) -> Self {
        Self { settings }
    }

    /// Settings the scanner was created with.
    #[must_use]
    pub const fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    /// Rebuilds the grid from every floor and wall object of the scene.
    pub fn scan<S>(
        &self,
        grid: &mut GridModel,
        scene: &S,
        out: &mut Vec<Event>,
    ) -> Result<ScanSummary, GridSetupError>
    where
        S: SceneQuery + ?Sized,
    {
        let floors = scene.objects(ObjectKind::Floor);
        let walls = scene.objects(ObjectKind::Wall);
        self.scan_objects(grid, floors.into_iter().chain(walls), out)
    }

    /// Rebuilds the grid from an arbitrary object list.
    ///
    /// Floors are always written before walls regardless of input order.
    pub fn scan_objects<I>(
        &self,
        grid: &mut GridModel,
        objects: I,
        out: &mut Vec<Event>,
    ) -> Result<ScanSummary, GridSetupError>
    where
        I: IntoIterator<Item = SceneObject>,
    {
        let (floors, walls): (Vec<SceneObject>, Vec<SceneObject>) = objects
            .into_iter()
            .partition(|object| object.kind == ObjectKind::Floor);

        let mut grid_settings = self.settings.grid;
        if self.settings.auto_origin {
            if let Some(origin) = self.auto_origin(&floors) {
                grid_settings.origin = origin;
            }
        }
        let size = grid.setup_from(&grid_settings)?;
        out.push(Event::GridReset { size });

        let mut summary = ScanSummary::default();
        for object in floors.iter().chain(walls.iter()) {
            match self.rasterize(grid, object, out) {
                Some(_) if object.kind == ObjectKind::Floor => summary.floors += 1,
                Some(_) => summary.walls += 1,
                None => summary.skipped += 1,
            }
        }

        if self.settings.prune_stubs {
            let pruned = prune::prune_stubs(grid);
            summary.pruned = pruned.len();
            if !pruned.is_empty() {
                log::debug!("pruned {} wall stubs", pruned.len());
                out.push(Event::StubsPruned { cells: pruned });
            }
        }

        log::info!(
            "scan complete: {} floors, {} walls, {} skipped, {} stubs pruned",
            summary.floors,
            summary.walls,
            summary.skipped,
            summary.pruned
        );
        Ok(summary)
    }

    /// Rasterizes a wall that appeared after the scan and repaints the cells
    /// it covers.
    ///
    /// Returns the in-bounds cells covered by the wall. Stub pruning is not
    /// re-run.
    pub fn register_wall(
        &self,
        grid: &mut GridModel,
        object: &SceneObject,
        painter: Option<&mut dyn CellPainter>,
        out: &mut Vec<Event>,
    ) -> Vec<CellCoord> {
        if !grid.is_initialized() {
            log::error!(
                "cannot register wall {:?}: grid is not initialized",
                object.handle
            );
            return Vec::new();
        }
        let wall = SceneObject {
            kind: ObjectKind::Wall,
            ..*object
        };
        let Some(cells) = self.rasterize(grid, &wall, out) else {
            return Vec::new();
        };

        if let Some(painter) = painter {
            for &cell in &cells {
                painter.paint_cell(cell, grid.cell_type(cell));
            }
            painter.apply_changes();
        }

        log::info!(
            "wall {:?} registered over {} cells",
            object.handle,
            cells.len()
        );
        out.push(Event::WallRegistered {
            entity: object.handle,
            cells: cells.clone(),
        });
        cells
    }

    /// Grid origin enclosing every floor: the minimum corner of the union of
    /// their bounds, at height zero.
    #[must_use]
    pub fn auto_origin(&self, floors: &[SceneObject]) -> Option<Vec3> {
        let cell_size = self.settings.grid.cell_size;
        let union = floors
            .iter()
            .filter(|object| object.kind == ObjectKind::Floor)
            .map(|object| object_bounds(object, cell_size))
            .reduce(|total, bounds| total.union(&bounds));
        match union {
            Some(bounds) => {
                let min = bounds.min();
                Some(Vec3::new(min.x, 0.0, min.z))
            }
            None => {
                log::warn!("no floor objects available to derive the grid origin");
                None
            }
        }
    }

    /// Writes one object into the grid. Returns the covered in-bounds cells,
    /// or `None` when the object exceeded the cell cap.
    fn rasterize(
        &self,
        grid: &mut GridModel,
        object: &SceneObject,
        out: &mut Vec<Event>,
    ) -> Option<Vec<CellCoord>> {
        let geometry: GridGeometry = grid.geometry()?;
        let footprint = Footprint::of(object, &geometry);
        let count = footprint.cell_count();
        if count > self.settings.max_cells_per_object {
            log::warn!(
                "object {:?} covers {count} cells, more than the limit of {}; skipping",
                object.handle,
                self.settings.max_cells_per_object
            );
            out.push(Event::ObjectSkipped {
                entity: object.handle,
                cells: count,
            });
            return None;
        }

        let cell_type: CellType = object.kind.cell_type();
        let covered: Vec<CellCoord> = footprint
            .cells()
            .filter(|cell| geometry.contains(*cell))
            .collect();
        for &cell in &covered {
            let _ = grid.set_cell(cell, cell_type, Some(object.handle));
        }

        out.push(Event::ObjectRasterized {
            entity: object.handle,
            kind: object.kind,
            cells: u32::try_from(covered.len()).unwrap_or(u32::MAX),
        });
        Some(covered)
    }
}

/// World bounds of the object, or a one-cell box around its position when
/// the host supplied none.
#[must_use]
pub fn object_bounds(object: &SceneObject, cell_size: f32) -> WorldBounds {
    object.bounds.unwrap_or_else(|| {
        WorldBounds::from_center_size(object.transform.position, Vec3::splat(cell_size))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimap_core::{EntityHandle, Transform};

    fn floor(id: u64, min: Vec3, max: Vec3) -> SceneObject {
        SceneObject {
            handle: EntityHandle::new(id),
            kind: ObjectKind::Floor,
            bounds: Some(WorldBounds::from_corners(min, max)),
            transform: Transform::IDENTITY,
        }
    }

    #[test]
    fn auto_origin_takes_union_minimum_at_ground_level() {
        let scanner = SceneScanner::default();
        let floors = [
            floor(1, Vec3::new(-3.0, 2.0, 1.0), Vec3::new(4.0, 3.0, 6.0)),
            floor(2, Vec3::new(0.0, -1.0, -7.5), Vec3::new(2.0, 0.0, 0.0)),
        ];
        assert_eq!(
            scanner.auto_origin(&floors),
            Some(Vec3::new(-3.0, 0.0, -7.5))
        );
    }

    #[test]
    fn auto_origin_requires_floors() {
        assert_eq!(SceneScanner::default().auto_origin(&[]), None);
    }

    #[test]
    fn missing_bounds_fall_back_to_one_cell() {
        let object = SceneObject {
            handle: EntityHandle::new(3),
            kind: ObjectKind::Wall,
            bounds: None,
            transform: Transform::from_position(Vec3::new(4.5, 0.0, 2.5)),
        };
        let bounds = object_bounds(&object, 1.0);
        assert_eq!(bounds.min(), Vec3::new(4.0, -0.5, 2.0));
        assert_eq!(bounds.max(), Vec3::new(5.0, 0.5, 3.0));
    }

    #[test]
    fn auto_origin_is_applied_when_enabled() {
        let scanner = SceneScanner::new(ScannerSettings {
            auto_origin: true,
            ..ScannerSettings::default()
        });
        let mut grid = GridModel::new();
        let mut events = Vec::new();
        let objects = vec![floor(1, Vec3::new(10.0, 0.0, 20.0), Vec3::new(12.5, 0.1, 21.5))];
        let summary = scanner
            .scan(&mut grid, &objects, &mut events)
            .expect("scan succeeds");

        assert_eq!(summary.floors, 1);
        let origin = grid.geometry().map(|geometry| geometry.origin());
        assert_eq!(origin, Some(Vec3::new(10.0, 0.0, 20.0)));
        assert_eq!(grid.cell_type(CellCoord::new(2, 1)), CellType::Floor);
    }
}
