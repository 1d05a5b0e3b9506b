#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative cell storage for the minimap.
//!
//! [`GridModel`] owns exactly one [`Cell`] per grid position. It is reset by
//! [`GridModel::setup_grid`], populated by the scanner, and read by every
//! other system through shared borrows or the [`query`] helpers.

use glam::Vec3;
use minimap_core::{CellCoord, CellRectSize, CellType, EntityHandle, GridGeometry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_GRID_WIDTH: u32 = 50;
const DEFAULT_GRID_HEIGHT: u32 = 50;
const DEFAULT_CELL_SIZE: f32 = 1.0;

/// Upper bound on the number of cells a grid may allocate.
pub const MAX_GRID_CELLS: u64 = 16 * 1024 * 1024;

/// Placement and resolution requested for the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Edge length of a cell in world units.
    pub cell_size: f32,
    /// World position of the south-west corner of cell (0, 0).
    pub origin: Vec3,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
            cell_size: DEFAULT_CELL_SIZE,
            origin: Vec3::ZERO,
        }
    }
}

/// Reasons a grid could not be set up.
#[derive(Debug, Error, PartialEq)]
pub enum GridSetupError {
    /// The cell size was zero, negative or not finite.
    #[error("cell size must be a positive finite number, got {0}")]
    InvalidCellSize(f32),
    /// The requested dimensions exceed [`MAX_GRID_CELLS`].
    #[error("grid of {width}x{height} cells exceeds the supported maximum")]
    TooLarge {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
}

/// Single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    position: CellCoord,
    cell_type: CellType,
    owner: Option<EntityHandle>,
}

impl Cell {
    const fn empty(position: CellCoord) -> Self {
        Self {
            position,
            cell_type: CellType::Empty,
            owner: None,
        }
    }

    /// Grid position of the cell. Never changes after creation.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Current classification.
    #[must_use]
    pub const fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Scene entity that produced the classification, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<EntityHandle> {
        self.owner
    }
}

/// Dense row-major grid of cells.
#[derive(Clone, Debug, Default)]
pub struct GridModel {
    geometry: Option<GridGeometry>,
    cells: Vec<Cell>,
}

impl GridModel {
    /// Creates an uninitialized grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the grid to `width x height` empty cells, discarding previous
    /// contents.
    ///
    /// An invalid configuration is logged and leaves the grid unchanged.
    pub fn setup_grid(
        &mut self,
        width: u32,
        height: u32,
        cell_size: f32,
        origin: Vec3,
    ) -> Result<CellRectSize, GridSetupError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            log::error!("refusing to set up grid: invalid cell size {cell_size}");
            return Err(GridSetupError::InvalidCellSize(cell_size));
        }
        let size = CellRectSize::new(width, height);
        if size.area() > MAX_GRID_CELLS {
            log::error!("refusing to set up grid: {width}x{height} cells is too large");
            return Err(GridSetupError::TooLarge { width, height });
        }

        let geometry = GridGeometry::new(width, height, cell_size, origin);
        self.cells.clear();
        self.cells.reserve(usize::try_from(size.area()).unwrap_or(0));
        for y in 0..height {
            for x in 0..width {
                self.cells.push(Cell::empty(CellCoord::new(
                    i32::try_from(x).unwrap_or(i32::MAX),
                    i32::try_from(y).unwrap_or(i32::MAX),
                )));
            }
        }
        self.geometry = Some(geometry);
        log::debug!("grid set up with {width}x{height} cells of size {cell_size}");
        Ok(size)
    }

    /// Resets the grid from the provided settings.
    pub fn setup_from(&mut self, settings: &GridSettings) -> Result<CellRectSize, GridSetupError> {
        self.setup_grid(
            settings.width,
            settings.height,
            settings.cell_size,
            settings.origin,
        )
    }

    /// Writes a cell. Returns whether the stored cell changed.
    ///
    /// Out-of-bounds positions are ignored. A wall written over an existing
    /// wall is skipped so the first wall keeps ownership of the cell.
    pub fn set_cell(
        &mut self,
        position: CellCoord,
        cell_type: CellType,
        owner: Option<EntityHandle>,
    ) -> bool {
        let Some(geometry) = self.geometry else {
            log::warn!("ignoring write to {position:?}: grid is not initialized");
            return false;
        };
        let Some(cell) = geometry
            .index(position)
            .and_then(|index| self.cells.get_mut(index))
        else {
            return false;
        };
        if cell_type == CellType::Wall && cell.cell_type == CellType::Wall {
            return false;
        }
        cell.cell_type = cell_type;
        cell.owner = owner;
        true
    }

    /// Returns the cell at the provided position.
    #[must_use]
    pub fn cell(&self, position: CellCoord) -> Option<&Cell> {
        self.index(position).and_then(|index| self.cells.get(index))
    }

    /// Classification of the cell, `Empty` when out of bounds.
    #[must_use]
    pub fn cell_type(&self, position: CellCoord) -> CellType {
        self.cell(position)
            .map_or(CellType::Empty, |cell| cell.cell_type)
    }

    /// Cells inside the inclusive rectangle spanned by `a` and `b`.
    ///
    /// Corners may be given in any order; positions outside the grid are
    /// skipped. Cells are returned row by row, south to north.
    #[must_use]
    pub fn cells_in_rect(&self, a: CellCoord, b: CellCoord) -> Vec<&Cell> {
        let (min_x, max_x) = (a.x().min(b.x()), a.x().max(b.x()));
        let (min_y, max_y) = (a.y().min(b.y()), a.y().max(b.y()));
        let Some(geometry) = self.geometry else {
            return Vec::new();
        };
        let width = i32::try_from(geometry.width()).unwrap_or(i32::MAX);
        let height = i32::try_from(geometry.height()).unwrap_or(i32::MAX);
        let (min_x, max_x) = (min_x.max(0), max_x.min(width - 1));
        let (min_y, max_y) = (min_y.max(0), max_y.min(height - 1));

        let mut cells = Vec::new();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if let Some(cell) = self.cell(CellCoord::new(x, y)) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Drops every cell, returning the grid to the uninitialized state.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.geometry = None;
    }

    /// Reports whether [`GridModel::setup_grid`] has succeeded since the last
    /// [`GridModel::clear`].
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.geometry.is_some()
    }

    /// Placement and resolution of the grid, if initialized.
    #[must_use]
    pub const fn geometry(&self) -> Option<GridGeometry> {
        self.geometry
    }

    /// Width and height in cells, zero when uninitialized.
    #[must_use]
    pub fn dimensions(&self) -> CellRectSize {
        self.geometry
            .map_or_else(CellRectSize::default, |geometry| geometry.size())
    }

    /// Iterator over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    fn index(&self, position: CellCoord) -> Option<usize> {
        self.geometry.and_then(|geometry| geometry.index(position))
    }
}

/// Read-only helpers over a [`GridModel`].
pub mod query {
    use minimap_core::{CellCoord, CellType};

    use super::GridModel;

    /// Wall occupancy of the four orthogonal neighbours of a cell.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WallNeighbors {
        /// Wall directly north (+y).
        pub north: bool,
        /// Wall directly south (-y).
        pub south: bool,
        /// Wall directly east (+x).
        pub east: bool,
        /// Wall directly west (-x).
        pub west: bool,
    }

    impl WallNeighbors {
        /// Number of neighbouring walls.
        #[must_use]
        pub fn count(&self) -> usize {
            [self.north, self.south, self.east, self.west]
                .into_iter()
                .filter(|wall| *wall)
                .count()
        }

        /// Reports whether walls exist along both the horizontal and the
        /// vertical axis.
        #[must_use]
        pub const fn spans_both_axes(&self) -> bool {
            (self.east || self.west) && (self.north || self.south)
        }

        /// Positions of the neighbouring walls around `center`.
        #[must_use]
        pub fn positions(&self, center: CellCoord) -> Vec<CellCoord> {
            [
                (self.north, center.offset(0, 1)),
                (self.south, center.offset(0, -1)),
                (self.east, center.offset(1, 0)),
                (self.west, center.offset(-1, 0)),
            ]
            .into_iter()
            .filter_map(|(wall, position)| wall.then_some(position))
            .collect()
        }
    }

    /// Reports whether any cell holds something other than `Empty`.
    #[must_use]
    pub fn has_any_non_empty_cells(grid: &GridModel) -> bool {
        grid.cells()
            .any(|cell| cell.cell_type() != CellType::Empty)
    }

    /// Wall occupancy around the provided cell.
    #[must_use]
    pub fn wall_neighbors(grid: &GridModel, position: CellCoord) -> WallNeighbors {
        let is_wall = |dx, dy| grid.cell_type(position.offset(dx, dy)) == CellType::Wall;
        WallNeighbors {
            north: is_wall(0, 1),
            south: is_wall(0, -1),
            east: is_wall(1, 0),
            west: is_wall(-1, 0),
        }
    }

    /// Number of cells holding the provided classification.
    #[must_use]
    pub fn count_by_type(grid: &GridModel, cell_type: CellType) -> usize {
        grid.cells()
            .filter(|cell| cell.cell_type() == cell_type)
            .count()
    }
}
