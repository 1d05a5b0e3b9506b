#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the minimap engine.
//!
//! This crate defines the vocabulary every other crate speaks: grid cell
//! coordinates, cell classifications, weak handles to externally owned scene
//! entities, and the message surface that connects adapters with systems.
//! Adapters submit [`Command`] values describing the work they want done,
//! systems mutate the authoritative grid in response, and report what
//! happened through [`Event`] values pushed into caller-provided buffers.
//!
//! Coordinate math lives in [`convert`], world-space shapes in [`geometry`]
//! and the seams towards the host engine in [`capability`].

pub mod capability;
pub mod convert;
pub mod geometry;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use geometry::{OrientedBox, Transform, WorldBounds};

/// Commands that express all permissible minimap mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Rebuilds the grid from the current scene contents.
    ScanScene,
    /// Rasterizes a wall that appeared after the initial scan.
    RegisterWall {
        /// Scene object describing the new wall.
        object: SceneObject,
    },
    /// Hides the walls around the provided cell, or restores a hidden region.
    ToggleRegion {
        /// Cell around which the square region is centred.
        center: CellCoord,
        /// Edge length of the square region measured in cells.
        mask_size: u32,
    },
    /// Recomputes the viewport window regardless of the refresh cadence.
    RefreshViewport,
}

/// Events broadcast by systems after processing commands and ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Reports that the grid was reset to an all-empty state.
    GridReset {
        /// Dimensions of the freshly allocated grid.
        size: CellRectSize,
    },
    /// Confirms that a scene object was written into the grid.
    ObjectRasterized {
        /// Entity that owns the written cells.
        entity: EntityHandle,
        /// Classification applied to the object.
        kind: ObjectKind,
        /// Number of cells covered by the object after thinning.
        cells: u32,
    },
    /// Reports that a scene object exceeded the per-object cell cap.
    ObjectSkipped {
        /// Entity that was left out of the grid.
        entity: EntityHandle,
        /// Number of cells the object would have covered.
        cells: u64,
    },
    /// Reports the wall stubs that were reclassified as floor.
    StubsPruned {
        /// Cells that no longer hold a wall.
        cells: Vec<CellCoord>,
    },
    /// Confirms that a wall registered after the scan was rasterized.
    WallRegistered {
        /// Entity that owns the wall.
        entity: EntityHandle,
        /// Cells now holding the wall.
        cells: Vec<CellCoord>,
    },
    /// Announces a freshly computed viewport window.
    ViewportRefreshed {
        /// Snapshot describing the visible window.
        snapshot: ViewportSnapshot,
    },
    /// Confirms that a square region of walls was hidden.
    RegionHidden {
        /// Cell the region is centred on.
        center: CellCoord,
        /// Edge length of the region measured in cells.
        mask_size: u32,
        /// Wall cells whose owners were deactivated.
        cells: Vec<CellCoord>,
    },
    /// Confirms that a previously hidden region was restored.
    RegionRestored {
        /// Wall cells whose owners were reactivated.
        cells: Vec<CellCoord>,
    },
    /// Reports that restoring the hidden region would trap a protected volume.
    RestoreRefused {
        /// Owners of hidden walls that overlap a protected volume.
        blocked: Vec<EntityHandle>,
    },
    /// Confirms that the map cursor moved between two cells.
    CursorMoved {
        /// Cell the cursor occupied before moving.
        from: CellCoord,
        /// Cell the cursor occupies after the move.
        to: CellCoord,
    },
    /// Announces that the full map mode was entered or left.
    MapModeChanged {
        /// Whether the full map mode is now active.
        enabled: bool,
    },
}

/// Location of a single grid cell expressed as signed column and row indices.
///
/// Positions west or south of the grid origin map to negative coordinates,
/// which bounds checks reject.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the cell, following world X.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the cell, following world Z. Larger rows lie further north.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the coordinate shifted by the provided deltas, saturating at the
    /// numeric limits.
    #[must_use]
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

/// Classification of a grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    /// Nothing walkable or solid was found in the cell.
    #[default]
    Empty,
    /// Walkable ground.
    Floor,
    /// Solid wall.
    Wall,
}

/// Classification requested for a scene object when it is rasterized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Object contributes floor cells.
    Floor,
    /// Object contributes wall cells thinned to a single cell line.
    Wall,
}

impl ObjectKind {
    /// Cell classification written for objects of this kind.
    #[must_use]
    pub const fn cell_type(self) -> CellType {
        match self {
            Self::Floor => CellType::Floor,
            Self::Wall => CellType::Wall,
        }
    }
}

/// Non-owning identifier of an entity that lives in the host scene.
///
/// The minimap never creates or destroys entities; it only remembers handles
/// so it can ask the host to toggle them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Wraps the host's raw identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the host's raw identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Scene object handed to the scanner by the host.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Entity that will own the rasterized cells.
    pub handle: EntityHandle,
    /// Requested classification.
    pub kind: ObjectKind,
    /// World-space bounds, when the host could compute them.
    pub bounds: Option<WorldBounds>,
    /// World transform of the object.
    pub transform: Transform,
}

/// Dimensions of a rectangular region measured in cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells covered by the size.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Axis-aligned rectangle of cells anchored at its south-west corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Creates a rectangle from its minimum corner and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Minimum (south-west) cell of the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Size of the rectangle.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the cell lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let dx = i64::from(cell.x()) - i64::from(self.origin.x());
        let dy = i64::from(cell.y()) - i64::from(self.origin.y());
        (0..i64::from(self.size.width())).contains(&dx)
            && (0..i64::from(self.size.height())).contains(&dy)
    }
}

/// Placement and resolution of the grid in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    width: u32,
    height: u32,
    cell_size: f32,
    origin: Vec3,
}

impl GridGeometry {
    /// Creates a new geometry descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32, cell_size: f32, origin: Vec3) -> Self {
        Self {
            width,
            height,
            cell_size,
            origin,
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Edge length of a square cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World position of the south-west corner of cell (0, 0).
    #[must_use]
    pub const fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Grid dimensions as a size descriptor.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        CellRectSize::new(self.width, self.height)
    }

    /// Maps a world position onto the cell that contains it.
    #[must_use]
    pub fn world_to_grid(&self, world: Vec3) -> CellCoord {
        convert::world_to_grid(world, self.origin, self.cell_size)
    }

    /// World position of the cell's centre.
    #[must_use]
    pub fn grid_to_world_center(&self, cell: CellCoord) -> Vec3 {
        convert::grid_to_world_center(cell, self.origin, self.cell_size)
    }

    /// World position of the cell's south-west corner.
    #[must_use]
    pub fn grid_to_world_corner(&self, cell: CellCoord) -> Vec3 {
        convert::grid_to_world_corner(cell, self.origin, self.cell_size)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        convert::is_in_bounds(cell, self.width, self.height)
    }

    /// Reports whether the world position falls on a cell of the grid.
    #[must_use]
    pub fn contains_world(&self, world: Vec3) -> bool {
        convert::is_world_position_in_grid(
            world,
            self.origin,
            self.cell_size,
            self.width,
            self.height,
        )
    }

    /// Clamps the cell into the grid.
    #[must_use]
    pub fn clamp(&self, cell: CellCoord) -> CellCoord {
        convert::clamp(cell, self.width, self.height)
    }

    /// Row-major index of the cell, or `None` when it lies outside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let column = usize::try_from(cell.x()).ok()?;
        let row = usize::try_from(cell.y()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(row * width + column)
    }
}

/// Immutable view of the window of grid cells surrounding the agent.
///
/// Window row 0 is the northernmost visible grid row, so the snapshot can be
/// drawn top-down without further flipping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewportSnapshot {
    bounds: CellRect,
    cell_types: Vec<CellType>,
    agent_window_position: Option<CellCoord>,
    agent_cell_type: CellType,
}

impl ViewportSnapshot {
    /// Window position reported to consumers when the agent is not visible.
    pub const OUTSIDE_WINDOW: CellCoord = CellCoord::new(-1, -1);

    /// Captures a new snapshot.
    ///
    /// `cell_types` is indexed by window position, row-major, and is padded
    /// with [`CellType::Empty`] or truncated to match the window area.
    #[must_use]
    pub fn new(
        bounds: CellRect,
        mut cell_types: Vec<CellType>,
        agent_window_position: Option<CellCoord>,
        agent_cell_type: CellType,
    ) -> Self {
        let area = usize::try_from(bounds.size().area()).unwrap_or(usize::MAX);
        cell_types.resize(area, CellType::Empty);
        Self {
            bounds,
            cell_types,
            agent_window_position,
            agent_cell_type,
        }
    }

    /// Number of window columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.bounds.size().width()
    }

    /// Number of window rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bounds.size().height()
    }

    /// Grid-space rectangle covered by the window.
    #[must_use]
    pub const fn bounds(&self) -> CellRect {
        self.bounds
    }

    /// Row-major cell classifications in window space.
    #[must_use]
    pub fn cell_types(&self) -> &[CellType] {
        &self.cell_types
    }

    /// Classification of the window cell, `Empty` outside the window.
    #[must_use]
    pub fn cell_type(&self, view: CellCoord) -> CellType {
        self.window_index(view)
            .and_then(|index| self.cell_types.get(index).copied())
            .unwrap_or_default()
    }

    /// Window position of the agent, if it is visible.
    #[must_use]
    pub const fn agent_window_position(&self) -> Option<CellCoord> {
        self.agent_window_position
    }

    /// Window position of the agent, or [`Self::OUTSIDE_WINDOW`].
    #[must_use]
    pub fn agent_window_position_or_sentinel(&self) -> CellCoord {
        self.agent_window_position.unwrap_or(Self::OUTSIDE_WINDOW)
    }

    /// Classification of the cell the agent stands on.
    #[must_use]
    pub const fn agent_cell_type(&self) -> CellType {
        self.agent_cell_type
    }

    /// Grid cell shown at the window position.
    #[must_use]
    pub fn window_to_grid(&self, view: CellCoord) -> CellCoord {
        convert::window_to_grid(self.bounds, view)
    }

    /// Window position of the grid cell, if the window shows it.
    #[must_use]
    pub fn grid_to_window(&self, cell: CellCoord) -> Option<CellCoord> {
        convert::grid_to_window(self.bounds, cell)
    }

    fn window_index(&self, view: CellCoord) -> Option<usize> {
        let column = u32::try_from(view.x()).ok()?;
        let row = u32::try_from(view.y()).ok()?;
        if column >= self.width() || row >= self.height() {
            return None;
        }
        let column = usize::try_from(column).ok()?;
        let row = usize::try_from(row).ok()?;
        let width = usize::try_from(self.width()).ok()?;
        Some(row * width + column)
    }
}
