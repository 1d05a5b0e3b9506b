use std::collections::BTreeSet;

use glam::Vec3;
use minimap_core::CellCoord;
use minimap_grid::GridModel;

use crate::TextureRenderer;

/// Pickup locations painted onto the map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PickupMarkers {
    cells: BTreeSet<CellCoord>,
}

impl PickupMarkers {
    /// Creates an empty marker set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the cell containing `world` with the pickup color. Returns
    /// `false` for duplicates and positions outside the grid.
    pub fn register(
        &mut self,
        world: Vec3,
        grid: &GridModel,
        renderer: &mut TextureRenderer,
    ) -> bool {
        let Some(cell) = locate(world, grid) else {
            return false;
        };
        if !self.cells.insert(cell) {
            return false;
        }
        let color = renderer.colors().pickup;
        renderer.set_marker(grid, cell, Some(color));
        renderer.apply_changes();
        log::debug!("registered pickup at {cell:?}");
        true
    }

    /// Removes the marker covering `world` and repaints the cell from the
    /// grid.
    pub fn remove(&mut self, world: Vec3, grid: &GridModel, renderer: &mut TextureRenderer) -> bool {
        let Some(cell) = locate(world, grid) else {
            return false;
        };
        if !self.cells.remove(&cell) {
            return false;
        }
        renderer.set_marker(grid, cell, None);
        renderer.apply_changes();
        true
    }

    /// Reports whether `cell` carries a marker.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Marked cells in ascending order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.iter().copied()
    }
}

fn locate(world: Vec3, grid: &GridModel) -> Option<CellCoord> {
    let Some(geometry) = grid.geometry() else {
        log::warn!("cannot place pickup marker: grid is not initialized");
        return None;
    };
    if !geometry.contains_world(world) {
        log::debug!("pickup at {world} lies outside the grid");
        return None;
    }
    Some(geometry.world_to_grid(world))
}
