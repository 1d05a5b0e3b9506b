#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reversible hiding of the walls inside a square region of the grid.
//!
//! Hiding deactivates the scene entities that own the walls and paints the
//! affected cells with the highlight color. Restoring reactivates them, but
//! only when none of the walls would reappear inside a protected volume such
//! as the agent. A refused restore leaves the region hidden.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use minimap_core::{
    capability::{CellPainter, EntityActivation, ProtectedVolumes, VolumeFilter},
    CellCoord, CellType, EntityHandle, Event, OrientedBox, Transform, ViewportSnapshot,
};
use minimap_grid::GridModel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_MASK_SIZE: u32 = 9;
const DEFAULT_CHECK_HALF_EXTENTS: Vec3 = Vec3::new(0.4, 1.0, 0.4);

/// Region toggle configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleSettings {
    /// Edge length of the hidden square, in cells, used by callers that do
    /// not pick their own.
    pub mask_size: u32,
    /// Half extents of the box probed around each hidden wall before it is
    /// restored.
    pub check_half_extents: Vec3,
    /// Whether obstacles other than the agent also block a restore.
    pub protect_obstacles: bool,
}

impl ToggleSettings {
    fn volume_filter(&self) -> VolumeFilter {
        VolumeFilter::new(true, self.protect_obstacles)
    }
}

impl Default for ToggleSettings {
    fn default() -> Self {
        Self {
            mask_size: DEFAULT_MASK_SIZE,
            check_half_extents: DEFAULT_CHECK_HALF_EXTENTS,
            protect_obstacles: true,
        }
    }
}

/// Wall cell whose owner was deactivated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HiddenWall {
    /// Grid cell the wall occupies.
    pub position: CellCoord,
    /// Entity that owns the wall.
    pub owner: EntityHandle,
    /// World transform of the owner when it was hidden.
    pub transform: Transform,
}

/// State of an active region.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionState {
    center: CellCoord,
    mask_size: u32,
    hidden: Vec<HiddenWall>,
}

impl RegionState {
    /// Cell the region is centred on.
    #[must_use]
    pub const fn center(&self) -> CellCoord {
        self.center
    }

    /// Edge length of the region in cells.
    #[must_use]
    pub const fn mask_size(&self) -> u32 {
        self.mask_size
    }

    /// Walls hidden by the region.
    #[must_use]
    pub fn hidden(&self) -> &[HiddenWall] {
        &self.hidden
    }

    fn positions(&self) -> Vec<CellCoord> {
        self.hidden.iter().map(|wall| wall.position).collect()
    }
}

/// Successful result of [`RegionToggle::toggle_region`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Walls around `center` were hidden.
    Hidden {
        /// Cell the region is centred on.
        center: CellCoord,
        /// Wall cells that were hidden.
        cells: Vec<CellCoord>,
    },
    /// The previously hidden walls were restored.
    Restored {
        /// Wall cells that were restored.
        cells: Vec<CellCoord>,
    },
}

/// Reasons a toggle did not take effect.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToggleError {
    /// Restoring would place a wall inside a protected volume.
    #[error("restoring {} hidden walls would overlap a protected volume", blocked.len())]
    SafetyViolation {
        /// Owners whose walls overlap a protected volume.
        blocked: Vec<EntityHandle>,
    },
    /// The grid has not been set up yet.
    #[error("grid is not initialized")]
    GridNotInitialized,
}

/// Host services a toggle needs.
pub struct ToggleCollaborators<'a> {
    /// Activates and deactivates wall owners.
    pub entities: &'a mut dyn EntityActivation,
    /// Volumes restored walls must not overlap.
    pub volumes: &'a dyn ProtectedVolumes,
    /// Receives highlight paint, when a renderer is attached.
    pub painter: Option<&'a mut dyn CellPainter>,
}

/// State machine toggling one square region between hidden and restored.
#[derive(Clone, Debug, Default)]
pub struct RegionToggle {
    settings: ToggleSettings,
    state: Option<RegionState>,
}

impl RegionToggle {
    /// Creates an inactive toggle.
    #[must_use]
    pub const fn new(settings: ToggleSettings) -> Self {
        Self {
            settings,
            state: None,
        }
    }

    /// Settings the toggle was created with.
    #[must_use]
    pub const fn settings(&self) -> &ToggleSettings {
        &self.settings
    }

    /// Reports whether a region is currently hidden.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// State of the hidden region, if any.
    #[must_use]
    pub fn state(&self) -> Option<&RegionState> {
        self.state.as_ref()
    }

    /// Walls hidden by the active region.
    #[must_use]
    pub fn hidden_walls(&self) -> &[HiddenWall] {
        self.state
            .as_ref()
            .map(RegionState::hidden)
            .unwrap_or_default()
    }

    /// Hides the walls around `center` when inactive, or restores the hidden
    /// region when active. `center` and `mask_size` are ignored while a
    /// region is active.
    pub fn toggle_region(
        &mut self,
        grid: &GridModel,
        center: CellCoord,
        mask_size: u32,
        collaborators: ToggleCollaborators<'_>,
        out: &mut Vec<Event>,
    ) -> Result<ToggleOutcome, ToggleError> {
        if !grid.is_initialized() {
            log::error!("cannot toggle region: grid is not initialized");
            return Err(ToggleError::GridNotInitialized);
        }
        if self.state.is_some() {
            self.restore(collaborators, out)
        } else {
            Ok(self.hide(grid, center, mask_size, collaborators, out))
        }
    }

    /// Owners of hidden walls that would currently overlap a protected
    /// volume if restored.
    #[must_use]
    pub fn restore_blockers(&self, volumes: &dyn ProtectedVolumes) -> Vec<EntityHandle> {
        let filter = self.settings.volume_filter();
        let mut seen = HashSet::new();
        self.hidden_walls()
            .iter()
            .filter(|wall| seen.insert(wall.owner))
            .filter(|wall| {
                let probe =
                    OrientedBox::from_transform(wall.transform, self.settings.check_half_extents);
                volumes.overlaps(&probe, filter)
            })
            .map(|wall| wall.owner)
            .collect()
    }

    /// Paints the highlight over every hidden cell again, for example after
    /// the renderer redrew the whole map.
    pub fn refresh_highlights(&self, grid: &GridModel, painter: &mut dyn CellPainter) {
        let Some(state) = &self.state else {
            return;
        };
        for wall in &state.hidden {
            painter.set_cell_highlight(wall.position, grid.cell_type(wall.position), true);
        }
        painter.apply_changes();
    }

    /// Window positions of the hidden cells visible in the snapshot.
    #[must_use]
    pub fn highlights_in_window(&self, snapshot: &ViewportSnapshot) -> Vec<CellCoord> {
        self.hidden_walls()
            .iter()
            .filter_map(|wall| snapshot.grid_to_window(wall.position))
            .collect()
    }

    fn hide(
        &mut self,
        grid: &GridModel,
        center: CellCoord,
        mask_size: u32,
        collaborators: ToggleCollaborators<'_>,
        out: &mut Vec<Event>,
    ) -> ToggleOutcome {
        let ToggleCollaborators {
            entities,
            mut painter,
            ..
        } = collaborators;
        let half = i32::try_from(mask_size / 2).unwrap_or(i32::MAX);
        let start = center.offset(-half, -half);
        let end = center.offset(half, half);

        let mut hidden = Vec::new();
        let mut owners: HashMap<EntityHandle, Option<Transform>> = HashMap::new();
        for cell in grid.cells_in_rect(start, end) {
            if cell.cell_type() != CellType::Wall {
                continue;
            }
            let Some(owner) = cell.owner() else {
                continue;
            };
            let captured = *owners
                .entry(owner)
                .or_insert_with(|| deactivate(&mut *entities, owner));
            let Some(transform) = captured else {
                continue;
            };
            hidden.push(HiddenWall {
                position: cell.position(),
                owner,
                transform,
            });
            if let Some(painter) = painter.as_deref_mut() {
                painter.set_cell_highlight(cell.position(), CellType::Wall, true);
            }
        }
        if let Some(painter) = painter.as_deref_mut() {
            painter.apply_changes();
        }

        let state = RegionState {
            center,
            mask_size,
            hidden,
        };
        let cells = state.positions();
        log::info!(
            "hid {} wall cells of {} owners around {center:?}",
            cells.len(),
            owners.values().filter(|captured| captured.is_some()).count()
        );
        out.push(Event::RegionHidden {
            center,
            mask_size,
            cells: cells.clone(),
        });
        self.state = Some(state);
        ToggleOutcome::Hidden { center, cells }
    }

    fn restore(
        &mut self,
        collaborators: ToggleCollaborators<'_>,
        out: &mut Vec<Event>,
    ) -> Result<ToggleOutcome, ToggleError> {
        let ToggleCollaborators {
            entities,
            volumes,
            mut painter,
        } = collaborators;

        let blocked = self.restore_blockers(volumes);
        if !blocked.is_empty() {
            log::warn!(
                "refusing to restore walls: {} owners overlap a protected volume",
                blocked.len()
            );
            out.push(Event::RestoreRefused {
                blocked: blocked.clone(),
            });
            return Err(ToggleError::SafetyViolation { blocked });
        }

        let Some(state) = self.state.take() else {
            return Ok(ToggleOutcome::Restored { cells: Vec::new() });
        };
        let mut reactivated = HashSet::new();
        for wall in &state.hidden {
            if reactivated.insert(wall.owner) && !entities.set_active(wall.owner, true) {
                log::debug!("wall owner {:?} vanished while hidden", wall.owner);
            }
        }
        if let Some(painter) = painter.as_deref_mut() {
            for wall in &state.hidden {
                painter.set_cell_highlight(wall.position, CellType::Wall, false);
            }
            painter.apply_changes();
        }

        let cells = state.positions();
        log::info!("restored {} wall cells", cells.len());
        out.push(Event::RegionRestored {
            cells: cells.clone(),
        });
        Ok(ToggleOutcome::Restored { cells })
    }
}

/// Captures the owner's transform and deactivates it. `None` when the host
/// no longer knows the entity.
fn deactivate(entities: &mut dyn EntityActivation, owner: EntityHandle) -> Option<Transform> {
    let Some(transform) = entities.world_transform(owner) else {
        log::debug!("wall owner {owner:?} no longer exists; leaving it out");
        return None;
    };
    if !entities.set_active(owner, false) {
        log::debug!("wall owner {owner:?} could not be deactivated; leaving it out");
        return None;
    }
    Some(transform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_probe_box() {
        let settings = ToggleSettings::default();
        assert_eq!(settings.mask_size, 9);
        assert_eq!(settings.check_half_extents, Vec3::new(0.4, 1.0, 0.4));
        assert_eq!(settings.volume_filter(), VolumeFilter::ALL);
    }

    #[test]
    fn inactive_toggle_has_no_hidden_walls() {
        let toggle = RegionToggle::default();
        assert!(!toggle.is_active());
        assert!(toggle.hidden_walls().is_empty());
        assert!(toggle.state().is_none());
    }
}
