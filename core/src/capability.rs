//! Seams towards the host engine.
//!
//! Systems never reach for globals. Everything they need from the scene is
//! handed to them through one of these traits at the call site.

use glam::Vec3;

use crate::geometry::{OrientedBox, Transform, VolumeKind};
use crate::{CellCoord, CellType, EntityHandle, ObjectKind, SceneObject};

/// Enumerates the scene objects the scanner should rasterize.
pub trait SceneQuery {
    /// All objects of the provided kind currently present in the scene.
    fn objects(&self, kind: ObjectKind) -> Vec<SceneObject>;
}

impl SceneQuery for [SceneObject] {
    fn objects(&self, kind: ObjectKind) -> Vec<SceneObject> {
        self.iter()
            .filter(|object| object.kind == kind)
            .copied()
            .collect()
    }
}

impl SceneQuery for Vec<SceneObject> {
    fn objects(&self, kind: ObjectKind) -> Vec<SceneObject> {
        self.as_slice().objects(kind)
    }
}

/// Activates and deactivates host entities.
pub trait EntityActivation {
    /// Sets the entity's active flag. Returns `false` when the entity no
    /// longer exists.
    fn set_active(&mut self, entity: EntityHandle, active: bool) -> bool;

    /// Current world transform of the entity, if it still exists.
    fn world_transform(&self, entity: EntityHandle) -> Option<Transform>;
}

/// Which protected volumes an overlap query considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VolumeFilter {
    agent: bool,
    obstacles: bool,
}

impl VolumeFilter {
    /// Consider every protected volume.
    pub const ALL: Self = Self::new(true, true);
    /// Consider only the tracked agent.
    pub const AGENT_ONLY: Self = Self::new(true, false);

    /// Creates a filter from per-kind switches.
    #[must_use]
    pub const fn new(agent: bool, obstacles: bool) -> Self {
        Self { agent, obstacles }
    }

    /// Reports whether volumes of the provided kind pass the filter.
    #[must_use]
    pub const fn admits(&self, kind: VolumeKind) -> bool {
        match kind {
            VolumeKind::Agent => self.agent,
            VolumeKind::Obstacle => self.obstacles,
        }
    }
}

impl Default for VolumeFilter {
    fn default() -> Self {
        Self::ALL
    }
}

/// Answers whether a probe box overlaps anything that must stay free.
///
/// Implementations must include at least the tracked agent.
pub trait ProtectedVolumes {
    /// Reports whether `probe` overlaps any volume admitted by `filter`.
    fn overlaps(&self, probe: &OrientedBox, filter: VolumeFilter) -> bool;
}

/// Samples the tracked agent's world position.
pub trait AgentPositionProvider {
    /// Current position, or `None` when no agent is tracked.
    fn agent_position(&self) -> Option<Vec3>;
}

impl<F> AgentPositionProvider for F
where
    F: Fn() -> Option<Vec3>,
{
    fn agent_position(&self) -> Option<Vec3> {
        self()
    }
}

/// Receives incremental paint for individual cells.
pub trait CellPainter {
    /// Paints the cell with the resting color of its classification.
    fn paint_cell(&mut self, cell: CellCoord, cell_type: CellType);

    /// Paints the highlight color over the cell, or restores its resting
    /// color when `highlighted` is `false`.
    fn set_cell_highlight(&mut self, cell: CellCoord, cell_type: CellType, highlighted: bool);

    /// Publishes pending paint.
    fn apply_changes(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transform;

    #[test]
    fn slices_filter_objects_by_kind() {
        let floor = SceneObject {
            handle: EntityHandle::new(1),
            kind: ObjectKind::Floor,
            bounds: None,
            transform: Transform::IDENTITY,
        };
        let wall = SceneObject {
            handle: EntityHandle::new(2),
            kind: ObjectKind::Wall,
            ..floor
        };
        let scene = vec![wall, floor];
        let walls = scene.objects(ObjectKind::Wall);
        assert_eq!(walls.len(), 1);
        assert_eq!(walls[0].handle, EntityHandle::new(2));
    }

    #[test]
    fn closures_provide_agent_positions() {
        let provider = || Some(Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(provider.agent_position(), Some(Vec3::new(1.0, 0.0, 2.0)));
    }

    #[test]
    fn filter_defaults_to_every_volume() {
        let filter = VolumeFilter::default();
        assert!(filter.admits(VolumeKind::Agent));
        assert!(filter.admits(VolumeKind::Obstacle));
        assert!(!VolumeFilter::AGENT_ONLY.admits(VolumeKind::Obstacle));
    }
}
