//! World-space shapes used by the scanner and the region safety check.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::capability::{ProtectedVolumes, VolumeFilter};

/// Tolerance added to rotation terms so nearly parallel edges do not produce
/// a degenerate separating axis.
const SAT_EPSILON: f32 = 1.0e-6;

/// Axis-aligned world-space bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    min: Vec3,
    max: Vec3,
}

impl WorldBounds {
    /// Creates a box spanning the two corners, in any order.
    #[must_use]
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box centred on `center` with the provided full size.
    #[must_use]
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Minimum corner.
    #[must_use]
    pub const fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner.
    #[must_use]
    pub const fn max(&self) -> Vec3 {
        self.max
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full extent of the box along each axis.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Smallest box enclosing both boxes.
    #[must_use]
    pub fn union(&self, other: &WorldBounds) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Position and orientation of a scene entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World position.
    pub position: Vec3,
    /// World rotation.
    pub rotation: Quat,
}

impl Transform {
    /// Transform at the world origin without rotation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Creates an unrotated transform at the provided position.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Returns a copy of the transform with the provided rotation.
    #[must_use]
    pub const fn with_rotation(self, rotation: Quat) -> Self {
        Self {
            position: self.position,
            rotation,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rotated box described by its centre, half extents and rotation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientedBox {
    /// World-space centre.
    pub center: Vec3,
    /// Half of the box size along each local axis.
    pub half_extents: Vec3,
    /// Rotation from local to world axes.
    pub rotation: Quat,
}

impl OrientedBox {
    /// Creates a new oriented box.
    #[must_use]
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
            rotation,
        }
    }

    /// Box placed and rotated by `transform`.
    #[must_use]
    pub fn from_transform(transform: Transform, half_extents: Vec3) -> Self {
        Self::new(transform.position, half_extents, transform.rotation)
    }

    /// Local axes of the box expressed in world space.
    #[must_use]
    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.rotation * Vec3::X,
            self.rotation * Vec3::Y,
            self.rotation * Vec3::Z,
        ]
    }

    /// Separating axis test against another box. Touching boxes overlap.
    #[must_use]
    pub fn intersects(&self, other: &OrientedBox) -> bool {
        let a = self.axes();
        let b = other.axes();
        let ea = self.half_extents.to_array();
        let eb = other.half_extents.to_array();

        let mut r = [[0.0_f32; 3]; 3];
        let mut abs_r = [[0.0_f32; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = a[i].dot(b[j]);
                abs_r[i][j] = r[i][j].abs() + SAT_EPSILON;
            }
        }

        let d = other.center - self.center;
        let t = [d.dot(a[0]), d.dot(a[1]), d.dot(a[2])];

        for i in 0..3 {
            let rb = eb[0] * abs_r[i][0] + eb[1] * abs_r[i][1] + eb[2] * abs_r[i][2];
            if t[i].abs() > ea[i] + rb {
                return false;
            }
        }

        for j in 0..3 {
            let ra = ea[0] * abs_r[0][j] + ea[1] * abs_r[1][j] + ea[2] * abs_r[2][j];
            let projected = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if projected.abs() > ra + eb[j] {
                return false;
            }
        }

        for i in 0..3 {
            let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
            for j in 0..3 {
                let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
                let ra = ea[i1] * abs_r[i2][j] + ea[i2] * abs_r[i1][j];
                let rb = eb[j1] * abs_r[i][j2] + eb[j2] * abs_r[i][j1];
                let projected = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                if projected.abs() > ra + rb {
                    return false;
                }
            }
        }

        true
    }
}

/// Role of a protected volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKind {
    /// The tracked agent.
    Agent,
    /// Any other collider that a restored wall must not swallow.
    Obstacle,
}

/// Volume that restored walls must never overlap.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtectedVolume {
    /// Role of the volume.
    pub kind: VolumeKind,
    /// Shape of the volume.
    pub shape: OrientedBox,
}

/// In-memory set of protected volumes tested with oriented-box overlap.
#[derive(Clone, Debug, Default)]
pub struct ProtectedVolumeSet {
    volumes: Vec<ProtectedVolume>,
}

impl ProtectedVolumeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a volume to the set.
    pub fn push(&mut self, kind: VolumeKind, shape: OrientedBox) {
        self.volumes.push(ProtectedVolume { kind, shape });
    }

    /// Replaces every agent volume with the provided shape.
    pub fn set_agent(&mut self, shape: OrientedBox) {
        self.volumes.retain(|volume| volume.kind != VolumeKind::Agent);
        self.push(VolumeKind::Agent, shape);
    }

    /// Removes every volume.
    pub fn clear(&mut self) {
        self.volumes.clear();
    }

    /// Number of stored volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Reports whether the set holds no volumes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Iterator over the stored volumes.
    pub fn iter(&self) -> impl Iterator<Item = &ProtectedVolume> {
        self.volumes.iter()
    }
}

impl ProtectedVolumes for ProtectedVolumeSet {
    fn overlaps(&self, probe: &OrientedBox, filter: VolumeFilter) -> bool {
        self.volumes
            .iter()
            .filter(|volume| filter.admits(volume.kind))
            .any(|volume| volume.shape.intersects(probe))
    }
}
