//! Headless scene described in TOML and the host services built from it.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, ensure, Context, Result};
use glam::{Quat, Vec3};
use minimap_core::{
    capability::{EntityActivation, SceneQuery},
    geometry::{ProtectedVolumeSet, VolumeKind},
    EntityHandle, ObjectKind, OrientedBox, SceneObject, Transform, WorldBounds,
};
use serde::Deserialize;

const DEFAULT_AGENT_HALF_EXTENTS: Vec3 = Vec3::new(0.3, 0.9, 0.3);
const DEFAULT_AGENT_SPEED: f32 = 2.0;

/// Box-shaped scene object.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BoxSpec {
    pub(crate) center: Vec3,
    pub(crate) size: Vec3,
    #[serde(default)]
    pub(crate) yaw_degrees: f32,
}

impl BoxSpec {
    fn transform(&self) -> Transform {
        Transform::from_position(self.center)
            .with_rotation(Quat::from_rotation_y(self.yaw_degrees.to_radians()))
    }

    fn oriented(&self) -> OrientedBox {
        OrientedBox::from_transform(self.transform(), self.size * 0.5)
    }

    /// Axis-aligned bounds enclosing the rotated box.
    fn bounds(&self) -> WorldBounds {
        let shape = self.oriented();
        let [x, y, z] = shape.axes();
        let half = self.size * 0.5;
        let reach = x.abs() * half.x + y.abs() * half.y + z.abs() * half.z;
        WorldBounds::from_center_size(self.center, reach * 2.0)
    }
}

/// Agent body and the waypoints it walks along.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AgentSpec {
    pub(crate) half_extents: Vec3,
    pub(crate) speed: f32,
    pub(crate) path: Vec<Vec3>,
}

impl Default for AgentSpec {
    fn default() -> Self {
        Self {
            half_extents: DEFAULT_AGENT_HALF_EXTENTS,
            speed: DEFAULT_AGENT_SPEED,
            path: Vec::new(),
        }
    }
}

impl AgentSpec {
    /// Position after walking `distance` units along the path.
    pub(crate) fn position_at(&self, distance: f32) -> Option<Vec3> {
        let (first, rest) = self.path.split_first()?;
        let mut remaining = distance.max(0.0);
        let mut from = *first;
        for to in rest {
            let leg = from.distance(*to);
            if remaining <= leg && leg > 0.0 {
                return Some(from.lerp(*to, remaining / leg));
            }
            remaining -= leg;
            from = *to;
        }
        Some(from)
    }
}

/// Input injected at a given tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ScriptStep {
    pub(crate) tick: u64,
    pub(crate) map_mode: bool,
    pub(crate) toggle_walls: bool,
    pub(crate) horizontal: i32,
    pub(crate) vertical: i32,
    pub(crate) refresh: bool,
    pub(crate) rescan: bool,
    pub(crate) wall: Option<BoxSpec>,
    pub(crate) pickup_collected: Option<Vec3>,
}

/// Scene file contents.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SceneSpec {
    pub(crate) pickups: Vec<Vec3>,
    pub(crate) floors: Vec<BoxSpec>,
    pub(crate) walls: Vec<BoxSpec>,
    pub(crate) obstacles: Vec<BoxSpec>,
    pub(crate) agent: AgentSpec,
    pub(crate) script: Vec<ScriptStep>,
}

impl SceneSpec {
    /// Reads and validates the scene at `path`.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid scene at {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scene: Self =
            toml::from_str(contents).context("failed to parse scene toml contents")?;
        ensure!(scene.agent.speed >= 0.0, "agent speed must not be negative");
        for (index, object) in scene.floors.iter().chain(&scene.walls).enumerate() {
            if object.size.min_element() < 0.0 {
                bail!("scene object #{index} has a negative size {}", object.size);
            }
        }
        Ok(scene)
    }
}

/// In-memory stand-in for the host engine. Scene queries report inactive
/// objects too, so a rescan keeps hidden walls in the grid.
#[derive(Debug, Default)]
pub(crate) struct SceneHost {
    objects: Vec<SceneObject>,
    active: HashMap<EntityHandle, bool>,
    next_handle: u64,
}

impl SceneHost {
    /// Spawns every floor and wall of the scene.
    pub(crate) fn from_spec(spec: &SceneSpec) -> Self {
        let mut host = Self::default();
        for floor in &spec.floors {
            let _ = host.spawn(ObjectKind::Floor, floor);
        }
        for wall in &spec.walls {
            let _ = host.spawn(ObjectKind::Wall, wall);
        }
        host
    }

    /// Adds an entity and returns its description.
    pub(crate) fn spawn(&mut self, kind: ObjectKind, spec: &BoxSpec) -> SceneObject {
        self.next_handle += 1;
        let object = SceneObject {
            handle: EntityHandle::new(self.next_handle),
            kind,
            bounds: Some(spec.bounds()),
            transform: spec.transform(),
        };
        self.objects.push(object);
        let _ = self.active.insert(object.handle, true);
        object
    }
}

impl SceneQuery for SceneHost {
    fn objects(&self, kind: ObjectKind) -> Vec<SceneObject> {
        self.objects
            .iter()
            .filter(|object| object.kind == kind)
            .copied()
            .collect()
    }
}

impl EntityActivation for SceneHost {
    fn set_active(&mut self, entity: EntityHandle, active: bool) -> bool {
        match self.active.get_mut(&entity) {
            Some(flag) => {
                *flag = active;
                true
            }
            None => false,
        }
    }

    fn world_transform(&self, entity: EntityHandle) -> Option<Transform> {
        self.objects
            .iter()
            .find(|object| object.handle == entity)
            .map(|object| object.transform)
    }
}

/// Static obstacles of the scene; the agent volume is added per tick.
pub(crate) fn obstacle_volumes(spec: &SceneSpec) -> ProtectedVolumeSet {
    let mut volumes = ProtectedVolumeSet::new();
    for obstacle in &spec.obstacles {
        volumes.push(VolumeKind::Obstacle, obstacle.oriented());
    }
    volumes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_walks_the_path_at_constant_speed() {
        let agent = AgentSpec {
            path: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 2.0),
            ],
            ..AgentSpec::default()
        };
        assert_eq!(agent.position_at(0.0), Some(Vec3::ZERO));
        assert_eq!(agent.position_at(2.0), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(agent.position_at(5.0), Some(Vec3::new(4.0, 0.0, 1.0)));
        assert_eq!(agent.position_at(100.0), Some(Vec3::new(4.0, 0.0, 2.0)));
        assert_eq!(AgentSpec::default().position_at(1.0), None);
    }

    #[test]
    fn rotated_wall_bounds_enclose_the_box() {
        let wall = BoxSpec {
            center: Vec3::new(5.0, 1.0, 5.0),
            size: Vec3::new(4.0, 2.0, 0.5),
            yaw_degrees: 90.0,
        };
        let size = wall.bounds().size();
        assert!((size.x - 0.5).abs() < 1e-4, "{size}");
        assert!((size.z - 4.0).abs() < 1e-4, "{size}");
    }

    #[test]
    fn deactivated_walls_stay_visible_to_scans() {
        let spec = SceneSpec::parse(
            r#"
            [[floors]]
            center = [5.0, 0.0, 5.0]
            size = [10.0, 0.1, 10.0]

            [[walls]]
            center = [5.0, 1.0, 2.0]
            size = [6.0, 2.0, 0.5]
            "#,
        )
        .expect("valid scene");
        let mut host = SceneHost::from_spec(&spec);
        let wall = host.objects(ObjectKind::Wall)[0].handle;

        assert!(host.set_active(wall, false));
        assert_eq!(host.active.get(&wall), Some(&false));
        assert_eq!(host.objects(ObjectKind::Wall).len(), 1);
        assert!(host.world_transform(wall).is_some());
        assert!(!host.set_active(EntityHandle::new(99), true));
    }

    #[test]
    fn negative_sizes_are_rejected() {
        let error = SceneSpec::parse(
            r#"
            [[walls]]
            center = [0.0, 0.0, 0.0]
            size = [-1.0, 1.0, 1.0]
            "#,
        )
        .expect_err("negative size");
        assert!(error.to_string().contains("negative size"));
    }
}
