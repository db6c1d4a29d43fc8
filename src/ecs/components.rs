//! Common components: agent transform, trigger volumes and their tags

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::ai::WaypointId;

/// Reference frame for a translation delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// Delta is expressed in world axes
    World,
    /// Delta is expressed in the transform's local axes
    Local,
}

/// Transform backend driven by the controllers.
///
/// Axis convention follows the host scenes: local +Z is forward, +X is right
/// and +Y is up. The agent model drives along its negative right axis.
pub trait TransformBackend {
    /// Move by `delta`, interpreted in `space`.
    fn translate(&mut self, delta: Vec3, space: Space);

    /// Replace the current orientation.
    fn set_rotation(&mut self, rotation: Quat);

    /// World-space position.
    fn position(&self) -> Vec3;

    /// World-space orientation.
    fn rotation(&self) -> Quat;

    /// Local +Z in world space.
    fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::Z
    }

    /// Local +X in world space.
    fn right(&self) -> Vec3 {
        self.rotation() * Vec3::X
    }

    /// Local +Y in world space.
    fn up(&self) -> Vec3 {
        self.rotation() * Vec3::Y
    }

    /// Map a point from local space to world space (unit scale).
    fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position() + self.rotation() * local
    }
}

/// Transform component for position and rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
}

impl Transform {
    /// Create a new transform at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl TransformBackend for Transform {
    fn translate(&mut self, delta: Vec3, space: Space) {
        match space {
            Space::World => self.position += delta,
            Space::Local => self.position += self.rotation * delta,
        }
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Build from a center point and full size
    #[must_use]
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// World-space bounds of a box with local `size`, placed at `center`
    /// and rotated by `rotation`.
    #[must_use]
    pub fn from_oriented(center: Vec3, size: Vec3, rotation: Quat) -> Self {
        let m = Mat3::from_quat(rotation);
        let abs = Mat3::from_cols(m.x_axis.abs(), m.y_axis.abs(), m.z_axis.abs());
        Self::from_center_size(center, abs * size.abs())
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Overlap test; touching faces count as overlapping.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Closest point on or inside the box
    #[must_use]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    /// Distance from `point` to the box, zero when inside
    #[must_use]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        point.distance(self.closest_point(point))
    }
}

/// Trigger volume attached to a world entity
#[derive(Debug, Clone, Copy)]
pub struct Collider {
    pub bounds: Aabb,
}

/// Physics layer index (0..32) used by layer-filtered sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer(pub u32);

/// Marks a trigger volume as the pickup zone of a waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaypointTrigger(pub WaypointId);

/// Name component for debugging
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}
