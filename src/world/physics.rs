//! Per-object physics state owned by the host side of the worker boundary.

use crate::world::shapes::ShapeData;
use cgmath::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Collision body kinds understood by the engine worker.
///
/// The wire names (camelCase) are part of the registration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyType {
    Box,
    Sphere,
    Capsule,
    Cylinder,
    Cone,
    Plane,
    Convex,
    Concave,
    Compound,
    Heightfield,
    SoftTrimesh,
    SoftRopeMesh,
    SoftClothMesh,
}

impl BodyType {
    /// Soft bodies report per-vertex data instead of a single rigid transform.
    pub fn is_softbody(&self) -> bool {
        matches!(
            self,
            BodyType::SoftTrimesh | BodyType::SoftRopeMesh | BodyType::SoftClothMesh
        )
    }
}

/// Surface material parameters forwarded to the engine at registration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.8,
            restitution: 0.2,
        }
    }
}

/// Converts application geometry into engine collision data.
///
/// Implementations are injected per object kind; the synchronization layer
/// never inspects the produced shape beyond serializing it into the
/// registration command.
pub trait GeometryProcessor: Send + Sync {
    /// Engine-side collision payload for this geometry.
    fn collision_shape(&self) -> ShapeData;
}

/// Host-side physics record, one per registered scene object.
///
/// The id is 0 until the object is registered with a scene; velocities and
/// the touch set are engine-authored and overwritten in place by the report
/// decoders.
#[derive(Debug, Clone)]
pub struct PhysicsData {
    pub(crate) id: u32,
    body_type: BodyType,
    shape: ShapeData,
    mass: f32,
    material: Material,
    pub(crate) linear_velocity: Vector3<f32>,
    pub(crate) angular_velocity: Vector3<f32>,
    pub(crate) touches: HashSet<u32>,
    pub(crate) soft_body_reset: bool,
}

impl PhysicsData {
    pub fn new(shape: ShapeData, mass: f32, material: Material) -> Self {
        Self {
            id: 0,
            body_type: shape.body_type(),
            shape,
            mass,
            material,
            linear_velocity: Vector3::new(0.0, 0.0, 0.0),
            angular_velocity: Vector3::new(0.0, 0.0, 0.0),
            touches: HashSet::new(),
            soft_body_reset: false,
        }
    }

    pub fn from_processor(processor: &dyn GeometryProcessor, mass: f32, material: Material) -> Self {
        Self::new(processor.collision_shape(), mass, material)
    }

    /// Registry id, assigned when the object is added to a scene.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn shape(&self) -> &ShapeData {
        &self.shape
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn is_softbody(&self) -> bool {
        self.body_type.is_softbody()
    }

    /// Engine-reported linear velocity as of the last world report.
    pub fn linear_velocity(&self) -> Vector3<f32> {
        self.linear_velocity
    }

    /// Engine-reported angular velocity as of the last world report.
    pub fn angular_velocity(&self) -> Vector3<f32> {
        self.angular_velocity
    }

    /// Ids of the objects currently in contact with this one.
    pub fn touches(&self) -> &HashSet<u32> {
        &self.touches
    }
}
