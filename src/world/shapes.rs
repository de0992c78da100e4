//! Collision shape descriptors.
//!
//! These are the opaque `data` payloads attached to each object at
//! registration. The synchronization layer serializes them into the
//! `addObject` command without interpreting them; producing them from real
//! application geometry is the job of [`GeometryProcessor`] implementations.

use crate::world::physics::{BodyType, GeometryProcessor};
use serde::{Deserialize, Serialize};

/// Engine-side collision payload, one variant per body type.
///
/// Serialized with a `type` tag carrying the wire name of the body kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShapeData {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Sphere {
        radius: f32,
    },
    Capsule {
        radius: f32,
        height: f32,
    },
    Cylinder {
        width: f32,
        height: f32,
        depth: f32,
    },
    Cone {
        radius: f32,
        height: f32,
    },
    Plane {
        normal: [f32; 3],
    },
    Convex {
        points: Vec<[f32; 3]>,
    },
    /// Triangle soup, 9 floats per triangle.
    Concave {
        triangles: Vec<f32>,
    },
    Compound {
        children: Vec<CompoundChild>,
    },
    Heightfield {
        xpts: u32,
        ypts: u32,
        xsize: f32,
        ysize: f32,
        points: Vec<f32>,
    },
    SoftTrimesh {
        vertices: Vec<f32>,
        triangles: Vec<u32>,
        pressure: f32,
    },
    SoftRopeMesh {
        points: Vec<[f32; 3]>,
    },
    SoftClothMesh {
        corners: [f32; 12],
        segments: [u32; 2],
    },
}

/// One member shape of a compound body, in body-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundChild {
    pub offset: [f32; 3],
    pub rotation: [f32; 4],
    pub shape: ShapeData,
}

impl ShapeData {
    pub fn body_type(&self) -> BodyType {
        match self {
            ShapeData::Box { .. } => BodyType::Box,
            ShapeData::Sphere { .. } => BodyType::Sphere,
            ShapeData::Capsule { .. } => BodyType::Capsule,
            ShapeData::Cylinder { .. } => BodyType::Cylinder,
            ShapeData::Cone { .. } => BodyType::Cone,
            ShapeData::Plane { .. } => BodyType::Plane,
            ShapeData::Convex { .. } => BodyType::Convex,
            ShapeData::Concave { .. } => BodyType::Concave,
            ShapeData::Compound { .. } => BodyType::Compound,
            ShapeData::Heightfield { .. } => BodyType::Heightfield,
            ShapeData::SoftTrimesh { .. } => BodyType::SoftTrimesh,
            ShapeData::SoftRopeMesh { .. } => BodyType::SoftRopeMesh,
            ShapeData::SoftClothMesh { .. } => BodyType::SoftClothMesh,
        }
    }
}

/// Axis-aligned box dimensions.
#[derive(Debug, Clone, Copy)]
pub struct BoxGeometry {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl GeometryProcessor for BoxGeometry {
    fn collision_shape(&self) -> ShapeData {
        ShapeData::Box {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SphereGeometry {
    pub radius: f32,
}

impl GeometryProcessor for SphereGeometry {
    fn collision_shape(&self) -> ShapeData {
        ShapeData::Sphere {
            radius: self.radius,
        }
    }
}

/// Capsule aligned along the local Y axis; `height` excludes the caps.
#[derive(Debug, Clone, Copy)]
pub struct CapsuleGeometry {
    pub radius: f32,
    pub height: f32,
}

impl GeometryProcessor for CapsuleGeometry {
    fn collision_shape(&self) -> ShapeData {
        ShapeData::Capsule {
            radius: self.radius,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CylinderGeometry {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl GeometryProcessor for CylinderGeometry {
    fn collision_shape(&self) -> ShapeData {
        ShapeData::Cylinder {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConeGeometry {
    pub radius: f32,
    pub height: f32,
}

impl GeometryProcessor for ConeGeometry {
    fn collision_shape(&self) -> ShapeData {
        ShapeData::Cone {
            radius: self.radius,
            height: self.height,
        }
    }
}

/// Infinite static plane described by its normal.
#[derive(Debug, Clone, Copy)]
pub struct PlaneGeometry {
    pub normal: [f32; 3],
}

impl GeometryProcessor for PlaneGeometry {
    fn collision_shape(&self) -> ShapeData {
        ShapeData::Plane {
            normal: self.normal,
        }
    }
}
