//! Scene-node binding: the host-side object the report decoders write onto.

use crate::world::physics::PhysicsData;
use cgmath::{Quaternion, Rotation, Vector3};

/// Packed per-vertex buffers for a soft body, written by the soft-body
/// report decoder. `needs_upload` marks the buffers as stale on the GPU side.
#[derive(Debug, Clone, Default)]
pub struct SoftGeometry {
    pub(crate) positions: Vec<f32>,
    pub(crate) normals: Vec<f32>,
    pub(crate) needs_upload: bool,
}

impl SoftGeometry {
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    /// Called by the renderer once the buffers have been re-uploaded.
    pub fn acknowledge_upload(&mut self) {
        self.needs_upload = false;
    }
}

/// A scene object registered with the physics world.
///
/// Owns exactly one [`PhysicsData`] record. Transform writes from the
/// application go through [`set_position`](Self::set_position) /
/// [`set_orientation`](Self::set_orientation), which raise the per-axis
/// dirty flags; while a flag is raised, inbound engine reports leave that
/// axis alone so an in-flight application write is never clobbered by stale
/// engine state.
#[derive(Debug, Clone)]
pub struct SceneNode {
    position: Vector3<f32>,
    orientation: Quaternion<f32>,
    scale: Vector3<f32>,
    dirty_position: bool,
    dirty_rotation: bool,
    pub(crate) data: PhysicsData,
    soft_geometry: Option<SoftGeometry>,
}

impl SceneNode {
    pub fn new(data: PhysicsData) -> Self {
        let soft_geometry = data.is_softbody().then(SoftGeometry::default);
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            dirty_position: false,
            dirty_rotation: false,
            data,
            soft_geometry,
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    /// Application-side position write; the engine will not overwrite this
    /// axis until the value has been forwarded by the next `simulate` call.
    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.dirty_position = true;
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        self.orientation
    }

    /// Application-side orientation write, same contract as `set_position`.
    pub fn set_orientation(&mut self, orientation: Quaternion<f32>) {
        self.orientation = orientation;
        self.dirty_rotation = true;
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    /// Scale is forwarded at registration only; the engine does not support
    /// rescaling a live body.
    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
    }

    pub fn is_position_dirty(&self) -> bool {
        self.dirty_position
    }

    pub fn is_rotation_dirty(&self) -> bool {
        self.dirty_rotation
    }

    pub fn data(&self) -> &PhysicsData {
        &self.data
    }

    pub fn soft_geometry(&self) -> Option<&SoftGeometry> {
        self.soft_geometry.as_ref()
    }

    pub fn soft_geometry_mut(&mut self) -> Option<&mut SoftGeometry> {
        self.soft_geometry.as_mut()
    }

    /// Transform a world-space point into this node's local space.
    pub fn world_to_local(&self, world: Vector3<f32>) -> Vector3<f32> {
        self.orientation.invert().rotate_vector(world - self.position)
    }

    /// Transform a node-local point into world space.
    pub fn local_to_world(&self, local: Vector3<f32>) -> Vector3<f32> {
        self.position + self.orientation.rotate_vector(local)
    }

    // Engine-authored writes bypass the dirty flags entirely.

    pub(crate) fn apply_reported_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    pub(crate) fn apply_reported_orientation(&mut self, orientation: Quaternion<f32>) {
        self.orientation = orientation;
    }

    pub(crate) fn clear_dirty_position(&mut self) {
        self.dirty_position = false;
    }

    pub(crate) fn clear_dirty_rotation(&mut self) {
        self.dirty_rotation = false;
    }

    /// Soft-body vertex data is world-space; the node transform is zeroed
    /// once, on the first soft report, so it is not applied twice.
    pub(crate) fn reset_world_transform(&mut self) {
        self.position = Vector3::new(0.0, 0.0, 0.0);
        self.orientation = Quaternion::new(0.0, 0.0, 0.0, 0.0);
    }

    pub(crate) fn ensure_soft_geometry(&mut self) -> &mut SoftGeometry {
        self.soft_geometry.get_or_insert_with(SoftGeometry::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::physics::Material;
    use crate::world::shapes::ShapeData;
    use cgmath::{Deg, InnerSpace, Rotation3};

    fn node() -> SceneNode {
        SceneNode::new(PhysicsData::new(
            ShapeData::Box {
                width: 1.0,
                height: 1.0,
                depth: 1.0,
            },
            1.0,
            Material::default(),
        ))
    }

    #[test]
    fn test_setters_raise_dirty_flags() {
        let mut node = node();
        assert!(!node.is_position_dirty());
        assert!(!node.is_rotation_dirty());

        node.set_position(Vector3::new(1.0, 2.0, 3.0));
        assert!(node.is_position_dirty());
        assert!(!node.is_rotation_dirty());

        node.set_orientation(Quaternion::from_angle_y(Deg(90.0)));
        assert!(node.is_rotation_dirty());
    }

    #[test]
    fn test_reported_writes_leave_flags_alone() {
        let mut node = node();
        node.apply_reported_position(Vector3::new(4.0, 5.0, 6.0));
        assert!(!node.is_position_dirty());
        assert_eq!(node.position(), Vector3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_world_local_round_trip() {
        let mut node = node();
        node.set_position(Vector3::new(10.0, 0.0, 0.0));
        node.set_orientation(Quaternion::from_angle_z(Deg(90.0)));

        let world = Vector3::new(10.0, 2.0, 0.0);
        let local = node.world_to_local(world);
        let back = node.local_to_world(local);
        assert!((back - world).magnitude() < 1e-5);
    }
}
