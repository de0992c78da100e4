//! Constraint descriptors and runtime operations.
//!
//! Constraints are built from world-space anchor points, which are converted
//! to object-local offsets at build time (the engine wants local frames).
//! Runtime operations take the command channel as an explicit argument
//! rather than holding a back-reference to the synchronization layer.

use crate::bridge::channel::CommandChannel;
use crate::bridge::commands::{vector_param, Command};
use crate::bridge::{BridgeError, BridgeResult};
use crate::world::scene::SceneNode;
use cgmath::Vector3;
use serde::Serialize;
use serde_json::{json, Value};

/// Constraint kinds understood by the engine worker, with their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Point,
    Hinge,
    Slider,
    ConeTwist,
    Dof,
}

/// A registered constraint between one or two objects.
///
/// `applied_impulse` and `world_anchor` are engine-authored: the constraint
/// report decoder refreshes them every tick, re-deriving the anchor from the
/// owning object's current transform rather than trusting a stored value.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub(crate) id: u32,
    kind: ConstraintKind,
    object_a: u32,
    object_b: Option<u32>,
    position_a: Vector3<f32>,
    position_b: Option<Vector3<f32>>,
    axis_a: Option<Vector3<f32>>,
    axis_b: Option<Vector3<f32>>,
    pub(crate) applied_impulse: f32,
    pub(crate) world_anchor: Vector3<f32>,
}

impl Constraint {
    fn base(
        kind: ConstraintKind,
        a: &SceneNode,
        b: Option<&SceneNode>,
        world_position: Vector3<f32>,
    ) -> Self {
        Self {
            id: 0,
            kind,
            object_a: a.data().id(),
            object_b: b.map(|node| node.data().id()),
            position_a: a.world_to_local(world_position),
            position_b: b.map(|node| node.world_to_local(world_position)),
            axis_a: None,
            axis_b: None,
            applied_impulse: 0.0,
            world_anchor: world_position,
        }
    }

    /// Ball-socket joint at a world-space point.
    pub fn point(a: &SceneNode, b: Option<&SceneNode>, world_position: Vector3<f32>) -> Self {
        Self::base(ConstraintKind::Point, a, b, world_position)
    }

    /// Hinge around `axis` through a world-space point.
    pub fn hinge(
        a: &SceneNode,
        b: Option<&SceneNode>,
        world_position: Vector3<f32>,
        axis: Vector3<f32>,
    ) -> Self {
        let mut constraint = Self::base(ConstraintKind::Hinge, a, b, world_position);
        constraint.axis_a = Some(axis);
        constraint
    }

    /// Linear slider along `axis` through a world-space point.
    pub fn slider(
        a: &SceneNode,
        b: Option<&SceneNode>,
        world_position: Vector3<f32>,
        axis: Vector3<f32>,
    ) -> Self {
        let mut constraint = Self::base(ConstraintKind::Slider, a, b, world_position);
        constraint.axis_a = Some(axis);
        constraint
    }

    /// Cone-twist joint; requires both objects.
    pub fn conetwist(a: &SceneNode, b: &SceneNode, world_position: Vector3<f32>) -> Self {
        Self::base(ConstraintKind::ConeTwist, a, Some(b), world_position)
    }

    /// Generic six-degree-of-freedom joint.
    pub fn dof(a: &SceneNode, b: Option<&SceneNode>, world_position: Vector3<f32>) -> Self {
        Self::base(ConstraintKind::Dof, a, b, world_position)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn object_a(&self) -> u32 {
        self.object_a
    }

    pub fn object_b(&self) -> Option<u32> {
        self.object_b
    }

    /// Build-time anchor offset in object A's local frame.
    pub fn position_a(&self) -> Vector3<f32> {
        self.position_a
    }

    pub fn position_b(&self) -> Option<Vector3<f32>> {
        self.position_b
    }

    /// Impulse the solver applied on the last tick.
    pub fn applied_impulse(&self) -> f32 {
        self.applied_impulse
    }

    /// World-space anchor as re-derived from the last constraint report.
    pub fn world_anchor(&self) -> Vector3<f32> {
        self.world_anchor
    }

    /// Registration parameters for the `addConstraint` command.
    pub(crate) fn definition(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("id".into(), json!(self.id));
        map.insert("type".into(), json!(self.kind));
        map.insert("objecta".into(), json!(self.object_a));
        map.insert("positiona".into(), vector_param(self.position_a));
        if let Some(object_b) = self.object_b {
            map.insert("objectb".into(), json!(object_b));
        }
        if let Some(position_b) = self.position_b {
            map.insert("positionb".into(), vector_param(position_b));
        }
        if let Some(axis_a) = self.axis_a {
            map.insert("axisa".into(), vector_param(axis_a));
        }
        if let Some(axis_b) = self.axis_b {
            map.insert("axisb".into(), vector_param(axis_b));
        }
        Value::Object(map)
    }

    fn expect_kind(&self, kind: ConstraintKind, op: &'static str) -> BridgeResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(BridgeError::UnsupportedConstraintOp { id: self.id, op })
        }
    }

    /// Clamp hinge rotation between `low` and `high` (radians).
    pub fn set_angular_limits(
        &self,
        channel: &CommandChannel,
        low: f32,
        high: f32,
        bias_factor: f32,
        relaxation_factor: f32,
    ) -> BridgeResult<()> {
        self.expect_kind(ConstraintKind::Hinge, "setLimits")?;
        channel.execute(Command::HingeSetLimits {
            id: self.id,
            low,
            high,
            bias_factor,
            relaxation_factor,
        })
    }

    /// Drive the hinge toward `velocity` with the given acceleration.
    pub fn enable_angular_motor(
        &self,
        channel: &CommandChannel,
        velocity: f32,
        acceleration: f32,
    ) -> BridgeResult<()> {
        self.expect_kind(ConstraintKind::Hinge, "enableAngularMotor")?;
        channel.execute(Command::HingeEnableAngularMotor {
            id: self.id,
            velocity,
            acceleration,
        })
    }

    pub fn disable_motor(&self, channel: &CommandChannel) -> BridgeResult<()> {
        self.expect_kind(ConstraintKind::Hinge, "disableMotor")?;
        channel.execute(Command::HingeDisableMotor { id: self.id })
    }

    /// Clamp slider translation between `lower` and `upper`.
    pub fn set_linear_limits(
        &self,
        channel: &CommandChannel,
        lower: f32,
        upper: f32,
    ) -> BridgeResult<()> {
        self.expect_kind(ConstraintKind::Slider, "setLimits")?;
        channel.execute(Command::SliderSetLimits {
            id: self.id,
            lower,
            upper,
        })
    }

    pub fn set_restitution(
        &self,
        channel: &CommandChannel,
        linear: f32,
        angular: f32,
    ) -> BridgeResult<()> {
        self.expect_kind(ConstraintKind::Slider, "setRestitution")?;
        channel.execute(Command::SliderSetRestitution {
            id: self.id,
            linear,
            angular,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::physics::{Material, PhysicsData};
    use crate::world::shapes::ShapeData;

    fn node_at(position: Vector3<f32>) -> SceneNode {
        let mut node = SceneNode::new(PhysicsData::new(
            ShapeData::Sphere { radius: 1.0 },
            1.0,
            Material::default(),
        ));
        node.set_position(position);
        node
    }

    #[test]
    fn test_world_anchor_becomes_local_offset() {
        let a = node_at(Vector3::new(10.0, 0.0, 0.0));
        let constraint = Constraint::point(&a, None, Vector3::new(12.0, 0.0, 0.0));
        let offset = constraint.position_a();
        assert!((offset.x - 2.0).abs() < 1e-5);
        assert!(offset.y.abs() < 1e-5);
    }

    #[test]
    fn test_definition_includes_optional_fields() {
        let a = node_at(Vector3::new(0.0, 0.0, 0.0));
        let b = node_at(Vector3::new(1.0, 0.0, 0.0));
        let constraint = Constraint::hinge(
            &a,
            Some(&b),
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let definition = constraint.definition();
        assert_eq!(definition["type"], "hinge");
        assert!(definition.get("objectb").is_some());
        assert!(definition.get("axisa").is_some());
        assert!(definition.get("axisb").is_none());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let a = node_at(Vector3::new(0.0, 0.0, 0.0));
        let constraint = Constraint::point(&a, None, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(
            serde_json::to_string(&constraint.kind()).unwrap(),
            "\"point\""
        );
        // No channel needed: the kind check fires before any send.
        let err = constraint.expect_kind(ConstraintKind::Hinge, "setLimits");
        assert!(err.is_err());
    }
}
