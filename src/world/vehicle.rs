//! Vehicle and wheel helpers.
//!
//! Wheels are fully engine-owned: the vehicle report decoder writes their
//! transforms unconditionally and there is no dirty-flag arbitration.

use crate::bridge::channel::CommandChannel;
use crate::bridge::commands::Command;
use crate::bridge::{BridgeError, BridgeResult};
use cgmath::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Suspension and friction tuning forwarded with `addVehicle`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleTuning {
    pub suspension_stiffness: f32,
    pub suspension_compression: f32,
    pub suspension_damping: f32,
    pub max_suspension_travel: f32,
    pub friction_slip: f32,
    pub max_suspension_force: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            suspension_stiffness: 5.88,
            suspension_compression: 0.83,
            suspension_damping: 0.88,
            max_suspension_travel: 500.0,
            friction_slip: 10.5,
            max_suspension_force: 6000.0,
        }
    }
}

/// Parameters for one wheel, forwarded with `addWheel`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelDescription {
    pub connection_point: [f32; 3],
    pub wheel_direction: [f32; 3],
    pub wheel_axle: [f32; 3],
    pub suspension_rest_length: f32,
    pub wheel_radius: f32,
    pub is_front_wheel: bool,
    /// Per-wheel tuning override; the vehicle tuning applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuning: Option<VehicleTuning>,
}

/// Engine-authored wheel transform.
#[derive(Debug, Clone, Copy)]
pub struct WheelNode {
    position: Vector3<f32>,
    orientation: Quaternion<f32>,
}

impl Default for WheelNode {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }
}

impl WheelNode {
    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        self.orientation
    }

    pub(crate) fn apply_reported_transform(
        &mut self,
        position: Vector3<f32>,
        orientation: Quaternion<f32>,
    ) {
        self.position = position;
        self.orientation = orientation;
    }
}

/// A raycast vehicle bound to a previously registered chassis object.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub(crate) id: u32,
    body_id: u32,
    tuning: VehicleTuning,
    pub(crate) wheels: Vec<WheelNode>,
}

impl Vehicle {
    pub(crate) fn new(body_id: u32, tuning: VehicleTuning) -> Self {
        Self {
            id: 0,
            body_id,
            tuning,
            wheels: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Id of the chassis object in the object registry.
    pub fn body_id(&self) -> u32 {
        self.body_id
    }

    pub fn tuning(&self) -> VehicleTuning {
        self.tuning
    }

    pub fn wheels(&self) -> &[WheelNode] {
        &self.wheels
    }

    pub fn wheel(&self, index: usize) -> Option<&WheelNode> {
        self.wheels.get(index)
    }

    fn check_wheel(&self, wheel: usize) -> BridgeResult<()> {
        if wheel < self.wheels.len() {
            Ok(())
        } else {
            Err(BridgeError::InvalidWheel {
                vehicle: self.id,
                wheel,
            })
        }
    }

    pub fn set_steering(
        &self,
        channel: &CommandChannel,
        wheel: usize,
        steering: f32,
    ) -> BridgeResult<()> {
        self.check_wheel(wheel)?;
        channel.execute(Command::SetSteering {
            id: self.id,
            wheel,
            steering,
        })
    }

    pub fn apply_engine_force(
        &self,
        channel: &CommandChannel,
        wheel: usize,
        force: f32,
    ) -> BridgeResult<()> {
        self.check_wheel(wheel)?;
        channel.execute(Command::ApplyEngineForce {
            id: self.id,
            wheel,
            force,
        })
    }

    pub fn set_brake(&self, channel: &CommandChannel, wheel: usize, brake: f32) -> BridgeResult<()> {
        self.check_wheel(wheel)?;
        channel.execute(Command::SetBrake {
            id: self.id,
            wheel,
            brake,
        })
    }
}
