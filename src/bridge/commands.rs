//! Commands sent from the host to the physics engine worker.
//!
//! Every command crosses the boundary as a single `{cmd, params}` envelope,
//! fire-and-forget: there is no response channel, and callers may assume
//! nothing beyond FIFO delivery on the one channel.

use cgmath::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Wire form of one outbound command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub cmd: String,
    pub params: Value,
}

/// Commands the synchronization layer can send to the engine worker.
#[derive(Debug, Clone)]
pub enum Command {
    /// Configure the world before anything is registered.
    Init {
        fixed_time_step: f32,
        max_sub_steps: u32,
        report_chunk_size: usize,
    },

    /// Register an object; `description` carries the shape payload plus the
    /// authored transform, mass and material.
    AddObject { description: Value },

    RemoveObject { id: u32 },

    AddVehicle { description: Value },

    RemoveVehicle { id: u32 },

    AddWheel { description: Value },

    AddConstraint { definition: Value },

    RemoveConstraint { id: u32 },

    /// Forward an application-authored transform; only the dirty axes are
    /// present.
    UpdateTransform {
        id: u32,
        position: Option<Vector3<f32>>,
        rotation: Option<Quaternion<f32>>,
    },

    UpdateMass { id: u32, mass: f32 },

    /// Advance the simulation one tick.
    Simulate {
        time_step: Option<f32>,
        max_sub_steps: u32,
    },

    SetGravity { gravity: Vector3<f32> },

    SetFixedTimeStep { value: f32 },

    /// Pin a soft-body vertex to a rigid body.
    AppendAnchor {
        id: u32,
        other_id: u32,
        node_index: u32,
        influence: f32,
        collide_between_linked: bool,
    },

    ApplyCentralImpulse { id: u32, impulse: Vector3<f32> },

    ApplyImpulse {
        id: u32,
        impulse: Vector3<f32>,
        offset: Vector3<f32>,
    },

    ApplyTorque { id: u32, torque: Vector3<f32> },

    ApplyCentralForce { id: u32, force: Vector3<f32> },

    SetLinearVelocity { id: u32, velocity: Vector3<f32> },

    SetAngularVelocity { id: u32, velocity: Vector3<f32> },

    SetDamping { id: u32, linear: f32, angular: f32 },

    SetSteering {
        id: u32,
        wheel: usize,
        steering: f32,
    },

    ApplyEngineForce { id: u32, wheel: usize, force: f32 },

    SetBrake { id: u32, wheel: usize, brake: f32 },

    HingeSetLimits {
        id: u32,
        low: f32,
        high: f32,
        bias_factor: f32,
        relaxation_factor: f32,
    },

    HingeEnableAngularMotor {
        id: u32,
        velocity: f32,
        acceleration: f32,
    },

    HingeDisableMotor { id: u32 },

    SliderSetLimits { id: u32, lower: f32, upper: f32 },

    SliderSetRestitution { id: u32, linear: f32, angular: f32 },
}

/// `{x, y, z}` parameter object for a vector.
pub(crate) fn vector_param(v: Vector3<f32>) -> Value {
    json!({ "x": v.x, "y": v.y, "z": v.z })
}

/// `{x, y, z, w}` parameter object for a quaternion.
pub(crate) fn quaternion_param(q: Quaternion<f32>) -> Value {
    json!({ "x": q.v.x, "y": q.v.y, "z": q.v.z, "w": q.s })
}

impl Command {
    /// Wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init { .. } => "init",
            Command::AddObject { .. } => "addObject",
            Command::RemoveObject { .. } => "removeObject",
            Command::AddVehicle { .. } => "addVehicle",
            Command::RemoveVehicle { .. } => "removeVehicle",
            Command::AddWheel { .. } => "addWheel",
            Command::AddConstraint { .. } => "addConstraint",
            Command::RemoveConstraint { .. } => "removeConstraint",
            Command::UpdateTransform { .. } => "updateTransform",
            Command::UpdateMass { .. } => "updateMass",
            Command::Simulate { .. } => "simulate",
            Command::SetGravity { .. } => "setGravity",
            Command::SetFixedTimeStep { .. } => "setFixedTimeStep",
            Command::AppendAnchor { .. } => "appendAnchor",
            Command::ApplyCentralImpulse { .. } => "applyCentralImpulse",
            Command::ApplyImpulse { .. } => "applyImpulse",
            Command::ApplyTorque { .. } => "applyTorque",
            Command::ApplyCentralForce { .. } => "applyCentralForce",
            Command::SetLinearVelocity { .. } => "setLinearVelocity",
            Command::SetAngularVelocity { .. } => "setAngularVelocity",
            Command::SetDamping { .. } => "setDamping",
            Command::SetSteering { .. } => "setSteering",
            Command::ApplyEngineForce { .. } => "applyEngineForce",
            Command::SetBrake { .. } => "setBrake",
            Command::HingeSetLimits { .. } => "hinge_setLimits",
            Command::HingeEnableAngularMotor { .. } => "hinge_enableAngularMotor",
            Command::HingeDisableMotor { .. } => "hinge_disableMotor",
            Command::SliderSetLimits { .. } => "slider_setLimits",
            Command::SliderSetRestitution { .. } => "slider_setRestitution",
        }
    }

    /// Parameter payload of this command.
    pub fn params(&self) -> Value {
        match self {
            Command::Init {
                fixed_time_step,
                max_sub_steps,
                report_chunk_size,
            } => json!({
                "fixedTimeStep": fixed_time_step,
                "maxSubSteps": max_sub_steps,
                "reportChunkSize": report_chunk_size,
            }),
            Command::AddObject { description } => description.clone(),
            Command::RemoveObject { id } => json!({ "id": id }),
            Command::AddVehicle { description } => description.clone(),
            Command::RemoveVehicle { id } => json!({ "id": id }),
            Command::AddWheel { description } => description.clone(),
            Command::AddConstraint { definition } => definition.clone(),
            Command::RemoveConstraint { id } => json!({ "id": id }),
            Command::UpdateTransform {
                id,
                position,
                rotation,
            } => {
                let mut params = serde_json::Map::new();
                params.insert("id".into(), json!(id));
                if let Some(position) = position {
                    params.insert("pos".into(), vector_param(*position));
                }
                if let Some(rotation) = rotation {
                    params.insert("quat".into(), quaternion_param(*rotation));
                }
                Value::Object(params)
            }
            Command::UpdateMass { id, mass } => json!({ "id": id, "mass": mass }),
            Command::Simulate {
                time_step,
                max_sub_steps,
            } => json!({ "timeStep": time_step, "maxSubSteps": max_sub_steps }),
            Command::SetGravity { gravity } => vector_param(*gravity),
            Command::SetFixedTimeStep { value } => json!(value),
            Command::AppendAnchor {
                id,
                other_id,
                node_index,
                influence,
                collide_between_linked,
            } => json!({
                "obj": id,
                "obj2": other_id,
                "node": node_index,
                "influence": influence,
                "collisionBetweenLinkedBodies": collide_between_linked,
            }),
            Command::ApplyCentralImpulse { id, impulse } => {
                json!({ "id": id, "impulse": vector_param(*impulse) })
            }
            Command::ApplyImpulse {
                id,
                impulse,
                offset,
            } => json!({
                "id": id,
                "impulse": vector_param(*impulse),
                "offset": vector_param(*offset),
            }),
            Command::ApplyTorque { id, torque } => {
                json!({ "id": id, "torque": vector_param(*torque) })
            }
            Command::ApplyCentralForce { id, force } => {
                json!({ "id": id, "force": vector_param(*force) })
            }
            Command::SetLinearVelocity { id, velocity } => {
                json!({ "id": id, "velocity": vector_param(*velocity) })
            }
            Command::SetAngularVelocity { id, velocity } => {
                json!({ "id": id, "velocity": vector_param(*velocity) })
            }
            Command::SetDamping {
                id,
                linear,
                angular,
            } => json!({ "id": id, "linear": linear, "angular": angular }),
            Command::SetSteering {
                id,
                wheel,
                steering,
            } => json!({ "id": id, "wheel": wheel, "steering": steering }),
            Command::ApplyEngineForce { id, wheel, force } => {
                json!({ "id": id, "wheel": wheel, "force": force })
            }
            Command::SetBrake { id, wheel, brake } => {
                json!({ "id": id, "wheel": wheel, "brake": brake })
            }
            Command::HingeSetLimits {
                id,
                low,
                high,
                bias_factor,
                relaxation_factor,
            } => json!({
                "id": id,
                "low": low,
                "high": high,
                "biasFactor": bias_factor,
                "relaxationFactor": relaxation_factor,
            }),
            Command::HingeEnableAngularMotor {
                id,
                velocity,
                acceleration,
            } => json!({ "id": id, "velocity": velocity, "acceleration": acceleration }),
            Command::HingeDisableMotor { id } => json!({ "id": id }),
            Command::SliderSetLimits { id, lower, upper } => {
                json!({ "id": id, "lower": lower, "upper": upper })
            }
            Command::SliderSetRestitution {
                id,
                linear,
                angular,
            } => json!({ "id": id, "linear": linear, "angular": angular }),
        }
    }

    /// Registry-mutating commands are held back until the engine world is
    /// ready, so no registration races engine initialization.
    pub(crate) fn is_deferrable(&self) -> bool {
        matches!(
            self,
            Command::AddObject { .. }
                | Command::RemoveObject { .. }
                | Command::AddVehicle { .. }
                | Command::RemoveVehicle { .. }
                | Command::AddWheel { .. }
                | Command::AddConstraint { .. }
                | Command::RemoveConstraint { .. }
                | Command::AppendAnchor { .. }
        )
    }

    /// Wrap into the wire envelope.
    pub fn envelope(&self) -> CommandEnvelope {
        CommandEnvelope {
            cmd: self.name().to_string(),
            params: self.params(),
        }
    }
}
