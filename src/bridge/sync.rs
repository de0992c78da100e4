//! The synchronization layer instance.
//!
//! `PhysicsScene` owns the registries, the command channel and the event
//! stream. Application code registers scene nodes and calls `simulate()`;
//! the worker's report buffers come back through `handle_message()`, which
//! routes them to the decoders that write engine results onto the nodes.

use crate::bridge::channel::CommandChannel;
use crate::bridge::collisions::ContactManifest;
use crate::bridge::commands::{quaternion_param, vector_param, Command};
use crate::bridge::dispatcher::{self, ControlMessage, Routed};
use crate::bridge::registry::WorldRegistry;
use crate::bridge::reports::{
    BodyFrame, ConstraintFrame, ContactPair, Report, SoftBodyReport, WheelFrame,
};
use crate::bridge::transport::{InboundPayload, WorkerTransport};
use crate::bridge::{BridgeError, BridgeResult};
use crate::config::SimulationSettings;
use crate::world::constraint::Constraint;
use crate::world::events::WorldEvent;
use crate::world::physics::BodyType;
use crate::world::scene::SceneNode;
use crate::world::vehicle::{Vehicle, VehicleTuning, WheelDescription};
use cgmath::Vector3;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Host-side scene synchronized with the engine worker.
pub struct PhysicsScene {
    channel: CommandChannel,
    registry: WorldRegistry,
    event_tx: Sender<WorldEvent>,
    event_rx: Receiver<WorldEvent>,
    is_simulating: bool,
    world_ready: bool,
    deferred: Vec<Command>,
    collisions: ContactManifest,
    settings: SimulationSettings,
}

impl PhysicsScene {
    /// Create a scene over the given transport and configure the engine
    /// world (`init` followed by `setGravity`).
    pub fn new(
        transport: Box<dyn WorkerTransport>,
        settings: SimulationSettings,
    ) -> BridgeResult<Self> {
        let channel = CommandChannel::new(transport);
        let (event_tx, event_rx) = unbounded();

        let scene = Self {
            channel,
            registry: WorldRegistry::new(),
            event_tx,
            event_rx,
            is_simulating: false,
            world_ready: false,
            deferred: Vec::new(),
            collisions: ContactManifest::default(),
            settings,
        };

        scene.channel.execute(Command::Init {
            fixed_time_step: scene.settings.fixed_time_step,
            max_sub_steps: scene.settings.max_sub_steps,
            report_chunk_size: scene.settings.report_chunk_size,
        })?;
        let [gx, gy, gz] = scene.settings.gravity;
        scene.channel.execute(Command::SetGravity {
            gravity: Vector3::new(gx, gy, gz),
        })?;

        info!("physics scene initialized");
        Ok(scene)
    }

    /// Event stream for `Updated`, `Collision` and readiness notifications.
    ///
    /// The receiver is cloneable but clones compete for events; hand the
    /// stream to one consumer.
    pub fn events(&self) -> Receiver<WorldEvent> {
        self.event_rx.clone()
    }

    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    pub fn registry(&self) -> &WorldRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn is_simulating(&self) -> bool {
        self.is_simulating
    }

    pub fn is_world_ready(&self) -> bool {
        self.world_ready
    }

    /// Contact manifest from the most recent collision report.
    pub fn collisions(&self) -> &ContactManifest {
        &self.collisions
    }

    pub fn object(&self, id: u32) -> Option<&SceneNode> {
        self.registry.object(id)
    }

    pub fn object_mut(&mut self, id: u32) -> Option<&mut SceneNode> {
        self.registry.object_mut(id)
    }

    pub fn vehicle(&self, id: u32) -> Option<&Vehicle> {
        self.registry.vehicle(id)
    }

    pub fn constraint(&self, id: u32) -> Option<&Constraint> {
        self.registry.constraint(id)
    }

    // ---- registration -----------------------------------------------------

    /// Register a scene node with the simulated world.
    ///
    /// The node's authored transform rides in the registration command, so
    /// its dirty flags are cleared here.
    pub fn add_object(&mut self, mut node: SceneNode) -> BridgeResult<u32> {
        let id = self.registry.allocate_id();
        node.data.id = id;

        let description = object_description(&node)?;
        node.clear_dirty_position();
        node.clear_dirty_rotation();
        self.registry.insert_object(id, node);

        self.dispatch(Command::AddObject { description })?;
        debug!(id, "object registered");
        Ok(id)
    }

    pub fn remove_object(&mut self, id: u32) -> BridgeResult<SceneNode> {
        let node = self
            .registry
            .remove_object(id)
            .ok_or(BridgeError::UnknownObject { id })?;
        self.dispatch(Command::RemoveObject { id })?;
        debug!(id, "object removed");
        Ok(node)
    }

    /// Register a vehicle bound to an already-registered chassis object.
    pub fn add_vehicle(&mut self, body_id: u32, tuning: VehicleTuning) -> BridgeResult<u32> {
        self.ensure_object(body_id)?;

        let id = self.registry.allocate_id();
        let mut vehicle = Vehicle::new(body_id, tuning);
        vehicle.id = id;

        let description = json!({
            "id": id,
            "rigidBody": body_id,
            "tuning": tuning,
        });
        self.registry.insert_vehicle(id, vehicle);

        self.dispatch(Command::AddVehicle { description })?;
        debug!(id, body_id, "vehicle registered");
        Ok(id)
    }

    pub fn remove_vehicle(&mut self, id: u32) -> BridgeResult<Vehicle> {
        let vehicle = self
            .registry
            .remove_vehicle(id)
            .ok_or(BridgeError::UnknownVehicle { id })?;
        self.dispatch(Command::RemoveVehicle { id })?;
        debug!(id, "vehicle removed");
        Ok(vehicle)
    }

    /// Attach a wheel; returns its index on the vehicle.
    pub fn add_wheel(
        &mut self,
        vehicle_id: u32,
        description: WheelDescription,
    ) -> BridgeResult<usize> {
        let vehicle = self
            .registry
            .vehicle_mut(vehicle_id)
            .ok_or(BridgeError::UnknownVehicle { id: vehicle_id })?;
        let index = vehicle.wheels.len();
        vehicle.wheels.push(Default::default());

        let mut params =
            serde_json::to_value(&description).map_err(|e| BridgeError::CommandEncode {
                reason: format!("wheel description: {}", e),
            })?;
        if let Some(map) = params.as_object_mut() {
            map.insert("id".into(), json!(vehicle_id));
            map.insert("index".into(), json!(index));
        }

        self.dispatch(Command::AddWheel {
            description: params,
        })?;
        Ok(index)
    }

    pub fn add_constraint(&mut self, mut constraint: Constraint) -> BridgeResult<u32> {
        let id = self.registry.allocate_id();
        constraint.id = id;

        let definition = constraint.definition();
        self.registry.insert_constraint(id, constraint);

        self.dispatch(Command::AddConstraint { definition })?;
        debug!(id, "constraint registered");
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: u32) -> BridgeResult<Constraint> {
        let constraint = self
            .registry
            .remove_constraint(id)
            .ok_or(BridgeError::UnknownConstraint { id })?;
        self.dispatch(Command::RemoveConstraint { id })?;
        debug!(id, "constraint removed");
        Ok(constraint)
    }

    // ---- world and body commands ------------------------------------------

    pub fn set_gravity(&mut self, gravity: Vector3<f32>) -> BridgeResult<()> {
        self.settings.gravity = [gravity.x, gravity.y, gravity.z];
        self.dispatch(Command::SetGravity { gravity })
    }

    pub fn set_fixed_time_step(&mut self, value: f32) -> BridgeResult<()> {
        self.settings.fixed_time_step = value;
        self.dispatch(Command::SetFixedTimeStep { value })
    }

    /// Pin a soft-body vertex to a rigid body.
    pub fn append_anchor(
        &mut self,
        id: u32,
        other_id: u32,
        node_index: u32,
        influence: f32,
        collide_between_linked: bool,
    ) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.ensure_object(other_id)?;
        self.dispatch(Command::AppendAnchor {
            id,
            other_id,
            node_index,
            influence,
            collide_between_linked,
        })
    }

    pub fn apply_central_impulse(&mut self, id: u32, impulse: Vector3<f32>) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.dispatch(Command::ApplyCentralImpulse { id, impulse })
    }

    pub fn apply_impulse(
        &mut self,
        id: u32,
        impulse: Vector3<f32>,
        offset: Vector3<f32>,
    ) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.dispatch(Command::ApplyImpulse {
            id,
            impulse,
            offset,
        })
    }

    pub fn apply_torque(&mut self, id: u32, torque: Vector3<f32>) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.dispatch(Command::ApplyTorque { id, torque })
    }

    pub fn apply_central_force(&mut self, id: u32, force: Vector3<f32>) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.dispatch(Command::ApplyCentralForce { id, force })
    }

    pub fn set_linear_velocity(&mut self, id: u32, velocity: Vector3<f32>) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.dispatch(Command::SetLinearVelocity { id, velocity })
    }

    pub fn set_angular_velocity(&mut self, id: u32, velocity: Vector3<f32>) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.dispatch(Command::SetAngularVelocity { id, velocity })
    }

    pub fn set_damping(&mut self, id: u32, linear: f32, angular: f32) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.dispatch(Command::SetDamping {
            id,
            linear,
            angular,
        })
    }

    pub fn update_mass(&mut self, id: u32, mass: f32) -> BridgeResult<()> {
        self.ensure_object(id)?;
        self.dispatch(Command::UpdateMass { id, mass })
    }

    // ---- tick -------------------------------------------------------------

    /// Forward dirty application transforms and request one simulation tick.
    ///
    /// Returns `Ok(false)` without side effects while a tick is already
    /// outstanding; the flag clears when the next world report is applied.
    pub fn simulate(
        &mut self,
        time_step: Option<f32>,
        max_sub_steps: Option<u32>,
    ) -> BridgeResult<bool> {
        if self.is_simulating {
            return Ok(false);
        }

        let mut transforms = Vec::new();
        for node in self.registry.objects_mut() {
            if !node.is_position_dirty() && !node.is_rotation_dirty() {
                continue;
            }

            let id = node.data().id();
            let mut position = None;
            let mut rotation = None;

            if node.is_position_dirty() {
                position = Some(node.position());
                if node.data().is_softbody() {
                    // Soft vertex data is world-space; the node stays at the
                    // origin once its transform has been forwarded.
                    node.apply_reported_position(Vector3::new(0.0, 0.0, 0.0));
                }
                node.clear_dirty_position();
            }
            if node.is_rotation_dirty() {
                rotation = Some(node.orientation());
                node.clear_dirty_rotation();
            }

            transforms.push(Command::UpdateTransform {
                id,
                position,
                rotation,
            });
        }

        for command in transforms {
            self.dispatch(command)?;
        }

        self.dispatch(Command::Simulate {
            time_step,
            max_sub_steps: max_sub_steps.unwrap_or(self.settings.max_sub_steps),
        })?;
        self.is_simulating = true;
        Ok(true)
    }

    // ---- inbound ----------------------------------------------------------

    /// Decode one message from the worker and apply it to the scene.
    pub fn handle_message(&mut self, payload: InboundPayload) -> BridgeResult<()> {
        match dispatcher::route(payload)? {
            Routed::Ignored => Ok(()),
            Routed::Report { report, buffer } => {
                match report {
                    Report::World(frames) => self.apply_world_report(&frames),
                    Report::Collision(pairs) => self.update_collisions(&pairs),
                    Report::Vehicle(frames) => self.apply_vehicle_report(&frames),
                    Report::Constraint(frames) => self.apply_constraint_report(&frames),
                    Report::SoftBody(soft) => {
                        // Soft-body buffers are retained, never handed back.
                        return self.apply_soft_report(&soft);
                    }
                }
                if let Some(buffer) = buffer {
                    self.channel.return_buffer(buffer)?;
                }
                Ok(())
            }
            Routed::Control(message) => self.handle_control(message),
        }
    }

    fn handle_control(&mut self, message: ControlMessage) -> BridgeResult<()> {
        match message {
            ControlMessage::EngineLoaded => {
                info!("engine runtime loaded in worker");
                self.emit_event(WorldEvent::EngineLoaded);
            }
            ControlMessage::WorldReady => {
                info!(
                    deferred = self.deferred.len(),
                    "engine world ready, flushing deferred commands"
                );
                self.world_ready = true;
                let deferred = std::mem::take(&mut self.deferred);
                for command in deferred {
                    self.channel.execute(command)?;
                }
                self.emit_event(WorldEvent::WorldReady);
            }
            ControlMessage::ObjectReady { id } => {
                self.emit_event(WorldEvent::ObjectReady { id });
            }
            ControlMessage::VehicleReady { id } => {
                self.emit_event(WorldEvent::VehicleReady { id });
            }
            ControlMessage::Unknown { cmd } => {
                debug!(%cmd, "dropping unrecognized control message");
            }
        }
        Ok(())
    }

    // ---- decoders ---------------------------------------------------------

    fn apply_world_report(&mut self, frames: &[BodyFrame]) {
        for frame in frames {
            let Some(node) = self.registry.object_mut(frame.id) else {
                // Removed mid-flight; reports and removals race by design.
                continue;
            };

            if !node.is_position_dirty() {
                node.apply_reported_position(frame.position);
            }
            if !node.is_rotation_dirty() {
                node.apply_reported_orientation(frame.orientation);
            }
            // Velocities have no dirty concept: the application never
            // authors them directly.
            node.data.linear_velocity = frame.linear_velocity;
            node.data.angular_velocity = frame.angular_velocity;
        }

        self.is_simulating = false;
        self.emit_event(WorldEvent::Updated);
    }

    fn apply_vehicle_report(&mut self, frames: &[WheelFrame]) {
        for frame in frames {
            let Some(vehicle) = self.registry.vehicle_mut(frame.vehicle_id) else {
                continue;
            };
            let Some(wheel) = vehicle.wheels.get_mut(frame.wheel_index) else {
                continue;
            };
            wheel.apply_reported_transform(frame.position, frame.orientation);
        }
    }

    fn apply_constraint_report(&mut self, frames: &[ConstraintFrame]) {
        for frame in frames {
            // The reported anchor is this recomputation from the object's
            // current transform, not a stored value.
            let Some(object) = self.registry.object(frame.object_id) else {
                continue;
            };
            let anchor = object.local_to_world(frame.local_offset);

            let Some(constraint) = self.registry.constraint_mut(frame.constraint_id) else {
                continue;
            };
            constraint.world_anchor = anchor;
            constraint.applied_impulse = frame.applied_impulse;
        }
    }

    fn apply_soft_report(&mut self, report: &SoftBodyReport) -> BridgeResult<()> {
        let values = &report.values;
        let mut offset = 2usize;

        for _ in 0..report.object_count {
            if offset + 2 > values.len() {
                return Err(BridgeError::ReportDecode {
                    reason: "soft report truncated at record header".to_string(),
                });
            }
            let id = values[offset] as u32;
            let units = values[offset + 1] as usize;

            let Some(node) = self.registry.object_mut(id) else {
                // The vertex stride comes from the registered subtype, so an
                // unknown id makes the rest of the buffer unwalkable.
                debug!(id, "soft report references unknown object, dropping remainder");
                break;
            };

            let stride = soft_vertex_stride(node.data().body_type());
            let start = offset + 2;
            let end = start + units * stride;
            if end > values.len() {
                return Err(BridgeError::ReportDecode {
                    reason: format!(
                        "soft record for object {} needs {} values, have {}",
                        id,
                        units * stride,
                        values.len() - start
                    ),
                });
            }
            let payload = &values[start..end];

            // Soft vertex data is world-space; zero the node transform once
            // so it is not applied twice.
            if !node.data.soft_body_reset {
                node.reset_world_transform();
                node.data.soft_body_reset = true;
            }

            let geometry = node.ensure_soft_geometry();
            geometry.positions.clear();
            geometry.normals.clear();
            match stride {
                // One triangle per unit, three vertices of [pos, normal].
                18 => {
                    for face in payload.chunks_exact(18) {
                        for vertex in face.chunks_exact(6) {
                            geometry.positions.extend_from_slice(&vertex[0..3]);
                            geometry.normals.extend_from_slice(&vertex[3..6]);
                        }
                    }
                }
                // Rope nodes carry positions only.
                3 => geometry.positions.extend_from_slice(payload),
                // Cloth and anything else: flat per-vertex [pos, normal].
                _ => {
                    for vertex in payload.chunks_exact(6) {
                        geometry.positions.extend_from_slice(&vertex[0..3]);
                        geometry.normals.extend_from_slice(&vertex[3..6]);
                    }
                }
            }
            geometry.needs_upload = true;

            offset = end;
        }
        Ok(())
    }

    fn update_collisions(&mut self, pairs: &[ContactPair]) {
        let manifest = ContactManifest::from_pairs(pairs);

        for id in self.registry.object_ids() {
            let Some(partners) = manifest.contacts_of(id) else {
                // No manifest entry at all: every touch ended this tick.
                if let Some(node) = self.registry.object_mut(id) {
                    node.data.touches.clear();
                }
                continue;
            };

            let Some(node) = self.registry.object(id) else {
                continue;
            };
            let own_linear = node.data().linear_velocity();
            let own_angular = node.data().angular_velocity();

            // New contacts first, against the pre-diff touch set; partners
            // that no longer resolve in the registry are not promoted.
            let mut fresh = Vec::new();
            for &other in partners {
                if node.data().touches().contains(&other) {
                    continue;
                }
                let Some(other_node) = self.registry.object(other) else {
                    continue;
                };
                let relative_linear = own_linear - other_node.data().linear_velocity();
                let relative_angular = own_angular - other_node.data().angular_velocity();
                let normal = manifest
                    .normal_between(id, other)
                    .unwrap_or_else(|| Vector3::new(0.0, 0.0, 0.0));
                fresh.push((other, relative_linear, relative_angular, normal));
            }

            if let Some(node) = self.registry.object_mut(id) {
                node.data.touches.retain(|touch| partners.contains(touch));
                for (other, relative_linear, relative_angular, normal) in fresh {
                    node.data.touches.insert(other);
                    let event = WorldEvent::Collision {
                        object_id: id,
                        other_id: other,
                        relative_linear_velocity: relative_linear,
                        relative_angular_velocity: relative_angular,
                        contact_normal: normal,
                    };
                    if self.event_tx.send(event).is_err() {
                        // No subscribers, which is fine
                    }
                }
            }
        }

        self.collisions = manifest;
    }

    // ---- helpers ----------------------------------------------------------

    fn dispatch(&mut self, command: Command) -> BridgeResult<()> {
        if !self.world_ready && command.is_deferrable() {
            debug!(cmd = command.name(), "world not ready, deferring command");
            self.deferred.push(command);
            return Ok(());
        }
        self.channel.execute(command)
    }

    fn ensure_object(&self, id: u32) -> BridgeResult<()> {
        if self.registry.object(id).is_some() {
            Ok(())
        } else {
            Err(BridgeError::UnknownObject { id })
        }
    }

    fn emit_event(&self, event: WorldEvent) {
        if self.event_tx.send(event).is_err() {
            // No subscribers, which is fine
        }
    }
}

/// Registration parameters for `addObject`: the shape payload plus the
/// authored transform, mass and material.
fn object_description(node: &SceneNode) -> BridgeResult<Value> {
    let mut description =
        serde_json::to_value(node.data().shape()).map_err(|e| BridgeError::CommandEncode {
            reason: format!("shape payload: {}", e),
        })?;

    let Some(map) = description.as_object_mut() else {
        return Err(BridgeError::CommandEncode {
            reason: "shape payload did not serialize to an object".to_string(),
        });
    };
    map.insert("id".into(), json!(node.data().id()));
    map.insert("mass".into(), json!(node.data().mass()));
    map.insert("friction".into(), json!(node.data().material().friction));
    map.insert(
        "restitution".into(),
        json!(node.data().material().restitution),
    );
    map.insert("position".into(), vector_param(node.position()));
    map.insert("rotation".into(), quaternion_param(node.orientation()));
    map.insert("scale".into(), vector_param(node.scale()));

    Ok(description)
}

fn soft_vertex_stride(body_type: BodyType) -> usize {
    match body_type {
        BodyType::SoftTrimesh => 18,
        BodyType::SoftRopeMesh => 3,
        _ => 6,
    }
}
