//! End-to-end tests of the synchronization layer over an in-process
//! transport: command flow, dirty-flag arbitration, report decoding,
//! collision edge triggering and buffer handback.

use bytes::Bytes;
use cgmath::{Quaternion, Rotation, Vector3};
use crossbeam_channel::Receiver;
use serde_json::json;
use simbridge::{
    ChannelTransport, CommandEnvelope, InboundPayload, Material, PhysicsData, PhysicsScene,
    SceneNode, ShapeData, SimulationSettings, VehicleTuning, WheelDescription, WorldEvent,
};

fn new_scene() -> (PhysicsScene, Receiver<CommandEnvelope>, Receiver<Bytes>) {
    let (transport, commands, returns) = ChannelTransport::new();
    let scene = PhysicsScene::new(Box::new(transport), SimulationSettings::default()).unwrap();
    (scene, commands, returns)
}

/// Scene whose engine world has already reported ready.
fn ready_scene() -> (PhysicsScene, Receiver<CommandEnvelope>, Receiver<Bytes>) {
    let (mut scene, commands, returns) = new_scene();
    scene
        .handle_message(InboundPayload::Control(json!({ "cmd": "worldReady" })))
        .unwrap();
    drain(&commands);
    drain_events(&scene);
    (scene, commands, returns)
}

fn drain(rx: &Receiver<CommandEnvelope>) -> Vec<CommandEnvelope> {
    rx.try_iter().collect()
}

fn drain_events(scene: &PhysicsScene) -> Vec<WorldEvent> {
    scene.events().try_iter().collect()
}

fn box_node() -> SceneNode {
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

fn to_bytes(values: &[f32]) -> Bytes {
    Bytes::from(
        values
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<u8>>(),
    )
}

type BodyTuple = (u32, [f32; 3], [f32; 4], [f32; 3], [f32; 3]);

/// `[tag, count, (id, pos, quat xyzw, linvel, angvel)...]`
fn world_report(bodies: &[BodyTuple]) -> Vec<f32> {
    let mut values = vec![0.0, bodies.len() as f32];
    for (id, pos, quat, linvel, angvel) in bodies {
        values.push(*id as f32);
        values.extend_from_slice(pos);
        values.extend_from_slice(quat);
        values.extend_from_slice(linvel);
        values.extend_from_slice(angvel);
    }
    values
}

fn collision_report(pairs: &[(u32, u32, [f32; 3])]) -> Vec<f32> {
    let mut values = vec![1.0, pairs.len() as f32];
    for (a, b, normal) in pairs {
        values.push(*a as f32);
        values.push(*b as f32);
        values.extend_from_slice(normal);
    }
    values
}

#[test]
fn test_init_commands_sent_at_construction() {
    let (_scene, commands, _returns) = new_scene();
    let sent = drain(&commands);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].cmd, "init");
    assert_eq!(sent[1].cmd, "setGravity");
    assert_eq!(sent[1].params["y"], -10.0);
}

#[test]
fn test_registrations_deferred_until_world_ready() {
    let (mut scene, commands, _returns) = new_scene();
    drain(&commands);

    let first = scene.add_object(box_node()).unwrap();
    let second = scene.add_object(box_node()).unwrap();
    assert!(first < second);

    // Nothing crosses the boundary before the world is ready, but the
    // registry already resolves both ids.
    assert!(drain(&commands).is_empty());
    assert!(scene.object(first).is_some());

    scene
        .handle_message(InboundPayload::Control(json!({ "cmd": "worldReady" })))
        .unwrap();

    let sent = drain(&commands);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].cmd, "addObject");
    assert_eq!(sent[0].params["id"], first);
    assert_eq!(sent[1].params["id"], second);
    assert!(scene.is_world_ready());
}

#[test]
fn test_add_object_description() {
    let (mut scene, commands, _returns) = ready_scene();

    let mut node = box_node();
    node.set_position(Vector3::new(1.0, 2.0, 3.0));
    let id = scene.add_object(node).unwrap();

    let sent = drain(&commands);
    assert_eq!(sent[0].cmd, "addObject");
    assert_eq!(sent[0].params["type"], "box");
    assert_eq!(sent[0].params["mass"], 1.0);
    assert_eq!(sent[0].params["position"]["y"], 2.0);

    // The authored transform rode along in the registration, so the node
    // starts clean.
    assert!(!scene.object(id).unwrap().is_position_dirty());
}

#[test]
fn test_dirty_position_blocks_report_then_syncs() {
    let (mut scene, commands, _returns) = ready_scene();
    let id = scene.add_object(box_node()).unwrap();
    drain(&commands);

    scene
        .object_mut(id)
        .unwrap()
        .set_position(Vector3::new(10.0, 0.0, 0.0));

    // An engine report while the flag is raised must not clobber the
    // application write, but velocities still land.
    let report = world_report(&[(
        id,
        [99.0, 99.0, 99.0],
        [0.0, 0.0, 0.0, 1.0],
        [1.0, 2.0, 3.0],
        [4.0, 5.0, 6.0],
    )]);
    scene.handle_message(InboundPayload::Values(report)).unwrap();

    let node = scene.object(id).unwrap();
    assert_eq!(node.position(), Vector3::new(10.0, 0.0, 0.0));
    assert!(node.is_position_dirty());
    assert_eq!(node.data().linear_velocity(), Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(node.data().angular_velocity(), Vector3::new(4.0, 5.0, 6.0));

    // simulate() forwards the transform and clears the flag.
    assert!(scene.simulate(None, None).unwrap());
    let sent = drain(&commands);
    assert_eq!(sent[0].cmd, "updateTransform");
    assert_eq!(sent[0].params["pos"]["x"], 10.0);
    assert!(sent[0].params.get("quat").is_none());
    assert_eq!(sent[1].cmd, "simulate");
    assert!(!scene.object(id).unwrap().is_position_dirty());

    // With the flag clear, the next report is authoritative again.
    let report = world_report(&[(
        id,
        [99.0, 99.0, 99.0],
        [0.0, 0.0, 0.0, 1.0],
        [0.0; 3],
        [0.0; 3],
    )]);
    scene.handle_message(InboundPayload::Values(report)).unwrap();
    assert_eq!(
        scene.object(id).unwrap().position(),
        Vector3::new(99.0, 99.0, 99.0)
    );
}

#[test]
fn test_world_report_round_trip() {
    let (mut scene, commands, returns) = ready_scene();
    let a = scene.add_object(box_node()).unwrap();
    let b = scene.add_object(box_node()).unwrap();
    drain(&commands);

    let half = std::f32::consts::FRAC_1_SQRT_2;
    let report = world_report(&[
        (
            a,
            [1.5, -2.0, 3.25],
            [0.0, 0.0, half, half],
            [0.5, 0.0, 0.0],
            [0.0, 0.25, 0.0],
        ),
        (
            b,
            [-4.0, 0.5, 8.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 0.0],
        ),
    ]);
    let buffer = to_bytes(&report);
    scene
        .handle_message(InboundPayload::Binary(buffer.clone()))
        .unwrap();

    let node = scene.object(a).unwrap();
    assert_eq!(node.position(), Vector3::new(1.5, -2.0, 3.25));
    let orientation = node.orientation();
    assert!((orientation.s - half).abs() < 1e-6);
    assert!((orientation.v.z - half).abs() < 1e-6);
    assert_eq!(node.data().linear_velocity(), Vector3::new(0.5, 0.0, 0.0));

    let node = scene.object(b).unwrap();
    assert_eq!(node.position(), Vector3::new(-4.0, 0.5, 8.0));

    // Fast-path buffers go straight back to the worker after decode.
    let returned = returns.try_recv().unwrap();
    assert_eq!(returned, buffer);

    let events = drain_events(&scene);
    assert!(events
        .iter()
        .any(|event| matches!(event, WorldEvent::Updated)));
}

#[test]
fn test_missing_id_is_skipped() {
    let (mut scene, commands, _returns) = ready_scene();
    let id = scene.add_object(box_node()).unwrap();
    drain(&commands);

    let report = world_report(&[
        (
            999,
            [5.0, 5.0, 5.0],
            [0.0, 0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0; 3],
        ),
        (
            id,
            [2.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.0; 3],
            [0.0; 3],
        ),
    ]);
    scene.handle_message(InboundPayload::Values(report)).unwrap();

    // The stale record vanished without error; the live one applied.
    assert_eq!(scene.object(id).unwrap().position(), Vector3::new(2.0, 0.0, 0.0));
}

#[test]
fn test_simulate_admission_control() {
    let (mut scene, commands, _returns) = ready_scene();
    let id = scene.add_object(box_node()).unwrap();
    drain(&commands);

    assert!(scene.simulate(Some(1.0 / 60.0), None).unwrap());
    assert!(scene.is_simulating());

    // A second request while a tick is outstanding is rejected, silently.
    assert!(!scene.simulate(Some(1.0 / 60.0), None).unwrap());
    assert_eq!(drain(&commands).len(), 1); // only the first simulate

    // The world report for the tick re-opens the gate.
    let report = world_report(&[(
        id,
        [0.0; 3],
        [0.0, 0.0, 0.0, 1.0],
        [0.0; 3],
        [0.0; 3],
    )]);
    scene.handle_message(InboundPayload::Values(report)).unwrap();
    assert!(!scene.is_simulating());
    assert!(scene.simulate(None, None).unwrap());
}

#[test]
fn test_collision_edge_triggering() {
    let (mut scene, commands, _returns) = ready_scene();
    let a = scene.add_object(box_node()).unwrap();
    let b = scene.add_object(box_node()).unwrap();
    drain(&commands);

    // Give the two bodies known velocities first.
    let report = world_report(&[
        (
            a,
            [0.0; 3],
            [0.0, 0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.5, 0.0],
        ),
        (
            b,
            [0.0; 3],
            [0.0, 0.0, 0.0, 1.0],
            [0.0; 3],
            [0.0; 3],
        ),
    ]);
    scene.handle_message(InboundPayload::Values(report)).unwrap();
    drain_events(&scene);

    // Tick 1: the pair appears; each side gets exactly one notification.
    let normal = [0.0, 1.0, 0.0];
    scene
        .handle_message(InboundPayload::Values(collision_report(&[(a, b, normal)])))
        .unwrap();

    let events = drain_events(&scene);
    let collisions: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            WorldEvent::Collision {
                object_id,
                other_id,
                relative_linear_velocity,
                contact_normal,
                ..
            } => Some((*object_id, *other_id, *relative_linear_velocity, *contact_normal)),
            _ => None,
        })
        .collect();
    assert_eq!(collisions.len(), 2);

    let for_a = collisions.iter().find(|c| c.0 == a).unwrap();
    assert_eq!(for_a.1, b);
    assert_eq!(for_a.2, Vector3::new(1.0, 0.0, 0.0));
    // The raw normal is expressed from the other side; a sees it flipped.
    assert_eq!(for_a.3, Vector3::new(0.0, -1.0, 0.0));

    let for_b = collisions.iter().find(|c| c.0 == b).unwrap();
    assert_eq!(for_b.2, Vector3::new(-1.0, 0.0, 0.0));
    assert_eq!(for_b.3, Vector3::new(0.0, 1.0, 0.0));

    assert!(scene.object(a).unwrap().data().touches().contains(&b));

    // Tick 2: same manifest, still touching, no new notification.
    scene
        .handle_message(InboundPayload::Values(collision_report(&[(a, b, normal)])))
        .unwrap();
    assert!(drain_events(&scene)
        .iter()
        .all(|event| !matches!(event, WorldEvent::Collision { .. })));

    // Tick 3: empty manifest, touch sets clear silently.
    scene
        .handle_message(InboundPayload::Values(collision_report(&[])))
        .unwrap();
    assert!(scene.object(a).unwrap().data().touches().is_empty());
    assert!(scene.object(b).unwrap().data().touches().is_empty());
    assert!(drain_events(&scene)
        .iter()
        .all(|event| !matches!(event, WorldEvent::Collision { .. })));
}

#[test]
fn test_soft_trimesh_stride_and_reset() {
    let (mut scene, commands, returns) = ready_scene();
    let mut node = SceneNode::new(PhysicsData::new(
        ShapeData::SoftTrimesh {
            vertices: vec![0.0; 9],
            triangles: vec![0, 1, 2],
            pressure: 0.0,
        },
        1.0,
        Material::default(),
    ));
    node.set_position(Vector3::new(3.0, 3.0, 3.0));
    let id = scene.add_object(node).unwrap();
    drain(&commands);

    // Two triangles, 18 values each, after the [id, unit_count] header.
    let mut values = vec![4.0, 1.0, id as f32, 2.0];
    for i in 0..36 {
        values.push(i as f32);
    }
    scene
        .handle_message(InboundPayload::Binary(to_bytes(&values)))
        .unwrap();

    let node = scene.object(id).unwrap();
    let geometry = node.soft_geometry().unwrap();
    assert_eq!(geometry.positions().len(), 18);
    assert_eq!(geometry.normals().len(), 18);
    // First vertex: positions 0..3, normals 3..6 of the record.
    assert_eq!(&geometry.positions()[0..3], &[0.0, 1.0, 2.0]);
    assert_eq!(&geometry.normals()[0..3], &[3.0, 4.0, 5.0]);
    assert!(geometry.needs_upload());

    // First soft report zeroes the node transform, exactly once.
    assert_eq!(node.position(), Vector3::new(0.0, 0.0, 0.0));
    scene
        .object_mut(id)
        .unwrap()
        .set_position(Vector3::new(7.0, 0.0, 0.0));
    let mut values = vec![4.0, 1.0, id as f32, 1.0];
    values.extend(std::iter::repeat(0.0).take(18));
    scene
        .handle_message(InboundPayload::Binary(to_bytes(&values)))
        .unwrap();
    assert_eq!(
        scene.object(id).unwrap().position(),
        Vector3::new(7.0, 0.0, 0.0)
    );

    // Soft-body buffers are never handed back.
    assert!(returns.try_recv().is_err());
}

#[test]
fn test_soft_report_running_offset_across_records() {
    let (mut scene, commands, _returns) = ready_scene();
    let trimesh = scene
        .add_object(SceneNode::new(PhysicsData::new(
            ShapeData::SoftTrimesh {
                vertices: vec![0.0; 9],
                triangles: vec![0, 1, 2],
                pressure: 0.0,
            },
            1.0,
            Material::default(),
        )))
        .unwrap();
    let rope = scene
        .add_object(SceneNode::new(PhysicsData::new(
            ShapeData::SoftRopeMesh {
                points: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            },
            1.0,
            Material::default(),
        )))
        .unwrap();
    drain(&commands);

    // One trimesh record (1 unit of 18) followed by one rope record
    // (5 units of 3); a wrong stride for either would misalign the second.
    let mut values = vec![4.0, 2.0, trimesh as f32, 1.0];
    values.extend((0..18).map(|i| i as f32));
    values.push(rope as f32);
    values.push(5.0);
    values.extend((0..15).map(|i| 100.0 + i as f32));

    scene.handle_message(InboundPayload::Values(values)).unwrap();

    let trimesh_geometry = scene.object(trimesh).unwrap().soft_geometry().unwrap();
    assert_eq!(trimesh_geometry.positions().len(), 9);

    let rope_geometry = scene.object(rope).unwrap().soft_geometry().unwrap();
    assert_eq!(rope_geometry.positions().len(), 15);
    assert_eq!(rope_geometry.positions()[0], 100.0);
    assert!(rope_geometry.normals().is_empty());
}

#[test]
fn test_vehicle_wheel_updates() {
    let (mut scene, commands, _returns) = ready_scene();
    let chassis = scene.add_object(box_node()).unwrap();
    let vehicle_id = scene.add_vehicle(chassis, VehicleTuning::default()).unwrap();
    let wheel = WheelDescription {
        connection_point: [0.0, -0.5, 1.0],
        wheel_direction: [0.0, -1.0, 0.0],
        wheel_axle: [-1.0, 0.0, 0.0],
        suspension_rest_length: 0.3,
        wheel_radius: 0.4,
        is_front_wheel: true,
        tuning: None,
    };
    scene.add_wheel(vehicle_id, wheel).unwrap();
    scene.add_wheel(vehicle_id, wheel).unwrap();
    let sent = drain(&commands);
    assert_eq!(sent[1].cmd, "addVehicle");
    assert_eq!(sent[2].cmd, "addWheel");
    assert_eq!(sent[2].params["index"], 0);

    // Wheel 1 moves; a record for an unknown vehicle is skipped.
    let values = vec![
        2.0, 2.0, // tag, count
        vehicle_id as f32,
        1.0,
        0.5,
        -0.4,
        1.0,
        0.0,
        0.0,
        0.0,
        1.0,
        777.0,
        0.0,
        9.0,
        9.0,
        9.0,
        0.0,
        0.0,
        0.0,
        1.0,
    ];
    scene.handle_message(InboundPayload::Values(values)).unwrap();

    let vehicle = scene.vehicle(vehicle_id).unwrap();
    assert_eq!(vehicle.wheel(1).unwrap().position(), Vector3::new(0.5, -0.4, 1.0));
    assert_eq!(vehicle.wheel(0).unwrap().position(), Vector3::new(0.0, 0.0, 0.0));
}

#[test]
fn test_constraint_anchor_recomputation() {
    let (mut scene, commands, _returns) = ready_scene();

    let mut node = box_node();
    node.set_position(Vector3::new(5.0, 0.0, 0.0));
    let id = scene.add_object(node).unwrap();

    let constraint_id = {
        let node = scene.object(id).unwrap();
        let constraint =
            simbridge::Constraint::point(node, None, Vector3::new(5.0, 1.0, 0.0));
        scene.add_constraint(constraint).unwrap()
    };
    drain(&commands);

    // Rotate the object 90 degrees around Z, then decode a constraint
    // record carrying a local offset of +1 on Y.
    let half = std::f32::consts::FRAC_1_SQRT_2;
    let report = world_report(&[(
        id,
        [5.0, 0.0, 0.0],
        [0.0, 0.0, half, half],
        [0.0; 3],
        [0.0; 3],
    )]);
    scene.handle_message(InboundPayload::Values(report)).unwrap();

    let values = vec![
        3.0, 1.0, // tag, count
        constraint_id as f32,
        id as f32,
        0.0,
        1.0,
        0.0,
        2.5,
    ];
    scene.handle_message(InboundPayload::Values(values)).unwrap();

    let constraint = scene.constraint(constraint_id).unwrap();
    assert_eq!(constraint.applied_impulse(), 2.5);

    // The local +Y offset, rotated through the body's orientation, lands on
    // -X relative to the body position.
    let expected = Vector3::new(5.0, 0.0, 0.0)
        + Quaternion::new(half, 0.0, 0.0, half).rotate_vector(Vector3::new(0.0, 1.0, 0.0));
    let anchor = constraint.world_anchor();
    assert!((anchor.x - expected.x).abs() < 1e-5);
    assert!((anchor.y - expected.y).abs() < 1e-5);
    assert!((anchor.z - expected.z).abs() < 1e-5);
}

#[test]
fn test_remove_object_deletes_registry_entry() {
    let (mut scene, commands, _returns) = ready_scene();
    let id = scene.add_object(box_node()).unwrap();
    drain(&commands);

    scene.remove_object(id).unwrap();
    assert!(scene.object(id).is_none());
    assert_eq!(drain(&commands)[0].cmd, "removeObject");

    // A second removal is an error: the key is gone, not tombstoned.
    assert!(scene.remove_object(id).is_err());
}

#[test]
fn test_probe_and_unknown_tags_are_tolerated() {
    let (mut scene, commands, _returns) = ready_scene();
    drain(&commands);

    scene
        .handle_message(InboundPayload::Binary(Bytes::from_static(&[0])))
        .unwrap();
    scene
        .handle_message(InboundPayload::Values(vec![42.0, 0.0]))
        .unwrap();
    scene
        .handle_message(InboundPayload::Control(json!({ "cmd": "futureThing" })))
        .unwrap();

    assert!(drain(&commands).is_empty());
    assert!(drain_events(&scene).is_empty());
}
