//! Typed report records decoded from the engine's flat numeric buffers.
//!
//! Every report is `[tag, count, records…]`. The tag is a closed
//! discriminator set; each kind has its own fixed record stride except the
//! soft-body report, whose per-vertex encoding depends on the subtype of the
//! object being reported on and therefore cannot be walked without the
//! registry (see the soft-body decoder in `sync`).

use crate::bridge::{BridgeError, BridgeResult};
use cgmath::{Quaternion, Vector3};

/// `[id, px, py, pz, qx, qy, qz, qw, lvx, lvy, lvz, avx, avy, avz]`
pub const WORLD_REPORT_ITEM_SIZE: usize = 14;
/// `[id_a, id_b, nx, ny, nz]`
pub const COLLISION_REPORT_ITEM_SIZE: usize = 5;
/// `[vehicle_id, wheel_index, px, py, pz, qx, qy, qz, qw]`
pub const VEHICLE_REPORT_ITEM_SIZE: usize = 9;
/// `[constraint_id, object_id, offx, offy, offz, applied_impulse]`
pub const CONSTRAINT_REPORT_ITEM_SIZE: usize = 6;

/// Report-type discriminator carried in element 0 of every buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTag {
    World = 0,
    Collision = 1,
    Vehicle = 2,
    Constraint = 3,
    SoftBody = 4,
}

impl ReportTag {
    pub fn from_discriminator(value: f32) -> Option<Self> {
        if value.fract() != 0.0 {
            return None;
        }
        match value as i64 {
            0 => Some(ReportTag::World),
            1 => Some(ReportTag::Collision),
            2 => Some(ReportTag::Vehicle),
            3 => Some(ReportTag::Constraint),
            4 => Some(ReportTag::SoftBody),
            _ => None,
        }
    }
}

/// One rigid body's transform and velocities for a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFrame {
    pub id: u32,
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
    pub linear_velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
}

/// One wheel's engine-authored transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelFrame {
    pub vehicle_id: u32,
    pub wheel_index: usize,
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
}

/// One constraint's per-tick solver output. `local_offset` is the anchor in
/// the owning object's frame; the world anchor is re-derived at decode time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintFrame {
    pub constraint_id: u32,
    pub object_id: u32,
    pub local_offset: Vector3<f32>,
    pub applied_impulse: f32,
}

/// One raw contact. The normal is expressed from one side only; sign
/// correction happens when the manifest is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPair {
    pub first: u32,
    pub second: u32,
    pub normal: Vector3<f32>,
}

/// Soft-body report, retained as raw values: the per-vertex stride depends
/// on each object's registered subtype, so decoding happens against the
/// registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftBodyReport {
    pub object_count: usize,
    pub values: Vec<f32>,
}

/// A fully classified report. Closed sum: adding a report kind means adding
/// a discriminator value and a decoder, never inferring from buffer length.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    World(Vec<BodyFrame>),
    Collision(Vec<ContactPair>),
    Vehicle(Vec<WheelFrame>),
    Constraint(Vec<ConstraintFrame>),
    SoftBody(SoftBodyReport),
}

fn read_vector3(values: &[f32], offset: usize) -> Vector3<f32> {
    Vector3::new(values[offset], values[offset + 1], values[offset + 2])
}

fn read_quaternion(values: &[f32], offset: usize) -> Quaternion<f32> {
    // Wire order is x, y, z, w; cgmath wants the scalar first.
    Quaternion::new(
        values[offset + 3],
        values[offset],
        values[offset + 1],
        values[offset + 2],
    )
}

fn check_record_space(values: &[f32], count: usize, stride: usize) -> BridgeResult<()> {
    let needed = 2 + count * stride;
    if values.len() < needed {
        Err(BridgeError::ReportDecode {
            reason: format!(
                "report holds {} values but {} records of stride {} need {}",
                values.len(),
                count,
                stride,
                needed
            ),
        })
    } else {
        Ok(())
    }
}

impl Report {
    /// Parse a tagged value buffer into typed records.
    ///
    /// `values` must include the two header elements; `values[1]` is the
    /// record count.
    pub fn parse(tag: ReportTag, values: Vec<f32>) -> BridgeResult<Report> {
        if values.len() < 2 {
            return Err(BridgeError::ReportDecode {
                reason: "report shorter than its two-element header".to_string(),
            });
        }
        let count = values[1] as usize;

        match tag {
            ReportTag::World => {
                check_record_space(&values, count, WORLD_REPORT_ITEM_SIZE)?;
                let mut frames = Vec::with_capacity(count);
                for i in 0..count {
                    let offset = 2 + i * WORLD_REPORT_ITEM_SIZE;
                    frames.push(BodyFrame {
                        id: values[offset] as u32,
                        position: read_vector3(&values, offset + 1),
                        orientation: read_quaternion(&values, offset + 4),
                        linear_velocity: read_vector3(&values, offset + 8),
                        angular_velocity: read_vector3(&values, offset + 11),
                    });
                }
                Ok(Report::World(frames))
            }
            ReportTag::Collision => {
                check_record_space(&values, count, COLLISION_REPORT_ITEM_SIZE)?;
                let mut pairs = Vec::with_capacity(count);
                for i in 0..count {
                    let offset = 2 + i * COLLISION_REPORT_ITEM_SIZE;
                    pairs.push(ContactPair {
                        first: values[offset] as u32,
                        second: values[offset + 1] as u32,
                        normal: read_vector3(&values, offset + 2),
                    });
                }
                Ok(Report::Collision(pairs))
            }
            ReportTag::Vehicle => {
                check_record_space(&values, count, VEHICLE_REPORT_ITEM_SIZE)?;
                let mut frames = Vec::with_capacity(count);
                for i in 0..count {
                    let offset = 2 + i * VEHICLE_REPORT_ITEM_SIZE;
                    frames.push(WheelFrame {
                        vehicle_id: values[offset] as u32,
                        wheel_index: values[offset + 1] as usize,
                        position: read_vector3(&values, offset + 2),
                        orientation: read_quaternion(&values, offset + 5),
                    });
                }
                Ok(Report::Vehicle(frames))
            }
            ReportTag::Constraint => {
                check_record_space(&values, count, CONSTRAINT_REPORT_ITEM_SIZE)?;
                let mut frames = Vec::with_capacity(count);
                for i in 0..count {
                    let offset = 2 + i * CONSTRAINT_REPORT_ITEM_SIZE;
                    frames.push(ConstraintFrame {
                        constraint_id: values[offset] as u32,
                        object_id: values[offset + 1] as u32,
                        local_offset: read_vector3(&values, offset + 2),
                        applied_impulse: values[offset + 5],
                    });
                }
                Ok(Report::Constraint(frames))
            }
            ReportTag::SoftBody => Ok(Report::SoftBody(SoftBodyReport {
                object_count: count,
                values,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_discriminators() {
        assert_eq!(ReportTag::from_discriminator(0.0), Some(ReportTag::World));
        assert_eq!(
            ReportTag::from_discriminator(4.0),
            Some(ReportTag::SoftBody)
        );
        assert_eq!(ReportTag::from_discriminator(5.0), None);
        assert_eq!(ReportTag::from_discriminator(0.5), None);
    }

    #[test]
    fn test_world_report_parse() {
        let mut values = vec![0.0, 1.0];
        values.extend_from_slice(&[
            9.0, // id
            1.0, 2.0, 3.0, // position
            0.0, 0.0, 0.0, 1.0, // quaternion x,y,z,w
            0.5, 0.0, 0.0, // linear velocity
            0.0, 0.25, 0.0, // angular velocity
        ]);

        let report = Report::parse(ReportTag::World, values).unwrap();
        let Report::World(frames) = report else {
            panic!("expected world report");
        };
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, 9);
        assert_eq!(frames[0].position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(frames[0].orientation.s, 1.0);
        assert_eq!(frames[0].linear_velocity.x, 0.5);
        assert_eq!(frames[0].angular_velocity.y, 0.25);
    }

    #[test]
    fn test_truncated_report_rejected() {
        let values = vec![0.0, 2.0, 9.0, 1.0]; // claims 2 records, holds half of one
        assert!(Report::parse(ReportTag::World, values).is_err());
    }

    #[test]
    fn test_vehicle_report_parse() {
        let mut values = vec![2.0, 1.0];
        values.extend_from_slice(&[4.0, 1.0, 0.0, -0.5, 0.0, 0.0, 0.0, 0.0, 1.0]);

        let report = Report::parse(ReportTag::Vehicle, values).unwrap();
        let Report::Vehicle(frames) = report else {
            panic!("expected vehicle report");
        };
        assert_eq!(frames[0].vehicle_id, 4);
        assert_eq!(frames[0].wheel_index, 1);
        assert_eq!(frames[0].position.y, -0.5);
    }

    #[test]
    fn test_constraint_report_parse() {
        let mut values = vec![3.0, 1.0];
        values.extend_from_slice(&[6.0, 2.0, 1.0, 0.0, 0.0, 12.5]);

        let report = Report::parse(ReportTag::Constraint, values).unwrap();
        let Report::Constraint(frames) = report else {
            panic!("expected constraint report");
        };
        assert_eq!(frames[0].constraint_id, 6);
        assert_eq!(frames[0].object_id, 2);
        assert_eq!(frames[0].applied_impulse, 12.5);
    }

    #[test]
    fn test_soft_report_retains_values() {
        let values = vec![4.0, 1.0, 7.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let report = Report::parse(ReportTag::SoftBody, values.clone()).unwrap();
        let Report::SoftBody(soft) = report else {
            panic!("expected soft report");
        };
        assert_eq!(soft.object_count, 1);
        assert_eq!(soft.values, values);
    }
}
