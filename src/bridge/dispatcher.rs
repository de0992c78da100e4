//! Inbound payload classification.
//!
//! Three shapes arrive from the worker: transferable binary buffers (the
//! fast path, including the one-byte capability probe), plain value arrays
//! (the legacy fallback), and structured control messages. Classification is
//! a closed dispatch: unrecognized tags and commands are logged and dropped,
//! never fatal, so the protocol can evolve without breaking old hosts.

use crate::bridge::buffer;
use crate::bridge::reports::{Report, ReportTag};
use crate::bridge::transport::InboundPayload;
use crate::bridge::{BridgeError, BridgeResult};
use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

/// Engine → host control messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// The engine runtime finished loading inside the worker.
    EngineLoaded,
    /// The world is initialized and registrations may flow.
    WorldReady,
    /// An object registration was processed.
    ObjectReady { id: u32 },
    /// A vehicle registration was processed.
    VehicleReady { id: u32 },
    /// Anything else: tolerated and dropped.
    Unknown { cmd: String },
}

/// Outcome of classifying one inbound payload.
#[derive(Debug, Clone)]
pub enum Routed {
    /// Capability probe or unrecognized report tag; nothing to do.
    Ignored,
    /// A typed report, with the original binary buffer when the fast path
    /// delivered one (for the post-decode handback).
    Report {
        report: Report,
        buffer: Option<Bytes>,
    },
    Control(ControlMessage),
}

/// Classify an inbound payload and parse it into its typed form.
pub fn route(payload: InboundPayload) -> BridgeResult<Routed> {
    match payload {
        InboundPayload::Binary(bytes) => {
            if bytes.len() == 1 {
                debug!("transport capability probe received, ignoring");
                return Ok(Routed::Ignored);
            }
            let values = buffer::decode_values(&bytes)?;
            route_values(values, Some(bytes))
        }
        InboundPayload::Values(values) => route_values(values, None),
        InboundPayload::Control(value) => Ok(Routed::Control(parse_control(&value)?)),
    }
}

fn route_values(values: Vec<f32>, buffer: Option<Bytes>) -> BridgeResult<Routed> {
    if values.len() < 2 {
        return Err(BridgeError::ReportDecode {
            reason: "report shorter than its two-element header".to_string(),
        });
    }

    let Some(tag) = ReportTag::from_discriminator(values[0]) else {
        debug!(
            discriminator = values[0] as f64,
            "unrecognized report tag, dropping"
        );
        return Ok(Routed::Ignored);
    };

    Ok(Routed::Report {
        report: Report::parse(tag, values)?,
        buffer,
    })
}

fn parse_control(value: &Value) -> BridgeResult<ControlMessage> {
    let cmd = value
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::ControlDecode {
            reason: "control message has no cmd field".to_string(),
        })?;

    let message = match cmd {
        "engineLoaded" => ControlMessage::EngineLoaded,
        "worldReady" => ControlMessage::WorldReady,
        "objectReady" => ControlMessage::ObjectReady {
            id: control_id(value, cmd)?,
        },
        "vehicleReady" => ControlMessage::VehicleReady {
            id: control_id(value, cmd)?,
        },
        other => {
            debug!(cmd = other, "unrecognized control message, dropping");
            ControlMessage::Unknown {
                cmd: other.to_string(),
            }
        }
    };
    Ok(message)
}

// The readiness messages carry the bare id as their params.
fn control_id(value: &Value, cmd: &str) -> BridgeResult<u32> {
    value
        .get("params")
        .and_then(Value::as_u64)
        .map(|id| id as u32)
        .ok_or_else(|| BridgeError::ControlDecode {
            reason: format!("{} message has no id in params", cmd),
        })
}
