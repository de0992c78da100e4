//! Host-side physics worker protocol.
//!
//! This module is the synchronization layer between the scene graph and the
//! out-of-process physics engine: commands out through the
//! [`CommandChannel`], binary report buffers in through
//! [`PhysicsScene::handle_message`], with the registries and the dirty-flag
//! transform protocol in between.

pub mod buffer;
pub mod channel;
pub mod collisions;
pub mod commands;
pub mod dispatcher;
pub mod registry;
pub mod reports;
pub mod sync;
pub mod transport;

// Re-export main types for convenience
pub use channel::CommandChannel;
pub use commands::{Command, CommandEnvelope};
pub use dispatcher::{ControlMessage, Routed};
pub use registry::WorldRegistry;
pub use reports::Report;
pub use sync::PhysicsScene;
pub use transport::{ChannelTransport, InboundPayload, WorkerTransport};

// Error types
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    #[error("Report decode failed: {reason}")]
    ReportDecode { reason: String },

    #[error("Control message decode failed: {reason}")]
    ControlDecode { reason: String },

    #[error("Command encode failed: {reason}")]
    CommandEncode { reason: String },

    #[error("Worker channel closed")]
    ChannelClosed,

    #[error("Unknown object: {id}")]
    UnknownObject { id: u32 },

    #[error("Unknown vehicle: {id}")]
    UnknownVehicle { id: u32 },

    #[error("Unknown constraint: {id}")]
    UnknownConstraint { id: u32 },

    #[error("Vehicle {vehicle} has no wheel {wheel}")]
    InvalidWheel { vehicle: u32, wheel: usize },

    #[error("Constraint {id} does not support {op}")]
    UnsupportedConstraintOp { id: u32, op: &'static str },

    #[error("{reason}")]
    Other { reason: String },
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Other {
            reason: err.to_string(),
        }
    }
}
