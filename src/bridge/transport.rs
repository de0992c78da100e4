//! The worker boundary.
//!
//! The physics engine runs out of process; the only communication is message
//! passing. Outbound: command envelopes. Inbound: report buffers in one of
//! two encodings (a transferable binary buffer on the fast path, a plain
//! value array on the legacy fallback) plus structured control messages.

use crate::bridge::commands::CommandEnvelope;
use crate::bridge::{BridgeError, BridgeResult};
use bytes::Bytes;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// One message received from the engine worker.
#[derive(Debug, Clone)]
pub enum InboundPayload {
    /// Transferable binary report buffer: little-endian `f32` array. A
    /// buffer of exactly one byte is the worker's transport capability
    /// probe, not physics data.
    Binary(Bytes),
    /// Legacy non-transferable fallback: the report as a plain value array.
    Values(Vec<f32>),
    /// Structured `{cmd, params}` control message.
    Control(serde_json::Value),
}

/// Outbound half of the worker boundary.
///
/// `send` is fire-and-forget. `return_buffer` hands a transferable report
/// buffer back after decode: the worker reuses the backing memory for the
/// next tick, so holding one past the decode call is invalid.
pub trait WorkerTransport: Send + Sync {
    fn send(&self, envelope: CommandEnvelope) -> BridgeResult<()>;

    fn return_buffer(&self, buffer: Bytes) -> BridgeResult<()>;
}

/// In-process transport over a pair of unbounded channels.
///
/// Used to connect the scene to an engine worker running on another thread,
/// and by the test suite to observe the command stream directly.
pub struct ChannelTransport {
    command_tx: Sender<CommandEnvelope>,
    return_tx: Sender<Bytes>,
}

impl ChannelTransport {
    /// Build a transport plus the worker-side receivers for commands and
    /// returned buffers.
    pub fn new() -> (Self, Receiver<CommandEnvelope>, Receiver<Bytes>) {
        let (command_tx, command_rx) = unbounded();
        let (return_tx, return_rx) = unbounded();
        (
            Self {
                command_tx,
                return_tx,
            },
            command_rx,
            return_rx,
        )
    }
}

impl WorkerTransport for ChannelTransport {
    fn send(&self, envelope: CommandEnvelope) -> BridgeResult<()> {
        self.command_tx
            .send(envelope)
            .map_err(|_| BridgeError::ChannelClosed)
    }

    fn return_buffer(&self, buffer: Bytes) -> BridgeResult<()> {
        self.return_tx
            .send(buffer)
            .map_err(|_| BridgeError::ChannelClosed)
    }
}
