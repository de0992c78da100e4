//! Fire-and-forget command submission.

use crate::bridge::commands::Command;
use crate::bridge::transport::WorkerTransport;
use crate::bridge::BridgeResult;
use bytes::Bytes;
use tracing::trace;

/// Serializes commands into envelopes and hands them to the transport.
///
/// No return value, no acknowledgement; callers must not assume ordering
/// guarantees beyond FIFO delivery on the single channel.
pub struct CommandChannel {
    transport: Box<dyn WorkerTransport>,
}

impl CommandChannel {
    pub fn new(transport: Box<dyn WorkerTransport>) -> Self {
        Self { transport }
    }

    /// Enqueue one command on the outbound transport.
    pub fn execute(&self, command: Command) -> BridgeResult<()> {
        let envelope = command.envelope();
        trace!(cmd = %envelope.cmd, "sending command");
        self.transport.send(envelope)
    }

    /// Hand a decoded transferable report buffer back to the worker.
    pub(crate) fn return_buffer(&self, buffer: Bytes) -> BridgeResult<()> {
        self.transport.return_buffer(buffer)
    }
}
