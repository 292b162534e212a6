//! Message types for actor communication

use tokio::sync::oneshot;

use crate::Reading;

/// Commands that can be sent to the sink writer
#[derive(Debug)]
pub enum SinkCommand {
    /// Queue one reading for persistence
    Append(Reading),

    /// Get writer statistics
    GetStats {
        respond_to: oneshot::Sender<SinkStats>,
    },

    /// Gracefully shut down the writer
    Shutdown,
}

/// Sink writer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Points accepted by the sink
    pub appended: u64,

    /// Readings dropped because the queue was full
    pub dropped: u64,

    /// Appends that failed or timed out
    pub failed: u64,
}
