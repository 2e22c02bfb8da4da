//! Error types for cec-control.

use thiserror::Error;

use crate::protocol::LogicalAddress;

/// Main error type for all CEC operations.
#[derive(Debug, Error)]
pub enum CecError {
    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while parsing device configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (malformed frame, unexpected answer, bad config value).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No answer arrived from the follower within the wait time.
    #[error("Timed out waiting for opcode {opcode:#04x} from {follower:?}")]
    Timeout {
        /// Device the request was sent to.
        follower: LogicalAddress,
        /// Response opcode that was expected.
        opcode: u8,
    },

    /// Destination did not acknowledge the frame.
    #[error("Frame not acknowledged by {0:?}")]
    Nack(LogicalAddress),

    /// The underlying device adapter is not usable.
    #[error("Device adapter is not valid")]
    InvalidAdapter,

    /// Reply queue or device adapter has been shut down.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A blocking transmit task panicked or was cancelled.
    #[error("Transmit task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Reply queue is at capacity.
    #[error("Reply queue full")]
    QueueFull,

    /// Value is not a logical address.
    #[error("Invalid logical address: {0:#04x}")]
    InvalidAddress(u8),

    /// Frame does not fit into an operation frame.
    #[error("Frame of {0} bytes exceeds maximum length")]
    FrameTooLong(usize),
}

/// Result type alias using CecError.
pub type Result<T> = std::result::Result<T, CecError>;
