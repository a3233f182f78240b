//! Crate-level error type
//!
//! Component-local failures are resolved where they are detected (an invalid
//! client request is logged and dropped, a failing subscriber is evicted).
//! Everything that reaches this type is fatal and ends the process.

use std::path::PathBuf;

use thiserror::Error;

use crate::capture::CaptureError;
use crate::config::ConfigError;
use crate::control::ControlError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors
#[derive(Debug, Error)]
pub enum Error {
    /// Socket or descriptor failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid startup configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Control stream could not be decoded
    #[error(transparent)]
    Control(#[from] ControlError),

    /// Capture pipeline reported a failure
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Writing to the local output failed
    #[error("Error writing to {}: {source}", path.display())]
    Sink {
        /// Output path ("-" for stdout)
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No chunk, datagram or control input arrived within the liveness timeout
    #[error("Capture pipeline unresponsive. Video stuck?")]
    LivenessTimeout,

    /// Client mode found nothing listening on the socket
    #[error("No server running at {}", .0.display())]
    ServerNotRunning(PathBuf),

    /// Client mode stopped hearing from the server
    #[error("Server unresponsive")]
    ServerUnresponsive,

    /// The producer filled the handoff queue
    #[error("Handoff queue overflowed; consumer fell behind the producer")]
    HandoffOverflow,

    /// The producer hung up while capture was expected to be live
    #[error("Capture pipeline stopped unexpectedly")]
    CaptureStopped,
}

impl Error {
    /// Wrap a sink write failure with the output path
    pub fn sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Sink {
            path: path.into(),
            source,
        }
    }
}
