//! Control stream errors

use thiserror::Error;
use tokio_util::codec::AnyDelimiterCodecError;

/// Errors raised while decoding the control stream
///
/// All of these are fatal: once the stream is out of step there is no way
/// to find the next message boundary.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A line did not fit in the request buffer
    #[error("Line too long on control stream (max {max} bytes)")]
    LineTooLong { max: usize },

    /// A packet declared a length that can never fit
    #[error("Invalid packet size {declared}. Out of sync?")]
    Desync { declared: usize },

    /// An HTTP request head did not fit in the request buffer
    #[error("HTTP request too large (max {max} bytes)")]
    RequestTooLarge { max: usize },

    /// Reading the stream failed
    #[error("Error reading control stream: {0}")]
    Io(#[from] std::io::Error),
}

impl ControlError {
    pub(crate) fn from_lines(error: AnyDelimiterCodecError, max: usize) -> Self {
        match error {
            AnyDelimiterCodecError::MaxChunkLengthExceeded => ControlError::LineTooLong { max },
            AnyDelimiterCodecError::Io(e) => ControlError::Io(e),
        }
    }
}
