//! Capture pipeline boundary
//!
//! The producer runs on its own thread and hands chunks of encoded frames to
//! the event loop through a bounded queue:
//!
//! ```text
//!   producer thread                         event loop (single thread)
//!   ┌──────────────┐   ChunkSender::push    ┌──────────────────────┐
//!   │ CaptureControl├──────── mpsc ────────►│ ChunkReceiver::recv  │
//!   └──────────────┘   (try_send, bounded)  └──────────────────────┘
//! ```
//!
//! The producer never blocks. If the queue is full it flags an overflow,
//! which the loop treats as fatal.

pub mod handoff;
pub mod property;
pub mod synthetic;

use thiserror::Error;

pub use handoff::{handoff, ChunkReceiver, ChunkSender, Handoff};
pub use property::{CameraProperty, CameraSetting};
pub use synthetic::SyntheticCapture;

/// Errors raised by the capture pipeline
#[derive(Debug, Error)]
pub enum CaptureError {
    /// `start` was called on a running pipeline
    #[error("Capture pipeline already running")]
    AlreadyRunning,

    /// The producer thread could not be spawned
    #[error("Failed to start capture thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The pipeline rejected a setting
    #[error("Unsupported capture setting: {0}")]
    Unsupported(String),

    /// The device reported a failure while running
    #[error("Capture device error: {0}")]
    Device(String),
}

/// Parameters fixed for the lifetime of one pipeline run
///
/// Changing any of these requires a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels (0 = derive from width)
    pub height: u32,
    /// Frame rate limit (0 = pipeline default)
    pub fps: f64,
    /// JPEG quality
    pub quality: u32,
    /// JPEG restart interval
    pub restart_interval: u32,
    /// Sensor mode (0 = automatic)
    pub sensor_mode: u32,
    /// Overlay text
    pub annotation: String,
}

impl CaptureSettings {
    /// Height, derived as 4:3 from the width when unset
    pub fn effective_height(&self) -> u32 {
        if self.height == 0 {
            self.width * 3 / 4
        } else {
            self.height
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 320,
            height: 0,
            fps: 0.0,
            quality: 15,
            restart_interval: 0,
            sensor_mode: 0,
            annotation: String::new(),
        }
    }
}

/// Control surface of a capture pipeline
///
/// Implementations push chunks through the [`ChunkSender`] from their own
/// thread and must stop doing so once [`CaptureControl::stop`] returns.
pub trait CaptureControl: Send {
    /// Start producing frames
    fn start(&mut self, settings: &CaptureSettings, sender: ChunkSender)
        -> Result<(), CaptureError>;

    /// Stop producing frames; a no-op when not running
    fn stop(&mut self);

    /// Change a property without restarting
    fn set_property(&mut self, property: CameraProperty) -> Result<(), CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_height() {
        let mut settings = CaptureSettings::default();
        assert_eq!(settings.effective_height(), 240);

        settings.height = 200;
        assert_eq!(settings.effective_height(), 200);
    }
}
