//! Synthetic capture source
//!
//! Generates JPEG-shaped test frames on a background thread and feeds them
//! through the handoff queue in fixed-size chunks, the way a hardware encoder
//! returns its output buffers. Frame size follows the configured geometry and
//! quality; the annotation and a sequence number are embedded in a comment
//! segment so consumers can tell frames apart.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use super::handoff::ChunkSender;
use super::property::CameraProperty;
use super::{CaptureControl, CaptureError, CaptureSettings};
use crate::frame::Chunk;

/// Default size of the chunks frames are split into
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Frame rate used when none is configured
const DEFAULT_FPS: f64 = 30.0;

/// Settings the producer thread reads for every frame
#[derive(Debug, Clone)]
struct Pattern {
    width: u32,
    height: u32,
    quality: u32,
    annotation: String,
}

/// Build one test frame
///
/// Layout: SOI, a COM segment with a description, an SOS segment followed
/// by filler scan data sized from the geometry and quality, then EOI.
pub fn test_pattern(sequence: u64, width: u32, height: u32, quality: u32, annotation: &str) -> Bytes {
    let mut comment = format!("framecast {width}x{height} q{quality} #{sequence}");
    if !annotation.is_empty() {
        comment.push(' ');
        comment.push_str(annotation);
    }
    comment.truncate(u16::MAX as usize - 2);

    let pixels = u64::from(width) * u64::from(height);
    let scan_len = (pixels * u64::from(quality.max(1)) / 200).clamp(64, 1 << 20) as usize;

    let mut buf = BytesMut::with_capacity(comment.len() + scan_len + 16);
    buf.put_slice(&[0xFF, 0xD8]);

    buf.put_slice(&[0xFF, 0xFE]);
    buf.put_u16(comment.len() as u16 + 2);
    buf.put_slice(comment.as_bytes());

    buf.put_slice(&[0xFF, 0xDA]);
    buf.put_u16(2);
    let seed = sequence as u8;
    buf.extend((0..scan_len).map(|i| (i as u8 ^ seed) & 0x7F));

    buf.put_slice(&[0xFF, 0xD9]);
    buf.freeze()
}

struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Test-pattern capture pipeline
pub struct SyntheticCapture {
    chunk_size: usize,
    pattern: Arc<Mutex<Pattern>>,
    worker: Option<Worker>,
    applied: Vec<CameraProperty>,
    starts: u32,
}

impl SyntheticCapture {
    /// Create an idle pipeline
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pattern: Arc::new(Mutex::new(Pattern {
                width: 320,
                height: 240,
                quality: 15,
                annotation: String::new(),
            })),
            worker: None,
            applied: Vec::new(),
            starts: 0,
        }
    }

    /// Split frames into chunks of this size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Latest value of each property applied so far, least recently set first
    pub fn applied(&self) -> &[CameraProperty] {
        &self.applied
    }

    /// Number of times the pipeline has been started
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// Whether the producer thread is running
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn update_pattern(&self, f: impl FnOnce(&mut Pattern)) {
        let mut pattern = self.pattern.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut pattern);
    }
}

impl Default for SyntheticCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureControl for SyntheticCapture {
    fn start(&mut self, settings: &CaptureSettings, sender: ChunkSender) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let fps = if settings.fps > 0.0 { settings.fps } else { DEFAULT_FPS };
        let interval = Duration::try_from_secs_f64(1.0 / fps)
            .map_err(|_| CaptureError::Unsupported(format!("fps {fps}")))?;

        self.update_pattern(|p| {
            p.width = settings.width;
            p.height = settings.effective_height();
            p.quality = settings.quality;
            p.annotation = settings.annotation.clone();
        });
        let running = Arc::new(AtomicBool::new(true));
        let chunk_size = self.chunk_size;
        let pattern = Arc::clone(&self.pattern);
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("framecast-capture".into())
            .spawn(move || produce(flag, pattern, sender, chunk_size, interval))
            .map_err(CaptureError::Spawn)?;

        self.worker = Some(Worker { running, handle });
        self.starts += 1;

        tracing::info!(
            width = settings.width,
            height = settings.effective_height(),
            fps = fps,
            quality = settings.quality,
            "Capture started"
        );
        Ok(())
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        worker.running.store(false, Ordering::Release);
        if worker.handle.join().is_err() {
            tracing::warn!("Capture thread panicked");
        }
        tracing::info!("Capture stopped");
    }

    fn set_property(&mut self, property: CameraProperty) -> Result<(), CaptureError> {
        match &property {
            CameraProperty::Quality(quality) => self.update_pattern(|p| p.quality = *quality),
            CameraProperty::Annotation(text) => {
                self.update_pattern(|p| p.annotation = text.clone())
            }
            _ => {}
        }

        tracing::debug!(property = ?property, "Camera property set");
        let kind = mem::discriminant(&property);
        self.applied.retain(|p| mem::discriminant(p) != kind);
        self.applied.push(property);
        Ok(())
    }
}

impl Drop for SyntheticCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn produce(
    running: Arc<AtomicBool>,
    pattern: Arc<Mutex<Pattern>>,
    sender: ChunkSender,
    chunk_size: usize,
    interval: Duration,
) {
    let mut sequence = 0u64;

    while running.load(Ordering::Acquire) {
        let frame = {
            let p = pattern.lock().unwrap_or_else(PoisonError::into_inner);
            test_pattern(sequence, p.width, p.height, p.quality, &p.annotation)
        };
        sequence += 1;

        let mut offset = 0;
        while offset < frame.len() {
            let end = (offset + chunk_size).min(frame.len());
            let data = frame.slice(offset..end);
            let chunk = if end == frame.len() {
                Chunk::frame_end(data)
            } else {
                Chunk::partial(data)
            };
            if !sender.push(chunk) {
                if sender.is_closed() {
                    return;
                }
                break;
            }
            offset = end;
        }

        thread::sleep(interval);
    }
}
