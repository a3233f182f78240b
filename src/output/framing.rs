//! Output framing
//!
//! Wraps each frame for the local output according to the selected mode:
//!
//! ```text
//!   cat      [jpeg][jpeg]...
//!   header   [len:u32 BE][channel:u8]?[jpeg]...
//!   mime     MIME header, boundary, then per frame:
//!            [part header][jpeg][boundary]
//!   http     like mime, once a GET /video has been answered
//!   replace  each frame replaces the output file atomically
//! ```

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::frame::Frame;

/// Top-level header of a multipart stream
pub const MULTIPART_HEADER: &[u8] = b"MIME-Version: 1.0\r\n\
content-type: multipart/x-mixed-replace;boundary=--jpegboundary\r\n";

/// Separator written after every part (and once after the header)
pub const MULTIPART_BOUNDARY: &[u8] = b"\r\n--jpegboundary\r\n";

/// Output framing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingMode {
    /// Frames written back to back
    #[default]
    Concatenate,
    /// 4-byte big-endian length (plus optional channel byte) before each frame
    LengthPrefixed,
    /// multipart/x-mixed-replace stream
    Multipart,
    /// Multipart stream served after an HTTP request on the control stream
    HttpMultipart,
    /// Latest frame atomically replaces the output file
    ReplaceFile,
}

impl FramingMode {
    /// Accepted names, in the order they are listed in help
    pub const NAMES: &'static [&'static str] = &["cat", "header", "mime", "http", "replace"];

    /// Name as accepted by the `framing` option
    pub fn as_str(&self) -> &'static str {
        match self {
            FramingMode::Concatenate => "cat",
            FramingMode::LengthPrefixed => "header",
            FramingMode::Multipart => "mime",
            FramingMode::HttpMultipart => "http",
            FramingMode::ReplaceFile => "replace",
        }
    }
}

impl FromStr for FramingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cat" => Ok(FramingMode::Concatenate),
            "header" => Ok(FramingMode::LengthPrefixed),
            "mime" => Ok(FramingMode::Multipart),
            "http" => Ok(FramingMode::HttpMultipart),
            "replace" => Ok(FramingMode::ReplaceFile),
            other => Err(format!("unknown framing '{other}'")),
        }
    }
}

impl fmt::Display for FramingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with one framed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// Nothing to write yet
    Skip,
    /// Append these parts to the output, in order
    Write(Vec<Bytes>),
    /// Replace the whole output with these bytes
    ReplaceFile(Bytes),
}

impl Emission {
    /// Total bytes carried
    pub fn len(&self) -> usize {
        match self {
            Emission::Skip => 0,
            Emission::Write(parts) => parts.iter().map(Bytes::len).sum(),
            Emission::ReplaceFile(data) => data.len(),
        }
    }

    /// Whether there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Frame wrapper for the local output
#[derive(Debug)]
pub struct FramingEncoder {
    mode: FramingMode,
    channel: Option<u8>,
    multipart_header_sent: bool,
    http_streaming: bool,
}

impl FramingEncoder {
    /// Create an encoder for a mode
    pub fn new(mode: FramingMode) -> Self {
        Self {
            mode,
            channel: None,
            multipart_header_sent: false,
            http_streaming: false,
        }
    }

    /// Set the channel byte written after the length in header framing
    pub fn channel(mut self, channel: Option<u8>) -> Self {
        self.channel = channel;
        self
    }

    /// Current mode
    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Switch modes; takes effect with the next frame
    pub fn set_mode(&mut self, mode: FramingMode) {
        if mode != self.mode {
            tracing::debug!(from = %self.mode, to = %mode, "Framing changed");
            self.mode = mode;
        }
    }

    /// Change the channel byte
    pub fn set_channel(&mut self, channel: Option<u8>) {
        self.channel = channel;
    }

    /// Whether the HTTP gate has opened
    pub fn is_http_streaming(&self) -> bool {
        self.http_streaming
    }

    /// Bytes written once when the output is opened
    pub fn open(&mut self) -> Vec<Bytes> {
        if self.mode == FramingMode::Multipart {
            self.multipart_header_sent = true;
            return multipart_preamble();
        }
        Vec::new()
    }

    /// Open the HTTP gate and return the multipart preamble that follows the
    /// `200 OK` status line
    pub fn start_http_stream(&mut self) -> Vec<Bytes> {
        self.http_streaming = true;
        self.multipart_header_sent = true;
        multipart_preamble()
    }

    /// Wrap one frame
    pub fn render(&mut self, frame: &Frame) -> Emission {
        match self.mode {
            FramingMode::Concatenate => Emission::Write(vec![frame.data().clone()]),
            FramingMode::LengthPrefixed => {
                let mut header = BytesMut::with_capacity(5);
                header.put_u32(frame.len() as u32);
                if let Some(channel) = self.channel {
                    header.put_u8(channel);
                }
                Emission::Write(vec![header.freeze(), frame.data().clone()])
            }
            FramingMode::Multipart => {
                let mut parts = Vec::with_capacity(5);
                if !self.multipart_header_sent {
                    self.multipart_header_sent = true;
                    parts.extend(multipart_preamble());
                }
                parts.extend(multipart_part(frame));
                Emission::Write(parts)
            }
            FramingMode::HttpMultipart => {
                if self.http_streaming {
                    Emission::Write(multipart_part(frame).to_vec())
                } else {
                    Emission::Skip
                }
            }
            FramingMode::ReplaceFile => Emission::ReplaceFile(frame.data().clone()),
        }
    }
}

fn multipart_preamble() -> Vec<Bytes> {
    vec![
        Bytes::from_static(MULTIPART_HEADER),
        Bytes::from_static(MULTIPART_BOUNDARY),
    ]
}

fn multipart_part(frame: &Frame) -> [Bytes; 3] {
    let header = format!(
        "Content-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        frame.len()
    );
    [
        Bytes::from(header),
        frame.data().clone(),
        Bytes::from_static(MULTIPART_BOUNDARY),
    ]
}
