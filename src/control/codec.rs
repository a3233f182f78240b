//! Control stream codec
//!
//! The control stream carries configuration lines in one of three shapes,
//! following the current output framing:
//!
//! ```text
//!   lines    quality=30\n vflip\n ...
//!   header   [len:u32 BE][lines...] [len:u32 BE][lines...] ...
//!   http     GET /video HTTP/1.1\r\n ... \r\n\r\n   (one request, then ignored)
//! ```
//!
//! Partial input is carried over between reads, bounded by the request
//! buffer size.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, Decoder};

use super::error::ControlError;
use crate::output::{FramingMode, HttpRequest};

/// Default carry-over buffer size (4KB)
pub const MAX_REQUEST_BUFFER_SIZE: usize = 4096;

const LENGTH_PREFIX: usize = 4;
const HEAD_END: &[u8] = b"\r\n\r\n";

/// One decoded control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// A single config line
    Line(String),
    /// A packet of newline-separated config lines
    Packet(Bytes),
    /// An HTTP request head
    Request(HttpRequest),
}

/// Decoder for the control stream
#[derive(Debug)]
pub enum ControlCodec {
    /// Newline-terminated lines, decoded lossily
    Lines { inner: AnyDelimiterCodec, max: usize },
    /// Length-prefixed packets
    LengthPrefixed { max: usize },
    /// A single HTTP request
    Http { max: usize, answered: bool },
}

impl ControlCodec {
    /// Codec for newline-terminated lines
    pub fn lines(max: usize) -> Self {
        ControlCodec::Lines {
            inner: AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), max),
            max,
        }
    }

    /// Codec for length-prefixed packets
    pub fn length_prefixed(max: usize) -> Self {
        ControlCodec::LengthPrefixed { max }
    }

    /// Codec for one HTTP request
    pub fn http(max: usize) -> Self {
        ControlCodec::Http {
            max,
            answered: false,
        }
    }

    /// Codec matching an output framing
    pub fn for_framing(mode: FramingMode, max: usize) -> Self {
        match mode {
            FramingMode::LengthPrefixed => Self::length_prefixed(max),
            FramingMode::HttpMultipart => Self::http(max),
            _ => Self::lines(max),
        }
    }

    /// Switch to the shape for a new output framing
    ///
    /// Returns false when the shape is unchanged. Unread input stays in the
    /// reader's buffer and is decoded with the new shape.
    pub fn reframe(&mut self, mode: FramingMode) -> bool {
        let next = Self::for_framing(mode, self.max());
        if std::mem::discriminant(self) == std::mem::discriminant(&next) {
            return false;
        }
        *self = next;
        true
    }

    /// Carry-over limit
    pub fn max(&self) -> usize {
        match self {
            ControlCodec::Lines { max, .. }
            | ControlCodec::LengthPrefixed { max }
            | ControlCodec::Http { max, .. } => *max,
        }
    }
}

impl Decoder for ControlCodec {
    type Item = ControlMessage;
    type Error = ControlError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ControlMessage>, ControlError> {
        match self {
            ControlCodec::Lines { inner, max } => inner
                .decode(src)
                .map(|line| line.map(to_line))
                .map_err(|e| ControlError::from_lines(e, *max)),
            ControlCodec::LengthPrefixed { max } => decode_packet(src, *max),
            ControlCodec::Http { max, answered } => {
                if *answered {
                    src.clear();
                    return Ok(None);
                }

                let Some(pos) = src.windows(HEAD_END.len()).position(|w| w == HEAD_END) else {
                    if src.len() >= *max {
                        return Err(ControlError::RequestTooLarge { max: *max });
                    }
                    return Ok(None);
                };

                let head = src.split_to(pos + HEAD_END.len());
                src.clear();
                *answered = true;
                let request = HttpRequest::parse(&String::from_utf8_lossy(&head));
                Ok(Some(ControlMessage::Request(request)))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<ControlMessage>, ControlError> {
        if let ControlCodec::Lines { inner, max } = self {
            return inner
                .decode_eof(src)
                .map(|line| line.map(to_line))
                .map_err(|e| ControlError::from_lines(e, *max));
        }

        let message = self.decode(src)?;
        if message.is_none() && !src.is_empty() {
            tracing::debug!(bytes = src.len(), "Discarding partial control message");
            src.clear();
        }
        Ok(message)
    }
}

/// Invalid UTF-8 is replaced rather than rejected, as for datagrams
fn to_line(raw: Bytes) -> ControlMessage {
    let line = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
    ControlMessage::Line(String::from_utf8_lossy(line).into_owned())
}

fn decode_packet(src: &mut BytesMut, max: usize) -> Result<Option<ControlMessage>, ControlError> {
    if src.len() < LENGTH_PREFIX {
        return Ok(None);
    }

    let declared = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if declared > max.saturating_sub(LENGTH_PREFIX) {
        return Err(ControlError::Desync { declared });
    }

    let total = LENGTH_PREFIX + declared;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(LENGTH_PREFIX);
    let packet = src.split_to(declared).freeze();
    Ok(Some(ControlMessage::Packet(packet)))
}
