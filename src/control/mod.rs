//! Control stream
//!
//! Configuration requests arriving on a byte stream (stdin when it is not a
//! terminal, or any other reader handed to the server).

pub mod codec;
pub mod error;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

pub use codec::{ControlCodec, ControlMessage, MAX_REQUEST_BUFFER_SIZE};
pub use error::ControlError;

/// Boxed reader the event loop polls for control messages
pub type ControlStream = FramedRead<Box<dyn AsyncRead + Unpin + Send>, ControlCodec>;

/// Wrap a reader with a control codec
pub fn control_stream<R>(reader: R, codec: ControlCodec) -> ControlStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let reader: Box<dyn AsyncRead + Unpin + Send> = Box::new(reader);
    FramedRead::new(reader, codec)
}

/// Next message from an optional control stream
///
/// Pends forever when there is no stream, so it can sit in a `select!`
/// alongside the other event sources.
pub async fn next_message(
    stream: &mut Option<ControlStream>,
) -> Option<Result<ControlMessage, ControlError>> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
