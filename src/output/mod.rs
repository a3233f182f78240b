//! Local output
//!
//! Framing of assembled frames and the destination they are written to.
//! Subscribers on the control socket always receive bare frames; framing
//! only applies here.

pub mod framing;
pub mod http;
pub mod sink;

pub use framing::{Emission, FramingEncoder, FramingMode, MULTIPART_BOUNDARY, MULTIPART_HEADER};
pub use http::{respond, HttpOutcome, HttpRequest, HttpResponse, HttpRoute};
pub use sink::OutputSink;
