//! Minimal HTTP responder
//!
//! With `http` framing the process sits behind an inetd-style socket: the
//! request arrives on the control stream and the response is written to the
//! output. Only one request is served per session.

use bytes::Bytes;

use super::framing::FramingEncoder;
use super::sink::OutputSink;
use crate::error::Result;

/// Status line and server header of a successful response
pub const HTTP_OK: &[u8] = b"HTTP/1.1 200 OK\r\nServer: framecast\r\n";

/// Body served for `/` and `/index.html`
pub const INDEX_HTML: &[u8] = b"Content-Type: text/html; charset=UTF-8\r\n\
Connection: close\r\n\
\r\n\
<!DOCTYPE html>\r\n\
<html>\r\n\
<head>\r\n\
  <title>framecast</title>\r\n\
</head>\r\n\
<body>\r\n\
  <img src=\"/video\"/>\r\n\
</body>\r\n\
</html>\r\n";

/// Response for unknown paths
pub const HTTP_NOT_FOUND: &[u8] = b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";

/// Response for anything but GET
pub const HTTP_SERVER_ERROR: &[u8] =
    b"HTTP/1.1 500 Internal Server Error\r\nConnection: close\r\n\r\n";

/// Request line of an HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
}

impl HttpRequest {
    /// Parse the request line from a request head
    ///
    /// Never fails; a malformed request line yields empty fields, which
    /// routes to the error response.
    pub fn parse(head: &str) -> Self {
        let line = head.lines().next().unwrap_or("");
        let mut fields = line.split_whitespace();
        Self {
            method: fields.next().unwrap_or("").to_string(),
            path: fields.next().unwrap_or("").to_string(),
        }
    }

    /// Where this request goes
    pub fn route(&self) -> HttpRoute {
        if self.method != "GET" {
            return HttpRoute::BadMethod;
        }
        match self.path.as_str() {
            "/" | "/index.html" => HttpRoute::Index,
            "/video" => HttpRoute::Video,
            _ => HttpRoute::NotFound,
        }
    }
}

/// Request destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRoute {
    /// Landing page embedding the stream
    Index,
    /// The multipart stream
    Video,
    /// Unknown path
    NotFound,
    /// Not a GET
    BadMethod,
}

/// What the session does after responding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpOutcome {
    /// Keep going and stream frames
    Streaming,
    /// Response complete, end the session
    Close,
}

/// Response to write before anything else
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub parts: Vec<Bytes>,
    pub outcome: HttpOutcome,
}

impl HttpResponse {
    /// Build the response for a request
    ///
    /// For [`HttpRoute::Video`] only the status line is returned; the
    /// multipart preamble comes from the framing encoder when the stream
    /// starts.
    pub fn for_request(request: &HttpRequest) -> Self {
        let (parts, outcome) = match request.route() {
            HttpRoute::Index => (
                vec![Bytes::from_static(HTTP_OK), Bytes::from_static(INDEX_HTML)],
                HttpOutcome::Close,
            ),
            HttpRoute::Video => (vec![Bytes::from_static(HTTP_OK)], HttpOutcome::Streaming),
            HttpRoute::NotFound => (vec![Bytes::from_static(HTTP_NOT_FOUND)], HttpOutcome::Close),
            HttpRoute::BadMethod => (
                vec![Bytes::from_static(HTTP_SERVER_ERROR)],
                HttpOutcome::Close,
            ),
        };
        Self { parts, outcome }
    }
}

/// Answer a request on the output and open the stream if it asked for video
pub async fn respond(
    request: &HttpRequest,
    encoder: &mut FramingEncoder,
    sink: &mut OutputSink,
) -> Result<HttpOutcome> {
    let response = HttpResponse::for_request(request);
    tracing::info!(
        method = %request.method,
        path = %request.path,
        outcome = ?response.outcome,
        "HTTP request"
    );

    sink.write_parts(&response.parts).await?;
    if response.outcome == HttpOutcome::Streaming {
        let preamble = encoder.start_http_stream();
        sink.write_parts(&preamble).await?;
    }
    Ok(response.outcome)
}
