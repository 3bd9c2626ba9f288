//! HTTP/1.1 response builder.
//!
//! A [`Response`] carries either a buffered body, sent with `Content-Length`,
//! or a [`BodyStream`], sent with `Transfer-Encoding: chunked` so each piece
//! reaches the client as soon as it is produced.

use std::fmt;
use std::pin::Pin;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::error;

use super::{Headers, StatusCode};

/// A lazily produced response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Bytes> + Send + 'static>>;

/// The payload of a [`Response`].
pub enum Body {
    Full(Vec<u8>),
    Stream(BodyStream),
}

impl Body {
    /// Drains the body into a single buffer.
    pub async fn collect(self) -> Vec<u8> {
        match self {
            Body::Full(bytes) => bytes,
            Body::Stream(stream) => {
                stream
                    .fold(Vec::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        acc
                    })
                    .await
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use deckstream::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
    keep_alive: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::Full(Vec::new()),
            keep_alive: true,
        }
    }

    /// Creates a response whose body is `value` serialized as JSON.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => Self::new(status)
                .header("Content-Type", "application/json")
                .body_bytes(bytes),
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                Self::new(StatusCode::InternalServerError).body("Internal server error")
            }
        }
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in-place, for middleware decorating a downstream response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Body::Full(body.into().into_bytes());
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Body::Full(body.into());
        self
    }

    /// Streams the body from `stream`, one chunk per item.
    #[must_use]
    pub fn stream(mut self, stream: impl Stream<Item = Bytes> + Send + 'static) -> Self {
        self.body = Body::Stream(Box::pin(stream));
        self
    }

    /// Controls whether `Connection: keep-alive` or `Connection: close` is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, Body::Stream(_))
    }

    /// Takes the body out of the response.
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Serializes the response for the wire.
    ///
    /// Returns the encoded head (plus the whole body when buffered) and, for
    /// streaming responses, the stream whose items must be written as chunks.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if no `Content-Type` was set
    ///   and the body is non-empty or streamed.
    /// - `Content-Length: <n>` for buffered bodies, `Transfer-Encoding: chunked`
    ///   for streamed ones.
    /// - `Connection: keep-alive` or `Connection: close`.
    pub fn into_wire(mut self) -> (BytesMut, Option<BodyStream>) {
        let has_body = match &self.body {
            Body::Full(bytes) => !bytes.is_empty(),
            Body::Stream(_) => true,
        };
        if has_body && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.set("Connection", connection);

        let body_len = match &self.body {
            Body::Full(bytes) => bytes.len(),
            Body::Stream(_) => 0,
        };
        let mut buf = BytesMut::with_capacity(128 + self.headers.len() * 64 + body_len);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        match self.body {
            Body::Full(bytes) => {
                buf.put(format!("Content-Length: {body_len}\r\n\r\n").as_bytes());
                buf.put(bytes.as_slice());
                (buf, None)
            }
            Body::Stream(stream) => {
                buf.put(&b"Transfer-Encoding: chunked\r\n\r\n"[..]);
                (buf, Some(stream))
            }
        }
    }

    /// Serializes a buffered response into a single buffer.
    ///
    /// A streamed body is dropped; only its head is returned.
    pub fn into_bytes(self) -> BytesMut {
        self.into_wire().0
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

/// Encodes one chunk of a `Transfer-Encoding: chunked` body.
pub fn encode_chunk(data: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(data.len() + 16);
    buf.put(format!("{:x}\r\n", data.len()).as_bytes());
    buf.put(data);
    buf.put(&b"\r\n"[..]);
    buf
}

/// The terminating zero-length chunk.
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";
