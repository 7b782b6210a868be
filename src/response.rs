//! HTTP responses.
//!
//! [`ClientResponse`] is the in-flight response the codec completes with
//! either a failure or the full body. [`BufferedResponse`] is the terminal,
//! fully-buffered form: the decoded body plus the retained buffer that the
//! re-decoding accessors operate on without touching the stream again.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::builder::{self, Charset, JsonObject};
use crate::error::Error;

/// HTTP protocol version of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    /// HTTP/1.0
    Http10,
    /// HTTP/1.1
    Http11,
}

impl std::fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        })
    }
}

/// Status line and headers of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: HttpVersion,
    pub status_code: u16,
    pub status_message: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Get the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type FailureHandler = Box<dyn FnOnce(Error) + Send + 'static>;
type BodyHandler = Box<dyn FnOnce(Bytes) + Send + 'static>;

/// An in-flight response.
///
/// The codec constructs one as soon as the response head is parsed and
/// later settles it with [`fail`](Self::fail) or
/// [`complete_body`](Self::complete_body). An event arriving before the
/// matching handler is registered is held and delivered at registration;
/// each event is delivered at most once.
pub struct ClientResponse {
    head: ResponseHead,
    events: Mutex<Events>,
}

#[derive(Default)]
struct Events {
    on_failure: Option<FailureHandler>,
    on_body: Option<BodyHandler>,
    pending_failure: Option<Error>,
    pending_body: Option<Bytes>,
}

impl ClientResponse {
    /// Create a response from its parsed head.
    pub fn new(head: ResponseHead) -> Arc<Self> {
        Arc::new(Self {
            head,
            events: Mutex::new(Events::default()),
        })
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn version(&self) -> HttpVersion {
        self.head.version
    }

    pub fn status_code(&self) -> u16 {
        self.head.status_code
    }

    pub fn status_message(&self) -> &str {
        &self.head.status_message
    }

    /// Response headers as (name, value) pairs.
    pub fn headers(&self) -> &[(String, String)] {
        &self.head.headers
    }

    /// Get the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    /// Register the handler for a mid-flight failure.
    pub fn exception_handler(&self, handler: impl FnOnce(Error) + Send + 'static) {
        let mut events = self.events.lock().unwrap();
        if let Some(error) = events.pending_failure.take() {
            drop(events);
            handler(error);
        } else {
            events.on_failure = Some(Box::new(handler));
        }
    }

    /// Register the handler for the fully-buffered body.
    pub fn body_handler(&self, handler: impl FnOnce(Bytes) + Send + 'static) {
        let mut events = self.events.lock().unwrap();
        if let Some(buffer) = events.pending_body.take() {
            drop(events);
            handler(buffer);
        } else {
            events.on_body = Some(Box::new(handler));
        }
    }

    /// Codec side: the response failed before the body completed.
    pub fn fail(&self, error: Error) {
        let mut events = self.events.lock().unwrap();
        if let Some(handler) = events.on_failure.take() {
            drop(events);
            handler(error);
        } else if events.pending_failure.is_none() {
            events.pending_failure = Some(error);
        }
    }

    /// Codec side: the full body has been received.
    pub fn complete_body(&self, buffer: Bytes) {
        let mut events = self.events.lock().unwrap();
        if let Some(handler) = events.on_body.take() {
            drop(events);
            handler(buffer);
        } else if events.pending_body.is_none() {
            events.pending_body = Some(buffer);
        }
    }
}

/// A fully-buffered response with a decoded body.
///
/// Produced by [`ResponseBuilder::send`](crate::ResponseBuilder::send). The
/// re-decoding accessors operate on the retained buffer; the stream is never
/// consumed twice. The whole body sits in memory, so this is for payloads
/// that fit there.
pub struct BufferedResponse<T> {
    head: ResponseHead,
    buffer: Bytes,
    body: T,
}

impl<T> BufferedResponse<T> {
    pub(crate) fn new(head: ResponseHead, buffer: Bytes, body: T) -> Self {
        Self { head, buffer, body }
    }

    pub fn version(&self) -> HttpVersion {
        self.head.version
    }

    pub fn status_code(&self) -> u16 {
        self.head.status_code
    }

    pub fn status_message(&self) -> &str {
        &self.head.status_message
    }

    /// Response headers as (name, value) pairs.
    pub fn headers(&self) -> &[(String, String)] {
        &self.head.headers
    }

    /// Get the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    /// The body in the format the builder decoded it to.
    pub fn body(&self) -> &T {
        &self.body
    }

    /// Consume the response and return the decoded body.
    pub fn into_body(self) -> T {
        self.body
    }

    /// The raw body bytes.
    pub fn body_as_buffer(&self) -> Bytes {
        self.buffer.clone()
    }

    /// Re-decode the body as UTF-8 text.
    pub fn body_as_string(&self) -> Result<String, Error> {
        builder::decode_string(&self.buffer, Charset::Utf8)
    }

    /// Re-decode the body as text in the given charset.
    pub fn body_as_string_with(&self, charset: Charset) -> Result<String, Error> {
        builder::decode_string(&self.buffer, charset)
    }

    /// Re-decode the body as a JSON object.
    pub fn body_as_json_object(&self) -> Result<JsonObject, Error> {
        builder::decode_json_object(&self.buffer)
    }

    /// Re-decode the body as typed JSON.
    pub fn body_as<R: DeserializeOwned>(&self) -> Result<R, Error> {
        builder::decode_json(&self.buffer)
    }
}
