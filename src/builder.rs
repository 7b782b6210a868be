//! Typed response building.
//!
//! [`ResponseBuilder`] fixes a buffer-to-value decoder and chains it onto an
//! underlying request dispatch. The terminal [`send`](ResponseBuilder::send)
//! attaches the failure and full-body handlers to the in-flight response and
//! completes its callback exactly once, with either a
//! [`BufferedResponse`] or the first error to arrive.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::body::Body;
use crate::error::Error;
use crate::response::{BufferedResponse, ClientResponse};

/// A JSON object body.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Text encodings the string decoders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Iso8859_1,
    Ascii,
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Charset::Utf8 => "utf-8",
            Charset::Iso8859_1 => "iso-8859-1",
            Charset::Ascii => "us-ascii",
        })
    }
}

/// Callback receiving the in-flight response, or the dispatch failure.
pub type ResponseCallback = Box<dyn FnOnce(Result<Arc<ClientResponse>, Error>) + Send + 'static>;

/// The underlying request dispatch a [`ResponseBuilder`] sends through.
pub trait RequestSink: Send + Sync {
    /// Write the request (with an optional body) and deliver the in-flight
    /// response to `on_response` once its head has been parsed.
    fn send(&self, body: Option<Body>, on_response: ResponseCallback);
}

type DecodeFn<T> = Arc<dyn Fn(&Bytes) -> Result<T, Error> + Send + Sync>;
type Completion<T> =
    Arc<Mutex<Option<Box<dyn FnOnce(Result<BufferedResponse<T>, Error>) + Send>>>>;

/// Immutable configurator for decoding a buffered response.
///
/// Each `as_*` call returns a builder with a new decoder over the same
/// underlying request.
pub struct ResponseBuilder<T> {
    request: Arc<dyn RequestSink>,
    decode: DecodeFn<T>,
}

impl ResponseBuilder<Bytes> {
    /// Start a builder whose decoded body is the raw buffer itself.
    pub fn new(request: Arc<dyn RequestSink>) -> Self {
        Self {
            request,
            decode: Arc::new(|buffer: &Bytes| Ok(buffer.clone())),
        }
    }
}

impl<T> ResponseBuilder<T> {
    /// Decode the body as UTF-8 text.
    pub fn as_string(self) -> ResponseBuilder<String> {
        ResponseBuilder {
            request: self.request,
            decode: Arc::new(|buffer: &Bytes| decode_string(buffer, Charset::Utf8)),
        }
    }

    /// Decode the body as text in the given charset.
    pub fn as_string_with(self, charset: Charset) -> ResponseBuilder<String> {
        ResponseBuilder {
            request: self.request,
            decode: Arc::new(move |buffer: &Bytes| decode_string(buffer, charset)),
        }
    }

    /// Decode the body as a JSON object.
    pub fn as_json_object(self) -> ResponseBuilder<JsonObject> {
        ResponseBuilder {
            request: self.request,
            decode: Arc::new(decode_json_object),
        }
    }

    /// Decode the body as JSON into `R`.
    pub fn as_json<R: DeserializeOwned + 'static>(self) -> ResponseBuilder<R> {
        ResponseBuilder {
            request: self.request,
            decode: Arc::new(|buffer: &Bytes| decode_json(buffer)),
        }
    }

    /// Send the request and receive the decoded, fully-buffered response.
    ///
    /// `callback` is invoked exactly once, with the first of: the decoded
    /// response, the dispatch error, a mid-flight failure, or the decode
    /// error.
    pub fn send<F>(self, body: Option<Body>, callback: F)
    where
        T: Send + 'static,
        F: FnOnce(Result<BufferedResponse<T>, Error>) + Send + 'static,
    {
        let ResponseBuilder { request, decode } = self;
        let completion: Completion<T> = Arc::new(Mutex::new(Some(Box::new(callback))));
        request.send(
            body,
            Box::new(move |outcome| match outcome {
                Ok(response) => {
                    let on_failure = Arc::clone(&completion);
                    response.exception_handler(move |error| complete(&on_failure, Err(error)));
                    let source = Arc::clone(&response);
                    response.body_handler(move |buffer| {
                        let outcome = decode(&buffer).map(|decoded| {
                            BufferedResponse::new(source.head().clone(), buffer, decoded)
                        });
                        complete(&completion, outcome);
                    });
                }
                Err(error) => complete(&completion, Err(error)),
            }),
        );
    }
}

/// Deliver `outcome` unless the callback already completed.
fn complete<T>(slot: &Completion<T>, outcome: Result<BufferedResponse<T>, Error>) {
    if let Some(callback) = slot.lock().unwrap().take() {
        callback(outcome);
    }
}

pub(crate) fn decode_string(buffer: &Bytes, charset: Charset) -> Result<String, Error> {
    match charset {
        Charset::Utf8 => std::str::from_utf8(buffer)
            .map(str::to_owned)
            .map_err(|_| Error::Encoding { charset }),
        Charset::Iso8859_1 => Ok(buffer.iter().map(|&b| b as char).collect()),
        Charset::Ascii => {
            if buffer.is_ascii() {
                // Safe to reinterpret: ASCII is a UTF-8 subset.
                Ok(String::from_utf8_lossy(buffer).into_owned())
            } else {
                Err(Error::Encoding { charset })
            }
        }
    }
}

pub(crate) fn decode_json_object(buffer: &Bytes) -> Result<JsonObject, Error> {
    Ok(serde_json::from_slice(buffer)?)
}

pub(crate) fn decode_json<R: DeserializeOwned>(buffer: &Bytes) -> Result<R, Error> {
    Ok(serde_json::from_slice(buffer)?)
}
