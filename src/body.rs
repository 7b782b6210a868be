use bytes::Bytes;

/// Fully-buffered payload for an outgoing request.
///
/// [`ResponseBuilder::send`](crate::ResponseBuilder::send) forwards the body
/// untouched to the underlying [`RequestSink`](crate::RequestSink); the codec
/// behind the sink derives framing from the byte length. An absent body is
/// `None` at the `send` call site, so `Body` itself is never empty-but-present
/// unless the caller built it that way.
#[derive(Debug, Clone, Default)]
pub struct Body(Bytes);

impl Body {
    /// Wrap an already-buffered payload.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Whether there are no payload bytes to write.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the body and return the payload.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}
