use tinkerwire_protocol::{ProtocolError, ResponseMessage};

/// Errors raised while turning an inbound byte stream into responses.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A frame declared more bytes than the configured maximum. The frame
    /// is dropped without any decode attempt.
    #[error("Response exceeded {limit} bytes.")]
    FrameTooLarge { limit: u64 },

    /// Payload bytes arrived while no frame length was known.
    #[error("received {0} bytes before a frame length was declared")]
    MissingLength(usize),

    /// A length was declared on a stream that carries its own prefixes.
    #[error("length {0} declared on a length-prefixed stream")]
    UnexpectedLength(u64),

    /// A new frame started before the previous one was complete.
    #[error("frame ended after {received} of {expected} bytes")]
    IncompleteFrame { expected: u64, received: usize },

    /// A complete frame could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The source closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Reading from the source failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// [`read_responses`](crate::read_responses) stopped on `source` after
    /// `responses` had already been decoded.
    #[error("{source} (after {} decoded responses)", .responses.len())]
    Interrupted {
        responses: Vec<ResponseMessage>,
        source: Box<TransportError>,
    },
}

impl TransportError {
    /// Splits off any responses decoded before the failure.
    ///
    /// Returns an empty list and the error itself for every variant other
    /// than [`TransportError::Interrupted`].
    pub fn into_parts(self) -> (Vec<ResponseMessage>, TransportError) {
        match self {
            Self::Interrupted { responses, source } => (responses, *source),
            other => (Vec::new(), other),
        }
    }
}
