//! Transport boundary for Tinkerwire.
//!
//! The core never opens sockets. Whatever carries the bytes (HTTP, a raw
//! TCP stream, a test channel) is reduced to a [`ChunkSource`] producing
//! [`Inbound`] events, and a [`ResponseStreamDecoder`] turns those events
//! back into [`ResponseMessage`](tinkerwire_protocol::ResponseMessage)s.
//!
//! # Architecture
//!
//! ```text
//! ChunkSource ──Inbound──▶ ResponseStreamDecoder ──frame──▶ MessageSerializer
//!  (Head / Chunk)           (length check, reassembly)        (bytes → message)
//! ```
//!
//! Each channel owns its own decoder and feeds it strictly in arrival
//! order. Decoding is synchronous; only waiting on the source is async.

#![allow(async_fn_in_trait)]

mod decoder;
mod error;
mod source;

pub use decoder::{
    ABSOLUTE_MAX_FRAME_SIZE, DecoderConfig, DecoderState, Framing, ResponseStreamDecoder,
};
pub use error::TransportError;
pub use source::{ChannelSource, Inbound, ReaderSource, read_responses};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Names the channel a decoder belongs to.
///
/// Every log line a [`ResponseStreamDecoder`] emits carries it as the
/// `connection` field, so interleaved output from concurrent channels can
/// be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps an id chosen by the caller, e.g. one the transport already
    /// assigned to the socket.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates a process-unique id. Never returns 0, and never hands out
    /// the same value twice.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Produces inbound events for one channel.
pub trait ChunkSource {
    /// Waits for the next event.
    ///
    /// Returns `Ok(None)` once the source is cleanly closed.
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError>;
}
