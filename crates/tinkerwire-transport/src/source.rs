//! Inbound chunk sources and the loop that drains them into a decoder.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tinkerwire_protocol::ResponseMessage;

use crate::{ChunkSource, ResponseStreamDecoder, TransportError};

const DEFAULT_READ_SIZE: usize = 8 * 1024;

/// One event from the transport below the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A frame starts; the transport declared its payload length.
    Head { content_length: u64 },
    /// Payload bytes, in arrival order.
    Chunk(Bytes),
}

// ---------------------------------------------------------------------------
// ChannelSource
// ---------------------------------------------------------------------------

/// In-memory source fed through a tokio channel.
///
/// Useful where another task owns the socket, and in tests.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Inbound>,
}

impl ChannelSource {
    /// Reads from an existing receiver.
    pub fn new(rx: mpsc::Receiver<Inbound>) -> Self {
        Self { rx }
    }

    /// Creates a bounded channel and the source reading from it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Inbound>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

impl ChunkSource for ChannelSource {
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

// ---------------------------------------------------------------------------
// ReaderSource
// ---------------------------------------------------------------------------

/// Source over any async byte stream, e.g. a `TcpStream`.
///
/// It only ever yields [`Inbound::Chunk`], so it pairs with
/// length-prefixed framing.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    read_size: usize,
}

impl<R: AsyncRead + Unpin> ReaderSource<R> {
    /// Reads up to 8 KiB per chunk.
    pub fn new(reader: R) -> Self {
        Self::with_read_size(reader, DEFAULT_READ_SIZE)
    }

    /// `read_size` bounds each chunk. Zero is treated as one byte.
    pub fn with_read_size(reader: R, read_size: usize) -> Self {
        Self {
            reader,
            read_size: read_size.max(1),
        }
    }

    /// Gives the reader back, e.g. to shut down a socket.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: AsyncRead + Unpin> ChunkSource for ReaderSource<R> {
    async fn recv(&mut self) -> Result<Option<Inbound>, TransportError> {
        let mut buf = BytesMut::zeroed(self.read_size);
        let n = self
            .reader
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Inbound::Chunk(buf.freeze())))
    }
}

// ---------------------------------------------------------------------------
// read_responses
// ---------------------------------------------------------------------------

/// Feeds every event from `source` into `decoder` until the source closes,
/// collecting responses in completion order.
///
/// # Errors
///
/// Stops at the first decoder or source error. A source that closes in
/// the middle of a frame, or while an oversized frame is being skipped,
/// yields [`TransportError::ConnectionClosed`].
///
/// Responses decoded before the failure are not lost: the error comes back
/// as [`TransportError::Interrupted`] carrying them, and
/// [`TransportError::into_parts`] splits them off. When nothing had been
/// decoded yet the underlying error is returned as is.
pub async fn read_responses<S: ChunkSource>(
    source: &mut S,
    decoder: &mut ResponseStreamDecoder,
) -> Result<Vec<ResponseMessage>, TransportError> {
    let mut responses = Vec::new();

    let outcome = feed(source, decoder, &mut responses).await;
    if let Err(err) = outcome {
        responses.extend(decoder.take_decoded());
        if responses.is_empty() {
            return Err(err);
        }
        tracing::debug!(
            connection = %decoder.connection(),
            responses = responses.len(),
            error = %err,
            "read interrupted"
        );
        return Err(TransportError::Interrupted {
            responses,
            source: Box::new(err),
        });
    }

    tracing::debug!(
        connection = %decoder.connection(),
        responses = responses.len(),
        "source closed"
    );
    Ok(responses)
}

async fn feed<S: ChunkSource>(
    source: &mut S,
    decoder: &mut ResponseStreamDecoder,
    responses: &mut Vec<ResponseMessage>,
) -> Result<(), TransportError> {
    while let Some(event) = source.recv().await? {
        let completed = match event {
            Inbound::Head { content_length } => decoder.declare_length(content_length)?,
            Inbound::Chunk(chunk) => decoder.push(&chunk)?,
        };
        responses.extend(completed);
    }

    if decoder.is_idle() {
        return Ok(());
    }
    let detail = if let Some(remaining) = decoder.skip_remaining() {
        format!("stream ended while skipping an oversized frame, {remaining} bytes short")
    } else if let Some(expected) = decoder.expected_len() {
        format!(
            "stream ended after {} of {expected} frame bytes",
            decoder.buffered_len()
        )
    } else {
        format!("stream ended with {} bytes pending", decoder.buffered_len())
    };
    tracing::debug!(connection = %decoder.connection(), %detail, "source closed mid-frame");
    Err(TransportError::ConnectionClosed(detail))
}
