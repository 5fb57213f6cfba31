//! Reassembly of response frames from transport chunks.
//!
//! The transport hands over bytes in whatever pieces the network produced.
//! A [`ResponseStreamDecoder`] collects them until a whole frame is present,
//! checks the frame's length against the configured maximum, and passes the
//! completed buffer to a [`MessageSerializer`].
//!
//! # Frame lifecycle
//!
//! ```text
//!                 length known, <= max
//!   ┌──────────┐ ─────────────────────▶ ┌─────────┐  all bytes  ┌──────────┐
//!   │ awaiting │                        │ reading │ ──────────▶ │ decoded  │
//!   │  length  │ ◀───────────────────── └─────────┘             └──────────┘
//!   └──────────┘      next frame              │                      │
//!        ▲  │ length > max                    └──────── reset ◀──────┘
//!        │  ▼
//!   ┌──────────┐
//!   │ skipping │  rest of the oversized frame is dropped unread
//!   └──────────┘
//! ```
//!
//! Where the length comes from depends on [`Framing`]: either the transport
//! declares it out of band ([`ResponseStreamDecoder::declare_length`]), or
//! every frame on the stream starts with a 4-byte big-endian prefix.

use std::mem;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use tinkerwire_protocol::{MessageSerializer, ResponseMessage};

use crate::{ConnectionId, TransportError};

/// Upper bound on any single frame, whatever the configuration says.
pub const ABSOLUTE_MAX_FRAME_SIZE: u64 = i32::MAX as u64;

const LENGTH_PREFIX_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How frame boundaries are found on the inbound stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    /// The transport announces each frame's length before its bytes, the
    /// way an HTTP response carries `Content-Length`.
    #[default]
    Declared,
    /// Each frame is `{u32 BE length}{payload}`.
    LengthPrefixed,
}

/// Decoder settings, loadable from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest accepted frame in bytes, inclusive. 0 means unbounded.
    pub max_content_length: u64,

    /// Where frame lengths come from.
    pub framing: Framing,
}

impl DecoderConfig {
    /// Sets the largest accepted frame. 0 means unbounded.
    pub fn with_max_content_length(mut self, max_content_length: u64) -> Self {
        self.max_content_length = max_content_length;
        self
    }

    /// Sets how frame boundaries are found.
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`ResponseStreamDecoder::new`]. A
    /// `max_content_length` above [`ABSOLUTE_MAX_FRAME_SIZE`] is lowered to
    /// it, so the limit in a [`TransportError::FrameTooLarge`] always
    /// matches the decoder's own config.
    pub fn validated(mut self) -> Self {
        if self.max_content_length > ABSOLUTE_MAX_FRAME_SIZE {
            tracing::warn!(
                max_content_length = self.max_content_length,
                cap = ABSOLUTE_MAX_FRAME_SIZE,
                "max_content_length exceeds the frame size cap, clamping"
            );
            self.max_content_length = ABSOLUTE_MAX_FRAME_SIZE;
        }
        self
    }

    /// The limit actually enforced: the configured maximum, or
    /// [`ABSOLUTE_MAX_FRAME_SIZE`] when unbounded.
    pub fn effective_limit(&self) -> u64 {
        match self.max_content_length {
            0 => ABSOLUTE_MAX_FRAME_SIZE,
            max => max.min(ABSOLUTE_MAX_FRAME_SIZE),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_content_length: 0,
            framing: Framing::Declared,
        }
    }
}

// ---------------------------------------------------------------------------
// DecoderState
// ---------------------------------------------------------------------------

/// What the decoder reports to its owner.
///
/// `Complete` holds right after a call handed off at least one frame and
/// left nothing buffered for the next one. Any further input moves the
/// decoder back to `Accumulating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Accumulating,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingLength,
    Reading { expected: usize },
    Skipping { remaining: u64 },
}

// ---------------------------------------------------------------------------
// ResponseStreamDecoder
// ---------------------------------------------------------------------------

/// Per-channel frame reassembly.
///
/// One decoder belongs to one channel and is fed in arrival order; it is
/// never shared between channels. Every call returns immediately with the
/// responses completed so far.
///
/// If a call fails after some frames in the same input were already
/// decoded, those responses are kept and returned first by the next call.
pub struct ResponseStreamDecoder {
    connection: ConnectionId,
    serializer: Arc<dyn MessageSerializer>,
    config: DecoderConfig,
    buffer: BytesMut,
    phase: Phase,
    ready: Vec<ResponseMessage>,
    complete: bool,
}

impl ResponseStreamDecoder {
    /// Creates an idle decoder for one channel. `config` passes through
    /// [`DecoderConfig::validated`] first.
    pub fn new(
        connection: ConnectionId,
        serializer: Arc<dyn MessageSerializer>,
        config: DecoderConfig,
    ) -> Self {
        Self {
            connection,
            serializer,
            config: config.validated(),
            buffer: BytesMut::new(),
            phase: Phase::AwaitingLength,
            ready: Vec::new(),
            complete: false,
        }
    }

    /// The channel this decoder belongs to.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// The config in force, after validation.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Starts a frame of `length` bytes under [`Framing::Declared`].
    ///
    /// A zero-length frame is complete immediately and is decoded here.
    ///
    /// # Errors
    ///
    /// - [`TransportError::FrameTooLarge`] if `length` exceeds the limit;
    ///   the frame's bytes will be skipped as they arrive.
    /// - [`TransportError::IncompleteFrame`] if the previous frame was
    ///   still short; its bytes are discarded and the new length is not
    ///   applied.
    /// - [`TransportError::UnexpectedLength`] on a length-prefixed stream.
    pub fn declare_length(&mut self, length: u64) -> Result<Vec<ResponseMessage>, TransportError> {
        if self.config.framing == Framing::LengthPrefixed {
            return Err(TransportError::UnexpectedLength(length));
        }
        self.complete = false;

        match self.phase {
            Phase::Reading { expected } => {
                let received = self.buffer.len();
                self.buffer.clear();
                self.phase = Phase::AwaitingLength;
                return Err(TransportError::IncompleteFrame {
                    expected: expected as u64,
                    received,
                });
            }
            Phase::Skipping { remaining } => {
                tracing::debug!(connection = %self.connection, remaining, "new frame ends skip");
                self.phase = Phase::AwaitingLength;
            }
            Phase::AwaitingLength => {}
        }

        self.begin_frame(length)?;
        self.drain()
    }

    /// Appends a chunk and returns every response it completed, in order.
    ///
    /// # Errors
    ///
    /// - [`TransportError::FrameTooLarge`] when a length prefix exceeds the
    ///   limit. Bytes after the oversized frame stay buffered and are
    ///   decoded by the next call, which may pass an empty chunk.
    /// - [`TransportError::Protocol`] when a complete frame fails to
    ///   decode. The decoder moves on to the next frame.
    /// - [`TransportError::MissingLength`] for bytes outside any declared
    ///   frame. They are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<ResponseMessage>, TransportError> {
        self.buffer.extend_from_slice(chunk);
        self.drain()
    }

    /// Drops every buffered byte, pending response and partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.phase = Phase::AwaitingLength;
        self.ready.clear();
        self.complete = false;
    }

    /// See [`DecoderState`].
    pub fn state(&self) -> DecoderState {
        if self.complete {
            DecoderState::Complete
        } else {
            DecoderState::Accumulating
        }
    }

    /// Bytes held for frames that are not complete yet.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Length of the frame currently being read, if any.
    pub fn expected_len(&self) -> Option<u64> {
        match self.phase {
            Phase::Reading { expected } => Some(expected as u64),
            _ => None,
        }
    }

    /// Takes the responses a failed call decoded before its error, which
    /// would otherwise lead the next call's result.
    pub fn take_decoded(&mut self) -> Vec<ResponseMessage> {
        mem::take(&mut self.ready)
    }

    /// Bytes of an oversized frame still to be dropped, if one is being
    /// skipped.
    pub fn skip_remaining(&self) -> Option<u64> {
        match self.phase {
            Phase::Skipping { remaining } => Some(remaining),
            _ => None,
        }
    }

    /// `true` between frames with nothing buffered.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::AwaitingLength && self.buffer.is_empty()
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    fn drain(&mut self) -> Result<Vec<ResponseMessage>, TransportError> {
        match self.advance() {
            Ok(handed_off) => {
                self.complete = handed_off && self.is_idle();
                Ok(mem::take(&mut self.ready))
            }
            Err(err) => {
                self.complete = false;
                Err(err)
            }
        }
    }

    /// Runs the state machine until it needs more input. Returns whether
    /// any frame was handed off.
    fn advance(&mut self) -> Result<bool, TransportError> {
        let mut handed_off = false;
        loop {
            match self.phase {
                Phase::Skipping { .. } => {
                    self.skip_buffered();
                    if matches!(self.phase, Phase::Skipping { .. }) {
                        return Ok(handed_off);
                    }
                }
                Phase::AwaitingLength => match self.config.framing {
                    Framing::Declared => {
                        if self.buffer.is_empty() {
                            return Ok(handed_off);
                        }
                        let stray = self.buffer.len();
                        self.buffer.clear();
                        return Err(TransportError::MissingLength(stray));
                    }
                    Framing::LengthPrefixed => {
                        if self.buffer.len() < LENGTH_PREFIX_SIZE {
                            return Ok(handed_off);
                        }
                        let length = u64::from(self.buffer.get_u32());
                        self.begin_frame(length)?;
                    }
                },
                Phase::Reading { expected } => {
                    if self.buffer.len() < expected {
                        return Ok(handed_off);
                    }
                    let frame = self.buffer.split_to(expected).freeze();
                    self.phase = Phase::AwaitingLength;

                    let response = self.serializer.deserialize_response(&frame)?;
                    tracing::debug!(
                        connection = %self.connection,
                        bytes = frame.len(),
                        code = %response.status().code(),
                        "response frame decoded"
                    );
                    self.ready.push(response);
                    handed_off = true;
                }
            }
        }
    }

    fn begin_frame(&mut self, length: u64) -> Result<(), TransportError> {
        let limit = self.config.effective_limit();
        if length > limit {
            tracing::warn!(
                connection = %self.connection,
                length,
                limit,
                "response frame too large, skipping"
            );
            self.phase = Phase::Skipping { remaining: length };
            self.skip_buffered();
            return Err(TransportError::FrameTooLarge { limit });
        }

        tracing::trace!(connection = %self.connection, length, "frame started");
        // length <= i32::MAX, so it fits in usize.
        self.phase = Phase::Reading {
            expected: length as usize,
        };
        Ok(())
    }

    fn skip_buffered(&mut self) {
        if let Phase::Skipping { remaining } = self.phase {
            let skipped = remaining.min(self.buffer.len() as u64);
            self.buffer.advance(skipped as usize);
            self.phase = if skipped == remaining {
                tracing::trace!(connection = %self.connection, "oversized frame skipped");
                Phase::AwaitingLength
            } else {
                Phase::Skipping {
                    remaining: remaining - skipped,
                }
            };
        }
    }
}

impl std::fmt::Debug for ResponseStreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStreamDecoder")
            .field("connection", &self.connection)
            .field("serializer", &self.serializer.mime_type())
            .field("config", &self.config)
            .field("buffered", &self.buffer.len())
            .field("phase", &self.phase)
            .finish()
    }
}
