//! Unified error type for Tinkerwire.

use tinkerwire_bytecode::BytecodeError;
use tinkerwire_protocol::ProtocolError;
use tinkerwire_transport::TransportError;

/// Top-level error wrapping every crate-specific error, so `?` works
/// across layers without manual conversion.
#[derive(Debug, thiserror::Error)]
pub enum TinkerwireError {
    /// Bytecode could not be built.
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),

    /// A message could not be serialized or deserialized.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A response stream could not be decoded.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
