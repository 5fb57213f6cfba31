//! Error types for the protocol layer.
//!
//! Every failure while turning messages into bytes (or back) ends up here.
//! The variants name the field or type that was being processed so a bad
//! frame can be diagnosed from the error text alone.

use tinkerwire_bytecode::BytecodeError;

/// Errors that can occur while serializing or deserializing messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The input ended before `context` could be read in full.
    #[error("truncated input reading {context}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// A value started with a type code this codec does not know.
    #[error("unknown type code 0x{0:02x}")]
    UnknownTypeCode(u8),

    /// A value decoded fine but has the wrong kind for its position,
    /// e.g. a map where the request payload should be.
    #[error("unexpected type for {context}: expected {expected}, found {actual}")]
    UnexpectedType {
        context: &'static str,
        expected: &'static str,
        actual: String,
    },

    /// A length or count prefix was negative.
    #[error("negative length {length} for {context}")]
    NegativeLength { context: &'static str, length: i64 },

    #[error("invalid UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    /// The leading version byte of a frame is not one we speak.
    #[error("unsupported version byte 0x{0:02x}")]
    UnsupportedVersion(u8),

    /// Composite values were nested more than `limit` levels deep.
    #[error("{context} nested deeper than {limit} levels")]
    NestingTooDeep { context: &'static str, limit: usize },

    /// A frame carried bytes after its last field.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// A custom value names a type with no registered serializer.
    #[error("no serializer registered for custom type '{0}'")]
    UnknownCustomType(String),

    /// A registered custom type rejected the value or payload it was given.
    #[error("invalid value for custom type '{type_name}': {reason}")]
    InvalidCustomValue { type_name: String, reason: String },

    /// The text serializer could not parse or produce JSON.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The message is structurally valid but breaks a protocol rule,
    /// e.g. an out-of-range status code.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Rebuilding bytecode from the wire failed.
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
}
