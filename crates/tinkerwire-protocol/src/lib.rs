//! Wire protocol for Tinkerwire.
//!
//! This crate defines what a client and a graph server exchange and how it
//! is turned into bytes:
//!
//! - **Messages** ([`RequestMessage`], [`ResponseMessage`] and their
//!   builders): the request/response structures that travel on the wire.
//! - **Serializers** ([`MessageSerializer`] trait, [`GraphBinarySerializer`],
//!   [`GraphSonSerializer`]): complete-buffer conversion of messages, picked
//!   at runtime through [`Serializers`].
//! - **Custom types** ([`CustomTypeSerializer`], [`CustomTypeRegistry`],
//!   [`Point`]): provider-defined value types plugged in by name.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between the bytecode model and the transport.
//! It knows nothing about connections or chunking; it converts one whole
//! message at a time.
//!
//! ```text
//! Bytecode (values) → Protocol (messages ⇄ bytes) → Transport (frames)
//! ```
//!
//! # Example
//!
//! ```rust
//! use tinkerwire_protocol::{RequestMessage, Serializers};
//!
//! let serializer = Serializers::GraphBinaryV4.simple_instance();
//! let request = RequestMessage::build("g.V().count()").add_g("g").create();
//!
//! let bytes = serializer.serialize_request(&request)?;
//! assert_eq!(serializer.deserialize_request(&bytes)?, request);
//! # Ok::<(), tinkerwire_protocol::ProtocolError>(())
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod binary;
mod custom;
mod error;
#[cfg(feature = "json")]
pub mod graphson;
mod message;
mod serializer;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use binary::GraphBinarySerializer;
pub use custom::{CustomTypeRegistry, CustomTypeSerializer, Point, PointSerializer};
pub use error::ProtocolError;
#[cfg(feature = "json")]
pub use graphson::GraphSonSerializer;
pub use message::{
    MaterializeProperties, RequestMessage, RequestMessageBuilder, RequestPayload,
    ResponseMessage, ResponseMessageBuilder, ResponseStatus, StatusCode,
};
pub use serializer::{MAX_NESTING_DEPTH, MessageSerializer, Serializers};
