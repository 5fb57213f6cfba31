//! The serializer trait and the serializer selection used in configuration.
//!
//! The rest of the stack never cares HOW a message becomes bytes: it holds
//! an `Arc<dyn MessageSerializer>` and calls through the trait. Which
//! implementation sits behind the `Arc` is chosen by [`Serializers`],
//! which is plain data and can come straight out of a config file.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::binary::GraphBinarySerializer;
#[cfg(feature = "json")]
use crate::graphson::GraphSonSerializer;
use crate::{CustomTypeRegistry, ProtocolError, RequestMessage, ResponseMessage};

/// Converts request and response messages to and from complete byte
/// buffers.
///
/// ## Trait bounds
///
/// - `Send + Sync`: one serializer is shared by every connection task.
/// - object safe: callers store `Arc<dyn MessageSerializer>` and pick the
///   wire format at runtime.
///
/// Each method produces the whole buffer or an error. A failed call never
/// leaves partial output behind.
pub trait MessageSerializer: Send + Sync + fmt::Debug {
    /// The MIME type announced for this wire format.
    fn mime_type(&self) -> &'static str;

    /// # Errors
    /// Fails if a value cannot be represented, e.g. an unregistered
    /// custom type.
    fn serialize_request(&self, request: &RequestMessage) -> Result<Bytes, ProtocolError>;

    /// # Errors
    /// Fails on malformed, truncated or trailing input.
    fn deserialize_request(&self, data: &[u8]) -> Result<RequestMessage, ProtocolError>;

    /// # Errors
    /// Fails if a value cannot be represented.
    fn serialize_response(&self, response: &ResponseMessage) -> Result<Bytes, ProtocolError>;

    /// # Errors
    /// Fails on malformed, truncated or trailing input.
    fn deserialize_response(&self, data: &[u8]) -> Result<ResponseMessage, ProtocolError>;
}

// ---------------------------------------------------------------------------
// Nesting limit
// ---------------------------------------------------------------------------

/// How many composite values (lists, maps, traversals, bindings, ...) may
/// enclose one another in a single message.
///
/// Both serializers enforce it on write and on read, so anything one of
/// them encodes it can also decode. A message's result list and binding
/// map count as the first level.
///
/// GraphSON spends up to four JSON levels per nested traversal, and the
/// JSON parser stops at 128.
pub const MAX_NESTING_DEPTH: usize = 24;

/// Depth of the children of a composite found at `depth`.
pub(crate) fn descend(depth: usize, context: &'static str) -> Result<usize, ProtocolError> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(ProtocolError::NestingTooDeep {
            context,
            limit: MAX_NESTING_DEPTH,
        });
    }
    Ok(depth + 1)
}

// ---------------------------------------------------------------------------
// Serializers
// ---------------------------------------------------------------------------

/// The available wire formats.
///
/// In configuration files the variants are spelled `graphbinary-v4` and
/// `graphson-v4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Serializers {
    /// Binary, `application/vnd.graphbinary-v4.0`.
    #[default]
    #[serde(rename = "graphbinary-v4")]
    GraphBinaryV4,

    /// Typed JSON, `application/vnd.gremlin-v4.0+json`.
    #[cfg(feature = "json")]
    #[serde(rename = "graphson-v4")]
    GraphSonV4,
}

impl Serializers {
    /// The MIME type the serializer is negotiated under.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::GraphBinaryV4 => crate::binary::MIME_TYPE,
            #[cfg(feature = "json")]
            Self::GraphSonV4 => crate::graphson::MIME_TYPE,
        }
    }

    /// A serializer with the standard custom type registry.
    pub fn simple_instance(self) -> Arc<dyn MessageSerializer> {
        self.with_registry(Arc::new(CustomTypeRegistry::standard()))
    }

    /// A serializer resolving custom types through `registry`.
    pub fn with_registry(self, registry: Arc<CustomTypeRegistry>) -> Arc<dyn MessageSerializer> {
        match self {
            Self::GraphBinaryV4 => Arc::new(GraphBinarySerializer::with_registry(registry)),
            #[cfg(feature = "json")]
            Self::GraphSonV4 => Arc::new(GraphSonSerializer::with_registry(registry)),
        }
    }
}
