//! # Tinkerwire
//!
//! Graph traversal bytecode and the wire protocol that carries it.
//!
//! This crate re-exports the three layers so applications depend on a
//! single crate and a single error type:
//!
//! - [`bytecode`]: traversals as data ([`GremlinLang`](bytecode::GremlinLang),
//!   values, bindings).
//! - [`protocol`]: request/response messages and the GraphBinary and
//!   GraphSON serializers.
//! - [`transport`]: reassembly of response frames from inbound chunks.
//!
//! ## Quick Start
//!
//! ```rust
//! use tinkerwire::prelude::*;
//!
//! let mut g = GremlinLang::new();
//! g.add_step("V", vec![])?
//!     .add_step("has", vec!["name".into(), Binding::new("n", "marko").into()])?;
//!
//! let serializer = Serializers::GraphBinaryV4.simple_instance();
//! let request = RequestMessage::build(g).add_g("g").create();
//! let bytes = serializer.serialize_request(&request)?;
//!
//! assert_eq!(serializer.deserialize_request(&bytes)?, request);
//! # Ok::<(), TinkerwireError>(())
//! ```

mod error;

pub use error::TinkerwireError;

pub use tinkerwire_bytecode as bytecode;
pub use tinkerwire_protocol as protocol;
pub use tinkerwire_transport as transport;

pub mod prelude {
    pub use crate::TinkerwireError;
    pub use tinkerwire_bytecode::{
        Binding, CustomValue, GremlinLang, NullArguments, Predicate, Token, TokenKind,
        TraversalStrategy, Value,
    };
    pub use tinkerwire_protocol::{
        MaterializeProperties, MessageSerializer, Point, RequestMessage, ResponseMessage,
        Serializers, StatusCode,
    };
    pub use tinkerwire_transport::{
        ChannelSource, ChunkSource, ConnectionId, DecoderConfig, Framing, Inbound,
        ResponseStreamDecoder, read_responses,
    };
}
