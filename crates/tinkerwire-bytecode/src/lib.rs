//! Traversal bytecode for Tinkerwire.
//!
//! This crate is the query-representation layer: it describes a traversal
//! as data, without knowing how it gets executed or serialized.
//!
//! - **Values** ([`Value`] and its payload types): everything that can
//!   be an instruction argument or a result item.
//! - **Instructions** ([`Instruction`], [`GremlinLang`]): the ordered
//!   source/step instruction stream, with structural equality, hashing
//!   and deep cloning.
//! - **Bindings** ([`Binding`], [`BindingMap`]): named placeholders and
//!   their recursive collection.
//!
//! # Architecture
//!
//! ```text
//! Bytecode (this crate) → Protocol (messages, codecs) → Transport (frames)
//! ```
//!
//! # Example
//!
//! ```rust
//! use tinkerwire_bytecode::{Binding, GremlinLang, Value};
//!
//! let mut g = GremlinLang::new();
//! g.add_step("V", vec![])?
//!     .add_step("out", vec![Binding::new("label", "knows").into()])?;
//!
//! assert_eq!(g.to_gremlin(), "g.V().out(label)");
//! assert_eq!(g.collect_bindings().get("label"), Some(&Value::from("knows")));
//! # Ok::<(), tinkerwire_bytecode::BytecodeError>(())
//! ```

mod binding;
mod error;
mod gremlin_lang;
mod instruction;
mod script;
mod value;

pub use binding::{Binding, BindingMap};
pub use error::BytecodeError;
pub use gremlin_lang::{GremlinLang, NullArguments};
pub use instruction::Instruction;
pub use value::{
    CustomValue, Predicate, Token, TokenKind, TraversalStrategy, Value,
};
