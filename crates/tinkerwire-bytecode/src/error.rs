//! Error types for the bytecode model.

/// Errors raised while building bytecode.
///
/// Construction is the only fallible part of the model; cloning, equality
/// and binding collection never fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BytecodeError {
    /// An instruction could not be built from what the caller supplied,
    /// e.g. an empty operator name or a rejected `null` argument list.
    #[error("malformed argument: {0}")]
    MalformedArgument(String),
}
