//! A single operator with its positional arguments.

use crate::{BytecodeError, Value};

/// One instruction of a traversal: an operator name and its arguments.
///
/// Arguments are positional and never flattened. A [`Value::List`]
/// argument occupies exactly one slot however many elements it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    operator: String,
    arguments: Vec<Value>,
}

impl Instruction {
    /// Creates an instruction.
    ///
    /// # Errors
    /// Returns [`BytecodeError::MalformedArgument`] if `operator` is empty.
    pub fn new(
        operator: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Result<Self, BytecodeError> {
        let operator = operator.into();
        if operator.is_empty() {
            return Err(BytecodeError::MalformedArgument(
                "instruction operator must not be empty".into(),
            ));
        }
        Ok(Self {
            operator,
            arguments,
        })
    }

    /// The step or source name, e.g. `out`.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Arguments in call order.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}
