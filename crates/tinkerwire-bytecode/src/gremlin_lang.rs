//! The instruction stream that represents a traversal.
//!
//! A [`GremlinLang`] holds two ordered lists:
//!
//! - **source instructions** configure the traversal source
//!   (`withStrategies`, `withoutStrategies`, `withSideEffect`, ...);
//! - **step instructions** are the traversal itself (`V`, `out`, `has`, ...).
//!
//! Arguments may themselves be `GremlinLang` values (sub-traversals such
//! as the branch of a `choose` step), so a traversal is an owned tree.
//! `Clone` on an owned tree is already a deep copy: a cloned traversal
//! shares no instruction storage with its origin.
//!
//! ```text
//! GremlinLang
//! ├── source: [withStrategies(ReadOnlyStrategy)]
//! └── step:   [V(), out(Binding a='knows'), where(GremlinLang
//!                                                 └── step: [out(), has('age', gt(32))])]
//! ```

use std::hash::{Hash, Hasher};

use crate::{BindingMap, BytecodeError, Instruction, Value};

// ---------------------------------------------------------------------------
// NullArguments
// ---------------------------------------------------------------------------

/// What to do when an instruction is added with a `null` argument LIST
/// (as opposed to a list containing a `null` argument, which is always
/// accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullArguments {
    /// Store the instruction with a single [`Value::Null`] argument.
    /// `withoutStrategies(null)` is the typical user.
    #[default]
    Accept,

    /// Fail with [`BytecodeError::MalformedArgument`].
    Reject,
}

// ---------------------------------------------------------------------------
// GremlinLang
// ---------------------------------------------------------------------------

/// An append-only sequence of source and step instructions.
///
/// Equality and hashing are structural over the two instruction lists.
/// The [`NullArguments`] policy is construction-time configuration and
/// does not take part in either.
#[derive(Debug, Clone, Default)]
pub struct GremlinLang {
    source_instructions: Vec<Instruction>,
    step_instructions: Vec<Instruction>,
    null_arguments: NullArguments,
}

impl GremlinLang {
    /// Creates an empty instruction stream with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty instruction stream with the given null policy.
    pub fn with_null_arguments(policy: NullArguments) -> Self {
        Self {
            null_arguments: policy,
            ..Self::default()
        }
    }

    /// The null policy new instructions are checked against.
    pub fn null_arguments(&self) -> NullArguments {
        self.null_arguments
    }

    /// Appends a source instruction.
    ///
    /// # Errors
    /// Returns [`BytecodeError::MalformedArgument`] if `operator` is empty.
    pub fn add_source(
        &mut self,
        operator: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Result<&mut Self, BytecodeError> {
        self.source_instructions
            .push(Instruction::new(operator, arguments)?);
        Ok(self)
    }

    /// Appends a step instruction.
    ///
    /// # Errors
    /// Returns [`BytecodeError::MalformedArgument`] if `operator` is empty.
    pub fn add_step(
        &mut self,
        operator: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Result<&mut Self, BytecodeError> {
        self.step_instructions
            .push(Instruction::new(operator, arguments)?);
        Ok(self)
    }

    /// Appends a source instruction whose argument list may be absent.
    ///
    /// # Errors
    /// Besides the [`add_source`](Self::add_source) errors, fails when
    /// `arguments` is `None` under [`NullArguments::Reject`].
    pub fn try_add_source(
        &mut self,
        operator: impl Into<String>,
        arguments: Option<Vec<Value>>,
    ) -> Result<&mut Self, BytecodeError> {
        let operator = operator.into();
        let arguments = self.resolve_arguments(&operator, arguments)?;
        self.add_source(operator, arguments)
    }

    /// Appends a step instruction whose argument list may be absent.
    ///
    /// # Errors
    /// Besides the [`add_step`](Self::add_step) errors, fails when
    /// `arguments` is `None` under [`NullArguments::Reject`].
    pub fn try_add_step(
        &mut self,
        operator: impl Into<String>,
        arguments: Option<Vec<Value>>,
    ) -> Result<&mut Self, BytecodeError> {
        let operator = operator.into();
        let arguments = self.resolve_arguments(&operator, arguments)?;
        self.add_step(operator, arguments)
    }

    fn resolve_arguments(
        &self,
        operator: &str,
        arguments: Option<Vec<Value>>,
    ) -> Result<Vec<Value>, BytecodeError> {
        match (arguments, self.null_arguments) {
            (Some(arguments), _) => Ok(arguments),
            (None, NullArguments::Accept) => Ok(vec![Value::Null]),
            (None, NullArguments::Reject) => {
                Err(BytecodeError::MalformedArgument(format!(
                    "null argument list for '{operator}'"
                )))
            }
        }
    }

    /// Source instructions in the order they were added.
    pub fn source_instructions(&self) -> &[Instruction] {
        &self.source_instructions
    }

    /// Step instructions in the order they were added.
    pub fn step_instructions(&self) -> &[Instruction] {
        &self.step_instructions
    }

    /// Iterates source instructions, then step instructions.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.source_instructions
            .iter()
            .chain(self.step_instructions.iter())
    }

    /// `true` if no instruction of either kind was added.
    pub fn is_empty(&self) -> bool {
        self.source_instructions.is_empty() && self.step_instructions.is_empty()
    }

    /// Collects every binding in the tree, keyed by variable name.
    ///
    /// The walk visits instructions in order (sources first) and descends
    /// into nested bytecode, collections, predicates and strategy
    /// configurations, at any depth. A binding's own value is recorded as
    /// is and not descended into.
    pub fn collect_bindings(&self) -> BindingMap {
        let mut bindings = BindingMap::new();
        self.collect_into(&mut bindings);
        bindings
    }

    /// The parameters a server needs to execute this traversal. Same as
    /// [`collect_bindings`](Self::collect_bindings).
    pub fn parameters(&self) -> BindingMap {
        self.collect_bindings()
    }

    fn collect_into(&self, bindings: &mut BindingMap) {
        for instruction in self.instructions() {
            for argument in instruction.arguments() {
                collect_value(argument, bindings);
            }
        }
    }

    /// Renders the traversal as a gremlin-lang script, e.g.
    /// `g.V().out('knows')`. Bindings render as their variable names.
    pub fn to_gremlin(&self) -> String {
        self.to_string()
    }
}

fn collect_value(value: &Value, bindings: &mut BindingMap) {
    match value {
        Value::Binding(binding) => {
            bindings.insert(binding.variable(), binding.value().clone());
        }
        Value::Bytecode(nested) => nested.collect_into(bindings),
        Value::List(items) | Value::Set(items) => {
            for item in items {
                collect_value(item, bindings);
            }
        }
        Value::Map(entries) => {
            for (key, value) in entries {
                collect_value(key, bindings);
                collect_value(value, bindings);
            }
        }
        Value::Predicate(predicate) => {
            for argument in predicate.arguments() {
                collect_value(argument, bindings);
            }
        }
        Value::Strategy(strategy) => {
            for (_, value) in strategy.configuration() {
                collect_value(value, bindings);
            }
        }
        _ => {}
    }
}

impl PartialEq for GremlinLang {
    fn eq(&self, other: &Self) -> bool {
        self.source_instructions == other.source_instructions
            && self.step_instructions == other.step_instructions
    }
}

impl Eq for GremlinLang {}

impl Hash for GremlinLang {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Slice hashing prefixes the length, so moving an instruction
        // between the two lists changes the hash.
        self.source_instructions.hash(state);
        self.step_instructions.hash(state);
    }
}
