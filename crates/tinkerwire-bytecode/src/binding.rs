//! Named placeholders and the map they are collected into.

use crate::Value;

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// A named placeholder that stands in for an argument value.
///
/// The binding keeps BOTH halves: the variable name survives serialization
/// so the server can re-parameterize the traversal, and the value is there
/// for execution and for equality. Two bindings are equal only when both
/// fields match, and the derived hash feeds the fields in declaration order,
/// so `("3", "7")` and `("7", "3")` do not collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    variable: String,
    value: Box<Value>,
}

impl Binding {
    /// Binds `value` to the variable name `variable`.
    pub fn new(variable: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            variable: variable.into(),
            value: Box::new(value.into()),
        }
    }

    /// The variable name.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// The bound value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the binding, returning `(variable, value)`.
    pub fn into_parts(self) -> (String, Value) {
        (self.variable, *self.value)
    }
}

// ---------------------------------------------------------------------------
// BindingMap
// ---------------------------------------------------------------------------

/// Variable name to bound value, in the order variables were first seen.
///
/// Produced by [`GremlinLang::collect_bindings`](crate::GremlinLang::collect_bindings).
/// Inserting a name that is already present keeps its position and
/// replaces the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingMap {
    entries: Vec<(String, Value)>,
}

impl BindingMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a binding. A replaced name keeps its position.
    pub fn insert(&mut self, variable: impl Into<String>, value: Value) {
        let variable = variable.into();
        match self.entries.iter_mut().find(|(k, _)| *k == variable) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((variable, value)),
        }
    }

    /// Returns the value bound to `variable`, if any.
    pub fn get(&self, variable: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == variable)
            .map(|(_, v)| v)
    }

    /// `true` if `variable` is bound.
    pub fn contains_key(&self, variable: &str) -> bool {
        self.get(variable).is_some()
    }

    /// Number of distinct variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(variable, value)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for BindingMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
