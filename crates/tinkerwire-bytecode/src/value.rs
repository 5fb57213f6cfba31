//! The value model: everything that can appear as an instruction argument
//! or as a result item.
//!
//! [`Value`] is a closed tagged union over the built-in kinds plus one
//! open case, [`Value::Custom`], which carries a provider-defined record
//! identified by name. Codecs resolve custom values through a registry
//! instead of growing this enum.
//!
//! Floating point variants compare and hash by bit pattern, so `Value` is
//! `Eq + Hash`. As a consequence `0.0 != -0.0` and a NaN equals itself.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Binding, GremlinLang};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A self-describing value.
///
/// Sequences keep their element order. `Set` is carried in encounter order
/// too: the wire format has no canonical set ordering, so neither do we.
/// `Map` keeps insertion order of its entries.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// An opaque byte buffer.
    Binary(Vec<u8>),
    /// An ordered sequence. Counts as ONE argument when used as an
    /// instruction argument.
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// A nested instruction sequence (a sub-traversal).
    Bytecode(GremlinLang),
    Binding(Binding),
    Predicate(Predicate),
    Token(Token),
    Strategy(TraversalStrategy),
    /// A provider-defined record, resolved by type name.
    Custom(CustomValue),
}

impl Value {
    /// Builds a [`Value::List`] from anything convertible to values.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a [`Value::Set`] from anything convertible to values.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Builds a [`Value::Map`] keeping the iteration order of `entries`.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// `true` for [`Value::Null`] only.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string slice if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widens any integral variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::Short(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the nested bytecode if this is a [`Value::Bytecode`].
    pub fn as_bytecode(&self) -> Option<&GremlinLang> {
        match self {
            Self::Bytecode(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the binding if this is a [`Value::Binding`].
    pub fn as_binding(&self) -> Option<&Binding> {
        match self {
            Self::Binding(b) => Some(b),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Bytecode(_) => "bytecode",
            Self::Binding(_) => "binding",
            Self::Predicate(_) => "predicate",
            Self::Token(_) => "token",
            Self::Strategy(_) => "strategy",
            Self::Custom(_) => "custom",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Bytecode(a), Self::Bytecode(b)) => a == b,
            (Self::Binding(a), Self::Binding(b)) => a == b,
            (Self::Predicate(a), Self::Predicate(b)) => a == b,
            (Self::Token(a), Self::Token(b)) => a == b,
            (Self::Strategy(a), Self::Strategy(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(v) => v.hash(state),
            Self::Byte(v) => v.hash(state),
            Self::Short(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Long(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Double(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
            Self::Binary(v) => v.hash(state),
            Self::List(v) | Self::Set(v) => v.hash(state),
            Self::Map(v) => v.hash(state),
            Self::Bytecode(v) => v.hash(state),
            Self::Binding(v) => v.hash(state),
            Self::Predicate(v) => v.hash(state),
            Self::Token(v) => v.hash(state),
            Self::Strategy(v) => v.hash(state),
            Self::Custom(v) => v.hash(state),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    Vec<Value> => List,
    GremlinLang => Bytecode,
    Binding => Binding,
    Predicate => Predicate,
    Token => Token,
    TraversalStrategy => Strategy,
    CustomValue => Custom,
}

/// `None` becomes [`Value::Null`].
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// A comparison predicate such as `gt(32)` or `within(1, 2)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    operator: String,
    arguments: Vec<Value>,
}

impl Predicate {
    /// Builds a predicate from an operator name such as `gt` and its arguments.
    pub fn new(operator: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            operator: operator.into(),
            arguments,
        }
    }

    /// `P.gt(value)`
    pub fn gt(value: impl Into<Value>) -> Self {
        Self::new("gt", vec![value.into()])
    }

    /// `P.lt(value)`
    pub fn lt(value: impl Into<Value>) -> Self {
        Self::new("lt", vec![value.into()])
    }

    /// `P.within(values...)`
    pub fn within<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::new("within", values.into_iter().map(Into::into).collect())
    }

    /// The operator name, e.g. `within`.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// The operands.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// The enumerations a traversal can reference by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Cardinality,
    Column,
    Direction,
    Merge,
    Operator,
    Order,
    Pick,
    Pop,
    Scope,
    T,
}

impl TokenKind {
    pub const ALL: [TokenKind; 10] = [
        Self::Cardinality,
        Self::Column,
        Self::Direction,
        Self::Merge,
        Self::Operator,
        Self::Order,
        Self::Pick,
        Self::Pop,
        Self::Scope,
        Self::T,
    ];

    /// The enumeration's name as it appears in scripts (`Order.desc`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Cardinality => "Cardinality",
            Self::Column => "Column",
            Self::Direction => "Direction",
            Self::Merge => "Merge",
            Self::Operator => "Operator",
            Self::Order => "Order",
            Self::Pick => "Pick",
            Self::Pop => "Pop",
            Self::Scope => "Scope",
            Self::T => "T",
        }
    }

    /// Looks a kind up by [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// One member of a [`TokenKind`] enumeration, e.g. `Order.desc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    kind: TokenKind,
    name: String,
}

impl Token {
    /// The constant `name` of enumeration `kind`.
    pub fn new(kind: TokenKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Which enumeration the token belongs to.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The constant name, e.g. `both` for `Direction.both`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// TraversalStrategy
// ---------------------------------------------------------------------------

/// A traversal strategy reference with its configuration, as carried by
/// `withStrategies` source instructions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraversalStrategy {
    class_name: String,
    configuration: Vec<(String, Value)>,
}

impl TraversalStrategy {
    /// A strategy with no configuration.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            configuration: Vec::new(),
        }
    }

    /// Adds a configuration entry. Keys keep insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.configuration.push((key.into(), value.into()));
        self
    }

    /// Fully qualified strategy class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The class name without its package prefix.
    pub fn short_name(&self) -> &str {
        self.class_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.class_name)
    }

    /// Configuration entries in insertion order.
    pub fn configuration(&self) -> &[(String, Value)] {
        &self.configuration
    }

    /// Looks up a configuration entry by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.configuration
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

// ---------------------------------------------------------------------------
// CustomValue
// ---------------------------------------------------------------------------

/// A provider-defined record: a type name plus a fixed, ordered list of
/// typed fields.
///
/// The bytecode model treats it as opaque. Codecs look the type name up
/// in a registry to learn how the fields map to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomValue {
    type_name: String,
    fields: Vec<Value>,
}

impl CustomValue {
    /// A value of the registered custom type `type_name`.
    pub fn new(type_name: impl Into<String>, fields: Vec<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// The name the type is registered under.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field values in declaration order.
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::script::write_value(f, self)
    }
}
