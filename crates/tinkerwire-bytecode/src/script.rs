//! Gremlin-lang script rendering for bytecode and values.

use std::fmt::{self, Write};

use crate::{GremlinLang, Value};

impl fmt::Display for GremlinLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_traversal(f, self, "g")
    }
}

fn write_traversal(
    f: &mut fmt::Formatter<'_>,
    traversal: &GremlinLang,
    root: &str,
) -> fmt::Result {
    f.write_str(root)?;
    for instruction in traversal.instructions() {
        write!(f, ".{}(", instruction.operator())?;
        write_separated(f, instruction.arguments())?;
        f.write_char(')')?;
    }
    Ok(())
}

fn write_separated(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_value(f, value)?;
    }
    Ok(())
}

pub(crate) fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Boolean(b) => write!(f, "{b}"),
        Value::Byte(n) => write!(f, "{n}B"),
        Value::Short(n) => write!(f, "{n}S"),
        Value::Int(n) => write!(f, "{n}"),
        Value::Long(n) => write!(f, "{n}L"),
        Value::Float(n) if n.is_finite() => write!(f, "{n:?}F"),
        Value::Float(n) => write_non_finite(f, f64::from(*n)),
        // Debug keeps the fractional part (`1.0`, not `1`).
        Value::Double(n) if n.is_finite() => write!(f, "{n:?}D"),
        Value::Double(n) => write_non_finite(f, *n),
        Value::String(s) => write_quoted(f, s),
        Value::Binary(bytes) => {
            f.write_char('[')?;
            for (i, b) in bytes.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}B", *b as i8)?;
            }
            f.write_char(']')
        }
        Value::List(items) => {
            f.write_char('[')?;
            write_separated(f, items)?;
            f.write_char(']')
        }
        Value::Set(items) => {
            f.write_char('{')?;
            write_separated(f, items)?;
            f.write_char('}')
        }
        Value::Map(entries) => {
            if entries.is_empty() {
                return f.write_str("[:]");
            }
            f.write_char('[')?;
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(f, k)?;
                f.write_str(": ")?;
                write_value(f, v)?;
            }
            f.write_char(']')
        }
        Value::Bytecode(nested) => write_traversal(f, nested, "__"),
        Value::Binding(binding) => f.write_str(binding.variable()),
        Value::Predicate(p) => {
            write!(f, "{}(", p.operator())?;
            write_separated(f, p.arguments())?;
            f.write_char(')')
        }
        Value::Token(token) => {
            write!(f, "{}.{}", token.kind().name(), token.name())
        }
        Value::Strategy(strategy) => {
            if strategy.configuration().is_empty() {
                return f.write_str(strategy.short_name());
            }
            write!(f, "new {}(", strategy.short_name())?;
            for (i, (key, value)) in strategy.configuration().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: ")?;
                write_value(f, value)?;
            }
            f.write_char(')')
        }
        Value::Custom(custom) => {
            let name = custom
                .type_name()
                .rsplit('.')
                .next()
                .unwrap_or(custom.type_name());
            write!(f, "{name}(")?;
            write_separated(f, custom.fields())?;
            f.write_char(')')
        }
    }
}

fn write_non_finite(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n > 0.0 {
        f.write_str("Infinity")
    } else {
        f.write_str("-Infinity")
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}
