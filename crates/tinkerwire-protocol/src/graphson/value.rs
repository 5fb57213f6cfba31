//! Typed JSON mapping for [`Value`].
//!
//! Strings, booleans and null map to their JSON counterparts. Everything
//! else is wrapped as `{"@type": "...", "@value": ...}` so numeric widths
//! and collection kinds survive the trip:
//!
//! | Value | `@type` | `@value` |
//! |---|---|---|
//! | Int / Long | `g:Int32` / `g:Int64` | number |
//! | Short / Byte | `gx:Int16` / `gx:Byte` | number |
//! | Float / Double | `g:Float` / `g:Double` | number, or `"NaN"`, `"Infinity"`, `"-Infinity"` |
//! | Binary | `gx:ByteBuffer` | array of byte numbers |
//! | List / Set | `g:List` / `g:Set` | array |
//! | Map | `g:Map` | flat array `[k1, v1, k2, v2, ...]` |
//! | Bytecode | `g:Bytecode` | `{"step": [[op, args...]], "source": [...]}` |
//! | Binding | `g:Binding` | `{"key": name, "value": v}` |
//! | Predicate | `g:P` | `{"predicate": op, "value": [args...]}` |
//! | Token | `g:<Kind>` | name |
//! | Strategy | `g:TraversalStrategy` | `{"className": c, "configuration": [k1, v1, ...]}` |
//! | Custom | registered type name | array of fields |

use serde_json::{Map, Number, Value as Json, json};
use tinkerwire_bytecode::{
    Binding, CustomValue, GremlinLang, Predicate, Token, TokenKind, TraversalStrategy, Value,
};

use crate::serializer::descend;
use crate::{CustomTypeRegistry, ProtocolError};

const TYPE_KEY: &str = "@type";
const VALUE_KEY: &str = "@value";

mod types {
    pub const INT32: &str = "g:Int32";
    pub const INT64: &str = "g:Int64";
    pub const INT16: &str = "gx:Int16";
    pub const BYTE: &str = "gx:Byte";
    pub const FLOAT: &str = "g:Float";
    pub const DOUBLE: &str = "g:Double";
    pub const BYTE_BUFFER: &str = "gx:ByteBuffer";
    pub const LIST: &str = "g:List";
    pub const SET: &str = "g:Set";
    pub const MAP: &str = "g:Map";
    pub const BYTECODE: &str = "g:Bytecode";
    pub const BINDING: &str = "g:Binding";
    pub const P: &str = "g:P";
    pub const STRATEGY: &str = "g:TraversalStrategy";
}

fn typed(type_name: &str, value: Json) -> Json {
    let mut object = Map::with_capacity(2);
    object.insert(TYPE_KEY.to_owned(), Json::String(type_name.to_owned()));
    object.insert(VALUE_KEY.to_owned(), value);
    Json::Object(object)
}

fn token_type(kind: TokenKind) -> String {
    format!("g:{}", kind.name())
}

fn invalid(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidMessage(reason.into())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Converts a value to typed JSON.
///
/// # Errors
/// Fails on custom values whose type is not registered or whose fields
/// the registered serializer rejects, and on values nested deeper than
/// [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH).
pub fn to_json(value: &Value, registry: &CustomTypeRegistry) -> Result<Json, ProtocolError> {
    to_json_at(value, registry, 0)
}

/// `depth` counts the composites enclosing `value`.
pub(crate) fn to_json_at(
    value: &Value,
    registry: &CustomTypeRegistry,
    depth: usize,
) -> Result<Json, ProtocolError> {
    let json = match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::String(s) => Json::String(s.clone()),
        Value::Byte(n) => typed(types::BYTE, json!(n)),
        Value::Short(n) => typed(types::INT16, json!(n)),
        Value::Int(n) => typed(types::INT32, json!(n)),
        Value::Long(n) => typed(types::INT64, json!(n)),
        Value::Float(n) => typed(types::FLOAT, float_to_json(f64::from(*n))),
        Value::Double(n) => typed(types::DOUBLE, float_to_json(*n)),
        Value::Binary(bytes) => typed(types::BYTE_BUFFER, json!(bytes)),
        Value::List(items) => typed(
            types::LIST,
            values_to_json(items, registry, descend(depth, "list")?)?,
        ),
        Value::Set(items) => typed(
            types::SET,
            values_to_json(items, registry, descend(depth, "set")?)?,
        ),
        Value::Map(entries) => {
            let inner = descend(depth, "map")?;
            let mut flat = Vec::with_capacity(entries.len() * 2);
            for (key, value) in entries {
                flat.push(to_json_at(key, registry, inner)?);
                flat.push(to_json_at(value, registry, inner)?);
            }
            typed(types::MAP, Json::Array(flat))
        }
        Value::Bytecode(bytecode) => bytecode_to_json(bytecode, registry, depth)?,
        Value::Binding(binding) => typed(
            types::BINDING,
            json!({
                "key": binding.variable(),
                "value": to_json_at(binding.value(), registry, descend(depth, "binding")?)?,
            }),
        ),
        Value::Predicate(predicate) => typed(
            types::P,
            json!({
                "predicate": predicate.operator(),
                "value": values_to_json(
                    predicate.arguments(),
                    registry,
                    descend(depth, "predicate")?,
                )?,
            }),
        ),
        Value::Token(token) => typed(&token_type(token.kind()), json!(token.name())),
        Value::Strategy(strategy) => {
            let inner = descend(depth, "strategy")?;
            let mut configuration = Vec::with_capacity(strategy.configuration().len() * 2);
            for (key, value) in strategy.configuration() {
                configuration.push(Json::String(key.clone()));
                configuration.push(to_json_at(value, registry, inner)?);
            }
            typed(
                types::STRATEGY,
                json!({
                    "className": strategy.class_name(),
                    "configuration": configuration,
                }),
            )
        }
        Value::Custom(custom) => {
            registry.require(custom.type_name())?.validate(custom)?;
            let inner = descend(depth, "custom value")?;
            typed(custom.type_name(), values_to_json(custom.fields(), registry, inner)?)
        }
    };
    Ok(json)
}

/// Writes a bytecode value found at `depth`. Empty instruction lists are
/// omitted.
pub(crate) fn bytecode_to_json(
    bytecode: &GremlinLang,
    registry: &CustomTypeRegistry,
    depth: usize,
) -> Result<Json, ProtocolError> {
    let inner = descend(depth, "bytecode")?;
    let mut object = Map::new();
    for (key, instructions) in [
        ("step", bytecode.step_instructions()),
        ("source", bytecode.source_instructions()),
    ] {
        if instructions.is_empty() {
            continue;
        }
        let mut list = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            let mut entry = Vec::with_capacity(instruction.arguments().len() + 1);
            entry.push(Json::String(instruction.operator().to_owned()));
            for argument in instruction.arguments() {
                entry.push(to_json_at(argument, registry, inner)?);
            }
            list.push(Json::Array(entry));
        }
        object.insert(key.to_owned(), Json::Array(list));
    }
    Ok(typed(types::BYTECODE, Json::Object(object)))
}

fn values_to_json(
    values: &[Value],
    registry: &CustomTypeRegistry,
    depth: usize,
) -> Result<Json, ProtocolError> {
    values
        .iter()
        .map(|value| to_json_at(value, registry, depth))
        .collect::<Result<Vec<_>, _>>()
        .map(Json::Array)
}

fn float_to_json(n: f64) -> Json {
    if n.is_nan() {
        json!("NaN")
    } else if n == f64::INFINITY {
        json!("Infinity")
    } else if n == f64::NEG_INFINITY {
        json!("-Infinity")
    } else {
        // Finite, so `from_f64` cannot fail.
        Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Converts typed JSON back to a value.
///
/// Untyped JSON numbers become `Int` when they fit, otherwise `Long` or
/// `Double`; untyped arrays become lists and untyped objects become maps
/// with string keys.
///
/// # Errors
/// Fails on unknown `@type`s that are not registered custom types, on
/// `@value`s of the wrong shape and on values nested deeper than
/// [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH).
pub fn from_json(json: &Json, registry: &CustomTypeRegistry) -> Result<Value, ProtocolError> {
    from_json_at(json, registry, 0)
}

pub(crate) fn from_json_at(
    json: &Json,
    registry: &CustomTypeRegistry,
    depth: usize,
) -> Result<Value, ProtocolError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => Ok(untyped_number(n)),
        Json::Array(items) => Ok(Value::List(values_from_json(
            items,
            registry,
            descend(depth, "list")?,
        )?)),
        Json::Object(object) => match (object.get(TYPE_KEY), object.get(VALUE_KEY)) {
            (Some(Json::String(type_name)), Some(value)) if object.len() == 2 => {
                typed_from_json(type_name, value, registry, depth)
            }
            _ => {
                let inner = descend(depth, "map")?;
                object
                    .iter()
                    .map(|(k, v)| -> Result<(Value, Value), ProtocolError> {
                        Ok((Value::String(k.clone()), from_json_at(v, registry, inner)?))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Map)
            }
        },
    }
}

fn typed_from_json(
    type_name: &str,
    value: &Json,
    registry: &CustomTypeRegistry,
    depth: usize,
) -> Result<Value, ProtocolError> {
    let value = match type_name {
        types::INT32 => Value::Int(integer(value, type_name)?),
        types::INT64 => Value::Long(integer(value, type_name)?),
        types::INT16 => Value::Short(integer(value, type_name)?),
        types::BYTE => Value::Byte(integer(value, type_name)?),
        // Narrowing is exact: the number was written from an f32.
        types::FLOAT => Value::Float(float_from_json(value, type_name)? as f32),
        types::DOUBLE => Value::Double(float_from_json(value, type_name)?),
        types::BYTE_BUFFER => Value::Binary(
            array(value, type_name)?
                .iter()
                .map(|b| integer::<u8>(b, type_name))
                .collect::<Result<_, _>>()?,
        ),
        types::LIST => {
            let inner = descend(depth, "list")?;
            Value::List(values_from_json(array(value, type_name)?, registry, inner)?)
        }
        types::SET => {
            let inner = descend(depth, "set")?;
            Value::Set(values_from_json(array(value, type_name)?, registry, inner)?)
        }
        types::MAP => {
            let inner = descend(depth, "map")?;
            Value::Map(pairs_from_json(array(value, type_name)?, registry, inner)?)
        }
        types::BYTECODE => Value::Bytecode(bytecode_from_json(value, registry, depth)?),
        types::BINDING => {
            let object = object(value, type_name)?;
            let key = string_field(object, "key", type_name)?;
            let bound = object.get("value").unwrap_or(&Json::Null);
            let bound = from_json_at(bound, registry, descend(depth, "binding")?)?;
            Value::Binding(Binding::new(key, bound))
        }
        types::P => {
            let object = object(value, type_name)?;
            let operator = string_field(object, "predicate", type_name)?;
            let arguments = match object.get("value") {
                Some(Json::Array(items)) => {
                    values_from_json(items, registry, descend(depth, "predicate")?)?
                }
                _ => return Err(invalid("g:P value must be an array")),
            };
            Value::Predicate(Predicate::new(operator, arguments))
        }
        types::STRATEGY => {
            let inner = descend(depth, "strategy")?;
            let object = object(value, type_name)?;
            let mut strategy = TraversalStrategy::new(string_field(object, "className", type_name)?);
            let configuration: &[Json] = match object.get("configuration") {
                Some(Json::Array(items)) => items.as_slice(),
                None => &[],
                Some(_) => return Err(invalid("strategy configuration must be an array")),
            };
            for (key, value) in pairs_from_json(configuration, registry, inner)? {
                match key {
                    Value::String(key) => strategy = strategy.with(key, value),
                    other => {
                        return Err(invalid(format!(
                            "strategy configuration key must be a string, found {}",
                            other.kind_name()
                        )));
                    }
                }
            }
            Value::Strategy(strategy)
        }
        other => {
            if let Some(kind) = other.strip_prefix("g:").and_then(TokenKind::from_name) {
                let name = value
                    .as_str()
                    .ok_or_else(|| invalid(format!("{other} value must be a string")))?;
                return Ok(Value::Token(Token::new(kind, name)));
            }
            let serializer = registry.require(other)?;
            let inner = descend(depth, "custom value")?;
            let fields = values_from_json(array(value, other)?, registry, inner)?;
            let custom = CustomValue::new(other, fields);
            serializer.validate(&custom)?;
            Value::Custom(custom)
        }
    };
    Ok(value)
}

/// Reads the `@value` object of a bytecode value found at `depth`.
pub(crate) fn bytecode_from_json(
    value: &Json,
    registry: &CustomTypeRegistry,
    depth: usize,
) -> Result<GremlinLang, ProtocolError> {
    let inner = descend(depth, "bytecode")?;
    let object = object(value, types::BYTECODE)?;
    let mut bytecode = GremlinLang::new();
    for key in ["source", "step"] {
        let instructions: &[Json] = match object.get(key) {
            Some(Json::Array(items)) => items.as_slice(),
            None => &[],
            Some(_) => return Err(invalid(format!("bytecode {key} must be an array"))),
        };
        for instruction in instructions {
            let Some((Json::String(operator), arguments)) =
                instruction.as_array().and_then(|parts| parts.split_first())
            else {
                return Err(invalid(format!(
                    "bytecode {key} instruction must be [operator, args...]"
                )));
            };
            let arguments = values_from_json(arguments, registry, inner)?;
            if key == "source" {
                bytecode.add_source(operator.as_str(), arguments)?;
            } else {
                bytecode.add_step(operator.as_str(), arguments)?;
            }
        }
    }
    Ok(bytecode)
}

fn values_from_json(
    items: &[Json],
    registry: &CustomTypeRegistry,
    depth: usize,
) -> Result<Vec<Value>, ProtocolError> {
    items.iter().map(|item| from_json_at(item, registry, depth)).collect()
}

fn pairs_from_json(
    items: &[Json],
    registry: &CustomTypeRegistry,
    depth: usize,
) -> Result<Vec<(Value, Value)>, ProtocolError> {
    if items.len() % 2 != 0 {
        return Err(invalid("key/value array has odd length"));
    }
    items
        .chunks_exact(2)
        .map(|pair| -> Result<(Value, Value), ProtocolError> {
            Ok((
                from_json_at(&pair[0], registry, depth)?,
                from_json_at(&pair[1], registry, depth)?,
            ))
        })
        .collect()
}

fn untyped_number(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        return i32::try_from(i).map_or(Value::Long(i), Value::Int);
    }
    Value::Double(n.as_f64().unwrap_or(f64::NAN))
}

fn integer<T: TryFrom<i64>>(value: &Json, type_name: &str) -> Result<T, ProtocolError> {
    value
        .as_i64()
        .and_then(|i| T::try_from(i).ok())
        .ok_or_else(|| invalid(format!("{type_name} value out of range: {value}")))
}

fn float_from_json(value: &Json, type_name: &str) -> Result<f64, ProtocolError> {
    match value {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{type_name} value is not a number"))),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => Err(invalid(format!("{type_name} value '{s}' is not a number"))),
        },
        _ => Err(invalid(format!("{type_name} value is not a number"))),
    }
}

fn array<'a>(value: &'a Json, type_name: &str) -> Result<&'a [Json], ProtocolError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| invalid(format!("{type_name} value must be an array")))
}

fn object<'a>(value: &'a Json, type_name: &str) -> Result<&'a Map<String, Json>, ProtocolError> {
    value
        .as_object()
        .ok_or_else(|| invalid(format!("{type_name} value must be an object")))
}

fn string_field(object: &Map<String, Json>, key: &str, type_name: &str) -> Result<String, ProtocolError> {
    object
        .get(key)
        .and_then(Json::as_str)
        .map(str::to_owned)
        .ok_or_else(|| invalid(format!("{type_name} is missing string field '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn registry() -> CustomTypeRegistry {
        CustomTypeRegistry::standard()
    }

    fn round_trip(value: &Value) -> Value {
        let registry = registry();
        from_json(&to_json(value, &registry).unwrap(), &registry).unwrap()
    }

    #[test]
    fn test_int_shape() {
        assert_eq!(
            to_json(&Value::Int(5), &registry()).unwrap(),
            json!({"@type": "g:Int32", "@value": 5})
        );
    }

    #[test]
    fn test_plain_json_scalars() {
        assert_eq!(to_json(&Value::Null, &registry()).unwrap(), Json::Null);
        assert_eq!(to_json(&Value::from("x"), &registry()).unwrap(), json!("x"));
        assert_eq!(to_json(&Value::Boolean(true), &registry()).unwrap(), json!(true));
    }

    #[test]
    fn test_non_finite_doubles_are_strings() {
        assert_eq!(
            to_json(&Value::Double(f64::INFINITY), &registry()).unwrap(),
            json!({"@type": "g:Double", "@value": "Infinity"})
        );
        let Value::Double(n) = round_trip(&Value::Double(f64::NAN)) else {
            panic!("expected a double");
        };
        assert!(n.is_nan());
    }

    #[test]
    fn test_numeric_widths_survive() {
        for value in [
            Value::Byte(-1),
            Value::Short(7),
            Value::Int(7),
            Value::Long(7),
            Value::Float(0.1),
            Value::Double(123.3),
            Value::Binary(vec![1, 2, 255]),
        ] {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn test_map_keeps_non_string_keys_and_order() {
        let value = Value::map([(Value::Int(2), "b"), (Value::Int(1), "a")]);
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn test_bytecode_shape_and_round_trip() {
        let mut g = GremlinLang::new();
        g.add_step("V", vec![]).unwrap();
        g.add_step("has", vec!["age".into(), Predicate::gt(32).into()]).unwrap();
        assert_eq!(
            to_json(&Value::Bytecode(g.clone()), &registry()).unwrap(),
            json!({"@type": "g:Bytecode", "@value": {"step": [
                ["V"],
                ["has", "age", {"@type": "g:P", "@value": {
                    "predicate": "gt",
                    "value": [{"@type": "g:Int32", "@value": 32}],
                }}],
            ]}})
        );
        assert_eq!(round_trip(&Value::Bytecode(g.clone())), Value::Bytecode(g));
    }

    #[test]
    fn test_tokens_bindings_and_strategies_round_trip() {
        for value in [
            Value::from(Token::new(TokenKind::T, "id")),
            Value::from(Binding::new("x", Value::list([1, 2]))),
            Value::from(TraversalStrategy::new("SeedStrategy").with("seed", 999i64)),
            Value::from(Point::new(1, 2)),
        ] {
            assert_eq!(round_trip(&value), value);
        }
    }

    #[test]
    fn test_unknown_type_is_unknown_custom_type() {
        let json = json!({"@type": "acme:Widget", "@value": []});
        let err = from_json(&json, &registry()).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCustomType(ref t) if t == "acme:Widget"));
    }

    #[test]
    fn test_custom_fields_are_validated() {
        let json = json!({"@type": "tinkerwire.Point", "@value": ["x"]});
        let err = from_json(&json, &registry()).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCustomValue { .. }));
    }

    #[test]
    fn test_int32_out_of_range() {
        let json = json!({"@type": "g:Int32", "@value": 5_000_000_000i64});
        assert!(from_json(&json, &registry()).is_err());
    }

    #[test]
    fn test_untyped_json() {
        assert_eq!(from_json(&json!(5), &registry()).unwrap(), Value::Int(5));
        assert_eq!(from_json(&json!(1.5), &registry()).unwrap(), Value::Double(1.5));
        assert_eq!(
            from_json(&json!([1, "a"]), &registry()).unwrap(),
            Value::list([Value::Int(1), Value::from("a")])
        );
        assert_eq!(
            from_json(&json!({"k": true}), &registry()).unwrap(),
            Value::map([("k", true)])
        );
    }

    // =====================================================================
    // Nesting depth
    // =====================================================================

    fn nested_lists(levels: usize) -> Value {
        (0..levels).fold(Value::Int(1), |inner, _| Value::List(vec![inner]))
    }

    #[test]
    fn test_nesting_at_the_limit_round_trips() {
        let value = nested_lists(crate::MAX_NESTING_DEPTH);
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn test_nesting_past_the_limit_fails_to_encode() {
        let err = to_json(&nested_lists(crate::MAX_NESTING_DEPTH + 1), &registry()).unwrap_err();
        assert!(matches!(err, ProtocolError::NestingTooDeep { context: "list", .. }));
    }

    #[test]
    fn test_deep_untyped_arrays_are_rejected() {
        let json = (0..200).fold(json!(1), |inner, _| Json::Array(vec![inner]));
        let err = from_json(&json, &registry()).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::NestingTooDeep { limit: crate::MAX_NESTING_DEPTH, .. }
        ));
    }

    #[test]
    fn test_custom_values_count_as_a_level() {
        let value = (0..crate::MAX_NESTING_DEPTH)
            .fold(Value::from(Point::new(1, 2)), |inner, _| Value::List(vec![inner]));
        let err = to_json(&value, &registry()).unwrap_err();
        assert!(matches!(err, ProtocolError::NestingTooDeep { context: "custom value", .. }));
    }
}
