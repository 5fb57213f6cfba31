//! Provider-defined types.
//!
//! A graph provider can ship value types the core codec knows nothing
//! about. They travel as [`Value::Custom`] and are turned into bytes by a
//! [`CustomTypeSerializer`] looked up by type name in a
//! [`CustomTypeRegistry`]. Adding a type means registering a serializer;
//! the codecs' own dispatch never changes.
//!
//! [`Point`] is the one such type shipped here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use tinkerwire_bytecode::{CustomValue, Value};

use crate::ProtocolError;
use crate::binary::buffer::Reader;

// ---------------------------------------------------------------------------
// CustomTypeSerializer
// ---------------------------------------------------------------------------

/// Converts one provider-defined type between [`CustomValue`] and its
/// binary payload.
///
/// The codec frames the payload with the type name and a length prefix,
/// so `write` appends only the type's own bytes and `read` receives
/// exactly those bytes.
pub trait CustomTypeSerializer: Send + Sync {
    /// The name custom values of this type carry, e.g. `tinkerwire.Point`.
    fn type_name(&self) -> &str;

    /// Appends the payload for `value` to `buf`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidCustomValue`] if `value` does not
    /// have the fields this type expects.
    fn write(&self, value: &CustomValue, buf: &mut BytesMut) -> Result<(), ProtocolError>;

    /// Rebuilds a value from its payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidCustomValue`] if the payload is
    /// malformed, including a length that does not match the type.
    fn read(&self, payload: &[u8]) -> Result<CustomValue, ProtocolError>;

    /// Checks that `value` is well formed for this type. Formats that do
    /// not go through [`write`](Self::write) call this instead.
    fn validate(&self, value: &CustomValue) -> Result<(), ProtocolError> {
        self.write(value, &mut BytesMut::new())
    }
}

// ---------------------------------------------------------------------------
// CustomTypeRegistry
// ---------------------------------------------------------------------------

/// Type name to serializer. Built once, then shared read-only behind an
/// `Arc` by every serializer instance.
#[derive(Clone, Default)]
pub struct CustomTypeRegistry {
    serializers: HashMap<String, Arc<dyn CustomTypeSerializer>>,
}

impl CustomTypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the types shipped with this crate ([`Point`]).
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(PointSerializer);
        registry
    }

    /// Registers `serializer` under its type name, replacing any previous
    /// serializer for that name.
    pub fn register<S>(&mut self, serializer: S) -> &mut Self
    where
        S: CustomTypeSerializer + 'static,
    {
        let name = serializer.type_name().to_owned();
        tracing::debug!(type_name = %name, "registered custom type serializer");
        self.serializers.insert(name, Arc::new(serializer));
        self
    }

    /// Looks up the serializer registered for `type_name`.
    pub fn get(&self, type_name: &str) -> Option<&dyn CustomTypeSerializer> {
        self.serializers.get(type_name).map(|s| s.as_ref())
    }

    /// Looks up `type_name`, failing with
    /// [`ProtocolError::UnknownCustomType`] if nothing is registered.
    pub fn require(&self, type_name: &str) -> Result<&dyn CustomTypeSerializer, ProtocolError> {
        self.get(type_name)
            .ok_or_else(|| ProtocolError::UnknownCustomType(type_name.to_owned()))
    }

    /// `true` if `type_name` is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.serializers.contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    /// `true` if no custom type is registered.
    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }
}

impl fmt::Debug for CustomTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.serializers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CustomTypeRegistry")
            .field("types", &names)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A 2-D integer point, carried as a custom value with two `Int` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const TYPE_NAME: &'static str = "tinkerwire.Point";

    /// A point at `(x, y)`.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for CustomValue {
    fn from(point: Point) -> Self {
        CustomValue::new(Point::TYPE_NAME, vec![Value::Int(point.x), Value::Int(point.y)])
    }
}

impl From<Point> for Value {
    fn from(point: Point) -> Self {
        Value::Custom(point.into())
    }
}

impl TryFrom<&CustomValue> for Point {
    type Error = ProtocolError;

    fn try_from(value: &CustomValue) -> Result<Self, Self::Error> {
        let invalid = |reason: String| ProtocolError::InvalidCustomValue {
            type_name: Point::TYPE_NAME.to_owned(),
            reason,
        };
        if value.type_name() != Point::TYPE_NAME {
            return Err(invalid(format!("type name is '{}'", value.type_name())));
        }
        match value.fields() {
            [Value::Int(x), Value::Int(y)] => Ok(Point::new(*x, *y)),
            fields => Err(invalid(format!(
                "expected two int fields, found [{}]",
                fields
                    .iter()
                    .map(Value::kind_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

impl TryFrom<&Value> for Point {
    type Error = ProtocolError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Custom(custom) => Point::try_from(custom),
            other => Err(ProtocolError::UnexpectedType {
                context: "point",
                expected: "custom",
                actual: other.kind_name().to_owned(),
            }),
        }
    }
}

/// Writes a [`Point`] as two raw big-endian `i32`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointSerializer;

impl CustomTypeSerializer for PointSerializer {
    fn type_name(&self) -> &str {
        Point::TYPE_NAME
    }

    fn write(&self, value: &CustomValue, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        let point = Point::try_from(value)?;
        buf.put_i32(point.x);
        buf.put_i32(point.y);
        Ok(())
    }

    fn read(&self, payload: &[u8]) -> Result<CustomValue, ProtocolError> {
        if payload.len() != 8 {
            return Err(ProtocolError::InvalidCustomValue {
                type_name: Point::TYPE_NAME.to_owned(),
                reason: format!("expected 8 payload bytes, found {}", payload.len()),
            });
        }
        let mut reader = Reader::new(payload);
        let x = reader.read_i32("point x")?;
        let y = reader.read_i32("point y")?;
        Ok(Point::new(x, y).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_converts_both_ways() {
        let custom = CustomValue::from(Point::new(3, -4));
        assert_eq!(custom.type_name(), "tinkerwire.Point");
        assert_eq!(custom.fields(), &[Value::Int(3), Value::Int(-4)]);
        assert_eq!(Point::try_from(&custom).unwrap(), Point::new(3, -4));
    }

    #[test]
    fn test_point_rejects_wrong_fields() {
        let custom = CustomValue::new(Point::TYPE_NAME, vec![Value::Long(1)]);
        let err = Point::try_from(&custom).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCustomValue { .. }));
        assert!(err.to_string().contains("[long]"));
    }

    #[test]
    fn test_point_serializer_payload_is_two_ints() {
        let mut buf = BytesMut::new();
        PointSerializer
            .write(&Point::new(1, 2).into(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(
            PointSerializer.read(&buf).unwrap(),
            CustomValue::from(Point::new(1, 2))
        );
    }

    #[test]
    fn test_point_serializer_rejects_length_mismatch() {
        let err = PointSerializer.read(&[0, 0, 0, 1]).unwrap_err();
        assert!(err.to_string().contains("expected 8 payload bytes"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = CustomTypeRegistry::standard();
        assert!(registry.contains(Point::TYPE_NAME));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("acme.Thing").is_none());
        assert!(matches!(
            registry.require("acme.Thing"),
            Err(ProtocolError::UnknownCustomType(name)) if name == "acme.Thing"
        ));
        assert!(CustomTypeRegistry::new().is_empty());
    }

    #[test]
    fn test_validate_defaults_to_write() {
        let bad = CustomValue::new(Point::TYPE_NAME, vec![]);
        assert!(PointSerializer.validate(&bad).is_err());
        assert!(PointSerializer.validate(&Point::new(0, 0).into()).is_ok());
    }
}
