//! Fully-qualified binary encoding for [`Value`].
//!
//! # Format
//!
//! Every value is written as `{type_code}{value_flag}{payload}`, where
//! `value_flag` is `0x00` for a present value and `0x01` for null (no
//! payload follows). A null with no type is `0xFE 0x01`.
//!
//! - `Int` `0x01`: i32 · `Long` `0x02`: i64 · `String` `0x03`: i32 length + UTF-8
//! - `Double` `0x07`: f64 · `Float` `0x08`: f32
//! - `List` `0x09` / `Set` `0x0B`: i32 count + values
//! - `Map` `0x0A`: i32 count + key, value pairs
//! - `Binding` `0x14`: name + value
//! - `Bytecode` `0x15`: i32 step count + steps, i32 source count + sources,
//!   each instruction being operator + i32 argc + values
//! - tokens (`0x16`..`0x20`, `0x2E`): the token name as a String value
//! - `P` `0x1E`: operator + i32 argc + values
//! - `Byte` `0x24`: i8 · `Binary` `0x25`: i32 length + bytes
//! - `Short` `0x26`: i16 · `Boolean` `0x27`: one byte
//! - `Strategy` `0x29`: class name + i32 count + key, value pairs
//! - `Custom` `0x00`: type name + i32 length + provider payload
//!
//! Names and operators inside composite payloads are bare strings (no type
//! code, no flag). Everything else nested is itself fully qualified.

use bytes::{BufMut, Bytes, BytesMut};
use tinkerwire_bytecode::{
    Binding, CustomValue, GremlinLang, Predicate, Token, TokenKind,
    TraversalStrategy, Value,
};

use super::buffer::{Reader, put_length, put_prefixed, put_string};
use crate::serializer::descend;
use crate::{CustomTypeRegistry, ProtocolError};

/// Type codes.
pub(crate) mod tags {
    pub const CUSTOM: u8 = 0x00;
    pub const INT: u8 = 0x01;
    pub const LONG: u8 = 0x02;
    pub const STRING: u8 = 0x03;
    pub const DOUBLE: u8 = 0x07;
    pub const FLOAT: u8 = 0x08;
    pub const LIST: u8 = 0x09;
    pub const MAP: u8 = 0x0A;
    pub const SET: u8 = 0x0B;
    pub const BINDING: u8 = 0x14;
    pub const BYTECODE: u8 = 0x15;
    pub const CARDINALITY: u8 = 0x16;
    pub const COLUMN: u8 = 0x17;
    pub const DIRECTION: u8 = 0x18;
    pub const OPERATOR: u8 = 0x19;
    pub const ORDER: u8 = 0x1A;
    pub const PICK: u8 = 0x1B;
    pub const POP: u8 = 0x1C;
    pub const P: u8 = 0x1E;
    pub const SCOPE: u8 = 0x1F;
    pub const T: u8 = 0x20;
    pub const BYTE: u8 = 0x24;
    pub const BINARY: u8 = 0x25;
    pub const SHORT: u8 = 0x26;
    pub const BOOLEAN: u8 = 0x27;
    pub const STRATEGY: u8 = 0x29;
    pub const MERGE: u8 = 0x2E;
    pub const UNSPECIFIED_NULL: u8 = 0xFE;
}

const FLAG_PRESENT: u8 = 0x00;
const FLAG_NULL: u8 = 0x01;

fn token_code(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Cardinality => tags::CARDINALITY,
        TokenKind::Column => tags::COLUMN,
        TokenKind::Direction => tags::DIRECTION,
        TokenKind::Merge => tags::MERGE,
        TokenKind::Operator => tags::OPERATOR,
        TokenKind::Order => tags::ORDER,
        TokenKind::Pick => tags::PICK,
        TokenKind::Pop => tags::POP,
        TokenKind::Scope => tags::SCOPE,
        TokenKind::T => tags::T,
    }
}

fn token_kind(code: u8) -> Option<TokenKind> {
    TokenKind::ALL.into_iter().find(|kind| token_code(*kind) == code)
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Encodes one value into a standalone buffer.
///
/// # Errors
/// Fails on custom values without a registered serializer, or on
/// collections longer than `i32::MAX`.
pub fn encode_value(value: &Value, registry: &CustomTypeRegistry) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::new();
    ValueCodec::new(registry).write(value, &mut buf)?;
    Ok(buf.freeze())
}

/// Decodes exactly one value from `data`.
///
/// # Errors
/// Fails on malformed input and on bytes left after the value.
pub fn decode_value(data: &[u8], registry: &CustomTypeRegistry) -> Result<Value, ProtocolError> {
    let mut reader = Reader::new(data);
    let value = ValueCodec::new(registry).read(&mut reader)?;
    reader.finish()?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// ValueCodec
// ---------------------------------------------------------------------------

/// Reads and writes fully-qualified values, dispatching custom values
/// through the registry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValueCodec<'r> {
    registry: &'r CustomTypeRegistry,
}

impl<'r> ValueCodec<'r> {
    pub(crate) fn new(registry: &'r CustomTypeRegistry) -> Self {
        Self { registry }
    }

    // -- writing ------------------------------------------------------------

    pub(crate) fn write(&self, value: &Value, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        self.write_at(value, 0, buf)
    }

    /// `depth` counts the composites enclosing `value`.
    fn write_at(&self, value: &Value, depth: usize, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        match value {
            Value::Null => {
                buf.put_u8(tags::UNSPECIFIED_NULL);
                buf.put_u8(FLAG_NULL);
            }
            Value::Boolean(b) => {
                present(buf, tags::BOOLEAN);
                buf.put_u8(u8::from(*b));
            }
            Value::Byte(n) => {
                present(buf, tags::BYTE);
                buf.put_i8(*n);
            }
            Value::Short(n) => {
                present(buf, tags::SHORT);
                buf.put_i16(*n);
            }
            Value::Int(n) => {
                present(buf, tags::INT);
                buf.put_i32(*n);
            }
            Value::Long(n) => {
                present(buf, tags::LONG);
                buf.put_i64(*n);
            }
            Value::Float(n) => {
                present(buf, tags::FLOAT);
                buf.put_f32(*n);
            }
            Value::Double(n) => {
                present(buf, tags::DOUBLE);
                buf.put_f64(*n);
            }
            Value::String(s) => {
                present(buf, tags::STRING);
                put_string(buf, "string", s)?;
            }
            Value::Binary(bytes) => {
                present(buf, tags::BINARY);
                put_prefixed(buf, "binary", bytes)?;
            }
            Value::List(items) => {
                present(buf, tags::LIST);
                self.write_values(items, "list", descend(depth, "list")?, buf)?;
            }
            Value::Set(items) => {
                present(buf, tags::SET);
                self.write_values(items, "set", descend(depth, "set")?, buf)?;
            }
            Value::Map(entries) => {
                let inner = descend(depth, "map")?;
                present(buf, tags::MAP);
                put_length(buf, "map", entries.len())?;
                for (key, value) in entries {
                    self.write_at(key, inner, buf)?;
                    self.write_at(value, inner, buf)?;
                }
            }
            Value::Bytecode(bytecode) => self.write_bytecode_at(bytecode, depth, buf)?,
            Value::Binding(binding) => {
                present(buf, tags::BINDING);
                put_string(buf, "binding name", binding.variable())?;
                self.write_at(binding.value(), descend(depth, "binding")?, buf)?;
            }
            Value::Predicate(predicate) => {
                present(buf, tags::P);
                put_string(buf, "predicate operator", predicate.operator())?;
                let inner = descend(depth, "predicate")?;
                self.write_values(predicate.arguments(), "predicate arguments", inner, buf)?;
            }
            Value::Token(token) => {
                present(buf, token_code(token.kind()));
                self.write(&Value::from(token.name()), buf)?;
            }
            Value::Strategy(strategy) => {
                let inner = descend(depth, "strategy")?;
                present(buf, tags::STRATEGY);
                put_string(buf, "strategy class", strategy.class_name())?;
                put_length(buf, "strategy configuration", strategy.configuration().len())?;
                for (key, value) in strategy.configuration() {
                    put_string(buf, "strategy key", key)?;
                    self.write_at(value, inner, buf)?;
                }
            }
            Value::Custom(custom) => {
                descend(depth, "custom value")?;
                self.write_custom(custom, buf)?;
            }
        }
        Ok(())
    }

    /// Writes a typed null: the code of the kind the reader expects, with
    /// the null flag.
    pub(crate) fn write_null(&self, code: u8, buf: &mut BytesMut) {
        buf.put_u8(code);
        buf.put_u8(FLAG_NULL);
    }

    fn write_values(
        &self,
        values: &[Value],
        context: &'static str,
        depth: usize,
        buf: &mut BytesMut,
    ) -> Result<(), ProtocolError> {
        put_length(buf, context, values.len())?;
        for value in values {
            self.write_at(value, depth, buf)?;
        }
        Ok(())
    }

    /// Writes a fully-qualified bytecode value.
    pub(crate) fn write_bytecode(
        &self,
        bytecode: &GremlinLang,
        buf: &mut BytesMut,
    ) -> Result<(), ProtocolError> {
        self.write_bytecode_at(bytecode, 0, buf)
    }

    fn write_bytecode_at(
        &self,
        bytecode: &GremlinLang,
        depth: usize,
        buf: &mut BytesMut,
    ) -> Result<(), ProtocolError> {
        let inner = descend(depth, "bytecode")?;
        present(buf, tags::BYTECODE);
        for (instructions, context) in [
            (bytecode.step_instructions(), "bytecode steps"),
            (bytecode.source_instructions(), "bytecode sources"),
        ] {
            put_length(buf, context, instructions.len())?;
            for instruction in instructions {
                put_string(buf, "operator", instruction.operator())?;
                self.write_values(instruction.arguments(), "instruction arguments", inner, buf)?;
            }
        }
        Ok(())
    }

    fn write_custom(&self, custom: &CustomValue, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        let serializer = self.registry.require(custom.type_name())?;
        present(buf, tags::CUSTOM);
        put_string(buf, "custom type name", custom.type_name())?;

        // Length prefix first, patched once the provider bytes are known.
        let length_at = buf.len();
        buf.put_i32(0);
        serializer.write(custom, buf)?;
        let written = buf.len() - length_at - 4;
        let length = i32::try_from(written).map_err(|_| ProtocolError::InvalidCustomValue {
            type_name: custom.type_name().to_owned(),
            reason: format!("payload too long: {written}"),
        })?;
        buf[length_at..length_at + 4].copy_from_slice(&length.to_be_bytes());
        Ok(())
    }

    // -- reading ------------------------------------------------------------

    pub(crate) fn read(&self, reader: &mut Reader<'_>) -> Result<Value, ProtocolError> {
        self.read_at(reader, 0)
    }

    fn read_at(&self, reader: &mut Reader<'_>, depth: usize) -> Result<Value, ProtocolError> {
        let code = reader.read_u8("type code")?;
        if code != tags::UNSPECIFIED_NULL && code != tags::CUSTOM && !is_known(code) {
            return Err(ProtocolError::UnknownTypeCode(code));
        }
        match reader.read_u8("value flag")? {
            FLAG_NULL => return Ok(Value::Null),
            FLAG_PRESENT => {}
            flag => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "invalid value flag 0x{flag:02x} for type code 0x{code:02x}"
                )));
            }
        }

        let value = match code {
            tags::UNSPECIFIED_NULL => {
                return Err(ProtocolError::InvalidMessage(
                    "unspecified null must carry the null flag".into(),
                ));
            }
            tags::BOOLEAN => Value::Boolean(reader.read_u8("boolean")? != 0),
            tags::BYTE => Value::Byte(reader.read_i8("byte")?),
            tags::SHORT => Value::Short(reader.read_i16("short")?),
            tags::INT => Value::Int(reader.read_i32("int")?),
            tags::LONG => Value::Long(reader.read_i64("long")?),
            tags::FLOAT => Value::Float(reader.read_f32("float")?),
            tags::DOUBLE => Value::Double(reader.read_f64("double")?),
            tags::STRING => Value::String(reader.read_string("string")?),
            tags::BINARY => Value::Binary(reader.read_prefixed("binary")?.to_vec()),
            tags::LIST => Value::List(self.read_values(reader, "list", descend(depth, "list")?)?),
            tags::SET => Value::Set(self.read_values(reader, "set", descend(depth, "set")?)?),
            tags::MAP => {
                let inner = descend(depth, "map")?;
                let count = reader.read_length("map")?;
                let mut entries = Vec::with_capacity(count.min(reader.remaining()));
                for _ in 0..count {
                    let key = self.read_at(reader, inner)?;
                    let value = self.read_at(reader, inner)?;
                    entries.push((key, value));
                }
                Value::Map(entries)
            }
            tags::BYTECODE => Value::Bytecode(self.read_bytecode(reader, descend(depth, "bytecode")?)?),
            tags::BINDING => {
                let name = reader.read_string("binding name")?;
                let bound = self.read_at(reader, descend(depth, "binding")?)?;
                Value::Binding(Binding::new(name, bound))
            }
            tags::P => {
                let operator = reader.read_string("predicate operator")?;
                let inner = descend(depth, "predicate")?;
                let arguments = self.read_values(reader, "predicate arguments", inner)?;
                Value::Predicate(Predicate::new(operator, arguments))
            }
            tags::STRATEGY => {
                let inner = descend(depth, "strategy")?;
                let mut strategy = TraversalStrategy::new(reader.read_string("strategy class")?);
                let count = reader.read_length("strategy configuration")?;
                for _ in 0..count {
                    let key = reader.read_string("strategy key")?;
                    strategy = strategy.with(key, self.read_at(reader, inner)?);
                }
                Value::Strategy(strategy)
            }
            tags::CUSTOM => {
                descend(depth, "custom value")?;
                Value::Custom(self.read_custom(reader)?)
            }
            code => match token_kind(code) {
                Some(kind) => {
                    // Same depth: a token name that turns out to be a
                    // composite still counts against the limit.
                    let name = self.read_string_value(reader, depth, "token name")?;
                    Value::Token(Token::new(kind, name))
                }
                None => return Err(ProtocolError::UnknownTypeCode(code)),
            },
        };
        Ok(value)
    }

    fn read_values(
        &self,
        reader: &mut Reader<'_>,
        context: &'static str,
        depth: usize,
    ) -> Result<Vec<Value>, ProtocolError> {
        let count = reader.read_length(context)?;
        // Every value takes at least two bytes; don't trust the count for
        // the allocation.
        let mut values = Vec::with_capacity(count.min(reader.remaining() / 2));
        for _ in 0..count {
            values.push(self.read_at(reader, depth)?);
        }
        Ok(values)
    }

    /// `depth` is the depth of the instruction arguments.
    fn read_bytecode(&self, reader: &mut Reader<'_>, depth: usize) -> Result<GremlinLang, ProtocolError> {
        let steps = self.read_instructions(reader, "bytecode steps", depth)?;
        let sources = self.read_instructions(reader, "bytecode sources", depth)?;
        let mut bytecode = GremlinLang::new();
        for (operator, arguments) in sources {
            bytecode.add_source(operator, arguments)?;
        }
        for (operator, arguments) in steps {
            bytecode.add_step(operator, arguments)?;
        }
        Ok(bytecode)
    }

    fn read_instructions(
        &self,
        reader: &mut Reader<'_>,
        context: &'static str,
        depth: usize,
    ) -> Result<Vec<(String, Vec<Value>)>, ProtocolError> {
        let count = reader.read_length(context)?;
        let mut instructions = Vec::with_capacity(count.min(reader.remaining() / 8));
        for _ in 0..count {
            let operator = reader.read_string("operator")?;
            let arguments = self.read_values(reader, "instruction arguments", depth)?;
            instructions.push((operator, arguments));
        }
        Ok(instructions)
    }

    fn read_custom(&self, reader: &mut Reader<'_>) -> Result<CustomValue, ProtocolError> {
        let type_name = reader.read_string("custom type name")?;
        let serializer = self.registry.require(&type_name)?;
        let payload = reader.read_prefixed("custom payload")?;
        let value = serializer.read(payload)?;
        if value.type_name() != type_name {
            return Err(ProtocolError::InvalidCustomValue {
                type_name,
                reason: format!("serializer produced '{}'", value.type_name()),
            });
        }
        Ok(value)
    }

    /// Reads a value that must be a non-null String.
    fn read_string_value(
        &self,
        reader: &mut Reader<'_>,
        depth: usize,
        context: &'static str,
    ) -> Result<String, ProtocolError> {
        match self.read_at(reader, depth)? {
            Value::String(s) => Ok(s),
            other => Err(unexpected(context, "string", &other)),
        }
    }
}

fn present(buf: &mut BytesMut, code: u8) {
    buf.put_u8(code);
    buf.put_u8(FLAG_PRESENT);
}

fn is_known(code: u8) -> bool {
    matches!(
        code,
        tags::INT
            | tags::LONG
            | tags::STRING
            | tags::DOUBLE
            | tags::FLOAT
            | tags::LIST
            | tags::MAP
            | tags::SET
            | tags::BINDING
            | tags::BYTECODE
            | tags::P
            | tags::BYTE
            | tags::BINARY
            | tags::SHORT
            | tags::BOOLEAN
            | tags::STRATEGY
    ) || token_kind(code).is_some()
}

pub(crate) fn unexpected(context: &'static str, expected: &'static str, actual: &Value) -> ProtocolError {
    ProtocolError::UnexpectedType {
        context,
        expected,
        actual: actual.kind_name().to_owned(),
    }
}
