//! GraphBinary v4 message serializer.
//!
//! # Frame layout
//!
//! ```text
//! request:  0x81 | payload (String or Bytecode) | g (String?) | language (String?)
//!                | timeout (Long?) | materializeProperties (String?) | bindings (Map)
//! response: 0x81 | result (List?) | code (Int) | message (String?)
//!                | exception (String?) | attributes (Map?)
//! ```
//!
//! Every field is a fully-qualified value (see [`value`]); `?` marks fields
//! written as a typed null when absent. Nothing may follow the last field.

pub(crate) mod buffer;
pub mod value;

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tinkerwire_bytecode::Value;

use self::buffer::Reader;
use self::value::{ValueCodec, tags, unexpected};
use crate::{
    CustomTypeRegistry, MaterializeProperties, MessageSerializer, ProtocolError,
    RequestMessage, RequestPayload, ResponseMessage, StatusCode,
};

pub use self::value::{decode_value, encode_value};

/// Leading byte of every GraphBinary v4 frame.
pub const VERSION: u8 = 0x81;

pub const MIME_TYPE: &str = "application/vnd.graphbinary-v4.0";

/// Binary [`MessageSerializer`].
#[derive(Debug, Clone)]
pub struct GraphBinarySerializer {
    registry: Arc<CustomTypeRegistry>,
}

impl GraphBinarySerializer {
    /// A serializer with the standard custom type registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(CustomTypeRegistry::standard()))
    }

    /// Creates a serializer that also handles the custom types in `registry`.
    pub fn with_registry(registry: Arc<CustomTypeRegistry>) -> Self {
        Self { registry }
    }

    /// The custom types this serializer knows.
    pub fn registry(&self) -> &CustomTypeRegistry {
        &self.registry
    }

    fn codec(&self) -> ValueCodec<'_> {
        ValueCodec::new(&self.registry)
    }
}

impl Default for GraphBinarySerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSerializer for GraphBinarySerializer {
    fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    fn serialize_request(&self, request: &RequestMessage) -> Result<Bytes, ProtocolError> {
        let codec = self.codec();
        let mut buf = BytesMut::new();
        buf.put_u8(VERSION);

        match request.payload() {
            RequestPayload::Script(script) => codec.write(&Value::from(script.as_str()), &mut buf)?,
            RequestPayload::Bytecode(bytecode) => codec.write_bytecode(bytecode, &mut buf)?,
        }
        write_optional_string(&codec, request.g(), &mut buf)?;
        write_optional_string(&codec, request.language(), &mut buf)?;
        match request.timeout_millis() {
            Some(timeout) => {
                let timeout = i64::try_from(timeout).map_err(|_| {
                    ProtocolError::InvalidMessage(format!("timeout {timeout}ms out of range"))
                })?;
                codec.write(&Value::Long(timeout), &mut buf)?;
            }
            None => codec.write_null(tags::LONG, &mut buf),
        }
        write_optional_string(
            &codec,
            request.materialize_properties().map(MaterializeProperties::as_str),
            &mut buf,
        )?;
        codec.write(&string_map(request.bindings()), &mut buf)?;

        tracing::trace!(bytes = buf.len(), bindings = request.bindings().len(), "serialized request");
        Ok(buf.freeze())
    }

    fn deserialize_request(&self, data: &[u8]) -> Result<RequestMessage, ProtocolError> {
        let codec = self.codec();
        let mut reader = Reader::new(data);
        read_version(&mut reader)?;

        let payload = match codec.read(&mut reader)? {
            Value::String(script) => RequestPayload::Script(script),
            Value::Bytecode(bytecode) => RequestPayload::Bytecode(bytecode),
            other => return Err(unexpected("request payload", "string or bytecode", &other)),
        };
        let g = read_optional_string(&codec, &mut reader, "g")?;
        let language = read_optional_string(&codec, &mut reader, "language")?;
        let timeout = match codec.read(&mut reader)? {
            Value::Null => None,
            Value::Long(timeout) => Some(u64::try_from(timeout).map_err(|_| {
                ProtocolError::InvalidMessage(format!("negative timeout {timeout}ms"))
            })?),
            other => return Err(unexpected("timeout", "long", &other)),
        };
        let materialize = read_optional_string(&codec, &mut reader, "materializeProperties")?
            .map(|name| {
                MaterializeProperties::from_name(&name).ok_or_else(|| {
                    ProtocolError::InvalidMessage(format!(
                        "unknown materializeProperties '{name}'"
                    ))
                })
            })
            .transpose()?;
        let bindings = read_string_map(&codec, &mut reader, "bindings")?.unwrap_or_default();
        reader.finish()?;

        // Explicit bindings replace whatever the builder collected from
        // bytecode, so the decoded request matches the one sent.
        let mut builder = match payload {
            RequestPayload::Script(script) => RequestMessage::build(script),
            RequestPayload::Bytecode(bytecode) => RequestMessage::build(bytecode),
        };
        if let Some(g) = g {
            builder = builder.add_g(g);
        }
        if let Some(language) = language {
            builder = builder.add_language(language);
        }
        if let Some(timeout) = timeout {
            builder = builder.add_timeout_millis(timeout);
        }
        if let Some(materialize) = materialize {
            builder = builder.add_materialize_properties(materialize);
        }
        let request = builder.replace_bindings(bindings).create();

        tracing::trace!(bytes = data.len(), "deserialized request");
        Ok(request)
    }

    fn serialize_response(&self, response: &ResponseMessage) -> Result<Bytes, ProtocolError> {
        let codec = self.codec();
        let mut buf = BytesMut::new();
        buf.put_u8(VERSION);

        match response.result() {
            Some(items) => codec.write(&Value::List(items.to_vec()), &mut buf)?,
            None => codec.write_null(tags::LIST, &mut buf),
        }
        let status = response.status();
        codec.write(&Value::Int(i32::from(status.code().as_u16())), &mut buf)?;
        write_optional_string(&codec, status.message(), &mut buf)?;
        write_optional_string(&codec, status.exception(), &mut buf)?;
        match status.attributes() {
            Some(attributes) => codec.write(&string_map(attributes), &mut buf)?,
            None => codec.write_null(tags::MAP, &mut buf),
        }

        tracing::trace!(bytes = buf.len(), code = %status.code(), "serialized response");
        Ok(buf.freeze())
    }

    fn deserialize_response(&self, data: &[u8]) -> Result<ResponseMessage, ProtocolError> {
        let codec = self.codec();
        let mut reader = Reader::new(data);
        read_version(&mut reader)?;

        let result = match codec.read(&mut reader)? {
            Value::Null => None,
            Value::List(items) => Some(items),
            other => return Err(unexpected("result", "list", &other)),
        };
        let code = match codec.read(&mut reader)? {
            Value::Int(code) => u16::try_from(code)
                .map(StatusCode)
                .map_err(|_| ProtocolError::InvalidMessage(format!("status code {code} out of range")))?,
            other => return Err(unexpected("status code", "int", &other)),
        };
        let message = read_optional_string(&codec, &mut reader, "status message")?;
        let exception = read_optional_string(&codec, &mut reader, "exception")?;
        let attributes = read_string_map(&codec, &mut reader, "status attributes")?;
        reader.finish()?;

        let mut builder = ResponseMessage::build().code(code);
        if let Some(message) = message {
            builder = builder.status_message(message);
        }
        if let Some(exception) = exception {
            builder = builder.exception(exception);
        }
        if let Some(attributes) = attributes {
            builder = builder.status_attributes(attributes);
        }
        if let Some(result) = result {
            builder = builder.result(result);
        }

        tracing::trace!(bytes = data.len(), %code, "deserialized response");
        Ok(builder.create())
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn read_version(reader: &mut Reader<'_>) -> Result<(), ProtocolError> {
    match reader.read_u8("version")? {
        VERSION => Ok(()),
        other => Err(ProtocolError::UnsupportedVersion(other)),
    }
}

fn write_optional_string(
    codec: &ValueCodec<'_>,
    value: Option<&str>,
    buf: &mut BytesMut,
) -> Result<(), ProtocolError> {
    match value {
        Some(s) => codec.write(&Value::from(s), buf),
        None => {
            codec.write_null(tags::STRING, buf);
            Ok(())
        }
    }
}

fn read_optional_string(
    codec: &ValueCodec<'_>,
    reader: &mut Reader<'_>,
    context: &'static str,
) -> Result<Option<String>, ProtocolError> {
    match codec.read(reader)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(unexpected(context, "string", &other)),
    }
}

fn string_map(map: &BTreeMap<String, Value>) -> Value {
    Value::Map(
        map.iter()
            .map(|(k, v)| (Value::from(k.as_str()), v.clone()))
            .collect(),
    )
}

fn read_string_map(
    codec: &ValueCodec<'_>,
    reader: &mut Reader<'_>,
    context: &'static str,
) -> Result<Option<BTreeMap<String, Value>>, ProtocolError> {
    match codec.read(reader)? {
        Value::Null => Ok(None),
        Value::Map(entries) => entries
            .into_iter()
            .map(|(key, value)| match key {
                Value::String(key) => Ok((key, value)),
                other => Err(unexpected(context, "string key", &other)),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Some),
        other => Err(unexpected(context, "map", &other)),
    }
}
