//! GraphSON v4 message serializer: one typed-JSON object per message.
//!
//! ```json
//! {"gremlin": "g.V()", "g": "g1", "language": "gremlin-lang", "timeoutMs": 500,
//!  "materializeProperties": "tokens", "bindings": {"k": "v"}}
//!
//! {"result": {"@type": "g:List", "@value": [...]},
//!  "status": {"code": 200, "message": "OK"}}
//! ```
//!
//! Absent optional fields are left out of the object entirely. A bytecode
//! request carries a `g:Bytecode` value under `gremlin` instead of a string.

pub mod value;

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tinkerwire_bytecode::Value;

use self::value::{bytecode_from_json, bytecode_to_json, from_json, from_json_at, to_json, to_json_at};
use crate::serializer::descend;
use crate::{
    CustomTypeRegistry, MaterializeProperties, MessageSerializer, ProtocolError,
    RequestMessage, RequestPayload, ResponseMessage, StatusCode,
};

pub const MIME_TYPE: &str = "application/vnd.gremlin-v4.0+json";

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RequestEnvelope {
    gremlin: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    g: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    materialize_properties: Option<MaterializeProperties>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    bindings: Map<String, Json>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Json>,
    status: StatusEnvelope,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatusEnvelope {
    code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exception: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<Map<String, Json>>,
}

// ---------------------------------------------------------------------------
// GraphSonSerializer
// ---------------------------------------------------------------------------

/// Typed-JSON [`MessageSerializer`].
#[derive(Debug, Clone)]
pub struct GraphSonSerializer {
    registry: Arc<CustomTypeRegistry>,
}

impl GraphSonSerializer {
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

    // Binding and attribute maps are the first nesting level, as they are
    // in the binary format.

    fn map_to_json(&self, map: &BTreeMap<String, Value>) -> Result<Map<String, Json>, ProtocolError> {
        let inner = descend(0, "map")?;
        map.iter()
            .map(|(k, v)| -> Result<(String, Json), ProtocolError> {
                Ok((k.clone(), to_json_at(v, &self.registry, inner)?))
            })
            .collect()
    }

    fn map_from_json(&self, map: &Map<String, Json>) -> Result<BTreeMap<String, Value>, ProtocolError> {
        let inner = descend(0, "map")?;
        map.iter()
            .map(|(k, v)| -> Result<(String, Value), ProtocolError> {
                Ok((k.clone(), from_json_at(v, &self.registry, inner)?))
            })
            .collect()
    }
}

impl Default for GraphSonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSerializer for GraphSonSerializer {
    fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    fn serialize_request(&self, request: &RequestMessage) -> Result<Bytes, ProtocolError> {
        let gremlin = match request.payload() {
            RequestPayload::Script(script) => Json::String(script.clone()),
            RequestPayload::Bytecode(bytecode) => bytecode_to_json(bytecode, &self.registry, 0)?,
        };
        let envelope = RequestEnvelope {
            gremlin,
            g: request.g().map(str::to_owned),
            language: request.language().map(str::to_owned),
            timeout_ms: request.timeout_millis(),
            materialize_properties: request.materialize_properties(),
            bindings: self.map_to_json(request.bindings())?,
        };
        let bytes = serde_json::to_vec(&envelope)?;
        tracing::trace!(bytes = bytes.len(), bindings = request.bindings().len(), "serialized request");
        Ok(Bytes::from(bytes))
    }

    fn deserialize_request(&self, data: &[u8]) -> Result<RequestMessage, ProtocolError> {
        let envelope: RequestEnvelope = serde_json::from_slice(data)?;
        let builder = match &envelope.gremlin {
            Json::String(script) => RequestMessage::build(script.as_str()),
            Json::Object(object) if object.get("@type").and_then(Json::as_str) == Some("g:Bytecode") => {
                let bytecode = bytecode_from_json(object.get("@value").unwrap_or(&Json::Null), &self.registry, 0)?;
                RequestMessage::build(bytecode)
            }
            _ => {
                return Err(ProtocolError::InvalidMessage(
                    "gremlin must be a string or g:Bytecode".into(),
                ));
            }
        };

        let mut builder = builder.replace_bindings(self.map_from_json(&envelope.bindings)?);
        if let Some(g) = envelope.g {
            builder = builder.add_g(g);
        }
        if let Some(language) = envelope.language {
            builder = builder.add_language(language);
        }
        if let Some(timeout) = envelope.timeout_ms {
            builder = builder.add_timeout_millis(timeout);
        }
        if let Some(materialize) = envelope.materialize_properties {
            builder = builder.add_materialize_properties(materialize);
        }

        tracing::trace!(bytes = data.len(), "deserialized request");
        Ok(builder.create())
    }

    fn serialize_response(&self, response: &ResponseMessage) -> Result<Bytes, ProtocolError> {
        let result = response
            .result()
            .map(|items| to_json(&Value::List(items.to_vec()), &self.registry))
            .transpose()?;
        let status = response.status();
        let envelope = ResponseEnvelope {
            result,
            status: StatusEnvelope {
                code: status.code(),
                message: status.message().map(str::to_owned),
                exception: status.exception().map(str::to_owned),
                attributes: status
                    .attributes()
                    .map(|attributes| self.map_to_json(attributes))
                    .transpose()?,
            },
        };
        let bytes = serde_json::to_vec(&envelope)?;
        tracing::trace!(bytes = bytes.len(), code = %status.code(), "serialized response");
        Ok(Bytes::from(bytes))
    }

    fn deserialize_response(&self, data: &[u8]) -> Result<ResponseMessage, ProtocolError> {
        let envelope: ResponseEnvelope = serde_json::from_slice(data)?;
        let status = envelope.status;

        let mut builder = ResponseMessage::build().code(status.code);
        if let Some(message) = status.message {
            builder = builder.status_message(message);
        }
        if let Some(exception) = status.exception {
            builder = builder.exception(exception);
        }
        if let Some(attributes) = &status.attributes {
            builder = builder.status_attributes(self.map_from_json(attributes)?);
        }
        if let Some(result) = &envelope.result {
            match from_json(result, &self.registry)? {
                Value::List(items) => builder = builder.result(items),
                Value::Null => {}
                other => {
                    return Err(ProtocolError::UnexpectedType {
                        context: "result",
                        expected: "list",
                        actual: other.kind_name().to_owned(),
                    });
                }
            }
        }

        tracing::trace!(bytes = data.len(), code = %status.code, "deserialized response");
        Ok(builder.create())
    }
}
