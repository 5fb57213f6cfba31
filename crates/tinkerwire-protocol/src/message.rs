//! Request and response messages.
//!
//! Both message types are immutable once built. The only way to make one
//! is through its builder:
//!
//! ```rust
//! use tinkerwire_protocol::{MaterializeProperties, RequestMessage, ResponseMessage};
//!
//! let request = RequestMessage::build("g.V().count()")
//!     .add_g("g1")
//!     .add_timeout_millis(500)
//!     .add_materialize_properties(MaterializeProperties::Tokens)
//!     .add_binding("k", "v")
//!     .create();
//! assert_eq!(request.gremlin(), Some("g.V().count()"));
//!
//! let response = ResponseMessage::build().result(vec![123.3f64.into()]).create();
//! assert!(response.status().code().is_success());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tinkerwire_bytecode::{GremlinLang, Value};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// What a request asks the server to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    /// A gremlin-lang script.
    Script(String),
    /// A traversal as bytecode.
    Bytecode(GremlinLang),
}

impl From<&str> for RequestPayload {
    fn from(script: &str) -> Self {
        Self::Script(script.to_owned())
    }
}

impl From<String> for RequestPayload {
    fn from(script: String) -> Self {
        Self::Script(script)
    }
}

impl From<GremlinLang> for RequestPayload {
    fn from(bytecode: GremlinLang) -> Self {
        Self::Bytecode(bytecode)
    }
}

/// How much of each element the server should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterializeProperties {
    /// Elements with all their properties.
    All,
    /// Elements with only their id and label.
    Tokens,
}

impl MaterializeProperties {
    /// The name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Tokens => "tokens",
        }
    }

    /// Parses a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::All),
            "tokens" => Some(Self::Tokens),
            _ => None,
        }
    }
}

impl fmt::Display for MaterializeProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to execute a script or traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    payload: RequestPayload,
    g: Option<String>,
    language: Option<String>,
    timeout_millis: Option<u64>,
    materialize_properties: Option<MaterializeProperties>,
    bindings: BTreeMap<String, Value>,
}

impl RequestMessage {
    /// Starts a request for `payload`: a script string or bytecode.
    ///
    /// Bytecode's own bindings are copied into the request's binding map;
    /// bindings added on the builder afterwards override them by name.
    pub fn build(payload: impl Into<RequestPayload>) -> RequestMessageBuilder {
        let payload = payload.into();
        let bindings = match &payload {
            RequestPayload::Bytecode(bytecode) => bytecode.collect_bindings().into_iter().collect(),
            RequestPayload::Script(_) => BTreeMap::new(),
        };
        RequestMessageBuilder {
            request: RequestMessage {
                payload,
                g: None,
                language: None,
                timeout_millis: None,
                materialize_properties: None,
                bindings,
            },
        }
    }

    /// The traversal or script being submitted.
    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }

    /// The script, if the payload is one.
    pub fn gremlin(&self) -> Option<&str> {
        match &self.payload {
            RequestPayload::Script(script) => Some(script),
            RequestPayload::Bytecode(_) => None,
        }
    }

    /// The bytecode, if the payload is one.
    pub fn bytecode(&self) -> Option<&GremlinLang> {
        match &self.payload {
            RequestPayload::Bytecode(bytecode) => Some(bytecode),
            RequestPayload::Script(_) => None,
        }
    }

    /// The traversal source alias, e.g. `g1`.
    pub fn g(&self) -> Option<&str> {
        self.g.as_deref()
    }

    /// The script language, when one was set.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Server-side evaluation timeout.
    pub fn timeout_millis(&self) -> Option<u64> {
        self.timeout_millis
    }

    /// How elements in the result should carry their properties.
    pub fn materialize_properties(&self) -> Option<MaterializeProperties> {
        self.materialize_properties
    }

    /// All bindings, keyed by variable name.
    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    /// The value bound to `name`, if any.
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

/// Builder for [`RequestMessage`].
#[derive(Debug, Clone)]
#[must_use]
pub struct RequestMessageBuilder {
    request: RequestMessage,
}

impl RequestMessageBuilder {
    /// Names the traversal source to run against.
    pub fn add_g(mut self, g: impl Into<String>) -> Self {
        self.request.g = Some(g.into());
        self
    }

    /// Sets the script language.
    pub fn add_language(mut self, language: impl Into<String>) -> Self {
        self.request.language = Some(language.into());
        self
    }

    /// Sets the evaluation timeout.
    pub fn add_timeout_millis(mut self, timeout_millis: u64) -> Self {
        self.request.timeout_millis = Some(timeout_millis);
        self
    }

    /// Asks for elements with full properties or tokens only.
    pub fn add_materialize_properties(mut self, mode: MaterializeProperties) -> Self {
        self.request.materialize_properties = Some(mode);
        self
    }

    /// Adds one binding, replacing any earlier value for `name`.
    pub fn add_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.bindings.insert(name.into(), value.into());
        self
    }

    /// Adds several bindings. Later names replace earlier ones.
    pub fn add_bindings<I, K, V>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.request
            .bindings
            .extend(bindings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Drops every binding gathered so far, including those collected
    /// from bytecode, and uses `bindings` instead.
    pub(crate) fn replace_bindings(mut self, bindings: BTreeMap<String, Value>) -> Self {
        self.request.bindings = bindings;
        self
    }

    /// Finishes the request.
    pub fn create(self) -> RequestMessage {
        self.request
    }
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// An HTTP-style response status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    /// Success with an empty result.
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    /// More results follow in later frames.
    pub const PARTIAL_CONTENT: StatusCode = StatusCode(206);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const PROXY_AUTHENTICATION_REQUIRED: StatusCode = StatusCode(407);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// The numeric code.
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Any 2xx code, including partial content.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    /// `206`: the server will send more frames for this request.
    pub fn is_partial(self) -> bool {
        self == Self::PARTIAL_CONTENT
    }

    /// Anything outside 2xx.
    pub fn is_error(self) -> bool {
        !self.is_success()
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The status block of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    code: StatusCode,
    message: Option<String>,
    exception: Option<String>,
    attributes: Option<BTreeMap<String, Value>>,
}

impl ResponseStatus {
    /// The status code.
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Human-readable status text.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Server exception class, on failure.
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }

    /// Extra status attributes, when the server sent any.
    pub fn attributes(&self) -> Option<&BTreeMap<String, Value>> {
        self.attributes.as_ref()
    }
}

/// A server response: status plus an optional result list.
///
/// `result() == None` (no result at all) and `result() == Some(&[])`
/// (an empty result) are different responses and survive serialization
/// as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    status: ResponseStatus,
    result: Option<Vec<Value>>,
}

impl ResponseMessage {
    /// Starts a response with status code 200 and no result.
    pub fn build() -> ResponseMessageBuilder {
        ResponseMessageBuilder {
            response: ResponseMessage {
                status: ResponseStatus {
                    code: StatusCode::OK,
                    message: None,
                    exception: None,
                    attributes: None,
                },
                result: None,
            },
        }
    }

    /// The response status.
    pub fn status(&self) -> &ResponseStatus {
        &self.status
    }

    /// Result items, or `None` when the response carried no result.
    pub fn result(&self) -> Option<&[Value]> {
        self.result.as_deref()
    }

    /// Consumes the response, keeping only its result items.
    pub fn into_result(self) -> Option<Vec<Value>> {
        self.result
    }
}

/// Builder for [`ResponseMessage`].
#[derive(Debug, Clone)]
#[must_use]
pub struct ResponseMessageBuilder {
    response: ResponseMessage,
}

impl ResponseMessageBuilder {
    /// Sets the status code. Defaults to [`StatusCode::OK`].
    pub fn code(mut self, code: impl Into<StatusCode>) -> Self {
        self.response.status.code = code.into();
        self
    }

    /// Sets the status text.
    pub fn status_message(mut self, message: impl Into<String>) -> Self {
        self.response.status.message = Some(message.into());
        self
    }

    /// Sets the exception class.
    pub fn exception(mut self, exception: impl Into<String>) -> Self {
        self.response.status.exception = Some(exception.into());
        self
    }

    /// Adds one status attribute.
    pub fn status_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.response
            .status
            .attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replaces all status attributes.
    pub fn status_attributes(mut self, attributes: BTreeMap<String, Value>) -> Self {
        self.response.status.attributes = Some(attributes);
        self
    }

    /// Sets the result items.
    pub fn result(mut self, result: Vec<Value>) -> Self {
        self.response.result = Some(result);
        self
    }

    /// Finishes the response.
    pub fn create(self) -> ResponseMessage {
        self.response
    }
}
