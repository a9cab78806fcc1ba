use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// Shared namespace prefix for every reserved envelope field.
pub const FIELD_PREFIX: &str = "x-api-concierge-";
pub const REQUEST_FIELD: &str = "x-api-concierge-request";
pub const RESPONSE_FIELD: &str = "x-api-concierge-response";
pub const SCHEMA_FIELD: &str = "x-api-concierge-schema";
pub const INSTRUCTIONS_FIELD: &str = "x-api-concierge-instructions";
pub const CLIENT_FIELD: &str = "x-api-concierge-client";
pub const ERROR_FIELD: &str = "x-api-concierge-error";
pub const STATE_FIELD: &str = "x-api-concierge-state";
pub const BASE_FIELD: &str = "x-api-concierge-base";
pub const PATH_FIELD: &str = "x-api-concierge-path";

/// Encodes a JSON document for the flat string-keyed (header) wire form.
fn encode_document(value: &Value) -> String {
    URL_SAFE.encode(value.to_string())
}

/// Decodes a base64url-encoded JSON document. Accepts unpadded input so
/// hand-built envelopes still parse.
fn decode_document(raw: &str) -> Result<Value, ProtocolError> {
    let bytes = URL_SAFE
        .decode(raw)
        .or_else(|_| URL_SAFE_NO_PAD.decode(raw))
        .map_err(|_| ProtocolError::InvalidSchema)?;
    serde_json::from_slice(&bytes).map_err(|_| ProtocolError::InvalidSchema)
}

/// Embedded schema/base values in the payload form may be native JSON or a
/// base64url string; string values must decode.
fn decode_embedded(value: &Value) -> Result<Value, ProtocolError> {
    match value {
        Value::String(raw) => decode_document(raw),
        other => Ok(other.clone()),
    }
}

fn response_kind(payload: &Map<String, Value>) -> Option<&str> {
    payload.iter().find_map(|(key, value)| {
        if key.eq_ignore_ascii_case(RESPONSE_FIELD) {
            value.as_str()
        } else {
            None
        }
    })
}

/// Reads the reserved response-kind value from a flat header envelope.
pub fn header_response_kind(headers: &[(String, String)]) -> Option<&str> {
    headers.iter().find_map(|(key, value)| {
        if key.eq_ignore_ascii_case(RESPONSE_FIELD) {
            Some(value.as_str())
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Asks a remote function to describe the input it expects.
pub struct SchemaRequest {
    pub client: String,
}

impl SchemaRequest {
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
        }
    }

    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(REQUEST_FIELD.to_string(), Value::from("schema"));
        payload.insert(CLIENT_FIELD.to_string(), Value::from(self.client.clone()));
        payload
    }

    pub fn to_headers(&self) -> Vec<(String, String)> {
        vec![
            (REQUEST_FIELD.to_string(), "schema".to_string()),
            (CLIENT_FIELD.to_string(), self.client.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A remote function's description of the input it wants next.
///
/// `base` is the document accumulated so far; `path` locates where the next
/// collected value merges into it (absent path means the root). `state` is an
/// opaque continuation token that is copied forward verbatim.
pub struct SchemaResponse {
    pub schema: Value,
    pub instructions: Option<String>,
    pub state: Option<String>,
    pub base: Option<Value>,
    pub path: Option<String>,
}

impl SchemaResponse {
    pub fn is_schema_response(payload: &Map<String, Value>) -> bool {
        response_kind(payload) == Some("schema")
    }

    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, ProtocolError> {
        let mut schema = None;
        let mut instructions = None;
        let mut state = None;
        let mut base = None;
        let mut path = None;
        for (key, value) in payload {
            if key.eq_ignore_ascii_case(SCHEMA_FIELD) {
                schema = Some(decode_embedded(value)?);
            } else if key.eq_ignore_ascii_case(INSTRUCTIONS_FIELD) {
                instructions = value.as_str().map(str::to_string);
            } else if key.eq_ignore_ascii_case(STATE_FIELD) {
                state = value.as_str().map(str::to_string);
            } else if key.eq_ignore_ascii_case(BASE_FIELD) {
                base = Some(decode_embedded(value)?);
            } else if key.eq_ignore_ascii_case(PATH_FIELD) {
                path = value.as_str().map(str::to_string);
            }
        }
        Ok(Self {
            schema: schema.ok_or(ProtocolError::InvalidSchemaResponse)?,
            instructions,
            state,
            base,
            path,
        })
    }

    pub fn from_headers(headers: &[(String, String)]) -> Result<Self, ProtocolError> {
        let mut schema = None;
        let mut instructions = None;
        let mut state = None;
        let mut base = None;
        let mut path = None;
        for (key, value) in headers {
            if key.eq_ignore_ascii_case(SCHEMA_FIELD) {
                schema = Some(decode_document(value)?);
            } else if key.eq_ignore_ascii_case(INSTRUCTIONS_FIELD) {
                instructions = Some(value.clone());
            } else if key.eq_ignore_ascii_case(STATE_FIELD) {
                state = Some(value.clone());
            } else if key.eq_ignore_ascii_case(BASE_FIELD) {
                base = Some(decode_document(value)?);
            } else if key.eq_ignore_ascii_case(PATH_FIELD) {
                path = Some(value.clone());
            }
        }
        Ok(Self {
            schema: schema.ok_or(ProtocolError::InvalidSchemaResponse)?,
            instructions,
            state,
            base,
            path,
        })
    }

    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(RESPONSE_FIELD.to_string(), Value::from("schema"));
        payload.insert(SCHEMA_FIELD.to_string(), self.schema.clone());
        if let Some(instructions) = &self.instructions {
            payload.insert(
                INSTRUCTIONS_FIELD.to_string(),
                Value::from(instructions.clone()),
            );
        }
        if let Some(state) = &self.state {
            payload.insert(STATE_FIELD.to_string(), Value::from(state.clone()));
        }
        if let Some(base) = &self.base {
            payload.insert(BASE_FIELD.to_string(), base.clone());
        }
        if let Some(path) = &self.path {
            payload.insert(PATH_FIELD.to_string(), Value::from(path.clone()));
        }
        payload
    }

    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            (RESPONSE_FIELD.to_string(), "schema".to_string()),
            (SCHEMA_FIELD.to_string(), encode_document(&self.schema)),
        ];
        if let Some(instructions) = &self.instructions {
            headers.push((INSTRUCTIONS_FIELD.to_string(), instructions.clone()));
        }
        if let Some(state) = &self.state {
            headers.push((STATE_FIELD.to_string(), state.clone()));
        }
        if let Some(base) = &self.base {
            headers.push((BASE_FIELD.to_string(), encode_document(base)));
        }
        if let Some(path) = &self.path {
            headers.push((PATH_FIELD.to_string(), path.clone()));
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One turn's fully merged payload, sent to the remote function.
pub struct InvocationRequest {
    payload: Value,
    client: String,
    state: Option<String>,
}

impl InvocationRequest {
    /// A state token can only ride along inside an object-shaped payload,
    /// since it is injected as a sibling field.
    pub fn new(
        payload: Value,
        client: impl Into<String>,
        state: Option<String>,
    ) -> Result<Self, ProtocolError> {
        if state.is_some() && !payload.is_object() {
            return Err(ProtocolError::InvalidState);
        }
        Ok(Self {
            payload,
            client: client.into(),
            state,
        })
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Object payloads get the reserved fields injected as siblings;
    /// non-object payloads pass through untouched.
    pub fn to_payload(&self) -> Value {
        let Value::Object(map) = &self.payload else {
            return self.payload.clone();
        };
        let mut payload = map.clone();
        payload.insert(REQUEST_FIELD.to_string(), Value::from("invoke"));
        payload.insert(CLIENT_FIELD.to_string(), Value::from(self.client.clone()));
        if let Some(state) = self.state.as_deref() {
            if !state.is_empty() {
                payload.insert(STATE_FIELD.to_string(), Value::from(state.to_string()));
            }
        }
        Value::Object(payload)
    }

    /// Header form carries only the reserved fields; the payload itself
    /// travels out of band as the request body.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            (REQUEST_FIELD.to_string(), "invoke".to_string()),
            (CLIENT_FIELD.to_string(), self.client.clone()),
        ];
        if let Some(state) = self.state.as_deref() {
            if !state.is_empty() {
                headers.push((STATE_FIELD.to_string(), state.to_string()));
            }
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A protocol-level rejection from the remote function.
///
/// When `schema` is present the error is recoverable: the client should
/// re-prompt with that schema instead of aborting.
pub struct ErrorResponse {
    pub error_message: String,
    pub schema: Option<Value>,
    pub state: Option<String>,
    pub base: Option<Value>,
    pub path: Option<String>,
}

impl ErrorResponse {
    pub fn is_error_response(payload: &Map<String, Value>) -> bool {
        response_kind(payload) == Some("error")
    }

    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, ProtocolError> {
        let mut error_message = None;
        let mut schema = None;
        let mut state = None;
        let mut base = None;
        let mut path = None;
        for (key, value) in payload {
            if key.eq_ignore_ascii_case(ERROR_FIELD) {
                error_message = value.as_str().map(str::to_string);
            } else if key.eq_ignore_ascii_case(SCHEMA_FIELD) {
                schema = Some(decode_embedded(value)?);
            } else if key.eq_ignore_ascii_case(STATE_FIELD) {
                state = value.as_str().map(str::to_string);
            } else if key.eq_ignore_ascii_case(BASE_FIELD) {
                base = Some(decode_embedded(value)?);
            } else if key.eq_ignore_ascii_case(PATH_FIELD) {
                path = value.as_str().map(str::to_string);
            }
        }
        Ok(Self {
            error_message: error_message.ok_or(ProtocolError::InvalidErrorResponse)?,
            schema,
            state,
            base,
            path,
        })
    }

    pub fn from_headers(headers: &[(String, String)]) -> Result<Self, ProtocolError> {
        let mut error_message = None;
        let mut schema = None;
        let mut state = None;
        let mut base = None;
        let mut path = None;
        for (key, value) in headers {
            if key.eq_ignore_ascii_case(ERROR_FIELD) {
                error_message = Some(value.clone());
            } else if key.eq_ignore_ascii_case(SCHEMA_FIELD) {
                schema = Some(decode_document(value)?);
            } else if key.eq_ignore_ascii_case(STATE_FIELD) {
                state = Some(value.clone());
            } else if key.eq_ignore_ascii_case(BASE_FIELD) {
                base = Some(decode_document(value)?);
            } else if key.eq_ignore_ascii_case(PATH_FIELD) {
                path = Some(value.clone());
            }
        }
        Ok(Self {
            error_message: error_message.ok_or(ProtocolError::InvalidErrorResponse)?,
            schema,
            state,
            base,
            path,
        })
    }

    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(RESPONSE_FIELD.to_string(), Value::from("error"));
        payload.insert(
            ERROR_FIELD.to_string(),
            Value::from(self.error_message.clone()),
        );
        if let Some(schema) = &self.schema {
            payload.insert(SCHEMA_FIELD.to_string(), schema.clone());
        }
        if let Some(state) = &self.state {
            payload.insert(STATE_FIELD.to_string(), Value::from(state.clone()));
        }
        if let Some(base) = &self.base {
            payload.insert(BASE_FIELD.to_string(), base.clone());
        }
        if let Some(path) = &self.path {
            payload.insert(PATH_FIELD.to_string(), Value::from(path.clone()));
        }
        payload
    }

    /// Recoverable errors convert back into a schema response so the
    /// invocation loop can re-prompt without losing the accumulated base.
    pub fn to_schema_response(&self) -> Option<SchemaResponse> {
        let schema = self.schema.clone()?;
        Some(SchemaResponse {
            schema,
            instructions: None,
            state: self.state.clone(),
            base: self.base.clone(),
            path: self.path.clone(),
        })
    }
}
