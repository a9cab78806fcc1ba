use std::time::Duration;

use serde_json::Value;

use concierge_client::{InvokeReply, Target, TargetError};
use concierge_protocol::{
    header_response_kind, ErrorResponse, InvocationRequest, ProtocolError, SchemaRequest,
    SchemaResponse, FIELD_PREFIX,
};

/// Header a gateway sets when the callee itself faulted instead of
/// returning a response.
const FUNCTION_ERROR_HEADER: &str = "x-function-error";

#[derive(Debug, Clone)]
/// Connection settings for one gateway.
pub struct GatewayConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout_ms: 30_000,
        }
    }
}

/// One remote function behind a gateway.
pub struct GatewayTarget {
    config: GatewayConfig,
    client: reqwest::blocking::Client,
    function: String,
    description: Option<String>,
}

struct Exchange {
    envelope_headers: Vec<(String, String)>,
    body: String,
}

impl GatewayTarget {
    pub fn new(config: GatewayConfig, function: impl Into<String>) -> Result<Self, TargetError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|error| TargetError::Request(format!("failed to build client: {error}")))?;
        Ok(Self {
            config,
            client,
            function: function.into(),
            description: None,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// A selector that is already a URL is used verbatim; a bare name is
    /// joined onto the gateway's invoke path.
    fn endpoint(&self) -> String {
        if self.function.starts_with("http://") || self.function.starts_with("https://") {
            return self.function.clone();
        }
        format!(
            "{}/function/{}",
            self.config.base_url.trim_end_matches('/'),
            self.function
        )
    }

    fn exchange(&self, body: &Value) -> Result<Exchange, TargetError> {
        let mut request = self.client.post(self.endpoint()).json(body);
        if let Some(token) = self.config.api_token.as_deref() {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|error| TargetError::Request(format!("gateway request failed: {error}")))?;

        let status = response.status();
        let envelope_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| {
                let name = name.as_str();
                name.starts_with(FIELD_PREFIX) || name == FUNCTION_ERROR_HEADER
            })
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .map_err(|error| TargetError::Request(format!("failed to read response: {error}")))?;

        if let Some((_, fault)) = envelope_headers
            .iter()
            .find(|(name, _)| name == FUNCTION_ERROR_HEADER)
        {
            return Err(TargetError::Request(function_fault_message(fault, &body)));
        }
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(TargetError::Request(format!(
                "gateway returned status {status}: {snippet}"
            )));
        }
        Ok(Exchange {
            envelope_headers,
            body,
        })
    }
}

/// Builds the fault message from the gateway marker plus whatever typed
/// error detail the body carries.
fn function_fault_message(fault: &str, body: &str) -> String {
    let mut message = format!("Error {fault}");
    if let Ok(Value::Object(detail)) = serde_json::from_str::<Value>(body) {
        if let (Some(error_type), Some(error_message)) = (
            detail.get("errorType").and_then(Value::as_str),
            detail.get("errorMessage").and_then(Value::as_str),
        ) {
            message.push_str(&format!(" {error_type}: {error_message}"));
        }
    }
    message
}

impl Target for GatewayTarget {
    fn name(&self) -> String {
        self.function.clone()
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }

    fn request_schema(&self, request: &SchemaRequest) -> Result<SchemaResponse, TargetError> {
        let exchange = self.exchange(&Value::Object(request.to_payload()))?;
        if header_response_kind(&exchange.envelope_headers).is_some() {
            return Ok(SchemaResponse::from_headers(&exchange.envelope_headers)?);
        }
        let body: Value = serde_json::from_str(&exchange.body).map_err(|_| {
            TargetError::Request("function returned a non-JSON schema response".to_string())
        })?;
        let Value::Object(payload) = body else {
            return Err(TargetError::Protocol(ProtocolError::InvalidSchemaResponse));
        };
        Ok(SchemaResponse::from_payload(&payload)?)
    }

    fn invoke(&self, request: &InvocationRequest) -> Result<InvokeReply, TargetError> {
        let exchange = self.exchange(&request.to_payload())?;

        match header_response_kind(&exchange.envelope_headers) {
            Some("schema") => {
                return Ok(InvokeReply::Schema(SchemaResponse::from_headers(
                    &exchange.envelope_headers,
                )?))
            }
            Some("error") => {
                return Ok(InvokeReply::Error(ErrorResponse::from_headers(
                    &exchange.envelope_headers,
                )?))
            }
            _ => {}
        }

        let Ok(body) = serde_json::from_str::<Value>(&exchange.body) else {
            // Not protocol traffic at all: hand the raw text back as the
            // final application result.
            return Ok(InvokeReply::Result(Value::String(exchange.body)));
        };
        if let Value::Object(payload) = &body {
            if SchemaResponse::is_schema_response(payload) {
                return Ok(InvokeReply::Schema(SchemaResponse::from_payload(payload)?));
            }
            if ErrorResponse::is_error_response(payload) {
                return Ok(InvokeReply::Error(ErrorResponse::from_payload(payload)?));
            }
        }
        Ok(InvokeReply::Result(body))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    use concierge_protocol::{
        ERROR_FIELD, RESPONSE_FIELD, SCHEMA_FIELD, STATE_FIELD,
    };

    use super::*;

    fn target_for(server: &MockServer, function: &str) -> GatewayTarget {
        GatewayTarget::new(GatewayConfig::new(server.base_url()), function).expect("target")
    }

    #[test]
    fn integration_request_schema_decodes_payload_form() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/function/greeter")
                .json_body_includes(
                    json!({
                        "x-api-concierge-request": "schema",
                        "x-api-concierge-client": "concierge-cli test"
                    })
                    .to_string(),
                );
            then.status(200).json_body(json!({
                (RESPONSE_FIELD): "schema",
                (SCHEMA_FIELD): {"type": "object"},
                (STATE_FIELD): "s1"
            }));
        });

        let target = target_for(&server, "greeter");
        let response = target
            .request_schema(&SchemaRequest::new("concierge-cli test"))
            .expect("schema");

        mock.assert_calls(1);
        assert_eq!(response.schema, json!({"type": "object"}));
        assert_eq!(response.state.as_deref(), Some("s1"));
    }

    #[test]
    fn integration_request_schema_decodes_header_form() {
        let server = MockServer::start();
        let wire = SchemaResponse {
            schema: json!({"type": "object", "properties": {"name": {}}}),
            instructions: Some("Say who you are.".to_string()),
            state: None,
            base: Some(json!({"greeting": "Hello"})),
            path: Some("".to_string()),
        };
        let headers = wire.to_headers();
        server.mock(|when, mut then| {
            when.method(POST).path("/function/greeter");
            then = then.status(200).body("");
            for (name, value) in &headers {
                then = then.header(name, value);
            }
        });

        let target = target_for(&server, "greeter");
        let response = target
            .request_schema(&SchemaRequest::new("concierge-cli test"))
            .expect("schema");

        assert_eq!(response, wire);
    }

    #[test]
    fn integration_request_schema_without_schema_field_is_protocol_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/function/greeter");
            then.status(200)
                .json_body(json!({ (RESPONSE_FIELD): "schema" }));
        });

        let target = target_for(&server, "greeter");
        let error = target
            .request_schema(&SchemaRequest::new("concierge-cli test"))
            .expect_err("missing schema");

        assert!(matches!(
            error,
            TargetError::Protocol(ProtocolError::InvalidSchemaResponse)
        ));
    }

    #[test]
    fn integration_invoke_classifies_error_payload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/function/greeter");
            then.status(200).json_body(json!({
                (RESPONSE_FIELD): "error",
                (ERROR_FIELD): "bad bar",
                (SCHEMA_FIELD): {"type": "object"}
            }));
        });

        let target = target_for(&server, "greeter");
        let request = InvocationRequest::new(json!({"bar": 1}), "concierge-cli test", None)
            .expect("request");
        let reply = target.invoke(&request).expect("invoke");

        let InvokeReply::Error(error) = reply else {
            panic!("expected error reply, got {reply:?}");
        };
        assert_eq!(error.error_message, "bad bar");
        assert!(error.schema.is_some());
    }

    #[test]
    fn integration_invoke_treats_unmarked_body_as_opaque_result() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/function/greeter")
                .json_body_includes(
                    json!({
                        "name": "Bob",
                        "x-api-concierge-request": "invoke"
                    })
                    .to_string(),
                );
            then.status(200).json_body(json!({"greeting": "Hello Bob"}));
        });

        let target = target_for(&server, "greeter");
        let request = InvocationRequest::new(json!({"name": "Bob"}), "concierge-cli test", None)
            .expect("request");
        let reply = target.invoke(&request).expect("invoke");

        assert_eq!(
            reply,
            InvokeReply::Result(json!({"greeting": "Hello Bob"}))
        );
    }

    #[test]
    fn integration_invoke_maps_non_success_status_to_request_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/function/greeter");
            then.status(502).body("upstream unavailable");
        });

        let target = target_for(&server, "greeter");
        let request =
            InvocationRequest::new(json!({}), "concierge-cli test", None).expect("request");
        let error = target.invoke(&request).expect_err("bad gateway");

        let TargetError::Request(message) = error else {
            panic!("expected request error, got {error:?}");
        };
        assert!(message.contains("502"));
        assert!(message.contains("upstream unavailable"));
    }

    #[test]
    fn integration_invoke_surfaces_callee_fault_with_typed_detail() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/function/greeter");
            then.status(200)
                .header(FUNCTION_ERROR_HEADER, "Unhandled")
                .json_body(json!({
                    "errorType": "ValueError",
                    "errorMessage": "bad input"
                }));
        });

        let target = target_for(&server, "greeter");
        let request =
            InvocationRequest::new(json!({}), "concierge-cli test", None).expect("request");
        let error = target.invoke(&request).expect_err("callee fault");

        let TargetError::Request(message) = error else {
            panic!("expected request error, got {error:?}");
        };
        assert_eq!(message, "Error Unhandled ValueError: bad input");
    }

    #[test]
    fn unit_full_url_selector_bypasses_gateway_base() {
        let target = GatewayTarget::new(
            GatewayConfig::new("http://gateway.internal"),
            "https://fn.example.com/run",
        )
        .expect("target");
        assert_eq!(target.endpoint(), "https://fn.example.com/run");
    }
}
