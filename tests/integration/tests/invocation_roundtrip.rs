//! End-to-end invocation runs against a mocked gateway: schema negotiation,
//! turn accumulation, recoverable errors, and terminal outcomes.

use std::collections::VecDeque;

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::{json, Value};

use concierge_client::{
    run_invocation, InvokeOptions, InvokeOutcome, PromptError, SchemaPrompter, SeedValues,
};
use concierge_gateway::{GatewayConfig, GatewayTarget};
use concierge_protocol::SchemaResponse;

struct ScriptedPrompter {
    values: VecDeque<Value>,
}

impl ScriptedPrompter {
    fn new(values: Vec<Value>) -> Self {
        Self {
            values: VecDeque::from(values),
        }
    }
}

impl SchemaPrompter for ScriptedPrompter {
    fn prompt(&mut self, _schema: &Value, seed: &SeedValues) -> Result<Value, PromptError> {
        let mut value = self
            .values
            .pop_front()
            .ok_or_else(|| PromptError::Aborted("scripted value queue exhausted".to_string()))?;
        // Seeds replace whole top-level fields here, which is all these
        // scenarios need.
        if let Value::Object(fields) = &mut value {
            for (pointer, seeded) in seed.iter() {
                if let Some(name) = pointer.strip_prefix('/') {
                    fields.insert(name.to_string(), seeded.clone());
                }
            }
        }
        Ok(value)
    }
}

fn options() -> InvokeOptions {
    InvokeOptions {
        client: "concierge-cli integration".to_string(),
        seed: SeedValues::new(),
        show_schema: false,
        show_event: false,
    }
}

fn target_for(server: &MockServer, function: &str) -> GatewayTarget {
    GatewayTarget::new(GatewayConfig::new(server.base_url()), function).expect("target")
}

#[test]
fn integration_two_turn_wizard_accumulates_base_and_state() {
    let server = MockServer::start();

    // Turn 1: the schema request gets the first schema.
    let schema_call = server.mock(|when, then| {
        when.method(POST)
            .path("/function/signup")
            .json_body_includes(json!({"x-api-concierge-request": "schema"}).to_string());
        then.status(200).json_body(json!({
            "x-api-concierge-response": "schema",
            "x-api-concierge-schema": {"type": "object", "properties": {"name": {"type": "string"}}}
        }));
    });

    // Turn 1 invoke: the function wants a second turn, folding the
    // collected name into a base document and pointing the next value at
    // /contact.
    let first_invoke = server.mock(|when, then| {
        when.method(POST)
            .path("/function/signup")
            .json_body_includes(
                json!({
                    "x-api-concierge-request": "invoke",
                    "name": "Bob"
                })
                .to_string(),
            );
        then.status(200).json_body(json!({
            "x-api-concierge-response": "schema",
            "x-api-concierge-schema": {"type": "object", "properties": {"email": {"type": "string"}}},
            "x-api-concierge-state": "step-2",
            "x-api-concierge-base": {"profile": {"name": "Bob"}},
            "x-api-concierge-path": "/contact"
        }));
    });

    // Turn 2 invoke: base document with the second value merged in at the
    // path, plus the state token, then done.
    let second_invoke = server.mock(|when, then| {
        when.method(POST)
            .path("/function/signup")
            .json_body_includes(
                json!({
                    "x-api-concierge-request": "invoke",
                    "x-api-concierge-state": "step-2",
                    "profile": {"name": "Bob"},
                    "contact": {"email": "bob@example.com"}
                })
                .to_string(),
            );
        then.status(200)
            .json_body(json!({"registered": true}));
    });

    let target = target_for(&server, "signup");
    let mut prompter = ScriptedPrompter::new(vec![
        json!({"name": "Bob"}),
        json!({"email": "bob@example.com"}),
    ]);
    let mut out = Vec::new();

    let outcome =
        run_invocation(&target, &mut prompter, &options(), &mut out).expect("invocation");

    assert_eq!(outcome, InvokeOutcome::Completed(json!({"registered": true})));
    schema_call.assert_calls(1);
    first_invoke.assert_calls(1);
    second_invoke.assert_calls(1);
}

#[test]
fn integration_recoverable_error_loops_and_fatal_error_stops() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST)
            .path("/function/flaky")
            .json_body_includes(json!({"x-api-concierge-request": "schema"}).to_string());
        then.status(200).json_body(json!({
            "x-api-concierge-response": "schema",
            "x-api-concierge-schema": {"type": "object"}
        }));
    });

    // First invoke is rejected with a recovery schema, second is fatal.
    let rejected = server.mock(|when, then| {
        when.method(POST)
            .path("/function/flaky")
            .json_body_includes(
                json!({"x-api-concierge-request": "invoke", "attempt": 1}).to_string(),
            );
        then.status(200).json_body(json!({
            "x-api-concierge-response": "error",
            "x-api-concierge-error": "bad bar",
            "x-api-concierge-schema": {"type": "object"},
            "x-api-concierge-state": "retry-1"
        }));
    });
    let fatal = server.mock(|when, then| {
        when.method(POST)
            .path("/function/flaky")
            .json_body_includes(
                json!({"x-api-concierge-request": "invoke", "attempt": 2}).to_string(),
            );
        then.status(200).json_body(json!({
            "x-api-concierge-response": "error",
            "x-api-concierge-error": "gave up"
        }));
    });

    let target = target_for(&server, "flaky");
    let mut prompter =
        ScriptedPrompter::new(vec![json!({"attempt": 1}), json!({"attempt": 2})]);
    let mut out = Vec::new();

    let outcome =
        run_invocation(&target, &mut prompter, &options(), &mut out).expect("invocation");

    assert_eq!(outcome, InvokeOutcome::Fatal("gave up".to_string()));
    rejected.assert_calls(1);
    fatal.assert_calls(1);
    let printed = String::from_utf8(out).expect("utf8");
    assert!(printed.contains("Error: bad bar"));
    assert!(printed.contains("Error: gave up"));
}

#[test]
fn integration_header_form_schema_drives_a_full_turn() {
    let server = MockServer::start();
    let wire = SchemaResponse {
        schema: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        instructions: Some("Where to?".to_string()),
        state: Some("hdr-1".to_string()),
        base: None,
        path: None,
    };
    let headers = wire.to_headers();
    server.mock(|when, mut then| {
        when.method(POST)
            .path("/function/travel")
            .json_body_includes(json!({"x-api-concierge-request": "schema"}).to_string());
        then = then.status(200).body("");
        for (name, value) in &headers {
            then = then.header(name, value);
        }
    });
    let done = server.mock(|when, then| {
        when.method(POST)
            .path("/function/travel")
            .json_body_includes(
                json!({
                    "x-api-concierge-request": "invoke",
                    "x-api-concierge-state": "hdr-1",
                    "city": "Zurich"
                })
                .to_string(),
            );
        then.status(200).json_body(json!({"booked": "Zurich"}));
    });

    let target = target_for(&server, "travel");
    let mut prompter = ScriptedPrompter::new(vec![json!({"city": "Zurich"})]);
    let mut out = Vec::new();

    let outcome =
        run_invocation(&target, &mut prompter, &options(), &mut out).expect("invocation");

    assert_eq!(outcome, InvokeOutcome::Completed(json!({"booked": "Zurich"})));
    done.assert_calls(1);
    let printed = String::from_utf8(out).expect("utf8");
    assert!(printed.contains("Where to?"));
}

#[test]
fn integration_seed_values_prefill_first_turn_fields() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/function/report")
            .json_body_includes(json!({"x-api-concierge-request": "schema"}).to_string());
        then.status(200).json_body(json!({
            "x-api-concierge-response": "schema",
            "x-api-concierge-schema": {"type": "object"}
        }));
    });
    let invoked = server.mock(|when, then| {
        when.method(POST)
            .path("/function/report")
            .json_body_includes(
                json!({"x-api-concierge-request": "invoke", "quarter": "Q3"}).to_string(),
            );
        then.status(200).json_body(json!("queued"));
    });

    let target = target_for(&server, "report");
    let mut prompter = ScriptedPrompter::new(vec![json!({})]);
    let mut seeded = options();
    seeded.seed.insert("/quarter", json!("Q3")).expect("seed");
    let mut out = Vec::new();

    let outcome =
        run_invocation(&target, &mut prompter, &seeded, &mut out).expect("invocation");

    assert_eq!(outcome, InvokeOutcome::Completed(json!("queued")));
    invoked.assert_calls(1);
}
