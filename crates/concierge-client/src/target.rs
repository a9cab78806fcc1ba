use serde_json::Value;
use thiserror::Error;

use concierge_protocol::{
    ErrorResponse, InvocationRequest, ProtocolError, SchemaRequest, SchemaResponse,
};

#[derive(Debug, Clone, PartialEq)]
/// What a remote function handed back from one invocation.
pub enum InvokeReply {
    /// The function wants another turn of structured input.
    Schema(SchemaResponse),
    /// The function rejected the input; recoverable when it carries a schema.
    Error(ErrorResponse),
    /// An opaque application result; the invocation is finished.
    Result(Value),
}

#[derive(Debug, Error)]
/// Failures surfaced by a transport while talking to a remote function.
pub enum TargetError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The call itself failed outside the protocol, e.g. the callee raised
    /// an uncaught fault or the transport could not reach it.
    #[error("{0}")]
    Request(String),
}

/// One remote callable function, reachable over some transport.
///
/// Implementations are blocking; the invocation loop performs exactly one
/// target call per turn and imposes no timeout of its own.
pub trait Target {
    fn name(&self) -> String;

    fn description(&self) -> Option<String>;

    fn request_schema(&self, request: &SchemaRequest) -> Result<SchemaResponse, TargetError>;

    fn invoke(&self, request: &InvocationRequest) -> Result<InvokeReply, TargetError>;

    /// Renders the outgoing request the way this transport will send it,
    /// for `--show-event` output.
    fn render_request(&self, request: &InvocationRequest) -> String {
        serde_json::to_string_pretty(&request.to_payload()).unwrap_or_default()
    }

    fn render_response(&self, response: &Value) -> String {
        serde_json::to_string_pretty(response).unwrap_or_default()
    }
}
