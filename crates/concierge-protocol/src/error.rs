use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures raised while encoding or decoding protocol envelopes.
pub enum ProtocolError {
    #[error("invalid schema: embedded schema or base document could not be base64/JSON-decoded")]
    InvalidSchema,
    #[error("invalid schema response: envelope carries no schema field")]
    InvalidSchemaResponse,
    #[error("invalid error response: envelope carries no error message")]
    InvalidErrorResponse,
    #[error("invalid state: payload must be a JSON object when a state token is set")]
    InvalidState,
    #[error("invalid JSON pointer '{pointer}': {reason}")]
    InvalidPointer { pointer: String, reason: String },
}
