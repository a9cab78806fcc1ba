//! Wire-level protocol for schema-driven interactive invocation.
//!
//! Defines the reserved envelope fields, the four protocol messages
//! (schema request/response, invocation request, error response), the
//! payload-form and header-form codecs, and the merge engine that folds
//! newly collected values into the accumulated base document.

mod envelope;
mod error;
mod merge;

pub use envelope::{
    header_response_kind, ErrorResponse, InvocationRequest, SchemaRequest, SchemaResponse,
    BASE_FIELD, CLIENT_FIELD,
    ERROR_FIELD, FIELD_PREFIX, INSTRUCTIONS_FIELD, PATH_FIELD, REQUEST_FIELD, RESPONSE_FIELD,
    SCHEMA_FIELD, STATE_FIELD,
};
pub use error::ProtocolError;
pub use merge::{combine, deep_merge, JsonPointer};
