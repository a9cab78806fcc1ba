//! Client-side drivers for the interactive invocation protocol.
//!
//! Holds the transport boundary (`Target`), the prompt boundary
//! (`SchemaPrompter`), target-discovery helpers, and the state machine that
//! runs one logical invocation across however many turns the remote
//! function asks for.

mod discover;
mod listing;
mod prompt;
mod run;
mod target;
mod text;

pub use discover::{classify_marker, CandidateDecision, DiscoveredTarget};
pub use listing::render_target_listing;
pub use prompt::{PromptError, SchemaPrompter, SeedValues};
pub use run::{
    get_schema, run_invocation, GetSchemaOptions, InvokeError, InvokeOptions, InvokeOutcome,
};
pub use target::{InvokeReply, Target, TargetError};
pub use text::wrap_text;
