use std::io::Write;

use serde_json::Value;
use thiserror::Error;

use concierge_protocol::{combine, InvocationRequest, ProtocolError, SchemaRequest};

use crate::prompt::{PromptError, SchemaPrompter, SeedValues};
use crate::target::{InvokeReply, Target, TargetError};
use crate::text::wrap_text;

const INSTRUCTIONS_WRAP_WIDTH: usize = 70;

#[derive(Debug, Error)]
/// Failures that abort an invocation before a terminal protocol outcome.
pub enum InvokeError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
/// Terminal result of a full invocation loop.
pub enum InvokeOutcome {
    /// The function produced an opaque, non-protocol result.
    Completed(Value),
    /// The function reported an error with no recovery schema.
    Fatal(String),
}

#[derive(Debug, Clone)]
/// Per-invocation settings threaded through the loop.
pub struct InvokeOptions {
    pub client: String,
    pub seed: SeedValues,
    pub show_schema: bool,
    pub show_event: bool,
}

/// Drives one logical invocation: request the initial schema, then loop
/// prompt → combine → invoke → interpret until the function returns an
/// opaque result or an unrecoverable error.
///
/// The seed values are offered on the first turn only. The state token from
/// each schema response is copied into the next request uninspected.
pub fn run_invocation(
    target: &dyn Target,
    prompter: &mut dyn SchemaPrompter,
    options: &InvokeOptions,
    out: &mut dyn Write,
) -> Result<InvokeOutcome, InvokeError> {
    let schema_request = SchemaRequest::new(options.client.clone());
    let mut current = target.request_schema(&schema_request)?;
    let empty_seed = SeedValues::new();

    let mut turn: u64 = 0;
    loop {
        turn += 1;
        if turn > 1 {
            writeln!(out, "\n----")?;
        }
        if options.show_schema {
            writeln!(out, "Schema:")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&current.schema)?)?;
            writeln!(out)?;
        }
        if let Some(instructions) = current.instructions.as_deref() {
            writeln!(
                out,
                "{}",
                wrap_text(instructions.trim_end(), INSTRUCTIONS_WRAP_WIDTH)
            )?;
        }

        let seed = if turn == 1 { &options.seed } else { &empty_seed };
        let value = prompter.prompt(&current.schema, seed)?;
        let payload = combine(current.base.as_ref(), current.path.as_deref(), value)?;
        let request =
            InvocationRequest::new(payload, options.client.clone(), current.state.clone())?;
        if options.show_event {
            writeln!(out)?;
            writeln!(out, "Invocation request:")?;
            writeln!(out, "{}", target.render_request(&request))?;
        }

        tracing::debug!(turn, "invoking target");
        match target.invoke(&request)? {
            InvokeReply::Error(error) => {
                writeln!(out, "Error: {}", error.error_message)?;
                match error.to_schema_response() {
                    Some(next) => {
                        tracing::debug!(turn, "recoverable error, re-prompting");
                        current = next;
                    }
                    None => return Ok(InvokeOutcome::Fatal(error.error_message)),
                }
            }
            InvokeReply::Schema(next) => {
                tracing::debug!(turn, "target requested another turn");
                current = next;
            }
            InvokeReply::Result(value) => {
                writeln!(out)?;
                writeln!(out, "Invocation response:")?;
                writeln!(out, "{}", target.render_response(&value))?;
                return Ok(InvokeOutcome::Completed(value));
            }
        }
    }
}

#[derive(Debug, Clone)]
/// Settings for a one-shot schema fetch.
pub struct GetSchemaOptions {
    pub client: String,
    pub show_all: bool,
}

/// Performs a single schema request and prints the result without invoking.
pub fn get_schema(
    target: &dyn Target,
    options: &GetSchemaOptions,
    out: &mut dyn Write,
) -> Result<(), InvokeError> {
    let request = SchemaRequest::new(options.client.clone());
    let response = target.request_schema(&request)?;

    if !options.show_all {
        writeln!(out, "{}", serde_json::to_string_pretty(&response.schema)?)?;
        return Ok(());
    }

    if let Some(instructions) = response.instructions.as_deref() {
        writeln!(
            out,
            "{}",
            wrap_text(
                &format!("Instructions: {instructions}"),
                INSTRUCTIONS_WRAP_WIDTH
            )
        )?;
    }
    if let Some(state) = response.state.as_deref() {
        writeln!(out, "State: {state}")?;
    }
    if let Some(base) = &response.base {
        writeln!(out, "Base:")?;
        writeln!(out, "{}", serde_json::to_string_pretty(base)?)?;
        if let Some(path) = response.path.as_deref() {
            writeln!(out, "Path: {path:?}")?;
        }
    }
    writeln!(out, "Schema:")?;
    writeln!(out, "{}", serde_json::to_string_pretty(&response.schema)?)?;
    Ok(())
}
