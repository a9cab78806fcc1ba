use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value;

use concierge_client::SeedValues;
use concierge_gateway::DiscoverySources;

#[derive(Debug, Parser)]
#[command(
    name = "concierge",
    about = "Discover, fill in, and invoke remote functions that describe their own input",
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "CONCIERGE_GATEWAY_URL",
        default_value = "http://127.0.0.1:8080",
        help = "Base URL of the function gateway"
    )]
    pub gateway: String,

    #[arg(
        long = "gateway-token",
        global = true,
        env = "CONCIERGE_GATEWAY_TOKEN",
        help = "Bearer token for gateway requests"
    )]
    pub gateway_token: Option<String>,

    #[arg(
        long = "timeout-ms",
        global = true,
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout in milliseconds"
    )]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full interactive invocation loop against one function
    Invoke(InvokeArgs),
    /// Fetch and print a function's input schema without invoking it
    GetSchema(GetSchemaArgs),
    /// Enumerate discoverable functions
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct InvokeArgs {
    #[arg(help = "Function name, or a full invoke URL")]
    pub function: String,

    #[arg(
        long = "set",
        num_args = 2,
        value_names = ["JSON_POINTER", "VALUE"],
        action = ArgAction::Append,
        help = "Pre-fill one location of the first prompt; VALUE is JSON-parsed when possible, else taken as a raw string"
    )]
    pub set: Vec<String>,

    #[arg(long = "show-schema", action = ArgAction::SetTrue, overrides_with = "no_show_schema",
        help = "Print each turn's schema before prompting")]
    show_schema: bool,
    #[arg(long = "no-show-schema", action = ArgAction::SetTrue, hide = true)]
    no_show_schema: bool,

    #[arg(long = "show-event", action = ArgAction::SetTrue, overrides_with = "no_show_event",
        help = "Print each invocation request as it is sent")]
    show_event: bool,
    #[arg(long = "no-show-event", action = ArgAction::SetTrue, hide = true)]
    no_show_event: bool,
}

impl InvokeArgs {
    pub fn show_schema(&self) -> bool {
        self.show_schema && !self.no_show_schema
    }

    pub fn show_event(&self) -> bool {
        self.show_event && !self.no_show_event
    }

    /// Folds the flattened `--set POINTER VALUE` pairs into seed values,
    /// validating each pointer up front.
    pub fn seed_values(&self) -> Result<SeedValues, String> {
        let mut seed = SeedValues::new();
        for pair in self.set.chunks(2) {
            let [pointer, raw] = pair else {
                // clap's num_args = 2 makes an odd chunk unreachable.
                return Err("--set requires a pointer and a value".to_string());
            };
            let value = serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| Value::String(raw.clone()));
            seed.insert(pointer, value)
                .map_err(|error| error.to_string())?;
        }
        Ok(seed)
    }
}

#[derive(Debug, Args)]
pub struct GetSchemaArgs {
    #[arg(help = "Function name, or a full invoke URL")]
    pub function: String,

    #[arg(long = "show-all", action = ArgAction::SetTrue, overrides_with = "schema_only",
        help = "Also print instructions, state, base, and path")]
    show_all: bool,
    #[arg(long = "schema-only", action = ArgAction::SetTrue, hide = true)]
    schema_only: bool,
}

impl GetSchemaArgs {
    pub fn show_all(&self) -> bool {
        self.show_all && !self.schema_only
    }
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long = "tags", action = ArgAction::SetTrue, overrides_with = "no_tags",
        help = "Include functions marked via gateway labels")]
    tags: bool,
    #[arg(long = "no-tags", action = ArgAction::SetTrue, hide = true)]
    no_tags: bool,

    #[arg(long = "env", action = ArgAction::SetTrue, overrides_with = "no_env",
        help = "Include functions marked via declared environment variables")]
    env: bool,
    #[arg(long = "no-env", action = ArgAction::SetTrue, hide = true)]
    no_env: bool,

    #[arg(long = "ssm", action = ArgAction::SetTrue, overrides_with = "no_ssm",
        help = "Include functions marked in the gateway parameter store")]
    ssm: bool,
    #[arg(long = "no-ssm", action = ArgAction::SetTrue, hide = true)]
    no_ssm: bool,
}

impl ListArgs {
    /// No explicit selection means every source; any explicit flag narrows
    /// the set to the sources switched on.
    pub fn sources(&self) -> DiscoverySources {
        let selected = [
            self.tags,
            self.no_tags,
            self.env,
            self.no_env,
            self.ssm,
            self.no_ssm,
        ]
        .iter()
        .any(|flag| *flag);
        if !selected {
            return DiscoverySources::all();
        }
        DiscoverySources {
            tags: self.tags && !self.no_tags,
            env: self.env && !self.no_env,
            ssm: self.ssm && !self.no_ssm,
        }
    }
}
