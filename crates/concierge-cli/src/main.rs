mod cli_args;
mod prompter;

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use concierge_client::{
    get_schema, render_target_listing, run_invocation, GetSchemaOptions, InvokeOptions,
    InvokeOutcome,
};
use concierge_gateway::{discover_targets, GatewayConfig, GatewayTarget};

use crate::cli_args::{Cli, Command, GetSchemaArgs, InvokeArgs, ListArgs};
use crate::prompter::InteractivePrompter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_FATAL_RESPONSE: i32 = 2;

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn client_identity() -> String {
    format!("concierge-cli {}", env!("CARGO_PKG_VERSION"))
}

fn gateway_config(cli: &Cli) -> GatewayConfig {
    GatewayConfig {
        base_url: cli.gateway.clone(),
        api_token: cli.gateway_token.clone(),
        timeout_ms: cli.timeout_ms,
    }
}

fn run_invoke(cli: &Cli, args: &InvokeArgs) -> Result<i32> {
    let seed = args
        .seed_values()
        .map_err(|error| anyhow::anyhow!(error))?;
    let target = GatewayTarget::new(gateway_config(cli), args.function.clone())?;
    let mut prompter = InteractivePrompter::new()?;
    let options = InvokeOptions {
        client: client_identity(),
        seed,
        show_schema: args.show_schema(),
        show_event: args.show_event(),
    };

    let mut stdout = io::stdout().lock();
    let outcome = run_invocation(&target, &mut prompter, &options, &mut stdout)?;
    stdout.flush()?;
    match outcome {
        InvokeOutcome::Completed(_) => Ok(EXIT_SUCCESS),
        InvokeOutcome::Fatal(_) => Ok(EXIT_FATAL_RESPONSE),
    }
}

fn run_get_schema(cli: &Cli, args: &GetSchemaArgs) -> Result<i32> {
    let target = GatewayTarget::new(gateway_config(cli), args.function.clone())?;
    let options = GetSchemaOptions {
        client: client_identity(),
        show_all: args.show_all(),
    };
    let mut stdout = io::stdout().lock();
    get_schema(&target, &options, &mut stdout)?;
    stdout.flush()?;
    Ok(EXIT_SUCCESS)
}

fn run_list(cli: &Cli, args: &ListArgs) -> Result<i32> {
    let targets = discover_targets(&gateway_config(cli), args.sources())?;
    let mut stdout = io::stdout().lock();
    render_target_listing(&targets, &mut stdout)?;
    stdout.flush()?;
    Ok(EXIT_SUCCESS)
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Command::Invoke(args) => run_invoke(cli, args),
        Command::GetSchema(args) => run_get_schema(cli, args),
        Command::List(args) => run_list(cli, args),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(EXIT_ERROR);
        }
    }
}
