use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::Deserialize;

use concierge_client::{classify_marker, CandidateDecision, DiscoveredTarget, TargetError};

use crate::http::GatewayConfig;

/// Label, env-var, and parameter key that marks a function as discoverable.
pub const DISCOVERY_MARKER_KEY: &str = "api-concierge";
/// Parameter-store namespace holding one entry per discoverable function.
pub const PARAMETER_PREFIX: &str = "/api-concierge/";

#[derive(Debug, Clone, Copy)]
/// Which discovery sources to consult.
pub struct DiscoverySources {
    pub tags: bool,
    pub env: bool,
    pub ssm: bool,
}

impl DiscoverySources {
    pub fn all() -> Self {
        Self {
            tags: true,
            env: true,
            ssm: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FunctionRecord {
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ParameterRecord {
    name: String,
    value: String,
}

/// Enumerates discoverable functions from the selected sources, in source
/// order (tags, env, parameter store), deduplicated by function name; the
/// first source to surface a function wins.
pub fn discover_targets(
    config: &GatewayConfig,
    sources: DiscoverySources,
) -> Result<Vec<DiscoveredTarget>, TargetError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
        .map_err(|error| TargetError::Request(format!("failed to build client: {error}")))?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut discovered = Vec::new();

    let functions = if sources.tags || sources.env {
        fetch_functions(&client, config)?
    } else {
        Vec::new()
    };

    if sources.tags {
        for function in &functions {
            let Some(marker) = function.labels.get(DISCOVERY_MARKER_KEY) else {
                continue;
            };
            push_candidate(&mut discovered, &mut seen, &function.name, marker);
        }
    }
    if sources.env {
        for function in &functions {
            let Some(marker) = function.env.get(DISCOVERY_MARKER_KEY) else {
                continue;
            };
            push_candidate(&mut discovered, &mut seen, &function.name, marker);
        }
    }
    if sources.ssm {
        for parameter in fetch_parameters(&client, config)? {
            let Some(name) = parameter.name.strip_prefix(PARAMETER_PREFIX) else {
                tracing::debug!(parameter = %parameter.name, "ignoring parameter outside namespace");
                continue;
            };
            push_candidate(&mut discovered, &mut seen, name, &parameter.value);
        }
    }

    Ok(discovered)
}

fn push_candidate(
    discovered: &mut Vec<DiscoveredTarget>,
    seen: &mut HashSet<String>,
    name: &str,
    marker: &str,
) {
    if seen.contains(name) {
        return;
    }
    seen.insert(name.to_string());
    match classify_marker(marker) {
        CandidateDecision::Keep { description } => discovered.push(DiscoveredTarget {
            name: name.to_string(),
            description,
        }),
        CandidateDecision::Skip => {}
    }
}

fn fetch_functions(
    client: &reqwest::blocking::Client,
    config: &GatewayConfig,
) -> Result<Vec<FunctionRecord>, TargetError> {
    let url = format!(
        "{}/system/functions",
        config.base_url.trim_end_matches('/')
    );
    fetch_json(client, config, &url)
}

fn fetch_parameters(
    client: &reqwest::blocking::Client,
    config: &GatewayConfig,
) -> Result<Vec<ParameterRecord>, TargetError> {
    let url = format!(
        "{}/system/parameters?prefix={}",
        config.base_url.trim_end_matches('/'),
        PARAMETER_PREFIX
    );
    fetch_json(client, config, &url)
}

fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::blocking::Client,
    config: &GatewayConfig,
    url: &str,
) -> Result<T, TargetError> {
    let mut request = client.get(url);
    if let Some(token) = config.api_token.as_deref() {
        request = request.bearer_auth(token);
    }
    let response = request
        .send()
        .map_err(|error| TargetError::Request(format!("discovery request failed: {error}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(TargetError::Request(format!(
            "discovery request returned status {status}"
        )));
    }
    response
        .json()
        .map_err(|error| TargetError::Request(format!("invalid discovery listing: {error}")))
}
