//! Function-gateway transport for the invocation protocol.
//!
//! Talks to a remote function gateway over blocking HTTP: `POST
//! /function/{name}` carries the payload-form envelope, and responses may
//! come back either as JSON bodies or as flat `x-api-concierge-*` headers.
//! Also enumerates discoverable functions from the gateway's tag, env, and
//! parameter-store sources.

mod discovery;
mod http;

pub use discovery::{discover_targets, DiscoverySources, DISCOVERY_MARKER_KEY, PARAMETER_PREFIX};
pub use http::{GatewayConfig, GatewayTarget};
