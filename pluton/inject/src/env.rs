//! Environment of the injected containers.
//!
//! Variable names are read by the agent images and by external tooling, they must not change.
//! The order of the variables is stable for identical inputs, reconciliation diffs the rendered
//! containers.

use std::collections::BTreeMap;

use base64::prelude::*;
use k8s_openapi::api::core::v1::EnvVar;
use pluton_config::{annotations::istio_env, vault_agent::VaultAgentConfig, AgentConfig};
use tracing::trace;

use crate::error::{InjectError, Result};

pub const VAULT_CLIENT_TIMEOUT_ENV: &str = "VAULT_CLIENT_TIMEOUT";
pub const VAULT_MAX_RETRIES_ENV: &str = "VAULT_MAX_RETRIES";
pub const VAULT_ENABLED_ENV: &str = "VAULT_ENABLED";
pub const VAULT_CONFIG_ENV: &str = "VAULT_CONFIG";
pub const ISTIO_INIT_ENABLED_ENV: &str = "ISTIO_INIT_ENABLED";

/// Set on the Vault sidecar when the pod already runs the pluton companion, which ships its own
/// telemetry agent.
pub const TELEMETRY_DISABLED_ENV: &str = "PLUTON_TELEMETRY_DISABLED";

/// Set on the Vault sidecar when the pod already runs the pluton companion, which ships its own
/// metrics agent.
pub const METRICS_DISABLED_ENV: &str = "PLUTON_METRICS_DISABLED";

/// Produces the bytes embedded (base64 encoded) in [`VAULT_CONFIG_ENV`].
pub trait ConfigSerializer {
    type Error: std::error::Error + Send + Sync + 'static;

    /// `init` is `true` when the agent runs as an init container.
    fn serialize(&self, agent: &AgentConfig, init: bool) -> Result<Vec<u8>, Self::Error>;
}

/// Renders [`VaultAgentConfig`] as JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonConfigSerializer;

impl ConfigSerializer for JsonConfigSerializer {
    type Error = serde_json::Error;

    fn serialize(&self, agent: &AgentConfig, init: bool) -> Result<Vec<u8>, Self::Error> {
        VaultAgentConfig::new(agent, init).to_json()
    }
}

struct EnvContext<'a, S> {
    agent: &'a AgentConfig,
    serializer: &'a S,
    init_mode: bool,
    companion_exists: bool,
}

type EnvPairs = Vec<(String, String)>;

/// One step of the sidecar environment, empty when it doesn't apply.
type EnvStep<S> = fn(&EnvContext<'_, S>) -> Result<EnvPairs>;

fn pair(name: &str, value: impl Into<String>) -> (String, String) {
    (name.to_owned(), value.into())
}

fn client_timeout<S>(context: &EnvContext<'_, S>) -> Result<EnvPairs> {
    Ok(context
        .agent
        .vault
        .client_timeout()
        .map(|timeout| pair(VAULT_CLIENT_TIMEOUT_ENV, timeout))
        .into_iter()
        .collect())
}

fn max_retries<S>(context: &EnvContext<'_, S>) -> Result<EnvPairs> {
    Ok(context
        .agent
        .vault
        .client_max_retries()
        .map(|retries| pair(VAULT_MAX_RETRIES_ENV, retries))
        .into_iter()
        .collect())
}

fn vault_enabled<S>(context: &EnvContext<'_, S>) -> Result<EnvPairs> {
    Ok(context
        .agent
        .inject
        .then(|| pair(VAULT_ENABLED_ENV, "true"))
        .into_iter()
        .collect())
}

fn vault_config<S: ConfigSerializer>(context: &EnvContext<'_, S>) -> Result<EnvPairs> {
    if context.agent.config_map_name().is_some() {
        return Ok(Vec::new());
    }

    let config = context
        .serializer
        .serialize(context.agent, context.init_mode)
        .map_err(|error| InjectError::ConfigSerialization(Box::new(error)))?;

    Ok(vec![pair(VAULT_CONFIG_ENV, BASE64_STANDARD.encode(config))])
}

fn extra_env<S>(context: &EnvContext<'_, S>) -> Result<EnvPairs> {
    Ok(context.agent.extra_env.clone())
}

fn companion_flags<S>(context: &EnvContext<'_, S>) -> Result<EnvPairs> {
    Ok(if context.companion_exists {
        vec![
            pair(TELEMETRY_DISABLED_ENV, "true"),
            pair(METRICS_DISABLED_ENV, "true"),
        ]
    } else {
        Vec::new()
    })
}

fn into_env_vars(pairs: impl IntoIterator<Item = (String, String)>) -> Vec<EnvVar> {
    pairs
        .into_iter()
        .map(|(name, value)| EnvVar {
            name,
            value: Some(value),
            ..Default::default()
        })
        .collect()
}

/// Builds the Vault sidecar environment.
///
/// The steps run in this order, each one appending zero or more variables:
///
/// 1. [`VAULT_CLIENT_TIMEOUT_ENV`] if a client timeout is set;
/// 2. [`VAULT_MAX_RETRIES_ENV`] if client max retries are set;
/// 3. [`VAULT_ENABLED_ENV`] if injection is enabled;
/// 4. [`VAULT_CONFIG_ENV`] with the serialized agent config, unless the agent reads its config
///    from a config map;
/// 5. the agent's extra environment, verbatim;
/// 6. [`TELEMETRY_DISABLED_ENV`] and [`METRICS_DISABLED_ENV`] if the companion container exists.
///
/// A serializer failure stops at step 4. Names may repeat, nothing is deduplicated.
///
/// `init_mode` is forwarded to the serializer. The containers built by this crate always pass
/// `false`, no Vault agent init container is built here.
pub fn sidecar_env<S: ConfigSerializer>(
    agent: &AgentConfig,
    serializer: &S,
    init_mode: bool,
    companion_exists: bool,
) -> Result<Vec<EnvVar>> {
    let context = EnvContext {
        agent,
        serializer,
        init_mode,
        companion_exists,
    };

    let steps: [EnvStep<S>; 6] = [
        client_timeout,
        max_retries,
        vault_enabled,
        vault_config,
        extra_env,
        companion_flags,
    ];

    let pairs = steps
        .iter()
        .map(|step| step(&context))
        .collect::<Result<Vec<_>>>()?;

    let env = into_env_vars(pairs.into_iter().flatten());
    trace!(count = env.len(), "sidecar env assembled");

    Ok(env)
}

/// Builds the istio init container environment: [`ISTIO_INIT_ENABLED_ENV`] first, then the
/// variables requested through annotations, see [`istio_env`].
pub fn init_env(annotations: &BTreeMap<String, String>) -> Vec<EnvVar> {
    into_env_vars(
        std::iter::once(pair(ISTIO_INIT_ENABLED_ENV, "true")).chain(istio_env(annotations)),
    )
}
