//! Pod annotations understood by the injector.
//!
//! The Vault related keys follow the `vault.hashicorp.com/` naming used by the upstream Vault
//! injector, so existing workloads keep working. Keys under `pluton.io/` are ours.

use std::{collections::BTreeMap, ops::Bound};

use crate::{
    agent::Secret,
    error::{ConfigError, Result},
};

pub const AGENT_INJECT: &str = "vault.hashicorp.com/agent-inject";
pub const AGENT_IMAGE: &str = "vault.hashicorp.com/agent-image";
pub const AGENT_CONFIG_MAP: &str = "vault.hashicorp.com/agent-configmap";
pub const AGENT_LIMITS_CPU: &str = "vault.hashicorp.com/agent-limits-cpu";
pub const AGENT_LIMITS_MEM: &str = "vault.hashicorp.com/agent-limits-mem";
pub const AGENT_REQUESTS_CPU: &str = "vault.hashicorp.com/agent-requests-cpu";
pub const AGENT_REQUESTS_MEM: &str = "vault.hashicorp.com/agent-requests-mem";
pub const AGENT_INJECT_SECRET_PREFIX: &str = "vault.hashicorp.com/agent-inject-secret-";
pub const AGENT_INJECT_TEMPLATE_PREFIX: &str = "vault.hashicorp.com/agent-inject-template-";

pub const VAULT_SERVICE: &str = "vault.hashicorp.com/service";
pub const VAULT_ROLE: &str = "vault.hashicorp.com/role";
pub const VAULT_AUTH_PATH: &str = "vault.hashicorp.com/auth-path";
pub const VAULT_CA_CERT: &str = "vault.hashicorp.com/ca-cert";
pub const VAULT_TLS_SECRET: &str = "vault.hashicorp.com/tls-secret";
pub const VAULT_TLS_SKIP_VERIFY: &str = "vault.hashicorp.com/tls-skip-verify";
pub const VAULT_CLIENT_TIMEOUT: &str = "vault.hashicorp.com/client-timeout";
pub const VAULT_CLIENT_MAX_RETRIES: &str = "vault.hashicorp.com/client-max-retries";

/// Every `pluton.io/agent-env-<NAME>: <value>` becomes `<NAME>=<value>` on the Vault sidecar.
pub const AGENT_ENV_PREFIX: &str = "pluton.io/agent-env-";

/// Every `pluton.io/istio-env-<NAME>: <value>` becomes `<NAME>=<value>` on the istio init
/// container.
pub const ISTIO_ENV_PREFIX: &str = "pluton.io/istio-env-";

/// Pairs of `(suffix, value)` for all annotations starting with `prefix`, in key order.
///
/// Annotations that are exactly `prefix` (empty suffix) are skipped.
pub fn prefixed<'a>(
    annotations: &'a BTreeMap<String, String>,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    annotations
        .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .map_while(move |(key, value)| {
            key.strip_prefix(prefix)
                .map(|suffix| (suffix, value.as_str()))
        })
        .filter(|(suffix, _)| !suffix.is_empty())
}

/// Extra environment for the Vault sidecar, see [`AGENT_ENV_PREFIX`].
pub fn agent_env(annotations: &BTreeMap<String, String>) -> Vec<(String, String)> {
    prefixed(annotations, AGENT_ENV_PREFIX)
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect()
}

/// Environment for the istio init container, see [`ISTIO_ENV_PREFIX`].
pub fn istio_env(annotations: &BTreeMap<String, String>) -> Vec<(String, String)> {
    prefixed(annotations, ISTIO_ENV_PREFIX)
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect()
}

/// Secrets requested with `agent-inject-secret-<name>: <path>`, ordered by name.
///
/// A matching `agent-inject-template-<name>` replaces the default rendering of that secret. A
/// template without its secret annotation is ignored.
pub fn secrets(annotations: &BTreeMap<String, String>) -> Vec<Secret> {
    prefixed(annotations, AGENT_INJECT_SECRET_PREFIX)
        .map(|(name, path)| Secret {
            name: name.to_owned(),
            path: path.to_owned(),
            template: annotations
                .get(&format!("{AGENT_INJECT_TEMPLATE_PREFIX}{name}"))
                .cloned(),
        })
        .collect()
}

/// Reads a boolean annotation, `None` when it is not set.
///
/// Accepts the same spellings as Go's `strconv.ParseBool`, since that is what people are used
/// to writing in these annotations.
pub fn bool_annotation(annotations: &BTreeMap<String, String>, key: &str) -> Result<Option<bool>> {
    let Some(value) = annotations.get(key) else {
        return Ok(None);
    };

    match value.as_str() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(Some(true)),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_owned(),
            value: value.clone(),
        }),
    }
}
