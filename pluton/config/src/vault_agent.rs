//! The Vault agent configuration file, rendered from an [`AgentConfig`].
//!
//! Field names follow Vault agent's own JSON configuration format, this is read by the agent
//! itself and not by us.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::agent::AgentConfig;

pub const TOKEN_SINK_PATH: &str = "/home/vault/.vault-token";
pub const PID_FILE: &str = "/home/vault/.pid";

/// Directory where rendered secrets end up, shared with the application containers.
pub const SECRETS_DIRECTORY: &str = "/vault/secrets";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VaultAgentConfig {
    pub auto_auth: AutoAuth,
    /// The init agent renders the templates once and exits, the sidecar keeps them fresh.
    pub exit_after_auth: bool,
    pub pid_file: String,
    pub vault: VaultServer,
    #[serde(rename = "template", skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<Template>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AutoAuth {
    pub method: Method,
    #[serde(rename = "sink")]
    pub sinks: Vec<Sink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Method {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mount_path: String,
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sink {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VaultServer {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tls_skip_verify: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Template {
    pub destination: String,
    pub contents: String,
}

fn default_template(path: &str) -> String {
    format!(
        r#"{{{{ with secret "{path}" }}}}{{{{ range $k, $v := .Data }}}}{{{{ $k }}}}: {{{{ $v }}}}
{{{{ end }}}}{{{{ end }}}}"#
    )
}

impl VaultAgentConfig {
    /// `init` makes the agent exit once authenticated, for an agent running as an init container.
    pub fn new(agent: &AgentConfig, init: bool) -> Self {
        let method = Method {
            kind: "kubernetes".to_owned(),
            mount_path: agent.vault.auth_path.clone(),
            config: BTreeMap::from([
                ("role".to_owned(), agent.vault.role.clone()),
                (
                    "token_path".to_owned(),
                    format!("{}/token", agent.service_account_path),
                ),
            ]),
        };

        let sink = Sink {
            kind: "file".to_owned(),
            config: BTreeMap::from([("path".to_owned(), TOKEN_SINK_PATH.to_owned())]),
        };

        let templates = agent
            .secrets
            .iter()
            .map(|secret| Template {
                destination: format!("{SECRETS_DIRECTORY}/{}", secret.name),
                contents: secret
                    .template
                    .clone()
                    .unwrap_or_else(|| default_template(&secret.path)),
            })
            .collect();

        VaultAgentConfig {
            auto_auth: AutoAuth {
                method,
                sinks: vec![sink],
            },
            exit_after_auth: init,
            pid_file: PID_FILE.to_owned(),
            vault: VaultServer {
                address: agent.vault.address.clone(),
                ca_cert: agent.vault.ca_cert().map(str::to_owned),
                tls_skip_verify: agent.vault.tls_skip_verify,
            },
            templates,
        }
    }

    /// JSON bytes, the format the agent expects in `VAULT_CONFIG`.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
