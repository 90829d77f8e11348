use k8s_openapi::api::core::v1::VolumeMount;
use pluton_config::{vault_agent::SECRETS_DIRECTORY, AgentConfig};

/// Shared with the application containers, the agent writes rendered secrets here.
pub const SECRET_VOLUME_NAME: &str = "vault-secrets";
pub const SECRET_VOLUME_PATH: &str = SECRETS_DIRECTORY;

pub const TLS_SECRET_VOLUME_NAME: &str = "vault-tls-secrets";
pub const TLS_SECRET_VOLUME_PATH: &str = "/vault/tls";

/// Volume mounts of the Vault sidecar: the secrets volume, the service account token and, when
/// the agent has a TLS secret, the TLS volume (always last).
pub fn plan_mounts(agent: &AgentConfig) -> Vec<VolumeMount> {
    let mut mounts = vec![
        VolumeMount {
            name: SECRET_VOLUME_NAME.to_owned(),
            mount_path: SECRET_VOLUME_PATH.to_owned(),
            ..Default::default()
        },
        VolumeMount {
            name: agent.service_account_name.clone(),
            mount_path: agent.service_account_path.clone(),
            read_only: Some(true),
            ..Default::default()
        },
    ];

    if agent.vault.tls_secret().is_some() {
        mounts.push(VolumeMount {
            name: TLS_SECRET_VOLUME_NAME.to_owned(),
            mount_path: TLS_SECRET_VOLUME_PATH.to_owned(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    mounts
}
