use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use tracing::trace;

use crate::{
    annotations::{self as keys, bool_annotation},
    defaults::InjectorDefaults,
    error::{ConfigError, Result},
};

/// Where the kubelet mounts the service account token in every container.
pub const SERVICE_ACCOUNT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Everything the injector needs to know about one pod's Vault agent.
///
/// Built from a snapshot of the pod with [`AgentConfig::from_pod`]. Optional strings that are
/// set to `""` behave exactly like unset ones, see the accessors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentConfig {
    /// Whether Vault integration is enabled for this pod.
    pub inject: bool,

    /// Config map holding the agent configuration. When set, the configuration is not embedded
    /// in the sidecar's environment.
    pub config_map_name: Option<String>,

    pub image_name: String,

    /// Name of the volume carrying the pod's service account token.
    pub service_account_name: String,

    /// Mount path of [`Self::service_account_name`].
    pub service_account_path: String,

    pub vault: VaultConfig,

    pub resources: ResourcesConfig,

    /// Appended verbatim, in this order, to the sidecar environment.
    pub extra_env: Vec<(String, String)>,

    pub secrets: Vec<Secret>,

    /// The pod's annotations, as seen when this config was built.
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VaultConfig {
    pub address: String,
    pub auth_path: String,
    pub role: String,
    pub ca_cert: Option<String>,
    pub tls_skip_verify: bool,
    /// Secret mounted into the sidecar with the TLS material for talking to Vault.
    pub tls_secret: Option<String>,
    /// Passed through to the agent as-is, never validated here.
    pub client_timeout: Option<String>,
    /// Passed through to the agent as-is, never validated here.
    pub client_max_retries: Option<String>,
}

/// Raw resource quantities, an empty string leaves that field unset on the container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourcesConfig {
    pub limits_cpu: String,
    pub limits_mem: String,
    pub requests_cpu: String,
    pub requests_mem: String,
}

/// A Vault secret rendered to `/vault/secrets/<name>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Secret {
    pub name: String,
    pub path: String,
    /// Custom consul-template, replaces the default key/value rendering.
    pub template: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

impl AgentConfig {
    /// Builds the agent configuration from the pod's annotations, falling back to `defaults`.
    ///
    /// The pod itself is only read.
    pub fn from_pod(pod: &Pod, defaults: &InjectorDefaults) -> Result<Self> {
        let spec = pod.spec.as_ref().ok_or(ConfigError::PodSpecNotFound)?;
        let annotations = pod.metadata.annotations.clone().unwrap_or_default();

        let (service_account_name, service_account_path) = spec
            .containers
            .iter()
            .flat_map(|container| container.volume_mounts.iter().flatten())
            .find(|mount| mount.mount_path == SERVICE_ACCOUNT_PATH)
            .map(|mount| (mount.name.clone(), mount.mount_path.clone()))
            .ok_or_else(|| ConfigError::ServiceAccountNotFound(SERVICE_ACCOUNT_PATH.to_owned()))?;

        let value_or = |key: &str, default: &str| {
            annotations
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_owned())
        };

        let vault = VaultConfig {
            address: value_or(keys::VAULT_SERVICE, &defaults.vault_address),
            auth_path: value_or(keys::VAULT_AUTH_PATH, &defaults.auth_path),
            role: value_or(keys::VAULT_ROLE, ""),
            ca_cert: annotations.get(keys::VAULT_CA_CERT).cloned(),
            tls_skip_verify: bool_annotation(&annotations, keys::VAULT_TLS_SKIP_VERIFY)?
                .unwrap_or_default(),
            tls_secret: annotations.get(keys::VAULT_TLS_SECRET).cloned(),
            client_timeout: annotations.get(keys::VAULT_CLIENT_TIMEOUT).cloned(),
            client_max_retries: annotations
                .get(keys::VAULT_CLIENT_MAX_RETRIES)
                .cloned(),
        };

        // An annotation explicitly set to "" wins over the default and leaves the field unset.
        let resources = ResourcesConfig {
            limits_cpu: value_or(keys::AGENT_LIMITS_CPU, &defaults.limits_cpu),
            limits_mem: value_or(keys::AGENT_LIMITS_MEM, &defaults.limits_mem),
            requests_cpu: value_or(keys::AGENT_REQUESTS_CPU, &defaults.requests_cpu),
            requests_mem: value_or(keys::AGENT_REQUESTS_MEM, &defaults.requests_mem),
        };

        let config = AgentConfig {
            inject: bool_annotation(&annotations, keys::AGENT_INJECT)?.unwrap_or_default(),
            config_map_name: annotations.get(keys::AGENT_CONFIG_MAP).cloned(),
            image_name: value_or(keys::AGENT_IMAGE, &defaults.image),
            service_account_name,
            service_account_path,
            vault,
            resources,
            extra_env: keys::agent_env(&annotations),
            secrets: keys::secrets(&annotations),
            annotations,
        };

        trace!(?config, "agent config built from pod annotations");

        Ok(config)
    }

    /// The external config map, if one is set and non-empty.
    pub fn config_map_name(&self) -> Option<&str> {
        non_empty(self.config_map_name.as_deref())
    }
}

impl VaultConfig {
    pub fn client_timeout(&self) -> Option<&str> {
        non_empty(self.client_timeout.as_deref())
    }

    pub fn client_max_retries(&self) -> Option<&str> {
        non_empty(self.client_max_retries.as_deref())
    }

    pub fn tls_secret(&self) -> Option<&str> {
        non_empty(self.tls_secret.as_deref())
    }

    pub fn ca_cert(&self) -> Option<&str> {
        non_empty(self.ca_cert.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::{
        api::core::v1::{Container, PodSpec, VolumeMount},
        apimachinery::pkg::apis::meta::v1::ObjectMeta,
    };
    use rstest::rstest;

    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> ObjectMeta {
        ObjectMeta {
            name: Some("app".to_string()),
            annotations: Some(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    fn pod(pairs: &[(&str, &str)]) -> Pod {
        Pod {
            metadata: meta(pairs),
            spec: Some(PodSpec {
                containers: vec![
                    Container {
                        name: "no-token".to_string(),
                        ..Default::default()
                    },
                    Container {
                        name: "app".to_string(),
                        volume_mounts: Some(vec![
                            VolumeMount {
                                name: "data".to_string(),
                                mount_path: "/data".to_string(),
                                ..Default::default()
                            },
                            VolumeMount {
                                name: "app-token-x1y2z".to_string(),
                                mount_path: SERVICE_ACCOUNT_PATH.to_string(),
                                read_only: Some(true),
                                ..Default::default()
                            },
                        ]),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply_without_annotations() {
        let defaults = InjectorDefaults::default();
        let config = AgentConfig::from_pod(&pod(&[]), &defaults).unwrap();

        assert!(!config.inject);
        assert_eq!(config.image_name, defaults.image);
        assert_eq!(config.service_account_name, "app-token-x1y2z");
        assert_eq!(config.service_account_path, SERVICE_ACCOUNT_PATH);
        assert_eq!(
            config.resources,
            ResourcesConfig {
                limits_cpu: "500m".to_string(),
                limits_mem: "128Mi".to_string(),
                requests_cpu: "250m".to_string(),
                requests_mem: "64Mi".to_string(),
            }
        );
        assert_eq!(config.config_map_name(), None);
        assert_eq!(config.vault.tls_secret(), None);
        assert!(config.extra_env.is_empty());
    }

    #[test]
    fn annotations_override_defaults() {
        let config = AgentConfig::from_pod(
            &pod(&[
                ("vault.hashicorp.com/agent-inject", "true"),
                ("vault.hashicorp.com/agent-image", "vault:custom"),
                ("vault.hashicorp.com/agent-limits-cpu", "1"),
                ("vault.hashicorp.com/agent-requests-mem", ""),
                ("vault.hashicorp.com/client-timeout", "30s"),
                ("vault.hashicorp.com/tls-secret", "vault-tls"),
                ("vault.hashicorp.com/role", "app"),
                ("pluton.io/agent-env-B", "2"),
                ("pluton.io/agent-env-A", "1"),
            ]),
            &InjectorDefaults::default(),
        )
        .unwrap();

        assert!(config.inject);
        assert_eq!(config.image_name, "vault:custom");
        assert_eq!(config.resources.limits_cpu, "1");
        assert_eq!(config.resources.requests_mem, "");
        assert_eq!(config.vault.client_timeout(), Some("30s"));
        assert_eq!(config.vault.client_max_retries(), None);
        assert_eq!(config.vault.tls_secret(), Some("vault-tls"));
        assert_eq!(config.vault.role, "app");
        assert_eq!(
            config.extra_env,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string())
            ]
        );
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("vault-agent-config"), Some("vault-agent-config"))]
    fn config_map_name_ignores_empty(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        let config = AgentConfig {
            config_map_name: raw.map(str::to_string),
            ..Default::default()
        };

        assert_eq!(config.config_map_name(), expected);
    }

    #[test]
    fn missing_service_account_mount() {
        let mut pod = pod(&[]);
        pod.spec.as_mut().unwrap().containers.truncate(1);

        assert!(matches!(
            AgentConfig::from_pod(&pod, &InjectorDefaults::default()),
            Err(ConfigError::ServiceAccountNotFound(_))
        ));
    }

    #[test]
    fn invalid_inject_flag() {
        assert!(matches!(
            AgentConfig::from_pod(
                &pod(&[("vault.hashicorp.com/agent-inject", "yes")]),
                &InjectorDefaults::default()
            ),
            Err(ConfigError::InvalidBool { .. })
        ));
    }

    #[test]
    fn missing_spec() {
        assert!(matches!(
            AgentConfig::from_pod(&Pod::default(), &InjectorDefaults::default()),
            Err(ConfigError::PodSpecNotFound)
        ));
    }
}
