/// <https://kubernetes.io/docs/concepts/configuration/manage-resources-containers/#meaning-of-cpu>
pub const DEFAULT_RESOURCE_LIMIT_CPU: &str = "500m";
pub const DEFAULT_RESOURCE_LIMIT_MEM: &str = "128Mi";
pub const DEFAULT_RESOURCE_REQUEST_CPU: &str = "250m";
pub const DEFAULT_RESOURCE_REQUEST_MEM: &str = "64Mi";

pub const DEFAULT_AGENT_IMAGE: &str = "pluton/vault-agent:latest";
pub const DEFAULT_VAULT_ADDRESS: &str = "https://vault.vault.svc:8200";
pub const DEFAULT_AUTH_PATH: &str = "auth/kubernetes";

/// Injector-wide values used when a pod does not override them through annotations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectorDefaults {
    pub image: String,
    pub vault_address: String,
    pub auth_path: String,
    pub limits_cpu: String,
    pub limits_mem: String,
    pub requests_cpu: String,
    pub requests_mem: String,
}

impl Default for InjectorDefaults {
    fn default() -> Self {
        InjectorDefaults {
            image: DEFAULT_AGENT_IMAGE.to_owned(),
            vault_address: DEFAULT_VAULT_ADDRESS.to_owned(),
            auth_path: DEFAULT_AUTH_PATH.to_owned(),
            limits_cpu: DEFAULT_RESOURCE_LIMIT_CPU.to_owned(),
            limits_mem: DEFAULT_RESOURCE_LIMIT_MEM.to_owned(),
            requests_cpu: DEFAULT_RESOURCE_REQUEST_CPU.to_owned(),
            requests_mem: DEFAULT_RESOURCE_REQUEST_MEM.to_owned(),
        }
    }
}
