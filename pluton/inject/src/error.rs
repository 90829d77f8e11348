use std::fmt;

use thiserror::Error;

use crate::quantity::QuantityError;

pub type Result<T, E = InjectError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("Failed to serialize the Vault agent config: {0}")]
    ConfigSerialization(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid quantity `{raw}` for `{field}`: {source}")]
    InvalidQuantity {
        field: ResourceField,
        raw: String,
        #[source]
        source: QuantityError,
    },

    #[error("Could not read config map `{name}` from namespace `{namespace}`: {source}")]
    ConfigMapNotFound {
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("Missing configuration map key `{key}` in `{config_map}`")]
    MissingConfigMapKey {
        key: &'static str,
        config_map: String,
    },

    #[error("Unable to convert data from config map `{config_map}`: {source}")]
    MalformedConfigMap {
        config_map: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Mesh config in `{0}` is not a mapping")]
    MeshConfigNotMapping(String),

    #[error("Injection engine failed: {0}")]
    InjectionEngine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// One of the four raw quantities an agent can configure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceField {
    LimitsCpu,
    LimitsMemory,
    RequestsCpu,
    RequestsMemory,
}

impl ResourceField {
    /// Key of this field in a Kubernetes `ResourceList`.
    pub fn resource_name(self) -> &'static str {
        match self {
            ResourceField::LimitsCpu | ResourceField::RequestsCpu => "cpu",
            ResourceField::LimitsMemory | ResourceField::RequestsMemory => "memory",
        }
    }
}

impl fmt::Display for ResourceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceField::LimitsCpu => write!(f, "limits.cpu"),
            ResourceField::LimitsMemory => write!(f, "limits.memory"),
            ResourceField::RequestsCpu => write!(f, "requests.cpu"),
            ResourceField::RequestsMemory => write!(f, "requests.memory"),
        }
    }
}
