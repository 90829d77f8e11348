use thiserror::Error;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to get `Spec` for Pod!")]
    PodSpecNotFound,

    #[error("No container in the pod mounts the service account token at `{0}`")]
    ServiceAccountNotFound(String),

    #[error("Annotation `{key}` has an invalid boolean value `{value}`")]
    InvalidBool { key: String, value: String },
}
