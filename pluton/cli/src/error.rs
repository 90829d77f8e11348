use std::{path::PathBuf, time::Duration};

use miette::Diagnostic;
use pluton_config::ConfigError;
use pluton_inject::InjectError;
use thiserror::Error;

pub(crate) type CliResult<T, E = CliError> = core::result::Result<T, E>;

const KUBE_HELP: &str = "Please check that Kubernetes is configured correctly and test your \
                         connection with `kubectl get configmaps -n <istio namespace>`.";

#[derive(Debug, Error, Diagnostic)]
pub(crate) enum CliError {
    #[error("Failed to read `{}`: {source}", .path.display())]
    #[diagnostic(help("Pass the path of a readable file, or `-` to read from stdin."))]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("`{}` is not a valid pod manifest: {source}", .path.display())]
    #[diagnostic(help("The manifest must hold a single `v1/Pod`, as YAML or JSON."))]
    ParsePod {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to build the agent configuration: {0}")]
    #[diagnostic(help(
        "Check the pod's `vault.hashicorp.com/*` annotations, and that one of its containers \
         mounts the service account token."
    ))]
    AgentConfig(#[from] ConfigError),

    #[error("Failed to build the injected containers: {0}")]
    #[diagnostic(help(
        "Resource annotations must be Kubernetes quantities, such as `250m` or `64Mi`."
    ))]
    BuildContainer(#[source] InjectError),

    #[error("Failed to infer the Kubernetes client configuration: {0}")]
    #[diagnostic(help("{KUBE_HELP}"))]
    InferKubeConfig(#[from] kube::config::InferConfigError),

    #[error("Failed to create Kubernetes API client: {0}")]
    #[diagnostic(help("{KUBE_HELP}"))]
    CreateKubeClient(#[source] kube::Error),

    #[error("Failed to read the istio mesh configuration: {0}")]
    #[diagnostic(help(
        "Pass `--istio-namespace` (or set `ISTIO_NAMESPACE`) to the namespace istio is installed \
         in, and make sure its config maps exist."
    ))]
    MeshConfig(#[source] InjectError),

    #[error("Reading the istio mesh configuration timed out after {0:?}")]
    #[diagnostic(help("{KUBE_HELP}"))]
    MeshTimeout(Duration),

    #[error("Failed to write the output: {0}")]
    Output(#[from] serde_yaml::Error),

    #[error("Failed to start the async runtime: {0}")]
    RuntimeError(#[source] std::io::Error),
}
