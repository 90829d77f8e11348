use std::convert::Infallible;

use kube::{Client, Config};
use pluton_inject::mesh::{
    inject_container, InjectionEngine, InjectionRequest, KubeConfigMaps, MeshConfigFetcher,
};
use serde::Serialize;
use tracing::info;

use crate::{
    config::MeshArgs,
    error::{CliError, CliResult},
    input::read_pod,
};

/// What the injection engine would receive.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InjectionReport {
    pod: Option<String>,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_config: Option<serde_yaml::Value>,
    template: String,
    values: String,
}

/// Stands in for the template renderer, echoing back what it was given.
struct PassthroughEngine;

impl InjectionEngine for PassthroughEngine {
    type Spec = InjectionReport;
    type Error = Infallible;

    fn inject(&self, request: InjectionRequest<'_>) -> Result<InjectionReport, Infallible> {
        Ok(InjectionReport {
            pod: request.pod.metadata.name.clone(),
            version: request.version,
            default_config: request.mesh_config.default_config().cloned(),
            template: request.template.to_owned(),
            values: request.values.to_owned(),
        })
    }
}

/// Local kubeconfig first, in-cluster service account otherwise.
async fn create_kube_client() -> CliResult<Client> {
    let config = Config::infer().await?;

    Client::try_from(config).map_err(CliError::CreateKubeClient)
}

pub(crate) async fn mesh(args: MeshArgs) -> CliResult<()> {
    let pod = read_pod(&args.pod.pod)?;
    let timeout = args.timeout();

    let fetcher = MeshConfigFetcher::new(
        KubeConfigMaps::new(create_kube_client().await?),
        args.fetcher_config(),
    );

    let report = tokio::time::timeout(timeout, inject_container(&fetcher, &PassthroughEngine, &pod))
        .await
        .map_err(|_| CliError::MeshTimeout(timeout))?
        .map_err(CliError::MeshConfig)?;

    info!(
        namespace = %fetcher.config().namespace,
        version = %report.version,
        "read istio mesh configuration"
    );

    print!("{}", serde_yaml::to_string(&report)?);

    Ok(())
}
