#![deny(missing_docs)]

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use pluton_config::{
    defaults::{
        DEFAULT_AGENT_IMAGE, DEFAULT_AUTH_PATH, DEFAULT_RESOURCE_LIMIT_CPU,
        DEFAULT_RESOURCE_LIMIT_MEM, DEFAULT_RESOURCE_REQUEST_CPU, DEFAULT_RESOURCE_REQUEST_MEM,
        DEFAULT_VAULT_ADDRESS,
    },
    InjectorDefaults,
};
use pluton_inject::mesh::{
    MeshFetcherConfig, DEFAULT_INJECT_CONFIG_MAP, DEFAULT_ISTIO_NAMESPACE, DEFAULT_MESH_CONFIG_MAP,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(super) struct Cli {
    /// Log JSON lines to stderr instead of human readable text.
    #[arg(long, global = true, env = "PLUTON_JSON_LOG")]
    pub(super) json_log: bool,

    #[command(subcommand)]
    pub(super) commands: Commands,
}

#[derive(Debug, Subcommand)]
pub(super) enum Commands {
    /// Print the containers the injector would add to a pod.
    Render(Box<RenderArgs>),

    /// Print the version hash of an istio injection template.
    TemplateHash(TemplateHashArgs),

    /// Read the istio configuration from the cluster and print the injection request that would
    /// be made for a pod.
    Mesh(Box<MeshArgs>),
}

/// Manifest of the pod to inject, YAML or JSON. `-` reads it from stdin.
#[derive(Debug, Args)]
pub(super) struct PodArgs {
    /// Path to the pod manifest.
    #[arg(long, short = 'p')]
    pub(super) pod: PathBuf,
}

#[derive(Debug, Args)]
pub(super) struct RenderArgs {
    #[command(flatten)]
    pub(super) pod: PodArgs,

    /// Also print the istio network init container.
    #[arg(long)]
    pub(super) istio_init: bool,

    #[command(flatten)]
    pub(super) defaults: DefaultsArgs,
}

/// Values used for every pod that does not override them through annotations.
#[derive(Debug, Args)]
pub(super) struct DefaultsArgs {
    /// Vault agent image.
    #[arg(long, env = "PLUTON_AGENT_IMAGE", default_value = DEFAULT_AGENT_IMAGE)]
    pub(super) agent_image: String,

    /// Address of the Vault server.
    #[arg(long, env = "PLUTON_VAULT_ADDRESS", default_value = DEFAULT_VAULT_ADDRESS)]
    pub(super) vault_address: String,

    /// Mount path of the Vault kubernetes auth method.
    #[arg(long, env = "PLUTON_VAULT_AUTH_PATH", default_value = DEFAULT_AUTH_PATH)]
    pub(super) vault_auth_path: String,

    /// CPU limit of the injected containers.
    #[arg(long, env = "PLUTON_LIMITS_CPU", default_value = DEFAULT_RESOURCE_LIMIT_CPU)]
    pub(super) limits_cpu: String,

    /// Memory limit of the injected containers.
    #[arg(long, env = "PLUTON_LIMITS_MEM", default_value = DEFAULT_RESOURCE_LIMIT_MEM)]
    pub(super) limits_mem: String,

    /// CPU request of the injected containers.
    #[arg(long, env = "PLUTON_REQUESTS_CPU", default_value = DEFAULT_RESOURCE_REQUEST_CPU)]
    pub(super) requests_cpu: String,

    /// Memory request of the injected containers.
    #[arg(long, env = "PLUTON_REQUESTS_MEM", default_value = DEFAULT_RESOURCE_REQUEST_MEM)]
    pub(super) requests_mem: String,
}

impl From<DefaultsArgs> for InjectorDefaults {
    fn from(args: DefaultsArgs) -> Self {
        InjectorDefaults {
            image: args.agent_image,
            vault_address: args.vault_address,
            auth_path: args.vault_auth_path,
            limits_cpu: args.limits_cpu,
            limits_mem: args.limits_mem,
            requests_cpu: args.requests_cpu,
            requests_mem: args.requests_mem,
        }
    }
}

#[derive(Debug, Args)]
pub(super) struct TemplateHashArgs {
    /// Template file, `-` reads it from stdin.
    pub(super) template: PathBuf,
}

#[derive(Debug, Args)]
pub(super) struct MeshArgs {
    #[command(flatten)]
    pub(super) pod: PodArgs,

    /// Namespace holding the istio config maps.
    #[arg(long, env = "ISTIO_NAMESPACE", default_value = DEFAULT_ISTIO_NAMESPACE)]
    pub(super) istio_namespace: String,

    /// Config map holding the mesh config.
    #[arg(long, default_value = DEFAULT_MESH_CONFIG_MAP)]
    pub(super) mesh_config_map: String,

    /// Config map holding the injection template and values.
    #[arg(long, default_value = DEFAULT_INJECT_CONFIG_MAP)]
    pub(super) inject_config_map: String,

    /// Seconds to wait for the cluster before giving up.
    #[arg(long, short = 't', default_value_t = 30)]
    pub(super) timeout: u64,
}

impl MeshArgs {
    pub(super) fn fetcher_config(&self) -> MeshFetcherConfig {
        MeshFetcherConfig {
            namespace: self.istio_namespace.clone(),
            mesh_config_map: self.mesh_config_map.clone(),
            inject_config_map: self.inject_config_map.clone(),
        }
    }

    pub(super) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
