//! Reads the istio mesh and injection configuration from the cluster and hands it, untouched, to
//! an [`InjectionEngine`].
//!
//! The template version passed along is [`version_hash`] of the template that was read.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use kube::{Api, Client};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::{
    error::{InjectError, Result},
    template::version_hash,
};

/// Key of the mesh config in the mesh config map.
pub const MESH_CONFIG_KEY: &str = "mesh";
/// Key of the injection config (holding the template) in the injector config map.
pub const INJECT_CONFIG_KEY: &str = "config";
/// Key of the raw values in the injector config map.
pub const VALUES_CONFIG_KEY: &str = "values";

pub const DEFAULT_ISTIO_NAMESPACE: &str = "istio-system";
pub const DEFAULT_MESH_CONFIG_MAP: &str = "istio";
pub const DEFAULT_INJECT_CONFIG_MAP: &str = "istio-sidecar-injector";

/// Where the istio config maps live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshFetcherConfig {
    pub namespace: String,
    pub mesh_config_map: String,
    pub inject_config_map: String,
}

impl Default for MeshFetcherConfig {
    fn default() -> Self {
        MeshFetcherConfig {
            namespace: DEFAULT_ISTIO_NAMESPACE.to_owned(),
            mesh_config_map: DEFAULT_MESH_CONFIG_MAP.to_owned(),
            inject_config_map: DEFAULT_INJECT_CONFIG_MAP.to_owned(),
        }
    }
}

/// Somewhere config maps can be read from.
pub trait ConfigMapSource {
    #[allow(async_fn_in_trait)]
    async fn config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, kube::Error>;
}

/// Reads config maps through the Kubernetes API.
#[derive(Clone)]
pub struct KubeConfigMaps {
    client: Client,
}

impl KubeConfigMaps {
    pub fn new(client: Client) -> Self {
        KubeConfigMaps { client }
    }
}

impl ConfigMapSource for KubeConfigMaps {
    async fn config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, kube::Error> {
        Api::<ConfigMap>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
    }
}

/// The mesh config document, kept as read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshConfig(Mapping);

impl MeshConfig {
    /// Parses the mesh config read from `config_map`. An empty document is an empty config.
    pub fn parse(raw: &str, config_map: &str) -> Result<Self> {
        let document: Value =
            serde_yaml::from_str(raw).map_err(|source| InjectError::MalformedConfigMap {
                config_map: config_map.to_owned(),
                source,
            })?;

        match document {
            Value::Mapping(mapping) => Ok(MeshConfig(mapping)),
            Value::Null => Ok(MeshConfig::default()),
            _ => Err(InjectError::MeshConfigNotMapping(config_map.to_owned())),
        }
    }

    /// The proxy defaults (`defaultConfig`), if the mesh sets any.
    pub fn default_config(&self) -> Option<&Value> {
        self.0.get("defaultConfig")
    }
}

#[derive(Debug, Default, Deserialize)]
struct InjectConfig {
    #[serde(default)]
    template: String,
}

/// Everything read from the cluster for one injection.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshInjectionConfig {
    pub mesh: MeshConfig,
    pub template: String,
    pub values: String,
}

impl MeshInjectionConfig {
    /// [`version_hash`] of the template.
    pub fn version(&self) -> String {
        version_hash(&self.template)
    }

    pub fn request<'a>(&'a self, pod: &'a Pod) -> InjectionRequest<'a> {
        InjectionRequest {
            template: &self.template,
            values: &self.values,
            version: self.version(),
            mesh_config: &self.mesh,
            pod,
        }
    }
}

/// Input of an [`InjectionEngine`]. The template and values are passed exactly as read.
#[derive(Clone, Debug)]
pub struct InjectionRequest<'a> {
    pub template: &'a str,
    pub values: &'a str,
    pub version: String,
    pub mesh_config: &'a MeshConfig,
    pub pod: &'a Pod,
}

/// Renders the injection template for a pod.
pub trait InjectionEngine {
    type Spec;
    type Error: std::error::Error + Send + Sync + 'static;

    fn inject(&self, request: InjectionRequest<'_>) -> Result<Self::Spec, Self::Error>;
}

pub struct MeshConfigFetcher<S> {
    source: S,
    config: MeshFetcherConfig,
}

impl<S> MeshConfigFetcher<S>
where
    S: ConfigMapSource,
{
    pub fn new(source: S, config: MeshFetcherConfig) -> Self {
        MeshConfigFetcher { source, config }
    }

    pub fn config(&self) -> &MeshFetcherConfig {
        &self.config
    }

    /// Data of the config map `name`, empty when it has none.
    async fn read(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let namespace = &self.config.namespace;

        self.source
            .config_map(namespace, name)
            .await
            .map(|config_map| config_map.data.unwrap_or_default())
            .map_err(|source| InjectError::ConfigMapNotFound {
                name: name.to_owned(),
                namespace: namespace.clone(),
                source,
            })
    }

    fn take_key(
        data: &mut BTreeMap<String, String>,
        name: &str,
        key: &'static str,
    ) -> Result<String> {
        data.remove(key)
            .ok_or_else(|| InjectError::MissingConfigMapKey {
                key,
                config_map: name.to_owned(),
            })
    }

    fn parse_template(raw: &str, name: &str) -> Result<String> {
        let InjectConfig { template } =
            serde_yaml::from_str::<Option<InjectConfig>>(raw)
                .map_err(|source| InjectError::MalformedConfigMap {
                    config_map: name.to_owned(),
                    source,
                })?
                .unwrap_or_default();

        debug!(config_map = name, "using inject template from config map");

        Ok(template)
    }

    pub async fn mesh_config(&self) -> Result<MeshConfig> {
        let name = &self.config.mesh_config_map;
        let raw = Self::take_key(&mut self.read(name).await?, name, MESH_CONFIG_KEY)?;

        MeshConfig::parse(&raw, name)
    }

    pub async fn inject_template(&self) -> Result<String> {
        let name = &self.config.inject_config_map;
        let raw = Self::take_key(&mut self.read(name).await?, name, INJECT_CONFIG_KEY)?;

        Self::parse_template(&raw, name)
    }

    /// Reads the mesh config, the template and the values. The injector config map is read once
    /// for both of its keys. The first failure aborts.
    #[tracing::instrument(level = "trace", skip(self), fields(namespace = %self.config.namespace), err)]
    pub async fn fetch(&self) -> Result<MeshInjectionConfig> {
        let mesh = self.mesh_config().await?;

        let name = &self.config.inject_config_map;
        let mut data = self.read(name).await?;
        let template = Self::take_key(&mut data, name, INJECT_CONFIG_KEY)
            .and_then(|raw| Self::parse_template(&raw, name))?;
        let values = Self::take_key(&mut data, name, VALUES_CONFIG_KEY)?;

        Ok(MeshInjectionConfig {
            mesh,
            template,
            values,
        })
    }
}

/// Fetches the mesh configuration and runs `engine` on it for `pod`.
pub async fn inject_container<S, E>(
    fetcher: &MeshConfigFetcher<S>,
    engine: &E,
    pod: &Pod,
) -> Result<E::Spec>
where
    S: ConfigMapSource,
    E: InjectionEngine,
{
    let config = fetcher.fetch().await?;
    let request = config.request(pod);
    debug!(version = %request.version, "running injection engine");

    engine
        .inject(request)
        .map_err(|error| InjectError::InjectionEngine(Box::new(error)))
}
