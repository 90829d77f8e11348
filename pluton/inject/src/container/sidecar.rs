use k8s_openapi::api::core::v1::{Container, Pod, SecurityContext};
use pluton_config::AgentConfig;
use tracing::debug;

use crate::{
    container::{
        companion_exists, ContainerVariant, IMAGE_PULL_POLICY, SIDECAR_CONTAINER_NAME,
    },
    env::{sidecar_env, ConfigSerializer, JsonConfigSerializer},
    error::Result,
    mounts::plan_mounts,
    resources::resolve_config,
};

/// The Vault agent sidecar, running next to the application for the pod's whole lifetime.
pub struct SidecarVariant<'c, S = JsonConfigSerializer> {
    agent: &'c AgentConfig,
    pod: &'c Pod,
    serializer: S,
}

impl<'c> SidecarVariant<'c> {
    pub fn new(agent: &'c AgentConfig, pod: &'c Pod) -> Self {
        SidecarVariant::with_serializer(agent, pod, JsonConfigSerializer)
    }
}

impl<'c, S> SidecarVariant<'c, S>
where
    S: ConfigSerializer,
{
    /// Uses `serializer` for the embedded agent config instead of [`JsonConfigSerializer`].
    pub fn with_serializer(agent: &'c AgentConfig, pod: &'c Pod, serializer: S) -> Self {
        SidecarVariant {
            agent,
            pod,
            serializer,
        }
    }
}

impl<S> ContainerVariant for SidecarVariant<'_, S>
where
    S: ConfigSerializer,
{
    #[tracing::instrument(level = "trace", skip(self), fields(image = %self.agent.image_name), err)]
    fn as_container(&self) -> Result<Container> {
        let SidecarVariant {
            agent,
            pod,
            serializer,
        } = self;

        let companion_exists = companion_exists(pod);
        debug!(companion_exists, "building vault sidecar");

        let env = sidecar_env(agent, serializer, false, companion_exists)?;
        let resources = resolve_config(&agent.resources)?;
        let volume_mounts = plan_mounts(agent);

        Ok(Container {
            name: SIDECAR_CONTAINER_NAME.to_owned(),
            image: Some(agent.image_name.clone()),
            image_pull_policy: Some(IMAGE_PULL_POLICY.to_owned()),
            env: Some(env),
            resources: Some(resources),
            // TODO: decide on `run_as_non_root` and a non-root uid once the agent image supports
            // it, nothing is locked down yet.
            security_context: Some(SecurityContext::default()),
            volume_mounts: Some(volume_mounts),
            ..Default::default()
        })
    }
}

/// Builds the Vault agent sidecar for `pod`.
///
/// `pod` is only inspected for the companion container.
pub fn build_sidecar(agent: &AgentConfig, pod: &Pod) -> Result<Container> {
    SidecarVariant::new(agent, pod).as_container()
}
