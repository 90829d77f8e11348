use k8s_openapi::api::core::v1::{Capabilities, Container, SecurityContext};
use pluton_config::AgentConfig;

use crate::{
    container::{ContainerVariant, IMAGE_PULL_POLICY, ISTIO_INIT_CONTAINER_NAME},
    env::init_env,
    error::Result,
    resources::resolve_config,
};

pub const ISTIO_INIT_SCRIPT: &str = "bash /usr/local/bin/istio-init.sh";

/// Capabilities the init script needs to rewrite the pod's iptables rules, in this order.
pub const ISTIO_INIT_CAPABILITIES: [&str; 2] = ["NET_ADMIN", "NET_RAW"];

/// Privileged init container setting up the pod network for the istio proxy.
pub struct IstioInitVariant<'c> {
    agent: &'c AgentConfig,
}

impl<'c> IstioInitVariant<'c> {
    pub fn new(agent: &'c AgentConfig) -> Self {
        IstioInitVariant { agent }
    }

    fn command_line() -> (Vec<String>, Vec<String>) {
        (
            vec!["/bin/sh".to_owned(), "-ec".to_owned()],
            vec![ISTIO_INIT_SCRIPT.to_owned()],
        )
    }

    /// Root, with [`ISTIO_INIT_CAPABILITIES`] added.
    fn security_context() -> SecurityContext {
        SecurityContext {
            run_as_user: Some(0),
            run_as_group: Some(0),
            run_as_non_root: Some(false),
            capabilities: Some(Capabilities {
                add: Some(
                    ISTIO_INIT_CAPABILITIES
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

impl ContainerVariant for IstioInitVariant<'_> {
    #[tracing::instrument(level = "trace", skip(self), fields(image = %self.agent.image_name), err)]
    fn as_container(&self) -> Result<Container> {
        let IstioInitVariant { agent } = self;

        let resources = resolve_config(&agent.resources)?;
        let (command, args) = Self::command_line();

        Ok(Container {
            name: ISTIO_INIT_CONTAINER_NAME.to_owned(),
            image: Some(agent.image_name.clone()),
            image_pull_policy: Some(IMAGE_PULL_POLICY.to_owned()),
            command: Some(command),
            args: Some(args),
            env: Some(init_env(&agent.annotations)),
            resources: Some(resources),
            security_context: Some(Self::security_context()),
            ..Default::default()
        })
    }
}

/// Builds the istio network init container for the agent's pod.
pub fn build_istio_init(agent: &AgentConfig) -> Result<Container> {
    IstioInitVariant::new(agent).as_container()
}
