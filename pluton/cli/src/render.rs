use k8s_openapi::api::core::v1::{Pod, PodSpec};
use pluton_config::{AgentConfig, InjectorDefaults};
use pluton_inject::{build_istio_init, build_sidecar};
use tracing::{info, warn};

use crate::{
    config::RenderArgs,
    error::{CliError, CliResult},
    input::read_pod,
};

/// The containers to add to `pod`, as a pod spec fragment.
fn injected_spec(pod: &Pod, defaults: &InjectorDefaults, istio_init: bool) -> CliResult<PodSpec> {
    let agent = AgentConfig::from_pod(pod, defaults)?;

    if !agent.inject {
        warn!(pod = ?pod.metadata.name, "pod does not ask for injection, rendering anyway");
    }

    let sidecar = build_sidecar(&agent, pod).map_err(CliError::BuildContainer)?;
    let init_containers = istio_init
        .then(|| build_istio_init(&agent))
        .transpose()
        .map_err(CliError::BuildContainer)?
        .map(|init| vec![init]);

    info!(
        pod = ?pod.metadata.name,
        image = %agent.image_name,
        istio_init,
        "rendered injected containers"
    );

    Ok(PodSpec {
        containers: vec![sidecar],
        init_containers,
        ..Default::default()
    })
}

pub(crate) fn render(args: RenderArgs) -> CliResult<()> {
    let pod = read_pod(&args.pod.pod)?;
    let spec = injected_spec(&pod, &args.defaults.into(), args.istio_init)?;

    print!("{}", serde_yaml::to_string(&spec)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::{
        api::core::v1::{Container, VolumeMount},
        apimachinery::pkg::apis::meta::v1::ObjectMeta,
    };
    use pluton_config::ConfigError;
    use rstest::rstest;

    use super::*;

    fn pod(annotations: &[(&str, &str)]) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("app".to_string()),
                annotations: Some(
                    annotations
                        .iter()
                        .map(|(key, value)| (key.to_string(), value.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "app".to_string(),
                    volume_mounts: Some(vec![VolumeMount {
                        name: "app-token".to_string(),
                        mount_path: "/var/run/secrets/kubernetes.io/serviceaccount".to_string(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(false, None)]
    #[case(true, Some("istio-agent-init"))]
    fn renders_requested_containers(#[case] istio_init: bool, #[case] init: Option<&str>) {
        let spec = injected_spec(
            &pod(&[("vault.hashicorp.com/agent-inject", "true")]),
            &InjectorDefaults::default(),
            istio_init,
        )
        .unwrap();

        assert_eq!(spec.containers.len(), 1);
        assert_eq!(
            spec.containers.first().map(|container| container.name.as_str()),
            Some("pluton-vault")
        );
        assert_eq!(
            spec.init_containers
                .as_deref()
                .and_then(<[Container]>::first)
                .map(|container| container.name.as_str()),
            init
        );
    }

    #[test]
    fn bad_annotation_is_config_error() {
        let result = injected_spec(
            &pod(&[("vault.hashicorp.com/tls-skip-verify", "maybe")]),
            &InjectorDefaults::default(),
            false,
        );

        assert!(matches!(
            result,
            Err(CliError::AgentConfig(ConfigError::InvalidBool { .. }))
        ));
    }

    #[test]
    fn bad_quantity_is_build_error() {
        let result = injected_spec(
            &pod(&[("vault.hashicorp.com/agent-limits-cpu", "lots")]),
            &InjectorDefaults::default(),
            true,
        );

        assert!(matches!(result, Err(CliError::BuildContainer(_))));
    }
}
