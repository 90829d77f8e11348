use k8s_openapi::api::core::v1::{Container, Pod};

use crate::error::Result;

pub mod init;
pub mod sidecar;

/// Name of the injected Vault agent sidecar.
pub const SIDECAR_CONTAINER_NAME: &str = "pluton-vault";

/// Name of the injected istio network init container.
pub const ISTIO_INIT_CONTAINER_NAME: &str = "istio-agent-init";

/// The pluton companion container. When a pod already runs it, the sidecar leaves telemetry and
/// metrics to it.
pub const COMPANION_CONTAINER_NAME: &str = "pluton";

pub const IMAGE_PULL_POLICY: &str = "Always";

/// A kind of container the injector knows how to build.
pub trait ContainerVariant {
    /// Builds the complete container, or fails without producing anything.
    fn as_container(&self) -> Result<Container>;
}

/// Whether any of the pod's containers is the [`COMPANION_CONTAINER_NAME`].
///
/// Looks at every container, the pod is only read.
pub fn companion_exists(pod: &Pod) -> bool {
    pod.spec
        .iter()
        .flat_map(|spec| spec.containers.iter())
        .fold(false, |found, container| {
            found | (container.name == COMPANION_CONTAINER_NAME)
        })
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::PodSpec;
    use rstest::rstest;

    use super::*;

    fn pod(names: &[&str]) -> Pod {
        Pod {
            spec: Some(PodSpec {
                containers: names
                    .iter()
                    .map(|name| Container {
                        name: name.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(&[], false)]
    #[case(&["app"], false)]
    #[case(&["pluton"], true)]
    #[case(&["app", "istio-proxy", "pluton"], true)]
    #[case(&["pluton", "app", "pluton"], true)]
    #[case(&["pluton-vault", "plutonium"], false)]
    fn finds_companion(#[case] names: &[&str], #[case] expected: bool) {
        assert_eq!(companion_exists(&pod(names)), expected);
    }

    #[test]
    fn pod_without_spec() {
        assert!(!companion_exists(&Pod::default()));
    }
}
