use std::collections::BTreeMap;

use base64::prelude::*;
use k8s_openapi::{
    api::core::v1::{Container, EnvVar, Pod, PodSpec, VolumeMount},
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta},
};
use pluton_config::{AgentConfig, InjectorDefaults};
use pluton_inject::{build_istio_init, build_sidecar, InjectError};
use rstest::{fixture, rstest};
use serde_json::Value;

const SERVICE_ACCOUNT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

fn pod(annotations: &[(&str, &str)], containers: &[&str]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some("payments-6b7f9".to_string()),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: containers
                .iter()
                .map(|name| Container {
                    name: name.to_string(),
                    volume_mounts: Some(vec![VolumeMount {
                        name: "payments-token-x2x4k".to_string(),
                        mount_path: SERVICE_ACCOUNT_PATH.to_string(),
                        read_only: Some(true),
                        ..Default::default()
                    }]),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[fixture]
fn defaults() -> InjectorDefaults {
    InjectorDefaults::default()
}

fn env<'c>(container: &'c Container) -> Vec<(&'c str, &'c str)> {
    container
        .env
        .iter()
        .flatten()
        .map(|EnvVar { name, value, .. }| (name.as_str(), value.as_deref().unwrap_or_default()))
        .collect()
}

#[rstest]
fn annotated_pod_with_config_map(defaults: InjectorDefaults) {
    let pod = pod(
        &[
            ("vault.hashicorp.com/agent-inject", "true"),
            ("vault.hashicorp.com/agent-configmap", "payments-agent"),
            ("vault.hashicorp.com/client-timeout", "15s"),
            ("vault.hashicorp.com/client-max-retries", "3"),
            ("vault.hashicorp.com/tls-secret", "vault-ca"),
            ("vault.hashicorp.com/agent-limits-mem", ""),
            ("pluton.io/agent-env-LOG_LEVEL", "debug"),
        ],
        &["payments", "pluton"],
    );
    let agent = AgentConfig::from_pod(&pod, &defaults).unwrap();

    let sidecar = build_sidecar(&agent, &pod).unwrap();

    assert_eq!(
        env(&sidecar),
        vec![
            ("VAULT_CLIENT_TIMEOUT", "15s"),
            ("VAULT_MAX_RETRIES", "3"),
            ("VAULT_ENABLED", "true"),
            ("LOG_LEVEL", "debug"),
            ("PLUTON_TELEMETRY_DISABLED", "true"),
            ("PLUTON_METRICS_DISABLED", "true"),
        ]
    );

    let resources = sidecar.resources.unwrap();
    assert_eq!(
        resources.limits,
        Some(BTreeMap::from([(
            "cpu".to_string(),
            Quantity("500m".to_string())
        )]))
    );
    assert_eq!(
        resources.requests,
        Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("250m".to_string())),
            ("memory".to_string(), Quantity("64Mi".to_string())),
        ]))
    );

    let mounts: Vec<_> = sidecar
        .volume_mounts
        .iter()
        .flatten()
        .map(|mount| (mount.name.as_str(), mount.read_only))
        .collect();
    assert_eq!(
        mounts,
        vec![
            ("vault-secrets", None),
            ("payments-token-x2x4k", Some(true)),
            ("vault-tls-secrets", Some(true)),
        ]
    );
}

#[rstest]
fn embedded_config_decodes_to_agent_config(defaults: InjectorDefaults) {
    let pod = pod(
        &[
            ("vault.hashicorp.com/agent-inject", "true"),
            ("vault.hashicorp.com/role", "payments"),
            (
                "vault.hashicorp.com/agent-inject-secret-db",
                "database/creds/payments",
            ),
        ],
        &["payments"],
    );
    let agent = AgentConfig::from_pod(&pod, &defaults).unwrap();

    let sidecar = build_sidecar(&agent, &pod).unwrap();
    let (name, encoded) = env(&sidecar).last().copied().unwrap();
    assert_eq!(name, "VAULT_CONFIG");

    let config: Value = serde_json::from_slice(&BASE64_STANDARD.decode(encoded).unwrap()).unwrap();

    assert_eq!(config["exit_after_auth"], Value::Bool(false));
    assert_eq!(config["auto_auth"]["method"]["config"]["role"], "payments");
    assert_eq!(config["template"][0]["destination"], "/vault/secrets/db");
}

#[rstest]
fn istio_init_from_annotations(defaults: InjectorDefaults) {
    let pod = pod(
        &[
            ("pluton.io/istio-env-INBOUND_INTERCEPTION_MODE", "REDIRECT"),
            ("pluton.io/istio-env-PROXY_UID", "1337"),
        ],
        &["payments"],
    );
    let agent = AgentConfig::from_pod(&pod, &defaults).unwrap();

    let init = build_istio_init(&agent).unwrap();

    assert_eq!(init.name, "istio-agent-init");
    assert_eq!(
        env(&init),
        vec![
            ("ISTIO_INIT_ENABLED", "true"),
            ("INBOUND_INTERCEPTION_MODE", "REDIRECT"),
            ("PROXY_UID", "1337"),
        ]
    );
    let security = init.security_context.unwrap();
    assert_eq!(security.run_as_user, Some(0));
    assert_eq!(
        security.capabilities.and_then(|capabilities| capabilities.add),
        Some(vec!["NET_ADMIN".to_string(), "NET_RAW".to_string()])
    );
}

#[rstest]
fn same_pod_same_containers(defaults: InjectorDefaults) {
    let pod = pod(
        &[
            ("vault.hashicorp.com/agent-inject", "true"),
            ("vault.hashicorp.com/agent-inject-secret-api", "secret/api"),
            ("vault.hashicorp.com/agent-inject-secret-db", "secret/db"),
            ("pluton.io/agent-env-B", "2"),
            ("pluton.io/agent-env-A", "1"),
        ],
        &["payments"],
    );

    let build = || {
        let agent = AgentConfig::from_pod(&pod, &defaults).unwrap();
        serde_json::to_vec(&build_sidecar(&agent, &pod).unwrap()).unwrap()
    };

    assert_eq!(build(), build());
}

#[rstest]
fn invalid_quantity_annotation(defaults: InjectorDefaults) {
    let pod = pod(
        &[("vault.hashicorp.com/agent-requests-cpu", "one core")],
        &["payments"],
    );
    let agent = AgentConfig::from_pod(&pod, &defaults).unwrap();

    assert!(matches!(
        build_sidecar(&agent, &pod),
        Err(InjectError::InvalidQuantity { ref raw, .. }) if raw == "one core"
    ));
    assert!(build_istio_init(&agent).is_err());
}
