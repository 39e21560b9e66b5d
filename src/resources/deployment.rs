//! Deployment generation for the ZenML server.
//!
//! Creates a Deployment with:
//! - Replica count decided by the resolver, omitted under an autoscaler
//! - Selector and pod template sharing one label map
//! - Secret checksum annotation to roll pods on credential changes
//! - Explicit environment plus bulk import of the server Secret
//! - HTTP health probes on `/health`

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvFromSource, EnvVar, HTTPGetAction, PodSpec, PodTemplateSpec,
    Probe, SecretEnvSource,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

use crate::environment::EnvironmentEntry;
use crate::resolver::ResolvedDeploymentSpec;
use crate::resources::common::{
    CONTAINER_PORT, HTTP_PORT_NAME, non_empty_map, non_empty_vec, object_meta,
    pod_selector_labels,
};
use crate::resources::secret::SECRET_CHECKSUM_ANNOTATION;

/// Name of the server container
pub const CONTAINER_NAME: &str = "zenml";

/// Path served by the health endpoint
pub const HEALTH_PATH: &str = "/health";

/// Generate the server Deployment.
///
/// `secret_checksum` is the hash of the rendered server Secret.
pub fn generate_deployment(spec: &ResolvedDeploymentSpec, secret_checksum: &str) -> Deployment {
    let selector_labels = pod_selector_labels(spec);

    Deployment {
        metadata: object_meta(spec, &spec.names().fullname),
        spec: Some(DeploymentSpec {
            replicas: spec.replicas(),
            selector: LabelSelector {
                match_labels: Some(selector_labels.clone()),
                ..Default::default()
            },
            template: generate_pod_template(spec, selector_labels, secret_checksum),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Generate the pod template.
fn generate_pod_template(
    spec: &ResolvedDeploymentSpec,
    labels: BTreeMap<String, String>,
    secret_checksum: &str,
) -> PodTemplateSpec {
    let config = spec.config();

    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            annotations: Some(pod_annotations(spec, secret_checksum)),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            service_account_name: Some(spec.names().service_account.clone()),
            security_context: config.pod_security_context.clone(),
            containers: vec![generate_server_container(spec)],
            image_pull_secrets: non_empty_vec(&config.image_pull_secrets),
            node_selector: non_empty_map(&config.node_selector),
            affinity: config.affinity.clone(),
            tolerations: non_empty_vec(&config.tolerations),
            ..Default::default()
        }),
    }
}

/// User pod annotations plus the Secret checksum, which cannot be overridden.
fn pod_annotations(
    spec: &ResolvedDeploymentSpec,
    secret_checksum: &str,
) -> BTreeMap<String, String> {
    let mut annotations = spec.config().pod_annotations.clone();
    annotations.insert(
        SECRET_CHECKSUM_ANNOTATION.to_string(),
        secret_checksum.to_string(),
    );
    annotations
}

/// Generate the server container.
fn generate_server_container(spec: &ResolvedDeploymentSpec) -> Container {
    let config = spec.config();

    Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(spec.image().to_string()),
        image_pull_policy: Some(config.image.pull_policy.clone()),
        security_context: config.security_context.clone(),
        env: Some(generate_env_vars(spec.environment())),
        env_from: Some(vec![EnvFromSource {
            secret_ref: Some(SecretEnvSource {
                name: spec.names().fullname.clone(),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        ports: Some(vec![ContainerPort {
            name: Some(HTTP_PORT_NAME.to_string()),
            container_port: CONTAINER_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        liveness_probe: Some(health_probe()),
        readiness_probe: Some(health_probe()),
        resources: config.resources.clone(),
        ..Default::default()
    }
}

/// Convert composed entries to container env vars.
fn generate_env_vars(environment: &[EnvironmentEntry]) -> Vec<EnvVar> {
    environment
        .iter()
        .map(|entry| EnvVar {
            name: entry.name.clone(),
            value: Some(entry.value.clone()),
            ..Default::default()
        })
        .collect()
}

/// HTTP GET on the health endpoint.
fn health_probe() -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(HEALTH_PATH.to_string()),
            port: IntOrString::String(HTTP_PORT_NAME.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use super::*;
    use crate::config::{Configuration, DatabaseSpec, Release};
    use crate::resolver::resolve;
    use k8s_openapi::api::core::v1::{LocalObjectReference, Toleration};

    fn spec_for(config: &Configuration) -> ResolvedDeploymentSpec {
        resolve(config, &Release::new("prod", "zenml")).unwrap()
    }

    fn container(deployment: &Deployment) -> Container {
        deployment
            .spec
            .clone()
            .unwrap()
            .template
            .spec
            .unwrap()
            .containers
            .first()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_generate_deployment() {
        let deployment = generate_deployment(&spec_for(&Configuration::default()), "abc");

        assert_eq!(deployment.metadata.name, Some("prod-zenml".to_string()));
        assert_eq!(deployment.metadata.namespace, Some("zenml".to_string()));
        let spec = deployment.spec.clone().unwrap();
        assert_eq!(spec.replicas, Some(1));

        let container = container(&deployment);
        assert_eq!(container.name, "zenml");
        assert_eq!(
            container.image,
            Some("zenmldocker/zenml-server:0.58.0".to_string())
        );
        assert_eq!(container.image_pull_policy, Some("Always".to_string()));
    }

    #[test]
    fn test_selector_matches_template_labels() {
        let deployment = generate_deployment(&spec_for(&Configuration::default()), "abc");
        let spec = deployment.spec.unwrap();
        assert_eq!(
            spec.selector.match_labels,
            spec.template.metadata.unwrap().labels
        );
    }

    #[test]
    fn test_replicas_omitted_under_autoscaler() {
        let mut config = Configuration {
            replica_count: 4,
            database: DatabaseSpec {
                url: Some("mysql://db/zenml".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let deployment = generate_deployment(&spec_for(&config), "abc");
        assert_eq!(deployment.spec.unwrap().replicas, Some(4));

        config.autoscaling.enabled = true;
        let deployment = generate_deployment(&spec_for(&config), "abc");
        assert_eq!(deployment.spec.unwrap().replicas, None);
    }

    #[test]
    fn test_checksum_annotation_wins_over_pod_annotations() {
        let mut config = Configuration::default();
        config
            .pod_annotations
            .insert("checksum/secret".to_string(), "user".to_string());
        config
            .pod_annotations
            .insert("prometheus.io/scrape".to_string(), "true".to_string());

        let deployment = generate_deployment(&spec_for(&config), "deadbeef");
        let annotations = deployment
            .spec
            .unwrap()
            .template
            .metadata
            .unwrap()
            .annotations
            .unwrap();
        assert_eq!(
            annotations.get("checksum/secret"),
            Some(&"deadbeef".to_string())
        );
        assert_eq!(
            annotations.get("prometheus.io/scrape"),
            Some(&"true".to_string())
        );
    }

    #[test]
    fn test_env_and_env_from() {
        let deployment = generate_deployment(&spec_for(&Configuration::default()), "abc");
        let container = container(&deployment);

        let env = container.env.unwrap();
        assert!(env.iter().all(|e| e.value.is_some() && e.value_from.is_none()));
        assert!(
            env.iter()
                .any(|e| e.name == "ZENML_ANALYTICS_OPT_IN" && e.value.as_deref() == Some("True"))
        );

        let env_from = container.env_from.unwrap();
        assert_eq!(env_from.len(), 1);
        assert_eq!(
            env_from[0].secret_ref.as_ref().unwrap().name,
            "prod-zenml".to_string()
        );
    }

    #[test]
    fn test_health_probes() {
        let container = container(&generate_deployment(
            &spec_for(&Configuration::default()),
            "abc",
        ));
        for probe in [container.liveness_probe, container.readiness_probe] {
            let http_get = probe.unwrap().http_get.unwrap();
            assert_eq!(http_get.path, Some("/health".to_string()));
            assert_eq!(http_get.port, IntOrString::String("http".to_string()));
        }
        let ports = container.ports.unwrap();
        assert_eq!(ports[0].container_port, 8080);
    }

    #[test]
    fn test_absent_passthrough_blocks_omitted() {
        let deployment = generate_deployment(&spec_for(&Configuration::default()), "abc");
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        assert!(pod.node_selector.is_none());
        assert!(pod.tolerations.is_none());
        assert!(pod.affinity.is_none());
        assert!(pod.image_pull_secrets.is_none());
        assert!(pod.security_context.is_none());
        assert!(pod.containers[0].resources.is_none());
        assert!(pod.containers[0].security_context.is_none());
    }

    #[test]
    fn test_passthrough_blocks_copied() {
        let mut config = Configuration::default();
        config.node_selector.insert("pool".into(), "ml".into());
        config.tolerations.push(Toleration {
            key: Some("dedicated".to_string()),
            operator: Some("Exists".to_string()),
            ..Default::default()
        });
        config.image_pull_secrets.push(LocalObjectReference {
            name: "regcred".to_string(),
        });

        let deployment = generate_deployment(&spec_for(&config), "abc");
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        assert_eq!(
            pod.node_selector.unwrap().get("pool"),
            Some(&"ml".to_string())
        );
        assert_eq!(pod.tolerations.unwrap(), config.tolerations);
        assert_eq!(pod.image_pull_secrets.unwrap()[0].name, "regcred");
        assert_eq!(pod.service_account_name, Some("prod-zenml".to_string()));
    }
}
