//! One scenario per deployment mode, rendered from a values fixture.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use zenml_manifests::config::Configuration;
use zenml_manifests::error::Error;
use zenml_manifests::environment::EnvSource;
use zenml_manifests::{AccessInstructions, load_values, render};

use crate::fixtures::{env_value, fixture, release, render_fixtures, server_container};

// ============================================================================
// Default mode
// ============================================================================

/// No values at all: single replica, embedded store, port-forward notes.
#[test]
fn test_default_render() {
    let rendered = render(&Configuration::default(), &release()).unwrap();
    let bundle = &rendered.bundle;

    assert!(bundle.service_account.is_some());
    assert!(bundle.autoscaler.is_none());
    assert!(bundle.ingress.is_none());
    assert_eq!(bundle.deployment.spec.as_ref().unwrap().replicas, Some(1));

    let container = server_container(bundle);
    assert_eq!(
        container.image.as_deref(),
        Some("zenmldocker/zenml-server:0.58.0")
    );
    assert_eq!(env_value(container, "ZENML_ANALYTICS_OPT_IN"), Some("True"));
    assert_eq!(env_value(container, "ZENML_STORE_TYPE"), None);

    assert!(matches!(
        rendered.notes,
        AccessInstructions::PortForward { .. }
    ));
}

// ============================================================================
// External database
// ============================================================================

#[test]
fn test_managed_mysql_render() {
    let rendered = render_fixtures(&["managed-mysql.yaml"]);
    let bundle = &rendered.bundle;

    assert_eq!(bundle.deployment.spec.as_ref().unwrap().replicas, Some(3));
    assert!(bundle.autoscaler.is_none());

    let container = server_container(bundle);
    assert_eq!(
        container.image.as_deref(),
        Some("zenmldocker/zenml-server:0.58.0-custom")
    );
    assert_eq!(env_value(container, "ZENML_STORE_TYPE"), Some("sql"));
    assert_eq!(env_value(container, "DISABLE_DATABASE_MIGRATION"), Some("True"));
    assert_eq!(
        env_value(container, "ZENML_STORE_SSL_VERIFY_SERVER_CERT"),
        Some("True")
    );
    assert_eq!(env_value(container, "ZENML_STORE_POOL_SIZE"), Some("20"));
    assert_eq!(env_value(container, "ZENML_STORE_MAX_OVERFLOW"), Some("10"));
    assert_eq!(
        env_value(container, "ZENML_STORE_BACKUP_STRATEGY"),
        Some("in-memory")
    );
    assert_eq!(env_value(container, "ZENML_ANALYTICS_OPT_IN"), Some("False"));
    assert_eq!(
        env_value(container, "ZENML_DEFAULT_PROJECT_NAME"),
        Some("research")
    );
    assert_eq!(env_value(container, "EXTRA_SETTING"), Some("enabled"));

    // The URL only travels through the Secret
    assert_eq!(env_value(container, "ZENML_STORE_URL"), None);
    let data = bundle.secret.string_data.as_ref().unwrap();
    assert!(data.contains_key("ZENML_STORE_URL"));

    let resources = container.resources.as_ref().unwrap();
    assert_eq!(
        resources.requests.as_ref().unwrap().get("cpu"),
        Some(&Quantity("500m".to_string()))
    );

    let pod = bundle
        .deployment
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap();
    assert_eq!(
        pod.node_selector
            .as_ref()
            .unwrap()
            .get("kubernetes.io/os")
            .map(String::as_str),
        Some("linux")
    );
}

// ============================================================================
// Autoscaling behind an ingress
// ============================================================================

#[test]
fn test_autoscaled_ingress_render() {
    let rendered = render_fixtures(&["autoscaled-ingress.yaml"]);
    let bundle = &rendered.bundle;

    assert!(bundle.deployment.spec.as_ref().unwrap().replicas.is_none());

    let hpa = bundle.autoscaler.as_ref().unwrap().spec.as_ref().unwrap();
    assert_eq!(hpa.min_replicas, Some(2));
    assert_eq!(hpa.max_replicas, 8);
    assert_eq!(hpa.scale_target_ref.name, "zenml-server");
    assert_eq!(hpa.metrics.as_ref().unwrap().len(), 2);

    let ingress = bundle.ingress.as_ref().unwrap();
    let ingress_spec = ingress.spec.as_ref().unwrap();
    assert_eq!(ingress_spec.ingress_class_name.as_deref(), Some("nginx"));
    assert_eq!(
        ingress_spec.tls.as_ref().unwrap()[0].secret_name.as_deref(),
        Some("zenml-example-tls")
    );

    let service_account = bundle.service_account.as_ref().unwrap();
    assert!(
        service_account
            .metadata
            .annotations
            .as_ref()
            .unwrap()
            .contains_key("eks.amazonaws.com/role-arn")
    );

    assert_eq!(rendered.notes.url(), Some("https://zenml.example.com/"));
}

// ============================================================================
// Secrets stores
// ============================================================================

#[test]
fn test_secrets_store_render() {
    let rendered = render_fixtures(&["aws-secrets-store.yaml"]);
    let container = server_container(&rendered.bundle);

    assert_eq!(env_value(container, "ZENML_SECRETS_STORE_TYPE"), Some("aws"));
    assert_eq!(
        env_value(container, "ZENML_SECRETS_STORE_AUTH_METHOD"),
        Some("secret-key")
    );
    assert_eq!(
        env_value(container, "ZENML_SECRETS_STORE_REGION_NAME"),
        Some("eu-central-1")
    );
    assert_eq!(
        env_value(container, "ZENML_SECRETS_STORE_SECRET_LIST_REFRESH_TIMEOUT"),
        Some("30")
    );
    assert_eq!(
        env_value(container, "ZENML_BACKUP_SECRETS_STORE_TYPE"),
        Some("gcp")
    );
    assert_eq!(
        env_value(container, "ZENML_BACKUP_SECRETS_STORE_PROJECT_ID"),
        Some("zenml-backup")
    );

    let text = rendered.notes.to_string();
    assert!(text.contains("http://$SERVICE_IP:8080"));
}

/// A malformed settings mapping aborts the render and names its source.
#[test]
fn test_malformed_secrets_store_aborts_render() {
    let config = load_values(&[fixture("malformed-secrets-store.yaml")], &[]).unwrap();
    let err = render(&config, &release()).unwrap_err();
    assert!(err.to_string().contains("secrets store"));
    match err {
        Error::MalformedSource { origin, .. } => assert_eq!(origin, EnvSource::SecretsStore),
        other => panic!("unexpected error: {other:?}"),
    }
}

/// A settings key left without a value is reported, not dropped.
#[test]
fn test_null_secrets_setting_aborts_render() {
    let config = load_values(&[fixture("null-secrets-setting.yaml")], &[]).unwrap();
    match render(&config, &release()).unwrap_err() {
        Error::MalformedSource { origin, reason } => {
            assert_eq!(origin, EnvSource::SecretsStore);
            assert!(reason.contains("ZENML_SECRETS_STORE_REGION_NAME"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Without an image repository nothing is rendered.
#[test]
fn test_missing_repository_aborts_render() {
    let config = load_values(
        &[fixture("managed-mysql.yaml")],
        &["image.repository=".to_string()],
    )
    .unwrap();
    let err = render(&config, &release()).unwrap_err();
    assert!(matches!(err, Error::MissingField(_)));
    assert_eq!(err.exit_code(), 2);
}
