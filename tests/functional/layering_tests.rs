//! Values layering and rendered output.

use std::fs;

use tempfile::TempDir;
use zenml_manifests::config::ServiceType;
use zenml_manifests::error::Error;
use zenml_manifests::resources::DOCUMENT_SEPARATOR;
use zenml_manifests::{load_values, render};

use crate::fixtures::{env_value, fixture, load, release, server_container};

// ============================================================================
// Layering
// ============================================================================

/// Later files override earlier ones; untouched keys survive.
#[test]
fn test_later_files_win() {
    let config = load(&["managed-mysql.yaml", "aws-secrets-store.yaml"], &[]);
    assert_eq!(config.replica_count, 3);
    assert_eq!(config.service.service_type, ServiceType::LoadBalancer);
    assert_eq!(config.service.port, 8080);
    assert!(config.database.is_managed());
}

/// `--set` overrides apply after every file.
#[test]
fn test_overrides_after_files() {
    let config = load(
        &["managed-mysql.yaml"],
        &["replicaCount=5", "environment.EXTRA_SETTING=disabled"],
    );
    assert_eq!(config.replica_count, 5);
    assert_eq!(
        config.environment.get("EXTRA_SETTING").map(String::as_str),
        Some("disabled")
    );
}

/// Numbers and booleans given to text fields reach the container as typed.
#[test]
fn test_scalar_overrides_render_as_text() {
    let config = load(
        &["managed-mysql.yaml"],
        &[
            "environment.ZENML_SERVER_PORT=8080",
            "environment.ZENML_ENABLE_DASHBOARD=false",
            "image.tag=2024.10",
        ],
    );
    let rendered = render(&config, &release()).unwrap();
    let container = server_container(&rendered.bundle);
    assert_eq!(env_value(container, "ZENML_SERVER_PORT"), Some("8080"));
    assert_eq!(env_value(container, "ZENML_ENABLE_DASHBOARD"), Some("false"));
    assert!(container.image.as_deref().unwrap().ends_with(":2024.10"));
}

/// A null in a later file removes the database and falls back to one replica.
#[test]
fn test_null_drops_database() {
    let dir = TempDir::new().unwrap();
    let overlay = dir.path().join("no-db.yaml");
    fs::write(&overlay, "database:\n  url: null\n").unwrap();

    let config = load_values(&[fixture("managed-mysql.yaml"), overlay], &[]).unwrap();
    assert!(!config.database.is_managed());

    let rendered = render(&config, &release()).unwrap();
    assert_eq!(
        rendered.bundle.deployment.spec.as_ref().unwrap().replicas,
        Some(1)
    );
    let container = server_container(&rendered.bundle);
    assert_eq!(env_value(container, "ZENML_STORE_TYPE"), None);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_values(&[dir.path().join("absent.yaml")], &[]).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_invalid_yaml_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "image: [unterminated\n").unwrap();

    let err = load_values(&[path], &[]).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert!(err.is_configuration_error());
}

#[test]
fn test_invalid_override_expression() {
    let err = load_values::<&str>(&[], &["replicaCount".to_string()]).unwrap_err();
    assert!(matches!(err, Error::InvalidOverride { .. }));
}

// ============================================================================
// Output
// ============================================================================

/// The stream holds one document per resource in apply order.
#[test]
fn test_stream_document_order() {
    let config = load(&["autoscaled-ingress.yaml"], &[]);
    let rendered = render(&config, &release()).unwrap();
    let yaml = rendered.bundle.to_yaml().unwrap();

    let kinds: Vec<&str> = yaml
        .split(DOCUMENT_SEPARATOR)
        .filter(|doc| !doc.trim().is_empty())
        .filter_map(|doc| {
            doc.lines()
                .find_map(|line| line.strip_prefix("kind: "))
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "ServiceAccount",
            "Secret",
            "Service",
            "Deployment",
            "HorizontalPodAutoscaler",
            "Ingress"
        ]
    );
}

/// Every document parses back as YAML with the expected identity.
#[test]
fn test_documents_are_valid_yaml() {
    let rendered = render(&load(&["managed-mysql.yaml"], &[]), &release()).unwrap();
    for document in rendered.bundle.documents().unwrap() {
        let value: serde_yaml::Value = serde_yaml::from_str(&document.content).unwrap();
        assert_eq!(value["kind"].as_str(), Some(document.kind));
        assert_eq!(value["metadata"]["namespace"].as_str(), Some("zenml"));
        assert_eq!(
            value["metadata"]["labels"]["app.kubernetes.io/instance"].as_str(),
            Some("zenml-server")
        );
    }
}

/// Documents can be written one file per resource.
#[test]
fn test_documents_written_to_directory() {
    let dir = TempDir::new().unwrap();
    let rendered = render(&load(&["autoscaled-ingress.yaml"], &[]), &release()).unwrap();
    for document in rendered.bundle.documents().unwrap() {
        fs::write(dir.path().join(document.file_name), &document.content).unwrap();
    }

    let deployment = fs::read_to_string(dir.path().join("deployment.yaml")).unwrap();
    assert!(deployment.contains("checksum/secret"));
    assert!(dir.path().join("hpa.yaml").exists());
    assert!(dir.path().join("ingress.yaml").exists());
}
