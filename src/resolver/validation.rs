//! Validation of the release identity and the configuration tree.
//!
//! Checks structural problems the type system cannot express:
//! - Release name and namespace as DNS-1123 labels
//! - Required image repository
//! - Replica and autoscaler bounds
//! - Port ranges and ingress paths
//! - Secrets store combinations

use crate::config::{Configuration, Release, SecretsStoreSpec, SecretsStoreType};
use crate::error::{Error, Result};

/// Longest release name; leaves room for suffixes within 63 characters
pub const MAX_RELEASE_NAME_LEN: usize = 53;

/// Longest namespace name
pub const MAX_NAMESPACE_LEN: usize = 63;

/// Minimum number of replicas
pub const MIN_REPLICAS: i32 = 1;

/// Highest valid TCP port
pub const MAX_PORT: i32 = 65535;

/// Validate the release name and namespace
pub fn validate_release(release: &Release) -> Result<()> {
    validate_dns_label("release.name", &release.name, MAX_RELEASE_NAME_LEN)?;
    validate_dns_label("release.namespace", &release.namespace, MAX_NAMESPACE_LEN)
}

/// Lowercase alphanumerics and '-', starting and ending with an alphanumeric
fn validate_dns_label(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.is_empty() {
        return Err(Error::MissingField(field.to_string()));
    }
    if value.len() > max_len {
        return Err(Error::validation(
            field,
            format!("'{value}' is longer than {max_len} characters"),
        ));
    }
    let alphanumeric = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    if !value.chars().all(|c| alphanumeric(c) || c == '-') {
        return Err(Error::validation(
            field,
            format!("'{value}' may only contain lowercase letters, digits and '-'"),
        ));
    }
    if !value.starts_with(alphanumeric) || !value.ends_with(alphanumeric) {
        return Err(Error::validation(
            field,
            format!("'{value}' must start and end with a letter or digit"),
        ));
    }
    Ok(())
}

/// Validate the configuration
pub fn validate_config(config: &Configuration) -> Result<()> {
    validate_image(config)?;
    validate_replicas(config)?;
    validate_service(config)?;
    validate_ingress(config)?;
    validate_secrets_store("secretsStore", &config.secrets_store)?;
    validate_secrets_store("backupSecretsStore", &config.backup_secrets_store)?;
    Ok(())
}

/// The image repository is the one field without a usable fallback
fn validate_image(config: &Configuration) -> Result<()> {
    match config.image.repository.as_deref().map(str::trim) {
        None | Some("") => Err(Error::MissingField("image.repository".to_string())),
        Some(_) => Ok(()),
    }
}

/// Validate replica count and autoscaler bounds
fn validate_replicas(config: &Configuration) -> Result<()> {
    if config.replica_count < MIN_REPLICAS {
        return Err(Error::validation(
            "replicaCount",
            format!(
                "replica count {} is below minimum {}",
                config.replica_count, MIN_REPLICAS
            ),
        ));
    }

    let autoscaling = &config.autoscaling;
    if !autoscaling.enabled {
        return Ok(());
    }
    if autoscaling.min_replicas < MIN_REPLICAS {
        return Err(Error::validation(
            "autoscaling.minReplicas",
            format!(
                "minimum replicas {} is below {}",
                autoscaling.min_replicas, MIN_REPLICAS
            ),
        ));
    }
    if autoscaling.max_replicas < autoscaling.min_replicas {
        return Err(Error::validation(
            "autoscaling.maxReplicas",
            format!(
                "maximum replicas {} is below minimum {}",
                autoscaling.max_replicas, autoscaling.min_replicas
            ),
        ));
    }
    let targets = [
        (
            "autoscaling.targetCPUUtilizationPercentage",
            autoscaling.target_cpu_utilization_percentage,
        ),
        (
            "autoscaling.targetMemoryUtilizationPercentage",
            autoscaling.target_memory_utilization_percentage,
        ),
    ];
    for (field, target) in targets {
        if let Some(value) = target
            && value < 0
        {
            return Err(Error::validation(field, "utilization target must not be negative"));
        }
    }
    if !targets.iter().any(|(_, target)| target.is_some_and(|value| value > 0)) {
        return Err(Error::validation(
            "autoscaling",
            "at least one utilization target must be set",
        ));
    }
    Ok(())
}

/// Validate the service port
fn validate_service(config: &Configuration) -> Result<()> {
    let port = config.service.port;
    if !(1..=MAX_PORT).contains(&port) {
        return Err(Error::validation(
            "service.port",
            format!("port {port} is outside 1-{MAX_PORT}"),
        ));
    }
    Ok(())
}

/// Validate ingress path and host
fn validate_ingress(config: &Configuration) -> Result<()> {
    let ingress = &config.ingress;
    if !ingress.enabled {
        return Ok(());
    }
    if !ingress.path.starts_with('/') {
        return Err(Error::validation(
            "ingress.path",
            format!("path '{}' must start with '/'", ingress.path),
        ));
    }
    if let Some(host) = &ingress.host
        && (host.contains("://") || host.contains('/'))
    {
        return Err(Error::validation(
            "ingress.host",
            format!("host '{host}' must be a bare host name"),
        ));
    }
    Ok(())
}

/// A custom store needs the class to load
fn validate_secrets_store(field: &str, store: &SecretsStoreSpec) -> Result<()> {
    if !store.enabled {
        return Ok(());
    }
    if store.store_type == SecretsStoreType::Custom
        && store
            .class_path
            .as_deref()
            .is_none_or(|path| path.trim().is_empty())
    {
        return Err(Error::MissingField(format!("{field}.classPath")));
    }
    Ok(())
}
