//! Configuration resolution.
//!
//! Turns a raw [`Configuration`] into a [`ResolvedDeploymentSpec`]: validated,
//! with every conditional value decided and the environment composed. The
//! emitters read only the resolved spec.
//!
//! ## Deployment modes
//!
//! | `database.url` | `autoscaling.enabled` | Replicas |
//! |----------------|-----------------------|----------|
//! | unset | any | 1 |
//! | set | false | `replicaCount` |
//! | set | true | omitted, owned by the autoscaler |

pub mod flags;
pub mod naming;
pub mod validation;

use tracing::{debug, info};

use crate::config::{AutoscalingSpec, Configuration, Release};
use crate::environment::{self, EnvironmentEntry};
use crate::error::Result;

pub use flags::CoreFlags;
pub use naming::ResourceNames;
pub use validation::{validate_config, validate_release};

/// Effective replica count.
///
/// Without an external database the server keeps state on the pod, so only a
/// single replica is safe.
pub fn effective_replicas(config: &Configuration) -> Option<i32> {
    if !config.database.is_managed() {
        Some(1)
    } else if config.autoscaling.enabled {
        None
    } else {
        Some(config.replica_count)
    }
}

/// Autoscaler settings, only when the autoscaler owns the replica count.
pub fn effective_autoscaling(config: &Configuration) -> Option<AutoscalingSpec> {
    (config.database.is_managed() && config.autoscaling.enabled)
        .then(|| config.autoscaling.clone())
}

/// URL scheme clients use through the ingress.
pub fn ingress_scheme(config: &Configuration) -> &'static str {
    if config.ingress.tls.enabled {
        "https"
    } else {
        "http"
    }
}

/// Read-only snapshot of everything a render needs.
#[derive(Clone, Debug)]
pub struct ResolvedDeploymentSpec {
    config: Configuration,
    release: Release,
    names: ResourceNames,
    image: String,
    replicas: Option<i32>,
    autoscaling: Option<AutoscalingSpec>,
    environment: Vec<EnvironmentEntry>,
}

impl ResolvedDeploymentSpec {
    /// Normalized configuration.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn release(&self) -> &Release {
        &self.release
    }

    pub fn names(&self) -> &ResourceNames {
        &self.names
    }

    /// Full image reference.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Replica count for the Deployment; `None` leaves it to the autoscaler.
    pub fn replicas(&self) -> Option<i32> {
        self.replicas
    }

    pub fn autoscaling(&self) -> Option<&AutoscalingSpec> {
        self.autoscaling.as_ref()
    }

    /// Composed container environment.
    pub fn environment(&self) -> &[EnvironmentEntry] {
        &self.environment
    }

    /// True when an external database is configured.
    pub fn is_managed_database(&self) -> bool {
        self.config.database.is_managed()
    }
}

/// Resolve `config` for `release`.
pub fn resolve(config: &Configuration, release: &Release) -> Result<ResolvedDeploymentSpec> {
    validate_release(release)?;
    validate_config(config)?;

    let names = ResourceNames::new(config, release);
    let image = image_reference(config, release);
    let replicas = effective_replicas(config);
    let autoscaling = effective_autoscaling(config);
    let environment = environment::compose(config)?;

    info!(
        release = %release.name,
        namespace = %release.namespace,
        fullname = %names.fullname,
        managed_database = config.database.is_managed(),
        replicas = ?replicas,
        "Resolved deployment"
    );
    debug!(image = %image, env_count = environment.len(), "Resolved container");

    Ok(ResolvedDeploymentSpec {
        config: config.clone(),
        release: release.clone(),
        names,
        image,
        replicas,
        autoscaling,
        environment,
    })
}

/// `<repository>:<tag>`, tag defaulting to the release app version.
fn image_reference(config: &Configuration, release: &Release) -> String {
    let repository = config
        .image
        .repository
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    let tag = config
        .image
        .tag
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(&release.app_version);
    format!("{repository}:{tag}")
}
