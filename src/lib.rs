//! zenml-manifests library crate
//!
//! Renders the Kubernetes manifests for a ZenML server deployment from a
//! layered values configuration, together with the post-install access
//! instructions.

pub mod config;
pub mod environment;
pub mod error;
pub mod notes;
pub mod resolver;
pub mod resources;

pub use config::{Configuration, Release, load_values};
pub use environment::{EnvironmentEntry, compose};
pub use error::{Error, Result};
pub use notes::{AccessInstructions, describe_access};
pub use resolver::{ResolvedDeploymentSpec, resolve};
pub use resources::{ManifestBundle, emit};

use tracing::info;

/// Output of a single render.
#[derive(Clone, Debug)]
pub struct Rendered {
    pub spec: ResolvedDeploymentSpec,
    pub bundle: ManifestBundle,
    pub notes: AccessInstructions,
}

/// Resolve `config`, emit its manifests and derive the access instructions.
///
/// Nothing is emitted when resolution fails.
pub fn render(config: &Configuration, release: &Release) -> Result<Rendered> {
    let spec = resolve(config, release)?;
    let bundle = emit(&spec)?;
    let notes = describe_access(&spec);

    info!(
        release = %release.name,
        namespace = %release.namespace,
        access_determined = notes.is_determined(),
        "Rendered ZenML server manifests"
    );

    Ok(Rendered {
        spec,
        bundle,
        notes,
    })
}
