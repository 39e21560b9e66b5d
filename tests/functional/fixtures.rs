//! Shared helpers for functional tests.

use std::path::PathBuf;

use k8s_openapi::api::core::v1::{Container, EnvVar};
use zenml_manifests::config::{Configuration, Release};
use zenml_manifests::{ManifestBundle, Rendered, load_values, render};

/// Path of a values fixture under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load fixtures in order, then apply overrides.
pub fn load(names: &[&str], overrides: &[&str]) -> Configuration {
    let files: Vec<PathBuf> = names.iter().map(|name| fixture(name)).collect();
    let overrides: Vec<String> = overrides.iter().map(|s| s.to_string()).collect();
    load_values(&files, &overrides).unwrap()
}

/// Release used by every scenario.
pub fn release() -> Release {
    Release::new("zenml-server", "zenml")
}

/// Load and render fixtures with the shared release.
pub fn render_fixtures(names: &[&str]) -> Rendered {
    render(&load(names, &[]), &release()).unwrap()
}

/// The server container.
pub fn server_container(bundle: &ManifestBundle) -> &Container {
    &bundle
        .deployment
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap()
        .containers[0]
}

/// Value of a literal container environment variable.
pub fn env_value<'a>(container: &'a Container, name: &str) -> Option<&'a str> {
    container
        .env
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|var: &&EnvVar| var.name == name)
        .and_then(|var| var.value.as_deref())
}
