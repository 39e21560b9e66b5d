//! Common resource generation utilities.
//!
//! Labels and metadata shared by every generated resource.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::resolver::ResolvedDeploymentSpec;

/// Value of `app.kubernetes.io/managed-by`
pub const MANAGED_BY: &str = "zenml-manifests";

/// Named container port the server listens on
pub const HTTP_PORT_NAME: &str = "http";

/// Port the server binds inside the container
pub const CONTAINER_PORT: i32 = 8080;

/// Labels identifying the server pods.
///
/// Used verbatim as the Deployment selector and the pod template labels.
pub fn pod_selector_labels(spec: &ResolvedDeploymentSpec) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/name".to_string(),
        spec.names().name.clone(),
    );
    labels.insert(
        "app.kubernetes.io/instance".to_string(),
        spec.release().name.clone(),
    );
    labels
}

/// Standard labels applied to all managed resources
pub fn standard_labels(spec: &ResolvedDeploymentSpec) -> BTreeMap<String, String> {
    let mut labels = pod_selector_labels(spec);
    labels.insert("helm.sh/chart".to_string(), spec.release().chart_label());
    labels.insert(
        "app.kubernetes.io/version".to_string(),
        spec.release().app_version.clone(),
    );
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY.to_string(),
    );
    labels
}

/// Metadata for a namespaced resource named `name`.
pub fn object_meta(spec: &ResolvedDeploymentSpec, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(spec.release().namespace.clone()),
        labels: Some(standard_labels(spec)),
        ..Default::default()
    }
}

/// `None` for an empty map, so the field is left out of the manifest.
pub fn non_empty_map(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if map.is_empty() {
        None
    } else {
        Some(map.clone())
    }
}

/// `None` for an empty list.
pub fn non_empty_vec<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items.to_vec())
    }
}
