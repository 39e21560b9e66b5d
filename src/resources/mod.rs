//! Resource generation module.
//!
//! Builds the Kubernetes resources for a resolved ZenML server deployment.
//!
//! ## Resources Generated
//!
//! | Resource | Purpose | When |
//! |----------|---------|------|
//! | ServiceAccount | Pod identity | `serviceAccount.create` |
//! | Secret | Database URL, credentials, JWT key | always |
//! | Service | Stable endpoint for the server | always |
//! | Deployment | Server pods | always |
//! | HorizontalPodAutoscaler | Replica management | autoscaling with external database |
//! | Ingress | External HTTP(S) access | `ingress.enabled` |

pub mod autoscaler;
pub mod common;
pub mod deployment;
pub mod ingress;
pub mod secret;
pub mod service_account;
pub mod services;

// Re-export commonly used items from common
pub use common::{pod_selector_labels, standard_labels};

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::resolver::ResolvedDeploymentSpec;

/// Separator between documents in a YAML stream
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// Every resource produced by one render.
#[derive(Clone, Debug)]
pub struct ManifestBundle {
    pub service_account: Option<ServiceAccount>,
    pub secret: Secret,
    pub service: Service,
    pub deployment: Deployment,
    pub autoscaler: Option<HorizontalPodAutoscaler>,
    pub ingress: Option<Ingress>,
    /// Checksum stamped on the pod template.
    pub secret_checksum: String,
}

/// One rendered manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedManifest {
    /// Resource kind, e.g. `Deployment`.
    pub kind: &'static str,
    /// Suggested file name, e.g. `deployment.yaml`.
    pub file_name: &'static str,
    /// YAML document.
    pub content: String,
}

impl ManifestBundle {
    /// Render each resource as its own YAML document, in apply order.
    pub fn documents(&self) -> Result<Vec<RenderedManifest>> {
        let mut documents = Vec::new();
        if let Some(service_account) = &self.service_account {
            documents.push(render("ServiceAccount", "serviceaccount.yaml", service_account)?);
        }
        documents.push(render("Secret", "secret.yaml", &self.secret)?);
        documents.push(render("Service", "service.yaml", &self.service)?);
        documents.push(render("Deployment", "deployment.yaml", &self.deployment)?);
        if let Some(autoscaler) = &self.autoscaler {
            documents.push(render("HorizontalPodAutoscaler", "hpa.yaml", autoscaler)?);
        }
        if let Some(ingress) = &self.ingress {
            documents.push(render("Ingress", "ingress.yaml", ingress)?);
        }
        Ok(documents)
    }

    /// Render the bundle as one multi-document YAML stream.
    pub fn to_yaml(&self) -> Result<String> {
        let mut out = String::new();
        for document in self.documents()? {
            out.push_str(DOCUMENT_SEPARATOR);
            out.push_str(&document.content);
        }
        Ok(out)
    }
}

fn render<T: Serialize>(
    kind: &'static str,
    file_name: &'static str,
    resource: &T,
) -> Result<RenderedManifest> {
    let content = serde_yaml::to_string(resource).map_err(Error::Yaml)?;
    Ok(RenderedManifest {
        kind,
        file_name,
        content,
    })
}

/// Emit every resource for `spec`.
pub fn emit(spec: &ResolvedDeploymentSpec) -> Result<ManifestBundle> {
    let secret = secret::generate_secret(spec);
    let secret_checksum = secret::secret_checksum(&secret)?;

    let bundle = ManifestBundle {
        service_account: service_account::generate_service_account(spec),
        service: services::generate_service(spec),
        deployment: deployment::generate_deployment(spec, &secret_checksum),
        autoscaler: autoscaler::generate_autoscaler(spec),
        ingress: ingress::generate_ingress(spec),
        secret,
        secret_checksum,
    };

    debug!(
        fullname = %spec.names().fullname,
        checksum = %bundle.secret_checksum,
        autoscaler = bundle.autoscaler.is_some(),
        ingress = bundle.ingress.is_some(),
        "Emitted manifests"
    );
    Ok(bundle)
}
