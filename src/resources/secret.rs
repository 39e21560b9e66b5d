//! Server Secret generation.
//!
//! Sensitive settings live in a Secret imported into the container with
//! `envFrom`, so a key added here shows up in the pod without touching the
//! Deployment. The Deployment carries a checksum of this manifest so a content
//! change still rolls the pods.

use k8s_openapi::api::core::v1::Secret;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::resolver::ResolvedDeploymentSpec;
use crate::resources::common::object_meta;

/// Pod template annotation holding the Secret checksum
pub const SECRET_CHECKSUM_ANNOTATION: &str = "checksum/secret";

/// Generate the server Secret.
pub fn generate_secret(spec: &ResolvedDeploymentSpec) -> Secret {
    let data = secret_data(spec);

    Secret {
        metadata: object_meta(spec, &spec.names().fullname),
        type_: Some("Opaque".to_string()),
        string_data: if data.is_empty() { None } else { Some(data) },
        ..Default::default()
    }
}

/// Key/value pairs stored in the Secret.
fn secret_data(spec: &ResolvedDeploymentSpec) -> BTreeMap<String, String> {
    let config = spec.config();
    let mut data = BTreeMap::new();

    if spec.is_managed_database() {
        let database = &config.database;
        let entries = [
            ("ZENML_STORE_URL", database.url.as_ref()),
            ("ZENML_STORE_PASSWORD", database.password.as_ref()),
            ("ZENML_STORE_SSL_CA", database.ssl_ca.as_ref()),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                data.insert(key.to_string(), value.clone());
            }
        }
    }

    if let Some(key) = &config.jwt_secret_key {
        data.insert("ZENML_SERVER_JWT_SECRET_KEY".to_string(), key.clone());
    }

    data
}

/// SHA-256 of the rendered Secret, hex encoded.
pub fn secret_checksum(secret: &Secret) -> Result<String> {
    let rendered = serde_yaml::to_string(secret).map_err(Error::Yaml)?;
    Ok(content_checksum(&rendered))
}

/// SHA-256 of `content`, hex encoded.
pub fn content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
