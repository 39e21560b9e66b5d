//! Resource naming.
//!
//! Kubernetes names are DNS labels: at most 63 characters, no trailing dash.

use crate::config::{Configuration, Release};

/// Maximum length of a DNS label.
pub const MAX_NAME_LENGTH: usize = 63;

/// Names shared by every generated resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceNames {
    /// Short application name, the `app.kubernetes.io/name` label.
    pub name: String,
    /// Full name used for the Deployment, Service, Secret and Ingress.
    pub fullname: String,
    /// Service account the pod runs as.
    pub service_account: String,
}

impl ResourceNames {
    pub fn new(config: &Configuration, release: &Release) -> Self {
        let name = app_name(config, release);
        let fullname = fullname(config, release);
        let service_account = service_account_name(config, &fullname);
        Self {
            name,
            fullname,
            service_account,
        }
    }
}

/// Chart name, or `nameOverride`.
pub fn app_name(config: &Configuration, release: &Release) -> String {
    let name = config
        .name_override
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&release.chart_name);
    truncate_name(name)
}

/// `fullnameOverride`, else the release name when it already contains the
/// application name, else `<release>-<name>`.
pub fn fullname(config: &Configuration, release: &Release) -> String {
    if let Some(fullname) = config
        .fullname_override
        .as_deref()
        .filter(|n| !n.is_empty())
    {
        return truncate_name(fullname);
    }

    let name = config
        .name_override
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&release.chart_name);
    if release.name.contains(name) {
        truncate_name(&release.name)
    } else {
        truncate_name(&format!("{}-{}", release.name, name))
    }
}

/// Service account name: the configured one, the full name when created, else `default`.
pub fn service_account_name(config: &Configuration, fullname: &str) -> String {
    match config.service_account.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None if config.service_account.create => fullname.to_string(),
        None => "default".to_string(),
    }
}

/// Truncate to a DNS label and drop trailing dashes.
pub fn truncate_name(name: &str) -> String {
    let truncated: String = name.chars().take(MAX_NAME_LENGTH).collect();
    truncated.trim_end_matches('-').to_string()
}
