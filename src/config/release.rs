//! Release identity supplied by the invoker rather than the values tree.

use serde::{Deserialize, Serialize};

/// Chart name used for naming and the `helm.sh/chart` label.
pub const CHART_NAME: &str = "zenml";

/// Version of the bundle.
pub const CHART_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server version deployed when the image tag is not set.
pub const DEFAULT_APP_VERSION: &str = "0.58.0";

/// Identifies one installation of the server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Release name, the prefix of generated resource names.
    pub name: String,
    /// Target namespace.
    pub namespace: String,
    /// Chart name.
    pub chart_name: String,
    /// Chart version.
    pub chart_version: String,
    /// Server version, used as the default image tag.
    pub app_version: String,
}

impl Release {
    /// Release with the bundled chart identity.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            chart_name: CHART_NAME.to_string(),
            chart_version: CHART_VERSION.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
        }
    }

    /// Override the server version.
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }

    /// Value of the `helm.sh/chart` label.
    pub fn chart_label(&self) -> String {
        format!("{}-{}", self.chart_name, self.chart_version).replace('+', "_")
    }
}

impl Default for Release {
    fn default() -> Self {
        Self::new("zenml", "default")
    }
}
