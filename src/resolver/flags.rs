//! Conditional server flags.
//!
//! Each flag that may or may not reach the container is decided here, once, as
//! an `Option`. Nothing downstream re-checks the configuration.

use crate::config::{AuthType, Configuration};
use crate::environment::EnvironmentEntry;

/// Store type used when an external database is configured.
pub const SQL_STORE_TYPE: &str = "sql";

/// Verbosity applied in debug mode.
pub const DEBUG_VERBOSITY: &str = "DEBUG";

/// Render a boolean the way the server parses flags.
pub fn flag_value(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Core server flags derived from the configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreFlags {
    /// `ZENML_LOGGING_VERBOSITY`, only in debug mode.
    pub logging_verbosity: Option<&'static str>,
    /// `ZENML_ANALYTICS_OPT_IN`, always present.
    pub analytics_opt_in: bool,
    /// `ZENML_DEFAULT_PROJECT_NAME`.
    pub default_project_name: String,
    /// `ZENML_DEFAULT_USER_NAME`.
    pub default_username: String,
    /// `ZENML_AUTH_TYPE`.
    pub auth_type: Option<AuthType>,
    /// `ZENML_ENABLE_IMPLICIT_AUTH_METHODS`, only when enabled.
    pub enable_implicit_auth_methods: Option<bool>,
    /// `ZENML_SERVER_URL`.
    pub server_url: Option<String>,
    /// `ZENML_SERVER_DEPLOYMENT_TYPE`.
    pub deployment_type: Option<String>,
    /// `ZENML_STORE_TYPE`, only with an external database.
    pub store_type: Option<&'static str>,
    /// `DISABLE_DATABASE_MIGRATION`, only with an external database.
    pub disable_database_migration: Option<bool>,
    /// `ZENML_STORE_SSL_VERIFY_SERVER_CERT`, only with an external database.
    pub ssl_verify_server_cert: Option<bool>,
}

impl CoreFlags {
    pub fn from_config(config: &Configuration) -> Self {
        let managed = config.database.is_managed();

        Self {
            logging_verbosity: config.debug.then_some(DEBUG_VERBOSITY),
            analytics_opt_in: config.analytics_opt_in,
            default_project_name: config.default_project_name.clone(),
            default_username: config.default_username.clone(),
            auth_type: config.auth_type,
            enable_implicit_auth_methods: config.enable_implicit_auth_methods.then_some(true),
            server_url: config.server_url.clone(),
            deployment_type: config.deployment_type.clone(),
            store_type: managed.then_some(SQL_STORE_TYPE),
            // The schema is migrated out of band when the database is external
            disable_database_migration: managed.then_some(true),
            ssl_verify_server_cert: managed
                .then(|| config.database.ssl_verify_server_cert.unwrap_or(false)),
        }
    }

    /// Environment entries in emission order.
    pub fn entries(&self) -> Vec<EnvironmentEntry> {
        let mut env = Vec::new();

        if let Some(verbosity) = self.logging_verbosity {
            env.push(EnvironmentEntry::new("ZENML_LOGGING_VERBOSITY", verbosity));
        }
        env.push(EnvironmentEntry::new(
            "ZENML_ANALYTICS_OPT_IN",
            flag_value(self.analytics_opt_in),
        ));
        env.push(EnvironmentEntry::new(
            "ZENML_DEFAULT_PROJECT_NAME",
            &self.default_project_name,
        ));
        env.push(EnvironmentEntry::new(
            "ZENML_DEFAULT_USER_NAME",
            &self.default_username,
        ));
        if let Some(auth_type) = self.auth_type {
            env.push(EnvironmentEntry::new("ZENML_AUTH_TYPE", auth_type.as_str()));
        }
        if let Some(enabled) = self.enable_implicit_auth_methods {
            env.push(EnvironmentEntry::new(
                "ZENML_ENABLE_IMPLICIT_AUTH_METHODS",
                flag_value(enabled),
            ));
        }
        if let Some(url) = &self.server_url {
            env.push(EnvironmentEntry::new("ZENML_SERVER_URL", url));
        }
        if let Some(deployment_type) = &self.deployment_type {
            env.push(EnvironmentEntry::new(
                "ZENML_SERVER_DEPLOYMENT_TYPE",
                deployment_type,
            ));
        }
        if let Some(store_type) = self.store_type {
            env.push(EnvironmentEntry::new("ZENML_STORE_TYPE", store_type));
        }
        if let Some(disabled) = self.disable_database_migration {
            env.push(EnvironmentEntry::new(
                "DISABLE_DATABASE_MIGRATION",
                flag_value(disabled),
            ));
        }
        if let Some(verify) = self.ssl_verify_server_cert {
            env.push(EnvironmentEntry::new(
                "ZENML_STORE_SSL_VERIFY_SERVER_CERT",
                flag_value(verify),
            ));
        }

        env
    }
}
