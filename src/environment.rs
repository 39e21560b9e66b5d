//! Environment composition.
//!
//! The server container's environment is built from five sources, folded in
//! a fixed order. A later source replaces the value of a name an earlier
//! source already set, keeping the original position; new names are appended.
//!
//! | Order | Source | Contributes |
//! |-------|--------|-------------|
//! | 1 | Core flags | verbosity, analytics, defaults, store type, migration, SSL |
//! | 2 | Database | pool and backup settings, external database only |
//! | 3 | Secrets store | backend type, auth method, settings |
//! | 4 | Backup secrets store | same, when enabled |
//! | 5 | User environment | free-form overrides |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{Configuration, DatabaseSpec, SecretsStoreSpec};
use crate::error::{Error, Result};
use crate::resolver::flags::{CoreFlags, flag_value};

/// A single environment variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct EnvironmentEntry {
    pub name: String,
    pub value: String,
}

impl EnvironmentEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Origin of a group of environment entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvSource {
    Core,
    Database,
    SecretsStore,
    BackupSecretsStore,
    User,
}

impl EnvSource {
    /// Sources in merge order; later entries win.
    pub const PRECEDENCE: [EnvSource; 5] = [
        EnvSource::Core,
        EnvSource::Database,
        EnvSource::SecretsStore,
        EnvSource::BackupSecretsStore,
        EnvSource::User,
    ];

    /// Entries this source contributes for `config`.
    pub fn entries(&self, config: &Configuration) -> Result<Vec<EnvironmentEntry>> {
        let entries = match self {
            EnvSource::Core => CoreFlags::from_config(config).entries(),
            EnvSource::Database => database_entries(&config.database),
            EnvSource::SecretsStore => secrets_store_entries(
                *self,
                "ZENML_SECRETS_STORE_",
                &config.secrets_store,
                true,
            )?,
            EnvSource::BackupSecretsStore => secrets_store_entries(
                *self,
                "ZENML_BACKUP_SECRETS_STORE_",
                &config.backup_secrets_store,
                false,
            )?,
            EnvSource::User => config
                .environment
                .iter()
                .map(|(name, value)| EnvironmentEntry::new(name, value))
                .collect(),
        };

        for entry in &entries {
            validate_name(*self, &entry.name)?;
        }
        Ok(entries)
    }
}

impl std::fmt::Display for EnvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvSource::Core => write!(f, "core flags"),
            EnvSource::Database => write!(f, "database"),
            EnvSource::SecretsStore => write!(f, "secrets store"),
            EnvSource::BackupSecretsStore => write!(f, "backup secrets store"),
            EnvSource::User => write!(f, "user environment"),
        }
    }
}

/// Ordered, name-unique environment list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentList {
    entries: Vec<EnvironmentEntry>,
    index: BTreeMap<String, usize>,
}

impl EnvironmentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `entry`, replacing in place if the name exists. Returns the replaced value.
    pub fn set(&mut self, entry: EnvironmentEntry) -> Option<String> {
        match self.index.get(&entry.name) {
            Some(&position) => self
                .entries
                .get_mut(position)
                .map(|existing| std::mem::replace(&mut existing.value, entry.value)),
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .and_then(|&position| self.entries.get(position))
            .map(|entry| entry.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvironmentEntry> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<EnvironmentEntry> {
        self.entries
    }
}

/// Compose the container environment for `config`.
pub fn compose(config: &Configuration) -> Result<Vec<EnvironmentEntry>> {
    let mut env = EnvironmentList::new();

    for source in EnvSource::PRECEDENCE {
        let entries = source.entries(config)?;
        trace!(source = %source, count = entries.len(), "Merging environment source");
        for entry in entries {
            let name = entry.name.clone();
            if let Some(previous) = env.set(entry) {
                debug!(
                    name = %name,
                    source = %source,
                    previous = %previous,
                    "Environment entry overridden"
                );
            }
        }
    }

    debug!(count = env.len(), "Composed environment");
    Ok(env.into_vec())
}

/// Database tuning passed to the server, only with an external database.
fn database_entries(database: &DatabaseSpec) -> Vec<EnvironmentEntry> {
    if !database.is_managed() {
        return Vec::new();
    }

    let mut env = Vec::new();
    if let Some(pool_size) = database.pool_size {
        env.push(EnvironmentEntry::new(
            "ZENML_STORE_POOL_SIZE",
            pool_size.to_string(),
        ));
    }
    if let Some(max_overflow) = database.max_overflow {
        env.push(EnvironmentEntry::new(
            "ZENML_STORE_MAX_OVERFLOW",
            max_overflow.to_string(),
        ));
    }
    if let Some(strategy) = database.backup_strategy {
        env.push(EnvironmentEntry::new(
            "ZENML_STORE_BACKUP_STRATEGY",
            strategy.as_str(),
        ));
    }
    if let Some(backup_database) = &database.backup_database {
        env.push(EnvironmentEntry::new(
            "ZENML_STORE_BACKUP_DATABASE",
            backup_database,
        ));
    }
    env
}

/// Secrets store settings. A disabled primary store is reported as `none`.
fn secrets_store_entries(
    origin: EnvSource,
    prefix: &str,
    store: &SecretsStoreSpec,
    primary: bool,
) -> Result<Vec<EnvironmentEntry>> {
    if !store.enabled {
        return Ok(if primary {
            vec![EnvironmentEntry::new(format!("{prefix}TYPE"), "none")]
        } else {
            Vec::new()
        });
    }

    let mut env = vec![EnvironmentEntry::new(
        format!("{prefix}TYPE"),
        store.store_type.as_str(),
    )];
    if let Some(method) = &store.auth_method {
        env.push(EnvironmentEntry::new(format!("{prefix}AUTH_METHOD"), method));
    }
    if let Some(class_path) = &store.class_path {
        env.push(EnvironmentEntry::new(
            format!("{prefix}CLASS_PATH"),
            class_path,
        ));
    }
    for (name, value) in &store.settings {
        env.push(EnvironmentEntry::new(name, scalar_value(origin, name, value)?));
    }
    Ok(env)
}

/// Stringify a settings value; only scalars are accepted.
fn scalar_value(origin: EnvSource, name: &str, value: &serde_json::Value) -> Result<String> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Bool(b) => Ok(flag_value(*b).to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Err(Error::MalformedSource {
            origin,
            reason: format!("'{name}' has no value"),
        }),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(Error::MalformedSource {
            origin,
            reason: format!("'{name}' must be a scalar"),
        }),
    }
}

/// Reject names Kubernetes will not accept as environment variables.
fn validate_name(origin: EnvSource, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::MalformedSource {
            origin,
            reason: "empty variable name".to_string(),
        });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_graphic() || *c == '=')
    {
        return Err(Error::MalformedSource {
            origin,
            reason: format!("invalid character {c:?} in '{name}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::{BackupStrategy, SecretsStoreType};
    use serde_json::json;

    fn managed_config() -> Configuration {
        Configuration {
            database: DatabaseSpec {
                url: Some("mysql://zenml@db:3306/zenml".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn value<'a>(env: &'a [EnvironmentEntry], name: &str) -> Option<&'a str> {
        env.iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    #[test]
    fn test_list_replaces_in_place() {
        let mut list = EnvironmentList::new();
        assert_eq!(list.set(EnvironmentEntry::new("A", "1")), None);
        assert_eq!(list.set(EnvironmentEntry::new("B", "2")), None);
        assert_eq!(
            list.set(EnvironmentEntry::new("A", "3")),
            Some("1".to_string())
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list.get("A"), Some("3"));
        let names: Vec<_> = list.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_default_environment() {
        let env = compose(&Configuration::default()).unwrap();
        assert_eq!(value(&env, "ZENML_ANALYTICS_OPT_IN"), Some("True"));
        assert_eq!(value(&env, "ZENML_DEFAULT_PROJECT_NAME"), Some("default"));
        assert_eq!(value(&env, "ZENML_SECRETS_STORE_TYPE"), Some("sql"));
        assert_eq!(value(&env, "ZENML_STORE_TYPE"), None);
        assert_eq!(value(&env, "ZENML_LOGGING_VERBOSITY"), None);
    }

    #[test]
    fn test_user_override_wins_and_keeps_position() {
        let mut config = Configuration::default();
        config
            .environment
            .insert("ZENML_DEFAULT_PROJECT_NAME".to_string(), "custom".to_string());
        config.environment.insert("EXTRA".into(), "1".into());

        let env = compose(&config).unwrap();
        assert_eq!(value(&env, "ZENML_DEFAULT_PROJECT_NAME"), Some("custom"));
        assert_eq!(
            env.iter()
                .filter(|e| e.name == "ZENML_DEFAULT_PROJECT_NAME")
                .count(),
            1
        );
        let position = env
            .iter()
            .position(|e| e.name == "ZENML_DEFAULT_PROJECT_NAME")
            .unwrap();
        assert_eq!(position, 1);
        assert_eq!(env.last().unwrap().name, "EXTRA");
    }

    #[test]
    fn test_database_entries_only_when_managed() {
        let mut config = Configuration::default();
        config.database.pool_size = Some(20);
        config.database.backup_strategy = Some(BackupStrategy::Database);
        let env = compose(&config).unwrap();
        assert_eq!(value(&env, "ZENML_STORE_POOL_SIZE"), None);

        let mut config = managed_config();
        config.database.pool_size = Some(20);
        config.database.max_overflow = Some(5);
        config.database.backup_strategy = Some(BackupStrategy::Database);
        config.database.backup_database = Some("zenml_backup".to_string());
        let env = compose(&config).unwrap();
        assert_eq!(value(&env, "ZENML_STORE_POOL_SIZE"), Some("20"));
        assert_eq!(value(&env, "ZENML_STORE_MAX_OVERFLOW"), Some("5"));
        assert_eq!(value(&env, "ZENML_STORE_BACKUP_STRATEGY"), Some("database"));
        assert_eq!(
            value(&env, "ZENML_STORE_BACKUP_DATABASE"),
            Some("zenml_backup")
        );
    }

    #[test]
    fn test_secrets_store_settings() {
        let mut config = Configuration::default();
        config.secrets_store.store_type = SecretsStoreType::Aws;
        config.secrets_store.auth_method = Some("secret-key".to_string());
        config.secrets_store.settings.insert(
            "ZENML_SECRETS_STORE_REGION_NAME".to_string(),
            json!("eu-west-1"),
        );
        config
            .secrets_store
            .settings
            .insert("ZENML_SECRETS_STORE_MAX_RETRIES".to_string(), json!(3));

        let env = compose(&config).unwrap();
        assert_eq!(value(&env, "ZENML_SECRETS_STORE_TYPE"), Some("aws"));
        assert_eq!(
            value(&env, "ZENML_SECRETS_STORE_AUTH_METHOD"),
            Some("secret-key")
        );
        assert_eq!(
            value(&env, "ZENML_SECRETS_STORE_REGION_NAME"),
            Some("eu-west-1")
        );
        assert_eq!(value(&env, "ZENML_SECRETS_STORE_MAX_RETRIES"), Some("3"));
    }

    #[test]
    fn test_disabled_primary_store_reports_none() {
        let mut config = Configuration::default();
        config.secrets_store.enabled = false;
        let env = compose(&config).unwrap();
        assert_eq!(value(&env, "ZENML_SECRETS_STORE_TYPE"), Some("none"));
    }

    #[test]
    fn test_backup_store_after_primary() {
        let mut config = Configuration::default();
        config.backup_secrets_store.enabled = true;
        config.backup_secrets_store.store_type = SecretsStoreType::Gcp;
        config
            .backup_secrets_store
            .settings
            .insert("SHARED".to_string(), json!("backup"));
        config
            .secrets_store
            .settings
            .insert("SHARED".to_string(), json!("primary"));

        let env = compose(&config).unwrap();
        assert_eq!(value(&env, "ZENML_BACKUP_SECRETS_STORE_TYPE"), Some("gcp"));
        assert_eq!(value(&env, "SHARED"), Some("backup"));
    }

    #[test]
    fn test_disabled_backup_store_contributes_nothing() {
        let env = compose(&Configuration::default()).unwrap();
        assert!(!env.iter().any(|e| e.name.starts_with("ZENML_BACKUP_")));
    }

    #[test]
    fn test_non_scalar_setting_is_malformed() {
        let mut config = Configuration::default();
        config
            .backup_secrets_store
            .settings
            .insert("NESTED".to_string(), json!({"a": 1}));
        config.backup_secrets_store.enabled = true;

        let err = compose(&config).unwrap_err();
        match err {
            Error::MalformedSource { origin, .. } => {
                assert_eq!(origin, EnvSource::BackupSecretsStore)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_user_name_is_malformed() {
        let mut config = Configuration::default();
        config.environment.insert("BAD NAME".into(), "x".into());
        let err = compose(&config).unwrap_err();
        assert!(err.to_string().contains("user environment"));
    }

    #[test]
    fn test_non_ascii_setting_name_is_malformed() {
        let mut config = Configuration::default();
        config
            .secrets_store
            .settings
            .insert("ZÜRICH_REGION".to_string(), json!("eu-central-2"));

        match compose(&config).unwrap_err() {
            Error::MalformedSource { origin, reason } => {
                assert_eq!(origin, EnvSource::SecretsStore);
                assert!(reason.contains("ZÜRICH_REGION"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_name_validation() {
        for name in ["ZENML_PORT", "lower.case-name", "A1"] {
            assert!(validate_name(EnvSource::User, name).is_ok(), "{name}");
        }
        for name in ["", "A=B", "TAB\tNAME", "É_VAR", "CAFÉ"] {
            assert!(validate_name(EnvSource::User, name).is_err(), "{name}");
        }
    }

    #[test]
    fn test_null_setting_is_malformed() {
        let mut config = Configuration::default();
        config
            .secrets_store
            .settings
            .insert("ZENML_SECRETS_STORE_REGION_NAME".to_string(), json!(null));

        let err = compose(&config).unwrap_err();
        assert!(err.to_string().contains("has no value"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let mut config = managed_config();
        config.debug = true;
        config.environment.insert("A".into(), "1".into());
        assert_eq!(compose(&config).unwrap(), compose(&config).unwrap());
    }
}
