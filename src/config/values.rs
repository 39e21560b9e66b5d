//! ZenML server configuration values.
//!
//! Defines the configuration tree a render consumes. Every field has a default
//! so an empty document renders a working single-replica server backed by the
//! image's built-in store.
//!
//! Example:
//! ```yaml
//! image:
//!   repository: zenmldocker/zenml-server
//!   tag: "0.58.0"
//! replicaCount: 3
//! database:
//!   url: mysql://zenml@mysql.db.svc:3306/zenml
//!   sslVerifyServerCert: true
//! ingress:
//!   enabled: true
//!   host: zenml.example.com
//!   tls:
//!     enabled: true
//! ```

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Affinity, LocalObjectReference, PodSecurityContext, ResourceRequirements, SecurityContext,
    Toleration,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::scalar;

/// Root of the values tree.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    // === Naming ===
    /// Replaces the chart name in generated resource names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_override: Option<String>,

    /// Replaces the full generated resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname_override: Option<String>,

    // === Image ===
    /// Server container image.
    #[serde(default)]
    pub image: ImageSpec,

    /// Secrets used to pull the server image.
    #[serde(default)]
    pub image_pull_secrets: Vec<LocalObjectReference>,

    // === Scaling ===
    /// Replica count, honoured only when an external database is configured.
    #[serde(default = "default_replica_count")]
    pub replica_count: i32,

    /// Horizontal pod autoscaler settings.
    #[serde(default)]
    pub autoscaling: AutoscalingSpec,

    // === Server behaviour ===
    /// Enable debug logging on the server.
    #[serde(default)]
    pub debug: bool,

    /// Opt in to anonymous usage analytics.
    #[serde(default = "default_analytics_opt_in")]
    pub analytics_opt_in: bool,

    /// Name of the project created on first start.
    #[serde(default = "default_project_name", deserialize_with = "scalar::string")]
    pub default_project_name: String,

    /// Name of the user created on first start.
    #[serde(default = "default_username", deserialize_with = "scalar::string")]
    pub default_username: String,

    /// Allow stack components to authenticate with ambient cloud credentials.
    #[serde(default)]
    pub enable_implicit_auth_methods: bool,

    /// Server authentication scheme. The image default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<AuthType>,

    /// Key used to sign JWT tokens. Stored in the server Secret.
    #[serde(
        default,
        deserialize_with = "scalar::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub jwt_secret_key: Option<String>,

    /// Externally reachable server URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Deployment type reported by the server.
    #[serde(
        default,
        deserialize_with = "scalar::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub deployment_type: Option<String>,

    // === Stores ===
    /// External SQL database.
    #[serde(default)]
    pub database: DatabaseSpec,

    /// Primary secrets store.
    #[serde(default = "SecretsStoreSpec::primary_default")]
    pub secrets_store: SecretsStoreSpec,

    /// Backup secrets store.
    #[serde(default)]
    pub backup_secrets_store: SecretsStoreSpec,

    /// Free-form environment variables. These win over every computed value.
    #[serde(default, deserialize_with = "scalar::string_map")]
    pub environment: BTreeMap<String, String>,

    // === Exposure ===
    /// Ingress configuration.
    #[serde(default)]
    pub ingress: IngressSpec,

    /// Service configuration.
    #[serde(default)]
    pub service: ServiceSpec,

    /// Service account configuration.
    #[serde(default)]
    pub service_account: ServiceAccountSpec,

    // === Pod passthrough ===
    /// Extra annotations for the pod template.
    #[serde(default, deserialize_with = "scalar::string_map")]
    pub pod_annotations: BTreeMap<String, String>,

    /// Pod-level security context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security_context: Option<PodSecurityContext>,

    /// Container-level security context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,

    /// Container resource requests and limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Node selector for pod placement.
    #[serde(default, deserialize_with = "scalar::string_map")]
    pub node_selector: BTreeMap<String, String>,

    /// Tolerations for pod scheduling.
    #[serde(default)]
    pub tolerations: Vec<Toleration>,

    /// Affinity rules for pod scheduling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name_override: None,
            fullname_override: None,
            image: ImageSpec::default(),
            image_pull_secrets: Vec::new(),
            replica_count: default_replica_count(),
            autoscaling: AutoscalingSpec::default(),
            debug: false,
            analytics_opt_in: default_analytics_opt_in(),
            default_project_name: default_project_name(),
            default_username: default_username(),
            enable_implicit_auth_methods: false,
            auth_type: None,
            jwt_secret_key: None,
            server_url: None,
            deployment_type: None,
            database: DatabaseSpec::default(),
            secrets_store: SecretsStoreSpec::primary_default(),
            backup_secrets_store: SecretsStoreSpec::default(),
            environment: BTreeMap::new(),
            ingress: IngressSpec::default(),
            service: ServiceSpec::default(),
            service_account: ServiceAccountSpec::default(),
            pod_annotations: BTreeMap::new(),
            pod_security_context: None,
            security_context: None,
            resources: None,
            node_selector: BTreeMap::new(),
            tolerations: Vec::new(),
            affinity: None,
        }
    }
}

fn default_replica_count() -> i32 {
    1
}

fn default_analytics_opt_in() -> bool {
    true
}

fn default_project_name() -> String {
    "default".to_string()
}

fn default_username() -> String {
    "default".to_string()
}

/// Container image settings.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Image repository. An empty repository fails the render.
    #[serde(default = "default_image_repository")]
    pub repository: Option<String>,

    /// Image tag (default: the release app version).
    #[serde(
        default,
        deserialize_with = "scalar::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag: Option<String>,

    /// Image pull policy (default: Always).
    #[serde(default = "default_image_pull_policy")]
    pub pull_policy: String,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            repository: default_image_repository(),
            tag: None,
            pull_policy: default_image_pull_policy(),
        }
    }
}

fn default_image_repository() -> Option<String> {
    Some("zenmldocker/zenml-server".to_string())
}

fn default_image_pull_policy() -> String {
    "Always".to_string()
}

/// Horizontal pod autoscaler settings.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingSpec {
    /// Let an autoscaler own the replica count.
    #[serde(default)]
    pub enabled: bool,

    /// Lower replica bound (default: 1).
    #[serde(default = "default_min_replicas")]
    pub min_replicas: i32,

    /// Upper replica bound (default: 100).
    #[serde(default = "default_max_replicas")]
    pub max_replicas: i32,

    /// Average CPU utilization target (default: 80). `0` drops the metric.
    #[serde(
        default = "default_target_cpu",
        rename = "targetCPUUtilizationPercentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_cpu_utilization_percentage: Option<i32>,

    /// Average memory utilization target. Unset or `0` drops the metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_memory_utilization_percentage: Option<i32>,
}

impl Default for AutoscalingSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            min_replicas: default_min_replicas(),
            max_replicas: default_max_replicas(),
            target_cpu_utilization_percentage: default_target_cpu(),
            target_memory_utilization_percentage: None,
        }
    }
}

fn default_min_replicas() -> i32 {
    1
}

fn default_max_replicas() -> i32 {
    100
}

fn default_target_cpu() -> Option<i32> {
    Some(80)
}

/// Server authentication scheme.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    NoAuth,
    HttpBasic,
    Oauth2PasswordBearer,
    External,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::NoAuth => "NO_AUTH",
            AuthType::HttpBasic => "HTTP_BASIC",
            AuthType::Oauth2PasswordBearer => "OAUTH2_PASSWORD_BEARER",
            AuthType::External => "EXTERNAL",
        }
    }
}

/// External SQL database. Setting `url` switches the server into managed-database mode.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// SQLAlchemy-style database URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Database password, if not embedded in the URL.
    #[serde(
        default,
        deserialize_with = "scalar::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<String>,

    /// PEM-encoded CA certificate for the database connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_ca: Option<String>,

    /// Verify the database server certificate (default: false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_verify_server_cert: Option<bool>,

    /// SQLAlchemy connection pool size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<u32>,

    /// SQLAlchemy pool overflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_overflow: Option<u32>,

    /// How the server backs up the database before migrating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_strategy: Option<BackupStrategy>,

    /// Database used by the `database` backup strategy.
    #[serde(
        default,
        deserialize_with = "scalar::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub backup_database: Option<String>,
}

impl DatabaseSpec {
    /// True when an external database is configured.
    pub fn is_managed(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

/// Database backup strategy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BackupStrategy {
    Disabled,
    InMemory,
    Database,
    DumpFile,
}

impl BackupStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStrategy::Disabled => "disabled",
            BackupStrategy::InMemory => "in-memory",
            BackupStrategy::Database => "database",
            BackupStrategy::DumpFile => "dump-file",
        }
    }
}

/// Secrets store backend.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SecretsStoreType {
    #[default]
    Sql,
    Aws,
    Gcp,
    Azure,
    Hashicorp,
    Custom,
}

impl SecretsStoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretsStoreType::Sql => "sql",
            SecretsStoreType::Aws => "aws",
            SecretsStoreType::Gcp => "gcp",
            SecretsStoreType::Azure => "azure",
            SecretsStoreType::Hashicorp => "hashicorp",
            SecretsStoreType::Custom => "custom",
        }
    }
}

/// Secrets store configuration.
///
/// `settings` is an externally resolved mapping of environment variable names
/// to scalar values. It is forwarded as-is.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretsStoreSpec {
    /// Configure this store.
    #[serde(default)]
    pub enabled: bool,

    /// Backend type (default: sql).
    #[serde(default, rename = "type")]
    pub store_type: SecretsStoreType,

    /// Authentication method understood by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,

    /// Import path of a custom secrets store class. Required for `custom`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_path: Option<String>,

    /// Pre-resolved backend settings.
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl SecretsStoreSpec {
    /// The primary store is enabled with the SQL backend unless configured otherwise.
    pub fn primary_default() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }
}

/// Ingress configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    /// Create an Ingress.
    #[serde(default)]
    pub enabled: bool,

    /// IngressClass name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// Annotations for the Ingress.
    #[serde(default, deserialize_with = "scalar::string_map")]
    pub annotations: BTreeMap<String, String>,

    /// Host name routed to the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Path prefix routed to the server (default: /).
    #[serde(default = "default_ingress_path")]
    pub path: String,

    /// TLS settings.
    #[serde(default)]
    pub tls: IngressTlsSpec,
}

impl Default for IngressSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            class_name: None,
            annotations: BTreeMap::new(),
            host: None,
            path: default_ingress_path(),
            tls: IngressTlsSpec::default(),
        }
    }
}

fn default_ingress_path() -> String {
    "/".to_string()
}

/// Ingress TLS settings.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressTlsSpec {
    /// Terminate TLS at the ingress.
    #[serde(default)]
    pub enabled: bool,

    /// Secret holding the certificate (default: zenml-tls-certs).
    #[serde(default = "default_tls_secret_name")]
    pub secret_name: String,
}

impl Default for IngressTlsSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            secret_name: default_tls_secret_name(),
        }
    }
}

fn default_tls_secret_name() -> String {
    "zenml-tls-certs".to_string()
}

/// Service exposure type.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceType::ClusterIP => write!(f, "ClusterIP"),
            ServiceType::NodePort => write!(f, "NodePort"),
            ServiceType::LoadBalancer => write!(f, "LoadBalancer"),
        }
    }
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Exposure type (default: ClusterIP).
    #[serde(default, rename = "type")]
    pub service_type: ServiceType,

    /// Service port (default: 80).
    #[serde(default = "default_service_port")]
    pub port: i32,
}

impl Default for ServiceSpec {
    fn default() -> Self {
        Self {
            service_type: ServiceType::default(),
            port: default_service_port(),
        }
    }
}

fn default_service_port() -> i32 {
    80
}

/// Service account configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountSpec {
    /// Create a dedicated service account (default: true).
    #[serde(default = "default_service_account_create")]
    pub create: bool,

    /// Name of the service account. Generated from the full name when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Annotations for the service account.
    #[serde(default, deserialize_with = "scalar::string_map")]
    pub annotations: BTreeMap<String, String>,
}

impl Default for ServiceAccountSpec {
    fn default() -> Self {
        Self {
            create: default_service_account_create(),
            name: None,
            annotations: BTreeMap::new(),
        }
    }
}

fn default_service_account_create() -> bool {
    true
}
