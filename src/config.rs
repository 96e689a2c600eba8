use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "SHOPPINGCART";
const DEFAULT_METRICS_NAMESPACE: &str = "shoppingcart";

/// Where carts are persisted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// SQL database through sea-orm
    #[default]
    SeaOrm,
    /// Process-local maps; contents are lost on restart
    InMemory,
}

/// What adding a product that is already in the cart does
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateItemPolicy {
    /// Add the incoming quantity to the stored line
    #[default]
    Merge,
    /// Refuse with a conflict
    Reject,
}

/// Cart behaviour settings
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartConfig {
    #[serde(default)]
    pub duplicate_item_policy: DuplicateItemPolicy,
}

/// Database connection settings
///
/// Either `url` is given, or the parts (`user`, `password`, `host`, `port`,
/// `name`) are composed into a MySQL URL.
#[derive(Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default)]
    pub name: String,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Connection URL, if one is configured directly or can be composed.
    ///
    /// Composed URLs percent-encode `user` and `password`, so either may
    /// contain `@`, `:` or `/`. Returns `None` when the parts do not form a
    /// valid URL.
    pub fn connection_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|url| !url.trim().is_empty()) {
            return Some(url.to_string());
        }
        if self.name.trim().is_empty() {
            return None;
        }

        let mut url =
            Url::parse(&format!("mysql://{}:{}/{}", self.host, self.port, self.name)).ok()?;
        url.set_username(&self.user).ok()?;
        let password = Some(self.password.as_str()).filter(|p| !p.is_empty());
        url.set_password(password).ok()?;
        Some(url.into())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: String::new(),
            password: String::new(),
            host: default_db_host(),
            port: default_db_port(),
            name: String::new(),
            max_connections: default_db_max_connections(),
            min_connections: default_db_min_connections(),
            connect_timeout_secs: default_db_connect_timeout_secs(),
            idle_timeout_secs: default_db_idle_timeout_secs(),
            acquire_timeout_secs: default_db_acquire_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "***"))
            .field("user", &self.user)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish_non_exhaustive()
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    pub store_backend: StoreBackend,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Prefix for every exported Prometheus metric
    #[serde(default = "default_metrics_namespace")]
    #[validate(length(min = 1))]
    pub metrics_namespace: String,

    #[serde(default)]
    #[validate]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub cart: CartConfig,
}

impl AppConfig {
    /// Development configuration backed by the in-memory store
    pub fn in_memory() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            store_backend: StoreBackend::InMemory,
            auto_migrate: false,
            metrics_namespace: DEFAULT_METRICS_NAMESPACE.to_string(),
            database: DatabaseConfig::default(),
            cart: CartConfig::default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.store_backend == StoreBackend::SeaOrm && self.database.connection_url().is_none() {
            let mut err = ValidationError::new("database_required");
            err.message = Some(
                "The sea-orm store needs SHOPPINGCART__DATABASE__URL or SHOPPINGCART__DATABASE__NAME"
                    .into(),
            );
            errors.add("database", err);
        }

        if self.database.min_connections > self.database.max_connections {
            let mut err = ValidationError::new("pool_bounds");
            err.message = Some("database.min_connections exceeds database.max_connections".into());
            errors.add("database", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_metrics_namespace() -> String {
    DEFAULT_METRICS_NAMESPACE.to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("shoppingcart={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    // No-op when a subscriber is already installed
    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)
}

/// Deserializes and validates an already layered configuration.
pub fn from_config(config: Config) -> Result<AppConfig, AppConfigError> {
    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml), where env comes from
///    `RUN_ENV` or `APP_ENV`
/// 4. Environment variables prefixed with `SHOPPINGCART__`
///    (e.g. `SHOPPINGCART__DATABASE__HOST`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = defaults()?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let app_config = from_config(config)?;
    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use config::FileFormat;

    fn load_toml(toml: &str) -> Result<AppConfig, AppConfigError> {
        let config = defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();
        from_config(config)
    }

    #[test]
    fn in_memory_backend_needs_no_database() {
        let cfg = load_toml(r#"store_backend = "in-memory""#).unwrap();
        assert_eq!(cfg.store_backend, StoreBackend::InMemory);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.cart.duplicate_item_policy, DuplicateItemPolicy::Merge);
        assert_eq!(cfg.metrics_namespace, "shoppingcart");
    }

    #[test]
    fn sea_orm_backend_requires_database_target() {
        assert_matches!(load_toml(""), Err(AppConfigError::Validation(_)));
    }

    #[test]
    fn database_parts_compose_a_mysql_url() {
        let cfg = load_toml(
            r#"
            [database]
            user = "cart"
            password = "secret"
            host = "db"
            port = 3307
            name = "shoppingcart"
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.database.connection_url().as_deref(),
            Some("mysql://cart:secret@db:3307/shoppingcart")
        );
    }

    #[test]
    fn credentials_are_percent_encoded_in_composed_url() {
        let cfg = load_toml(
            r#"
            [database]
            user = "cart@eu"
            password = "p@ss:/word"
            host = "db"
            port = 3307
            name = "shoppingcart"
            "#,
        )
        .unwrap();
        let composed = cfg.database.connection_url().unwrap();
        assert_eq!(
            composed,
            "mysql://cart%40eu:p%40ss%3A%2Fword@db:3307/shoppingcart"
        );

        let parsed = Url::parse(&composed).unwrap();
        assert_eq!(parsed.host_str(), Some("db"));
        assert_eq!(parsed.port(), Some(3307));
        assert_eq!(parsed.path(), "/shoppingcart");
    }

    #[test]
    fn explicit_database_url_wins_over_parts() {
        let cfg = load_toml(
            r#"
            [database]
            url = "sqlite::memory:"
            name = "ignored"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.database.connection_url().as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let result = load_toml(
            r#"
            store_backend = "in-memory"
            log_level = "verbose"
            "#,
        );
        assert_matches!(result, Err(AppConfigError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_backend() {
        assert_matches!(
            load_toml(r#"store_backend = "redis""#),
            Err(AppConfigError::Load(_))
        );
    }

    #[test]
    fn reads_duplicate_item_policy() {
        let cfg = load_toml(
            r#"
            store_backend = "in-memory"
            [cart]
            duplicate_item_policy = "reject"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cart.duplicate_item_policy, DuplicateItemPolicy::Reject);
    }

    #[test]
    fn debug_output_hides_database_secrets() {
        let mut cfg = AppConfig::in_memory();
        cfg.database.url = Some("mysql://cart:secret@db/carts".into());
        cfg.database.password = "secret".into();
        assert!(!format!("{:?}", cfg).contains("secret"));
    }

    #[test]
    fn bind_address_joins_host_and_port() {
        let cfg = AppConfig::in_memory();
        assert_eq!(cfg.bind_address(), "127.0.0.1:8080");
    }
}
