use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env as std_env;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;
const DEFAULT_SESSION_COOKIE: &str = "pos_session";
const DEFAULT_PO_PREFIX: &str = "PO";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
    /// Allow permissive CORS outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// Session lifetime in seconds (5 minutes to 30 days)
    #[serde(default = "default_session_ttl_secs")]
    #[validate(range(min = 300, max = 2592000))]
    pub session_ttl_secs: u64,
    #[serde(default = "default_session_cookie_name")]
    #[validate(length(min = 1, max = 64))]
    pub session_cookie_name: String,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub session_cookie_secure: bool,

    #[serde(default = "default_api_page_size")]
    #[validate(range(min = 1, max = 500))]
    pub api_default_page_size: u64,
    #[serde(default = "default_api_max_page_size")]
    #[validate(range(min = 1, max = 500))]
    pub api_max_page_size: u64,

    /// Prefix of auto-generated purchase order numbers
    #[serde(default = "default_po_prefix")]
    #[validate(length(min = 1, max = 12))]
    pub purchase_order_prefix: String,

    /// Accept debt payments larger than the outstanding balance (store credit)
    #[serde(default)]
    pub allow_credit_overpayment: bool,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            session_ttl_secs: default_session_ttl_secs(),
            session_cookie_name: default_session_cookie_name(),
            session_cookie_secure: false,
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            purchase_order_prefix: default_po_prefix(),
            allow_credit_overpayment: false,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("test")
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| raw.split(',').any(|o| !o.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Permissive CORS is only used when no origins are configured and either
    /// the environment is development or the override flag is set.
    pub fn should_allow_permissive_cors(&self) -> bool {
        !self.has_cors_allowed_origins() && (self.is_development() || self.cors_allow_any_origin)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Clamp a requested page size into the configured bounds.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.api_default_page_size)
            .clamp(1, self.api_max_page_size)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.api_default_page_size > self.api_max_page_size {
            let mut err = ValidationError::new("api_default_page_size");
            err.message = Some("default page size must not exceed api_max_page_size".into());
            errors.add("api_default_page_size", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if !self.is_development() && !self.has_cors_allowed_origins() && !self.cors_allow_any_origin
        {
            let mut err = ValidationError::new("cors_allowed_origins");
            err.message = Some(
                "set cors_allowed_origins or cors_allow_any_origin outside development".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
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
fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}
fn default_session_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}
fn default_api_page_size() -> u64 {
    25
}
fn default_api_max_page_size() -> u64 {
    200
}
fn default_po_prefix() -> String {
    DEFAULT_PO_PREFIX.to_string()
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
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!(
        "pos_backoffice={level},tower_http=info,sea_orm=warn,sqlx=warn",
        level = level
    );
    let filter_directive = std_env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);
    let filter = EnvFilter::try_new(filter_directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    if result.is_ok() {
        info!(json, "tracing initialized");
    }
}

/// Deserializes and validates an already-assembled [`Config`].
pub fn from_config(config: Config) -> Result<AppConfig, AppConfigError> {
    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;
    app_config.validate_additional_constraints()?;
    Ok(app_config)
}

/// Loads configuration from `config/default.toml`, `config/{RUN_ENV}.toml`
/// and `APP__*` environment variables, in increasing precedence.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = std_env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let config = Config::builder()
        .set_default("environment", run_env.clone())?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config = from_config(config)?;
    info!(
        environment = %app_config.environment,
        port = app_config.port,
        "configuration loaded"
    );
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            8080,
            "production".to_string(),
        )
    }

    fn parse(toml: &str) -> Result<AppConfig, AppConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .expect("toml source builds");
        from_config(config)
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg = parse(
            r#"
            database_url = "postgres://localhost/pos"
            "#,
        )
        .expect("minimal config is valid in development");

        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.session_cookie_name, "pos_session");
        assert_eq!(cfg.purchase_order_prefix, "PO");
        assert!(!cfg.allow_credit_overpayment);
        assert!(cfg.is_development());
    }

    #[test]
    fn invalid_values_are_reported_per_field() {
        let result = parse(
            r#"
            database_url = ""
            log_level = "loud"
            session_ttl_secs = 10
            "#,
        );

        match result {
            Err(AppConfigError::Validation(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("database_url"));
                assert!(fields.contains_key("log_level"));
                assert!(fields.contains_key("session_ttl_secs"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = parse(
            r#"
            database_url = "postgres://localhost/pos"
            smtp_host = "localhost"
            "#,
        );
        assert!(matches!(result, Err(AppConfigError::Load(_))));
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(!cfg.should_allow_permissive_cors());
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.should_allow_permissive_cors());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://backoffice.example.com".into());
        assert!(!cfg.should_allow_permissive_cors());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn page_size_is_clamped() {
        let cfg = base_config();
        assert_eq!(cfg.page_size(None), 25);
        assert_eq!(cfg.page_size(Some(0)), 1);
        assert_eq!(cfg.page_size(Some(10_000)), 200);
    }
}
