use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;

use crate::services::documents::EntrepriseInfo;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Application configuration with environment-variable overrides
/// (`APP__DATABASE_URL`, `APP__PORT`, ...).
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    // Database pool tuning
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Comma-separated list of allowed CORS origins; permissive in
    /// development when unset.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
    #[serde(default)]
    pub cors_allow_credentials: bool,

    // Company identity printed on generated documents
    #[serde(default = "default_entreprise_nom")]
    pub entreprise_nom: String,
    #[serde(default)]
    pub entreprise_adresse: Option<String>,
    #[serde(default)]
    pub entreprise_telephone: Option<String>,
    #[serde(default)]
    pub entreprise_email: Option<String>,
    #[serde(default)]
    pub entreprise_matricule_fiscal: Option<String>,
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
fn default_entreprise_nom() -> String {
    "Mon Entreprise".to_string()
}

impl AppConfig {
    /// Minimal constructor used by tests and tools.
    pub fn new(database_url: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            database_url: database_url.into(),
            host: host.into(),
            port,
            environment: "test".to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            cors_allowed_origins: None,
            cors_allow_credentials: false,
            entreprise_nom: default_entreprise_nom(),
            entreprise_adresse: None,
            entreprise_telephone: None,
            entreprise_email: None,
            entreprise_matricule_fiscal: None,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Permissive CORS is only acceptable outside production.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development()
    }

    pub fn entreprise_info(&self) -> EntrepriseInfo {
        EntrepriseInfo {
            nom: self.entreprise_nom.clone(),
            adresse: self.entreprise_adresse.clone(),
            telephone: self.entreprise_telephone.clone(),
            email: self.entreprise_email.clone(),
            matricule_fiscal: self.entreprise_matricule_fiscal.clone(),
        }
    }
}

/// Loads configuration from `config/default.toml`, the environment-specific
/// file, then `APP__*` environment variables (highest precedence).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://gescom.db?mode=rwc")?
        .set_default("environment", environment.clone())?;

    let default_file = Path::new(CONFIG_DIR).join("default.toml");
    if default_file.exists() {
        builder = builder.add_source(File::from(default_file));
    }
    let env_file = Path::new(CONFIG_DIR).join(format!("{environment}.toml"));
    if env_file.exists() {
        builder = builder.add_source(File::from(env_file));
    }

    builder = builder.add_source(Environment::with_prefix("APP").separator("__"));

    let config: AppConfig = builder.build()?.try_deserialize()?;
    info!(environment = %config.environment, "configuration loaded");
    Ok(config)
}

/// Initializes the tracing subscriber, optionally in JSON.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_development() {
        let cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 8080);
        assert!(cfg.is_development());
        assert!(cfg.should_allow_permissive_cors());
    }

    #[test]
    fn entreprise_info_carries_company_identity() {
        let mut cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 8080);
        cfg.entreprise_nom = "Société Kairouan".to_string();
        cfg.entreprise_matricule_fiscal = Some("1234567A".to_string());

        let info = cfg.entreprise_info();
        assert_eq!(info.nom, "Société Kairouan");
        assert_eq!(info.matricule_fiscal.as_deref(), Some("1234567A"));
    }
}
