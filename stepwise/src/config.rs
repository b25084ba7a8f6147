use crate::database::source::SourceTable;
use crate::error::{Error, Result};
use crate::jobs::{MappingPolicy, RunOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "stepwise.toml";

/// Environment type for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Get environment from string; unknown names mean development
    pub fn parse(env: &str) -> Self {
        match env.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigratorConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub target: ConnectionConfig,

    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pool settings shared by both stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,

    /// Per-entity table layout, keyed by entity kind
    #[serde(default)]
    pub tables: HashMap<String, SourceTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Seconds allowed for one page fetch
    #[serde(default)]
    pub fetch_timeout: Option<u64>,

    /// Seconds allowed for one record write
    #[serde(default)]
    pub write_timeout: Option<u64>,

    #[serde(default)]
    pub on_mapping_error: MappingPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_page_size() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            fetch_timeout: None,
            write_timeout: None,
            on_mapping_error: MappingPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl MigratorConfig {
    /// Load `stepwise.toml` from the working directory when present,
    /// then apply environment overrides and validate
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::read_file(CONFIG_FILE)?
        } else {
            log::debug!("No {} found, using defaults", CONFIG_FILE);
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit configuration file, then apply environment overrides and validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| e.with_context(format!("Invalid configuration in {}", path.display())))
    }

    /// Parse TOML text without overrides or validation
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {}", e)))
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| env::var(name).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("STEPWISE_ENV") {
            self.environment = Environment::parse(&env);
        }
        if let Some(url) = lookup("STEPWISE_SOURCE_URL") {
            self.source.connection.url = Some(url);
        }
        if let Some(url) = lookup("STEPWISE_TARGET_URL") {
            self.target.url = Some(url);
        }
        if let Some(page_size) = lookup("STEPWISE_PAGE_SIZE") {
            self.migration.page_size = page_size
                .trim()
                .parse()
                .map_err(|_| Error::config("Invalid STEPWISE_PAGE_SIZE value"))?;
        }
        if let Some(level) = lookup("STEPWISE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.migration.page_size == 0 {
            return Err(Error::config("migration.page_size must be greater than zero"));
        }

        if let Some(url) = &self.source.connection.url {
            check_scheme(url, "source.url", &["mysql"])?;
        }
        if let Some(url) = &self.target.url {
            check_scheme(url, "target.url", &["postgres", "postgresql"])?;
        }

        if self.environment.is_production() {
            if self.source.connection.url.is_none() {
                return Err(Error::config("source.url is required in production"));
            }
            if self.target.url.is_none() {
                return Err(Error::config("target.url is required in production"));
            }
        }

        for (entity, table) in &self.source.tables {
            if table.table.is_empty() || table.order_by.is_empty() {
                return Err(Error::config(format!(
                    "source.tables.{}: table and order_by must not be empty",
                    entity
                )));
            }
        }

        Ok(())
    }

    /// Run options derived from the `[migration]` table
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            page_size: self.migration.page_size,
            fetch_timeout: self.migration.fetch_timeout.map(Duration::from_secs),
            write_timeout: self.migration.write_timeout.map(Duration::from_secs),
            on_mapping_error: self.migration.on_mapping_error,
        }
    }
}

fn check_scheme(raw: &str, field: &str, schemes: &[&str]) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| Error::config(format!("{} is not a valid URL: {}", field, e)))?;
    if !schemes.iter().any(|s| *s == parsed.scheme()) {
        return Err(Error::config(format!(
            "{} must use the {}:// scheme, got {}://",
            field,
            schemes.join(":// or "),
            parsed.scheme()
        )));
    }
    Ok(())
}
