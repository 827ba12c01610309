//! Configuration management for the schema engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schemas.toml)
//! - Environment variables (SCHEMAS__*)
//!
//! ## Example config file (schemas.toml):
//! ```toml
//! [migration]
//! db_schema = "public"
//! statement_timeout_ms = 30000
//!
//! [codegen]
//! default_framework = "nestjs"
//!
//! [validation]
//! allow_self_reference = false
//! max_fields = 100
//! max_unique_fields = 5
//! max_string_length = 4000
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Live-database reconciliation settings
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Association code generation settings
    #[serde(default)]
    pub codegen: CodegenConfig,

    /// Field and relationship validation limits
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Schema searched when introspecting `information_schema.columns`
    #[serde(default = "default_db_schema")]
    pub db_schema: String,

    /// Upper bound for every statement issued by the migration manager
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,

    /// Connection string for `PgExecutor::connect`
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Codegen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Framework used when the caller does not name one
    #[serde(default = "default_framework")]
    pub default_framework: String,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Downgrade self-referencing relationships from error to warning
    #[serde(default)]
    pub allow_self_reference: bool,

    /// Fields per entity before a warning is raised
    #[serde(default = "default_max_fields")]
    pub max_fields: usize,

    /// Unique fields per entity before a warning is raised
    #[serde(default = "default_max_unique_fields")]
    pub max_unique_fields: usize,

    /// STRING length above which TEXT is suggested
    #[serde(default = "default_max_string_length")]
    pub max_string_length: u32,
}

// Default value functions
fn default_db_schema() -> String {
    "public".to_string()
}

fn default_statement_timeout_ms() -> u64 {
    30_000
}

fn default_framework() -> String {
    "nestjs".to_string()
}

fn default_max_fields() -> usize {
    100
}

fn default_max_unique_fields() -> usize {
    5
}

fn default_max_string_length() -> u32 {
    crate::schema::rules::MAX_STRING_LENGTH
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            db_schema: default_db_schema(),
            statement_timeout_ms: default_statement_timeout_ms(),
            database_url: None,
        }
    }
}

impl MigrationConfig {
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            default_framework: default_framework(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allow_self_reference: false,
            max_fields: default_max_fields(),
            max_unique_fields: default_max_unique_fields(),
            max_string_length: default_max_string_length(),
        }
    }
}

impl SchemaConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["schemas.toml", ".schemas.toml", "config/schemas.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "lowcode", "entity-schemas") {
            let xdg_config = config_dir.config_dir().join("schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (SCHEMAS__MIGRATION__DB_SCHEMA, ...)
        builder = builder.add_source(
            Environment::with_prefix("SCHEMAS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
