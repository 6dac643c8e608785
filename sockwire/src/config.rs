//! Pipeline configuration.
//!
//! Loaded from environment variables with the `config` and `dotenvy` crates.
//! Variables use the `SOCKWIRE` prefix and `__` between nested keys:
//!
//! - `SOCKWIRE__ENVIRONMENT=production` -> `environment = production`
//! - `SOCKWIRE__VALIDATION__LOCALE=fr` -> `validation.locale = "fr"`
//! - `SOCKWIRE__LOGGING__CONSOLE_BLACKLIST=test,staging` -> a list
//! - `SOCKWIRE__LOGGING__FILE__PATH=logs` -> enables the log file
//!
//! ```no_run
//! use sockwire::config::SocketConfig;
//!
//! let config = SocketConfig::load().expect("Failed to load configuration");
//! println!("running in {}", config.environment);
//! ```

use serde::Deserialize;
use sockwire_core::{ExecutionMode, ValidationFlags};
use sockwire_std::validator::ValidatorConfig;
use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The sources could not be read or deserialized.
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    /// A value is out of range.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors found by [`SocketConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// `validation.locale` is empty.
    #[error("Validation locale must not be empty")]
    EmptyLocale,

    /// `logging.level` or `logging.file.level` is not a known level.
    #[error("Unknown log level: {0}")]
    UnknownLogLevel(String),

    /// `logging.file.file_name` is empty.
    #[error("Log file name must not be empty")]
    EmptyLogFileName,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development. Internal error details reach clients.
    #[default]
    Development,
    /// Automated test runs.
    Test,
    /// Pre-production.
    Staging,
    /// Production.
    Production,
}

impl Environment {
    /// Lowercase name, as written in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExecutionMode for Environment {
    fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

/// Payload validation options.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Fallback message language.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Drop undeclared object keys instead of rejecting them.
    #[serde(default)]
    pub strip_unknown: bool,

    /// Convert compatible values, such as numeric strings.
    #[serde(default = "default_true")]
    pub coerce: bool,

    /// Stop at the first error.
    #[serde(default = "default_true")]
    pub abort_early: bool,
}

impl ValidationConfig {
    /// Engine switches.
    pub fn flags(&self) -> ValidationFlags {
        let mut flags = ValidationFlags::empty();
        flags.set(ValidationFlags::STRIP_UNKNOWN, self.strip_unknown);
        flags.set(ValidationFlags::COERCE, self.coerce);
        flags.set(ValidationFlags::ABORT_EARLY, self.abort_early);
        flags
    }

    /// Options for the handler factory.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            locale: Some(self.locale.clone()),
            flags: self.flags(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            strip_unknown: false,
            coerce: true,
            abort_early: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per event.
    Json,
}

/// Logging options.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Environments without console output.
    #[serde(default = "default_console_blacklist")]
    pub console_blacklist: Vec<String>,

    /// File output; disabled when absent.
    #[serde(default)]
    pub file: Option<FileLogConfig>,
}

/// Log file options.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileLogConfig {
    /// Directory of the log file, created if missing.
    pub path: PathBuf,

    /// File name inside `path`.
    #[serde(default = "default_log_file_name")]
    pub file_name: String,

    /// Level of file output, independent of the console level.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl LoggingConfig {
    /// Whether console output is suppressed in `environment`.
    pub fn is_suppressed(&self, environment: Environment) -> bool {
        self.console_blacklist
            .iter()
            .any(|name| name.eq_ignore_ascii_case(environment.as_str()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            console_blacklist: default_console_blacklist(),
            file: None,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SocketConfig {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,

    /// Payload validation options.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Logging options.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SocketConfig {
    /// Load configuration from environment variables.
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SOCKWIRE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes and validates
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value cannot be parsed or is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config: SocketConfig = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("SOCKWIRE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("logging.console_blacklist"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is malformed or a value is out
    /// of range.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: SocketConfig = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty locale, an unknown log level or
    /// an empty log file name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.validation.locale.trim().is_empty() {
            return Err(ValidationError::EmptyLocale);
        }
        check_level(&self.logging.level)?;
        if let Some(file) = &self.logging.file {
            check_level(&file.level)?;
            if file.file_name.trim().is_empty() {
                return Err(ValidationError::EmptyLogFileName);
            }
        }
        Ok(())
    }

    /// Check if running in development.
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Check if running in production.
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl ExecutionMode for SocketConfig {
    fn is_development(&self) -> bool {
        SocketConfig::is_development(self)
    }
}

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

fn check_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::UnknownLogLevel(level.to_owned()))
    }
}

fn default_locale() -> String {
    "en".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_file_name() -> String {
    "sockwire.log".to_owned()
}

fn default_console_blacklist() -> Vec<String> {
    vec!["test".to_owned()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SocketConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.validation.locale, "en");
        assert_eq!(config.validation.flags(), ValidationFlags::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.console_blacklist, ["test"]);
        assert_eq!(config.logging.file, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SocketConfig::from_toml("").unwrap();
        assert_eq!(config, SocketConfig::default());
    }

    #[test]
    fn test_from_toml() {
        let config = SocketConfig::from_toml(
            r#"
            environment = "production"

            [validation]
            locale = "fr"
            strip_unknown = true
            abort_early = false

            [logging]
            level = "debug"
            format = "json"
            console_blacklist = []
            "#,
        )
        .unwrap();

        assert!(config.is_production());
        assert!(!ExecutionMode::is_development(&config));
        assert_eq!(
            config.validation.flags(),
            ValidationFlags::STRIP_UNKNOWN | ValidationFlags::COERCE
        );
        assert_eq!(config.validation.validator_config().locale.as_deref(), Some("fr"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.logging.is_suppressed(Environment::Test));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SocketConfig::default();
        config.validation.locale = " ".into();
        assert_eq!(config.validate(), Err(ValidationError::EmptyLocale));

        let mut config = SocketConfig::default();
        config.logging.level = "loud".into();
        assert_eq!(
            config.validate(),
            Err(ValidationError::UnknownLogLevel("loud".into()))
        );

        assert!(matches!(
            SocketConfig::from_toml("[logging]\nlevel = \"loud\""),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_file_output_section() {
        let config = SocketConfig::from_toml(
            r#"
            [logging.file]
            path = "logs"
            level = "warn"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.logging.file,
            Some(FileLogConfig {
                path: PathBuf::from("logs"),
                file_name: "sockwire.log".into(),
                level: "warn".into(),
            })
        );
        assert_eq!(config.logging.level, "info");

        assert!(matches!(
            SocketConfig::from_toml("[logging.file]\npath = \"logs\"\nlevel = \"loud\""),
            Err(ConfigError::ValidationFailed(ValidationError::UnknownLogLevel(_)))
        ));
        assert!(matches!(
            SocketConfig::from_toml("[logging.file]\npath = \"logs\"\nfile_name = \"\""),
            Err(ConfigError::ValidationFailed(ValidationError::EmptyLogFileName))
        ));
    }

    #[test]
    fn test_unknown_environment_fails_to_load() {
        assert!(matches!(
            SocketConfig::from_toml("environment = \"moon\""),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_console_blacklist_matching() {
        let logging = LoggingConfig::default();
        assert!(logging.is_suppressed(Environment::Test));
        assert!(!logging.is_suppressed(Environment::Development));
    }

    #[test]
    fn test_environment_execution_mode() {
        assert!(Environment::Development.is_development());
        assert!(!Environment::Staging.is_development());
        assert_eq!(Environment::Staging.to_string(), "staging");
    }
}
