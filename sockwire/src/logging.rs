//! Structured logging initialisation.
//!
//! Two outputs can be installed, each with its own level: the console
//! (stderr), unless the environment is blacklisted, and an append-only log
//! file when `logging.file` is configured.

use crate::config::{Environment, FileLogConfig, LogFormat, LoggingConfig};
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors encountered while configuring logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to parse the log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the log file.
    #[error("failed to open log file {}: {source}", path.display())]
    File {
        /// Path of the log file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// What [`init`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingState {
    /// A global subscriber was installed.
    Installed {
        /// Whether events go to stderr.
        console: bool,
        /// Whether events go to the log file.
        file: bool,
    },
    /// The environment is blacklisted and no file is configured; nothing was
    /// installed.
    Suppressed,
}

/// Install the global subscriber for `environment`.
///
/// `RUST_LOG`, when set, takes precedence over the console level. The file
/// level is always taken from the configuration.
///
/// # Errors
///
/// Fails on an invalid filter, an unwritable log file, or when a global
/// subscriber already exists.
pub fn init(config: &LoggingConfig, environment: Environment) -> Result<LoggingState, LoggingError> {
    let console = !config.is_suppressed(environment);
    let mut layers: Vec<BoxedLayer> = Vec::new();
    if console {
        layers.push(console_layer(config)?);
    }
    if let Some(file) = &config.file {
        layers.push(file_layer(file, config.format)?);
    }
    if layers.is_empty() {
        return Ok(LoggingState::Suppressed);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|error| LoggingError::Install(error.to_string()))?;

    let file = config.file.is_some();
    tracing::debug!(%environment, level = %config.level, console, file, "logging initialised");
    Ok(LoggingState::Installed { console, file })
}

/// The console filter [`init`] installs.
///
/// # Errors
///
/// Fails when the directive cannot be parsed.
pub fn filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| config.level.clone());
    EnvFilter::try_new(directive).map_err(|error| LoggingError::Filter(error.to_string()))
}

/// Open (creating it and its directory if needed) the configured log file
/// for appending.
///
/// # Errors
///
/// Fails when the directory or the file cannot be created.
pub fn open_log_file(config: &FileLogConfig) -> Result<File, LoggingError> {
    fs::create_dir_all(&config.path).map_err(|source| LoggingError::File {
        path: config.path.clone(),
        source,
    })?;
    let path = config.path.join(&config.file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::File { path, source })
}

fn console_layer(config: &LoggingConfig) -> Result<BoxedLayer, LoggingError> {
    let filter = filter(config)?;
    let layer = fmt::layer::<Registry>()
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr);

    Ok(match config.format {
        LogFormat::Json => layer.json().flatten_event(true).with_filter(filter).boxed(),
        LogFormat::Plain => layer.with_filter(filter).boxed(),
    })
}

fn file_layer(config: &FileLogConfig, format: LogFormat) -> Result<BoxedLayer, LoggingError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|error| LoggingError::Filter(error.to_string()))?;
    let layer = fmt::layer::<Registry>()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_writer(Mutex::new(open_log_file(config)?));

    Ok(match format {
        LogFormat::Json => layer.json().flatten_event(true).with_filter(filter).boxed(),
        LogFormat::Plain => layer.with_filter(filter).boxed(),
    })
}
