use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use env_logger::{Builder, Target, WriteStyle};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to read logging config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse logging config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown logging target: {0}")]
    UnknownTarget(String),

    #[error("Failed to initialize logger: {0}")]
    Init(#[from] log::SetLoggerError),
}

/// Available logging subsystems in netplayer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LoggingSubsystem {
    /// Main application and composition root
    Main,
    /// Player state machine and audio engine
    Players,
    /// Metadata store, ICY and DIDL parsing
    Metadata,
    /// Remote-control adapter
    Remote,
    /// MJPEG stream task
    Stream,
    /// HTTP client and artwork downloads
    Http,
    /// Internet radio directory
    Radio,
    /// Persisted user settings
    Settings,
    /// Configuration loading and parsing
    Config,
    /// Third-party dependencies
    #[strum(serialize = "deps", serialize = "dependencies")]
    #[serde(rename = "deps", alias = "dependencies")]
    Dependencies,
}

impl LoggingSubsystem {
    /// Get the module prefixes for this subsystem, comma separated
    pub fn module_prefix(&self) -> &'static str {
        match self {
            LoggingSubsystem::Main => "netplayer,netplayer::appliance",
            LoggingSubsystem::Players => "netplayer::players",
            LoggingSubsystem::Metadata => "netplayer::metadata",
            LoggingSubsystem::Remote => "netplayer::remote",
            LoggingSubsystem::Stream => "netplayer::stream",
            LoggingSubsystem::Http => "netplayer::helpers::http_client,netplayer::helpers::artwork,ureq",
            LoggingSubsystem::Radio => "netplayer::helpers::tunein",
            LoggingSubsystem::Settings => "netplayer::helpers::settingsdb",
            LoggingSubsystem::Config => "netplayer::config",
            LoggingSubsystem::Dependencies => "rustls,image,rusqlite",
        }
    }
}

/// Logging configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Target for log output (stdout, stderr)
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default = "default_timestamps")]
    pub timestamps: bool,

    #[serde(default = "default_colors")]
    pub colors: bool,

    /// Subsystem-specific log levels; unknown names are used as module paths
    #[serde(default)]
    pub subsystems: HashMap<String, String>,

    #[serde(default)]
    pub include_module_path: bool,

    #[serde(default)]
    pub include_line_numbers: bool,

    /// Environment variables set before the logger starts
    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target() -> String {
    "stdout".to_string()
}

fn default_timestamps() -> bool {
    true
}

fn default_colors() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            target: default_target(),
            timestamps: default_timestamps(),
            colors: default_colors(),
            subsystems: HashMap::new(),
            include_module_path: false,
            include_line_numbers: false,
            env_overrides: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoggingError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, LoggingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert string log level to LevelFilter
    fn parse_log_level(level: &str) -> LevelFilter {
        match LevelFilter::from_str(level) {
            Ok(filter) => filter,
            Err(_) => {
                eprintln!("Warning: Unknown log level '{}', defaulting to 'info'", level);
                LevelFilter::Info
            }
        }
    }

    /// Every (module prefix, level) pair the subsystem levels expand to
    fn module_filters(&self) -> Vec<(String, String)> {
        let mut names: Vec<&String> = self.subsystems.keys().collect();
        names.sort();

        let mut filters = Vec::new();
        for name in names {
            let level = &self.subsystems[name];
            match LoggingSubsystem::from_str(name) {
                Ok(subsystem) => {
                    for prefix in subsystem.module_prefix().split(',') {
                        filters.push((prefix.trim().to_string(), level.clone()));
                    }
                }
                Err(_) => filters.push((name.clone(), level.clone())),
            }
        }
        filters
    }

    /// Build the environment filter string for env_logger
    pub fn build_filter_string(&self) -> String {
        let mut filter_parts = vec![self.level.clone()];
        for (prefix, level) in self.module_filters() {
            filter_parts.push(format!("{}={}", prefix, level));
        }
        filter_parts.join(",")
    }

    /// Initialize the logger with this configuration
    pub fn initialize_logger(&self) -> Result<(), LoggingError> {
        for (key, value) in &self.env_overrides {
            std::env::set_var(key, value);
        }

        let filter_string = self.build_filter_string();
        debug!("Using logging filter: {}", filter_string);

        let mut builder = Builder::new();
        builder.parse_env("RUST_LOG");
        builder.filter(None, Self::parse_log_level(&self.level));
        for (prefix, level) in self.module_filters() {
            builder.filter(Some(&prefix), Self::parse_log_level(&level));
        }

        builder.write_style(if self.colors { WriteStyle::Auto } else { WriteStyle::Never });

        match self.target.to_lowercase().as_str() {
            "stdout" => {
                builder.target(Target::Stdout);
            }
            "stderr" => {
                builder.target(Target::Stderr);
            }
            _ => return Err(LoggingError::UnknownTarget(self.target.clone())),
        }

        let include_module_path = self.include_module_path;
        let include_line_numbers = self.include_line_numbers;
        let timestamps = self.timestamps;

        builder.format(move |buf, record| {
            let mut output = String::new();

            if timestamps {
                output.push_str(&format!("[{}] ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")));
            }

            output.push_str(&format!("[{}] ", record.level()));

            if include_module_path {
                if let Some(module) = record.module_path() {
                    output.push_str(&format!("[{}] ", module));
                }
            }

            if include_line_numbers {
                if let (Some(file), Some(line)) = (record.file(), record.line()) {
                    output.push_str(&format!("[{}:{}] ", file, line));
                }
            }

            output.push_str(&format!("{}", record.args()));

            writeln!(buf, "{}", output)
        });

        builder.try_init()?;

        info!("Logging initialized with filter: {}", filter_string);
        Ok(())
    }
}

/// Initialize logging with default configuration
pub fn initialize_default_logging() -> Result<(), LoggingError> {
    LoggingConfig::default().initialize_logger()
}

/// Initialize logging from an already loaded configuration, raising the level
/// to debug when `--debug` or `--verbose` was given
pub fn initialize_logging_with_flags(mut config: LoggingConfig, debug_mode: bool, verbose_mode: bool) -> Result<(), LoggingError> {
    if debug_mode || verbose_mode {
        config.level = "debug".to_string();
    }
    let result = config.initialize_logger();
    if debug_mode {
        info!("Debug mode enabled via command line");
    } else if verbose_mode {
        info!("Verbose mode enabled via command line");
    }
    result
}

/// Initialize logging from a configuration file path
pub fn initialize_logging_from_file<P: AsRef<Path>>(config_path: P) -> Result<(), LoggingError> {
    let path = config_path.as_ref();
    let config = if path.exists() {
        LoggingConfig::from_file(path)?
    } else {
        warn!("Logging config file {:?} not found, using defaults", path);
        LoggingConfig::default()
    };
    config.initialize_logger()
}
