// Configuration for the netplayer appliance
//
// The configuration file is a single JSON document. Every section is looked up
// in the "services" subtree first and then at the top level, so both layouts
// are accepted.

use crate::helpers::http_client::DEFAULT_MAX_RESPONSE_SIZE;
use crate::helpers::tunein::TuneInConfig;
use crate::logging::LoggingConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid '{section}' section: {source}")]
    Section {
        section: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Helper function to get service configuration with backward compatibility
///
/// This function first tries to find the section in the "services" structure,
/// then falls back to the top-level structure.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use netplayer::config::get_service_config;
///
/// let config = json!({
///   "services": {
///     "tunein": { "downgrade_https": false }
///   }
/// });
///
/// if let Some(tunein) = get_service_config(&config, "tunein") {
///     assert_eq!(tunein["downgrade_https"], false);
/// }
///
/// let flat = json!({ "camera": { "url": "http://cam/stream" } });
/// assert!(get_service_config(&flat, "camera").is_some());
/// ```
pub fn get_service_config<'a>(config: &'a serde_json::Value, service_name: &str) -> Option<&'a serde_json::Value> {
    if let Some(services) = config.get("services") {
        if let Some(service_config) = services.get(service_name) {
            debug!("Found {} configuration in services section", service_name);
            return Some(service_config);
        }
    }

    if let Some(service_config) = config.get(service_name) {
        debug!("Found {} configuration at top level", service_name);
        return Some(service_config);
    }

    debug!("No {} configuration found, using defaults", service_name);
    None
}

/// Deserialize one section, falling back to its defaults when it is missing
pub fn section<T: DeserializeOwned + Default>(config: &serde_json::Value, name: &str) -> Result<T, ConfigError> {
    match get_service_config(config, name) {
        Some(value) => T::deserialize(value).map_err(|source| ConfigError::Section {
            section: name.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SettingsConfig {
    /// SQLite file holding the user settings; `None` keeps them in memory
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_response_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Name announced to remote-control points
    pub friendly_name: String,
    pub uuid: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            friendly_name: "Network Media Player".to_string(),
            uuid: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// MJPEG stream opened at start-up, if any
    pub url: Option<String>,
    pub synchronous_close: bool,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: None,
            synchronous_close: true,
            frame_width: 240,
            frame_height: 240,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtworkConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            max_width: 480,
            max_height: 240,
        }
    }
}

/// Complete appliance configuration
#[derive(Debug, Clone, Default)]
pub struct ApplianceConfig {
    pub logging: LoggingConfig,
    pub settings: SettingsConfig,
    pub http: HttpConfig,
    pub tunein: TuneInConfig,
    pub remote: RemoteConfig,
    pub camera: CameraConfig,
    pub artwork: ArtworkConfig,
}

impl ApplianceConfig {
    pub fn from_value(config: &serde_json::Value) -> Result<Self, ConfigError> {
        Ok(Self {
            logging: section(config, "logging")?,
            settings: section(config, "settings")?,
            http: section(config, "http")?,
            tunein: section(config, "tunein")?,
            remote: section(config, "remote")?,
            camera: section(config, "camera")?,
            artwork: section(config, "artwork")?,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded configuration from {:?}", path);
        Self::from_json(&content)
    }
}
