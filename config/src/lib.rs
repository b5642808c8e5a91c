//! Kjeller configuration.
//!
//! The daemon is configured with a single YAML file, re-read every cycle:
//!
//! ```yaml
//! global:
//!   debug: false
//!   sleep: 300
//!   lat: 59.91
//!   long: 10.75
//!   max_price: 2.5
//!   temperature: 22
//!   night_temperature: 16
//! tibber:
//!   access_token: ${TIBBER_TOKEN}
//!   house_id: "96a14971-525a-4420-aae9-e5aedaa129ff"
//! deconz:
//!   endpoint: http://deconz.local
//!   api_key: ${DECONZ_API_KEY}
//! room:
//!   - name: Bad
//!     uniqueid: "12"
//!     temperature: 24
//!     schedule:
//!       monday: ["06:00-08:00", "17:00-22:00"]
//! ```
//!
//! String credentials and endpoints may reference environment variables with
//! `${NAME}`; unset variables expand to the empty string.

use std::env;
use std::fmt;
use std::fs::read_to_string;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kjeller_types::{DEFAULT_TEMPERATURE, Schedule, Temperature};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Tibber's public GraphQL endpoint.
pub const TIBBER_API_URL: &str = "https://api.tibber.com/v1-beta/gql";

/// Default directory for Prometheus textfile exports.
pub const DEFAULT_METRICS_DIR: &str = "prom";

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid config at {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "global")]
    pub global: GlobalConfig,
    pub tibber: TibberConfig,
    pub deconz: DeconzConfig,
    #[serde(rename = "room", default)]
    pub rooms: Vec<RoomConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    /// Log at debug level.
    #[serde(default)]
    pub debug: bool,
    /// Seconds between control cycles.
    pub sleep: u64,
    /// House location. Informational.
    #[serde(rename = "lat", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "long", default)]
    pub longitude: Option<f64>,
    /// Default price cut-off for rooms without their own.
    #[serde(default)]
    pub max_price: Option<f64>,
    /// Default comfort temperature.
    #[serde(default)]
    pub temperature: Option<Temperature>,
    /// Default night (setback) temperature.
    #[serde(default)]
    pub night_temperature: Option<Temperature>,
    /// Directory for `<room>.prom` textfile exports.
    #[serde(default)]
    pub metrics_dir: Option<PathBuf>,
}

#[derive(Clone, Deserialize)]
pub struct TibberConfig {
    pub access_token: String,
    pub house_id: String,
    /// Override of [`TIBBER_API_URL`].
    #[serde(default)]
    pub endpoint: Option<String>,
    /// When set, the current hourly price is written here each cycle.
    #[serde(default)]
    pub price_file: Option<PathBuf>,
}

// Manual Debug impl to prevent leaking the access token in logs.
impl fmt::Debug for TibberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TibberConfig")
            .field("access_token", &"[REDACTED]")
            .field("house_id", &self.house_id)
            .field("endpoint", &self.endpoint)
            .field("price_file", &self.price_file)
            .finish()
    }
}

impl TibberConfig {
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(TIBBER_API_URL)
    }
}

#[derive(Clone, Deserialize)]
pub struct DeconzConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl fmt::Debug for DeconzConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeconzConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    pub name: String,
    /// deCONZ sensor id of the room's thermostat.
    #[serde(deserialize_with = "string_or_number")]
    pub uniqueid: String,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub temperature: Option<Temperature>,
    #[serde(default)]
    pub night_temperature: Option<Temperature>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

/// deCONZ ids are numeric strings; accept them unquoted too.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(n) => n.to_string(),
    })
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl Config {
    /// Read, expand, parse and validate the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    /// Parse and validate `content`; `path` is only used in errors.
    pub fn from_yaml(content: &str, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config: Config =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.expand_env();
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    fn expand_env(&mut self) {
        self.tibber.access_token = expand_env_vars(&self.tibber.access_token);
        self.tibber.house_id = expand_env_vars(&self.tibber.house_id);
        self.tibber.endpoint = self.tibber.endpoint.as_deref().map(expand_env_vars);
        self.deconz.endpoint = expand_env_vars(&self.deconz.endpoint);
        self.deconz.api_key = expand_env_vars(&self.deconz.api_key);
    }

    fn validate(&self) -> Result<(), String> {
        if self.global.sleep == 0 {
            return Err("global.sleep must be greater than zero".to_string());
        }
        for (field, value) in [
            ("tibber.access_token", &self.tibber.access_token),
            ("tibber.house_id", &self.tibber.house_id),
            ("deconz.endpoint", &self.deconz.endpoint),
            ("deconz.api_key", &self.deconz.api_key),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        for (index, room) in self.rooms.iter().enumerate() {
            if room.name.trim().is_empty() {
                return Err(format!("room[{index}].name must not be empty"));
            }
            if room.uniqueid.trim().is_empty() {
                return Err(format!("room '{}' has an empty uniqueid", room.name));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.global.sleep)
    }

    #[must_use]
    pub fn metrics_dir(&self) -> &Path {
        self.global
            .metrics_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_METRICS_DIR))
    }

    /// Comfort temperature: room, then global, then [`DEFAULT_TEMPERATURE`].
    #[must_use]
    pub fn effective_comfort(&self, room: &RoomConfig) -> Temperature {
        room.temperature
            .or(self.global.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Night temperature: room, then global, then [`DEFAULT_TEMPERATURE`].
    #[must_use]
    pub fn effective_night(&self, room: &RoomConfig) -> Temperature {
        room.night_temperature
            .or(self.global.night_temperature)
            .unwrap_or(DEFAULT_TEMPERATURE)
    }

    #[must_use]
    pub fn effective_max_price(&self, room: &RoomConfig) -> Option<f64> {
        room.max_price.or(self.global.max_price)
    }
}
