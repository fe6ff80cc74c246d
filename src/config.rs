/// Service configuration loaded from `nukmon.toml`.
///
/// Every threshold the classifier, zone builder, resolver, map renderer and
/// notifier use lives here, so a deployment can move the Moderate/Dangerous
/// age boundary or a zone radius without a rebuild. Every section and field
/// has a default; a missing file means "all defaults".
///
/// Environment overrides (applied after the file, `.env` honoured):
///   NUKMON_CONFIG   path to the TOML file (default ./nukmon.toml)
///   NUKMON_DATA     plant CSV path
///   NUKMON_LOG_FILE append-only log file
///   PORT            HTTP listen port

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::model::{valid_coordinates, PlantRecord};

pub const DEFAULT_CONFIG_PATH: &str = "./nukmon.toml";

/// Upper bound on `location.retry_delay_secs`.
pub const MAX_RETRY_DELAY_SECS: f64 = 300.0;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Age cut points, in years. `safe_age < moderate_age`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SafetyThresholds {
    pub safe_age: f64,
    /// Upper bound (exclusive) of the Moderate tier. The canonical value is
    /// 25; the older single-file dashboard used 40.
    pub moderate_age: f64,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self { safe_age: 15.0, moderate_age: 25.0 }
    }
}

/// Per-tier zone radii plus the on-site radius, in kilometres.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZoneRadii {
    pub safe_zone_km: f64,
    pub moderate_zone_km: f64,
    pub dangerous_zone_km: f64,
    /// Only annotates the map popup and notification text.
    pub on_site_km: f64,
}

impl Default for ZoneRadii {
    fn default() -> Self {
        Self {
            safe_zone_km: 100.0,
            moderate_zone_km: 75.0,
            dangerous_zone_km: 50.0,
            on_site_km: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub fallback_latitude: f64,
    pub fallback_longitude: f64,
    pub retry_attempts: u32,
    pub retry_delay_secs: f64,
    /// ipinfo-style endpoint returning `{"loc": "lat,lon"}`.
    pub geolocation_url: String,
    pub request_timeout_secs: u64,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            fallback_latitude: 40.7128,
            fallback_longitude: -74.0060,
            retry_attempts: 3,
            retry_delay_secs: 1.0,
            geolocation_url: "https://ipinfo.io/json".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub output_dir: String,
    pub default_zoom: u8,
    /// Radius of the translucent circle drawn around each plant, metres.
    pub plant_circle_radius_m: f64,
    /// Radius of the circle drawn around the user, metres.
    pub user_circle_radius_m: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            output_dir: "./static/maps".to_string(),
            default_zoom: 6,
            plant_circle_radius_m: 30_000.0,
            user_circle_radius_m: 50_000.0,
        }
    }
}

/// Toast display time per zone level, in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub dangerous_timeout_secs: u32,
    pub moderate_timeout_secs: u32,
    pub safe_timeout_secs: u32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            dangerous_timeout_secs: 15,
            moderate_timeout_secs: 10,
            safe_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub data_path: String,
    /// Legacy behaviour: a missing age becomes 0 (and therefore Safe)
    /// instead of leaving the plant Unknown.
    pub missing_age_as_zero: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            data_path: "./data/plants.csv".to_string(),
            missing_age_as_zero: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    /// Sessions held in memory; the least recently evaluated one is
    /// evicted (with its map file) when a new session would exceed it.
    pub max_sessions: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 3000, max_sessions: 256 }
    }
}

/// A plant appended to every ingest, e.g. a local research reactor missing
/// from the public table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReferencePlant {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub age: Option<f64>,
}

impl ReferencePlant {
    pub fn to_record(&self) -> PlantRecord {
        PlantRecord {
            name: self.name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            age_years: self.age,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub safety: SafetyThresholds,
    pub zones: ZoneRadii,
    pub location: LocationSettings,
    pub map: MapSettings,
    pub notifications: NotificationSettings,
    pub ingest: IngestSettings,
    pub server: ServerSettings,
    pub reference_plants: Vec<ReferencePlant>,
    pub log_file: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults; an unreadable or
    /// malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// `load` from `NUKMON_CONFIG` (or the default path), then apply the
    /// environment overrides listed in the module docs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("NUKMON_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(&path)?;

        if let Ok(data) = std::env::var("NUKMON_DATA") {
            config.ingest.data_path = data;
        }
        if let Ok(log_file) = std::env::var("NUKMON_LOG_FILE") {
            config.log_file = Some(log_file);
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a port number: {}", port)))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.safety;
        if !(s.safe_age.is_finite() && s.moderate_age.is_finite()) || s.safe_age < 0.0 {
            return Err(ConfigError::Invalid("safety ages must be non-negative numbers".into()));
        }
        if s.safe_age >= s.moderate_age {
            return Err(ConfigError::Invalid(format!(
                "safety.safe_age ({}) must be below safety.moderate_age ({})",
                s.safe_age, s.moderate_age
            )));
        }

        let z = &self.zones;
        for (name, km) in [
            ("safe_zone_km", z.safe_zone_km),
            ("moderate_zone_km", z.moderate_zone_km),
            ("dangerous_zone_km", z.dangerous_zone_km),
            ("on_site_km", z.on_site_km),
        ] {
            if !(km.is_finite() && km > 0.0) {
                return Err(ConfigError::Invalid(format!("zones.{} must be positive, got {}", name, km)));
            }
        }

        let l = &self.location;
        if !valid_coordinates(l.fallback_latitude, l.fallback_longitude) {
            return Err(ConfigError::Invalid(format!(
                "fallback location ({}, {}) is out of range",
                l.fallback_latitude, l.fallback_longitude
            )));
        }
        if l.retry_attempts == 0 {
            return Err(ConfigError::Invalid("location.retry_attempts must be at least 1".into()));
        }
        if !(l.retry_delay_secs.is_finite()
            && (0.0..=MAX_RETRY_DELAY_SECS).contains(&l.retry_delay_secs))
        {
            return Err(ConfigError::Invalid(format!(
                "location.retry_delay_secs must be between 0 and {}, got {}",
                MAX_RETRY_DELAY_SECS, l.retry_delay_secs
            )));
        }

        if self.server.max_sessions == 0 {
            return Err(ConfigError::Invalid("server.max_sessions must be at least 1".into()));
        }

        for plant in &self.reference_plants {
            if !valid_coordinates(plant.latitude, plant.longitude) {
                return Err(ConfigError::Invalid(format!(
                    "reference plant '{}' has out-of-range coordinates",
                    plant.name
                )));
            }
        }

        Ok(())
    }
}
