//! Core data types for the nuclear plant proximity monitor.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O and no logic beyond validating constructors: plant
//! records, safety tiers, user location, per-plant distance rows, and the
//! error enums surfaced at each boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Plant records
// ---------------------------------------------------------------------------

/// One row of the plant table after ingestion.
///
/// Coordinates are WGS84 degrees and have already been range-checked by
/// `ingest::plants`. `age_years` is `None` when the source row carried no
/// usable age; such plants classify as `SafetyTier::Unknown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub age_years: Option<f64>,
}

/// Safety tier derived purely from plant age.
///
/// Declared in ascending order of severity so the derived `Ord` puts
/// `Dangerous` above `Moderate` above `Safe`. `Unknown` sorts lowest: it
/// never participates in a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SafetyTier {
    Unknown,
    Safe,
    Moderate,
    Dangerous,
}

impl SafetyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyTier::Unknown => "Unknown",
            SafetyTier::Safe => "Safe",
            SafetyTier::Moderate => "Moderate",
            SafetyTier::Dangerous => "Dangerous",
        }
    }
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plant record together with its tier. Every plant handed to the zone
/// classifier is one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPlant {
    #[serde(flatten)]
    pub record: PlantRecord,
    pub safety: SafetyTier,
}

/// Number of plants per tier, for the dashboard summary cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub total: usize,
    pub safe: usize,
    pub moderate: usize,
    pub dangerous: usize,
    pub unknown: usize,
}

// ---------------------------------------------------------------------------
// User location
// ---------------------------------------------------------------------------

/// Where the user's coordinates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// Answered by the IP-geolocation lookup.
    Resolved,
    /// Every lookup attempt failed; configured default used.
    Fallback,
}

/// The user's position. Latitude and longitude are always valid together;
/// the only way to build one is `UserLocation::new`, which range-checks both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    latitude: f64,
    longitude: f64,
    source: LocationSource,
}

impl UserLocation {
    /// Returns `None` unless both coordinates are finite and in range.
    pub fn new(latitude: f64, longitude: f64, source: LocationSource) -> Option<Self> {
        if valid_coordinates(latitude, longitude) {
            Some(Self { latitude, longitude, source })
        } else {
            None
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn source(&self) -> LocationSource {
        self.source
    }
}

/// True when `latitude` is in [-90, 90] and `longitude` in [-180, 180].
pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

// ---------------------------------------------------------------------------
// Derived per-evaluation types
// ---------------------------------------------------------------------------

/// Distance from the user to one plant. Produced fresh on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub name: String,
    pub distance_km: f64,
    pub safety: SafetyTier,
    pub age_years: Option<f64>,
}

/// Plant names per alert zone, each list in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneLists {
    pub safe: Vec<String>,
    pub moderate: Vec<String>,
    pub dangerous: Vec<String>,
}

impl ZoneLists {
    pub fn is_empty(&self) -> bool {
        self.safe.is_empty() && self.moderate.is_empty() && self.dangerous.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while loading the plant table. Any of these aborts the
/// evaluation before anything is committed to the snapshot store.
#[derive(Debug)]
pub enum IngestError {
    /// The data file could not be opened or read.
    Io(String),
    /// The CSV itself is malformed.
    Csv(String),
    /// One or more of Name / Latitude / Longitude is absent from the header.
    MissingColumns(Vec<String>),
    /// The table parsed but no row survived validation.
    Empty,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io(msg) => write!(f, "I/O error: {}", msg),
            IngestError::Csv(msg) => write!(f, "CSV error: {}", msg),
            IngestError::MissingColumns(cols) => {
                write!(f, "Missing required columns: {}", cols.join(", "))
            }
            IngestError::Empty => write!(f, "No valid plant rows in input"),
        }
    }
}

impl std::error::Error for IngestError {}

/// Errors from a single IP-geolocation attempt. The resolver absorbs these;
/// they never reach the caller of `LocationResolver::resolve`.
#[derive(Debug, PartialEq)]
pub enum GeolocateError {
    /// Non-2xx HTTP response from the lookup service.
    HttpError(u16),
    /// The request could not be sent (connect failure, timeout, ...).
    RequestFailed(String),
    /// The response body could not be deserialized.
    ParseError(String),
    /// The service answered but without a usable coordinate pair.
    Incomplete(String),
}

impl fmt::Display for GeolocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeolocateError::HttpError(code) => write!(f, "HTTP error: {}", code),
            GeolocateError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            GeolocateError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            GeolocateError::Incomplete(msg) => write!(f, "Incomplete location: {}", msg),
        }
    }
}

impl std::error::Error for GeolocateError {}

/// A notification backend could not deliver. Always non-fatal.
#[derive(Debug, PartialEq)]
pub struct NotifyError(pub String);

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Notification delivery failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}
