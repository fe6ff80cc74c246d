/// IP Geolocation Client and Location Resolver
///
/// Looks up the machine's approximate coordinates from an ipinfo-style
/// service and wraps the lookup in a bounded, fixed-delay retry loop with a
/// configured fallback. The resolver never fails: after the last attempt it
/// returns the fallback coordinates.
///
/// Default service: https://ipinfo.io/json
///   {"ip": "...", "city": "...", "loc": "40.7143,-74.0060", ...}

use serde::Deserialize;
use std::time::Duration;

use crate::config::{LocationSettings, MAX_RETRY_DELAY_SECS};
use crate::logging::{self, Component};
use crate::model::{GeolocateError, LocationSource, UserLocation};

// ============================================================================
// Lookup seam
// ============================================================================

/// One geolocation attempt. Implementations return both coordinates or an
/// error; never half a pair.
pub trait GeoLocator: Send + Sync {
    fn locate(&self) -> Result<(f64, f64), GeolocateError>;
}

// ============================================================================
// ipinfo Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IpInfoResponse {
    pub ip: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    /// "lat,lon"
    pub loc: Option<String>,
}

/// Parses an ipinfo JSON body into a coordinate pair.
pub fn parse_ipinfo_response(body: &str) -> Result<(f64, f64), GeolocateError> {
    let response: IpInfoResponse =
        serde_json::from_str(body).map_err(|e| GeolocateError::ParseError(e.to_string()))?;
    let loc = response
        .loc
        .ok_or_else(|| GeolocateError::Incomplete("response has no 'loc' field".to_string()))?;
    parse_loc(&loc)
}

fn parse_loc(loc: &str) -> Result<(f64, f64), GeolocateError> {
    let (lat, lon) = loc
        .split_once(',')
        .ok_or_else(|| GeolocateError::Incomplete(format!("malformed loc '{}'", loc)))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| GeolocateError::Incomplete(format!("bad latitude in '{}'", loc)))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| GeolocateError::Incomplete(format!("bad longitude in '{}'", loc)))?;
    if !crate::model::valid_coordinates(lat, lon) {
        return Err(GeolocateError::Incomplete(format!("coordinates out of range in '{}'", loc)));
    }
    Ok((lat, lon))
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking HTTP locator. The client is built per lookup so the locator can
/// be created and dropped inside an async runtime; lookups themselves must
/// run on a blocking thread.
#[derive(Debug, Clone)]
pub struct IpInfoLocator {
    url: String,
    timeout: Duration,
}

impl IpInfoLocator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), timeout }
    }

    pub fn from_settings(settings: &LocationSettings) -> Self {
        Self::new(
            settings.geolocation_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }
}

impl GeoLocator for IpInfoLocator {
    fn locate(&self) -> Result<(f64, f64), GeolocateError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| GeolocateError::RequestFailed(e.to_string()))?;

        let response = client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| GeolocateError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeolocateError::HttpError(response.status().as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| GeolocateError::RequestFailed(e.to_string()))?;
        parse_ipinfo_response(&body)
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Clamped to `[0, MAX_RETRY_DELAY_SECS]`; NaN means no delay.
fn retry_delay(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_RETRY_DELAY_SECS)).unwrap_or(Duration::ZERO)
}

/// Retry-then-fallback wrapper around a `GeoLocator`.
pub struct LocationResolver<'a> {
    locator: &'a dyn GeoLocator,
    attempts: u32,
    delay: Duration,
    fallback: (f64, f64),
}

impl<'a> LocationResolver<'a> {
    pub fn new(locator: &'a dyn GeoLocator, settings: &LocationSettings) -> Self {
        Self {
            locator,
            attempts: settings.retry_attempts.max(1),
            delay: retry_delay(settings.retry_delay_secs),
            fallback: (settings.fallback_latitude, settings.fallback_longitude),
        }
    }

    /// Overrides the wait between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Always returns a location: the first successful lookup, or the
    /// fallback once every attempt has failed.
    pub fn resolve(&self) -> UserLocation {
        for attempt in 1..=self.attempts {
            match self.locator.locate() {
                Ok((lat, lon)) => {
                    if let Some(location) = UserLocation::new(lat, lon, LocationSource::Resolved) {
                        logging::info(
                            Component::Geo,
                            None,
                            &format!("resolved user location ({:.4}, {:.4})", lat, lon),
                        );
                        return location;
                    }
                    let err = GeolocateError::Incomplete(format!("({}, {}) out of range", lat, lon));
                    logging::log_geolocation_failure(attempt, self.attempts, &err);
                }
                Err(err) => logging::log_geolocation_failure(attempt, self.attempts, &err),
            }

            if attempt < self.attempts && !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }

        logging::warn(
            Component::Geo,
            None,
            &format!(
                "could not determine location after {} attempt(s); using fallback ({}, {})",
                self.attempts, self.fallback.0, self.fallback.1
            ),
        );
        self.fallback_location()
    }

    fn fallback_location(&self) -> UserLocation {
        // Config::validate range-checks the fallback; (0, 0) only if a
        // caller built settings by hand and skipped validation.
        UserLocation::new(self.fallback.0, self.fallback.1, LocationSource::Fallback)
            .or_else(|| UserLocation::new(0.0, 0.0, LocationSource::Fallback))
            .unwrap_or_else(|| unreachable!("(0, 0) is always a valid coordinate pair"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    /// Fails the first `failures` calls, then answers `answer`.
    struct FlakyLocator {
        failures: u32,
        answer: (f64, f64),
        calls: AtomicU32,
    }

    impl FlakyLocator {
        fn new(failures: u32, answer: (f64, f64)) -> Self {
            Self { failures, answer, calls: AtomicU32::new(0) }
        }
    }

    impl GeoLocator for FlakyLocator {
        fn locate(&self) -> Result<(f64, f64), GeolocateError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(GeolocateError::RequestFailed("connection refused".into()))
            } else {
                Ok(self.answer)
            }
        }
    }

    fn settings() -> LocationSettings {
        LocationSettings { retry_delay_secs: 0.0, ..LocationSettings::default() }
    }

    #[test]
    fn test_first_success_is_returned() {
        let locator = FlakyLocator::new(0, (51.5, -0.12));
        let loc = LocationResolver::new(&locator, &settings()).resolve();
        assert_eq!((loc.latitude(), loc.longitude()), (51.5, -0.12));
        assert_eq!(loc.source(), LocationSource::Resolved);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_succeeds_on_third_attempt() {
        let locator = FlakyLocator::new(2, (35.0, 139.0));
        let loc = LocationResolver::new(&locator, &settings()).resolve();
        assert_eq!(loc.source(), LocationSource::Resolved);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_three_failures_return_exact_fallback() {
        let locator = FlakyLocator::new(u32::MAX, (0.0, 0.0));
        let loc = LocationResolver::new(&locator, &settings()).resolve();
        assert_eq!(loc.latitude(), 40.7128);
        assert_eq!(loc.longitude(), -74.0060);
        assert_eq!(loc.source(), LocationSource::Fallback);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 3, "exactly three attempts");
    }

    #[test]
    fn test_out_of_range_answer_counts_as_failure() {
        let locator = FlakyLocator::new(0, (123.0, 0.0));
        let loc = LocationResolver::new(&locator, &settings()).resolve();
        assert_eq!(loc.source(), LocationSource::Fallback);
    }

    #[test]
    fn test_delay_between_attempts_but_not_after_last() {
        let locator = FlakyLocator::new(u32::MAX, (0.0, 0.0));
        let resolver = LocationResolver::new(&locator, &settings()).with_delay(Duration::from_millis(20));
        let started = Instant::now();
        resolver.resolve();
        let elapsed = started.elapsed();
        // Two waits for three attempts.
        assert!(elapsed >= Duration::from_millis(40), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(60) + Duration::from_millis(200));
    }

    #[test]
    fn test_oversized_delay_is_clamped_not_panicking() {
        assert_eq!(retry_delay(1e20), Duration::from_secs(300));
        assert_eq!(retry_delay(f64::NAN), Duration::ZERO);
        assert_eq!(retry_delay(-1.0), Duration::ZERO);
        assert_eq!(retry_delay(0.25), Duration::from_millis(250));

        let unvalidated = LocationSettings { retry_delay_secs: 1e20, ..LocationSettings::default() };
        let locator = FlakyLocator::new(0, (51.5, -0.12));
        let loc = LocationResolver::new(&locator, &unvalidated).resolve();
        assert_eq!(loc.source(), LocationSource::Resolved);
    }

    #[test]
    fn test_parse_ipinfo_body() {
        let body = r#"{"ip":"203.0.113.9","city":"Newark","region":"New Jersey","country":"US","loc":"40.7357,-74.1724"}"#;
        assert_eq!(parse_ipinfo_response(body).unwrap(), (40.7357, -74.1724));
    }

    #[test]
    fn test_parse_ipinfo_without_loc_is_incomplete() {
        let body = r#"{"ip":"10.0.0.1","bogon":true}"#;
        assert!(matches!(parse_ipinfo_response(body), Err(GeolocateError::Incomplete(_))));
    }

    #[test]
    fn test_parse_ipinfo_half_pair_is_incomplete() {
        let body = r#"{"loc":"40.7357"}"#;
        assert!(matches!(parse_ipinfo_response(body), Err(GeolocateError::Incomplete(_))));
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        assert!(matches!(parse_ipinfo_response("<html>"), Err(GeolocateError::ParseError(_))));
    }

    #[test]
    #[ignore] // Don't run in CI - depends on external API
    fn geolocation_api_returns_coordinates() {
        let locator = IpInfoLocator::from_settings(&LocationSettings::default());
        let (lat, lon) = locator.locate().expect("ipinfo lookup should succeed with network access");
        assert!(crate::model::valid_coordinates(lat, lon));
    }
}
