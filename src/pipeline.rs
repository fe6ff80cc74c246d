//! One evaluation cycle, end to end.
//!
//!   plant table → safety tiers → user location → distances → zones
//!     → on-site → map file → notification → snapshot store
//!
//! `evaluate_plants` is the pure core: a deterministic function of
//! (records, user location, thresholds). `Dashboard::evaluate` wraps it with
//! the blocking I/O (CSV read, geolocation, map write, notification) and
//! commits the result only if every fallible step succeeded.

use std::fmt;
use std::sync::{Arc, PoisonError};

use chrono::Utc;

use crate::alert::notify::{self, Notification, Notifier};
use crate::alert::{thresholds, zones};
use crate::config::Config;
use crate::geo;
use crate::ingest::geolocate::{GeoLocator, LocationResolver};
use crate::ingest::plants::{self, IngestOptions};
use crate::logging::{self, Component};
use crate::model::{ClassifiedPlant, DistanceRecord, IngestError, PlantRecord, TierCounts, UserLocation, ZoneLists};
use crate::render::map;
use crate::store::{DashboardSnapshot, SnapshotStore};

// ---------------------------------------------------------------------------
// Pure core
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub plants: Vec<ClassifiedPlant>,
    pub distances: Vec<DistanceRecord>,
    pub zones: ZoneLists,
    pub on_site: Vec<String>,
    pub counts: TierCounts,
}

pub fn evaluate_plants(records: Vec<PlantRecord>, user: &UserLocation, config: &Config) -> Evaluation {
    let plants = thresholds::classify_plants(records, &config.safety);
    let distances = geo::calculate_distances(&plants, user);
    let zones = zones::zones_from_distances(&distances, &config.zones);
    let on_site = zones::on_site(&distances, config.zones.on_site_km);
    let counts = thresholds::tier_counts(&plants);
    Evaluation { plants, distances, zones, on_site, counts }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PipelineError {
    Ingest(IngestError),
    Render(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Ingest(e) => write!(f, "{}", e),
            PipelineError::Render(msg) => write!(f, "Map render failed: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<IngestError> for PipelineError {
    fn from(e: IngestError) -> Self {
        PipelineError::Ingest(e)
    }
}

// ---------------------------------------------------------------------------
// Full cycle
// ---------------------------------------------------------------------------

/// Where the plant table comes from.
#[derive(Debug, Clone)]
pub enum PlantSource {
    /// `config.ingest.data_path`
    ConfiguredFile,
    /// CSV bytes supplied by the caller (upload).
    Upload(Vec<u8>),
}

pub struct Dashboard {
    config: Config,
    locator: Box<dyn GeoLocator>,
    notifier: Box<dyn Notifier>,
    store: Arc<SnapshotStore>,
}

impl Dashboard {
    pub fn new(
        config: Config,
        locator: Box<dyn GeoLocator>,
        notifier: Box<dyn Notifier>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        Self { config, locator, notifier, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Runs one cycle for `session` and stores the result. Blocking.
    ///
    /// On error nothing is stored and the session keeps its previous
    /// snapshot.
    pub fn evaluate(&self, session: &str, source: PlantSource) -> Result<Arc<DashboardSnapshot>, PipelineError> {
        let writer = self.store.writer_lock(session);
        let _guard = writer.lock().unwrap_or_else(PoisonError::into_inner);

        let options = IngestOptions::from_config(&self.config);
        let report = match &source {
            PlantSource::ConfiguredFile => plants::load_plants_file(&self.config.ingest.data_path, &options),
            PlantSource::Upload(bytes) => plants::load_plants(bytes.as_slice(), &options),
        }
        .inspect_err(|e| logging::error(Component::Ingest, Some(session), &e.to_string()))?;

        logging::info(
            Component::Ingest,
            Some(session),
            &format!("loaded {} plants ({} rows dropped)", report.records.len(), report.dropped_rows),
        );

        let user = LocationResolver::new(self.locator.as_ref(), &self.config.location).resolve();
        let evaluation = evaluate_plants(report.records, &user, &self.config);

        let html = map::render_map_html(
            &evaluation.plants,
            &user,
            &evaluation.on_site,
            &self.config.map,
        );
        let map_filename = map::map_file_name(session, self.store.next_map_seq());
        map::write_map_file(&self.config.map.output_dir, &map_filename, &html).map_err(|e| {
            logging::error(Component::Map, Some(session), &e.to_string());
            PipelineError::Render(e.to_string())
        })?;

        let notification = self.notify(&evaluation);

        logging::log_evaluation_summary(
            session,
            evaluation.counts.total,
            evaluation.zones.safe.len(),
            evaluation.zones.moderate.len(),
            evaluation.zones.dangerous.len(),
        );

        let snapshot = Arc::new(DashboardSnapshot {
            session: session.to_string(),
            generated_at: Utc::now(),
            user_location: user,
            plants: evaluation.plants,
            distances: geo::sorted_by_distance(&evaluation.distances),
            zones: evaluation.zones,
            on_site_plants: evaluation.on_site,
            counts: evaluation.counts,
            dropped_rows: report.dropped_rows,
            map_filename: Some(map_filename),
            notification,
        });
        for displaced in self.store.put(Arc::clone(&snapshot)) {
            self.remove_map(&displaced);
        }
        Ok(snapshot)
    }

    /// Deletes the map page of a snapshot that is no longer stored. A
    /// failure leaves an orphan file behind and is only logged.
    fn remove_map(&self, snapshot: &DashboardSnapshot) {
        let Some(file_name) = snapshot.map_filename.as_deref() else {
            return;
        };
        let path = std::path::Path::new(&self.config.map.output_dir).join(file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => logging::debug(
                Component::Store,
                Some(&snapshot.session),
                &format!("removed superseded map {}", path.display()),
            ),
            Err(e) => logging::warn(
                Component::Store,
                Some(&snapshot.session),
                &format!("could not remove superseded map {}: {}", path.display(), e),
            ),
        }
    }

    fn notify(&self, evaluation: &Evaluation) -> Option<Notification> {
        let notification = notify::select_notification(
            &evaluation.zones,
            &evaluation.on_site,
            &self.config.zones,
            &self.config.notifications,
        )?;
        notify::dispatch(self.notifier.as_ref(), &notification);
        Some(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationSource, SafetyTier};

    fn record(name: &str, lat: f64, lon: f64, age: Option<f64>) -> PlantRecord {
        PlantRecord { name: name.into(), latitude: lat, longitude: lon, age_years: age }
    }

    #[test]
    fn test_evaluate_plants_reactor_pair() {
        let user = UserLocation::new(40.05, -74.0, LocationSource::Resolved).unwrap();
        let eval = evaluate_plants(
            vec![
                record("Reactor A", 40.0, -74.0, Some(10.0)),
                record("Reactor B", 40.1, -74.0, Some(45.0)),
            ],
            &user,
            &Config::default(),
        );

        assert_eq!(eval.plants[0].safety, SafetyTier::Safe);
        assert_eq!(eval.plants[1].safety, SafetyTier::Dangerous);
        for d in &eval.distances {
            assert!((d.distance_km - 5.55).abs() < 0.1, "{} at {}", d.name, d.distance_km);
        }
        assert_eq!(eval.zones.safe, vec!["Reactor A"]);
        assert_eq!(eval.zones.dangerous, vec!["Reactor B"]);
        assert!(eval.on_site.is_empty());
        assert_eq!(eval.counts.total, 2);
    }

    #[test]
    fn test_evaluate_plants_is_idempotent() {
        let user = UserLocation::new(48.0, 2.0, LocationSource::Fallback).unwrap();
        let records = vec![
            record("X", 48.1, 2.1, Some(20.0)),
            record("Y", 47.9, 1.9, None),
            record("Z", 48.0, 2.0, Some(60.0)),
        ];
        let a = evaluate_plants(records.clone(), &user, &Config::default());
        let b = evaluate_plants(records, &user, &Config::default());
        assert_eq!(a, b);
        assert_eq!(a.on_site, vec!["Z"]);
    }

    #[test]
    fn test_legacy_boundary_moves_plant_between_zones() {
        let user = UserLocation::new(40.0, -74.0, LocationSource::Resolved).unwrap();
        // ~60 km north: inside the moderate radius, outside the dangerous one.
        let records = vec![record("Thirty", 40.54, -74.0, Some(30.0))];

        let canonical = evaluate_plants(records.clone(), &user, &Config::default());
        assert!(canonical.zones.is_empty(), "Dangerous at 60 km is outside 50 km");

        let mut legacy = Config::default();
        legacy.safety.moderate_age = 40.0;
        let legacy = evaluate_plants(records, &user, &legacy);
        assert_eq!(legacy.zones.moderate, vec!["Thirty"]);
    }
}
