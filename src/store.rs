//! Session-keyed snapshot store.
//!
//! Holds the last evaluation per session. A snapshot is immutable once
//! stored; a new evaluation replaces it whole, so a reader sees either the
//! previous snapshot or the next one, never a mix. Writers for the same
//! session serialize on a per-session lock.
//!
//! The number of sessions is capped; storing a new session past the cap
//! evicts the one with the oldest snapshot. Snapshots that leave the store
//! are handed back to the caller so their map files can be removed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::notify::Notification;
use crate::logging::{self, Component};
use crate::model::{ClassifiedPlant, DistanceRecord, TierCounts, UserLocation, ZoneLists};

pub const DEFAULT_SESSION: &str = "default";

/// Everything one evaluation produced.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub session: String,
    pub generated_at: DateTime<Utc>,
    pub user_location: UserLocation,
    pub plants: Vec<ClassifiedPlant>,
    /// Nearest first.
    pub distances: Vec<DistanceRecord>,
    pub zones: ZoneLists,
    pub on_site_plants: Vec<String>,
    pub counts: TierCounts,
    pub dropped_rows: usize,
    pub map_filename: Option<String>,
    pub notification: Option<Notification>,
}

pub const DEFAULT_MAX_SESSIONS: usize = 256;

pub struct SnapshotStore {
    snapshots: RwLock<HashMap<String, Arc<DashboardSnapshot>>>,
    writers: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    map_seq: AtomicU64,
    max_sessions: usize,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `max_sessions` snapshots (minimum 1).
    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            writers: Mutex::new(HashMap::new()),
            map_seq: AtomicU64::new(0),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn get(&self, session: &str) -> Option<Arc<DashboardSnapshot>> {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session)
            .cloned()
    }

    /// Stores `snapshot` as its session's current one.
    ///
    /// Returns every snapshot that left the store: the session's previous
    /// one, and the least recently generated other session's when a new
    /// session would exceed the capacity. The caller owns cleaning up their
    /// artifacts.
    pub fn put(&self, snapshot: Arc<DashboardSnapshot>) -> Vec<Arc<DashboardSnapshot>> {
        let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
        let mut displaced = Vec::new();

        if !snapshots.contains_key(&snapshot.session) && snapshots.len() >= self.max_sessions {
            let oldest = snapshots
                .values()
                .min_by_key(|s| s.generated_at)
                .map(|s| s.session.clone());
            if let Some(evicted) = oldest.and_then(|session| snapshots.remove(&session)) {
                logging::info(
                    Component::Store,
                    Some(&evicted.session),
                    &format!("evicted; session cap is {}", self.max_sessions),
                );
                displaced.push(evicted);
            }
        }

        if let Some(previous) = snapshots.insert(snapshot.session.clone(), snapshot) {
            displaced.push(previous);
        }
        displaced
    }

    /// The lock an evaluation holds while computing and storing a
    /// session's snapshot. Locks nobody else holds are dropped first, so the
    /// table only keeps sessions with an evaluation in flight.
    pub fn writer_lock(&self, session: &str) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        writers.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(writers.entry(session.to_string()).or_default())
    }

    /// Monotonic sequence for map file names.
    pub fn next_map_seq(&self) -> u64 {
        self.map_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn writer_count(&self) -> usize {
        self.writers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A session key is 1–64 characters of `[A-Za-z0-9_-]`; it ends up in a
/// file name, so nothing else is accepted.
pub fn valid_session_id(session: &str) -> bool {
    !session.is_empty()
        && session.len() <= 64
        && session.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
