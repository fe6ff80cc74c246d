//! Inputs to an evaluation.
//!
//! Submodules:
//! - `plants`: CSV plant table → validated `PlantRecord`s.
//! - `geolocate`: IP geolocation lookup and the retry/fallback resolver.

pub mod geolocate;
pub mod plants;
