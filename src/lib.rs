//! Nuclear plant proximity monitor.
//!
//! Loads a table of plants, grades each by operating age, locates the user,
//! sorts nearby plants into distance zones, and publishes the result as a
//! map page, a processed table, a notification, and a JSON snapshot served
//! over HTTP.

pub mod alert;
pub mod config;
pub mod geo;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod reference_plants;
pub mod render;
pub mod server;
pub mod store;
