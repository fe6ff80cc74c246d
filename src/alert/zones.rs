//! Proximity zone classification.
//!
//! Each tier has its own radius; a plant is in a zone only when both its
//! tier matches and its distance is within that tier's radius (inclusive).
//! Unknown plants and out-of-radius plants are simply left out.

use crate::config::ZoneRadii;
use crate::geo;
use crate::model::{ClassifiedPlant, DistanceRecord, SafetyTier, UserLocation, ZoneLists};

/// Buckets plants into the three alert zones. Lists keep input order.
pub fn classify_zones(plants: &[ClassifiedPlant], user: &UserLocation, radii: &ZoneRadii) -> ZoneLists {
    let distances = geo::calculate_distances(plants, user);
    zones_from_distances(&distances, radii)
}

/// Same as `classify_zones`, over distances already computed for this
/// user location.
pub fn zones_from_distances(distances: &[DistanceRecord], radii: &ZoneRadii) -> ZoneLists {
    let mut zones = ZoneLists::default();
    for record in distances {
        let d = record.distance_km;
        match record.safety {
            SafetyTier::Safe if d <= radii.safe_zone_km => zones.safe.push(record.name.clone()),
            SafetyTier::Moderate if d <= radii.moderate_zone_km => {
                zones.moderate.push(record.name.clone())
            }
            SafetyTier::Dangerous if d <= radii.dangerous_zone_km => {
                zones.dangerous.push(record.name.clone())
            }
            _ => {}
        }
    }
    zones
}

/// Names of plants within `on_site_km` of the user, whatever their tier.
pub fn on_site(distances: &[DistanceRecord], on_site_km: f64) -> Vec<String> {
    distances
        .iter()
        .filter(|record| record.distance_km <= on_site_km)
        .map(|record| record.name.clone())
        .collect()
}
