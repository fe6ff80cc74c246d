//! Distance from the user to each plant.
//!
//! Uses Vincenty's inverse formula on the WGS84 ellipsoid. For nearly
//! antipodal pairs, where the iteration can fail to converge, it falls back
//! to the haversine great-circle distance on the mean Earth radius; the two
//! agree to within ~0.5% everywhere.

use crate::model::{ClassifiedPlant, DistanceRecord, UserLocation};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// IUGG mean Earth radius, km.
pub const MEAN_EARTH_RADIUS_KM: f64 = 6371.0088;

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Geodesic distance in kilometres between two WGS84 points. Always >= 0.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    vincenty_km(lat1, lon1, lat2, lon2).unwrap_or_else(|| haversine_km(lat1, lon1, lat2, lon2))
}

/// Great-circle distance on a sphere of radius `MEAN_EARTH_RADIUS_KM`.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    MEAN_EARTH_RADIUS_KM * c
}

/// `None` when the iteration does not converge.
fn vincenty_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    let l = (lon2 - lon1).to_radians();
    let u1 = ((1.0 - WGS84_F) * lat1.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat2.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return Some(0.0); // coincident points
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Both points on the equator: cos²α = 0.
        let cos_2sigma_m = if cos_sq_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - lambda_prev).abs() < CONVERGENCE {
            let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
            let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b
                * sin_sigma
                * (cos_2sigma_m
                    + b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
            let metres = WGS84_B * a * (sigma - delta_sigma);
            return Some((metres / 1000.0).max(0.0));
        }
    }
    None
}

/// One `DistanceRecord` per plant, in input order.
pub fn calculate_distances(plants: &[ClassifiedPlant], user: &UserLocation) -> Vec<DistanceRecord> {
    plants
        .iter()
        .map(|plant| DistanceRecord {
            name: plant.record.name.clone(),
            distance_km: distance_km(
                user.latitude(),
                user.longitude(),
                plant.record.latitude,
                plant.record.longitude,
            ),
            safety: plant.safety,
            age_years: plant.record.age_years,
        })
        .collect()
}

/// Nearest first, for display. Ties keep input order.
pub fn sorted_by_distance(records: &[DistanceRecord]) -> Vec<DistanceRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationSource, PlantRecord, SafetyTier};
    use approx::assert_relative_eq;

    #[test]
    fn test_coincident_points_are_zero() {
        assert_eq!(distance_km(40.0, -74.0, 40.0, -74.0), 0.0);
    }

    #[test]
    fn test_tenth_of_degree_latitude_near_new_jersey() {
        // 0.05° of latitude at 40°N is ~5.55 km on the ellipsoid.
        let d = distance_km(40.05, -74.0, 40.0, -74.0);
        assert!(d > 5.5 && d < 5.6, "expected ~5.55 km, got {}", d);
    }

    #[test]
    fn test_new_york_to_los_angeles() {
        // Reference geodesic distance ~3944 km.
        let d = distance_km(40.7128, -74.0060, 34.0522, -118.2437);
        assert_relative_eq!(d, 3944.0, max_relative = 0.005);
    }

    #[test]
    fn test_distance_is_symmetric_and_non_negative() {
        let a = distance_km(51.5, -0.12, 48.85, 2.35);
        let b = distance_km(48.85, 2.35, 51.5, -0.12);
        assert!(a >= 0.0);
        assert_relative_eq!(a, b, epsilon = 1e-6);
    }

    #[test]
    fn test_antipodal_points_fall_back_to_haversine() {
        let d = distance_km(0.0, 0.0, 0.5, 179.7);
        assert!(d.is_finite() && d > 19_000.0 && d < 20_100.0, "got {}", d);
    }

    #[test]
    fn test_haversine_matches_vincenty_closely() {
        let h = haversine_km(40.7128, -74.0060, 41.8781, -87.6298);
        let v = distance_km(40.7128, -74.0060, 41.8781, -87.6298);
        assert_relative_eq!(h, v, max_relative = 0.005);
    }

    fn plant(name: &str, lat: f64, lon: f64) -> ClassifiedPlant {
        ClassifiedPlant {
            record: PlantRecord { name: name.into(), latitude: lat, longitude: lon, age_years: Some(10.0) },
            safety: SafetyTier::Safe,
        }
    }

    #[test]
    fn test_distances_follow_input_order_and_sort_for_display() {
        let user = UserLocation::new(40.0, -74.0, LocationSource::Resolved).unwrap();
        let plants = vec![plant("far", 42.0, -74.0), plant("near", 40.01, -74.0)];
        let records = calculate_distances(&plants, &user);
        assert_eq!(records[0].name, "far");
        assert_eq!(records[1].name, "near");

        let sorted = sorted_by_distance(&records);
        assert_eq!(sorted[0].name, "near");
        assert_eq!(sorted[1].name, "far");
    }
}
