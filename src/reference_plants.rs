//! Built-in sample plant registry.
//!
//! A small, fixed set of plants used for the downloadable sample table and
//! as a smoke-test dataset, placed on three well-separated US cities. Beta
//! sits exactly on the canonical 25-year Moderate/Dangerous boundary, so the
//! sample shows a different map under the 40-year legacy setting.

// ---------------------------------------------------------------------------
// Sample metadata
// ---------------------------------------------------------------------------

pub struct SamplePlant {
    pub name: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Years in operation.
    pub age_years: f64,
}

pub static SAMPLE_PLANTS: &[SamplePlant] = &[
    SamplePlant {
        name: "Plant Alpha",
        latitude: 40.7128,
        longitude: -74.0060,
        age_years: 10.0,
    },
    SamplePlant {
        name: "Plant Beta",
        latitude: 34.0522,
        longitude: -118.2437,
        age_years: 25.0,
    },
    SamplePlant {
        name: "Plant Gamma",
        latitude: 41.8781,
        longitude: -87.6298,
        age_years: 45.0,
    },
];

pub const SAMPLE_FILE_NAME: &str = "sample_nuclear_plants.csv";

/// The sample table as CSV (`Name,Latitude,Longitude,Age`).
pub fn sample_csv() -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Name", "Latitude", "Longitude", "Age"])?;
    for plant in SAMPLE_PLANTS {
        writer.write_record([
            plant.name.to_string(),
            plant.latitude.to_string(),
            plant.longitude.to_string(),
            plant.age_years.to_string(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::thresholds::classify;
    use crate::config::SafetyThresholds;
    use crate::ingest::plants::{load_plants, IngestOptions};
    use crate::model::{valid_coordinates, PlantRecord, SafetyTier};

    fn sample_records() -> Vec<PlantRecord> {
        SAMPLE_PLANTS
            .iter()
            .map(|p| PlantRecord {
                name: p.name.to_string(),
                latitude: p.latitude,
                longitude: p.longitude,
                age_years: Some(p.age_years),
            })
            .collect()
    }

    #[test]
    fn test_no_duplicate_names() {
        let mut seen = std::collections::HashSet::new();
        for plant in SAMPLE_PLANTS {
            assert!(seen.insert(plant.name), "duplicate sample plant '{}'", plant.name);
        }
    }

    #[test]
    fn test_all_coordinates_valid() {
        for plant in SAMPLE_PLANTS {
            assert!(valid_coordinates(plant.latitude, plant.longitude), "'{}'", plant.name);
        }
    }

    #[test]
    fn test_sample_tiers_under_both_moderate_boundaries() {
        let tiers = |thresholds: SafetyThresholds| -> Vec<SafetyTier> {
            SAMPLE_PLANTS.iter().map(|p| classify(Some(p.age_years), &thresholds)).collect()
        };
        assert_eq!(
            tiers(SafetyThresholds::default()),
            vec![SafetyTier::Safe, SafetyTier::Dangerous, SafetyTier::Dangerous]
        );
        assert_eq!(
            tiers(SafetyThresholds { safe_age: 15.0, moderate_age: 40.0 }),
            vec![SafetyTier::Safe, SafetyTier::Moderate, SafetyTier::Dangerous]
        );
    }

    #[test]
    fn test_sample_csv_reloads_through_ingest() {
        let csv = sample_csv().unwrap();
        assert!(csv.starts_with("Name,Latitude,Longitude,Age\n"));
        let report = load_plants(csv.as_bytes(), &IngestOptions::default()).unwrap();
        assert_eq!(report.records, sample_records());
    }
}
