//! Age-based safety tier classification.
//!
//! Tiers in ascending order of severity:
//!   age < safe_age            → Safe
//!   safe_age ≤ age < moderate → Moderate
//!   age ≥ moderate_age        → Dangerous
//! A missing or NaN age is `Unknown` and never enters a zone.

use crate::config::SafetyThresholds;
use crate::model::{ClassifiedPlant, PlantRecord, SafetyTier, TierCounts};

/// Classifies a plant age against `thresholds`. Total and pure.
pub fn classify(age: Option<f64>, thresholds: &SafetyThresholds) -> SafetyTier {
    let Some(age) = age else {
        return SafetyTier::Unknown;
    };
    if age.is_nan() {
        return SafetyTier::Unknown;
    }

    if age < thresholds.safe_age {
        SafetyTier::Safe
    } else if age < thresholds.moderate_age {
        SafetyTier::Moderate
    } else {
        SafetyTier::Dangerous
    }
}

/// Attaches a tier to every record, preserving order.
pub fn classify_plants(records: Vec<PlantRecord>, thresholds: &SafetyThresholds) -> Vec<ClassifiedPlant> {
    records
        .into_iter()
        .map(|record| {
            let safety = classify(record.age_years, thresholds);
            ClassifiedPlant { record, safety }
        })
        .collect()
}

pub fn tier_counts(plants: &[ClassifiedPlant]) -> TierCounts {
    let mut counts = TierCounts { total: plants.len(), ..TierCounts::default() };
    for plant in plants {
        match plant.safety {
            SafetyTier::Safe => counts.safe += 1,
            SafetyTier::Moderate => counts.moderate += 1,
            SafetyTier::Dangerous => counts.dangerous += 1,
            SafetyTier::Unknown => counts.unknown += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical() -> SafetyThresholds {
        SafetyThresholds::default()
    }

    fn legacy() -> SafetyThresholds {
        SafetyThresholds { safe_age: 15.0, moderate_age: 40.0 }
    }

    // --- Unknown ------------------------------------------------------------

    #[test]
    fn test_missing_age_is_unknown() {
        assert_eq!(classify(None, &canonical()), SafetyTier::Unknown);
    }

    #[test]
    fn test_nan_age_is_unknown() {
        assert_eq!(classify(Some(f64::NAN), &canonical()), SafetyTier::Unknown);
    }

    // --- Safe boundary ------------------------------------------------------

    #[test]
    fn test_new_plant_is_safe() {
        assert_eq!(classify(Some(0.0), &canonical()), SafetyTier::Safe);
        assert_eq!(classify(Some(14.99), &canonical()), SafetyTier::Safe);
    }

    #[test]
    fn test_safe_age_itself_is_moderate() {
        // The cut point is exclusive on the Safe side.
        assert_eq!(classify(Some(15.0), &canonical()), SafetyTier::Moderate);
    }

    // --- Moderate/Dangerous boundary, both configurations -------------------

    #[test]
    fn test_canonical_moderate_boundary_at_25() {
        assert_eq!(classify(Some(24.9), &canonical()), SafetyTier::Moderate);
        assert_eq!(classify(Some(25.0), &canonical()), SafetyTier::Dangerous);
        assert_eq!(classify(Some(39.0), &canonical()), SafetyTier::Dangerous);
    }

    #[test]
    fn test_legacy_moderate_boundary_at_40() {
        assert_eq!(classify(Some(25.0), &legacy()), SafetyTier::Moderate);
        assert_eq!(classify(Some(39.9), &legacy()), SafetyTier::Moderate);
        assert_eq!(classify(Some(40.0), &legacy()), SafetyTier::Dangerous);
    }

    #[test]
    fn test_classification_is_monotonic_in_age() {
        let thresholds = canonical();
        let mut previous = classify(Some(0.0), &thresholds);
        let mut age = 0.0;
        while age < 80.0 {
            let tier = classify(Some(age), &thresholds);
            assert!(
                tier >= previous,
                "tier must not become less severe as age grows: {} at {} after {}",
                tier,
                age,
                previous
            );
            previous = tier;
            age += 0.5;
        }
    }

    #[test]
    fn test_tier_counts() {
        let records = vec![
            PlantRecord { name: "A".into(), latitude: 0.0, longitude: 0.0, age_years: Some(3.0) },
            PlantRecord { name: "B".into(), latitude: 0.0, longitude: 0.0, age_years: Some(20.0) },
            PlantRecord { name: "C".into(), latitude: 0.0, longitude: 0.0, age_years: Some(50.0) },
            PlantRecord { name: "D".into(), latitude: 0.0, longitude: 0.0, age_years: None },
            PlantRecord { name: "E".into(), latitude: 0.0, longitude: 0.0, age_years: Some(1.0) },
        ];
        let plants = classify_plants(records, &canonical());
        let counts = tier_counts(&plants);
        assert_eq!(
            counts,
            TierCounts { total: 5, safe: 2, moderate: 1, dangerous: 1, unknown: 1 }
        );
        assert_eq!(plants[3].safety, SafetyTier::Unknown);
    }
}
