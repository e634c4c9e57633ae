/// Unit tests for the soil estimation engine
/// Covers normalization, classification, scoring, merge precedence and the
/// offline end-to-end path
use soil_fertility_api::classifier::{classify, Nutrient};
use soil_fertility_api::coordinates::{GeoPoint, NormalizedCoordinate};
use soil_fertility_api::errors::AppError;
use soil_fertility_api::estimator::{build_reading, SoilEstimator};
use soil_fertility_api::merger::merge;
use soil_fertility_api::models::{NutrientLevel, ReadingSource, SoilProfile};
use soil_fertility_api::provider::{ProviderOutcome, ProviderReading};
use soil_fertility_api::scorer::fertility_index;
use soil_fertility_api::synthetic;

fn profile(n: f64, p: f64, k: f64, ph: f64, om: f64) -> SoilProfile {
    SoilProfile {
        nitrogen: n,
        phosphorus: p,
        potassium: k,
        ph,
        moisture: 40.0,
        organic_matter: om,
        sulfur: 20.0,
        zinc: 2.0,
    }
}

#[cfg(test)]
mod classifier_tests {
    use super::*;

    #[test]
    fn test_nitrogen_examples() {
        let level = |n| classify(&profile(n, 20.0, 150.0, 6.5, 3.0))[0].level;
        assert_eq!(level(25.0), NutrientLevel::Low);
        assert_eq!(level(45.0), NutrientLevel::Optimal);
        assert_eq!(level(70.0), NutrientLevel::High);
    }

    #[test]
    fn test_always_seven_entries_in_fixed_order() {
        let assessments = classify(&profile(10.0, 100.0, 50.0, 9.0, 0.5));
        assert_eq!(assessments.len(), 7);

        let expected: Vec<&str> = Nutrient::ALL.iter().map(|n| n.display_name()).collect();
        let actual: Vec<&str> = assessments.iter().map(|a| a.nutrient.as_str()).collect();
        assert_eq!(actual, expected);
        assert_eq!(actual[6], "pH Level");
    }

    #[test]
    fn test_solution_keys_encode_level() {
        let assessments = classify(&profile(10.0, 100.0, 150.0, 9.0, 0.5));
        assert_eq!(assessments[0].solution_key, "sol_Nitrogen_Low");
        assert_eq!(assessments[1].solution_key, "sol_Phosphorus_High");
        assert_eq!(assessments[2].solution_key, "sol_Optimal");
        assert_eq!(assessments[5].solution_key, "sol_OrganicMatter_Low");
        assert_eq!(assessments[6].solution_key, "sol_pH_High");
    }
}

#[cfg(test)]
mod scorer_tests {
    use super::*;

    #[test]
    fn test_all_good_branches() {
        assert_eq!(fertility_index(&profile(45.0, 25.0, 160.0, 6.8, 3.0)), 100);
    }

    #[test]
    fn test_all_bad_branches() {
        assert_eq!(fertility_index(&profile(20.0, 10.0, 100.0, 5.0, 1.0)), 50);
    }

    #[test]
    fn test_scorer_and_classifier_disagree_by_design() {
        // Nitrogen 35 is inside the classifier's optimal band but below the
        // scorer's "good" gate of 40.
        let p = profile(35.0, 25.0, 160.0, 6.8, 3.0);
        assert_eq!(classify(&p)[0].level, NutrientLevel::Optimal);
        assert_eq!(fertility_index(&p), 90);
    }
}

#[cfg(test)]
mod merge_tests {
    use super::*;

    #[test]
    fn test_provider_ph_and_om_override_synthetic() {
        let synthetic = profile(52.0, 18.0, 210.0, 7.3, 1.2);
        let outcome = ProviderOutcome::Available(ProviderReading {
            ph: Some(6.2),
            organic_matter: Some(3.1),
            moisture: None,
        });

        let merged = merge(&outcome, synthetic);
        assert_eq!(merged.profile.ph, 6.2);
        assert_eq!(merged.profile.organic_matter, 3.1);
        assert_eq!(merged.profile.nitrogen, synthetic.nitrogen);
        assert_eq!(merged.profile.phosphorus, synthetic.phosphorus);
        assert_eq!(merged.profile.potassium, synthetic.potassium);
        assert_eq!(merged.profile.sulfur, synthetic.sulfur);
        assert_eq!(merged.profile.zinc, synthetic.zinc);
        assert_eq!(merged.source, ReadingSource::Remote);
    }

    #[test]
    fn test_merged_reading_is_rescored() {
        let synthetic = profile(45.0, 25.0, 160.0, 7.9, 3.0);
        let outcome = ProviderOutcome::Available(ProviderReading {
            ph: Some(6.5),
            ..Default::default()
        });

        let merged = merge(&outcome, synthetic);
        let reading = build_reading(merged.profile, merged.source, None);
        assert_eq!(fertility_index(&synthetic), 90);
        assert_eq!(reading.fertility_index, 100);
        assert_eq!(reading.deficiencies[6].level, NutrientLevel::Optimal);
    }
}

#[cfg(test)]
mod end_to_end_tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_estimate_matches_synthetic_model() {
        let estimator = SoilEstimator::offline();
        let reading = estimator.estimate_soil(25.6955, 88.6524).await.unwrap();

        let cell = NormalizedCoordinate {
            lat: 25.70,
            lng: 88.65,
        };
        let expected = synthetic::generate(&cell);

        assert_eq!(reading.nitrogen, expected.nitrogen);
        assert_eq!(reading.phosphorus, expected.phosphorus);
        assert_eq!(reading.potassium, expected.potassium);
        assert_eq!(reading.ph, expected.ph);
        assert_eq!(reading.moisture, expected.moisture);
        assert_eq!(reading.organic_matter, expected.organic_matter);
        assert_eq!(reading.sulfur, expected.sulfur);
        assert_eq!(reading.zinc, expected.zinc);
        assert_eq!(reading.fertility_index, fertility_index(&expected));
        assert_eq!(reading.deficiencies, classify(&expected));
        assert_eq!(reading.source, ReadingSource::Synthetic);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let estimator = SoilEstimator::offline();
        let first = estimator.estimate_soil(23.8103, 90.4121).await.unwrap();
        let second = estimator.estimate_soil(23.8097, 90.4131).await.unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_before_computation() {
        let estimator = SoilEstimator::offline();
        for (lat, lng) in [(f64::NAN, 90.0), (91.0, 0.0), (0.0, 181.0), (0.0, f64::NEG_INFINITY)] {
            let err = estimator.estimate_soil(lat, lng).await.unwrap_err();
            assert!(matches!(err.root(), AppError::InvalidCoordinate(_)));
        }
    }

    #[test]
    fn test_normalizer_matches_grid() {
        assert_eq!(
            GeoPoint::new(25.6955, 88.6524).unwrap().normalize(),
            NormalizedCoordinate {
                lat: 25.70,
                lng: 88.65
            }
        );
    }
}
