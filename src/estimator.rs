//! Soil estimation pipeline.
//!
//! 1. Validate and normalize the coordinate
//! 2. Generate the synthetic profile for the grid cell
//! 3. Query the remote provider and resolve the place name (concurrently)
//! 4. Merge provider fields over the synthetic profile
//! 5. Score and classify

use crate::classifier;
use crate::coordinates::GeoPoint;
use crate::errors::AppError;
use crate::geocoding::PlaceResolver;
use crate::merger::{self, MergedProfile};
use crate::models::{ReadingSource, SoilProfile, SoilReading};
use crate::provider::{ProviderStatus, RemoteSoilProvider};
use crate::scorer;
use crate::synthetic;
use std::sync::Arc;

/// Builds a finished reading from a complete profile.
pub fn build_reading(
    profile: SoilProfile,
    source: ReadingSource,
    location_name: Option<String>,
) -> SoilReading {
    SoilReading {
        nitrogen: profile.nitrogen,
        phosphorus: profile.phosphorus,
        potassium: profile.potassium,
        ph: profile.ph,
        moisture: profile.moisture,
        organic_matter: profile.organic_matter,
        sulfur: profile.sulfur,
        zinc: profile.zinc,
        fertility_index: scorer::fertility_index(&profile),
        location_name,
        deficiencies: classifier::classify(&profile),
        source,
    }
}

/// Entry point of the engine. Holds the injected provider and place resolver;
/// cheap to share behind an `Arc`.
pub struct SoilEstimator {
    provider: Arc<RemoteSoilProvider>,
    places: PlaceResolver,
}

impl SoilEstimator {
    pub fn new(provider: Arc<RemoteSoilProvider>, places: PlaceResolver) -> Self {
        Self { provider, places }
    }

    /// Estimator with no remote dependencies: synthetic data, "Unknown Location".
    pub fn offline() -> Self {
        Self::new(
            Arc::new(RemoteSoilProvider::disabled()),
            PlaceResolver::disabled(),
        )
    }

    pub fn provider_status(&self) -> ProviderStatus {
        self.provider.status()
    }

    /// Estimates soil nutrients and fertility for a raw GPS coordinate.
    ///
    /// # Errors
    ///
    /// Only `AppError::InvalidCoordinate`. Provider and geocoding failures
    /// degrade to synthetic data and "Unknown Location".
    pub async fn estimate_soil(&self, lat: f64, lng: f64) -> Result<SoilReading, AppError> {
        let point = GeoPoint::new(lat, lng)?;
        let cell = point.normalize();
        tracing::info!("Estimating soil for {} (raw {}, {})", cell, lat, lng);

        let synthetic = synthetic::generate(&cell);
        let (outcome, location_name) =
            tokio::join!(self.provider.fetch(&cell), self.places.resolve(&cell));

        let MergedProfile { profile, source } = merger::merge(&outcome, synthetic);
        let reading = build_reading(profile, source, Some(location_name));

        tracing::info!(
            "Soil estimate for {}: fertility index {}, source {:?}",
            cell,
            reading.fertility_index,
            reading.source
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::NormalizedCoordinate;
    use crate::geocoding::UNKNOWN_LOCATION;

    #[tokio::test]
    async fn test_offline_estimate_matches_synthetic_model() {
        let estimator = SoilEstimator::offline();
        let reading = estimator.estimate_soil(25.6955, 88.6524).await.unwrap();

        let expected = synthetic::generate(&NormalizedCoordinate {
            lat: 25.70,
            lng: 88.65,
        });
        assert_eq!(reading.profile(), expected);
        assert_eq!(reading.fertility_index, scorer::fertility_index(&expected));
        assert_eq!(reading.source, ReadingSource::Synthetic);
        assert_eq!(reading.location_name.as_deref(), Some(UNKNOWN_LOCATION));
        assert_eq!(reading.deficiencies.len(), 7);
    }

    #[tokio::test]
    async fn test_invalid_coordinate_rejected() {
        let estimator = SoilEstimator::offline();
        let err = estimator.estimate_soil(123.0, 45.0).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCoordinate(_)));
    }

    #[test]
    fn test_build_reading_scores_and_classifies() {
        let profile = SoilProfile {
            nitrogen: 45.0,
            phosphorus: 25.0,
            potassium: 160.0,
            ph: 6.8,
            moisture: 35.0,
            organic_matter: 3.0,
            sulfur: 20.0,
            zinc: 2.0,
        };
        let reading = build_reading(profile, ReadingSource::Remote, None);
        assert_eq!(reading.fertility_index, 100);
        assert_eq!(reading.deficiencies[0].nutrient, "Nitrogen (N)");
        assert!(reading.location_name.is_none());
    }
}
