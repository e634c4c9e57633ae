use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============ Soil Domain Models ============

/// The eight numeric soil properties, before scoring and classification.
///
/// Produced by the synthetic model and by merging provider data over it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilProfile {
    /// Nitrogen, mg/kg.
    pub nitrogen: f64,
    /// Phosphorus, mg/kg.
    pub phosphorus: f64,
    /// Potassium, mg/kg.
    pub potassium: f64,
    pub ph: f64,
    /// Moisture, percent.
    pub moisture: f64,
    /// Organic matter, percent.
    pub organic_matter: f64,
    /// Sulfur, ppm.
    pub sulfur: f64,
    /// Zinc, ppm.
    pub zinc: f64,
}

/// Where the values of a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadingSource {
    /// At least one field came from the remote soil provider.
    Remote,
    /// Every field came from the synthetic model.
    Synthetic,
}

/// Tri-state classification of one soil property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum NutrientLevel {
    Low,
    Optimal,
    High,
}

impl NutrientLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientLevel::Low => "Low",
            NutrientLevel::Optimal => "Optimal",
            NutrientLevel::High => "High",
        }
    }
}

/// Classification of one tracked nutrient with localization keys for its
/// cause and remedy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NutrientAssessment {
    /// Display name, e.g. "Nitrogen (N)" or "pH Level".
    pub nutrient: String,
    pub level: NutrientLevel,
    pub value: f64,
    /// Display unit; empty for pH.
    pub unit: String,
    /// Localization key describing why the nutrient matters.
    pub reason_key: String,
    /// Localization key for the remedy matching the observed level.
    pub solution_key: String,
}

/// Complete output of the soil estimation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoilReading {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ph: f64,
    pub moisture: f64,
    pub organic_matter: f64,
    pub sulfur: f64,
    pub zinc: f64,
    /// Composite score in [0, 100].
    pub fertility_index: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    /// Always seven entries: N, P, K, S, Zn, Organic Matter, pH.
    pub deficiencies: Vec<NutrientAssessment>,
    pub source: ReadingSource,
}

impl SoilReading {
    /// The numeric fields of this reading, without score or assessments.
    pub fn profile(&self) -> SoilProfile {
        SoilProfile {
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
            ph: self.ph,
            moisture: self.moisture,
            organic_matter: self.organic_matter,
            sulfur: self.sulfur,
            zinc: self.zinc,
        }
    }
}

// ============ API Request/Response Models ============

/// Body of `POST /api/v1/soil-data`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SoilEstimateRequest {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Query parameters for `GET /api/v1/history/soil`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQueryParams {
    pub limit: Option<i64>,
}

/// A stored snapshot of a past estimate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoilHistoryRecord {
    pub id: Uuid,
    /// Human-readable location label ("lat, lng" when no place name was found).
    pub location: String,
    pub result: SoilReading,
    pub created_at: DateTime<Utc>,
}
