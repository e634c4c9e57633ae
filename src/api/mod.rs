// Thin namespace wrapper for API-layer components
use utoipa::OpenApi;

pub mod handlers {
    pub use crate::handlers::*;
}

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(title = "Soil Fertility API", description = "GPS-based soil nutrient and fertility estimates"),
    paths(
        crate::handlers::health,
        crate::handlers::estimate_soil,
        crate::handlers::soil_history
    ),
    components(schemas(
        crate::models::SoilEstimateRequest,
        crate::models::SoilReading,
        crate::models::NutrientAssessment,
        crate::models::NutrientLevel,
        crate::models::ReadingSource,
        crate::models::SoilHistoryRecord
    ))
)]
pub struct ApiDoc;
