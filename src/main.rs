use axum::{
    routing::{get, post},
    Router,
};
use soil_fertility_api::api::ApiDoc;
use soil_fertility_api::config::Config;
use soil_fertility_api::db::Database;
use soil_fertility_api::db_storage::SoilHistoryStorage;
use soil_fertility_api::estimator::SoilEstimator;
use soil_fertility_api::geocoding::PlaceResolver;
use soil_fertility_api::handlers::{self, AppState};
use soil_fertility_api::provider::{ProviderSettings, RemoteSoilProvider};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Connects to Postgres and prepares the history table, if configured.
///
/// History is optional: any failure is logged and the service runs without it.
async fn init_history(config: &Config) -> Option<SoilHistoryStorage> {
    let url = config.database_url.as_ref()?;

    let db = match Database::new(url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to history database: {}", e);
            return None;
        }
    };

    let storage = SoilHistoryStorage::new(db.pool);
    if let Err(e) = storage.ensure_schema().await {
        tracing::error!("Failed to prepare soil_history table: {}", e);
        return None;
    }

    tracing::info!("Soil history storage enabled");
    Some(storage)
}

/// Main entry point for the application.
///
/// Initializes logging, configuration, the soil estimation engine (Earth
/// Engine provider and place resolver), optional history storage, and the
/// HTTP routes with their middleware, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soil_fertility_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let provider = Arc::new(RemoteSoilProvider::new(ProviderSettings::from_config(
        &config,
    ))?);

    // Authenticate in the background so the first request does not pay for it
    let warm_provider = provider.clone();
    tokio::spawn(async move {
        if warm_provider.warm_up().await {
            tracing::info!("✓ Earth Engine provider ready");
        } else {
            tracing::warn!("Earth Engine provider unavailable, serving synthetic soil data");
        }
    });

    let places = PlaceResolver::from_config(&config)?;
    tracing::info!("Place resolver initialized: {}", config.geocoder_base_url);

    let app_state = Arc::new(AppState {
        estimator: Arc::new(SoilEstimator::new(provider, places)),
        history: init_history(&config).await,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = Router::new()
        .route("/api/v1/soil-data", post(handlers::estimate_soil))
        .route("/api/v1/history/soil", get(handlers::soil_history))
        .layer(
            ServiceBuilder::new()
                // Request size limit: the only body is a coordinate pair
                .layer(RequestBodyLimitLayer::new(64 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
