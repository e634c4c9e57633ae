//! Soil Fertility API Library
//!
//! Estimates soil nutrients and a fertility index for a GPS coordinate, using
//! Google Earth Engine soil rasters when available and a deterministic
//! synthetic model otherwise.
//!
//! # Modules
//!
//! - `api`: API definitions and OpenAPI document.
//! - `core`: Estimation engine.
//! - `integrations`: External service integrations.
//! - `circuit_breaker`: Circuit breaker for remote soil queries.
//! - `classifier`: Per-nutrient Low/Optimal/High classification.
//! - `config`: Configuration management.
//! - `coordinates`: Coordinate validation and grid normalization.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Soil history storage.
//! - `errors`: Error handling types.
//! - `estimator`: The `estimate_soil` pipeline.
//! - `geocoding`: Reverse geocoding (place names).
//! - `handlers`: HTTP request handlers.
//! - `merger`: Provider/synthetic merge.
//! - `models`: Core data models.
//! - `provider`: Earth Engine soil provider.
//! - `scorer`: Composite fertility index.
//! - `synthetic`: Deterministic synthetic soil model.

pub mod api;
pub mod core;
pub mod integrations;

pub mod circuit_breaker;
pub mod classifier;
pub mod config;
pub mod coordinates;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod estimator;
pub mod geocoding;
pub mod handlers;
pub mod merger;
pub mod models;
pub mod provider;
pub mod scorer;
pub mod synthetic;
