//! Prints the soil reading for a coordinate, using the same configuration as
//! the server.
//!
//! Usage: `estimate_soil [LAT LNG] [--offline]`

use soil_fertility_api::config::Config;
use soil_fertility_api::estimator::SoilEstimator;
use soil_fertility_api::geocoding::PlaceResolver;
use soil_fertility_api::provider::{ProviderSettings, RemoteSoilProvider};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soil_fertility_api=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let offline = args.iter().any(|a| a == "--offline");
    let coords: Vec<f64> = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(|a| a.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| anyhow::anyhow!("coordinates must be numbers: {}", e))?;

    let (lat, lng) = match coords.as_slice() {
        [] => (25.695470, 88.652380),
        [lat, lng] => (*lat, *lng),
        _ => anyhow::bail!("usage: estimate_soil [LAT LNG] [--offline]"),
    };

    let estimator = if offline {
        SoilEstimator::offline()
    } else {
        let config = Config::from_env()?;
        SoilEstimator::new(
            Arc::new(RemoteSoilProvider::new(ProviderSettings::from_config(&config))?),
            PlaceResolver::from_config(&config)?,
        )
    };

    let reading = estimator.estimate_soil(lat, lng).await?;
    println!("{}", serde_json::to_string_pretty(&reading)?);

    Ok(())
}
