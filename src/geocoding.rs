use crate::config::Config;
use crate::coordinates::NormalizedCoordinate;
use crate::errors::AppError;
use moka::future::Cache;
use serde::Deserialize;
use std::time::Duration;

/// Returned whenever a place name cannot be resolved.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Debug, Default, Deserialize)]
struct ReverseGeocodeResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    county: Option<String>,
    suburb: Option<String>,
    town: Option<String>,
    city: Option<String>,
    village: Option<String>,
}

impl ReverseGeocodeResponse {
    /// Prefers the sub-district (upazila/county) level, then settlement names.
    fn place_name(self) -> Option<String> {
        let address = self.address.unwrap_or_default();
        [
            address.county,
            address.suburb,
            address.town,
            address.city,
            address.village,
            self.name,
        ]
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
    }
}

/// Reverse geocoder over the Nominatim API.
///
/// Resolved names are cached per grid cell; failures are not cached so a
/// transient outage does not pin a cell to "Unknown Location".
#[derive(Clone)]
pub struct PlaceResolver {
    client: reqwest::Client,
    base_url: Option<String>,
    user_agent: String,
    timeout: Duration,
    cache: Cache<String, String>,
}

impl PlaceResolver {
    /// Creates a resolver.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Nominatim base URL, without trailing slash.
    /// * `user_agent` - Sent on every request; Nominatim rejects anonymous clients.
    /// * `timeout` - Upper bound for one lookup.
    pub fn new(base_url: String, user_agent: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create geocoding client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: Some(base_url),
            user_agent,
            timeout,
            cache: Self::build_cache(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.geocoder_base_url.clone(),
            config.geocoder_user_agent.clone(),
            Duration::from_secs(config.geocoder_timeout_secs),
        )
    }

    /// A resolver that performs no lookups and always answers "Unknown Location".
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
            user_agent: String::new(),
            timeout: Duration::from_secs(1),
            cache: Self::build_cache(),
        }
    }

    fn build_cache() -> Cache<String, String> {
        // 24 hour TTL: place names do not change between requests
        Cache::builder()
            .time_to_live(Duration::from_secs(86400))
            .max_capacity(10_000)
            .build()
    }

    /// Resolves a grid cell to a place name, or [`UNKNOWN_LOCATION`].
    pub async fn resolve(&self, coord: &NormalizedCoordinate) -> String {
        let key = coord.cache_key();
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("Geocoding cache HIT for {}", key);
            return cached;
        }

        match self.lookup(coord).await {
            Ok(name) => {
                tracing::debug!("Geocoding resolved {} to {}", key, name);
                self.cache.insert(key, name.clone()).await;
                name
            }
            Err(e) => {
                tracing::warn!("Geocoding failed for {}: {}", key, e);
                UNKNOWN_LOCATION.to_string()
            }
        }
    }

    async fn lookup(&self, coord: &NormalizedCoordinate) -> Result<String, AppError> {
        let base_url = self.base_url.as_ref().ok_or_else(|| {
            AppError::GeocodingUnavailable("geocoding disabled".to_string())
        })?;

        let lat = coord.lat.to_string();
        let lon = coord.lng.to_string();
        let url = reqwest::Url::parse_with_params(
            &format!("{}/reverse", base_url),
            &[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "12"),
                ("addressdetails", "1"),
            ],
        )
        .map_err(|e| AppError::GeocodingUnavailable(format!("Failed to build URL: {}", e)))?;

        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| AppError::GeocodingUnavailable("request timed out".to_string()))?
            .map_err(|e| AppError::GeocodingUnavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::GeocodingUnavailable(format!(
                "geocoder returned {}",
                response.status()
            )));
        }

        let body: ReverseGeocodeResponse = response.json().await.map_err(|e| {
            AppError::GeocodingUnavailable(format!("Failed to parse geocoder response: {}", e))
        })?;

        body.place_name()
            .ok_or_else(|| AppError::GeocodingUnavailable("no place name in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ReverseGeocodeResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_county_has_priority() {
        let response = parse(json!({
            "name": "Some Road",
            "address": {"village": "Kismat", "county": "Dinajpur Sadar", "city": "Dinajpur"}
        }));
        assert_eq!(response.place_name().as_deref(), Some("Dinajpur Sadar"));
    }

    #[test]
    fn test_falls_back_to_top_level_name() {
        let response = parse(json!({"name": "Birganj", "address": {"state": "Rangpur Division"}}));
        assert_eq!(response.place_name().as_deref(), Some("Birganj"));
    }

    #[test]
    fn test_no_name_fields() {
        assert!(parse(json!({"error": "Unable to geocode"})).place_name().is_none());
        assert!(parse(json!({"address": {"town": "  "}})).place_name().is_none());
    }

    #[tokio::test]
    async fn test_disabled_resolver_returns_unknown() {
        let resolver = PlaceResolver::disabled();
        let name = resolver
            .resolve(&NormalizedCoordinate { lat: 25.7, lng: 88.65 })
            .await;
        assert_eq!(name, UNKNOWN_LOCATION);
    }
}
