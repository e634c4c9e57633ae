//! Remote soil provider backed by Google Earth Engine (OpenLandMap rasters).
//!
//! Only pH, organic carbon and clay fraction are available as global layers,
//! so the provider returns a partial reading; everything else is filled from
//! the synthetic model by the merger.
//!
//! Failures never cross this module's boundary: [`RemoteSoilProvider::fetch`]
//! answers [`ProviderOutcome::Unavailable`] and logs the cause.
//!
//! Authentication happens at most once per provider instance. The outcome,
//! success or failure, is cached in a `OnceCell`; concurrent first callers wait
//! on the same attempt.

use crate::circuit_breaker::{create_provider_circuit_breaker, ProviderCircuitBreaker};
use crate::config::Config;
use crate::coordinates::{round_to, NormalizedCoordinate};
use crate::errors::{AppError, ResultExt};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use failsafe::CircuitBreaker;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};

pub const EARTH_ENGINE_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const PH_ASSET: &str = "OpenLandMap/SOL/SOL_PH-H2O_USDA-4C1a2a_M/v02";
const ORGANIC_CARBON_ASSET: &str = "OpenLandMap/SOL/SOL_ORGANIC-CARBON_USDA-6A1C_M/v02";
const CLAY_ASSET: &str = "OpenLandMap/SOL/SOL_CLAY-WF_USDA-3A1a1a_M/v02";
const SAMPLE_SCALE_METERS: u32 = 250;

/// Tokens are refreshed this long before they actually expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Upper bound on a token lifetime reported by the token endpoint.
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

// ============ Provider Output ============

/// Fields measured by the provider. `None` means "not returned".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProviderReading {
    pub ph: Option<f64>,
    pub organic_matter: Option<f64>,
    pub moisture: Option<f64>,
}

impl ProviderReading {
    /// Converts raw band means: pH and organic carbon are stored ×10, and
    /// moisture is estimated from clay fraction as `clay * 0.8 + 10`.
    pub fn from_bands(bands: &BandMeans) -> Self {
        Self {
            ph: bands.ph.map(|raw| round_to(raw / 10.0, 1)),
            organic_matter: bands.organic_carbon.map(|raw| round_to(raw / 10.0, 1)),
            moisture: bands.clay.map(|clay| round_to(clay * 0.8 + 10.0, 1)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ph.is_none() && self.organic_matter.is_none() && self.moisture.is_none()
    }
}

/// Result of asking the provider about one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProviderOutcome {
    Available(ProviderReading),
    Unavailable,
}

/// Authentication state, reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    /// No request has needed the provider yet.
    Pending,
    Ready,
    /// Initialization failed; the synthetic model answers alone.
    Unavailable,
}

/// Band means as returned by `Image.reduceRegion`. `addBands` renames the
/// repeated `b0` band to `b0_1`, `b0_2`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BandMeans {
    #[serde(rename = "b0", default)]
    pub ph: Option<f64>,
    #[serde(rename = "b0_1", default)]
    pub organic_carbon: Option<f64>,
    #[serde(rename = "b0_2", default)]
    pub clay: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ComputeValueResponse {
    #[serde(default)]
    result: Option<BandMeans>,
}

// ============ Credentials ============

/// Raw service-account JSON as downloaded from the Google Cloud console.
#[derive(Clone, Deserialize)]
struct ServiceAccountKeyFile {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    client_email: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// A structurally valid service-account credential.
#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key_id: Option<String>,
    pub project_id: Option<String>,
    pub token_uri: String,
    private_key: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ServiceAccount {
    /// Parses and validates a credential blob.
    ///
    /// OAuth client secrets parse as JSON too but carry no private key; they
    /// cannot be used for server-side auth and are rejected here.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let key: ServiceAccountKeyFile = serde_json::from_str(raw).map_err(|e| {
            AppError::ProviderUnavailable(format!("credential is not valid JSON: {}", e))
        })?;

        let (private_key, client_email) = match (key.private_key, key.client_email) {
            (Some(pk), Some(email)) if !pk.trim().is_empty() && !email.trim().is_empty() => {
                (pk, email)
            }
            _ => {
                return Err(AppError::ProviderUnavailable(
                    "credential looks like an OAuth client secret, not a service-account key"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            client_email,
            private_key_id: key.private_key_id,
            project_id: key.project_id,
            token_uri: key
                .token_uri
                .filter(|uri| !uri.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            private_key,
        })
    }

    /// Builds the RS256-signed JWT assertion exchanged for an access token.
    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        #[derive(Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: i64,
            exp: i64,
        }

        let claims = Claims {
            iss: &self.client_email,
            scope: EARTH_ENGINE_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            AppError::ProviderUnavailable(format!("service-account private key is unusable: {}", e))
        })?;

        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| AppError::ProviderUnavailable(format!("failed to sign assertion: {}", e)))
    }
}

/// Where the provider looks for its credential, in priority order.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Inline JSON credential (environment).
    pub credential_json: Option<String>,
    /// Key file on disk, consulted when the inline credential is missing or broken.
    pub key_path: Option<PathBuf>,
    pub api_base_url: String,
    /// Overrides the key's `project_id`.
    pub project_id: Option<String>,
    pub query_timeout: Duration,
}

impl ProviderSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            credential_json: config.gee_private_key.clone(),
            key_path: Some(config.gee_key_path.clone()),
            api_base_url: config.gee_api_base_url.clone(),
            project_id: config.gee_project_id.clone(),
            query_timeout: Duration::from_secs(config.gee_query_timeout_secs),
        }
    }

    /// Settings with no credential source; the provider is always unavailable.
    pub fn disabled() -> Self {
        Self {
            credential_json: None,
            key_path: None,
            api_base_url: crate::config::DEFAULT_GEE_API_BASE_URL.to_string(),
            project_id: None,
            query_timeout: Duration::from_secs(10),
        }
    }
}

/// Resolves the credential: inline JSON first, then the key file.
pub async fn resolve_credentials(settings: &ProviderSettings) -> Result<ServiceAccount, AppError> {
    if let Some(ref raw) = settings.credential_json {
        match ServiceAccount::from_json(raw) {
            Ok(account) => {
                tracing::info!("GEE: using service-account credential from environment");
                return Ok(account);
            }
            Err(e) => {
                tracing::error!("GEE: inline credential rejected, trying key file: {}", e);
            }
        }
    }

    let path = settings.key_path.as_ref().ok_or_else(|| {
        AppError::ProviderUnavailable("no Earth Engine credential configured".to_string())
    })?;

    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::ProviderUnavailable(format!(
                "{} not found",
                path.display()
            )))
        }
        Err(e) => {
            return Err(AppError::ProviderUnavailable(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let account = ServiceAccount::from_json(&raw)
        .context(format!("key file {}", path.display()))?;
    tracing::info!("GEE: using service-account key file {}", path.display());
    Ok(account)
}

// ============ Session ============

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

async fn request_access_token(
    client: &reqwest::Client,
    account: &ServiceAccount,
) -> Result<AccessToken, AppError> {
    let now = Utc::now();
    let assertion = account.signed_assertion(now)?;

    let response = client
        .post(&account.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| AppError::ProviderUnavailable(format!("token request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AppError::ProviderUnavailable(format!(
            "token endpoint returned {}: {}",
            status, error_text
        )));
    }

    let token: TokenResponse = response.json().await.map_err(|e| {
        AppError::ProviderUnavailable(format!("failed to parse token response: {}", e))
    })?;

    let lifetime = token.expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS);
    Ok(AccessToken {
        value: token.access_token,
        expires_at: now + ChronoDuration::seconds(lifetime),
    })
}

/// An authenticated Earth Engine session. Shared by every request.
#[derive(Debug)]
pub struct EarthEngineSession {
    account: ServiceAccount,
    project_id: String,
    token: RwLock<AccessToken>,
}

impl EarthEngineSession {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns a valid bearer token, refreshing it if it is about to expire.
    ///
    /// A failed refresh fails only the current call; the old token stays in
    /// place and the next call tries again.
    async fn bearer_token(&self, client: &reqwest::Client) -> Result<String, AppError> {
        {
            let token = self.token.read().await;
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let mut token = self.token.write().await;
        // Another request may have refreshed while we waited for the lock
        if token.is_fresh(Utc::now()) {
            return Ok(token.value.clone());
        }

        tracing::info!("GEE: refreshing access token for {}", self.account.client_email);
        let refreshed = request_access_token(client, &self.account).await?;
        *token = refreshed;
        Ok(token.value.clone())
    }
}

// ============ Provider ============

/// Earth Engine client with lazily initialised, cached authentication.
pub struct RemoteSoilProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
    session: OnceCell<Option<Arc<EarthEngineSession>>>,
    breaker: ProviderCircuitBreaker,
}

impl RemoteSoilProvider {
    /// Creates a provider. No network I/O happens until the first fetch.
    pub fn new(settings: ProviderSettings) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(settings.query_timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create Earth Engine client: {}", e))
            })?;

        Ok(Self {
            settings,
            client,
            session: OnceCell::new(),
            breaker: create_provider_circuit_breaker(),
        })
    }

    /// A provider that never attempts authentication.
    pub fn disabled() -> Self {
        Self {
            settings: ProviderSettings::disabled(),
            client: reqwest::Client::new(),
            session: OnceCell::new_with(Some(None)),
            breaker: create_provider_circuit_breaker(),
        }
    }

    pub fn status(&self) -> ProviderStatus {
        match self.session.get() {
            None => ProviderStatus::Pending,
            Some(Some(_)) => ProviderStatus::Ready,
            Some(None) => ProviderStatus::Unavailable,
        }
    }

    /// Runs (or waits for) the one-time initialization. Returns whether a
    /// session is available.
    pub async fn warm_up(&self) -> bool {
        self.session().await.is_some()
    }

    async fn session(&self) -> Option<Arc<EarthEngineSession>> {
        self.session
            .get_or_init(|| async {
                let attempt = tokio::time::timeout(self.settings.query_timeout, self.initialize());
                match attempt.await {
                    Ok(Ok(session)) => {
                        tracing::info!(
                            "GEE: Successfully initialized (project {})",
                            session.project_id
                        );
                        Some(Arc::new(session))
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("GEE: {}. Using synthetic soil data.", e);
                        None
                    }
                    Err(_) => {
                        tracing::warn!("GEE: initialization timed out. Using synthetic soil data.");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn initialize(&self) -> Result<EarthEngineSession, AppError> {
        let account = resolve_credentials(&self.settings).await?;

        let project_id = self
            .settings
            .project_id
            .clone()
            .or_else(|| account.project_id.clone())
            .ok_or_else(|| {
                AppError::ProviderUnavailable(
                    "no project_id in credential and GEE_PROJECT_ID not set".to_string(),
                )
            })?;

        let token = request_access_token(&self.client, &account).await?;

        Ok(EarthEngineSession {
            account,
            project_id,
            token: RwLock::new(token),
        })
    }

    /// Asks Earth Engine for the mean pH, organic carbon and clay around a cell.
    ///
    /// Never fails: any problem is logged and reported as `Unavailable`.
    pub async fn fetch(&self, coord: &NormalizedCoordinate) -> ProviderOutcome {
        let Some(session) = self.session().await else {
            return ProviderOutcome::Unavailable;
        };

        if !self.breaker.is_call_permitted() {
            tracing::debug!("GEE: circuit open, skipping query for {}", coord);
            return ProviderOutcome::Unavailable;
        }

        let result = match tokio::time::timeout(
            self.settings.query_timeout,
            self.query(&session, coord),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::ProviderUnavailable(format!(
                "query timed out after {}s",
                self.settings.query_timeout.as_secs()
            ))),
        };

        match self.breaker.call(|| result) {
            Ok(reading) if reading.is_empty() => {
                tracing::warn!("GEE: no raster data at {}, falling back to synthetic", coord);
                ProviderOutcome::Unavailable
            }
            Ok(reading) => {
                tracing::debug!("GEE: reading at {}: {:?}", coord, reading);
                ProviderOutcome::Available(reading)
            }
            Err(failsafe::Error::Inner(e)) => {
                tracing::warn!("GEE: data fetch error at {}, falling back to synthetic: {}", coord, e);
                ProviderOutcome::Unavailable
            }
            Err(failsafe::Error::Rejected) => {
                tracing::debug!("GEE: circuit opened during query for {}", coord);
                ProviderOutcome::Unavailable
            }
        }
    }

    async fn query(
        &self,
        session: &EarthEngineSession,
        coord: &NormalizedCoordinate,
    ) -> Result<ProviderReading, AppError> {
        let token = session.bearer_token(&self.client).await?;
        let url = format!(
            "{}/v1/projects/{}/value:compute",
            self.settings.api_base_url, session.project_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "expression": reduce_region_expression(coord) }))
            .send()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("Earth Engine request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ProviderUnavailable(format!(
                "Earth Engine returned {}: {}",
                status, error_text
            )));
        }

        let payload: ComputeValueResponse = response.json().await.map_err(|e| {
            AppError::ProviderUnavailable(format!("Failed to parse Earth Engine response: {}", e))
        })?;

        Ok(payload
            .result
            .map(|bands| ProviderReading::from_bands(&bands))
            .unwrap_or_default())
    }
}

fn band_image(asset: &str) -> Value {
    json!({
        "functionInvocationValue": {
            "functionName": "Image.select",
            "arguments": {
                "input": {
                    "functionInvocationValue": {
                        "functionName": "Image.load",
                        "arguments": { "id": { "constantValue": asset } }
                    }
                },
                "bandSelectors": { "constantValue": ["b0"] }
            }
        }
    })
}

/// Expression graph for `ph.addBands(om).addBands(clay).reduceRegion(mean)`
/// at the cell centre, 250 m scale.
pub fn reduce_region_expression(coord: &NormalizedCoordinate) -> Value {
    json!({
        "result": "0",
        "values": {
            "0": {
                "functionInvocationValue": {
                    "functionName": "Image.reduceRegion",
                    "arguments": {
                        "image": { "valueReference": "1" },
                        "reducer": {
                            "functionInvocationValue": {
                                "functionName": "Reducer.mean",
                                "arguments": {}
                            }
                        },
                        "geometry": {
                            "functionInvocationValue": {
                                "functionName": "GeometryConstructors.Point",
                                "arguments": {
                                    "coordinates": { "constantValue": [coord.lng, coord.lat] }
                                }
                            }
                        },
                        "scale": { "constantValue": SAMPLE_SCALE_METERS },
                        "maxPixels": { "constantValue": 1e9 }
                    }
                }
            },
            "1": {
                "functionInvocationValue": {
                    "functionName": "Image.addBands",
                    "arguments": {
                        "dstImg": { "valueReference": "2" },
                        "srcImg": band_image(CLAY_ASSET)
                    }
                }
            },
            "2": {
                "functionInvocationValue": {
                    "functionName": "Image.addBands",
                    "arguments": {
                        "dstImg": band_image(PH_ASSET),
                        "srcImg": band_image(ORGANIC_CARBON_ASSET)
                    }
                }
            }
        }
    })
}
