use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_GEE_API_BASE_URL: &str = "https://earthengine.googleapis.com";
pub const DEFAULT_GEOCODER_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GEOCODER_USER_AGENT: &str = "CropDoctorAI/1.0 (contact@example.com)";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    /// Service-account JSON supplied inline (takes precedence over the key file).
    pub gee_private_key: Option<String>,
    pub gee_key_path: PathBuf,
    pub gee_api_base_url: String,
    pub gee_project_id: Option<String>,
    pub gee_query_timeout_secs: u64,
    pub geocoder_base_url: String,
    pub geocoder_user_agent: String,
    pub geocoder_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            gee_private_key: std::env::var("GOOGLE_PRIVATE_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            gee_key_path: std::env::var("GEE_KEY_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("private-key.json")),
            gee_api_base_url: http_url_var("GEE_API_BASE_URL", DEFAULT_GEE_API_BASE_URL)?,
            gee_project_id: std::env::var("GEE_PROJECT_ID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            gee_query_timeout_secs: timeout_var("GEE_QUERY_TIMEOUT_SECS", 10)?,
            geocoder_base_url: http_url_var("GEOCODER_BASE_URL", DEFAULT_GEOCODER_BASE_URL)?,
            geocoder_user_agent: std::env::var("GEOCODER_USER_AGENT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEOCODER_USER_AGENT.to_string()),
            geocoder_timeout_secs: timeout_var("GEOCODER_TIMEOUT_SECS", 5)?,
        };

        // Never log the credential itself
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("History storage enabled: {}", config.database_url.is_some());
        tracing::debug!(
            "Earth Engine credential: {}",
            if config.gee_private_key.is_some() {
                "inline (GOOGLE_PRIVATE_KEY)".to_string()
            } else {
                format!("file {}", config.gee_key_path.display())
            }
        );
        tracing::debug!("Earth Engine API: {}", config.gee_api_base_url);
        tracing::debug!("Geocoder: {}", config.geocoder_base_url);

        Ok(config)
    }
}

fn http_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let value = std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    validate_http_url(name, &value)?;
    Ok(value.trim_end_matches('/').to_string())
}

fn timeout_var(name: &str, default: u64) -> anyhow::Result<u64> {
    let secs = match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", name))?,
        _ => default,
    };
    if !(1..=120).contains(&secs) {
        anyhow::bail!("{} must be between 1 and 120 seconds", name);
    }
    Ok(secs)
}

fn validate_http_url(name: &str, value: &str) -> anyhow::Result<()> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    url::Url::parse(value).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    Ok(())
}
