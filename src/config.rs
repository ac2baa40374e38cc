//! Environment-derived configuration.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub cache_dir: PathBuf,
    pub countries_url: String,
    pub rates_url: String,
    pub http_timeout: Duration,
}

impl Config {
    /// Read configuration from the environment, falling back to defaults
    /// suitable for local development.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://countries.db".to_string());

        let cache_dir = std::env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cache"));

        let countries_url = std::env::var("COUNTRIES_API_URL")
            .unwrap_or_else(|_| DEFAULT_COUNTRIES_URL.to_string());

        let rates_url =
            std::env::var("RATES_API_URL").unwrap_or_else(|_| DEFAULT_RATES_URL.to_string());

        let http_timeout = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        Self {
            port,
            database_url,
            cache_dir,
            countries_url,
            rates_url,
            http_timeout,
        }
    }

    /// Path of the rendered summary image inside the cache directory.
    pub fn summary_path(&self) -> PathBuf {
        self.cache_dir.join("summary.png")
    }
}
