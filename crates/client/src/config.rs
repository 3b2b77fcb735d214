use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without the `/api/v1` suffix (default: `http://localhost:3000`).
    pub base_url: String,
    /// Staleness horizon for cached reads (default: 5 minutes).
    pub cache_ttl: Duration,
}

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `MEMCARD_API_URL`        | `http://localhost:3000` |
    /// | `MEMCARD_CACHE_TTL_SECS` | `300`                   |
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let base_url = std::env::var("MEMCARD_API_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let cache_ttl = std::env::var("MEMCARD_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_ttl,
        }
    }
}
