/// Catalog credentials and endpoints.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub client_id: String,
    pub client_secret: String,
    /// IGDB API root (default: `https://api.igdb.com/v4`).
    pub api_url: String,
    /// OAuth token endpoint (default: `https://id.twitch.tv/oauth2/token`).
    pub token_url: String,
}

const DEFAULT_API_URL: &str = "https://api.igdb.com/v4";
const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

impl CatalogConfig {
    /// Load catalog configuration from environment variables.
    ///
    /// | Env Var              | Required | Default                              |
    /// |----------------------|----------|--------------------------------------|
    /// | `IGDB_CLIENT_ID`     | yes      | --                                   |
    /// | `IGDB_CLIENT_SECRET` | yes      | --                                   |
    /// | `IGDB_API_URL`       | no       | `https://api.igdb.com/v4`            |
    /// | `IGDB_TOKEN_URL`     | no       | `https://id.twitch.tv/oauth2/token`  |
    ///
    /// Returns `None` when credentials are absent; the catalog endpoints are
    /// then disabled.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("IGDB_CLIENT_ID").ok().filter(|s| !s.is_empty())?;
        let client_secret = std::env::var("IGDB_CLIENT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())?;

        Some(Self {
            client_id,
            client_secret,
            api_url: std::env::var("IGDB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into()),
            token_url: std::env::var("IGDB_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.into()),
        })
    }
}
