//! IGDB v4 client.
//!
//! Requests are Apicalypse query bodies POSTed to an endpoint, authorised
//! with the `Client-ID` header plus a bearer token from [`TokenCache`].
//! Responses are decoded into the typed schemas below before leaving this
//! module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::token::{TokenCache, TokenRefresher, TwitchRefresher};
use crate::GameCatalog;

const GAME_FIELDS: &str =
    "name,summary,first_release_date,cover.image_id,platforms.name,platforms.abbreviation";

const COVER_URL_PREFIX: &str = "https://images.igdb.com/igdb/image/upload/t_cover_big";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cover {
    pub image_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: i64,
    pub name: String,
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub name: String,
    pub summary: Option<String>,
    /// Unix timestamp (seconds).
    pub first_release_date: Option<i64>,
    pub cover: Option<Cover>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

impl Game {
    pub fn cover_url(&self) -> Option<String> {
        self.cover
            .as_ref()
            .map(|c| format!("{COVER_URL_PREFIX}/{}.jpg", c.image_id))
    }
}

/// HTTP client for the IGDB API.
pub struct IgdbClient<R = TwitchRefresher> {
    http: reqwest::Client,
    api_url: String,
    client_id: String,
    tokens: TokenCache<R>,
}

impl IgdbClient<TwitchRefresher> {
    pub fn from_config(config: &CatalogConfig) -> Self {
        let http = reqwest::Client::new();
        let refresher = TwitchRefresher::new(http.clone(), config);
        Self::with_refresher(http, config, refresher)
    }
}

impl<R: TokenRefresher> IgdbClient<R> {
    pub fn with_refresher(http: reqwest::Client, config: &CatalogConfig, refresher: R) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            tokens: TokenCache::new(refresher),
        }
    }

    /// POST an Apicalypse body to `endpoint`.
    ///
    /// A 401 means the cached token was revoked early; the token is dropped
    /// and the request retried once.
    async fn query(&self, endpoint: &str, body: String) -> Result<Vec<Game>, CatalogError> {
        let mut retried = false;
        loop {
            let token = self.tokens.get().await?;
            let response = self
                .http
                .post(format!("{}/{endpoint}", self.api_url))
                .header("Client-ID", &self.client_id)
                .bearer_auth(token)
                .body(body.clone())
                .send()
                .await?;

            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED && !retried {
                tracing::warn!(endpoint, "Catalog rejected access token, refreshing");
                self.tokens.invalidate().await;
                retried = true;
                continue;
            }
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                return Err(CatalogError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
    }
}

#[async_trait]
impl<R: TokenRefresher + 'static> GameCatalog for IgdbClient<R> {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Game>, CatalogError> {
        self.query("games", search_body(query, limit)).await
    }

    async fn game(&self, id: i64) -> Result<Option<Game>, CatalogError> {
        let games = self.query("games", lookup_body(id)).await?;
        Ok(games.into_iter().next())
    }
}

/// Build the Apicalypse body for a text search.
pub fn search_body(query: &str, limit: u32) -> String {
    format!(
        "search \"{}\"; fields {GAME_FIELDS}; limit {};",
        escape(query),
        limit.clamp(1, 500)
    )
}

pub fn lookup_body(id: i64) -> String {
    format!("fields {GAME_FIELDS}; where id = {id};")
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
