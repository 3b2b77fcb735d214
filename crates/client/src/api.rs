//! Typed HTTP client for the MemCard API.
//!
//! Reads go through the shared [`QueryCache`] so repeated reads within the
//! staleness horizon cost nothing and concurrent reads share one request.
//! Every mutation invalidates the cached keys whose data it changes, so
//! the next read refetches.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use memcard_catalog::Game;
use memcard_core::dto::{
    AchievementNotificationRequest, AddGameRequest, FriendNotificationRequest, QuizSubmission,
    UpdateProfileRequest,
};
use memcard_core::rank::PlayerRank;
use memcard_core::session::SessionIdentity;
use memcard_core::types::{DbId, UserId};
use memcard_db::models::collection::{self, PriceRecord, RemovedGame, UserGame};
use memcard_db::models::friendship::{DeletedAccount, Friendship, RemovedFriend};
use memcard_db::models::notification::{CreatedNotification, Notification, WishlistValidation};
use memcard_db::models::profile::Profile;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::cache::{QueryCache, QueryKey, QueryOptions};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::store::Stores;
use crate::sync::SeedSource;

const PROFILE: &str = "profile";
const COLLECTION: &str = "collection";
const COLLECTION_TOTAL: &str = "collection_total";
const COLLECTION_PRICES: &str = "collection_prices";
const FRIENDS: &str = "friends";
const NOTIFICATIONS: &str = "notifications";
const GAME_SEARCH: &str = "game_search";
const GAME: &str = "game";

/// Success envelope returned by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Failure body. Both fields are optional; some failures have no JSON body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    code: Option<String>,
}

/// Result of `POST /quiz`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuizResult {
    pub rank: PlayerRank,
    pub profile: Profile,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<QueryCache>,
    token: RwLock<Option<String>>,
    options: QueryOptions,
    stores: Option<Arc<Stores>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, cache: Arc<QueryCache>) -> Self {
        Self::with_client(reqwest::Client::new(), config, cache)
    }

    /// Build a client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, config: &ClientConfig, cache: Arc<QueryCache>) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
            token: RwLock::new(None),
            options: QueryOptions {
                ttl: config.cache_ttl,
            },
            stores: None,
        }
    }

    /// Attach the client-state slices so account-level mutations can
    /// reset them.
    pub fn with_stores(mut self, stores: Arc<Stores>) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Use `identity`'s bearer token for subsequent requests and scope the
    /// cache to its user. `None` signs the client out.
    pub fn set_session(&self, identity: Option<&SessionIdentity>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) =
            identity.map(|i| i.access_token.clone());
        self.cache.set_user(identity.map(|i| i.user_id));
    }

    // ---- reads ----

    pub async fn profile(&self) -> Result<Option<Profile>, ClientError> {
        self.fetch(QueryKey::new(PROFILE), self.request(Method::GET, "/profile"))
            .await
    }

    pub async fn collection(&self) -> Result<Option<Vec<UserGame>>, ClientError> {
        self.fetch(QueryKey::new(COLLECTION), self.request(Method::GET, "/collection"))
            .await
    }

    /// Server-side aggregate of the collection's purchase prices.
    pub async fn collection_total(&self) -> Result<Option<collection::CollectionTotal>, ClientError> {
        self.fetch(
            QueryKey::new(COLLECTION_TOTAL),
            self.request(Method::GET, "/collection/total"),
        )
        .await
    }

    pub async fn price_records(&self) -> Result<Option<Vec<PriceRecord>>, ClientError> {
        self.fetch(
            QueryKey::new(COLLECTION_PRICES),
            self.request(Method::GET, "/collection/prices"),
        )
        .await
    }

    pub async fn friends(&self) -> Result<Option<Vec<Friendship>>, ClientError> {
        self.fetch(QueryKey::new(FRIENDS), self.request(Method::GET, "/friends"))
            .await
    }

    pub async fn notifications(
        &self,
        unread_only: bool,
    ) -> Result<Option<Vec<Notification>>, ClientError> {
        let request = self
            .request(Method::GET, "/notifications")
            .query(&[("unread_only", unread_only)]);
        self.fetch(QueryKey::new(NOTIFICATIONS).param(Some(unread_only)), request)
            .await
    }

    /// Catalog search. Disabled (returns `Ok(None)`) until a query is given.
    pub async fn search_games(
        &self,
        query: Option<&str>,
        limit: u32,
    ) -> Result<Option<Vec<Game>>, ClientError> {
        let key = QueryKey::new(GAME_SEARCH).param(query).param(Some(limit));
        let request = self
            .request(Method::GET, "/games/search")
            .query(&[("q", query.unwrap_or_default())])
            .query(&[("limit", limit)]);
        self.fetch(key, request).await
    }

    /// Catalog lookup. Disabled until an id is given.
    pub async fn game(&self, id: Option<i64>) -> Result<Option<Game>, ClientError> {
        let path = format!("/games/{}", id.unwrap_or_default());
        self.fetch(QueryKey::new(GAME).param(id), self.request(Method::GET, &path))
            .await
    }

    // ---- mutations ----

    pub async fn update_profile(&self, input: &UpdateProfileRequest) -> Result<Profile, ClientError> {
        let profile = Self::send(self.request(Method::PUT, "/profile").json(input)).await?;
        self.cache.invalidate(&QueryKey::new(PROFILE));
        Ok(profile)
    }

    pub async fn add_game(&self, input: &AddGameRequest) -> Result<UserGame, ClientError> {
        let game = Self::send(self.request(Method::POST, "/collection").json(input)).await?;
        self.invalidate_collection();
        Ok(game)
    }

    pub async fn remove_game(&self, id: DbId) -> Result<RemovedGame, ClientError> {
        let removed =
            Self::send(self.request(Method::DELETE, &format!("/collection/{id}"))).await?;
        self.invalidate_collection();
        Ok(removed)
    }

    pub async fn request_friend(&self, friend_id: UserId) -> Result<Friendship, ClientError> {
        let path = format!("/friends/{friend_id}/request");
        let friendship = Self::send(self.request(Method::POST, &path)).await?;
        self.cache.invalidate(&QueryKey::new(FRIENDS));
        Ok(friendship)
    }

    pub async fn accept_friend(&self, friend_id: UserId) -> Result<Friendship, ClientError> {
        let path = format!("/friends/{friend_id}/accept");
        let friendship = Self::send(self.request(Method::POST, &path)).await?;
        self.cache.invalidate(&QueryKey::new(FRIENDS));
        Ok(friendship)
    }

    pub async fn remove_friend(&self, friend_id: UserId) -> Result<RemovedFriend, ClientError> {
        let path = format!("/friends/{friend_id}");
        let removed = Self::send(self.request(Method::DELETE, &path)).await?;
        self.cache.invalidate(&QueryKey::new(FRIENDS));
        Ok(removed)
    }

    pub async fn validate_wishlist(&self, id: DbId) -> Result<WishlistValidation, ClientError> {
        let path = format!("/notifications/{id}/validate");
        let result = Self::send(self.request(Method::POST, &path)).await?;
        self.cache.invalidate_prefix(NOTIFICATIONS);
        Ok(result)
    }

    pub async fn create_achievement_notification(
        &self,
        input: &AchievementNotificationRequest,
    ) -> Result<CreatedNotification, ClientError> {
        let request = self
            .request(Method::POST, "/notifications/achievement")
            .json(input);
        let created = Self::send(request).await?;
        self.cache.invalidate_prefix(NOTIFICATIONS);
        Ok(created)
    }

    pub async fn create_friend_notification(
        &self,
        input: &FriendNotificationRequest,
    ) -> Result<CreatedNotification, ClientError> {
        let request = self.request(Method::POST, "/notifications/friend").json(input);
        let created = Self::send(request).await?;
        self.cache.invalidate_prefix(NOTIFICATIONS);
        Ok(created)
    }

    pub async fn submit_quiz(&self, submission: &QuizSubmission) -> Result<QuizResult, ClientError> {
        let result = Self::send(self.request(Method::POST, "/quiz").json(submission)).await?;
        self.cache.invalidate(&QueryKey::new(PROFILE));
        Ok(result)
    }

    /// Delete the signed-in account and sign the client out.
    ///
    /// Every cached entry is dropped and, when stores are attached, every
    /// slice and its persisted copy is reset.
    pub async fn delete_account(&self) -> Result<DeletedAccount, ClientError> {
        let deleted: DeletedAccount = Self::send(self.request(Method::DELETE, "/account")).await?;
        tracing::info!(deleted_rows = deleted.deleted_rows, "Account deleted, clearing client state");
        self.set_session(None);
        self.cache.clear();
        if let Some(stores) = &self.stores {
            stores.reset_all(None);
            stores.clear_persisted()?;
        }
        Ok(deleted)
    }

    // ---- private helpers ----

    fn invalidate_collection(&self) {
        for entity in [COLLECTION, COLLECTION_TOTAL, COLLECTION_PRICES] {
            self.cache.invalidate(&QueryKey::new(entity));
        }
    }

    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_as(method, path, self.token().as_deref())
    }

    fn request_as(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}/api/v1{path}", self.base_url));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Read through the cache. The request is only sent on a miss.
    async fn fetch<T>(&self, key: QueryKey, request: RequestBuilder) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.cache
            .get(&key, self.options, move || Self::send::<T>(request))
            .await
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let envelope: Envelope<T> = Self::parse_response(response).await?;
        Ok(envelope.data)
    }

    /// Return the response unchanged on success, or a
    /// [`ClientError::Api`] carrying whatever the error body offered.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = api_error(status.as_u16(), &body);
            tracing::debug!(status = status.as_u16(), error = %error, "API request failed");
            return Err(error);
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn api_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ClientError::Api {
            status,
            code: parsed.code,
            message: parsed.error,
        },
        Err(_) => ClientError::Api {
            status,
            code: None,
            message: None,
        },
    }
}

/// Seeding reads go through the cache with the identity's own token, so a
/// seed and an ordinary read of the same key share one request.
#[async_trait]
impl SeedSource for ApiClient {
    fn set_session(&self, identity: Option<&SessionIdentity>) {
        ApiClient::set_session(self, identity);
    }

    async fn price_records(&self, identity: &SessionIdentity) -> Result<Vec<PriceRecord>, ClientError> {
        let request = self.request_as(
            Method::GET,
            "/collection/prices",
            Some(&identity.access_token),
        );
        self.fetch(QueryKey::new(COLLECTION_PRICES), request)
            .await?
            .ok_or(ClientError::NotSignedIn)
    }

    async fn profile(&self, identity: &SessionIdentity) -> Result<Profile, ClientError> {
        let request = self.request_as(Method::GET, "/profile", Some(&identity.access_token));
        self.fetch(QueryKey::new(PROFILE), request)
            .await?
            .ok_or(ClientError::NotSignedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn offline_client() -> ApiClient {
        let config = ClientConfig {
            // Nothing listens here; any request that is actually sent fails.
            base_url: "http://127.0.0.1:9".to_string(),
            ..ClientConfig::default()
        };
        ApiClient::new(&config, Arc::new(QueryCache::new()))
    }

    #[test]
    fn error_body_fields_are_optional() {
        assert_matches!(
            api_error(409, r#"{"error":"Friendship already exists","code":"CONFLICT"}"#),
            ClientError::Api { status: 409, code: Some(code), message: Some(message) }
                if code == "CONFLICT" && message == "Friendship already exists"
        );
        assert_matches!(
            api_error(502, "<html>Bad Gateway</html>"),
            ClientError::Api { status: 502, code: None, message: None }
        );
        assert_matches!(
            api_error(500, r#"{"error":"An internal error occurred"}"#),
            ClientError::Api { code: None, message: Some(_), .. }
        );
        assert!(api_error(503, "").is_server_error());
    }

    #[tokio::test]
    async fn disabled_catalog_queries_send_nothing() {
        let client = offline_client();
        client.set_session(Some(&SessionIdentity::new(
            UserId::new_v4(),
            "token",
            chrono::Utc::now(),
        )));

        assert_eq!(client.search_games(None, 10).await.unwrap(), None);
        assert_eq!(client.game(None).await.unwrap(), None);
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn reads_without_a_session_are_disabled() {
        let client = offline_client();
        assert_eq!(client.profile().await.unwrap(), None);
        assert_eq!(client.friends().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sign_out_drops_token_and_cache_owner() {
        let client = offline_client();
        let user = UserId::new_v4();
        client.set_session(Some(&SessionIdentity::new(user, "token", chrono::Utc::now())));
        assert_eq!(client.token().as_deref(), Some("token"));
        assert_eq!(client.cache().current_user(), Some(user));

        client.set_session(None);
        assert_eq!(client.token(), None);
        assert_eq!(client.cache().current_user(), None);
    }
}
