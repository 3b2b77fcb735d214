//! Drives the SDK against the real router served over a local socket.

use std::sync::Arc;

use assert_matches::assert_matches;
use memcard_api::auth::jwt::{generate_access_token, JwtConfig};
use memcard_api::auth::session::JwtSessionResolver;
use memcard_api::config::ServerConfig;
use memcard_api::router::build_app_router;
use memcard_api::state::AppState;
use memcard_client::{
    ApiClient, ClientConfig, ClientError, QueryCache, SeedSource, SessionSynchronizer, Stores,
};
use memcard_core::dto::AddGameRequest;
use memcard_core::money::Money;
use memcard_core::session::SessionIdentity;
use memcard_core::types::UserId;
use memcard_db::MemoryBackend;

const SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        request_timeout_secs: 30,
        auth_cookie_name: "sb-access-token".to_string(),
        jwt: JwtConfig {
            secret: SECRET.to_string(),
            audience: Some("authenticated".to_string()),
            access_token_expiry_mins: 15,
        },
    }
}

/// Serve the API over `backend` and return its base URL.
async fn spawn_server(backend: Arc<MemoryBackend>) -> String {
    let config = server_config();
    let state = AppState {
        sessions: Arc::new(JwtSessionResolver::new(config.jwt.clone())),
        config: Arc::new(config.clone()),
        backend,
        catalog: None,
    };
    let app = build_app_router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn identity_for(user: UserId) -> SessionIdentity {
    let token = generate_access_token(user, &server_config().jwt).unwrap();
    SessionIdentity::new(user, token, chrono::Utc::now() + chrono::Duration::minutes(15))
}

async fn signed_in_client(backend: Arc<MemoryBackend>, user: UserId) -> ApiClient {
    let config = ClientConfig {
        base_url: spawn_server(backend).await,
        ..ClientConfig::default()
    };
    let client = ApiClient::new(&config, Arc::new(QueryCache::new()));
    client.set_session(Some(&identity_for(user)));
    client
}

fn priced_game(igdb_game_id: i64, price: f64) -> AddGameRequest {
    AddGameRequest {
        igdb_game_id: Some(igdb_game_id),
        purchase_price: Some(price),
        ..AddGameRequest::default()
    }
}

#[tokio::test]
async fn cached_reads_hit_the_server_once_until_a_mutation() {
    let backend = Arc::new(MemoryBackend::new());
    let client = signed_in_client(Arc::clone(&backend), UserId::new_v4()).await;

    client.add_game(&priced_game(1026, 19.99)).await.unwrap();
    let before = backend.rpc_calls();

    let first = client.price_records().await.unwrap().unwrap();
    let second = client.price_records().await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(backend.rpc_calls(), before + 1);

    client.add_game(&priced_game(7346, 5.01)).await.unwrap();
    let after_add = backend.rpc_calls();

    let records = client.price_records().await.unwrap().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(backend.rpc_calls(), after_add + 1);

    let total = Money::checked_sum(records.iter().map(|r| r.price())).unwrap();
    assert_eq!(total, Money::from_cents(2500));
}

#[tokio::test]
async fn api_errors_carry_status_and_code() {
    let user = UserId::new_v4();
    let client = signed_in_client(Arc::new(MemoryBackend::new()), user).await;

    let err = client.request_friend(user).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_matches!(err, ClientError::Api { code: Some(ref code), .. } if code == "VALIDATION_ERROR");

    let err = client.validate_wishlist(424242).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!err.is_server_error());
}

#[tokio::test]
async fn invalid_session_is_rejected_and_not_cached() {
    let backend = Arc::new(MemoryBackend::new());
    let client = signed_in_client(Arc::clone(&backend), UserId::new_v4()).await;
    client.set_session(Some(&SessionIdentity::new(
        UserId::new_v4(),
        "not-a-jwt",
        chrono::Utc::now(),
    )));

    let err = client.profile().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(client.cache().is_empty());
    assert_eq!(backend.rpc_calls(), 0);
}

#[tokio::test]
async fn synchronizer_seeds_from_the_server() {
    let backend = Arc::new(MemoryBackend::new());
    let user = UserId::new_v4();
    backend.insert_game(user, 1, Some(40.0));
    backend.insert_game(user, 2, Some(2.5));
    backend.insert_game(user, 3, None);

    let client = Arc::new(signed_in_client(Arc::clone(&backend), user).await);
    let stores = Arc::new(Stores::default());
    let sync = SessionSynchronizer::new(
        Arc::clone(&stores),
        Arc::clone(client.cache()),
        Arc::clone(&client) as Arc<dyn SeedSource>,
    );

    sync.apply(Some(identity_for(user))).await.unwrap();

    assert_eq!(stores.collection_total().total(), Money::from_cents(4250));
    assert_eq!(stores.profile().profile().map(|p| p.id), Some(user));

    // The seed populated the cache; an ordinary read does not refetch.
    let calls = backend.rpc_calls();
    client.price_records().await.unwrap();
    assert_eq!(backend.rpc_calls(), calls);

    sync.apply(None).await.unwrap();
    assert_eq!(stores.collection_total().total(), Money::ZERO);
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn switching_users_moves_the_client_credential_too() {
    let backend = Arc::new(MemoryBackend::new());
    let (alice, bob) = (UserId::new_v4(), UserId::new_v4());
    backend.insert_game(alice, 111, Some(60.0));
    backend.insert_game(bob, 222, Some(7.5));

    let client = Arc::new(signed_in_client(Arc::clone(&backend), alice).await);
    let stores = Arc::new(Stores::default());
    let sync = SessionSynchronizer::new(
        Arc::clone(&stores),
        Arc::clone(client.cache()),
        Arc::clone(&client) as Arc<dyn SeedSource>,
    );
    sync.apply(Some(identity_for(alice))).await.unwrap();
    let games = client.collection().await.unwrap().unwrap();
    assert_eq!(games.iter().map(|g| g.user_id).collect::<Vec<_>>(), vec![alice]);

    sync.apply(Some(identity_for(bob))).await.unwrap();

    // Ordinary reads after the switch act as bob and cache under bob.
    assert_eq!(client.cache().current_user(), Some(bob));
    let games = client.collection().await.unwrap().unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!((games[0].user_id, games[0].igdb_game_id), (bob, 222));
    assert_eq!(client.profile().await.unwrap().unwrap().id, bob);
    assert_eq!(stores.collection_total().total(), Money::from_cents(750));

    // Signing out disables reads instead of sending a stale token.
    sync.apply(None).await.unwrap();
    let calls = backend.rpc_calls();
    assert_eq!(client.collection().await.unwrap(), None);
    assert_eq!(backend.rpc_calls(), calls);
}

#[tokio::test]
async fn deleting_the_account_resets_client_state() {
    let backend = Arc::new(MemoryBackend::new());
    let user = UserId::new_v4();
    backend.insert_game(user, 1, Some(30.0));

    let stores = Arc::new(Stores::default());
    let client = Arc::new(
        signed_in_client(Arc::clone(&backend), user)
            .await
            .with_stores(Arc::clone(&stores)),
    );
    let sync = SessionSynchronizer::new(
        Arc::clone(&stores),
        Arc::clone(client.cache()),
        Arc::clone(&client) as Arc<dyn SeedSource>,
    );
    sync.apply(Some(identity_for(user))).await.unwrap();
    assert_eq!(stores.collection_total().total(), Money::from_cents(3000));
    assert!(stores.profile().profile().is_some());

    let deleted = client.delete_account().await.unwrap();
    assert!(deleted.success);

    assert_eq!(stores.collection_total().total(), Money::ZERO);
    assert_eq!(stores.collection_total().owner(), None);
    assert!(stores.profile().profile().is_none());
    assert!(stores.auth().identity().is_none());
    assert!(client.cache().is_empty());
    assert_eq!(client.cache().current_user(), None);
    assert!(!stores.hydrate(user).unwrap(), "persisted copy cleared");
}
