//! Keeps client state consistent with the current session identity.
//!
//! The synchronizer owns the transition between identities. Logging out
//! empties every slice, the persisted copies and the query cache before
//! returning. Logging in as someone new resets first and only then
//! re-seeds from the server, so no slice ever shows the previous user's
//! values under the new identity.
//!
//! The [`SeedSource`] is told about every identity change in the same step
//! as the stores and the cache, so the credentials it uses for later
//! requests always match [`AuthSlice`](crate::store::AuthSlice).

use std::sync::Arc;

use async_trait::async_trait;
use memcard_core::session::SessionIdentity;
use memcard_db::models::collection::PriceRecord;
use memcard_db::models::profile::Profile;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::cache::QueryCache;
use crate::error::ClientError;
use crate::store::Stores;

/// Where a fresh session's state is loaded from.
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Adopt `identity` for subsequent requests; `None` signs out.
    fn set_session(&self, identity: Option<&SessionIdentity>);

    async fn price_records(&self, identity: &SessionIdentity) -> Result<Vec<PriceRecord>, ClientError>;

    async fn profile(&self, identity: &SessionIdentity) -> Result<Profile, ClientError>;
}

pub struct SessionSynchronizer {
    stores: Arc<Stores>,
    cache: Arc<QueryCache>,
    source: Arc<dyn SeedSource>,
}

impl SessionSynchronizer {
    pub fn new(stores: Arc<Stores>, cache: Arc<QueryCache>, source: Arc<dyn SeedSource>) -> Self {
        Self {
            stores,
            cache,
            source,
        }
    }

    /// React to a session change.
    ///
    /// Re-applying the current user only refreshes the stored identity
    /// (token rotation). A seed that loses a race with a later identity
    /// change is dropped.
    pub async fn apply(&self, identity: Option<SessionIdentity>) -> Result<(), ClientError> {
        let Some(identity) = identity else {
            self.sign_out()?;
            return Ok(());
        };

        let user_id = identity.user_id;
        if self.stores.auth().user_id() == Some(user_id) {
            self.refresh(identity);
            return Ok(());
        }

        tracing::info!(%user_id, "Session identity changed, resetting client state");
        self.stores.reset_all(Some(user_id));
        self.cache.set_user(Some(user_id));
        self.source.set_session(Some(&identity));
        self.stores.update_auth(|auth| auth.set_identity(identity.clone()));
        if let Err(e) = self.stores.hydrate(user_id) {
            tracing::warn!(%user_id, error = %e, "Failed to hydrate persisted state");
        }

        let records = self.source.price_records(&identity).await?;
        if !self.is_current(&identity) {
            tracing::debug!(%user_id, "Dropping stale price seed");
            return Ok(());
        }
        self.stores
            .update_collection_total(|total| total.calculate_from_records(&records))??;

        let profile = self.source.profile(&identity).await?;
        if !self.is_current(&identity) {
            tracing::debug!(%user_id, "Dropping stale profile seed");
            return Ok(());
        }
        self.stores.update_profile(|slice| slice.set_profile(profile))?;

        tracing::debug!(%user_id, items = records.len(), "Client state seeded");
        Ok(())
    }

    /// Follow `sessions` until `cancel` fires.
    ///
    /// Applies the value present at start, then every change. A change to
    /// a different identity (or a sign-out) abandons any seed still in
    /// flight; a token rotation for the same user is applied without
    /// interrupting it. Seeding failures are logged and the loop keeps
    /// running.
    pub async fn run(
        &self,
        mut sessions: watch::Receiver<Option<SessionIdentity>>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Session synchronizer started");

        let mut next = Some(sessions.borrow_and_update().clone());
        'run: loop {
            let identity = match next.take() {
                Some(identity) => identity,
                None => tokio::select! {
                    _ = cancel.cancelled() => break 'run,
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            tracing::info!("Session source closed");
                            break 'run;
                        }
                        sessions.borrow_and_update().clone()
                    }
                },
            };

            let in_flight = identity.as_ref().map(|i| i.user_id);
            let apply = self.apply(identity);
            tokio::pin!(apply);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'run,
                    result = &mut apply => {
                        if let Err(e) = result {
                            tracing::error!(error = %e, "Failed to apply session change");
                        }
                        break;
                    }
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            tracing::info!("Session source closed");
                            break 'run;
                        }
                        match sessions.borrow_and_update().clone() {
                            Some(identity) if in_flight == Some(identity.user_id) => {
                                self.refresh(identity);
                            }
                            other => {
                                tracing::debug!("Session changed mid-seed, abandoning it");
                                next = Some(other);
                                break;
                            }
                        }
                    }
                }
            }
        }

        tracing::info!("Session synchronizer stopping");
    }

    /// Same user, new credentials.
    fn refresh(&self, identity: SessionIdentity) {
        self.source.set_session(Some(&identity));
        self.stores.update_auth(|auth| auth.set_identity(identity));
    }

    fn sign_out(&self) -> Result<(), ClientError> {
        tracing::info!("Signed out, clearing client state");
        self.source.set_session(None);
        self.cache.set_user(None);
        self.cache.clear();
        self.stores.reset_all(None);
        self.stores.clear_persisted()
    }

    fn is_current(&self, identity: &SessionIdentity) -> bool {
        self.stores.auth().user_id() == Some(identity.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use memcard_core::money::Money;
    use memcard_core::types::UserId;
    use tokio::sync::{mpsc, Notify};

    use crate::store::{CollectionTotal, ProfileSlice};

    /// Serves fixed per-user data. Users listed in `gated` block inside
    /// `price_records` until the gate is opened, announcing on `started`.
    struct FixtureSource {
        prices: HashMap<UserId, Vec<PriceRecord>>,
        gated: Vec<UserId>,
        gate: Arc<Notify>,
        started: mpsc::UnboundedSender<UserId>,
        calls: Mutex<Vec<UserId>>,
        session: Mutex<Option<SessionIdentity>>,
    }

    impl FixtureSource {
        fn session_token(&self) -> Option<String> {
            self.session
                .lock()
                .unwrap()
                .as_ref()
                .map(|s| s.access_token.clone())
        }
    }

    #[async_trait]
    impl SeedSource for FixtureSource {
        fn set_session(&self, identity: Option<&SessionIdentity>) {
            *self.session.lock().unwrap() = identity.cloned();
        }

        async fn price_records(
            &self,
            identity: &SessionIdentity,
        ) -> Result<Vec<PriceRecord>, ClientError> {
            self.calls.lock().unwrap().push(identity.user_id);
            if self.gated.contains(&identity.user_id) {
                let _ = self.started.send(identity.user_id);
                self.gate.notified().await;
            }
            Ok(self.prices.get(&identity.user_id).cloned().unwrap_or_default())
        }

        async fn profile(&self, identity: &SessionIdentity) -> Result<Profile, ClientError> {
            Ok(Profile {
                id: identity.user_id,
                username: Some(format!("user-{}", identity.user_id)),
                avatar_url: None,
                player_rank: None,
                created_at: chrono::Utc::now(),
            })
        }
    }

    struct Harness {
        stores: Arc<Stores>,
        cache: Arc<QueryCache>,
        sync: Arc<SessionSynchronizer>,
        gate: Arc<Notify>,
        started: mpsc::UnboundedReceiver<UserId>,
        source: Arc<FixtureSource>,
    }

    fn harness(prices: HashMap<UserId, Vec<PriceRecord>>, gated: Vec<UserId>) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FixtureSource {
            prices,
            gated,
            gate: Arc::clone(&gate),
            started: tx,
            calls: Mutex::new(Vec::new()),
            session: Mutex::new(None),
        });
        let stores = Arc::new(Stores::default());
        let cache = Arc::new(QueryCache::new());
        let sync = Arc::new(SessionSynchronizer::new(
            Arc::clone(&stores),
            Arc::clone(&cache),
            Arc::clone(&source) as Arc<dyn SeedSource>,
        ));
        Harness {
            stores,
            cache,
            sync,
            gate,
            started: rx,
            source,
        }
    }

    fn identity(user: UserId) -> SessionIdentity {
        SessionIdentity::new(user, format!("token-{user}"), chrono::Utc::now())
    }

    fn priced(id: i64, price: f64) -> PriceRecord {
        PriceRecord {
            id,
            purchase_price: Some(price),
        }
    }

    #[tokio::test]
    async fn login_seeds_total_and_profile() {
        let alice = UserId::new_v4();
        let h = harness(
            HashMap::from([(alice, vec![priced(1, 10.0), priced(2, 2.5)])]),
            vec![],
        );

        h.sync.apply(Some(identity(alice))).await.unwrap();

        assert_eq!(h.stores.collection_total().total(), Money::from_cents(1250));
        assert_eq!(h.stores.collection_total().owner(), Some(alice));
        assert_eq!(h.stores.profile().profile().unwrap().id, alice);
        assert_eq!(h.stores.auth().user_id(), Some(alice));
        assert_eq!(h.cache.current_user(), Some(alice));
        assert_eq!(h.source.session_token(), Some(format!("token-{alice}")));
    }

    #[tokio::test]
    async fn logout_resets_everything_before_returning() {
        let alice = UserId::new_v4();
        let h = harness(HashMap::from([(alice, vec![priced(1, 30.0)])]), vec![]);

        h.sync.apply(Some(identity(alice))).await.unwrap();
        h.stores
            .update_collection_total(|s| s.add(Money::from_cents(500)))
            .unwrap()
            .unwrap();

        h.sync.apply(None).await.unwrap();

        assert_eq!(h.stores.collection_total(), CollectionTotal::default());
        assert_eq!(h.stores.profile(), ProfileSlice::default());
        assert!(h.stores.auth().identity().is_none());
        assert_eq!(h.cache.current_user(), None);
        assert!(h.cache.is_empty());
        assert!(!h.stores.hydrate(alice).unwrap(), "persisted copy cleared");
        assert_eq!(h.source.session_token(), None);
    }

    #[tokio::test]
    async fn same_user_only_refreshes_identity() {
        let alice = UserId::new_v4();
        let h = harness(HashMap::from([(alice, vec![priced(1, 1.0)])]), vec![]);

        h.sync.apply(Some(identity(alice))).await.unwrap();
        h.stores
            .update_collection_total(|s| s.add(Money::from_cents(7)))
            .unwrap()
            .unwrap();

        let rotated = SessionIdentity::new(alice, "rotated", chrono::Utc::now());
        h.sync.apply(Some(rotated)).await.unwrap();

        assert_eq!(h.stores.auth().identity().unwrap().access_token, "rotated");
        assert_eq!(h.source.session_token().as_deref(), Some("rotated"));
        assert_eq!(h.stores.collection_total().total(), Money::from_cents(107));
        assert_eq!(h.source.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn switching_users_never_exposes_previous_values() {
        let (alice, bob) = (UserId::new_v4(), UserId::new_v4());
        let mut h = harness(
            HashMap::from([
                (alice, vec![priced(1, 99.0)]),
                (bob, vec![priced(2, 4.0), priced(3, 1.0)]),
            ]),
            vec![bob],
        );

        h.sync.apply(Some(identity(alice))).await.unwrap();
        h.stores
            .update_collection_total(|s| s.add(Money::from_cents(100)))
            .unwrap()
            .unwrap();
        h.sync.apply(None).await.unwrap();

        let sync = Arc::clone(&h.sync);
        let login = tokio::spawn(async move { sync.apply(Some(identity(bob))).await });

        // Bob's seed is blocked; state must already be empty and his.
        assert_eq!(h.started.recv().await, Some(bob));
        let total = h.stores.collection_total();
        assert_eq!(total.total(), Money::ZERO);
        assert_eq!(total.owner(), Some(bob));
        assert!(h.stores.profile().profile().is_none());

        h.gate.notify_one();
        login.await.unwrap().unwrap();

        assert_eq!(h.stores.collection_total().total(), Money::from_cents(500));
        assert_eq!(h.stores.profile().profile().unwrap().id, bob);
    }

    #[tokio::test]
    async fn seed_for_superseded_identity_is_dropped() {
        let (alice, bob) = (UserId::new_v4(), UserId::new_v4());
        let mut h = harness(
            HashMap::from([(alice, vec![priced(1, 50.0)]), (bob, vec![priced(2, 3.0)])]),
            vec![alice],
        );

        let sync = Arc::clone(&h.sync);
        let slow = tokio::spawn(async move { sync.apply(Some(identity(alice))).await });
        assert_eq!(h.started.recv().await, Some(alice));

        h.sync.apply(Some(identity(bob))).await.unwrap();
        h.gate.notify_one();
        slow.await.unwrap().unwrap();

        assert_eq!(h.stores.collection_total().total(), Money::from_cents(300));
        assert_eq!(h.stores.collection_total().owner(), Some(bob));
        assert_eq!(h.stores.profile().profile().unwrap().id, bob);
        assert_eq!(h.source.session_token(), Some(format!("token-{bob}")));
    }

    #[tokio::test]
    async fn run_follows_the_session_channel_until_cancelled() {
        let alice = UserId::new_v4();
        let h = harness(HashMap::from([(alice, vec![priced(1, 8.0)])]), vec![]);
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let sync = Arc::clone(&h.sync);
        let token = cancel.clone();
        let task = tokio::spawn(async move { sync.run(rx, token).await });

        tx.send(Some(identity(alice))).unwrap();
        for _ in 0..100 {
            if h.stores.profile().profile().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(h.stores.collection_total().total(), Money::from_cents(800));

        cancel.cancel();
        task.await.unwrap();
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn sign_out_and_cancel_are_not_blocked_by_a_pending_seed() {
        let alice = UserId::new_v4();
        let mut h = harness(HashMap::from([(alice, vec![priced(1, 12.0)])]), vec![alice]);
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let sync = Arc::clone(&h.sync);
        let token = cancel.clone();
        let task = tokio::spawn(async move { sync.run(rx, token).await });

        tx.send(Some(identity(alice))).unwrap();
        assert_eq!(h.started.recv().await, Some(alice));
        assert_eq!(h.stores.auth().user_id(), Some(alice));

        // The seed never finishes; signing out must still take effect.
        tx.send(None).unwrap();
        wait_until(|| h.stores.auth().identity().is_none()).await;
        assert!(h.stores.auth().identity().is_none());
        assert_eq!(h.cache.current_user(), None);
        assert_eq!(h.stores.collection_total(), CollectionTotal::default());
        assert_eq!(h.source.session_token(), None);

        // Block again, then stop while blocked.
        tx.send(Some(identity(alice))).unwrap();
        assert_eq!(h.started.recv().await, Some(alice));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("synchronizer stops while a seed is pending")
            .unwrap();
    }

    #[tokio::test]
    async fn token_rotation_does_not_abandon_a_pending_seed() {
        let alice = UserId::new_v4();
        let mut h = harness(HashMap::from([(alice, vec![priced(1, 50.0)])]), vec![alice]);
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let sync = Arc::clone(&h.sync);
        let token = cancel.clone();
        let task = tokio::spawn(async move { sync.run(rx, token).await });

        tx.send(Some(identity(alice))).unwrap();
        assert_eq!(h.started.recv().await, Some(alice));

        tx.send(Some(SessionIdentity::new(alice, "rotated", chrono::Utc::now())))
            .unwrap();
        wait_until(|| h.source.session_token().as_deref() == Some("rotated")).await;
        assert_eq!(h.stores.auth().identity().unwrap().access_token, "rotated");

        h.gate.notify_one();
        wait_until(|| h.stores.profile().profile().is_some()).await;
        assert_eq!(h.stores.collection_total().total(), Money::from_cents(5000));
        assert_eq!(h.source.calls.lock().unwrap().len(), 1);

        cancel.cancel();
        task.await.unwrap();
    }
}
