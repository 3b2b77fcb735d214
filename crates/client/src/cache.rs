//! Per-user query cache.
//!
//! Entries are keyed by the current user plus a [`QueryKey`], so one user's
//! data is never served to another. A missing or stale entry is fetched
//! once: concurrent readers of the same key await one shared future.
//!
//! Every fetch is tagged with a generation number. When the fetch resolves
//! it only writes to storage if its key still holds the pending slot with
//! that generation; an invalidation or user change in the meantime
//! discards the result (its own awaiters still receive it).

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use memcard_core::types::UserId;
use tokio::time::Instant;

use crate::error::ClientError;

type CachedValue = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<CachedValue, Arc<ClientError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Identifies one cached read: an entity name plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    entity: &'static str,
    params: Vec<Option<String>>,
}

impl QueryKey {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            params: Vec::new(),
        }
    }

    /// Append a parameter. An absent value disables the query.
    pub fn param<P: ToString>(mut self, value: Option<P>) -> Self {
        self.params.push(value.map(|v| v.to_string()));
        self
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// A query runs only when every parameter is present.
    pub fn is_enabled(&self) -> bool {
        self.params.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Staleness horizon.
    pub ttl: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct ScopedKey {
    user: UserId,
    key: QueryKey,
}

enum Slot {
    Ready {
        value: CachedValue,
        stale_at: Instant,
    },
    Pending {
        generation: u64,
        fetch: SharedFetch,
    },
}

#[derive(Default)]
struct Inner {
    user: Option<UserId>,
    next_generation: u64,
    slots: HashMap<ScopedKey, Slot>,
}

#[derive(Default)]
pub struct QueryCache {
    inner: Mutex<Inner>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.lock().user
    }

    /// Switch the owning user. Changing users drops every entry, including
    /// in-flight fetches, so nothing fetched for the previous user is stored.
    pub fn set_user(&self, user: Option<UserId>) {
        let mut inner = self.lock();
        if inner.user != user {
            tracing::debug!(?user, dropped = inner.slots.len(), "Query cache owner changed");
            inner.slots.clear();
            inner.user = user;
        }
    }

    /// Drop every entry for every user.
    pub fn clear(&self) {
        self.lock().slots.clear();
    }

    /// Remove `key` for the current user; the next read refetches.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut inner = self.lock();
        if let Some(user) = inner.user {
            inner.slots.remove(&ScopedKey {
                user,
                key: key.clone(),
            });
        }
    }

    /// Remove every key of `entity` for the current user, whatever its params.
    pub fn invalidate_prefix(&self, entity: &str) {
        let mut inner = self.lock();
        if let Some(user) = inner.user {
            inner
                .slots
                .retain(|scoped, _| !(scoped.user == user && scoped.key.entity == entity));
        }
    }

    /// Number of stored or pending entries.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `key`, fetching it with `fetcher` if missing or stale.
    ///
    /// Returns `Ok(None)` without calling `fetcher` when the query is
    /// disabled: no current user, or a required parameter is absent.
    pub async fn get<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Result<Option<T>, ClientError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        if !key.is_enabled() {
            return Ok(None);
        }

        let (scoped, generation, fetch) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let Some(user) = inner.user else {
                return Ok(None);
            };
            let scoped = ScopedKey {
                user,
                key: key.clone(),
            };

            let in_flight = match inner.slots.get(&scoped) {
                Some(Slot::Ready { value, stale_at }) if Instant::now() < *stale_at => {
                    return downcast(key, value).map(Some);
                }
                Some(Slot::Pending { generation, fetch }) => Some((*generation, fetch.clone())),
                _ => None,
            };

            let (generation, fetch) = match in_flight {
                Some(pending) => pending,
                None => {
                    inner.next_generation += 1;
                    let generation = inner.next_generation;
                    let fetch = fetcher()
                        .map(|result| {
                            result
                                .map(|value| Arc::new(value) as CachedValue)
                                .map_err(Arc::new)
                        })
                        .boxed()
                        .shared();
                    tracing::trace!(entity = key.entity, generation, "Query cache miss");
                    inner.slots.insert(
                        scoped.clone(),
                        Slot::Pending {
                            generation,
                            fetch: fetch.clone(),
                        },
                    );
                    (generation, fetch)
                }
            };
            (scoped, generation, fetch)
        };

        let result = fetch.await;
        self.settle(&scoped, generation, &result, options.ttl);

        match result {
            Ok(value) => downcast(key, &value).map(Some),
            Err(e) => Err(ClientError::Shared(e)),
        }
    }

    /// Store a resolved fetch if its slot was not superseded. Failures are
    /// not cached.
    fn settle(&self, scoped: &ScopedKey, generation: u64, result: &FetchResult, ttl: Duration) {
        let mut inner = self.lock();
        let current = matches!(
            inner.slots.get(scoped),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        );
        if !current {
            tracing::trace!(entity = scoped.key.entity, generation, "Discarding superseded fetch");
            return;
        }
        match result {
            Ok(value) => {
                inner.slots.insert(
                    scoped.clone(),
                    Slot::Ready {
                        value: Arc::clone(value),
                        stale_at: Instant::now() + ttl,
                    },
                );
            }
            Err(_) => {
                inner.slots.remove(scoped);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn downcast<T: Clone + 'static>(key: &QueryKey, value: &CachedValue) -> Result<T, ClientError> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or(ClientError::CacheType { entity: key.entity })
}
