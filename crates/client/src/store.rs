//! Global client state.
//!
//! Each slice owns one piece of user-dependent state, records which user
//! it belongs to, and is mutated only through its setters. [`Stores`]
//! holds the slices behind locks, hands out snapshots, and writes the
//! persisted slices through a [`StorageAdapter`] after every update.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use memcard_core::money::{Money, MoneyOverflow};
use memcard_core::rank::PlayerRank;
use memcard_core::session::SessionIdentity;
use memcard_core::types::UserId;
use memcard_db::models::collection::PriceRecord;
use memcard_db::models::profile::Profile;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

// ---------------------------------------------------------------------------
// Slices
// ---------------------------------------------------------------------------

/// Running value of the signed-in user's owned games.
///
/// `add`/`subtract` are latency shortcuts applied after a mutation;
/// [`calculate_from_records`](Self::calculate_from_records) recomputes the
/// authoritative value from per-item prices and clears `dirty`. An update
/// that would overflow fails and leaves the slice untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTotal {
    owner: Option<UserId>,
    total: Money,
    dirty: bool,
}

impl CollectionTotal {
    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Whether incremental updates were applied since the last recompute.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_total(&mut self, total: Money) {
        self.total = total;
        self.dirty = false;
    }

    pub fn add(&mut self, price: Money) -> Result<(), MoneyOverflow> {
        self.total = self.total.checked_add(price)?;
        self.dirty = true;
        Ok(())
    }

    pub fn subtract(&mut self, price: Money) -> Result<(), MoneyOverflow> {
        self.total = self.total.checked_sub(price)?;
        self.dirty = true;
        Ok(())
    }

    pub fn calculate_from_records(&mut self, records: &[PriceRecord]) -> Result<(), MoneyOverflow> {
        self.set_total(Money::checked_sum(records.iter().map(PriceRecord::price))?);
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSlice {
    owner: Option<UserId>,
    profile: Option<Profile>,
    dirty: bool,
}

impl ProfileSlice {
    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
        self.dirty = false;
    }

    /// Record a rank assigned locally before the profile is refetched.
    /// No-op until a profile has been loaded.
    pub fn set_player_rank(&mut self, rank: PlayerRank) {
        if let Some(profile) = self.profile.as_mut() {
            profile.player_rank = Some(rank);
            self.dirty = true;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The identity the client currently acts as. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSlice {
    identity: Option<SessionIdentity>,
}

impl AuthSlice {
    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.identity.as_ref().map(|i| i.user_id)
    }

    pub fn set_identity(&mut self, identity: SessionIdentity) {
        self.identity = Some(identity);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Storage adapters
// ---------------------------------------------------------------------------

/// Narrow key/value persistence used by [`Stores`].
pub trait StorageAdapter: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    /// Remove every key this adapter holds.
    fn clear(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageAdapter for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.entries().clear();
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageAdapter for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

const COLLECTION_TOTAL_KEY: &str = "collection_total";
const PROFILE_KEY: &str = "profile";

/// Container for every slice plus the persistence adapter.
pub struct Stores {
    collection_total: RwLock<CollectionTotal>,
    profile: RwLock<ProfileSlice>,
    auth: RwLock<AuthSlice>,
    storage: Box<dyn StorageAdapter>,
}

impl Stores {
    pub fn new(storage: Box<dyn StorageAdapter>) -> Self {
        Self {
            collection_total: RwLock::default(),
            profile: RwLock::default(),
            auth: RwLock::default(),
            storage,
        }
    }

    pub fn collection_total(&self) -> CollectionTotal {
        read(&self.collection_total).clone()
    }

    pub fn profile(&self) -> ProfileSlice {
        read(&self.profile).clone()
    }

    pub fn auth(&self) -> AuthSlice {
        read(&self.auth).clone()
    }

    /// Apply setters to the collection total and persist the result.
    /// Returns whatever the setter returned.
    pub fn update_collection_total<R>(
        &self,
        f: impl FnOnce(&mut CollectionTotal) -> R,
    ) -> Result<R, ClientError> {
        let (out, snapshot) = {
            let mut slice = write(&self.collection_total);
            let out = f(&mut slice);
            (out, slice.clone())
        };
        self.persist(COLLECTION_TOTAL_KEY, &snapshot)?;
        Ok(out)
    }

    /// Apply setters to the profile slice and persist the result.
    pub fn update_profile<R>(&self, f: impl FnOnce(&mut ProfileSlice) -> R) -> Result<R, ClientError> {
        let (out, snapshot) = {
            let mut slice = write(&self.profile);
            let out = f(&mut slice);
            (out, slice.clone())
        };
        self.persist(PROFILE_KEY, &snapshot)?;
        Ok(out)
    }

    pub fn update_auth(&self, f: impl FnOnce(&mut AuthSlice)) {
        f(&mut write(&self.auth));
    }

    /// Return every slice to its empty state, owned by `owner`.
    ///
    /// Persisted copies are left alone; see [`clear_persisted`](Self::clear_persisted).
    pub fn reset_all(&self, owner: Option<UserId>) {
        let mut total = write(&self.collection_total);
        total.reset();
        total.owner = owner;
        let mut profile = write(&self.profile);
        profile.reset();
        profile.owner = owner;
        write(&self.auth).reset();
    }

    pub fn clear_persisted(&self) -> Result<(), ClientError> {
        self.storage.clear()
    }

    /// Load persisted slices that belong to `owner`.
    ///
    /// Copies owned by anyone else are ignored. Returns whether anything
    /// was restored.
    pub fn hydrate(&self, owner: UserId) -> Result<bool, ClientError> {
        let mut restored = false;

        if let Some(saved) = self.load::<CollectionTotal>(COLLECTION_TOTAL_KEY)? {
            if saved.owner == Some(owner) {
                *write(&self.collection_total) = saved;
                restored = true;
            }
        }
        if let Some(saved) = self.load::<ProfileSlice>(PROFILE_KEY)? {
            if saved.owner == Some(owner) {
                *write(&self.profile) = saved;
                restored = true;
            }
        }

        tracing::debug!(user_id = %owner, restored, "Hydrated persisted slices");
        Ok(restored)
    }

    fn persist<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        self.storage.set(key, &serde_json::to_string(value)?)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ClientError> {
        match self.storage.get(key)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding unreadable persisted slice");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
