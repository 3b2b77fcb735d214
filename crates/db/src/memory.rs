//! In-process [`DataBackend`] for tests and offline development.
//!
//! Implements the same procedure contract as the Postgres migrations:
//! row visibility follows the row-level policies, and procedures report
//! missing/already-applied targets as [`DataError::NotFound`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use memcard_core::dto::{AddGameRequest, Ownership, UpdateProfileRequest};
use memcard_core::rank::PlayerRank;
use memcard_core::session::SessionIdentity;
use memcard_core::types::{DbId, UserId};
use serde_json::{json, Value};

use crate::backend::{DataBackend, Select};
use crate::error::DataError;
use crate::models::collection::UserGame;
use crate::models::friendship::{Friendship, FriendshipStatus};
use crate::models::notification::{Notification, NotificationKind};
use crate::models::profile::Profile;

#[derive(Default)]
struct State {
    profiles: HashMap<UserId, Profile>,
    games: Vec<UserGame>,
    friendships: Vec<Friendship>,
    notifications: Vec<Notification>,
    next_id: DbId,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn profile_mut(&mut self, user_id: UserId) -> &mut Profile {
        self.profiles.entry(user_id).or_insert_with(|| Profile {
            id: user_id,
            username: None,
            avatar_url: None,
            player_rank: None,
            created_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    rpc_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `rpc` invocations received so far.
    pub fn rpc_calls(&self) -> usize {
        self.rpc_calls.load(Ordering::SeqCst)
    }

    pub fn insert_friendship(&self, user_id: UserId, friend_id: UserId, status: FriendshipStatus) {
        self.lock().friendships.push(Friendship {
            user_id,
            friend_id,
            status,
            created_at: Utc::now(),
        });
    }

    pub fn friendships(&self) -> Vec<Friendship> {
        self.lock().friendships.clone()
    }

    pub fn insert_notification(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        payload: Value,
    ) -> DbId {
        let mut state = self.lock();
        let id = state.next_id();
        state.notifications.push(Notification {
            id,
            user_id,
            kind,
            payload,
            is_read: false,
            validated_at: None,
            created_at: Utc::now(),
        });
        id
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    pub fn insert_game(&self, user_id: UserId, igdb_game_id: i64, purchase_price: Option<f64>) -> DbId {
        let mut state = self.lock();
        let id = state.next_id();
        state.games.push(UserGame {
            id,
            user_id,
            igdb_game_id,
            platform: None,
            ownership: Ownership::Owned,
            purchase_price,
            purchase_date: None,
            condition: None,
            created_at: Utc::now(),
        });
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn call(&self, uid: UserId, procedure: &str, args: &Value) -> Result<Value, DataError> {
        let mut state = self.lock();
        match procedure {
            "current_profile" => Ok(serde_json::to_value(state.profile_mut(uid).clone())?),
            "update_profile" => {
                let input: UpdateProfileRequest = serde_json::from_value(args.clone())?;
                let profile = state.profile_mut(uid);
                if let Some(username) = input.username {
                    profile.username = Some(username);
                }
                if let Some(avatar_url) = input.avatar_url {
                    profile.avatar_url = Some(avatar_url);
                }
                Ok(serde_json::to_value(profile.clone())?)
            }
            "set_player_rank" => {
                let rank: PlayerRank = serde_json::from_value(
                    args.get("rank")
                        .cloned()
                        .ok_or_else(|| DataError::Invalid("rank is required".into()))?,
                )?;
                let profile = state.profile_mut(uid);
                profile.player_rank = Some(rank);
                Ok(serde_json::to_value(profile.clone())?)
            }
            "add_game" => {
                let input: AddGameRequest = serde_json::from_value(args.clone())?;
                let igdb_game_id = input
                    .igdb_game_id
                    .ok_or_else(|| DataError::Invalid("igdb_game_id is required".into()))?;
                let id = state.next_id();
                let game = UserGame {
                    id,
                    user_id: uid,
                    igdb_game_id,
                    platform: input.platform,
                    ownership: input.ownership.unwrap_or(Ownership::Owned),
                    purchase_price: input.purchase_price,
                    purchase_date: input.purchase_date,
                    condition: input.condition,
                    created_at: Utc::now(),
                };
                state.games.push(game.clone());
                Ok(serde_json::to_value(game)?)
            }
            "remove_game" => {
                let id = arg_i64(args, "id")?;
                let before = state.games.len();
                state.games.retain(|g| !(g.id == id && g.user_id == uid));
                if state.games.len() == before {
                    return Err(DataError::NotFound("game not found".into()));
                }
                Ok(json!({ "success": true }))
            }
            "collection_price_records" => {
                let records: Vec<Value> = state
                    .games
                    .iter()
                    .filter(|g| g.user_id == uid && g.ownership == Ownership::Owned)
                    .map(|g| json!({ "id": g.id, "purchase_price": g.purchase_price }))
                    .collect();
                Ok(Value::Array(records))
            }
            "collection_total" => {
                let owned = state
                    .games
                    .iter()
                    .filter(|g| g.user_id == uid && g.ownership == Ownership::Owned);
                let (total, count) = owned.fold((0.0, 0i64), |(t, c), g| {
                    (t + g.purchase_price.unwrap_or(0.0), c + 1)
                });
                Ok(json!({ "total": total, "count": count }))
            }
            "request_friend" => {
                let friend = arg_uuid(args, "friend_id")?;
                if friend == uid {
                    return Err(DataError::Invalid("invalid friend_id".into()));
                }
                if state.friendships.iter().any(|f| f.connects(uid, friend)) {
                    return Err(DataError::Conflict("friendship already exists".into()));
                }
                let row = Friendship {
                    user_id: uid,
                    friend_id: friend,
                    status: FriendshipStatus::Pending,
                    created_at: Utc::now(),
                };
                state.friendships.push(row.clone());
                Ok(serde_json::to_value(row)?)
            }
            "accept_friend" => {
                let friend = arg_uuid(args, "friend_id")?;
                let row = state
                    .friendships
                    .iter_mut()
                    .find(|f| {
                        f.user_id == friend
                            && f.friend_id == uid
                            && f.status == FriendshipStatus::Pending
                    })
                    .ok_or_else(|| DataError::NotFound("friend request not found".into()))?;
                row.status = FriendshipStatus::Accepted;
                Ok(serde_json::to_value(row.clone())?)
            }
            "remove_friend" => {
                let friend = arg_uuid(args, "friend_id")?;
                let before = state.friendships.len();
                state.friendships.retain(|f| !f.connects(uid, friend));
                let removed = (before - state.friendships.len()) as i64;
                Ok(json!({ "success": true, "removed": removed }))
            }
            "validate_wishlist_notification" => {
                let id = arg_i64(args, "notification_id")?;
                let row = state
                    .notifications
                    .iter_mut()
                    .find(|n| {
                        n.id == id
                            && n.user_id == uid
                            && n.kind == NotificationKind::Wishlist
                            && n.validated_at.is_none()
                    })
                    .ok_or_else(|| {
                        DataError::NotFound("notification not found or already validated".into())
                    })?;
                row.validated_at = Some(Utc::now());
                row.is_read = true;
                let remaining = state
                    .notifications
                    .iter()
                    .filter(|n| {
                        n.user_id == uid
                            && n.kind == NotificationKind::Wishlist
                            && n.validated_at.is_none()
                    })
                    .count() as i64;
                Ok(json!({ "success": true, "remaining": remaining }))
            }
            "create_achievement_notification" => {
                let target = arg_uuid(args, "user_id")?;
                let achievement = args
                    .get("achievement")
                    .and_then(Value::as_str)
                    .ok_or_else(|| DataError::Invalid("achievement is required".into()))?
                    .to_string();
                let existing = state.notifications.iter().find(|n| {
                    n.user_id == target
                        && n.kind == NotificationKind::Achievement
                        && n.payload.get("achievement").and_then(Value::as_str)
                            == Some(achievement.as_str())
                });
                if let Some(n) = existing {
                    return Ok(json!({ "id": n.id }));
                }
                let id = state.next_id();
                state.notifications.push(Notification {
                    id,
                    user_id: target,
                    kind: NotificationKind::Achievement,
                    payload: json!({ "achievement": achievement, "from": uid }),
                    is_read: false,
                    validated_at: None,
                    created_at: Utc::now(),
                });
                Ok(json!({ "id": id }))
            }
            "create_friend_notification" => {
                let friend = arg_uuid(args, "friend_id")?;
                let from = uid.to_string();
                let existing = state.notifications.iter().find(|n| {
                    n.user_id == friend
                        && n.kind == NotificationKind::Friend
                        && !n.is_read
                        && n.payload.get("from").and_then(Value::as_str) == Some(from.as_str())
                });
                if let Some(n) = existing {
                    return Ok(json!({ "id": n.id }));
                }
                let id = state.next_id();
                state.notifications.push(Notification {
                    id,
                    user_id: friend,
                    kind: NotificationKind::Friend,
                    payload: json!({ "from": from }),
                    is_read: false,
                    validated_at: None,
                    created_at: Utc::now(),
                });
                Ok(json!({ "id": id }))
            }
            "delete_account" => {
                let mut deleted = 0usize;
                let before = state.notifications.len();
                state.notifications.retain(|n| n.user_id != uid);
                deleted += before - state.notifications.len();
                let before = state.friendships.len();
                state
                    .friendships
                    .retain(|f| f.user_id != uid && f.friend_id != uid);
                deleted += before - state.friendships.len();
                let before = state.games.len();
                state.games.retain(|g| g.user_id != uid);
                deleted += before - state.games.len();
                if state.profiles.remove(&uid).is_some() {
                    deleted += 1;
                }
                Ok(json!({ "success": true, "deleted_rows": deleted }))
            }
            other => Err(DataError::Remote(format!(
                "function public.{other}(jsonb) does not exist"
            ))),
        }
    }

    fn visible_rows(&self, uid: UserId, table: &str) -> Result<Vec<Value>, DataError> {
        let state = self.lock();
        let rows = match table {
            "profiles" => state
                .profiles
                .values()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?,
            "user_games" => state
                .games
                .iter()
                .filter(|g| g.user_id == uid)
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?,
            "friendships" => state
                .friendships
                .iter()
                .filter(|f| f.user_id == uid || f.friend_id == uid)
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?,
            "notifications" => state
                .notifications
                .iter()
                .filter(|n| n.user_id == uid)
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(DataError::Remote(format!(
                    "relation \"{other}\" does not exist"
                )))
            }
        };
        Ok(rows)
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    async fn rpc(
        &self,
        caller: Option<&SessionIdentity>,
        procedure: &str,
        args: Value,
    ) -> Result<Value, DataError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        let uid = caller
            .map(|c| c.user_id)
            .ok_or_else(|| DataError::NotFound("Resource not found".into()))?;
        self.call(uid, procedure, &args)
    }

    async fn select(
        &self,
        caller: Option<&SessionIdentity>,
        query: &Select,
    ) -> Result<Vec<Value>, DataError> {
        query.to_sql()?;
        let Some(uid) = caller.map(|c| c.user_id) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Value> = self
            .visible_rows(uid, query.table)?
            .into_iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|f| row.get(f.column).map(as_text).as_deref() == Some(f.value.as_str()))
            })
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ka = a.get(order.column).map(as_text).unwrap_or_default();
                let kb = b.get(order.column).map(as_text).unwrap_or_default();
                if order.ascending {
                    ka.cmp(&kb)
                } else {
                    kb.cmp(&ka)
                }
            });
        }

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn ping(&self) -> Result<(), DataError> {
        Ok(())
    }
}

/// Text rendering of a JSON scalar, matching a `column::text` comparison.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn arg_uuid(args: &Value, key: &str) -> Result<UserId, DataError> {
    args.get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DataError::Invalid(format!("{key} is required")))
}

fn arg_i64(args: &Value, key: &str) -> Result<DbId, DataError> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| DataError::Invalid(format!("{key} is required")))
}
