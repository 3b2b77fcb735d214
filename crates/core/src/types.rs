/// Row primary keys for collection items and notifications are BIGSERIAL.
pub type DbId = i64;

/// Users are identified by the UUID issued by the identity provider.
pub type UserId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
