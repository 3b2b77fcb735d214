//! Errors surfaced by the data service.

/// Classified failure of a data-service call.
///
/// Stored procedures signal expected outcomes through SQLSTATE codes;
/// [`classify_sqlx_error`] turns those into the variants below so the API
/// layer can map them to HTTP statuses without inspecting driver errors.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// No caller identity where the operation needs one.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Target does not exist, is not visible to the caller, or the
    /// operation was already applied.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before or by the remote procedure.
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Unique constraint or duplicate-state violation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The remote call failed for reasons outside the caller's input.
    #[error("Remote procedure failed: {0}")]
    Remote(String),

    /// A payload did not match its declared schema.
    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<validator::ValidationErrors> for DataError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DataError::Invalid(errors.to_string())
    }
}

impl From<memcard_core::error::CoreError> for DataError {
    fn from(err: memcard_core::error::CoreError) -> Self {
        use memcard_core::error::CoreError;
        match err {
            CoreError::Validation(msg) => DataError::Invalid(msg),
            CoreError::NotFound { entity, id } => {
                DataError::NotFound(format!("{entity} with id {id} not found"))
            }
            CoreError::Conflict(msg) => DataError::Conflict(msg),
            CoreError::Unauthorized(_) => DataError::Unauthenticated,
            CoreError::Forbidden(msg) => DataError::NotFound(msg),
            CoreError::Internal(msg) => DataError::Remote(msg),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        classify_sqlx_error(err)
    }
}

/// Classify a sqlx error by SQLSTATE.
///
/// - `P0002` (raised by procedures) and `RowNotFound` map to `NotFound`.
/// - `42501` (row-level policy / unauthenticated) maps to `NotFound` so the
///   caller cannot test for existence.
/// - `22023`, `22P02`, `23502`, `23514` map to `Invalid`.
/// - `23505` maps to `Conflict`.
/// - Everything else is `Remote`.
pub fn classify_sqlx_error(err: sqlx::Error) -> DataError {
    match err {
        sqlx::Error::RowNotFound => DataError::NotFound("Resource not found".into()),
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("P0002") => DataError::NotFound(message),
                Some("42501") => DataError::NotFound("Resource not found".into()),
                Some("22023" | "22P02" | "23502" | "23514") => DataError::Invalid(message),
                Some("23505") => DataError::Conflict(message),
                _ => DataError::Remote(db_err.to_string()),
            }
        }
        other => DataError::Remote(other.to_string()),
    }
}
