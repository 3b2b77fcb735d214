use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use memcard_catalog::CatalogError;
use memcard_core::error::CoreError;
use memcard_db::DataError;
use serde_json::json;

/// Message returned for every unclassified failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain, data-service and catalog errors and adds
/// HTTP-specific variants. This is the only error type that becomes a
/// response: [`IntoResponse`] classifies it into a status and a
/// `{ "error", "code" }` body. Unclassified failures are logged and
/// answered with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `memcard_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A classified data-service failure.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A game-metadata catalog failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A collaborator that is not configured on this deployment.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::from(errors))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => internal("Internal core error", msg),
            },

            // --- Data-service errors ---
            AppError::Data(err) => classify_data_error(err),

            // --- Catalog errors ---
            AppError::Catalog(err) => internal("Catalog request failed", &err.to_string()),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::InternalError(msg) => internal("Internal error", msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a [`DataError`] into an HTTP status, error code, and message.
///
/// Not-found covers both missing rows and rows hidden by row-level
/// policies, so the caller cannot tell them apart.
fn classify_data_error(err: &DataError) -> (StatusCode, &'static str, String) {
    match err {
        DataError::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Authentication required".to_string(),
        ),
        DataError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        DataError::Invalid(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        DataError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        DataError::Remote(msg) => internal("Data service error", msg),
        DataError::Decode(e) => internal("Data service returned a malformed payload", &e.to_string()),
    }
}

/// Log `detail` and build the sanitized 500 triple.
fn internal(context: &'static str, detail: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_ERROR_MESSAGE.to_string(),
    )
}

/// Response for a handler panic caught by `CatchPanicLayer`.
///
/// The panic payload is logged, never returned.
pub fn panic_response(payload: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::InternalError(format!("handler panicked: {detail}")).into_response()
}
