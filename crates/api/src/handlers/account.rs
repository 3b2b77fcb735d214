//! Handler for `/account`.

use axum::Json;
use memcard_db::models::friendship::DeletedAccount;
use memcard_db::repositories::AccountRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthContext;
use crate::response::DataResponse;

/// DELETE /api/v1/account
///
/// Deletes every row owned by the caller in one remote procedure.
pub async fn delete_account(auth: AuthContext) -> AppResult<Json<DataResponse<DeletedAccount>>> {
    let deleted = AccountRepo::delete(&auth.client).await?;
    tracing::warn!(
        user_id = %auth.user_id(),
        deleted_rows = deleted.deleted_rows,
        "Account deleted"
    );
    Ok(Json(DataResponse { data: deleted }))
}
