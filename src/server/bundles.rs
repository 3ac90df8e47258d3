use super::identity::AdminUser;
use super::response::{ApiResponse, ApiResult};
use super::AppState;
use crate::bundle::{StaticDocument, WriteReceipt};
use axum::extract::{Path, State};
use axum::Json;

/// Replace a whole static bundle
pub async fn put_static(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(code): Path<String>,
    Json(document): Json<StaticDocument>,
) -> ApiResult<WriteReceipt> {
    let result = state.bundles.write(&code, &document).await;
    state.audit(&admin, "static_bundle.write", format!("static-translations/{}", code), &result);
    Ok(ApiResponse::ok(result?))
}

pub async fn list_backups(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(code): Path<String>,
) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::ok(state.bundles.list_backups(&code).await?))
}
