use super::identity::AdminUser;
use super::response::{ApiError, ApiResponse, ApiResult};
use super::AppState;
use crate::audit::AuditEvent;
use crate::db::{
    ExportMap, ImportReport, KeyWithTranslations, Language, Translation, TranslationKey,
    TranslationKeyPatch,
};
use crate::error::LocalizationError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Deserializer, Serialize};

fn default_true() -> bool {
    true
}

/// `Some` whenever the field is present, `null` included
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateLanguageRequest {
    pub code: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLanguageRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub key_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateKeyRequest {
    pub description: Option<String>,
    pub category: Option<String>,
    /// Present only so a rename attempt can be rejected explicitly
    #[serde(default, deserialize_with = "present")]
    pub key_name: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertTranslationRequest {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedKey {
    pub id: i64,
    pub translations_removed: u64,
}

// ==================== Languages ====================

/// All languages, inactive included
pub async fn list_languages(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<Language>> {
    Ok(ApiResponse::ok(state.db.list_languages(false).await?))
}

pub async fn create_language(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<CreateLanguageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Language>>), ApiError> {
    let result = state
        .db
        .create_language(&body.code, &body.name, body.is_active)
        .await;
    state.audit(&admin, "language.create", format!("languages/{}", body.code), &result);
    Ok((StatusCode::CREATED, ApiResponse::ok(result?)))
}

pub async fn update_language(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateLanguageRequest>,
) -> ApiResult<Language> {
    let result = state
        .db
        .update_language(id, body.name.as_deref(), body.is_active)
        .await;
    state.audit(&admin, "language.update", format!("languages/{}", id), &result);
    Ok(ApiResponse::ok(result?))
}

// ==================== Translation keys ====================

pub async fn list_keys(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<TranslationKey>> {
    Ok(ApiResponse::ok(state.db.list_translation_keys().await?))
}

pub async fn create_key(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TranslationKey>>), ApiError> {
    let result = state
        .db
        .create_translation_key(
            &body.key_name,
            body.description.as_deref(),
            body.category.as_deref(),
        )
        .await;
    state.audit(
        &admin,
        "translation_key.create",
        format!("translation-keys/{}", body.key_name),
        &result,
    );
    Ok((StatusCode::CREATED, ApiResponse::ok(result?)))
}

pub async fn update_key(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateKeyRequest>,
) -> ApiResult<TranslationKey> {
    let result = if body.key_name.is_some() {
        Err(LocalizationError::Validation(
            "Translation key names cannot be changed".to_string(),
        ))
    } else {
        let patch = TranslationKeyPatch {
            description: body.description,
            category: body.category,
        };
        state.db.update_translation_key(id, &patch).await
    };
    state.audit(&admin, "translation_key.update", format!("translation-keys/{}", id), &result);
    Ok(ApiResponse::ok(result?))
}

pub async fn delete_key(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<DeletedKey> {
    let result = state.db.delete_translation_key(id).await;
    state.audit(&admin, "translation_key.delete", format!("translation-keys/{}", id), &result);
    Ok(ApiResponse::ok(DeletedKey {
        id,
        translations_removed: result?,
    }))
}

// ==================== Translations ====================

pub async fn list_translations(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<KeyWithTranslations>> {
    Ok(ApiResponse::ok(state.db.list_translations_with_details().await?))
}

pub async fn upsert_translation(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((key_id, code)): Path<(i64, String)>,
    Json(body): Json<UpsertTranslationRequest>,
) -> ApiResult<Translation> {
    let result = state.db.upsert_translation(key_id, &code, &body.value).await;
    state.audit(
        &admin,
        "translation.upsert",
        format!("translations/{}/{}", key_id, code),
        &result,
    );
    Ok(ApiResponse::ok(result?))
}

pub async fn delete_translation(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((key_id, code)): Path<(i64, String)>,
) -> ApiResult<()> {
    let result = state.db.delete_translation(key_id, &code).await;
    state.audit(
        &admin,
        "translation.delete",
        format!("translations/{}/{}", key_id, code),
        &result,
    );
    result?;
    Ok(ApiResponse::ok(()))
}

pub async fn export_translations(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<ExportMap> {
    Ok(ApiResponse::ok(state.db.export_all().await?))
}

pub async fn import_translations(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(data): Json<ExportMap>,
) -> ApiResult<ImportReport> {
    let result = state.db.import_all(&data).await;
    match &result {
        Ok(report) if !report.errors.is_empty() => {
            let event = AuditEvent::new(admin.id(), "translation.import", "translations")
                .with_detail(format!(
                    "{} imported, {} failed",
                    report.imported,
                    report.errors.len()
                ));
            state.audit.record(event);
        }
        _ => state.audit(&admin, "translation.import", "translations", &result),
    }

    let report = result?;
    let outcome = report.outcome;
    Ok(ApiResponse::batch(report, outcome))
}
