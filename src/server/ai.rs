use super::identity::AdminUser;
use super::response::{ApiResponse, ApiResult};
use super::AppState;
use crate::db::Translation;
use crate::generator::{BatchGeneration, BulkGeneration, Draft, GenerateRequest, ProviderStatus};
use crate::i18n::{LocaleInfo, LocaleRegistry, MetricsReport};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub key: String,
    pub target_languages: Vec<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub keys: Vec<String>,
    pub source_language: String,
    pub target_language: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    pub key_name: String,
    pub language_code: String,
    pub text: String,
}

pub async fn generate(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<GenerateRequest>,
) -> ApiResult<Draft> {
    let result = state.generator.generate(&body).await;
    state.audit(
        &admin,
        "ai_translation.generate",
        format!("{}/{}", body.key, body.target_language),
        &result,
    );
    Ok(ApiResponse::ok(result?))
}

pub async fn generate_bulk(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<BulkRequest>,
) -> ApiResult<BulkGeneration> {
    let result = state
        .generator
        .generate_bulk(&body.key, &body.target_languages, body.context.as_deref())
        .await;
    state.audit(&admin, "ai_translation.generate_bulk", body.key.as_str(), &result);

    let bulk = result?;
    let outcome = bulk.outcome;
    Ok(ApiResponse::batch(bulk, outcome))
}

pub async fn generate_batch(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<BatchRequest>,
) -> ApiResult<BatchGeneration> {
    let result = state
        .generator
        .generate_batch(
            &body.keys,
            &body.source_language,
            &body.target_language,
            body.context.as_deref(),
        )
        .await;
    state.audit(
        &admin,
        "ai_translation.generate_batch",
        format!("{}->{}", body.source_language, body.target_language),
        &result,
    );

    let batch = result?;
    let outcome = batch.outcome;
    Ok(ApiResponse::batch(batch, outcome))
}

/// Persist a reviewed draft through the regular upsert path
pub async fn accept(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<AcceptRequest>,
) -> ApiResult<Translation> {
    let result = state
        .generator
        .accept(&body.key_name, &body.language_code, &body.text)
        .await;
    state.audit(
        &admin,
        "ai_translation.accept",
        format!("{}/{}", body.key_name, body.language_code),
        &result,
    );
    Ok(ApiResponse::ok(result?))
}

pub async fn validate(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<ProviderStatus> {
    Ok(ApiResponse::ok(state.generator.validate_provider().await))
}

pub async fn metrics(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<MetricsReport> {
    Ok(ApiResponse::ok(state.generator.metrics()))
}

/// Languages the drafting prompts know how to name
pub async fn languages(_admin: AdminUser) -> ApiResult<Vec<LocaleInfo>> {
    Ok(ApiResponse::ok(LocaleRegistry::get().list_all().to_vec()))
}
