use super::response::{ApiResponse, ApiResult};
use super::AppState;
use crate::bundle::StaticDocument;
use crate::db::Language;
use crate::i18n::validate_language_code;
use axum::extract::{Path, State};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> ApiResult<Health> {
    Ok(ApiResponse::ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Active languages only
pub async fn list_languages(State(state): State<AppState>) -> ApiResult<Vec<Language>> {
    Ok(ApiResponse::ok(state.db.list_languages(true).await?))
}

/// Flat key -> value map; empty for unknown or inactive languages
pub async fn get_translations(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<BTreeMap<String, String>> {
    validate_language_code(&code)?;
    Ok(ApiResponse::ok(state.db.get_translations_for_language(&code).await?))
}

pub async fn list_static_languages(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::ok(state.bundles.available_languages().await?))
}

pub async fn get_static(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<StaticDocument> {
    let document = state.bundles.read(&code).await?;
    Ok(ApiResponse::ok(document.as_ref().clone()))
}
