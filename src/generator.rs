//! AI translation drafts.
//!
//! The generator only ever proposes text. Nothing reaches the repository
//! until an admin accepts a draft, and a failed provider call is reported as
//! an error rather than replaced with placeholder text.

use crate::bundle::BundleStore;
use crate::db::{Database, Translation};
use crate::error::{BatchEntryError, BatchOutcome, LocalizationError, Result};
use crate::i18n::{
    humanize_key, validate_key_name, validate_language_code, DraftValidator, GenerationMetrics,
    LocaleRegistry, MetricsReport, ValidationReport,
};
use crate::openai::OpenAiClient;
use crate::retry::{with_retry, RetryConfig};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are a professional translator specializing in software localization. \
Provide accurate, contextually appropriate translations that maintain the original meaning and tone.";

const BULK_CONTEXT: &str = "Task management application UI element";

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub key: String,
    pub source_language: String,
    pub target_language: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub source_text: Option<String>,
}

/// Where the text handed to the provider came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    Explicit,
    Repository,
    Bundle,
    KeyName,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceText {
    pub text: String,
    pub origin: SourceOrigin,
}

/// A candidate translation. Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Draft {
    pub key: String,
    pub source_language: String,
    pub target_language: String,
    pub source_text: String,
    pub source_origin: SourceOrigin,
    pub text: String,
    pub validation: ValidationReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftResult {
    Draft(Draft),
    Error(BatchEntryError),
}

impl DraftResult {
    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkGeneration {
    pub key: String,
    pub source_language: String,
    pub results: BTreeMap<String, DraftResult>,
    pub outcome: BatchOutcome,
}

/// Several keys drafted from one source language into one target language.
#[derive(Debug, Clone, Serialize)]
pub struct BatchGeneration {
    pub source_language: String,
    pub target_language: String,
    pub results: BTreeMap<String, DraftResult>,
    /// Requested keys with no source translation to draft from
    pub skipped: Vec<String>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub configured: bool,
    pub reachable: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Generator {
    client: OpenAiClient,
    db: Database,
    bundles: Arc<BundleStore>,
    default_language: String,
    default_targets: Vec<String>,
    metrics: GenerationMetrics,
}

impl Generator {
    pub fn new(
        client: OpenAiClient,
        db: Database,
        bundles: Arc<BundleStore>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            client,
            db,
            bundles,
            default_language: default_language.into(),
            default_targets: Vec::new(),
            metrics: GenerationMetrics::new(),
        }
    }

    /// Languages `generate_bulk` drafts into when the caller names none
    pub fn with_default_targets(mut self, targets: Vec<String>) -> Self {
        self.default_targets = targets;
        self
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    /// Draft one translation.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Draft> {
        validate_key_name(&request.key)?;
        validate_language_code(&request.source_language)?;
        validate_language_code(&request.target_language)?;

        let source = self
            .resolve_source_text(
                &request.key,
                &request.source_language,
                request.source_text.as_deref(),
            )
            .await;

        self.draft(
            &request.key,
            &request.source_language,
            &request.target_language,
            &source,
            request.context.as_deref(),
        )
        .await
    }

    /// Draft one key into several languages at once, from the default
    /// language. Each language gets its own provider call; a failure is
    /// recorded against that language only. An empty target list means the
    /// configured default targets.
    pub async fn generate_bulk(
        &self,
        key: &str,
        target_languages: &[String],
        context: Option<&str>,
    ) -> Result<BulkGeneration> {
        validate_key_name(key)?;
        let target_languages = if target_languages.is_empty() {
            self.default_targets.as_slice()
        } else {
            target_languages
        };
        if target_languages.is_empty() {
            return Err(LocalizationError::Validation(
                "At least one target language is required".to_string(),
            ));
        }

        let source_language = self.default_language.as_str();
        let source = self.resolve_source_text(key, source_language, None).await;
        let context = context.unwrap_or(BULK_CONTEXT);

        let targets: BTreeSet<&str> = target_languages.iter().map(String::as_str).collect();
        let drafts = join_all(targets.iter().map(|&target| {
            let source = &source;
            async move {
                let result = match validate_language_code(target) {
                    Ok(()) => self.draft(key, source_language, target, source, Some(context)).await,
                    Err(e) => Err(e),
                };
                (target, result)
            }
        }))
        .await;

        let mut results = BTreeMap::new();
        let mut failed = 0;
        for (target, result) in drafts {
            let entry = match result {
                Ok(draft) => DraftResult::Draft(draft),
                Err(err) => {
                    failed += 1;
                    DraftResult::Error(BatchEntryError::new(target, &err))
                }
            };
            results.insert(target.to_string(), entry);
        }

        let outcome = BatchOutcome::from_counts(results.len() - failed, failed);
        info!(
            "Bulk generation for {}: {} languages, {} failed",
            key,
            results.len(),
            failed
        );

        Ok(BulkGeneration {
            key: key.to_string(),
            source_language: source_language.to_string(),
            results,
            outcome,
        })
    }

    /// Draft several keys from `source_language` into `target_language`.
    ///
    /// Only keys with a stored source translation are drafted; the rest are
    /// listed as skipped. NotFound when none of the keys has one.
    pub async fn generate_batch(
        &self,
        keys: &[String],
        source_language: &str,
        target_language: &str,
        context: Option<&str>,
    ) -> Result<BatchGeneration> {
        validate_language_code(source_language)?;
        validate_language_code(target_language)?;
        if keys.is_empty() {
            return Err(LocalizationError::Validation(
                "At least one key is required".to_string(),
            ));
        }

        let stored = self.db.get_translations_for_language(source_language).await?;
        let mut sources = BTreeMap::new();
        let mut skipped = Vec::new();
        for key in keys.iter().collect::<BTreeSet<_>>() {
            match stored.get(key.as_str()).filter(|t| !t.trim().is_empty()) {
                Some(text) => {
                    sources.insert(
                        key.as_str(),
                        SourceText {
                            text: text.clone(),
                            origin: SourceOrigin::Repository,
                        },
                    );
                }
                None => skipped.push(key.clone()),
            }
        }
        if sources.is_empty() {
            return Err(LocalizationError::NotFound(format!(
                "None of the keys has a {} translation to draft from",
                source_language
            )));
        }

        let drafts = join_all(sources.iter().map(|(&key, source)| async move {
            let result = self
                .draft(key, source_language, target_language, source, context)
                .await;
            (key, result)
        }))
        .await;

        let mut results = BTreeMap::new();
        let mut failed = 0;
        for (key, result) in drafts {
            let entry = match result {
                Ok(draft) => DraftResult::Draft(draft),
                Err(err) => {
                    failed += 1;
                    DraftResult::Error(BatchEntryError::new(key, &err))
                }
            };
            results.insert(key.to_string(), entry);
        }

        let total = results.len();
        info!(
            "Batch generation {} -> {}: {} keys, {} failed, {} skipped",
            source_language,
            target_language,
            total,
            failed,
            skipped.len()
        );

        Ok(BatchGeneration {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            results,
            skipped,
            total,
            successful: total - failed,
            failed,
            outcome: BatchOutcome::from_counts(total - failed, failed),
        })
    }

    /// Persist a reviewed draft as the translation for (key, language).
    pub async fn accept(&self, key_name: &str, language_code: &str, text: &str) -> Result<Translation> {
        let key = self.db.find_key_by_name(key_name).await?.ok_or_else(|| {
            LocalizationError::NotFound(format!("Translation key {} not found", key_name))
        })?;

        let translation = self.db.upsert_translation(key.id, language_code, text).await?;
        self.metrics.record_draft_accepted();
        info!("Accepted draft for {} in {}", key_name, language_code);
        Ok(translation)
    }

    /// Whether the provider is configured and answering.
    pub async fn validate_provider(&self) -> ProviderStatus {
        let configured = self.client.is_configured();
        let check = if configured {
            with_retry(&RetryConfig::provider_check(), "provider_check", || self.client.check()).await
        } else {
            Err(LocalizationError::UpstreamProvider(
                "OPENAI_API_KEY is not configured".to_string(),
            ))
        };

        ProviderStatus {
            configured,
            reachable: check.is_ok(),
            model: self.client.model().to_string(),
            error: check.err().map(|e| e.to_string()),
        }
    }

    /// Explicit text, then the stored translation, then the bundle, then the key itself
    pub async fn resolve_source_text(
        &self,
        key: &str,
        source_language: &str,
        explicit: Option<&str>,
    ) -> SourceText {
        if let Some(text) = explicit.filter(|t| !t.trim().is_empty() && *t != key) {
            return SourceText {
                text: text.to_string(),
                origin: SourceOrigin::Explicit,
            };
        }

        match self.db.get_translations_for_language(source_language).await {
            Ok(map) => {
                if let Some(text) = map.get(key).filter(|t| !t.trim().is_empty()) {
                    return SourceText {
                        text: text.clone(),
                        origin: SourceOrigin::Repository,
                    };
                }
            }
            Err(e) => warn!("Source lookup in repository failed for {}: {}", key, e),
        }

        match self.bundles.read(source_language).await {
            Ok(document) => {
                if let Some(text) = document.get(key).filter(|t| !t.trim().is_empty()) {
                    return SourceText {
                        text: text.clone(),
                        origin: SourceOrigin::Bundle,
                    };
                }
            }
            Err(LocalizationError::NotFound(_)) => {}
            Err(e) => warn!("Source lookup in bundle failed for {}: {}", key, e),
        }

        SourceText {
            text: humanize_key(key),
            origin: SourceOrigin::KeyName,
        }
    }

    async fn draft(
        &self,
        key: &str,
        source_language: &str,
        target_language: &str,
        source: &SourceText,
        context: Option<&str>,
    ) -> Result<Draft> {
        let prompt = build_user_prompt(key, &source.text, source_language, target_language, context);

        self.metrics.record_provider_call();
        let text = match self.client.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                self.metrics.record_provider_failure();
                warn!("Draft {} -> {} failed: {}", key, target_language, e);
                return Err(e);
            }
        };

        let validation = DraftValidator::validate(&source.text, &text);
        if validation.has_errors() {
            self.metrics.record_draft_with_errors();
            warn!(
                "Draft for {} in {} failed validation: {:?}",
                key, target_language, validation.errors
            );
        }

        Ok(Draft {
            key: key.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            source_text: source.text.clone(),
            source_origin: source.origin,
            text,
            validation,
        })
    }
}

fn build_user_prompt(
    key: &str,
    source_text: &str,
    source_language: &str,
    target_language: &str,
    context: Option<&str>,
) -> String {
    let registry = LocaleRegistry::get();
    let source_name = registry.display_name(source_language);
    let target_name = registry.display_name(target_language);

    let mut prompt = format!(
        "Translate the following {} text to {}:\n\n",
        source_name, target_name
    );
    prompt.push_str(&format!("Translation Key: \"{}\"\n", key));
    prompt.push_str(&format!("Source Text: \"{}\"\n", source_text));
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("Context: {}\n", context));
    }

    prompt.push_str("\nInstructions:\n");
    prompt.push_str("- Provide only the translated text, no explanations\n");
    prompt.push_str("- Maintain the original meaning and tone\n");
    prompt.push_str("- Consider the context of a task management application\n");
    prompt.push_str("- For UI elements, keep translations concise\n");
    prompt.push_str("- Keep placeholders such as {count} and markup such as <strong> unchanged\n");
    if let Some(info) = registry.get_by_code(target_language) {
        if info.rtl || matches!(info.code, "ru") {
            prompt.push_str(&format!(
                "- Use standard {} appropriate for software interfaces\n",
                info.name
            ));
            prompt.push_str(&format!("- Ensure proper {} grammar and spelling\n", info.name));
        }
    }

    prompt.push_str("\nTranslation:");
    prompt
}
