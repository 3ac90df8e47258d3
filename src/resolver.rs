//! Client-side translation resolution.
//!
//! `resolve` is a pure lookup over an immutable snapshot of the active
//! language's data, so rendering never waits on I/O and never fails. The
//! snapshot is swapped by language switches and refreshes, each of which
//! bumps a revision counter that views can watch.
//!
//! Lookup order for a key:
//! 1. dynamic translation for the active language
//! 2. static bundle for the active language
//! 3. static bundle for the default language
//! 4. the caller's fallback
//! 5. the key itself

use crate::bundle::{BundleStore, StaticDocument};
use crate::db::Database;
use crate::error::{LocalizationError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub type DynamicTranslations = BTreeMap<String, String>;

/// Where a resolution context gets its data from.
pub trait TranslationSource: Send + Sync + 'static {
    fn dynamic_translations(
        &self,
        language_code: &str,
    ) -> impl Future<Output = Result<DynamicTranslations>> + Send;

    fn static_bundle(
        &self,
        language_code: &str,
    ) -> impl Future<Output = Result<Arc<StaticDocument>>> + Send;
}

/// Reads straight from the repository and the bundle store of this process.
#[derive(Clone)]
pub struct LocalSource {
    db: Database,
    bundles: Arc<BundleStore>,
}

impl LocalSource {
    pub fn new(db: Database, bundles: Arc<BundleStore>) -> Self {
        Self { db, bundles }
    }
}

impl TranslationSource for LocalSource {
    async fn dynamic_translations(&self, language_code: &str) -> Result<DynamicTranslations> {
        self.db.get_translations_for_language(language_code).await
    }

    async fn static_bundle(&self, language_code: &str) -> Result<Arc<StaticDocument>> {
        self.bundles.read(language_code).await
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Reads through the public HTTP API of a running service.
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await.map_err(|e| {
            LocalizationError::Io(std::io::Error::other(format!("GET {} failed: {}", url, e)))
        })?;

        let status = response.status();
        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            LocalizationError::Io(std::io::Error::other(format!(
                "GET {} returned an unreadable body ({}): {}",
                url, status, e
            )))
        })?;

        match envelope {
            Envelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope { error, .. } => {
                let message = error.unwrap_or_else(|| format!("GET {} returned {}", url, status));
                if status == reqwest::StatusCode::NOT_FOUND {
                    Err(LocalizationError::NotFound(message))
                } else {
                    Err(LocalizationError::Io(std::io::Error::other(message)))
                }
            }
        }
    }
}

impl TranslationSource for HttpSource {
    async fn dynamic_translations(&self, language_code: &str) -> Result<DynamicTranslations> {
        self.get(&format!("/api/translations/{}", language_code)).await
    }

    async fn static_bundle(&self, language_code: &str) -> Result<Arc<StaticDocument>> {
        let document: StaticDocument = self
            .get(&format!("/api/static-translations/{}", language_code))
            .await?;
        Ok(Arc::new(document))
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    language: String,
    dynamic: Arc<DynamicTranslations>,
    static_active: Arc<StaticDocument>,
    static_default: Arc<StaticDocument>,
}

/// Result of a switch or refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The new snapshot is live at this revision
    Applied(u64),
    /// A newer switch started before this one finished; its data was dropped
    Superseded,
}

/// The latest requested language and the generation that requested it
#[derive(Debug)]
struct Request {
    generation: u64,
    language: String,
}

pub struct ResolutionContext<S: TranslationSource> {
    source: Arc<S>,
    default_language: String,
    snapshot: RwLock<Arc<Snapshot>>,
    request: Mutex<Request>,
    revision: watch::Sender<u64>,
}

impl<S: TranslationSource> ResolutionContext<S> {
    /// Empty context on the default language at revision 0.
    pub fn new(source: S, default_language: impl Into<String>) -> Arc<Self> {
        let default_language = default_language.into();
        let empty = Arc::new(StaticDocument::new());
        let snapshot = Snapshot {
            language: default_language.clone(),
            dynamic: Arc::new(DynamicTranslations::new()),
            static_active: Arc::clone(&empty),
            static_default: empty,
        };
        let (revision, _) = watch::channel(0);

        Arc::new(Self {
            source: Arc::new(source),
            snapshot: RwLock::new(Arc::new(snapshot)),
            request: Mutex::new(Request {
                generation: 0,
                language: default_language.clone(),
            }),
            default_language,
            revision,
        })
    }

    /// Create a context and load the default language. A failed load leaves
    /// the context empty, which still resolves every key to itself.
    pub async fn load(source: S, default_language: impl Into<String>) -> Arc<Self> {
        let context = Self::new(source, default_language);
        let default_language = context.default_language.clone();
        if let Err(e) = context.switch_language_now(&default_language).await {
            warn!("Initial translation load for {} failed: {}", default_language, e);
        }
        context
    }

    fn current(&self) -> Arc<Snapshot> {
        let guard = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn active_language(&self) -> String {
        self.current().language.clone()
    }

    /// The language of the most recent switch, applied or still loading
    pub fn requested_language(&self) -> String {
        self.lock_request().language.clone()
    }

    fn lock_request(&self) -> std::sync::MutexGuard<'_, Request> {
        self.request.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the next generation for `language_code`. Every load started
    /// earlier becomes stale from this point on.
    fn begin(&self, language_code: &str) -> u64 {
        let mut request = self.lock_request();
        request.generation += 1;
        request.language = language_code.to_string();
        request.generation
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that changes whenever the revision is bumped
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Text for `key` in the active language. Never fails.
    pub fn resolve(&self, key: &str, fallback: Option<&str>) -> String {
        let snapshot = self.current();

        snapshot
            .dynamic
            .get(key)
            .or_else(|| snapshot.static_active.get(key))
            .or_else(|| snapshot.static_default.get(key))
            .map(String::as_str)
            .or(fallback)
            .unwrap_or(key)
            .to_string()
    }

    /// Start switching to `language_code` in the background.
    ///
    /// Until the returned task completes, `resolve` keeps serving the previous
    /// language. Callers that don't care about the result can drop the handle.
    /// The switch is ordered at call time, so of two calls the later one
    /// wins however the spawned tasks get scheduled.
    pub fn switch_language(self: &Arc<Self>, language_code: &str) -> JoinHandle<Result<SwitchOutcome>> {
        let generation = self.begin(language_code);
        let this = Arc::clone(self);
        let code = language_code.to_string();
        tokio::spawn(async move { this.load_generation(&code, generation).await })
    }

    /// Switch to `language_code` and wait for the outcome.
    pub async fn switch_language_now(&self, language_code: &str) -> Result<SwitchOutcome> {
        let generation = self.begin(language_code);
        self.load_generation(language_code, generation).await
    }

    /// Re-fetch the requested language. A switch that is still loading is
    /// taken over rather than undone, so the context still ends up on it.
    pub async fn refresh(&self) -> Result<SwitchOutcome> {
        let (language, generation) = {
            let mut request = self.lock_request();
            request.generation += 1;
            (request.language.clone(), request.generation)
        };
        self.load_generation(&language, generation).await
    }

    async fn load_generation(&self, language_code: &str, generation: u64) -> Result<SwitchOutcome> {
        debug!("Loading translations for {} (generation {})", language_code, generation);

        let default_language = self.default_language.as_str();
        let (dynamic, static_active, static_default) = if language_code == default_language {
            let (dynamic, active) = tokio::join!(
                self.source.dynamic_translations(language_code),
                self.source.static_bundle(language_code)
            );
            let default = active.as_ref().ok().cloned();
            (dynamic, active, default)
        } else {
            let (dynamic, active, default) = tokio::join!(
                self.source.dynamic_translations(language_code),
                self.source.static_bundle(language_code),
                self.source.static_bundle(default_language)
            );
            (dynamic, active, default.ok())
        };

        let (dynamic, static_active) = match (dynamic, static_active) {
            (Err(dynamic_err), Err(static_err)) => {
                warn!(
                    "Switch to {} failed: dynamic ({}), static ({})",
                    language_code, dynamic_err, static_err
                );
                // Refreshes go back to the language still on screen
                let active = self.active_language();
                let mut request = self.lock_request();
                if request.generation == generation {
                    request.language = active;
                }
                return Err(dynamic_err);
            }
            (dynamic, static_active) => {
                let dynamic = dynamic.unwrap_or_else(|e| {
                    warn!("Dynamic translations for {} unavailable: {}", language_code, e);
                    DynamicTranslations::new()
                });
                let static_active = static_active.unwrap_or_else(|e| {
                    debug!("No static bundle for {}: {}", language_code, e);
                    Arc::new(StaticDocument::new())
                });
                (dynamic, static_active)
            }
        };

        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        if self.lock_request().generation != generation {
            debug!("Discarding superseded load for {}", language_code);
            return Ok(SwitchOutcome::Superseded);
        }

        // Keep the previous default bundle if it could not be re-fetched
        let static_default = static_default.unwrap_or_else(|| Arc::clone(&guard.static_default));
        *guard = Arc::new(Snapshot {
            language: language_code.to_string(),
            dynamic: Arc::new(dynamic),
            static_active,
            static_default,
        });

        let mut revision = 0;
        self.revision.send_modify(|r| {
            *r += 1;
            revision = *r;
        });
        drop(guard);

        info!("Translations for {} live at revision {}", language_code, revision);
        Ok(SwitchOutcome::Applied(revision))
    }
}
