//! HTTP surface: public read endpoints, the admin CRUD surface, static bundle
//! editing and AI drafting.

mod admin;
mod ai;
mod bundles;
pub mod identity;
mod public;
pub mod response;

use crate::audit::{AuditEvent, AuditSink};
use crate::bundle::BundleStore;
use crate::db::Database;
use crate::error::Result as LocalizationResult;
use crate::generator::Generator;
use axum::routing::{get, post, put};
use axum::Router;
use identity::AdminUser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub bundles: Arc<BundleStore>,
    pub generator: Arc<Generator>,
    pub audit: Arc<dyn AuditSink>,
    pub api_key: Option<String>,
}

impl AppState {
    /// Record the outcome of an admin mutation, success or failure
    pub(crate) fn audit<T>(
        &self,
        admin: &AdminUser,
        action: &str,
        resource: impl Into<String>,
        result: &LocalizationResult<T>,
    ) {
        let event = AuditEvent::new(admin.id(), action, resource);
        let event = match result {
            Ok(_) => event,
            Err(e) => event.failed(e.to_string()),
        };
        self.audit.record(event);
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(public::health))
        // Public reads
        .route("/api/translations/languages", get(public::list_languages))
        .route("/api/translations/:code", get(public::get_translations))
        .route("/api/static-translations/languages", get(public::list_static_languages))
        .route(
            "/api/static-translations/:code",
            get(public::get_static).put(bundles::put_static),
        )
        .route("/api/static-translations/:code/backups", get(bundles::list_backups))
        // Admin CRUD
        .route(
            "/api/admin/languages",
            get(admin::list_languages).post(admin::create_language),
        )
        .route("/api/admin/languages/:id", put(admin::update_language))
        .route(
            "/api/admin/translation-keys",
            get(admin::list_keys).post(admin::create_key),
        )
        .route(
            "/api/admin/translation-keys/:id",
            put(admin::update_key).delete(admin::delete_key),
        )
        .route("/api/admin/translations", get(admin::list_translations))
        .route("/api/admin/translations/export", get(admin::export_translations))
        .route("/api/admin/translations/import", post(admin::import_translations))
        .route(
            "/api/admin/translations/:key_id/:code",
            put(admin::upsert_translation).delete(admin::delete_translation),
        )
        // AI drafting
        .route("/api/ai-translations/generate", post(ai::generate))
        .route("/api/ai-translations/generate-bulk", post(ai::generate_bulk))
        .route("/api/ai-translations/generate-batch", post(ai::generate_batch))
        .route("/api/ai-translations/accept", post(ai::accept))
        .route("/api/ai-translations/validate", get(ai::validate))
        .route("/api/ai-translations/metrics", get(ai::metrics))
        .route("/api/ai-translations/languages", get(ai::languages))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until ctrl-c / SIGTERM
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
