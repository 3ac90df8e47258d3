use anyhow::{Context, Result};
use localization_service::audit::TracingAuditSink;
use localization_service::bundle::BundleStore;
use localization_service::config::Config;
use localization_service::db::Database;
use localization_service::generator::Generator;
use localization_service::openai::OpenAiClient;
use localization_service::server::{self, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localization_service=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        "Starting localization service ({}, default language {})",
        config.environment, config.default_language
    );

    let db = Database::connect(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to open translation database")?;

    for (code, name) in &config.seed_languages {
        db.ensure_language(code, name)
            .await
            .with_context(|| format!("Failed to seed language {}", code))?;
    }

    let bundles = Arc::new(BundleStore::new(&config.locales_dir));
    let available = bundles.available_languages().await?;
    info!("Static bundles available: {:?}", available);
    if !available.contains(&config.default_language) {
        warn!(
            "No static bundle for default language {} in {}",
            config.default_language, config.locales_dir
        );
    }

    let client = OpenAiClient::from_config(&config);
    if !client.is_configured() {
        warn!("OPENAI_API_KEY not set, AI translation endpoints will fail");
    }
    if config.api_key.is_none() && config.is_production() {
        warn!("API_KEY not set in production, identity headers are trusted as-is");
    }

    let generator = Arc::new(
        Generator::new(
            client,
            db.clone(),
            Arc::clone(&bundles),
            config.default_language.clone(),
        )
        .with_default_targets(config.ai_default_targets.clone()),
    );

    let state = AppState {
        db,
        bundles,
        generator,
        audit: Arc::new(TracingAuditSink),
        api_key: config.api_key.clone(),
    };

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    server::serve(listener, state).await
}
