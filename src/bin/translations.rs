//! Offline maintenance for the translation database.
//!
//! Usage:
//!   cargo run --bin translations -- export <file>            # Write every active language to JSON
//!   cargo run --bin translations -- import <file>            # Apply a JSON export entry by entry
//!   cargo run --bin translations -- seed-from-bundle <code>  # Copy a static bundle into the database
//!
//! Uses the same environment as the server:
//! - DATABASE_URL (defaults to sqlite://data/translations.db?mode=rwc)
//! - LOCALES_DIR (defaults to locales)

use anyhow::{bail, Context, Result};
use localization_service::bundle::BundleStore;
use localization_service::config::Config;
use localization_service::db::{Database, ExportMap, ImportReport};
use std::path::Path;
use tracing::info;

const USAGE: &str = "usage: translations <export FILE | import FILE | seed-from-bundle CODE>";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localization_service=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, argument) = match args.as_slice() {
        [command, argument] => (command.as_str(), argument.as_str()),
        _ => bail!(USAGE),
    };

    let config = Config::from_env()?;
    let db = Database::connect(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to open translation database")?;

    match command {
        "export" => export(&db, Path::new(argument)).await,
        "import" => import(&db, Path::new(argument)).await,
        "seed-from-bundle" => seed_from_bundle(&db, &config, argument).await,
        _ => bail!(USAGE),
    }
}

async fn export(db: &Database, path: &Path) -> Result<()> {
    let data = db.export_all().await?;
    let total: usize = data.values().map(|m| m.len()).sum();

    let mut body = serde_json::to_string_pretty(&data)?;
    body.push('\n');
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        "Exported {} translations in {} languages to {}",
        total,
        data.len(),
        path.display()
    );
    Ok(())
}

async fn import(db: &Database, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data: ExportMap = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a translation export", path.display()))?;

    let report = db.import_all(&data).await?;
    print_report("Imported", &report);
    Ok(())
}

async fn seed_from_bundle(db: &Database, config: &Config, code: &str) -> Result<()> {
    let bundles = BundleStore::new(&config.locales_dir);
    let document = bundles.read(code).await?;

    let report = db.seed_from_document(code, &document).await?;
    print_report("Seeded", &report);
    Ok(())
}

fn print_report(verb: &str, report: &ImportReport) {
    println!("{} {} translations", verb, report.imported);
    for error in &report.errors {
        println!("  {}: {}", error.entry, error.message);
    }
}
