use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Environment (e.g., "production", "development", "test")
    pub environment: String,

    // Server
    pub port: u16,

    // Database
    pub database_url: String,
    pub db_max_connections: u32,

    // Static locale bundles
    pub locales_dir: String,
    pub default_language: String,

    // OpenAI (optional - AI endpoints report a provider error when unset)
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub openai_temperature: f32,
    pub ai_max_tokens: u32,
    // Targets for bulk generation when a request names none
    pub ai_default_targets: Vec<String>,

    // Shared bearer token required in front of the identity headers (optional)
    pub api_key: Option<String>,

    // Languages created on startup when missing, "code:Name" pairs
    pub seed_languages: Vec<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse().context("PORT must be a valid port number")?,
            Err(_) => 3000,
        };

        let openai_temperature: f32 = match std::env::var("OPENAI_TEMPERATURE") {
            Ok(v) => v
                .parse()
                .context("OPENAI_TEMPERATURE must be a number")?,
            Err(_) => 0.3,
        };
        if !(0.0..=2.0).contains(&openai_temperature) {
            anyhow::bail!(
                "OPENAI_TEMPERATURE must be between 0.0 and 2.0, got {}",
                openai_temperature
            );
        }

        let db_max_connections = match std::env::var("DB_MAX_CONNECTIONS") {
            Ok(v) => v
                .parse()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            Err(_) => 5,
        };
        let ai_max_tokens = match std::env::var("AI_MAX_TOKENS") {
            Ok(v) => v.parse().context("AI_MAX_TOKENS must be a positive integer")?,
            Err(_) => 200,
        };

        Ok(Self {
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            port,

            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/translations.db?mode=rwc".to_string()),
            db_max_connections,

            locales_dir: std::env::var("LOCALES_DIR").unwrap_or_else(|_| "locales".to_string()),
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),

            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            openai_temperature,
            ai_max_tokens,
            ai_default_targets: std::env::var("AI_DEFAULT_TARGETS")
                .unwrap_or_else(|_| "he,ru".to_string())
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect(),

            api_key: std::env::var("API_KEY").ok().filter(|k| !k.is_empty()),

            seed_languages: parse_seed_languages(
                &std::env::var("SEED_LANGUAGES").unwrap_or_else(|_| "en:English".to_string()),
            )?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Parse "en:English,fr:French" into (code, name) pairs
fn parse_seed_languages(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (code, name) = pair
                .split_once(':')
                .with_context(|| format!("Invalid SEED_LANGUAGES entry '{}', expected code:Name", pair))?;
            Ok((code.trim().to_string(), name.trim().to_string()))
        })
        .collect()
}
