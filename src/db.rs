use crate::error::{BatchEntryError, BatchOutcome, LocalizationError, Result};
use crate::i18n::{validate_key_name, validate_language_code};
use crate::retry::{with_retry_if, RetryConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, info, warn};

const MAX_LANGUAGE_NAME_LEN: usize = 100;
const MAX_CATEGORY_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Language {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TranslationKey {
    pub id: i64,
    pub key_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Translation {
    pub id: i64,
    pub translation_key_id: i64,
    pub language_id: i64,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable fields of a translation key. There is deliberately no name
/// field: call sites and rows reference keys by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslationKeyPatch {
    pub description: Option<String>,
    pub category: Option<String>,
}

impl TranslationKeyPatch {
    fn is_empty(&self) -> bool {
        self.description.is_none() && self.category.is_none()
    }
}

/// One key with a cell for every active language.
#[derive(Debug, Clone, Serialize)]
pub struct KeyWithTranslations {
    pub id: i64,
    pub key_name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub translations: Vec<TranslationCell>,
}

/// `value` is empty and `translated` false when no row exists for the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationCell {
    pub language_code: String,
    pub language_name: String,
    pub value: String,
    pub translated: bool,
}

/// language code -> key name -> value
pub type ExportMap = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<BatchEntryError>,
    pub outcome: BatchOutcome,
}

const LANGUAGE_COLUMNS: &str = "id, code, name, is_active, created_at";
const KEY_COLUMNS: &str = "id, key_name, description, category, created_at, updated_at";
const TRANSLATION_COLUMNS: &str =
    "id, translation_key_id, language_id, value, created_at, updated_at";

/// Translation repository backed by a SQLite connection pool.
///
/// No translation data is cached here: every read goes to the pool so edits
/// made by other admins are visible immediately.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    retry: RetryConfig,
}

impl Database {
    /// Open (creating if needed) the database and make sure the schema exists
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            retry: RetryConfig::storage(),
        };
        db.create_schema().await?;
        Ok(db)
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn create_schema(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS languages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS translation_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key_name TEXT NOT NULL UNIQUE,
                description TEXT,
                category TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS translations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                translation_key_id INTEGER NOT NULL
                    REFERENCES translation_keys(id) ON DELETE CASCADE,
                language_id INTEGER NOT NULL REFERENCES languages(id),
                value TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (translation_key_id, language_id)
            )",
            "CREATE INDEX IF NOT EXISTS idx_translations_language
                ON translations(language_id)",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Translation schema ready");
        Ok(())
    }

    async fn retrying<T, F, Fut>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry_if(&self.retry, operation, f, LocalizationError::is_transient).await
    }

    // ==================== Languages ====================

    pub async fn list_languages(&self, active_only: bool) -> Result<Vec<Language>> {
        let pool = &self.pool;
        let sql = format!(
            "SELECT {} FROM languages WHERE (?1 = 0 OR is_active = 1) ORDER BY name",
            LANGUAGE_COLUMNS
        );
        let sql = sql.as_str();
        self.retrying("list_languages", move || async move {
            Ok(sqlx::query_as::<_, Language>(sql)
                .bind(active_only)
                .fetch_all(pool)
                .await?)
        })
        .await
    }

    pub async fn find_language_by_code(&self, code: &str) -> Result<Option<Language>> {
        let pool = &self.pool;
        let sql = format!("SELECT {} FROM languages WHERE code = ?1", LANGUAGE_COLUMNS);
        let sql = sql.as_str();
        self.retrying("find_language_by_code", move || async move {
            Ok(sqlx::query_as::<_, Language>(sql)
                .bind(code)
                .fetch_optional(pool)
                .await?)
        })
        .await
    }

    /// Create a language. Conflict when the code already exists.
    pub async fn create_language(&self, code: &str, name: &str, is_active: bool) -> Result<Language> {
        validate_language_code(code)?;
        validate_language_name(name)?;

        let pool = &self.pool;
        let sql = format!(
            "INSERT INTO languages (code, name, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {}",
            LANGUAGE_COLUMNS
        );
        let sql = sql.as_str();
        let language = self
            .retrying("create_language", move || async move {
                sqlx::query_as::<_, Language>(sql)
                    .bind(code)
                    .bind(name)
                    .bind(is_active)
                    .bind(Utc::now())
                    .fetch_one(pool)
                    .await
                    .map_err(|e| unique_to_conflict(e, format!("Language {} already exists", code)))
            })
            .await?;

        info!("Created language {} ({})", language.code, language.name);
        Ok(language)
    }

    /// Create the language if it is missing; existing rows are left untouched
    pub async fn ensure_language(&self, code: &str, name: &str) -> Result<Language> {
        match self.create_language(code, name, true).await {
            Ok(language) => Ok(language),
            Err(LocalizationError::Conflict(_)) => self
                .find_language_by_code(code)
                .await?
                .ok_or_else(|| LocalizationError::NotFound(format!("Language {} not found", code))),
            Err(e) => Err(e),
        }
    }

    /// Rename and/or (de)activate a language. Languages are never deleted.
    pub async fn update_language(
        &self,
        id: i64,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Language> {
        if let Some(name) = name {
            validate_language_name(name)?;
        }

        let pool = &self.pool;
        let sql = format!(
            "UPDATE languages
             SET name = COALESCE(?1, name), is_active = COALESCE(?2, is_active)
             WHERE id = ?3
             RETURNING {}",
            LANGUAGE_COLUMNS
        );
        let sql = sql.as_str();
        self.retrying("update_language", move || async move {
            Ok(sqlx::query_as::<_, Language>(sql)
                .bind(name)
                .bind(is_active)
                .bind(id)
                .fetch_optional(pool)
                .await?)
        })
        .await?
        .ok_or_else(|| LocalizationError::NotFound(format!("Language {} not found", id)))
    }

    // ==================== Translation keys ====================

    pub async fn list_translation_keys(&self) -> Result<Vec<TranslationKey>> {
        let pool = &self.pool;
        let sql = format!(
            "SELECT {} FROM translation_keys ORDER BY category, key_name",
            KEY_COLUMNS
        );
        let sql = sql.as_str();
        self.retrying("list_translation_keys", move || async move {
            Ok(sqlx::query_as::<_, TranslationKey>(sql).fetch_all(pool).await?)
        })
        .await
    }

    pub async fn find_key(&self, id: i64) -> Result<Option<TranslationKey>> {
        let pool = &self.pool;
        let sql = format!("SELECT {} FROM translation_keys WHERE id = ?1", KEY_COLUMNS);
        let sql = sql.as_str();
        self.retrying("find_key", move || async move {
            Ok(sqlx::query_as::<_, TranslationKey>(sql)
                .bind(id)
                .fetch_optional(pool)
                .await?)
        })
        .await
    }

    pub async fn find_key_by_name(&self, key_name: &str) -> Result<Option<TranslationKey>> {
        let pool = &self.pool;
        let sql = format!(
            "SELECT {} FROM translation_keys WHERE key_name = ?1",
            KEY_COLUMNS
        );
        let sql = sql.as_str();
        self.retrying("find_key_by_name", move || async move {
            Ok(sqlx::query_as::<_, TranslationKey>(sql)
                .bind(key_name)
                .fetch_optional(pool)
                .await?)
        })
        .await
    }

    /// Create a key. Conflict on duplicate name, Validation on malformed name.
    pub async fn create_translation_key(
        &self,
        key_name: &str,
        description: Option<&str>,
        category: Option<&str>,
    ) -> Result<TranslationKey> {
        validate_key_name(key_name)?;
        if let Some(category) = category {
            validate_category(category)?;
        }

        let pool = &self.pool;
        let sql = format!(
            "INSERT INTO translation_keys (key_name, description, category, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING {}",
            KEY_COLUMNS
        );
        let sql = sql.as_str();
        let key = self
            .retrying("create_translation_key", move || async move {
                sqlx::query_as::<_, TranslationKey>(sql)
                    .bind(key_name)
                    .bind(description)
                    .bind(category)
                    .bind(Utc::now())
                    .fetch_one(pool)
                    .await
                    .map_err(|e| {
                        unique_to_conflict(e, format!("Translation key {} already exists", key_name))
                    })
            })
            .await?;

        info!("Created translation key {}", key.key_name);
        Ok(key)
    }

    /// Update description and/or category. An empty patch returns the key unchanged.
    pub async fn update_translation_key(
        &self,
        id: i64,
        patch: &TranslationKeyPatch,
    ) -> Result<TranslationKey> {
        if patch.is_empty() {
            return self
                .find_key(id)
                .await?
                .ok_or_else(|| key_not_found(id));
        }
        if let Some(category) = patch.category.as_deref() {
            validate_category(category)?;
        }

        let pool = &self.pool;
        let description = patch.description.as_deref();
        let category = patch.category.as_deref();
        let sql = format!(
            "UPDATE translation_keys
             SET description = COALESCE(?1, description),
                 category = COALESCE(?2, category),
                 updated_at = ?3
             WHERE id = ?4
             RETURNING {}",
            KEY_COLUMNS
        );
        let sql = sql.as_str();
        self.retrying("update_translation_key", move || async move {
            Ok(sqlx::query_as::<_, TranslationKey>(sql)
                .bind(description)
                .bind(category)
                .bind(Utc::now())
                .bind(id)
                .fetch_optional(pool)
                .await?)
        })
        .await?
        .ok_or_else(|| key_not_found(id))
    }

    /// Delete a key together with all of its translations.
    /// Returns the number of translation rows removed.
    pub async fn delete_translation_key(&self, id: i64) -> Result<u64> {
        let pool = &self.pool;
        let removed = self
            .retrying("delete_translation_key", move || async move {
                let mut tx = pool.begin().await?;

                let translations = sqlx::query("DELETE FROM translations WHERE translation_key_id = ?1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();

                let keys = sqlx::query("DELETE FROM translation_keys WHERE id = ?1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();

                if keys == 0 {
                    // Dropping the transaction rolls it back
                    return Err(key_not_found(id));
                }

                tx.commit().await?;
                Ok(translations)
            })
            .await?;

        info!("Deleted translation key {} and {} translations", id, removed);
        Ok(removed)
    }

    // ==================== Translations ====================

    /// Every key crossed with every active language. Pairs without a row are
    /// returned as empty, untranslated cells so an editor can show full
    /// coverage from one call.
    pub async fn list_translations_with_details(&self) -> Result<Vec<KeyWithTranslations>> {
        let languages = self.list_languages(true).await?;
        let keys = self.list_translation_keys().await?;

        let pool = &self.pool;
        let rows: Vec<(i64, i64, String)> = self
            .retrying("list_translations_with_details", move || async move {
                Ok(sqlx::query_as::<_, (i64, i64, String)>(
                    "SELECT t.translation_key_id, t.language_id, t.value
                     FROM translations t
                     JOIN languages l ON l.id = t.language_id
                     WHERE l.is_active = 1",
                )
                .fetch_all(pool)
                .await?)
            })
            .await?;

        let mut values: HashMap<(i64, i64), String> = rows
            .into_iter()
            .map(|(key_id, language_id, value)| ((key_id, language_id), value))
            .collect();

        Ok(keys
            .into_iter()
            .map(|key| {
                let translations = languages
                    .iter()
                    .map(|language| match values.remove(&(key.id, language.id)) {
                        Some(value) => TranslationCell {
                            language_code: language.code.clone(),
                            language_name: language.name.clone(),
                            value,
                            translated: true,
                        },
                        None => TranslationCell {
                            language_code: language.code.clone(),
                            language_name: language.name.clone(),
                            value: String::new(),
                            translated: false,
                        },
                    })
                    .collect();

                KeyWithTranslations {
                    id: key.id,
                    key_name: key.key_name,
                    description: key.description,
                    category: key.category,
                    translations,
                }
            })
            .collect())
    }

    /// Flat key -> value map for one active language. Unknown or inactive
    /// languages yield an empty map.
    pub async fn get_translations_for_language(
        &self,
        language_code: &str,
    ) -> Result<BTreeMap<String, String>> {
        let pool = &self.pool;
        let rows: Vec<(String, String)> = self
            .retrying("get_translations_for_language", move || async move {
                Ok(sqlx::query_as::<_, (String, String)>(
                    "SELECT tk.key_name, t.value
                     FROM translations t
                     JOIN translation_keys tk ON tk.id = t.translation_key_id
                     JOIN languages l ON l.id = t.language_id
                     WHERE l.code = ?1 AND l.is_active = 1",
                )
                .bind(language_code)
                .fetch_all(pool)
                .await?)
            })
            .await?;

        Ok(rows.into_iter().collect())
    }

    /// Insert or update the value for a (key, language) pair.
    ///
    /// The write is one `INSERT .. ON CONFLICT DO UPDATE` statement keyed on
    /// the pair's UNIQUE constraint, so concurrent editors can never create a
    /// second row; the last write wins. Writing the value a row already holds
    /// leaves the row (and its `updated_at`) untouched.
    pub async fn upsert_translation(
        &self,
        key_id: i64,
        language_code: &str,
        value: &str,
    ) -> Result<Translation> {
        let pool = &self.pool;
        let translation = self
            .retrying("upsert_translation", move || async move {
                let mut tx = pool.begin().await?;

                let key_exists: Option<i64> =
                    sqlx::query_scalar("SELECT id FROM translation_keys WHERE id = ?1")
                        .bind(key_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                if key_exists.is_none() {
                    return Err(key_not_found(key_id));
                }

                // Inactive languages are invisible to every read path
                let language_id: i64 = sqlx::query_scalar(
                    "SELECT id FROM languages WHERE code = ?1 AND is_active = 1",
                )
                .bind(language_code)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| language_not_found(language_code))?;

                let translation = upsert_row(&mut tx, key_id, language_id, value).await?;
                tx.commit().await?;
                Ok(translation)
            })
            .await?;

        debug!(
            "Upserted translation key={} language={}",
            key_id, language_code
        );
        Ok(translation)
    }

    /// Remove the translation for a pair. NotFound when no row exists.
    pub async fn delete_translation(&self, key_id: i64, language_code: &str) -> Result<()> {
        let pool = &self.pool;
        let affected = self
            .retrying("delete_translation", move || async move {
                Ok(sqlx::query(
                    "DELETE FROM translations
                     WHERE translation_key_id = ?1
                       AND language_id = (SELECT id FROM languages WHERE code = ?2)",
                )
                .bind(key_id)
                .bind(language_code)
                .execute(pool)
                .await?
                .rows_affected())
            })
            .await?;

        if affected == 0 {
            return Err(LocalizationError::NotFound(format!(
                "No {} translation for key {}",
                language_code, key_id
            )));
        }
        Ok(())
    }

    // ==================== Export / Import ====================

    /// Every existing translation of every active language. Pairs without a
    /// row are not emitted, so an import of this map never invents rows.
    pub async fn export_all(&self) -> Result<ExportMap> {
        let mut export: ExportMap = self
            .list_languages(true)
            .await?
            .into_iter()
            .map(|l| (l.code, BTreeMap::new()))
            .collect();

        let pool = &self.pool;
        let rows: Vec<(String, String, String)> = self
            .retrying("export_all", move || async move {
                Ok(sqlx::query_as::<_, (String, String, String)>(
                    "SELECT l.code, tk.key_name, t.value
                     FROM translations t
                     JOIN translation_keys tk ON tk.id = t.translation_key_id
                     JOIN languages l ON l.id = t.language_id
                     WHERE l.is_active = 1
                     ORDER BY l.code, tk.key_name",
                )
                .fetch_all(pool)
                .await?)
            })
            .await?;

        for (code, key_name, value) in rows {
            export.entry(code).or_default().insert(key_name, value);
        }
        Ok(export)
    }

    /// Apply an export map entry by entry.
    ///
    /// Not transactional across the batch: an unknown language (one error for
    /// the whole language) or an unknown key (one error per entry) is recorded
    /// and the rest keeps going.
    pub async fn import_all(&self, data: &ExportMap) -> Result<ImportReport> {
        let mut imported = 0;
        let mut errors = Vec::new();

        for (language_code, entries) in data {
            let language = match self.find_language_by_code(language_code).await? {
                Some(language) => language,
                None => {
                    let err = language_not_found(language_code);
                    warn!("Import: {}", err);
                    errors.push(BatchEntryError::new(language_code.as_str(), &err));
                    continue;
                }
            };

            for (key_name, value) in entries {
                match self.import_entry(language.id, key_name, value).await {
                    Ok(()) => imported += 1,
                    Err(err) => {
                        warn!("Import {}.{} failed: {}", language_code, key_name, err);
                        errors.push(BatchEntryError::new(
                            format!("{}.{}", language_code, key_name),
                            &err,
                        ));
                    }
                }
            }
        }

        info!("Imported {} translations with {} errors", imported, errors.len());
        Ok(ImportReport {
            imported,
            outcome: BatchOutcome::from_counts(imported, errors.len()),
            errors,
        })
    }

    /// Copy a static bundle into the repository for one language, creating
    /// keys that don't exist yet. Existing values are overwritten.
    pub async fn seed_from_document(
        &self,
        language_code: &str,
        document: &BTreeMap<String, String>,
    ) -> Result<ImportReport> {
        let language = self
            .find_language_by_code(language_code)
            .await?
            .ok_or_else(|| language_not_found(language_code))?;

        let mut imported = 0;
        let mut errors = Vec::new();
        for (key_name, value) in document {
            let seeded = match self.find_key_by_name(key_name).await {
                Ok(Some(_)) => Ok(()),
                Ok(None) => self
                    .create_translation_key(key_name, None, key_name.split_once('.').map(|(c, _)| c))
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            };
            let seeded = match seeded {
                Ok(()) => self.import_entry(language.id, key_name, value).await,
                Err(e) => Err(e),
            };

            match seeded {
                Ok(()) => imported += 1,
                Err(err) => {
                    warn!("Seeding {}.{} failed: {}", language_code, key_name, err);
                    errors.push(BatchEntryError::new(
                        format!("{}.{}", language_code, key_name),
                        &err,
                    ));
                }
            }
        }

        info!(
            "Seeded {} {} translations with {} errors",
            imported,
            language_code,
            errors.len()
        );
        Ok(ImportReport {
            imported,
            outcome: BatchOutcome::from_counts(imported, errors.len()),
            errors,
        })
    }

    async fn import_entry(&self, language_id: i64, key_name: &str, value: &str) -> Result<()> {
        let key = self
            .find_key_by_name(key_name)
            .await?
            .ok_or_else(|| {
                LocalizationError::NotFound(format!("Translation key {} not found", key_name))
            })?;

        let pool = &self.pool;
        let key_id = key.id;
        self.retrying("import_entry", move || async move {
            let mut conn = pool.acquire().await?;
            upsert_row(&mut conn, key_id, language_id, value).await?;
            Ok(())
        })
        .await
    }
}

/// The atomic insert-or-update shared by single edits and imports
async fn upsert_row(
    conn: &mut sqlx::SqliteConnection,
    key_id: i64,
    language_id: i64,
    value: &str,
) -> Result<Translation> {
    let now = Utc::now();
    let upsert_sql = format!(
        "INSERT INTO translations (translation_key_id, language_id, value, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT (translation_key_id, language_id)
         DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
         WHERE translations.value <> excluded.value
         RETURNING {}",
        TRANSLATION_COLUMNS
    );

    let changed = sqlx::query_as::<_, Translation>(&upsert_sql)
        .bind(key_id)
        .bind(language_id)
        .bind(value)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => key_not_found(key_id),
            _ => LocalizationError::Storage(e),
        })?;

    if let Some(translation) = changed {
        return Ok(translation);
    }

    // Same value as before: nothing was written
    let select_sql = format!(
        "SELECT {} FROM translations WHERE translation_key_id = ?1 AND language_id = ?2",
        TRANSLATION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Translation>(&select_sql)
        .bind(key_id)
        .bind(language_id)
        .fetch_one(&mut *conn)
        .await?)
}

fn unique_to_conflict(error: sqlx::Error, message: String) -> LocalizationError {
    match error.as_database_error() {
        Some(db) if db.is_unique_violation() => LocalizationError::Conflict(message),
        _ => LocalizationError::Storage(error),
    }
}

fn key_not_found(id: i64) -> LocalizationError {
    LocalizationError::NotFound(format!("Translation key {} not found", id))
}

fn language_not_found(code: &str) -> LocalizationError {
    LocalizationError::NotFound(format!("Language {} not found", code))
}

fn validate_language_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.chars().count() > MAX_LANGUAGE_NAME_LEN {
        return Err(LocalizationError::Validation(format!(
            "Language name must be 1-{} characters",
            MAX_LANGUAGE_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<()> {
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(LocalizationError::Validation(format!(
            "Category must be at most {} characters",
            MAX_CATEGORY_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    async fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", temp_dir.path().join("test.db").display());
        let db = Database::connect(&url, 4)
            .await
            .expect("Failed to create database")
            .with_retry_config(RetryConfig::immediate(2));
        (db, temp_dir)
    }

    async fn seed(db: &Database) -> (Language, Language, TranslationKey) {
        let en = db.create_language("en", "English", true).await.expect("en");
        let fr = db.create_language("fr", "French", true).await.expect("fr");
        let key = db
            .create_translation_key("nav.tasks", Some("Navigation entry"), Some("nav"))
            .await
            .expect("key");
        (en, fr, key)
    }

    async fn translation_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM translations")
            .fetch_one(&db.pool)
            .await
            .expect("count")
    }

    // ==================== Schema ====================

    #[tokio::test]
    async fn test_database_reopening_keeps_data() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", temp_dir.path().join("reopen.db").display());

        {
            let db = Database::connect(&url, 1).await.expect("create");
            db.create_language("en", "English", true).await.expect("add");
        }

        let db = Database::connect(&url, 1).await.expect("reopen");
        assert_eq!(db.list_languages(false).await.expect("list").len(), 1);
    }

    // ==================== Languages ====================

    #[tokio::test]
    async fn test_create_language_duplicate_is_conflict() {
        let (db, _dir) = create_test_db().await;
        db.create_language("fr", "French", true).await.expect("create");

        let err = db
            .create_language("fr", "Français", true)
            .await
            .expect_err("duplicate");
        assert!(matches!(err, LocalizationError::Conflict(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_create_language_validation() {
        let (db, _dir) = create_test_db().await;
        assert!(matches!(
            db.create_language("French", "French", true).await,
            Err(LocalizationError::Validation(_))
        ));
        assert!(matches!(
            db.create_language("fr", "  ", true).await,
            Err(LocalizationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_languages_active_only() {
        let (db, _dir) = create_test_db().await;
        db.create_language("en", "English", true).await.expect("en");
        let ru = db.create_language("ru", "Russian", true).await.expect("ru");
        db.update_language(ru.id, None, Some(false)).await.expect("deactivate");

        let active = db.list_languages(true).await.expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code, "en");

        let all = db.list_languages(false).await.expect("all");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_language() {
        let (db, _dir) = create_test_db().await;
        let he = db.create_language("he", "Hebrew", true).await.expect("he");

        let updated = db
            .update_language(he.id, Some("Ivrit"), None)
            .await
            .expect("rename");
        assert_eq!(updated.name, "Ivrit");
        assert!(updated.is_active);
        assert_eq!(updated.code, "he");

        let err = db.update_language(999, Some("x"), None).await.expect_err("missing");
        assert!(matches!(err, LocalizationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ensure_language_is_idempotent() {
        let (db, _dir) = create_test_db().await;
        let first = db.ensure_language("en", "English").await.expect("first");
        let second = db.ensure_language("en", "Something else").await.expect("second");
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "English");
    }

    #[tokio::test]
    async fn test_deactivated_language_keeps_translations() {
        let (db, _dir) = create_test_db().await;
        let (_en, fr, key) = seed(&db).await;
        db.upsert_translation(key.id, "fr", "Tâches").await.expect("upsert");

        db.update_language(fr.id, None, Some(false)).await.expect("deactivate");
        assert!(db.get_translations_for_language("fr").await.expect("get").is_empty());

        db.update_language(fr.id, None, Some(true)).await.expect("reactivate");
        let map = db.get_translations_for_language("fr").await.expect("get");
        assert_eq!(map.get("nav.tasks").map(String::as_str), Some("Tâches"));
    }

    #[tokio::test]
    async fn test_upsert_into_inactive_language_is_not_found() {
        let (db, _dir) = create_test_db().await;
        let (_en, fr, key) = seed(&db).await;
        db.update_language(fr.id, None, Some(false)).await.expect("deactivate");

        let err = db
            .upsert_translation(key.id, "fr", "Tâches")
            .await
            .expect_err("inactive language");
        assert!(matches!(err, LocalizationError::NotFound(_)));

        db.update_language(fr.id, None, Some(true)).await.expect("reactivate");
        assert!(db.get_translations_for_language("fr").await.expect("get").is_empty());
    }

    // ==================== Translation keys ====================

    #[tokio::test]
    async fn test_create_key_duplicate_and_malformed() {
        let (db, _dir) = create_test_db().await;
        db.create_translation_key("nav.tasks", None, None).await.expect("create");

        let dup = db
            .create_translation_key("nav.tasks", None, None)
            .await
            .expect_err("duplicate");
        assert!(matches!(dup, LocalizationError::Conflict(_)));

        let bad = db
            .create_translation_key("nav tasks", None, None)
            .await
            .expect_err("malformed");
        assert!(matches!(bad, LocalizationError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_key_keeps_name() {
        let (db, _dir) = create_test_db().await;
        let key = db
            .create_translation_key("task.status.todo", None, Some("task"))
            .await
            .expect("create");

        let patch = TranslationKeyPatch {
            description: Some("Status label".to_string()),
            category: None,
        };
        let updated = db.update_translation_key(key.id, &patch).await.expect("update");

        assert_eq!(updated.key_name, "task.status.todo");
        assert_eq!(updated.description.as_deref(), Some("Status label"));
        assert_eq!(updated.category.as_deref(), Some("task"));
        assert!(updated.updated_at >= key.updated_at);
    }

    #[tokio::test]
    async fn test_update_key_empty_patch_and_missing() {
        let (db, _dir) = create_test_db().await;
        let key = db.create_translation_key("a.b", None, None).await.expect("create");

        let same = db
            .update_translation_key(key.id, &TranslationKeyPatch::default())
            .await
            .expect("noop");
        assert_eq!(same, key);

        let err = db
            .update_translation_key(42, &TranslationKeyPatch::default())
            .await
            .expect_err("missing");
        assert!(matches!(err, LocalizationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_keys_ordered_by_category_then_name() {
        let (db, _dir) = create_test_db().await;
        db.create_translation_key("task.title", None, Some("task")).await.expect("1");
        db.create_translation_key("nav.tasks", None, Some("nav")).await.expect("2");
        db.create_translation_key("nav.home", None, Some("nav")).await.expect("3");

        let names: Vec<String> = db
            .list_translation_keys()
            .await
            .expect("list")
            .into_iter()
            .map(|k| k.key_name)
            .collect();
        assert_eq!(names, vec!["nav.home", "nav.tasks", "task.title"]);
    }

    #[tokio::test]
    async fn test_delete_key_cascades_translations() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;
        let other = db.create_translation_key("nav.home", None, None).await.expect("other");

        db.upsert_translation(key.id, "en", "Tasks").await.expect("en");
        db.upsert_translation(key.id, "fr", "Tâches").await.expect("fr");
        db.upsert_translation(other.id, "fr", "Accueil").await.expect("other");

        let removed = db.delete_translation_key(key.id).await.expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(translation_count(&db).await, 1);

        for code in ["en", "fr"] {
            let map = db.get_translations_for_language(code).await.expect("get");
            assert!(!map.contains_key("nav.tasks"));
        }
        assert!(db.find_key(key.id).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_not_found() {
        let (db, _dir) = create_test_db().await;
        let err = db.delete_translation_key(7).await.expect_err("missing");
        assert!(matches!(err, LocalizationError::NotFound(_)));
    }

    // ==================== Translations ====================

    #[tokio::test]
    async fn test_french_scenario() {
        let (db, _dir) = create_test_db().await;
        db.create_language("fr", "French", true).await.expect("fr");
        let key = db.create_translation_key("nav.tasks", None, None).await.expect("key");

        db.upsert_translation(key.id, "fr", "Tâches").await.expect("upsert");

        let map = db.get_translations_for_language("fr").await.expect("get");
        let expected: BTreeMap<String, String> =
            [("nav.tasks".to_string(), "Tâches".to_string())].into_iter().collect();
        assert_eq!(map, expected);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;

        let first = db.upsert_translation(key.id, "fr", "Tâches").await.expect("first");
        let second = db.upsert_translation(key.id, "fr", "Tâches").await.expect("second");

        assert_eq!(first, second, "re-applying a value must not touch the row");
        assert_eq!(translation_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;

        let first = db.upsert_translation(key.id, "fr", "Taches").await.expect("first");
        let second = db.upsert_translation(key.id, "fr", "Tâches").await.expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(second.value, "Tâches");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(translation_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_empty_string_is_a_translation() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;

        db.upsert_translation(key.id, "fr", "").await.expect("upsert");
        let map = db.get_translations_for_language("fr").await.expect("get");
        assert_eq!(map.get("nav.tasks").map(String::as_str), Some(""));
    }

    #[tokio::test]
    async fn test_upsert_unknown_key_or_language() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;

        let err = db.upsert_translation(key.id, "xx", "v").await.expect_err("language");
        assert!(matches!(err, LocalizationError::NotFound(_)));

        let err = db.upsert_translation(999, "fr", "v").await.expect_err("key");
        assert!(matches!(err, LocalizationError::NotFound(_)));
        assert_eq!(translation_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_never_duplicate_rows() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;
        let db = db.with_retry_config(RetryConfig::new(10, std::time::Duration::from_millis(5)));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let db = db.clone();
                let key_id = key.id;
                tokio::spawn(async move {
                    db.upsert_translation(key_id, "fr", &format!("value {}", i))
                        .await
                        .expect("upsert")
                })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join");
        }

        assert_eq!(translation_count(&db).await, 1);
        let map = db.get_translations_for_language("fr").await.expect("get");
        assert!(map["nav.tasks"].starts_with("value "));
    }

    #[tokio::test]
    async fn test_delete_translation() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;
        db.upsert_translation(key.id, "fr", "Tâches").await.expect("upsert");

        db.delete_translation(key.id, "fr").await.expect("delete");
        assert!(db.get_translations_for_language("fr").await.expect("get").is_empty());

        let err = db.delete_translation(key.id, "fr").await.expect_err("gone");
        assert!(matches!(err, LocalizationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_with_details_covers_every_pair() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;
        db.create_translation_key("nav.home", None, Some("nav")).await.expect("home");
        let ru = db.create_language("ru", "Russian", true).await.expect("ru");
        db.update_language(ru.id, None, Some(false)).await.expect("deactivate");
        db.upsert_translation(key.id, "fr", "Tâches").await.expect("upsert");

        let rows = db.list_translations_with_details().await.expect("details");
        assert_eq!(rows.len(), 2);
        for row in &rows {
            // Inactive Russian is excluded, English and French are always present
            assert_eq!(row.translations.len(), 2);
        }

        let tasks = rows.iter().find(|r| r.key_name == "nav.tasks").expect("tasks");
        let fr = tasks
            .translations
            .iter()
            .find(|c| c.language_code == "fr")
            .expect("fr cell");
        assert!(fr.translated);
        assert_eq!(fr.value, "Tâches");
        let en = tasks
            .translations
            .iter()
            .find(|c| c.language_code == "en")
            .expect("en cell");
        assert!(!en.translated);
        assert_eq!(en.value, "");
    }

    // ==================== Export / Import ====================

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let (source, _dir1) = create_test_db().await;
        let (_en, _fr, key) = seed(&source).await;
        let home = source.create_translation_key("nav.home", None, None).await.expect("home");
        source.upsert_translation(key.id, "en", "Tasks").await.expect("1");
        source.upsert_translation(key.id, "fr", "Tâches").await.expect("2");
        source.upsert_translation(home.id, "en", "Home").await.expect("3");

        let export = source.export_all().await.expect("export");
        assert_eq!(export["fr"].len(), 1, "missing pairs are not exported");

        let (target, _dir2) = create_test_db().await;
        seed(&target).await;
        target.create_translation_key("nav.home", None, None).await.expect("home");

        let report = target.import_all(&export).await.expect("import");
        assert_eq!(report.imported, 3);
        assert!(report.errors.is_empty());
        assert_eq!(report.outcome, BatchOutcome::Complete);

        assert_eq!(target.export_all().await.expect("export"), export);
    }

    #[tokio::test]
    async fn test_import_continues_past_unknown_language() {
        let (db, _dir) = create_test_db().await;
        db.create_language("fr", "French", true).await.expect("fr");
        db.create_language("de", "German", true).await.expect("de");

        let mut data = ExportMap::new();
        for i in 0..5 {
            let name = format!("key.k{}", i);
            db.create_translation_key(&name, None, None).await.expect("key");
            data.entry("fr".to_string())
                .or_default()
                .insert(name.clone(), format!("fr {}", i));
            if i < 4 {
                data.entry("de".to_string())
                    .or_default()
                    .insert(name, format!("de {}", i));
            }
        }
        data.entry("xx".to_string())
            .or_default()
            .insert("key.k0".to_string(), "??".to_string());

        let report = db.import_all(&data).await.expect("import");
        assert_eq!(report.imported, 9);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].entry, "xx");
        assert_eq!(report.outcome, BatchOutcome::PartialBatchFailure);
        assert_eq!(translation_count(&db).await, 9);
    }

    #[tokio::test]
    async fn test_seed_from_document_creates_keys() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, key) = seed(&db).await;
        db.upsert_translation(key.id, "en", "Old").await.expect("existing");

        let mut document = BTreeMap::new();
        document.insert("nav.tasks".to_string(), "Tasks".to_string());
        document.insert("task.status.todo".to_string(), "To do".to_string());
        document.insert("bad key".to_string(), "x".to_string());

        let report = db.seed_from_document("en", &document).await.expect("seed");
        assert_eq!(report.imported, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, crate::error::ErrorKind::Validation);

        let created = db
            .find_key_by_name("task.status.todo")
            .await
            .expect("find")
            .expect("created");
        assert_eq!(created.category.as_deref(), Some("task"));

        let en = db.get_translations_for_language("en").await.expect("en");
        assert_eq!(en["nav.tasks"], "Tasks");
        assert_eq!(en["task.status.todo"], "To do");
    }

    #[tokio::test]
    async fn test_seed_from_document_unknown_language() {
        let (db, _dir) = create_test_db().await;
        let err = db
            .seed_from_document("xx", &BTreeMap::new())
            .await
            .expect_err("unknown language");
        assert!(matches!(err, LocalizationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_import_unknown_key_is_itemized() {
        let (db, _dir) = create_test_db().await;
        let (_en, _fr, _key) = seed(&db).await;

        let mut data = ExportMap::new();
        let fr = data.entry("fr".to_string()).or_default();
        fr.insert("nav.tasks".to_string(), "Tâches".to_string());
        fr.insert("nav.missing".to_string(), "?".to_string());

        let report = db.import_all(&data).await.expect("import");
        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].entry, "fr.nav.missing");
        assert_eq!(report.errors[0].kind, crate::error::ErrorKind::NotFound);
    }
}
