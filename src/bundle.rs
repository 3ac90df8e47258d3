//! Static locale bundle store.
//!
//! One flat `key -> text` JSON document per language at `<dir>/<code>.json`.
//! Documents are replaced wholesale; every overwrite first copies the live
//! file to `<code>.json.backup.<UTC timestamp>` and backups are never pruned.
//! Parsed documents are cached in-process and the entry is dropped as part of
//! every write, so a read that follows a write always sees the new content.

use crate::error::{LocalizationError, Result};
use crate::i18n::{validate_key_name, validate_language_code};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// Flat key -> text document. Ordered so files diff cleanly.
pub type StaticDocument = BTreeMap<String, String>;

const BACKUP_MARKER: &str = ".json.backup.";

#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    pub language_code: String,
    pub updated_keys: usize,
    pub backup_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<String>,
}

pub struct BundleStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<StaticDocument>>>,
    // One writer per language file; cache fills take the same lock so a
    // slow read can never re-insert content a write has just replaced.
    file_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl BundleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
            file_locks: Mutex::new(HashMap::new()),
        }
    }

    fn document_path(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{}.json", code))
    }

    fn file_lock(&self, code: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.file_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(code.to_string()).or_default().clone()
    }

    fn cached(&self, code: &str) -> Option<Arc<StaticDocument>> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.get(code).cloned()
    }

    /// Drop the cached copy of a document.
    pub fn invalidate(&self, code: &str) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.remove(code);
    }

    /// Read the document for a language. NotFound when no file exists.
    pub async fn read(&self, code: &str) -> Result<Arc<StaticDocument>> {
        validate_language_code(code)?;

        if let Some(doc) = self.cached(code) {
            return Ok(doc);
        }

        let lock = self.file_lock(code);
        let _guard = lock.lock().await;

        // Another reader may have filled the cache while we waited
        if let Some(doc) = self.cached(code) {
            return Ok(doc);
        }

        let path = self.document_path(code);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LocalizationError::NotFound(format!(
                    "Translation file not found for language: {}",
                    code
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let doc: StaticDocument = serde_json::from_str(&raw)?;
        debug!("Loaded {} static translations for {}", doc.len(), code);

        let doc = Arc::new(doc);
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(code.to_string(), Arc::clone(&doc));
        Ok(doc)
    }

    /// Replace the whole document for a language.
    ///
    /// The previous file (if any) is backed up first; a failed backup aborts
    /// the write. The new content goes through a temp file and a rename so a
    /// crash never leaves a half-written bundle behind.
    pub async fn write(&self, code: &str, document: &StaticDocument) -> Result<WriteReceipt> {
        validate_language_code(code)?;
        for key in document.keys() {
            validate_key_name(key)?;
        }

        let lock = self.file_lock(code);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.document_path(code);

        let backup_file = match tokio::fs::metadata(&path).await {
            Ok(_) => Some(self.create_backup(code, &path).await?),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut body = serde_json::to_string_pretty(document)?;
        body.push('\n');

        let tmp_path = self.dir.join(format!("{}.json.tmp", code));
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        self.invalidate(code);

        info!(
            "Saved {} static translations for {} (backup: {})",
            document.len(),
            code,
            backup_file.as_deref().unwrap_or("none, new file")
        );

        Ok(WriteReceipt {
            language_code: code.to_string(),
            updated_keys: document.len(),
            backup_created: backup_file.is_some(),
            backup_file,
        })
    }

    async fn create_backup(&self, code: &str, live: &Path) -> Result<String> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let mut name = format!("{}{}{}", code, BACKUP_MARKER, stamp);
        let mut suffix = 1;
        while tokio::fs::try_exists(self.dir.join(&name)).await? {
            name = format!("{}{}{}-{}", code, BACKUP_MARKER, stamp, suffix);
            suffix += 1;
        }

        tokio::fs::copy(live, self.dir.join(&name)).await?;
        debug!("Backup created: {}", name);
        Ok(name)
    }

    /// Codes of all languages that have a bundle file, sorted.
    pub async fn available_languages(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut codes = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(code) = name.strip_suffix(".json") {
                if validate_language_code(code).is_ok() {
                    codes.push(code.to_string());
                }
            }
        }
        codes.sort();
        Ok(codes)
    }

    /// Backup file names for a language, newest first.
    pub async fn list_backups(&self, code: &str) -> Result<Vec<String>> {
        validate_language_code(code)?;

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}{}", code, BACKUP_MARKER);
        let mut backups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    backups.push(name.to_string());
                }
            }
        }
        backups.sort_by(|a, b| b.cmp(a));
        Ok(backups)
    }
}
