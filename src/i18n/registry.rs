//! Locale registry: display metadata for the languages translators work with.
//!
//! The authoritative list of languages lives in the database; this registry
//! only knows how to *name* a code in prompts and which scripts run
//! right-to-left. Unknown codes fall back to the code itself.

use serde::Serialize;
use std::sync::OnceLock;

/// Display metadata for a locale.
#[derive(Debug, Clone, Serialize)]
pub struct LocaleInfo {
    /// ISO 639-1 language code (e.g., "en", "he")
    pub code: &'static str,

    /// English name of the language (e.g., "Hebrew")
    pub name: &'static str,

    /// Native name of the language (e.g., "עברית")
    pub native_name: &'static str,

    /// Whether the script is written right-to-left
    pub rtl: bool,
}

/// Global locale registry singleton.
pub struct LocaleRegistry {
    locales: Vec<LocaleInfo>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global registry, initializing it on first access.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: known_locales(),
        })
    }

    /// Look up a locale by code. Region subtags ("pt-BR") fall back to the
    /// primary language.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleInfo> {
        let primary = code.split('-').next().unwrap_or(code);
        self.locales
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(code))
            .or_else(|| self.locales.iter().find(|l| l.code.eq_ignore_ascii_case(primary)))
    }

    /// English display name for prompts; the code itself when unknown.
    pub fn display_name<'a>(&self, code: &'a str) -> &'a str {
        match self.get_by_code(code) {
            Some(info) => info.name,
            None => code,
        }
    }

    pub fn list_all(&self) -> &[LocaleInfo] {
        &self.locales
    }
}

fn known_locales() -> Vec<LocaleInfo> {
    vec![
        LocaleInfo { code: "en", name: "English", native_name: "English", rtl: false },
        LocaleInfo { code: "he", name: "Hebrew", native_name: "עברית", rtl: true },
        LocaleInfo { code: "ru", name: "Russian", native_name: "Русский", rtl: false },
        LocaleInfo { code: "es", name: "Spanish", native_name: "Español", rtl: false },
        LocaleInfo { code: "fr", name: "French", native_name: "Français", rtl: false },
        LocaleInfo { code: "de", name: "German", native_name: "Deutsch", rtl: false },
        LocaleInfo { code: "ar", name: "Arabic", native_name: "العربية", rtl: true },
    ]
}
