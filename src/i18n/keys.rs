use crate::error::{LocalizationError, Result};
use regex::Regex;
use std::sync::OnceLock;

const MAX_KEY_NAME_LEN: usize = 255;
const MAX_LANGUAGE_CODE_LEN: usize = 10;

static KEY_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
static LANGUAGE_CODE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Validate a dot-namespaced key name such as `nav.tasks` or `message.confirm_delete`.
pub fn validate_key_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LocalizationError::Validation(
            "Translation key name is required".to_string(),
        ));
    }
    if name.len() > MAX_KEY_NAME_LEN {
        return Err(LocalizationError::Validation(format!(
            "Translation key name must be at most {} characters",
            MAX_KEY_NAME_LEN
        )));
    }

    let regex = KEY_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").expect("key name regex is valid")
    });
    if !regex.is_match(name) {
        return Err(LocalizationError::Validation(format!(
            "Malformed translation key '{}': use dot-separated segments of letters, digits, '_' or '-'",
            name
        )));
    }
    Ok(())
}

/// Validate a language code such as `en`, `he` or `pt-BR`.
///
/// Codes double as bundle file names, so anything outside this shape
/// (path separators, dots) is rejected here.
pub fn validate_language_code(code: &str) -> Result<()> {
    let regex = LANGUAGE_CODE_REGEX.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("language code regex is valid")
    });
    if code.len() > MAX_LANGUAGE_CODE_LEN || !regex.is_match(code) {
        return Err(LocalizationError::Validation(format!(
            "Invalid language code '{}'",
            code
        )));
    }
    Ok(())
}

/// Turn a key into readable source text for the AI generator when no real
/// source translation exists: last dot segment, camelCase and snake_case
/// split into lower-case words.
///
/// `task.status.todo` → `todo`, `admin.yourName` → `your name`,
/// `message.confirm_delete` → `confirm delete`. Falls back to the whole key
/// when nothing readable is left.
pub fn humanize_key(key: &str) -> String {
    let last = key.rsplit('.').next().unwrap_or(key);

    let chars: Vec<char> = last.chars().collect();
    let mut spaced = String::with_capacity(last.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            // "yourName" -> "your Name", "HTTPError" -> "HTTP Error"
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                spaced.push(' ');
            }
        }
        if c == '_' || c == '-' {
            spaced.push(' ');
        } else {
            spaced.push(c);
        }
    }

    let readable = spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if readable.is_empty() {
        key.to_string()
    } else {
        readable
    }
}
