//! Draft quality validation.
//!
//! UI strings carry interpolation placeholders (`{count}`, `{{name}}`) and
//! occasional inline markup (`<strong>`). An AI draft that drops or renames
//! them would break rendering once accepted, so drafts are checked against
//! their source text and the findings are reported alongside the candidate.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a draft.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
    /// Problems that will break rendering (lost placeholders)
    pub errors: Vec<String>,

    /// Suspicious differences worth a human look
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

pub struct DraftValidator;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

impl DraftValidator {
    /// Compare a draft against the text it was generated from.
    pub fn validate(source: &str, draft: &str) -> ValidationReport {
        let mut report = ValidationReport::default();

        let source_placeholders = Self::extract_placeholders(source);
        let draft_placeholders = Self::extract_placeholders(draft);
        let missing: Vec<_> = source_placeholders.difference(&draft_placeholders).collect();
        if !missing.is_empty() {
            report
                .errors
                .push(format!("Draft is missing placeholders {:?}", missing));
        }
        let unexpected: Vec<_> = draft_placeholders.difference(&source_placeholders).collect();
        if !unexpected.is_empty() {
            report
                .warnings
                .push(format!("Draft introduces placeholders {:?}", unexpected));
        }

        let source_tags = Self::extract_tags(source);
        let draft_tags = Self::extract_tags(draft);
        if source_tags != draft_tags {
            report.warnings.push(format!(
                "Markup mismatch: source has {:?}, draft has {:?}",
                source_tags, draft_tags
            ));
        }

        if draft.trim() != draft {
            report
                .warnings
                .push("Draft has leading or trailing whitespace".to_string());
        }

        if Self::is_quoted(draft) && !Self::is_quoted(source) {
            report
                .warnings
                .push("Draft is wrapped in quotes that the source does not have".to_string());
        }

        report
    }

    /// `{name}` and `{{name}}` placeholders, normalized to their inner name
    fn extract_placeholders(text: &str) -> BTreeSet<String> {
        let regex = PLACEHOLDER_REGEX.get_or_init(|| {
            Regex::new(r"\{\{?\s*([A-Za-z0-9_.]+)\s*\}?\}").expect("placeholder regex is valid")
        });

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    /// Opening and closing tag names in order of appearance
    fn extract_tags(text: &str) -> Vec<String> {
        let regex = TAG_REGEX.get_or_init(|| {
            Regex::new(r"</?([A-Za-z][A-Za-z0-9]*)[^>]*>").expect("tag regex is valid")
        });

        regex
            .find_iter(text)
            .map(|m| {
                let raw = m.as_str();
                let closing = raw.starts_with("</");
                let name = raw
                    .trim_start_matches('<')
                    .trim_start_matches('/')
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .next()
                    .unwrap_or("")
                    .to_lowercase();
                if closing {
                    format!("/{}", name)
                } else {
                    name
                }
            })
            .collect()
    }

    fn is_quoted(text: &str) -> bool {
        let t = text.trim();
        t.len() >= 2
            && ((t.starts_with('"') && t.ends_with('"'))
                || (t.starts_with('«') && t.ends_with('»'))
                || (t.starts_with('“') && t.ends_with('”')))
    }
}
