//! Locale-level building blocks shared by the repository, the bundle store
//! and the AI generator.
//!
//! # Architecture
//!
//! - `registry`: Known locales with display names and script direction, used for prompts
//! - `keys`: Validation of language codes and translation key names, plus the key-to-text heuristic
//! - `validator`: Placeholder/markup preservation checks for AI drafts
//! - `metrics`: Counters for provider calls and accepted drafts
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::i18n::{humanize_key, LocaleRegistry};
//!
//! assert_eq!(humanize_key("message.confirm_delete"), "confirm delete");
//! assert_eq!(LocaleRegistry::get().display_name("he"), "Hebrew");
//! ```

mod keys;
mod metrics;
mod registry;
mod validator;

pub use keys::{humanize_key, validate_key_name, validate_language_code};
pub use metrics::{GenerationMetrics, MetricsReport};
pub use registry::{LocaleInfo, LocaleRegistry};
pub use validator::{DraftValidator, ValidationReport};
