//! Localization service for the task manager.
//!
//! - [`db`]: translation repository (languages, keys, per-language values)
//! - [`bundle`]: static per-language JSON bundles with retained backups
//! - [`generator`]: AI-drafted translations through a chat-completions provider
//! - [`resolver`]: client-side key resolution with a fixed fallback chain
//! - [`server`]: public and admin HTTP API

pub mod audit;
pub mod bundle;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod i18n;
pub mod openai;
pub mod resolver;
pub mod retry;
pub mod security;
pub mod server;

pub use error::{LocalizationError, Result};
