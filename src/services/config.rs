// Configuration service
//
// Design Decision: environment variables with in-memory caching
//
// Rationale: sensitive data (provider credentials) comes from environment
// variables (via a .env file in development, never from versioned files);
// everything else is optional with sensible defaults. Configuration is
// read once at startup and cached, so the rest of the process sees one
// consistent view.
//
// Provider credentials themselves are resolved inside the llm layer
// (absence of a key simply skips that provider during auto-detection);
// this service only decides the mode and the cross-cutting options.

use crate::error::{PolybotError, Result};
use crate::llm::{ProviderKind, ProviderSettings};
use std::collections::HashMap;
use std::path::PathBuf;

/// Provider selection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Initialize every provider with a discoverable credential
    Auto,
    /// Force exactly one provider, bypassing auto-detection
    Manual(ProviderKind),
}

/// Application configuration loaded from the environment
///
/// Environment variables:
/// - `POLYBOT_PROVIDER` (optional): force a single provider ("openai",
///   "gemini", "claude"); absent means auto-detection
/// - `POLYBOT_MODEL` (optional): default model override for all providers
/// - `POLYBOT_TEMPERATURE` (optional): default sampling temperature
/// - `BRAVE_API_KEY` (optional): web search credential; research and
///   summarization degrade without it
/// - `POLYBOT_REPORTS_DIR` (optional): report output directory, default "reports"
/// - `POLYBOT_DB` (optional): plan database path, default "polybot.db"
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: ProviderMode,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub brave_api_key: String,
    pub reports_dir: PathBuf,
    pub db_path: PathBuf,
    pub search_result_count: usize,
}

impl AppConfig {
    /// Load configuration from the environment (and .env, if present)
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mode = match std::env::var("POLYBOT_PROVIDER") {
            Ok(name) if !name.trim().is_empty() => ProviderMode::Manual(name.trim().parse()?),
            _ => ProviderMode::Auto,
        };

        let model = std::env::var("POLYBOT_MODEL").ok().filter(|m| !m.is_empty());

        let temperature = match std::env::var("POLYBOT_TEMPERATURE") {
            Ok(raw) => Some(raw.parse::<f32>().map_err(|_| {
                PolybotError::ConfigError(format!("invalid POLYBOT_TEMPERATURE: {raw}"))
            })?),
            Err(_) => None,
        };

        let brave_api_key = std::env::var("BRAVE_API_KEY").unwrap_or_default();

        let reports_dir = std::env::var("POLYBOT_REPORTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("reports"));

        let db_path = std::env::var("POLYBOT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("polybot.db"));

        Ok(Self {
            mode,
            model,
            temperature,
            brave_api_key,
            reports_dir,
            db_path,
            search_result_count: 5,
        })
    }

    /// Per-provider settings derived from the cross-cutting options.
    /// Credentials stay unset here so adapters resolve them from their
    /// own environment variables.
    pub fn provider_settings(&self) -> HashMap<ProviderKind, ProviderSettings> {
        ProviderKind::PRIORITY
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    ProviderSettings {
                        api_key: None,
                        model: self.model.clone(),
                        temperature: self.temperature,
                        max_tokens: None,
                    },
                )
            })
            .collect()
    }

    /// Settings for the forced provider in manual mode
    pub fn forced_settings(&self) -> ProviderSettings {
        ProviderSettings {
            api_key: None,
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: None,
        }
    }
}
