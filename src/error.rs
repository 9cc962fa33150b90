// Centralized error handling using thiserror for type-safe error management
//
// Design Decision: Unified error type with provider tagging
//
// Rationale: Instead of passing vendor SDK errors (reqwest, serde) through
// to callers, every failure that crosses a module boundary is wrapped in a
// PolybotError variant. Provider-side failures always carry the identity
// of the provider that produced them, which is what the fallback logic in
// the manager keys its logging and recovery decisions on.
//
// Adapters never return vendor-native error types: a reqwest failure inside
// the Gemini adapter surfaces as ProviderRequest { provider: "gemini", .. }.

use thiserror::Error;

/// Main error type for Polybot
///
/// Provider variants map directly onto the failure modes of the LLM layer;
/// the remaining variants cover infrastructure concerns (IO, serialization,
/// HTTP, storage, configuration).
#[derive(Debug, Error)]
pub enum PolybotError {
    /// Provider could not be initialized (missing/invalid credential or
    /// failed reachability check). In auto mode the provider is dropped
    /// from the registry; in forced mode this aborts initialization.
    #[error("Provider '{provider}' failed to initialize: {message}")]
    ProviderInit { provider: String, message: String },

    /// A vendor call failed during chat or tool-calling. Always wraps the
    /// underlying cause and tags the provider that produced it.
    #[error("Provider '{provider}' request failed: {cause}")]
    ProviderRequest { provider: String, cause: String },

    /// No provider is currently active (nothing survived initialization,
    /// or the active selection no longer matches a registry entry).
    #[error("No active provider configured")]
    NoActiveProvider,

    /// A provider identity was requested that is not present in the registry.
    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    /// Fallback exhausted: the preferred provider failed and no prior
    /// selection existed (or it failed too).
    #[error("No available provider: all fallback attempts failed")]
    NoAvailableProvider,

    /// A provider name outside the supported set was requested.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Environment variable not found or invalid
    #[error("Environment error: {0}")]
    EnvError(String),

    /// Web search collaborator failure (after its own retries)
    #[error("Search error: {0}")]
    SearchError(String),

    /// Page fetch/extraction failure
    #[error("Scrape error: {0}")]
    ScrapeError(String),

    /// Workflow-level failure that aborts a single run
    #[error("Workflow error: {0}")]
    WorkflowError(String),

    /// IO operation failed (file, network, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// HTTP request failed outside the provider layer
    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// Plan store (SQLite) failure
    #[error("Storage error: {0}")]
    StorageError(#[from] sqlx::Error),
}

/// Type alias for Result with PolybotError
pub type Result<T> = std::result::Result<T, PolybotError>;

// Conversion from anyhow::Error for the tool-execution boundary, where
// tool implementations report failures through anyhow.
impl From<anyhow::Error> for PolybotError {
    fn from(err: anyhow::Error) -> Self {
        PolybotError::WorkflowError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PolybotError::ProviderNotAvailable("gemini".to_string());
        assert_eq!(err.to_string(), "Provider not available: gemini");

        let err = PolybotError::ProviderRequest {
            provider: "openai".to_string(),
            cause: "HTTP 429".to_string(),
        };
        assert!(err.to_string().contains("openai"));
        assert!(err.to_string().contains("HTTP 429"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PolybotError = io_err.into();

        match err {
            PolybotError::IoError(_) => {}
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<i32> {
            Err(PolybotError::NoActiveProvider)
        }

        assert!(returns_error().is_err());
    }
}
