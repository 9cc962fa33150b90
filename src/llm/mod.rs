mod claude;
mod gemini;
pub mod manager;
mod openai;
mod types;

pub use claude::ClaudeAdapter;
pub use gemini::GeminiAdapter;
pub use manager::{ProviderManager, ToolChatOutcome, ToolUseMode};
pub use openai::OpenAiAdapter;
pub use types::*;

use crate::agent::ToolDefinition;
use crate::error::Result;
use async_trait::async_trait;

/// Uniform contract every provider adapter implements
///
/// One adapter wraps one vendor's chat/tool-call API and hides its
/// request/response shape. Exactly one normalized response shape and one
/// normalized tool-call shape are shared by all adapters; vendor quirks
/// (system prompt separated from history, function calls as structured
/// fields) are resolved entirely inside the adapter.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider identity of this adapter
    fn kind(&self) -> ProviderKind;

    /// Establish the vendor client and verify reachability
    ///
    /// Fails with `ProviderInit` if the credential is missing/invalid or
    /// the vendor rejects the check. The adapter is either fully ready
    /// after this returns Ok, or left unready; there is no partial state.
    async fn initialize(&mut self) -> Result<()>;

    /// Chat completion without tools
    ///
    /// Vendor-side failures surface as `ProviderRequest { provider, cause }`,
    /// never as vendor-native error types.
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse>;

    /// Chat completion with callable tools advertised to the model
    ///
    /// Tool declarations are translated into the vendor's function-calling
    /// schema; any tool invocations in the reply are translated back into
    /// the normalized `ToolCall` list, preserving vendor order. Tool choice
    /// is always the vendor's "auto" mode.
    async fn chat_completion_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResponse>;

    /// Generate an image from a text prompt
    ///
    /// Default implementation reports the capability as unsupported;
    /// adapters that set `supports_image_generation` override this.
    async fn generate_image(&self, _prompt: &str, _options: &ChatOptions) -> Result<ImageResult> {
        Err(crate::error::PolybotError::ProviderRequest {
            provider: self.kind().to_string(),
            cause: "image generation not supported by this provider".to_string(),
        })
    }

    /// Static capability flag: can this adapter advertise tools?
    fn supports_tools(&self) -> bool;

    /// Static capability flag: can this adapter generate images?
    fn supports_image_generation(&self) -> bool;

    /// Static list of model identifiers this adapter knows about.
    /// Display only; never used for validation.
    fn available_models(&self) -> Vec<&'static str>;

    /// True iff a non-empty credential is present. No network call.
    fn is_configured(&self) -> bool;
}

/// Per-provider settings bag used at construction time
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Factory: construct the adapter for a provider identity
pub fn create_adapter(kind: ProviderKind, settings: ProviderSettings) -> Box<dyn ProviderAdapter> {
    match kind {
        ProviderKind::OpenAi => Box::new(OpenAiAdapter::new(settings)),
        ProviderKind::Gemini => Box::new(GeminiAdapter::new(settings)),
        ProviderKind::Claude => Box::new(ClaudeAdapter::new(settings)),
    }
}

/// Resolve a provider credential from settings or the environment
pub(crate) fn resolve_api_key(kind: ProviderKind, settings: &ProviderSettings) -> String {
    settings
        .api_key
        .clone()
        .or_else(|| std::env::var(kind.env_var()).ok())
        .unwrap_or_default()
}
