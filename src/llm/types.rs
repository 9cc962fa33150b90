use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supported provider identities
///
/// Adding a vendor means adding a variant here plus an adapter module;
/// there is no open-ended registration by string name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Claude,
}

impl ProviderKind {
    /// All supported providers, in fallback priority order.
    /// `initialize_all` picks the first surviving entry as active.
    pub const PRIORITY: [ProviderKind; 3] =
        [ProviderKind::OpenAi, ProviderKind::Gemini, ProviderKind::Claude];

    /// Environment variable holding this provider's credential
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Claude => "claude",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = crate::error::PolybotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            other => Err(crate::error::PolybotError::UnsupportedProvider(
                other.to_string(),
            )),
        }
    }
}

/// Role of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A single message in the normalized conversation shape
///
/// Every adapter consumes this and translates it into its vendor's wire
/// format. Tool-result messages carry the id of the call they answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,

    /// For Role::Tool messages: the id of the tool call being answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// For Role::Assistant messages: tool calls the model made in this turn.
    /// Required by vendors that validate tool results against prior calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    /// Assistant turn that requested tool invocations
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Some(calls),
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(call_id.into()),
            tool_calls: None,
        }
    }
}

/// Free-form per-request options
///
/// `extra` is an opaque passthrough bag merged into the vendor request
/// body by adapters that accept unknown fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage counters reported by the vendor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A tool invocation requested by the model
///
/// Arguments are kept as the raw JSON string the vendor supplied (or an
/// equivalent serialization); tools parse them at execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Normalized response shape shared by all adapters
///
/// Vendor quirks (separate system prompt, structured function-call fields)
/// are resolved inside the adapter and never leak into this shape.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Identity of the adapter that produced this response
    pub provider: ProviderKind,

    /// Assistant text content (may be empty when the model only calls tools)
    pub content: String,

    pub usage: TokenUsage,

    /// Model that actually served the request
    pub model: String,

    /// Vendor finish reason normalized to OpenAI vocabulary:
    /// "stop", "length", "tool_calls", "content_filter"
    pub finish_reason: Option<String>,

    /// Tool invocations requested by the model, in vendor order
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Result of an image generation request
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub provider: ProviderKind,
    /// Base64-encoded PNG payload
    pub b64_png: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("GEMINI".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Claude);
        assert!("mistral".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(ProviderKind::PRIORITY[0], ProviderKind::OpenAi);
        assert_eq!(ProviderKind::PRIORITY[1], ProviderKind::Gemini);
        assert_eq!(ProviderKind::PRIORITY[2], ProviderKind::Claude);
    }

    #[test]
    fn test_tool_result_message() {
        let msg = ChatMessage::tool_result("call_1", "42");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_has_tool_calls() {
        let mut response = ChatResponse {
            provider: ProviderKind::OpenAi,
            content: String::new(),
            usage: TokenUsage::default(),
            model: "gpt-4o".to_string(),
            finish_reason: Some("tool_calls".to_string()),
            tool_calls: Some(vec![]),
        };
        assert!(!response.has_tool_calls());

        response.tool_calls = Some(vec![ToolCall {
            id: "call_1".to_string(),
            name: "store_research_plan".to_string(),
            arguments: "{}".to_string(),
        }]);
        assert!(response.has_tool_calls());
    }
}
