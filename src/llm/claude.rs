use super::types::*;
use super::{resolve_api_key, ProviderAdapter, ProviderSettings};
use crate::agent::ToolDefinition;
use crate::error::{PolybotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;

const MODELS: &[&str] = &[
    "claude-sonnet-4-20250514",
    "claude-opus-4-20250514",
    "claude-3-5-haiku-20241022",
];

/// Adapter for the Anthropic messages API
///
/// Quirks resolved here: system messages move into the top-level `system`
/// field, `max_tokens` is mandatory, tool declarations use `input_schema`,
/// tool calls come back as `tool_use` content blocks, and tool results go
/// out as `tool_result` blocks inside a user message.
pub struct ClaudeAdapter {
    client: Client,
    api_key: String,
    default_model: String,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
    ready: bool,
}

impl ClaudeAdapter {
    pub fn new(settings: ProviderSettings) -> Self {
        let api_key = resolve_api_key(ProviderKind::Claude, &settings);
        Self {
            client: Client::new(),
            api_key,
            default_model: settings.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            default_temperature: settings.temperature,
            default_max_tokens: settings.max_tokens,
            ready: false,
        }
    }

    fn request_error(&self, cause: impl std::fmt::Display) -> PolybotError {
        PolybotError::ProviderRequest {
            provider: self.kind().to_string(),
            cause: cause.to_string(),
        }
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: &ChatOptions,
    ) -> ApiRequest {
        let mut system_parts = Vec::new();
        let mut api_messages: Vec<ApiMessage> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.clone()),
                Role::User => api_messages.push(ApiMessage {
                    role: "user".to_string(),
                    content: json!(msg.content),
                }),
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if !msg.content.is_empty() {
                        blocks.push(json!({ "type": "text", "text": msg.content }));
                    }
                    if let Some(calls) = &msg.tool_calls {
                        for call in calls {
                            blocks.push(json!({
                                "type": "tool_use",
                                "id": call.id,
                                "name": call.name,
                                "input": serde_json::from_str::<serde_json::Value>(&call.arguments)
                                    .unwrap_or_else(|_| json!({})),
                            }));
                        }
                    }
                    api_messages.push(ApiMessage {
                        role: "assistant".to_string(),
                        content: json!(blocks),
                    });
                }
                Role::Tool => api_messages.push(ApiMessage {
                    role: "user".to_string(),
                    content: json!([{
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id.clone().unwrap_or_default(),
                        "content": msg.content,
                    }]),
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        ApiRequest {
            model: options.model.clone().unwrap_or_else(|| self.default_model.clone()),
            messages: api_messages,
            system,
            max_tokens: options
                .max_tokens
                .or(self.default_max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature.or(self.default_temperature),
            top_p: options.top_p,
            tools: tools.map(|t| t.iter().map(declaration_for_claude).collect()),
        }
    }

    async fn send(&self, request: &ApiRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(format!("{API_BASE}/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.request_error(format!("HTTP {status}: {error_text}")));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| self.request_error(format!("failed to parse response: {e}")))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in body.content {
            match block {
                ContentBlock::Text { text } => content.push_str(&text),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input.to_string(),
                }),
            }
        }

        let finish_reason = body.stop_reason.map(|r| match r.as_str() {
            "end_turn" | "stop_sequence" => "stop".to_string(),
            "max_tokens" => "length".to_string(),
            "tool_use" => "tool_calls".to_string(),
            other => other.to_string(),
        });

        Ok(ChatResponse {
            provider: ProviderKind::Claude,
            content,
            usage: TokenUsage {
                prompt_tokens: body.usage.input_tokens,
                completion_tokens: body.usage.output_tokens,
                total_tokens: body.usage.input_tokens + body.usage.output_tokens,
            },
            model: body.model,
            finish_reason,
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        })
    }
}

fn declaration_for_claude(tool: &ToolDefinition) -> ClaudeTool {
    ClaudeTool {
        name: tool.function.name.clone(),
        description: tool.function.description.clone(),
        input_schema: json!({
            "type": "object",
            "properties": tool.function.parameters.properties,
            "required": tool.function.parameters.required,
            "additionalProperties": false,
        }),
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.ready {
            return Ok(());
        }
        if !self.is_configured() {
            return Err(PolybotError::ProviderInit {
                provider: self.kind().to_string(),
                message: "ANTHROPIC_API_KEY not set".to_string(),
            });
        }

        // Anthropic has no models-list endpoint usable as a ping; a GET on
        // the messages endpoint returns 405 when the key is valid and
        // 401/403 when it is not.
        let response = self
            .client
            .get(format!("{API_BASE}/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .send()
            .await
            .map_err(|e| PolybotError::ProviderInit {
                provider: self.kind().to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() || status == 404 || status == 405 {
            self.ready = true;
            Ok(())
        } else {
            Err(PolybotError::ProviderInit {
                provider: self.kind().to_string(),
                message: format!("HTTP {status}"),
            })
        }
    }

    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let request = self.build_request(messages, None, options);
        self.send(&request).await
    }

    async fn chat_completion_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let request = self.build_request(messages, Some(tools), options);
        self.send(&request).await
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn supports_image_generation(&self) -> bool {
        false
    }

    fn available_models(&self) -> Vec<&'static str> {
        MODELS.to_vec()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// Internal API types

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ClaudeTool>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}
