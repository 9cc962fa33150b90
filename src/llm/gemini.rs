use super::types::*;
use super::{resolve_api_key, ProviderAdapter, ProviderSettings};
use crate::agent::ToolDefinition;
use crate::error::{PolybotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const MODELS: &[&str] = &["gemini-2.0-flash", "gemini-2.0-flash-lite", "gemini-1.5-pro"];

/// Adapter for the Gemini generateContent API
///
/// Gemini diverges from the reference shape in three ways, all resolved
/// here: system messages must be supplied in a separate `systemInstruction`
/// field (they are extracted without reordering the rest of the
/// conversation), the assistant role is called "model", and function calls
/// travel as structured `functionCall`/`functionResponse` parts. Gemini
/// returns no call ids, so `call_<n>` ids are synthesized in vendor order.
pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    default_model: String,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
    ready: bool,
}

impl GeminiAdapter {
    pub fn new(settings: ProviderSettings) -> Self {
        let api_key = resolve_api_key(ProviderKind::Gemini, &settings);
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

    /// Split system messages out of the conversation and translate the rest.
    /// Relative order of the non-system messages is preserved.
    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: &ChatOptions,
    ) -> ApiRequest {
        let mut system_parts = Vec::new();
        let mut contents: Vec<Content> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(Part::text(&msg.content)),
                Role::User => contents.push(Content {
                    role: "user".to_string(),
                    parts: vec![Part::text(&msg.content)],
                }),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(Part::text(&msg.content));
                    }
                    if let Some(calls) = &msg.tool_calls {
                        for call in calls {
                            parts.push(Part {
                                text: None,
                                function_call: Some(FunctionCall {
                                    name: call.name.clone(),
                                    args: serde_json::from_str(&call.arguments)
                                        .unwrap_or_else(|_| json!({})),
                                }),
                                function_response: None,
                            });
                        }
                    }
                    contents.push(Content { role: "model".to_string(), parts });
                }
                Role::Tool => {
                    // Gemini matches responses to calls by function name
                    let name = msg
                        .tool_call_id
                        .as_deref()
                        .and_then(|id| id.split(':').next())
                        .unwrap_or("tool")
                        .to_string();
                    contents.push(Content {
                        role: "user".to_string(),
                        parts: vec![Part {
                            text: None,
                            function_call: None,
                            function_response: Some(FunctionResponse {
                                name,
                                response: json!({ "result": msg.content }),
                            }),
                        }],
                    });
                }
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(SystemInstruction { parts: system_parts })
        };

        ApiRequest {
            contents,
            system_instruction,
            tools: tools.map(|t| {
                vec![ToolBlock {
                    function_declarations: t.iter().map(declaration_for_gemini).collect(),
                }]
            }),
            generation_config: Some(GenerationConfig {
                temperature: options.temperature.or(self.default_temperature),
                max_output_tokens: options.max_tokens.or(self.default_max_tokens),
                top_p: options.top_p,
            }),
        }
    }

    async fn send(&self, model: &str, request: &ApiRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(format!("{API_BASE}/models/{model}:generateContent"))
            .header("x-goog-api-key", &self.api_key)
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

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| self.request_error(format!("failed to parse response: {e}")))?;

        self.translate(body, model)
    }

    /// Translate a vendor response body into the normalized shape.
    /// All function calls are surfaced, in vendor order, with synthesized
    /// `<name>:<index>` ids.
    fn translate(&self, body: GenerateContentResponse, model: &str) -> Result<ChatResponse> {
        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| self.request_error("no candidates in response"))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                content.push_str(&text);
            }
            if let Some(call) = part.function_call {
                // Id encodes the function name so tool results can be
                // matched back by name on the return path.
                let id = format!("{}:{}", call.name, tool_calls.len());
                tool_calls.push(ToolCall {
                    id,
                    name: call.name,
                    arguments: call.args.to_string(),
                });
            }
        }

        let finish_reason = if !tool_calls.is_empty() {
            Some("tool_calls".to_string())
        } else {
            candidate.finish_reason.map(|r| match r.as_str() {
                "STOP" => "stop".to_string(),
                "MAX_TOKENS" => "length".to_string(),
                "SAFETY" => "content_filter".to_string(),
                other => other.to_ascii_lowercase(),
            })
        };

        Ok(ChatResponse {
            provider: ProviderKind::Gemini,
            content,
            usage: body
                .usage_metadata
                .map(|u| TokenUsage {
                    prompt_tokens: u.prompt_token_count,
                    completion_tokens: u.candidates_token_count,
                    total_tokens: u.total_token_count,
                })
                .unwrap_or_default(),
            model: model.to_string(),
            finish_reason,
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        })
    }

    fn model_for(&self, options: &ChatOptions) -> String {
        options.model.clone().unwrap_or_else(|| self.default_model.clone())
    }
}

/// Gemini rejects `additionalProperties`; rebuild the schema without it.
fn declaration_for_gemini(tool: &ToolDefinition) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.function.name.clone(),
        description: tool.function.description.clone(),
        parameters: json!({
            "type": "object",
            "properties": tool.function.parameters.properties,
            "required": tool.function.parameters.required,
        }),
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.ready {
            return Ok(());
        }
        if !self.is_configured() {
            return Err(PolybotError::ProviderInit {
                provider: self.kind().to_string(),
                message: "GEMINI_API_KEY not set".to_string(),
            });
        }

        let response = self
            .client
            .get(format!("{API_BASE}/models"))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| PolybotError::ProviderInit {
                provider: self.kind().to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PolybotError::ProviderInit {
                provider: self.kind().to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        self.ready = true;
        Ok(())
    }

    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let model = self.model_for(options);
        let request = self.build_request(messages, None, options);
        self.send(&model, &request).await
    }

    async fn chat_completion_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let model = self.model_for(options);
        let request = self.build_request(messages, Some(tools), options);
        self.send(&model, &request).await
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
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolBlock>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(content: &str) -> Self {
        Self {
            text: Some(content.to_string()),
            function_call: None,
            function_response: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolBlock {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}
