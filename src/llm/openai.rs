use super::types::*;
use super::{resolve_api_key, ProviderAdapter, ProviderSettings};
use crate::agent::ToolDefinition;
use crate::error::{PolybotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const IMAGE_MODEL: &str = "dall-e-3";

const MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "o3-mini"];

/// Adapter for the OpenAI chat completions API
///
/// OpenAI is the reference wire shape for the normalized contract: roles
/// map one-to-one, tool declarations pass through unchanged, and tool
/// results use the "tool" role with `tool_call_id`.
pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    default_model: String,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
    ready: bool,
}

impl OpenAiAdapter {
    pub fn new(settings: ProviderSettings) -> Self {
        let api_key = resolve_api_key(ProviderKind::OpenAi, &settings);
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
        let messages = messages.iter().map(ApiMessage::from).collect();

        ApiRequest {
            model: options.model.clone().unwrap_or_else(|| self.default_model.clone()),
            messages,
            temperature: options.temperature.or(self.default_temperature),
            max_tokens: options.max_tokens.or(self.default_max_tokens),
            top_p: options.top_p,
            tools: tools.map(|t| t.to_vec()),
            // Tool choice is always the vendor's auto mode; forced-function
            // requests are not part of the normalized contract.
            tool_choice: tools.map(|_| "auto".to_string()),
        }
    }

    async fn send(&self, request: &ApiRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(format!("{API_BASE}/chat/completions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| self.request_error(format!("failed to parse response: {e}")))?;

        self.translate(completion)
    }

    /// Translate a vendor response body into the normalized shape,
    /// surfacing every tool call in vendor order.
    fn translate(&self, completion: CompletionResponse) -> Result<ChatResponse> {
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| self.request_error("no choices in response"))?;

        let tool_calls = choice.message.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|c| ToolCall {
                    id: c.id,
                    name: c.function.name,
                    arguments: c.function.arguments,
                })
                .collect()
        });

        Ok(ChatResponse {
            provider: ProviderKind::OpenAi,
            content: choice.message.content.unwrap_or_default(),
            usage: completion
                .usage
                .map(|u| TokenUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
            model: completion.model,
            finish_reason: choice.finish_reason,
            tool_calls,
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.ready {
            return Ok(());
        }
        if !self.is_configured() {
            return Err(PolybotError::ProviderInit {
                provider: self.kind().to_string(),
                message: "OPENAI_API_KEY not set".to_string(),
            });
        }

        // Reachability check against the models endpoint; a 401/403 here
        // means the credential is invalid and the adapter stays unready.
        let response = self
            .client
            .get(format!("{API_BASE}/models"))
            .header("Authorization", format!("Bearer {}", self.api_key))
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

    async fn generate_image(&self, prompt: &str, options: &ChatOptions) -> Result<ImageResult> {
        let model = options.model.clone().unwrap_or_else(|| IMAGE_MODEL.to_string());
        let request = ImageRequest {
            model: model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: "1024x1024".to_string(),
            response_format: "b64_json".to_string(),
        };

        let response = self
            .client
            .post(format!("{API_BASE}/images/generations"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.request_error(format!("HTTP {status}: {error_text}")));
        }

        let body: ImageResponse = response
            .json()
            .await
            .map_err(|e| self.request_error(format!("failed to parse image response: {e}")))?;

        let image = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| self.request_error("no image in response"))?;

        Ok(ImageResult {
            provider: ProviderKind::OpenAi,
            b64_png: image.b64_json,
            model,
        })
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn supports_image_generation(&self) -> bool {
        true
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
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
}

impl From<&ChatMessage> for ApiMessage {
    fn from(msg: &ChatMessage) -> Self {
        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|c| ApiToolCall {
                    id: c.id.clone(),
                    call_type: "function".to_string(),
                    function: ApiFunctionCall {
                        name: c.name.clone(),
                        arguments: c.arguments.clone(),
                    },
                })
                .collect()
        });

        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
            tool_call_id: msg.tool_call_id.clone(),
            tool_calls,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: String,
    choices: Vec<CompletionChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u8,
    size: String,
    response_format: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter_with_key() -> OpenAiAdapter {
        OpenAiAdapter::new(ProviderSettings {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_capabilities() {
        let adapter = adapter_with_key();
        assert!(adapter.supports_tools());
        assert!(adapter.supports_image_generation());
        assert!(adapter.available_models().contains(&"gpt-4o"));
        assert!(adapter.is_configured());
    }

    #[test]
    fn test_unconfigured_without_key() {
        let adapter = OpenAiAdapter::new(ProviderSettings {
            api_key: Some(String::new()),
            ..Default::default()
        });
        assert!(!adapter.is_configured());
    }

    #[test]
    fn test_request_translation_preserves_tool_linkage() {
        let adapter = adapter_with_key();
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("what is 2+2?"),
            ChatMessage::assistant_with_calls(
                "",
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "calculator".to_string(),
                    arguments: r#"{"expr":"2+2"}"#.to_string(),
                }],
            ),
            ChatMessage::tool_result("call_1", "4"),
        ];

        let request = adapter.build_request(&messages, None, &ChatOptions::default());

        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[3].role, "tool");
        assert_eq!(request.messages[3].tool_call_id.as_deref(), Some("call_1"));

        let calls = request.messages[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "calculator");
    }

    #[test]
    fn test_translate_surfaces_all_tool_calls_in_order() {
        let adapter = adapter_with_key();
        let completion: CompletionResponse = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        { "id": "call_a", "type": "function",
                          "function": { "name": "store_research_plan", "arguments": "{\"summary\":\"s\"}" } },
                        { "id": "call_b", "type": "function",
                          "function": { "name": "delete_research_plan", "arguments": "{\"id\":1}" } }
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10 }
        }))
        .unwrap();

        let response = adapter.translate(completion).unwrap();

        let calls = response.tool_calls.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].name, "store_research_plan");
        assert_eq!(calls[1].id, "call_b");
        assert_eq!(calls[1].arguments, "{\"id\":1}");

        assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.usage.total_tokens, 10);
        assert_eq!(response.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn test_translate_without_choices_is_an_error() {
        let adapter = adapter_with_key();
        let completion: CompletionResponse = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o",
            "choices": []
        }))
        .unwrap();

        assert!(matches!(
            adapter.translate(completion),
            Err(PolybotError::ProviderRequest { .. })
        ));
    }

    #[test]
    fn test_tool_choice_defaults_to_auto() {
        let adapter = adapter_with_key();
        let tools: Vec<ToolDefinition> = vec![];
        let request =
            adapter.build_request(&[ChatMessage::user("hi")], Some(&tools), &ChatOptions::default());
        assert_eq!(request.tool_choice.as_deref(), Some("auto"));
    }
}
