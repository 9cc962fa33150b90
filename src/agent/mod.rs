// Agent framework: a thin façade over the provider manager
//
// An agent holds its own system instructions, conversation history, and a
// registry of callable tools. Chat entry points forward to the manager;
// when the agent has a preferred provider the call goes through the
// manager's one-shot fallback path instead of the default entry points.

pub mod tools;

use crate::error::Result;
use crate::llm::{
    ChatMessage, ChatOptions, ChatResponse, ProviderKind, ProviderManager, ToolCall,
    ToolChatOutcome, ToolUseMode,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub use tools::{FunctionDefinition, FunctionParameters, Tool, ToolDefinition};

/// Upper bound on tool-call round trips in a single `chat_with_tools` run.
/// A model that keeps asking for tools past this is cut off with whatever
/// text it produced last.
const MAX_TOOL_ITERATIONS: usize = 5;

/// An AI agent bound to a provider manager
pub struct Agent {
    name: String,
    manager: Arc<ProviderManager>,
    preferred_provider: Option<ProviderKind>,
    system_instructions: String,
    options: ChatOptions,
    history: Vec<ChatMessage>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Agent {
    pub fn new(name: impl Into<String>, manager: Arc<ProviderManager>) -> Self {
        Self {
            name: name.into(),
            manager,
            preferred_provider: None,
            system_instructions: String::new(),
            options: ChatOptions::default(),
            history: Vec::new(),
            tools: HashMap::new(),
        }
    }

    pub fn with_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = instructions.into();
        self
    }

    /// Prefer a specific provider; calls will go through the manager's
    /// switch-with-fallback path instead of the plain active selection.
    pub fn with_preferred_provider(mut self, kind: ProviderKind) -> Self {
        self.preferred_provider = Some(kind);
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a callable tool. Last registration wins on name collision.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Agent '{}': tool '{}' re-registered", self.name, name);
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Full message list for a request: system instructions, history,
    /// then the current user message.
    fn build_messages(&self, user_message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if !self.system_instructions.is_empty() {
            messages.push(ChatMessage::system(self.system_instructions.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(user_message));
        messages
    }

    fn declarations(&self) -> Vec<ToolDefinition> {
        let mut declarations: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.declaration()).collect();
        declarations.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        declarations
    }

    async fn dispatch(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ToolChatOutcome> {
        match self.preferred_provider {
            Some(preferred) => {
                self.manager
                    .switch_provider_with_fallback(preferred, messages, tools, &self.options)
                    .await
            }
            None => match tools {
                Some(tools) => {
                    self.manager
                        .chat_completion_with_tools(messages, tools, &self.options)
                        .await
                }
                None => {
                    let response = self.manager.chat_completion(messages, &self.options).await?;
                    Ok(ToolChatOutcome { mode: ToolUseMode::PlainChat, response })
                }
            },
        }
    }

    /// Plain chat turn: no tools advertised
    pub async fn chat_completion(&mut self, user_message: &str) -> Result<ChatResponse> {
        let messages = self.build_messages(user_message);
        let outcome = self.dispatch(&messages, None).await?;

        self.history.push(ChatMessage::user(user_message));
        self.history.push(ChatMessage::assistant(outcome.response.content.clone()));
        Ok(outcome.response)
    }

    /// Tooled chat turn, driving the full tool-call loop
    ///
    /// Executes every tool call the model requests, appends the results,
    /// and re-asks until the model answers with text (or the iteration
    /// bound is hit). Tool failures never abort the loop; they are fed
    /// back to the model as descriptive strings.
    pub async fn chat_with_tools(&mut self, user_message: &str) -> Result<ChatResponse> {
        let declarations = self.declarations();
        let mut messages = self.build_messages(user_message);

        let mut outcome = self.dispatch(&messages, Some(&declarations)).await?;

        for _ in 0..MAX_TOOL_ITERATIONS {
            if !outcome.response.has_tool_calls() {
                break;
            }

            let calls = outcome.response.tool_calls.clone().unwrap_or_default();
            debug!(
                "Agent '{}': executing {} tool call(s)",
                self.name,
                calls.len()
            );

            messages.push(ChatMessage::assistant_with_calls(
                outcome.response.content.clone(),
                calls.clone(),
            ));

            for call in &calls {
                let result = self.execute_tool_call(call).await;
                messages.push(ChatMessage::tool_result(call.id.clone(), result));
            }

            outcome = self.dispatch(&messages, Some(&declarations)).await?;
        }

        // History records the turn only once the dispatch chain succeeded,
        // matching chat_completion: a failed turn leaves history untouched.
        self.history.push(ChatMessage::user(user_message));
        self.history.push(ChatMessage::assistant(outcome.response.content.clone()));
        Ok(outcome.response)
    }

    /// Execute a single tool call by name
    ///
    /// Always returns a string so the conversation loop can continue:
    /// unknown names and tool failures become descriptive results rather
    /// than errors.
    pub async fn execute_tool_call(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.get(&call.name) else {
            return format!("Unknown tool: {}", call.name);
        };

        match tool.execute(&call.arguments).await {
            Ok(value) => value.to_string(),
            Err(e) => {
                warn!("Agent '{}': tool '{}' failed: {}", self.name, call.name, e);
                format!("Tool '{}' failed: {}", call.name, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase a string"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({ "x": { "type": "string" } })
        }

        async fn execute(&self, arguments: &str) -> anyhow::Result<serde_json::Value> {
            let args: serde_json::Value = serde_json::from_str(arguments)?;
            let x = args["x"].as_str().ok_or_else(|| anyhow!("missing x"))?;
            Ok(json!(x.to_uppercase()))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({})
        }

        async fn execute(&self, _arguments: &str) -> anyhow::Result<serde_json::Value> {
            Err(anyhow!("intentional failure"))
        }
    }

    fn agent() -> Agent {
        let mut agent = Agent::new("tester", Arc::new(ProviderManager::new()));
        agent.register_tool(Arc::new(UpperTool));
        agent.register_tool(Arc::new(BrokenTool));
        agent
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let agent = agent();
        let result = agent
            .execute_tool_call(&ToolCall {
                id: "call_1".to_string(),
                name: "upper".to_string(),
                arguments: r#"{"x":"v"}"#.to_string(),
            })
            .await;

        assert_eq!(result, "\"V\"");
    }

    #[tokio::test]
    async fn test_unknown_tool_returns_string_not_error() {
        let agent = agent();
        let result = agent
            .execute_tool_call(&ToolCall {
                id: "call_1".to_string(),
                name: "does_not_exist".to_string(),
                arguments: "{}".to_string(),
            })
            .await;

        assert!(result.contains("Unknown tool"));
        assert!(result.contains("does_not_exist"));
    }

    #[tokio::test]
    async fn test_failing_tool_becomes_descriptive_string() {
        let agent = agent();
        let result = agent
            .execute_tool_call(&ToolCall {
                id: "call_1".to_string(),
                name: "broken".to_string(),
                arguments: "{}".to_string(),
            })
            .await;

        assert!(result.contains("broken"));
        assert!(result.contains("intentional failure"));
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_untouched() {
        // Manager with no providers: every dispatch fails
        let mut agent = agent();

        assert!(agent.chat_with_tools("hello").await.is_err());
        assert!(agent.history().is_empty());

        assert!(agent.chat_completion("hello").await.is_err());
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_execute_against_mocked_tool() {
        let mut mock = tools::MockTool::new();
        mock.expect_name().return_const("mocked".to_string());
        mock.expect_execute()
            .withf(|args| args.contains("42"))
            .returning(|_| Ok(json!({ "ok": true })));

        let mut agent = Agent::new("tester", Arc::new(ProviderManager::new()));
        agent.register_tool(Arc::new(mock));

        let result = agent
            .execute_tool_call(&ToolCall {
                id: "call_1".to_string(),
                name: "mocked".to_string(),
                arguments: r#"{"n":42}"#.to_string(),
            })
            .await;

        assert_eq!(result, r#"{"ok":true}"#);
    }

    #[test]
    fn test_build_messages_order() {
        let agent = Agent::new("tester", Arc::new(ProviderManager::new()))
            .with_system_instructions("be brief");

        let messages = agent.build_messages("hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, crate::llm::Role::System);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn test_tool_names_sorted() {
        let agent = agent();
        assert_eq!(agent.tool_names(), vec!["broken", "upper"]);
    }
}
