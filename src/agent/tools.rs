// Tool contract and OpenAI-compatible function declaration rendering
//
// This module implements the industry-standard OpenAI function calling
// specification as the vendor-neutral declaration shape. Adapters for
// vendors with a different schema (Gemini functionDeclarations, Claude
// input_schema) translate from this shape inside the adapter.
//
// Reference: https://platform.openai.com/docs/guides/function-calling

use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// A callable function exposed to the LLM
///
/// Implementations declare a unique name, a human-readable description the
/// model uses to decide when to call it, and a JSON-schema property map for
/// the arguments. `execute` receives the raw JSON arguments string exactly
/// as the vendor returned it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name within an agent
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON-schema `properties` map for the arguments object
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with a JSON-encoded arguments string
    async fn execute(&self, arguments: &str) -> Result<serde_json::Value>;

    /// Render this tool into the wire-format declaration consumed by
    /// adapters. All declared properties are required and additional
    /// properties are forbidden.
    fn declaration(&self) -> ToolDefinition {
        let required = match self.parameters() {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };

        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: FunctionParameters {
                    param_type: "object".to_string(),
                    properties: self.parameters(),
                    required,
                    additional_properties: false,
                },
            },
        }
    }
}

/// Tool definition in OpenAI function calling format
///
/// # Example
/// ```json
/// {
///   "type": "function",
///   "function": {
///     "name": "store_research_plan",
///     "description": "Persist a research plan",
///     "parameters": {
///       "type": "object",
///       "properties": {
///         "summary": { "type": "string" }
///       },
///       "required": ["summary"],
///       "additionalProperties": false
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Always "function"
    #[serde(rename = "type")]
    pub tool_type: String,

    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: FunctionParameters,
}

/// Parameters schema for a function (JSON Schema format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParameters {
    /// Always "object"
    #[serde(rename = "type")]
    pub param_type: String,

    /// Parameter definitions
    pub properties: serde_json::Value,

    /// Required parameter names (all declared properties)
    pub required: Vec<String>,

    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({
                "text": { "type": "string", "description": "Text to echo" },
                "count": { "type": "integer", "description": "Repetitions" }
            })
        }

        async fn execute(&self, arguments: &str) -> Result<serde_json::Value> {
            let args: serde_json::Value = serde_json::from_str(arguments)?;
            Ok(args)
        }
    }

    #[test]
    fn test_declaration_requires_all_properties() {
        let decl = EchoTool.declaration();

        assert_eq!(decl.tool_type, "function");
        assert_eq!(decl.function.name, "echo");
        assert_eq!(decl.function.parameters.param_type, "object");
        assert!(!decl.function.parameters.additional_properties);

        let mut required = decl.function.parameters.required.clone();
        required.sort();
        assert_eq!(required, vec!["count", "text"]);
    }

    #[test]
    fn test_declaration_serializes_additional_properties_key() {
        let decl = EchoTool.declaration();
        let wire = serde_json::to_value(&decl).unwrap();

        assert_eq!(wire["type"], "function");
        assert_eq!(
            wire["function"]["parameters"]["additionalProperties"],
            json!(false)
        );
    }

    #[tokio::test]
    async fn test_execute_receives_raw_arguments() {
        let result = EchoTool.execute(r#"{"text":"hi","count":2}"#).await.unwrap();
        assert_eq!(result["text"], "hi");
        assert_eq!(result["count"], 2);
    }
}
