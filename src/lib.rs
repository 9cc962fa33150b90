// Library interface for Polybot
// This exposes the core functionality as a library that can be:
// - Used programmatically from Rust code
// - Called from the REPL binary and integration tests

pub mod agent;
pub mod error;
pub mod llm;
pub mod scraper;
pub mod search;
pub mod services;
pub mod store;
pub mod tools;
pub mod workflows;

// Re-export commonly used types for convenience
pub use agent::{Agent, Tool, ToolDefinition};
pub use error::{PolybotError, Result};
pub use llm::{
    ChatMessage, ChatOptions, ChatResponse, ProviderAdapter, ProviderKind, ProviderManager,
    ProviderSettings, ToolCall, ToolChatOutcome, ToolUseMode,
};
pub use services::{AppConfig, ProviderMode, ReportWriter};
pub use store::PlanStore;
