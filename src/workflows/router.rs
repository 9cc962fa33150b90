// Request routing
//
// Design Decision: LLM classification with a cheap URL shortcut
//
// Rationale: keyword matching misroutes anything phrased indirectly, so
// classification is delegated to the active provider as a one-shot,
// one-word question. The one case that never needs a model is a request
// carrying a URL, which goes straight to summarization. Anything the
// model answers outside the known labels falls back to plain chat, so a
// confused classifier degrades to the most forgiving workflow instead of
// a wrong one.

use crate::llm::{ChatMessage, ChatOptions, ProviderManager};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// The workflow a request was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    Research,
    GenerateImage,
    SummarizeUrl,
    Chat,
}

const CLASSIFY_INSTRUCTIONS: &str = "\
You are a request classifier. Answer with exactly one word:
- research: the user wants a researched report on a topic
- image: the user wants a picture generated
- summarize: the user wants a web page summarized
- chat: anything else
Answer with one of: research, image, summarize, chat. Nothing more.";

/// Routes requests to workflows
pub struct Router {
    manager: Arc<ProviderManager>,
}

impl Router {
    pub fn new(manager: Arc<ProviderManager>) -> Self {
        Self { manager }
    }

    /// Classify a request. Never fails: classification errors route to Chat.
    pub async fn classify(&self, request: &str) -> WorkflowKind {
        // A request carrying a URL is a summarization request
        if extract_url(request).is_some() {
            return WorkflowKind::SummarizeUrl;
        }

        let messages = [
            ChatMessage::system(CLASSIFY_INSTRUCTIONS),
            ChatMessage::user(request),
        ];
        let options = ChatOptions::default().with_temperature(0.0);

        match self.manager.chat_completion(&messages, &options).await {
            Ok(response) => {
                let kind = parse_kind(&response.content);
                debug!("Classified request as {:?}", kind);
                kind
            }
            Err(e) => {
                warn!("Classification failed, defaulting to chat: {}", e);
                WorkflowKind::Chat
            }
        }
    }
}

fn parse_kind(raw: &str) -> WorkflowKind {
    let label = raw
        .trim()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_ascii_alphabetic())
        .to_ascii_lowercase();

    match label.as_str() {
        "research" => WorkflowKind::Research,
        "image" => WorkflowKind::GenerateImage,
        "summarize" => WorkflowKind::SummarizeUrl,
        _ => WorkflowKind::Chat,
    }
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bhttps?://[^\s<>"')\]]+"#).expect("valid regex"))
}

/// First http(s) URL in the text, if any
pub(crate) fn extract_url(text: &str) -> Option<String> {
    url_regex().find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_labels() {
        assert_eq!(parse_kind("research"), WorkflowKind::Research);
        assert_eq!(parse_kind("image"), WorkflowKind::GenerateImage);
        assert_eq!(parse_kind("summarize"), WorkflowKind::SummarizeUrl);
        assert_eq!(parse_kind("chat"), WorkflowKind::Chat);
    }

    #[test]
    fn test_parse_kind_tolerates_decoration() {
        assert_eq!(parse_kind("  Research.\n"), WorkflowKind::Research);
        assert_eq!(parse_kind("\"image\""), WorkflowKind::GenerateImage);
    }

    #[test]
    fn test_parse_kind_unknown_defaults_to_chat() {
        assert_eq!(parse_kind("banana"), WorkflowKind::Chat);
        assert_eq!(parse_kind(""), WorkflowKind::Chat);
        assert_eq!(parse_kind("I think this is research-adjacent"), WorkflowKind::Chat);
    }

    #[test]
    fn test_extract_url() {
        assert_eq!(
            extract_url("summarize https://example.com/page please").as_deref(),
            Some("https://example.com/page")
        );
        assert_eq!(extract_url("no links here"), None);
    }

    #[tokio::test]
    async fn test_classify_url_bypasses_llm() {
        // Manager has no providers; the URL shortcut must not touch it
        let router = Router::new(Arc::new(ProviderManager::new()));
        let kind = router.classify("what does https://example.com say?").await;
        assert_eq!(kind, WorkflowKind::SummarizeUrl);
    }

    #[tokio::test]
    async fn test_classify_degraded_manager_defaults_to_chat() {
        let router = Router::new(Arc::new(ProviderManager::new()));
        assert_eq!(router.classify("tell me a joke").await, WorkflowKind::Chat);
    }
}
