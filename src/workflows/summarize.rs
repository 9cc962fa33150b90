// URL summarization workflow

use crate::error::{PolybotError, Result};
use crate::llm::{ChatMessage, ChatOptions, ProviderManager};
use crate::scraper::Scraper;
use crate::workflows::router::extract_url;
use std::sync::Arc;
use tracing::info;

const SUMMARY_INSTRUCTIONS: &str = "\
Summarize the following web page concisely. Lead with what the page is,
then the key points as a short list. Note anything the page claims that
looks time-sensitive.";

/// Scrape a URL from the request and summarize its content
pub struct SummarizeWorkflow {
    manager: Arc<ProviderManager>,
    scraper: Scraper,
}

impl SummarizeWorkflow {
    pub fn new(manager: Arc<ProviderManager>, scraper: Scraper) -> Self {
        Self { manager, scraper }
    }

    pub async fn run(&self, request: &str) -> Result<String> {
        let url = extract_url(request).ok_or_else(|| {
            PolybotError::WorkflowError("no URL found in the request".to_string())
        })?;

        info!("Summarizing {}", url);
        let page = self.scraper.scrape(&url).await;
        if !page.success {
            return Err(PolybotError::WorkflowError(format!(
                "could not fetch {}: {}",
                url,
                page.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        let prompt = format!("Title: {}\nURL: {}\n\n{}", page.title, url, page.content);
        let messages = [
            ChatMessage::system(SUMMARY_INSTRUCTIONS),
            ChatMessage::user(prompt),
        ];

        let response = self
            .manager
            .chat_completion(&messages, &ChatOptions::default())
            .await?;
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_without_url_fails() {
        let workflow =
            SummarizeWorkflow::new(Arc::new(ProviderManager::new()), Scraper::new());
        let result = workflow.run("summarize this for me").await;
        assert!(matches!(result, Err(PolybotError::WorkflowError(_))));
    }
}
