// Web search collaborator (Brave Search API)
//
// This client carries its own bounded retry with exponential delay; the
// provider manager above it never retries, so transient search failures
// are absorbed here or surface as a single SearchError.

use crate::error::{PolybotError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const API_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Recency filter for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Day,
    Week,
    Month,
    Year,
    Any,
}

impl Freshness {
    fn as_param(&self) -> Option<&'static str> {
        match self {
            Freshness::Day => Some("pd"),
            Freshness::Week => Some("pw"),
            Freshness::Month => Some("pm"),
            Freshness::Year => Some("py"),
            Freshness::Any => None,
        }
    }
}

/// A single search hit
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub description: String,
}

/// Brave Search API client
pub struct SearchClient {
    client: Client,
    api_key: String,
}

impl SearchClient {
    pub fn new(api_key: String) -> Self {
        Self { client: Client::new(), api_key }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Run a web search, retrying transient failures with exponential delay
    pub async fn search(
        &self,
        query: &str,
        freshness: Freshness,
        count: usize,
    ) -> Result<Vec<SearchResult>> {
        if !self.is_configured() {
            return Err(PolybotError::SearchError("BRAVE_API_KEY not set".to_string()));
        }

        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            match self.search_once(query, freshness, count).await {
                Ok(results) => return Ok(results),
                Err(e) => {
                    warn!(
                        "Search attempt {}/{} failed: {}",
                        attempt + 1,
                        MAX_ATTEMPTS,
                        e
                    );
                    last_error = e.to_string();

                    if attempt + 1 < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(
                            RETRY_BASE_DELAY_MS * 2_u64.pow(attempt),
                        ))
                        .await;
                    }
                }
            }
        }

        Err(PolybotError::SearchError(last_error))
    }

    async fn search_once(
        &self,
        query: &str,
        freshness: Freshness,
        count: usize,
    ) -> Result<Vec<SearchResult>> {
        let mut request = self
            .client
            .get(API_URL)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &count.to_string())]);

        if let Some(param) = freshness.as_param() {
            request = request.query(&[("freshness", param)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PolybotError::SearchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PolybotError::SearchError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PolybotError::SearchError(format!("failed to parse response: {e}")))?;

        let results = body
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                description: r.description.unwrap_or_default(),
            })
            .collect();

        Ok(results)
    }
}

// Internal API types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    url: String,
    title: String,
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_params() {
        assert_eq!(Freshness::Day.as_param(), Some("pd"));
        assert_eq!(Freshness::Year.as_param(), Some("py"));
        assert_eq!(Freshness::Any.as_param(), None);
    }

    #[test]
    fn test_unconfigured_client() {
        let client = SearchClient::new(String::new());
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn test_search_without_key_fails_fast() {
        let client = SearchClient::new(String::new());
        let result = client.search("rust", Freshness::Any, 5).await;
        assert!(matches!(result, Err(PolybotError::SearchError(_))));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "web": {
                "results": [
                    { "url": "https://example.com", "title": "Example", "description": "A site" },
                    { "url": "https://other.org", "title": "Other" }
                ]
            }
        }"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let results = parsed.web.unwrap().results;
        assert_eq!(results.len(), 2);
        assert!(results[1].description.is_none());
    }
}
