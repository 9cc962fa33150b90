// Research workflow: plan, search, scrape, synthesize, report
//
// The pipeline degrades at each stage instead of failing hard: a query
// with no hits is skipped, a page that will not scrape is dropped. The
// run only fails when a stage leaves nothing to continue with.

use crate::error::{PolybotError, Result};
use crate::llm::{ChatMessage, ChatOptions, ProviderManager};
use crate::scraper::{ScrapedPage, Scraper};
use crate::search::{Freshness, SearchClient};
use crate::services::ReportWriter;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const MAX_QUERIES: usize = 3;
const EXCERPT_CHARS: usize = 4_000;

const PLANNING_INSTRUCTIONS: &str = "\
You are a research planner. Given a topic, produce up to 3 web search
queries that together cover it well. One query per line, no numbering,
no commentary.";

const SYNTHESIS_INSTRUCTIONS: &str = "\
You are a research writer. Using only the source excerpts provided,
write a well-structured Markdown report on the topic. Cite sources by
their bracketed number. Start with a short summary, end with open
questions if any remain.";

/// Result of a completed research run
#[derive(Debug)]
pub struct ResearchOutcome {
    pub report_path: PathBuf,
    pub sources_used: usize,
}

/// End-to-end research pipeline
pub struct ResearchWorkflow {
    manager: Arc<ProviderManager>,
    search: SearchClient,
    scraper: Scraper,
    reports: ReportWriter,
    results_per_query: usize,
}

impl ResearchWorkflow {
    pub fn new(
        manager: Arc<ProviderManager>,
        search: SearchClient,
        scraper: Scraper,
        reports: ReportWriter,
        results_per_query: usize,
    ) -> Self {
        Self { manager, search, scraper, reports, results_per_query }
    }

    /// Run the full pipeline for a topic, returning the report location
    pub async fn run(&self, topic: &str) -> Result<ResearchOutcome> {
        let queries = self.plan_queries(topic).await?;
        info!("Research plan: {} quer(ies)", queries.len());

        let urls = self.gather_urls(&queries).await?;
        info!("Gathered {} source url(s)", urls.len());

        let pages: Vec<ScrapedPage> = self
            .scraper
            .scrape_batch(&urls)
            .await
            .into_iter()
            .filter(|p| p.success && !p.content.is_empty())
            .collect();

        if pages.is_empty() {
            return Err(PolybotError::WorkflowError(
                "no source page could be scraped".to_string(),
            ));
        }

        let body = self.synthesize(topic, &pages).await?;
        let report_path = self.reports.write_report(topic, &body).await?;

        Ok(ResearchOutcome { report_path, sources_used: pages.len() })
    }

    /// Ask the model for search queries; fall back to the topic itself
    /// when the answer is unusable.
    async fn plan_queries(&self, topic: &str) -> Result<Vec<String>> {
        let messages = [
            ChatMessage::system(PLANNING_INSTRUCTIONS),
            ChatMessage::user(topic),
        ];
        let options = ChatOptions::default().with_temperature(0.3);

        let response = self.manager.chat_completion(&messages, &options).await?;
        let mut queries = parse_queries(&response.content);
        if queries.is_empty() {
            warn!("Planner produced no usable queries, searching the topic verbatim");
            queries.push(topic.to_string());
        }
        Ok(queries)
    }

    /// Search every query and collect deduplicated urls, preserving
    /// first-seen order. Fails only when every query comes back empty.
    async fn gather_urls(&self, queries: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for query in queries {
            match self
                .search
                .search(query, Freshness::Month, self.results_per_query)
                .await
            {
                Ok(results) => {
                    for result in results {
                        if seen.insert(result.url.clone()) {
                            urls.push(result.url);
                        }
                    }
                }
                Err(e) => warn!("Search for '{}' failed: {}", query, e),
            }
        }

        if urls.is_empty() {
            return Err(PolybotError::WorkflowError(
                "search produced no results".to_string(),
            ));
        }
        Ok(urls)
    }

    async fn synthesize(&self, topic: &str, pages: &[ScrapedPage]) -> Result<String> {
        let mut prompt = format!("Topic: {topic}\n\nSources:\n");
        for (i, page) in pages.iter().enumerate() {
            let excerpt: String = page.content.chars().take(EXCERPT_CHARS).collect();
            prompt.push_str(&format!(
                "\n[{}] {} ({})\n{}\n",
                i + 1,
                page.title,
                page.url,
                excerpt
            ));
        }

        let messages = [
            ChatMessage::system(SYNTHESIS_INSTRUCTIONS),
            ChatMessage::user(prompt),
        ];
        let response = self
            .manager
            .chat_completion(&messages, &ChatOptions::default())
            .await?;

        let mut body = response.content;
        body.push_str("\n\n## Sources\n\n");
        for (i, page) in pages.iter().enumerate() {
            body.push_str(&format!("{}. [{}]({})\n", i + 1, page.title, page.url));
        }
        Ok(body)
    }
}

/// Non-empty lines, stripped of list markers, capped at MAX_QUERIES
fn parse_queries(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(MAX_QUERIES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_queries_plain_lines() {
        let queries = parse_queries("rust async runtimes\ntokio vs smol\n");
        assert_eq!(queries, vec!["rust async runtimes", "tokio vs smol"]);
    }

    #[test]
    fn test_parse_queries_strips_list_markers() {
        let queries = parse_queries("1. first query\n- second query\n* third query");
        assert_eq!(queries, vec!["first query", "second query", "third query"]);
    }

    #[test]
    fn test_parse_queries_caps_count() {
        let queries = parse_queries("a\nb\nc\nd\ne");
        assert_eq!(queries.len(), MAX_QUERIES);
    }

    #[test]
    fn test_parse_queries_empty_input() {
        assert!(parse_queries("\n  \n").is_empty());
    }
}
