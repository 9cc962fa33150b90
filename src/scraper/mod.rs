// Page fetch and text extraction
//
// Pages are fetched over plain HTTP with a per-request timeout and the
// HTML converted to readable markdown-ish text. Batch scraping runs in
// small fixed-size concurrent batches with a delay between batches to
// bound load on target servers; a failed page becomes a failed
// ScrapedPage, never an aborted batch.

use crate::error::Result;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

const PAGE_TIMEOUT: Duration = Duration::from_secs(20);
const BATCH_SIZE: usize = 3;
const BATCH_DELAY: Duration = Duration::from_millis(1500);
const MAX_CONTENT_CHARS: usize = 20_000;
const USER_AGENT: &str = "Mozilla/5.0 (compatible; polybot/0.3)";

/// Outcome of scraping one page
///
/// Failures are carried in-band (`success == false`) so batch results keep
/// one entry per requested url.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ScrapedPage {
    fn failure(url: &str, error: impl std::fmt::Display) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            content: String::new(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// HTTP page scraper with batched fetching
pub struct Scraper {
    client: Client,
}

impl Scraper {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(PAGE_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Fetch a single page and extract title + readable text
    pub async fn scrape(&self, url: &str) -> ScrapedPage {
        match self.fetch(url).await {
            Ok(html) => {
                let title = extract_title(&html);
                match htmd::convert(&html) {
                    Ok(mut content) => {
                        truncate_at_char_boundary(&mut content, MAX_CONTENT_CHARS);
                        ScrapedPage {
                            url: url.to_string(),
                            title,
                            content,
                            success: true,
                            error: None,
                        }
                    }
                    Err(e) => ScrapedPage::failure(url, format!("extraction failed: {e}")),
                }
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                ScrapedPage::failure(url, e)
            }
        }
    }

    /// Scrape urls in fixed-size concurrent batches with an inter-batch
    /// delay. Result order matches input order.
    pub async fn scrape_batch(&self, urls: &[String]) -> Vec<ScrapedPage> {
        let mut pages = Vec::with_capacity(urls.len());

        for (i, batch) in urls.chunks(BATCH_SIZE).enumerate() {
            if i > 0 {
                tokio::time::sleep(BATCH_DELAY).await;
            }

            debug!("Scraping batch of {} page(s)", batch.len());
            let fetches = batch.iter().map(|url| self.scrape(url));
            pages.extend(futures::future::join_all(fetches).await);
        }

        pages
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| crate::error::PolybotError::ScrapeError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(crate::error::PolybotError::ScrapeError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| crate::error::PolybotError::ScrapeError(e.to_string()))
    }
}

impl Default for Scraper {
    fn default() -> Self {
        Self::new()
    }
}

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"))
}

/// Truncate to at most `max_bytes`, backing up to the nearest UTF-8
/// character boundary so multi-byte content never splits mid-character.
fn truncate_at_char_boundary(content: &mut String, max_bytes: usize) {
    if content.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    content.truncate(cut);
}

fn extract_title(html: &str) -> String {
    title_regex()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
