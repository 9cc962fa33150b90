// Polybot REPL: route each line of input through the workflow router

use polybot::llm::ProviderManager;
use polybot::scraper::Scraper;
use polybot::search::SearchClient;
use polybot::services::{AppConfig, ProviderMode, ReportWriter};
use polybot::store::PlanStore;
use polybot::workflows::{
    chat_agent, ImageWorkflow, ResearchWorkflow, Router, SummarizeWorkflow, WorkflowKind,
};
use polybot::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::load()?;
    let manager = Arc::new(ProviderManager::new());

    match config.mode {
        ProviderMode::Auto => {
            manager.initialize_all(&config.provider_settings()).await?;
        }
        ProviderMode::Manual(kind) => {
            manager
                .initialize_single_provider(kind, config.forced_settings())
                .await?;
        }
    }

    // No surviving provider at startup is fatal; mid-session failures are
    // handled per request.
    if manager.is_degraded().await {
        error!("No AI provider could be initialized; check your API keys");
        std::process::exit(1);
    }

    let active = manager
        .active_provider()
        .await
        .map(|k| k.to_string())
        .unwrap_or_default();
    info!(
        "Ready. Active provider: {}. Available: {:?}",
        active,
        manager.available_providers().await
    );

    let store = PlanStore::open(&config.db_path).await?;
    let reports = ReportWriter::new(&config.reports_dir);
    let search = SearchClient::new(config.brave_api_key.clone());

    let router = Router::new(Arc::clone(&manager));
    let research = ResearchWorkflow::new(
        Arc::clone(&manager),
        search,
        Scraper::new(),
        ReportWriter::new(&config.reports_dir),
        config.search_result_count,
    );
    let summarize = SummarizeWorkflow::new(Arc::clone(&manager), Scraper::new());
    let image = ImageWorkflow::new(Arc::clone(&manager), reports);
    let mut chat = chat_agent(Arc::clone(&manager), store);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(b"polybot ready (ctrl-d to exit)\n> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let request = line.trim();
        if request.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        if request == "exit" || request == "quit" {
            break;
        }

        // A failed run is reported and the loop continues
        let output = match router.classify(request).await {
            WorkflowKind::Research => match research.run(request).await {
                Ok(outcome) => format!(
                    "Report written to {} ({} source(s))",
                    outcome.report_path.display(),
                    outcome.sources_used
                ),
                Err(e) => format!("Research failed: {e}"),
            },
            WorkflowKind::SummarizeUrl => match summarize.run(request).await {
                Ok(summary) => summary,
                Err(e) => format!("Summarization failed: {e}"),
            },
            WorkflowKind::GenerateImage => match image.run(request).await {
                Ok(path) => format!("Image written to {}", path.display()),
                Err(e) => format!("Image generation failed: {e}"),
            },
            WorkflowKind::Chat => match chat.chat_with_tools(request).await {
                Ok(response) => response.content,
                Err(e) => format!("Chat failed: {e}"),
            },
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
