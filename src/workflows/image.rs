// Image generation workflow

use crate::error::{PolybotError, Result};
use crate::llm::{ChatOptions, ProviderManager};
use crate::services::ReportWriter;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Generate an image and persist it as a timestamped PNG
pub struct ImageWorkflow {
    manager: Arc<ProviderManager>,
    reports: ReportWriter,
}

impl ImageWorkflow {
    pub fn new(manager: Arc<ProviderManager>, reports: ReportWriter) -> Self {
        Self { manager, reports }
    }

    pub async fn run(&self, prompt: &str) -> Result<PathBuf> {
        let image = self
            .manager
            .generate_image(prompt, &ChatOptions::default())
            .await?;

        let bytes = STANDARD.decode(&image.b64_png).map_err(|e| {
            PolybotError::WorkflowError(format!(
                "provider '{}' returned an undecodable image payload: {e}",
                image.provider
            ))
        })?;

        info!(
            "Generated image via '{}' model '{}' ({} bytes)",
            image.provider,
            image.model,
            bytes.len()
        );
        self.reports.write_image(prompt, &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_without_capable_provider_fails() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = ImageWorkflow::new(
            Arc::new(ProviderManager::new()),
            ReportWriter::new(dir.path()),
        );
        let result = workflow.run("a teapot").await;
        assert!(matches!(result, Err(PolybotError::NoAvailableProvider)));
    }
}
