// Report persistence
//
// Research reports and generated images are written to a per-run output
// directory with timestamped filenames so successive runs never clobber
// each other.

use crate::error::Result;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes workflow artifacts (markdown reports, PNG images) to disk
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write a markdown report, returning the path written
    pub async fn write_report(&self, topic: &str, body: &str) -> Result<PathBuf> {
        let path = self.dir.join(timestamped_name(topic, "md"));
        self.write(&path, body.as_bytes()).await?;
        info!("Wrote report to {}", path.display());
        Ok(path)
    }

    /// Write a PNG image, returning the path written
    pub async fn write_image(&self, topic: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(timestamped_name(topic, "png"));
        self.write(&path, png).await?;
        info!("Wrote image to {}", path.display());
        Ok(path)
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

/// Filesystem-safe timestamped filename: `<slug>-<YYYYMMDD-HHMMSS>.<ext>`
fn timestamped_name(topic: &str, ext: &str) -> String {
    let slug: String = topic
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .take(6)
        .collect::<Vec<_>>()
        .join("-");

    let slug = if slug.is_empty() { "report".to_string() } else { slug };
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    format!("{slug}-{stamp}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamped_name_slugifies() {
        let name = timestamped_name("Rust async: state of the art?", "md");
        assert!(name.starts_with("rust-async-state-of-the-art-"));
        assert!(name.ends_with(".md"));
    }

    #[test]
    fn test_timestamped_name_empty_topic() {
        let name = timestamped_name("???", "png");
        assert!(name.starts_with("report-"));
        assert!(name.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_write_report_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested"));

        let path = writer.write_report("topic", "# Body").await.unwrap();
        assert!(path.exists());

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "# Body");
    }
}
