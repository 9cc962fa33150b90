// Service layer: configuration and report persistence

pub mod config;
pub mod reports;

pub use config::{AppConfig, ProviderMode};
pub use reports::ReportWriter;
