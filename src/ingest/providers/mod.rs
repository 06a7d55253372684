// src/ingest/providers/mod.rs
pub mod file;
pub mod fixture;
pub mod http;

use crate::ingest::config::SourceConfig;
use crate::ingest::types::LogSource;
use anyhow::Result;
use std::sync::Arc;

/// Build the log source described by the configuration.
pub fn from_config(cfg: &SourceConfig) -> Result<Arc<dyn LogSource>> {
    let source: Arc<dyn LogSource> = match cfg {
        SourceConfig::File { path } => Arc::new(file::FileLogSource::new(path.clone())),
        SourceConfig::Http { url, timeout_secs } => {
            Arc::new(http::HttpLogSource::new(url.clone(), *timeout_secs)?)
        }
    };
    Ok(source)
}
