use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::ingest::types::LogSource;

/// Reads an `eve.json`-style NDJSON file from disk on every fetch.
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading alert log from {}", self.path.display()))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
