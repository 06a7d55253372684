use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

use crate::ingest::types::LogSource;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Fetches the NDJSON payload with a plain GET.
pub struct HttpLogSource {
    url: String,
    client: reqwest::Client,
}

impl HttpLogSource {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs))
            .build()
            .context("building http client")?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?;

        let resp = resp
            .error_for_status()
            .with_context(|| format!("GET {} returned an error status", self.url))?;

        let body = resp.bytes().await.context("reading alert log body")?;
        Ok(body.to_vec())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
