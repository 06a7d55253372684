use anyhow::Result;
use async_trait::async_trait;

use crate::ingest::types::LogSource;

/// In-memory payload, for tests and demos.
pub struct FixtureLogSource {
    body: Vec<u8>,
}

impl FixtureLogSource {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl LogSource for FixtureLogSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        Ok(self.body.clone())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
