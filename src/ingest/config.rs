// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_MAX_BODY_BYTES;
use crate::ingest::providers::http::DEFAULT_TIMEOUT_SECS;
use crate::pipeline::PipelineOptions;

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const ENV_LOG_URL: &str = "EVE_LOG_URL";
pub const ENV_LOG_PATH: &str = "EVE_LOG_PATH";

pub const DEFAULT_LOG_PATH: &str = "eve.json";

fn default_max_reported_failures() -> usize {
    50
}
fn default_parallel_threshold() -> usize {
    PipelineOptions::default().parallel_threshold
}
fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Where the raw alert log comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    File {
        path: PathBuf,
    },
    Http {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::File {
            path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub source: SourceConfig,
    /// Cap on parse failures echoed back in a dashboard response.
    #[serde(default = "default_max_reported_failures")]
    pub max_reported_failures: usize,
    /// Record count at which the aggregators fan out onto threads.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    /// Largest payload accepted by `POST /api/analyze`, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            max_reported_failures: default_max_reported_failures(),
            parallel_threshold: default_parallel_threshold(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl DashboardConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            parallel_threshold: self.parallel_threshold,
        }
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing dashboard config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $DASHBOARD_CONFIG_PATH
    /// 2) config/dashboard.toml
    /// 3) config/dashboard.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn load_file_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/dashboard.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/dashboard.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// `EVE_LOG_URL` wins over `EVE_LOG_PATH`; both win over the file.
    fn apply_env_overrides(&mut self) {
        let non_empty = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_LOG_URL) {
            let timeout_secs = match &self.source {
                SourceConfig::Http { timeout_secs, .. } => *timeout_secs,
                SourceConfig::File { .. } => DEFAULT_TIMEOUT_SECS,
            };
            self.source = SourceConfig::Http {
                url: url.trim().to_string(),
                timeout_secs,
            };
        } else if let Some(path) = non_empty(ENV_LOG_PATH) {
            self.source = SourceConfig::File {
                path: PathBuf::from(path.trim()),
            };
        }
    }

    fn sanitize(&mut self) {
        if self.max_body_bytes == 0 {
            self.max_body_bytes = DEFAULT_MAX_BODY_BYTES;
        }
        if let SourceConfig::Http { timeout_secs, .. } = &mut self.source {
            if *timeout_secs == 0 {
                *timeout_secs = DEFAULT_TIMEOUT_SECS;
            }
        }
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<DashboardConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    if hint_ext == "toml" {
        return Ok(toml::from_str(s)?);
    }
    // Unknown extension: JSON if it looks like an object, else TOML.
    if s.trim_start().starts_with('{') {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
    }
    toml::from_str(s).map_err(|e| anyhow!("unsupported dashboard config format: {e}"))
}
