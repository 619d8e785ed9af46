use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::domain::delivery::DEFAULT_REST_WEEKDAY;
use crate::utils::RetryConfig;

// ============================================================================
// Engine Configuration
// ============================================================================
//
// Precedence (lowest to highest):
// 1. Built-in defaults
// 2. TOML file, when one is given
// 3. DELIVERY_* environment variables
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Weekday on which no delivery happens.
    pub rest_weekday: Weekday,
    /// Per-order transitions a batch runs at once.
    pub batch_concurrency: usize,
    pub notification_max_attempts: u32,
    pub notification_initial_delay_ms: u64,
    pub metrics_port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rest_weekday: DEFAULT_REST_WEEKDAY,
            batch_concurrency: 8,
            notification_max_attempts: 3,
            notification_initial_delay_ms: 100,
            metrics_port: 9090,
        }
    }
}

impl EngineConfig {
    /// Defaults, then the optional TOML file, then environment overrides.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path).await?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::debug!(?config, "Loaded engine configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse engine config")
    }

    async fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply `DELIVERY_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(value) = lookup("DELIVERY_REST_WEEKDAY") {
            self.rest_weekday = value
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid DELIVERY_REST_WEEKDAY value {value:?}: {e}"))?;
        }

        if let Some(value) = lookup("DELIVERY_BATCH_CONCURRENCY") {
            self.batch_concurrency = value
                .parse()
                .with_context(|| format!("Invalid DELIVERY_BATCH_CONCURRENCY value {value:?}"))?;
        }

        if let Some(value) = lookup("DELIVERY_NOTIFICATION_MAX_ATTEMPTS") {
            self.notification_max_attempts = value
                .parse()
                .with_context(|| format!("Invalid DELIVERY_NOTIFICATION_MAX_ATTEMPTS value {value:?}"))?;
        }

        if let Some(value) = lookup("DELIVERY_NOTIFICATION_INITIAL_DELAY_MS") {
            self.notification_initial_delay_ms = value
                .parse()
                .with_context(|| format!("Invalid DELIVERY_NOTIFICATION_INITIAL_DELAY_MS value {value:?}"))?;
        }

        if let Some(value) = lookup("DELIVERY_METRICS_PORT") {
            self.metrics_port = value
                .parse()
                .with_context(|| format!("Invalid DELIVERY_METRICS_PORT value {value:?}"))?;
        }

        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.batch_concurrency > 0, "batch_concurrency must be at least 1");
        anyhow::ensure!(
            self.notification_max_attempts > 0,
            "notification_max_attempts must be at least 1"
        );
        Ok(())
    }

    /// Backoff settings for the notification worker.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.notification_max_attempts,
            initial_delay: Duration::from_millis(self.notification_initial_delay_ms),
            ..RetryConfig::default()
        }
    }
}
