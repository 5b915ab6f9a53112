//! Configuration management for slotcast
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::guide::GuideSettings;
use crate::models::{HOUR_MS, MINUTE_MS};
use crate::resolver::ResolverSettings;
use crate::scheduler::{GenerationLimits, DEFAULT_MAX_LINEUP_ITEMS, SLACK_MS};
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lineup generation configuration
    pub scheduler: SchedulerConfig,

    /// Guide and resolver configuration
    pub guide: GuideConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Lineup generation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Hard cap on generated lineup length
    pub max_lineup_items: usize,

    /// Tolerance below which gaps are not worth padding, in milliseconds
    pub slack_ms: i64,
}

/// Guide building and refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    /// Longest single flex entry in the guide
    pub max_flex_duration_ms: i64,

    /// Grid the first flex entry of a window is floored to
    pub flex_alignment_ms: i64,

    /// Length of the flex answer for channels whose lineup is unusable
    pub fallback_duration_ms: i64,

    /// First retry delay after a failed build
    pub retry_base_delay_ms: u64,

    /// Upper bound on the retry delay
    pub retry_max_delay_ms: u64,

    /// Growth factor between retries
    pub retry_multiplier: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_lineup_items: DEFAULT_MAX_LINEUP_ITEMS,
            slack_ms: SLACK_MS,
        }
    }
}

impl Default for GuideConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_flex_duration_ms: 6 * HOUR_MS,
            flex_alignment_ms: 5 * MINUTE_MS,
            fallback_duration_ms: HOUR_MS,
            retry_base_delay_ms: retry.base_delay_ms,
            retry_max_delay_ms: retry.max_delay_ms,
            retry_multiplier: retry.backoff_multiplier,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let max_lineup_items = env_or(
            "SLOTCAST_MAX_LINEUP_ITEMS",
            defaults.scheduler.max_lineup_items,
        );
        let slack_ms = env_or("SLOTCAST_SLACK_MS", defaults.scheduler.slack_ms);

        let max_flex_duration_ms = env_or(
            "SLOTCAST_MAX_FLEX_DURATION_MS",
            defaults.guide.max_flex_duration_ms,
        );
        let flex_alignment_ms =
            env_or("SLOTCAST_FLEX_ALIGNMENT_MS", defaults.guide.flex_alignment_ms);
        let fallback_duration_ms = env_or(
            "SLOTCAST_FALLBACK_DURATION_MS",
            defaults.guide.fallback_duration_ms,
        );
        let retry_base_delay_ms = env_or(
            "SLOTCAST_RETRY_BASE_DELAY_MS",
            defaults.guide.retry_base_delay_ms,
        );
        let retry_max_delay_ms = env_or(
            "SLOTCAST_RETRY_MAX_DELAY_MS",
            defaults.guide.retry_max_delay_ms,
        );
        let retry_multiplier = env_or("SLOTCAST_RETRY_MULTIPLIER", defaults.guide.retry_multiplier);

        let log_level =
            std::env::var("SLOTCAST_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("SLOTCAST_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            scheduler: SchedulerConfig {
                max_lineup_items,
                slack_ms,
            },
            guide: GuideConfig {
                max_flex_duration_ms,
                flex_alignment_ms,
                fallback_duration_ms,
                retry_base_delay_ms,
                retry_max_delay_ms,
                retry_multiplier,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.max_lineup_items == 0 {
            anyhow::bail!("max_lineup_items must be greater than 0");
        }

        if self.scheduler.slack_ms < 0 {
            anyhow::bail!("slack_ms must not be negative");
        }

        if self.guide.max_flex_duration_ms <= 0 {
            anyhow::bail!("max_flex_duration_ms must be positive");
        }

        if self.guide.flex_alignment_ms <= 0 {
            anyhow::bail!("flex_alignment_ms must be positive");
        }

        if self.guide.fallback_duration_ms <= 0 {
            anyhow::bail!("fallback_duration_ms must be positive");
        }

        if self.guide.retry_base_delay_ms > self.guide.retry_max_delay_ms {
            anyhow::bail!("retry_base_delay_ms must not exceed retry_max_delay_ms");
        }

        if !self.guide.retry_multiplier.is_finite() || self.guide.retry_multiplier < 1.0 {
            anyhow::bail!("retry_multiplier must be at least 1.0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Limits applied to lineup generation
    #[must_use]
    pub fn generation_limits(&self) -> GenerationLimits {
        GenerationLimits {
            max_items: self.scheduler.max_lineup_items,
            slack: self.scheduler.slack_ms,
        }
    }

    /// Settings for the guide builder
    #[must_use]
    pub fn guide_settings(&self) -> GuideSettings {
        GuideSettings {
            max_flex_duration: self.guide.max_flex_duration_ms,
            flex_alignment: self.guide.flex_alignment_ms,
        }
    }

    /// Settings for the lineup resolver
    #[must_use]
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            fallback_duration: self.guide.fallback_duration_ms,
        }
    }

    /// Backoff used by the guide service
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_delays(self.guide.retry_base_delay_ms, self.guide.retry_max_delay_ms)
            .with_multiplier(self.guide.retry_multiplier)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            guide: GuideConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
