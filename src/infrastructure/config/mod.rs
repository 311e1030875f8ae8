//! Configuration loading for the streaming service
//!
//! Supports JSON configuration files for:
//! - Server binding
//! - The per-tier quota table
//! - Engine timing (eviction sweep, staleness threshold, metrics interval)
//! - Synthetic generation cadence per topic

use crate::domain::QuotaTable;
use crate::infrastructure::dispatcher::DispatcherConfig;
use crate::infrastructure::producer::ProducerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Root configuration for the streaming service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerConfig {
    /// Service name/identifier
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-tier quota table
    #[serde(default)]
    pub quotas: QuotaTable,

    /// Engine timing configuration
    #[serde(default)]
    pub timing: TimingConfig,

    /// Synthetic generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Channel sizing
    #[serde(default)]
    pub channels: ChannelConfig,
}

fn default_service_name() -> String {
    "RankPilot Stream".to_string()
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            server: ServerConfig::default(),
            quotas: QuotaTable::default(),
            timing: TimingConfig::default(),
            generation: GenerationConfig::default(),
            channels: ChannelConfig::default(),
        }
    }
}

impl StreamerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            quotas: self.quotas,
            sweep_interval: Duration::from_millis(self.timing.sweep_interval_ms),
            staleness_threshold: Duration::from_millis(self.timing.staleness_threshold_ms),
            metrics_interval: Duration::from_millis(self.timing.metrics_interval_ms),
            metrics_capacity: self.channels.metrics_capacity,
        }
    }

    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            default_interval: Duration::from_millis(self.generation.default_interval_ms),
            per_topic: self
                .generation
                .per_topic_ms
                .iter()
                .map(|(topic, ms)| (topic.clone(), Duration::from_millis(*ms)))
                .collect(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Engine timing configuration (milliseconds in the file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_staleness_threshold_ms")]
    pub staleness_threshold_ms: u64,
    #[serde(default = "default_metrics_interval_ms")]
    pub metrics_interval_ms: u64,
}

fn default_sweep_interval_ms() -> u64 {
    10_000
}
fn default_staleness_threshold_ms() -> u64 {
    30_000
}
fn default_metrics_interval_ms() -> u64 {
    1_000
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
            staleness_threshold_ms: default_staleness_threshold_ms(),
            metrics_interval_ms: default_metrics_interval_ms(),
        }
    }
}

/// Synthetic generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_interval_ms")]
    pub default_interval_ms: u64,
    /// Per-topic interval overrides, keyed by topic name
    #[serde(default)]
    pub per_topic_ms: HashMap<String, u64>,
}

fn default_generation_interval_ms() -> u64 {
    5_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: default_generation_interval_ms(),
            per_topic_ms: HashMap::new(),
        }
    }
}

/// Channel sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Per-connection delivery buffer between engine and transport
    #[serde(default = "default_delivery_buffer")]
    pub delivery_buffer: usize,
    /// Metrics broadcast channel capacity
    #[serde(default = "default_metrics_capacity")]
    pub metrics_capacity: usize,
}

fn default_delivery_buffer() -> usize {
    256
}
fn default_metrics_capacity() -> usize {
    64
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            delivery_buffer: default_delivery_buffer(),
            metrics_capacity: default_metrics_capacity(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {error}")]
    Io { path: String, error: String },
    #[error("failed to parse config: {0}")]
    Parse(String),
}
