use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub correlation: CorrelationConfig,
    pub switch: SwitchConfig,
    pub store: StoreConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shell command that launches the capture engine. The engine speaks
    /// newline-delimited JSON on stdin/stdout.
    pub command: String,
    /// Delay before a finished recording is handed to the engine for upload.
    pub upload_delay_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: "callscribe-engine".to_string(),
            upload_delay_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Minutes of slack on either side of a calendar event's time window.
    pub buffer_minutes: i64,
    /// Assumed meeting length when the calendar event has no end time.
    pub default_duration_minutes: i64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            buffer_minutes: 5,
            default_duration_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// How long to let a stop propagate through the engine before reading
    /// persisted state during an audio-to-video switch.
    pub settle_delay_ms: u64,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub cache_ttl_ms: u64,
    pub read_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 500,
            read_retries: 3,
            retry_backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3890 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
