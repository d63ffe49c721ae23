//! On-disk configuration (§6): `{ driver, update_interval_ms, mappers_dir,
//! event_buffer, http }`, loaded once at startup.

use driver::DriverConfig;
use engine::EngineConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    55355
}
fn default_request_timeout_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    50
}
fn default_chunk_size() -> u32 {
    512
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl From<DriverSection> for DriverConfig {
    fn from(section: DriverSection) -> Self {
        DriverConfig {
            host: section.host,
            port: section.port,
            request_timeout: Duration::from_millis(section.request_timeout_ms),
            max_retries: section.max_retries,
            retry_delay: Duration::from_millis(section.retry_delay_ms),
            chunk_size: section.chunk_size,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8085".to_string()
}

impl Default for HttpSection {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHookConfig {
    #[serde(default)]
    pub driver: DriverSection,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_mappers_dir")]
    pub mappers_dir: PathBuf,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    #[serde(default)]
    pub http: HttpSection,
}

fn default_update_interval_ms() -> u64 {
    5
}
fn default_mappers_dir() -> PathBuf {
    PathBuf::from("mappers")
}
fn default_event_buffer() -> usize {
    256
}

impl Default for GameHookConfig {
    fn default() -> Self {
        Self {
            driver: DriverSection::default(),
            update_interval_ms: default_update_interval_ms(),
            mappers_dir: default_mappers_dir(),
            event_buffer: default_event_buffer(),
            http: HttpSection::default(),
        }
    }
}

impl GameHookConfig {
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn engine_config(self) -> (EngineConfig, String) {
        let engine_config = EngineConfig {
            driver: self.driver.into(),
            update_interval: Duration::from_millis(self.update_interval_ms),
            mappers_dir: self.mappers_dir,
            event_buffer: self.event_buffer,
        };
        (engine_config, self.http.bind)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
