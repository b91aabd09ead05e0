//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONSUMER_GROUP, DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DEAD_LETTER_QUEUE,
    DEFAULT_EXECUTION_TIMEOUT_SECS, DEFAULT_JUDGE_QUEUE, DEFAULT_JUDGE_WORKERS,
    DEFAULT_MAX_RETRIES, DEFAULT_QUEUE_BLOCK_MS, DEFAULT_RESULT_QUEUE, DEFAULT_RESULT_WORKERS,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT, DEFAULT_SUBMISSIONS_PATH, DEFAULT_TEST_CASES_ROOT,
};

/// Global application configuration (lazily initialized)
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub workers: WorkerConfig,
    pub execution: ExecutionConfig,
    pub storage: StorageConfig,
    pub retry: RetryConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Which broker implementation carries the queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Redis,
    Memory,
}

impl FromStr for QueueBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("QUEUE_BACKEND".to_string())),
        }
    }
}

/// Message queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    pub redis_url: String,
    pub judge_queue: String,
    pub result_queue: String,
    pub dead_letter_queue: String,
    pub consumer_group: String,
    pub block_ms: u64,
}

/// Background consumer configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Prefix for consumer names registered with the broker
    pub worker_id: String,
    pub judge_workers: usize,
    pub result_workers: usize,
}

/// Remote execution service configuration
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub api_url: String,
    pub timeout: Duration,
}

/// File storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub submissions_path: PathBuf,
    pub test_cases_root: PathBuf,
}

/// Retry and dead-letter policy for publishes and consumer handlers
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u8,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            queue: QueueConfig::from_env()?,
            workers: WorkerConfig::from_env()?,
            execution: ExecutionConfig::from_env()?,
            storage: StorageConfig::from_env(),
            retry: RetryConfig::from_env()?,
        })
    }
}

/// Read an optional variable and parse it, falling back to `default`
fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(default),
    }
}

fn string_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: string_or("SERVER_HOST", DEFAULT_SERVER_HOST),
            port: parse_or("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            rust_log: string_or("RUST_LOG", "info"),
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
        })
    }
}

impl QueueConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            backend: parse_or("QUEUE_BACKEND", QueueBackend::Redis)?,
            redis_url: string_or("REDIS_URL", "redis://localhost:6379"),
            judge_queue: string_or("JUDGE_QUEUE", DEFAULT_JUDGE_QUEUE),
            result_queue: string_or("RESULT_QUEUE", DEFAULT_RESULT_QUEUE),
            dead_letter_queue: string_or("DEAD_LETTER_QUEUE", DEFAULT_DEAD_LETTER_QUEUE),
            consumer_group: string_or("QUEUE_CONSUMER_GROUP", DEFAULT_CONSUMER_GROUP),
            block_ms: parse_or("QUEUE_BLOCK_MS", DEFAULT_QUEUE_BLOCK_MS)?,
        })
    }
}

impl WorkerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let judge_workers = parse_or("JUDGE_WORKERS", DEFAULT_JUDGE_WORKERS)?;
        let result_workers = parse_or("RESULT_WORKERS", DEFAULT_RESULT_WORKERS)?;
        if judge_workers == 0 {
            return Err(ConfigError::InvalidValue("JUDGE_WORKERS".to_string()));
        }
        if result_workers == 0 {
            return Err(ConfigError::InvalidValue("RESULT_WORKERS".to_string()));
        }

        Ok(Self {
            worker_id: string_or("WORKER_ID", "neptune-1"),
            judge_workers,
            result_workers,
        })
    }
}

impl ExecutionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: env::var("EXECUTION_API_URL")
                .map_err(|_| ConfigError::Missing("EXECUTION_API_URL".to_string()))?,
            timeout: Duration::from_secs(parse_or(
                "EXECUTION_TIMEOUT_SECS",
                DEFAULT_EXECUTION_TIMEOUT_SECS,
            )?),
        })
    }
}

impl StorageConfig {
    fn from_env() -> Self {
        Self {
            submissions_path: PathBuf::from(string_or("SUBMISSIONS_PATH", DEFAULT_SUBMISSIONS_PATH)),
            test_cases_root: PathBuf::from(string_or("TEST_CASES_ROOT", DEFAULT_TEST_CASES_ROOT)),
        }
    }
}

impl RetryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_retries: parse_or("PUBLISH_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            base_delay_ms: parse_or("RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS)?,
            max_delay_ms: parse_or("RETRY_MAX_DELAY_MS", DEFAULT_RETRY_MAX_DELAY_MS)?,
        })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
