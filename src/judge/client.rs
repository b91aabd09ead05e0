//! Execution service client
//!
//! The sandbox is a remote capability: source, stdin and a language id go in,
//! stdout/stderr/compiler output, resource usage and a status id come out.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    config::ExecutionConfig,
    error::{AppError, AppResult},
};

/// One execution request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language_id: i32,
    pub stdin: String,
}

/// Status reported by the execution service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExecutionStatus {
    pub id: i32,
    #[serde(default)]
    pub description: String,
}

/// Outcome of one execution. Missing or null fields decode as empty/zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub stdout: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stderr: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub compile_output: String,
    /// Elapsed seconds as a decimal string
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub memory: i32,
    #[serde(default)]
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    /// Elapsed time in seconds, zero when absent or malformed
    pub fn time_seconds(&self) -> f64 {
        self.time.trim().parse().unwrap_or(0.0)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Runs code in the remote sandbox
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Run one program against one input. Network failures, timeouts and
    /// non-success responses are errors.
    async fn execute(&self, request: &ExecutionRequest) -> AppResult<ExecutionResult>;
}

/// Judge0 HTTP client
#[derive(Debug, Clone)]
pub struct Judge0Client {
    http: reqwest::Client,
    api_url: String,
}

impl Judge0Client {
    /// Create a client with the configured per-call timeout
    pub fn new(config: &ExecutionConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn submissions_url(&self) -> String {
        format!("{}/submissions?wait=true&base64_encoded=false", self.api_url)
    }
}

#[async_trait]
impl ExecutionClient for Judge0Client {
    async fn execute(&self, request: &ExecutionRequest) -> AppResult<ExecutionResult> {
        let response = self
            .http
            .post(self.submissions_url())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Execution(format!(
                "execution service returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let result = response.json::<ExecutionResult>().await?;

        tracing::debug!(
            status_id = result.status.id,
            status = %result.status.description,
            time = %result.time,
            memory_kb = result.memory,
            "Execution finished"
        );

        Ok(result)
    }
}
