use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::metrics::EXECUTIONS_TOTAL;
use crate::models::execution::{ExecutionRequest, ExecutionResult};
use crate::utils::diagnostics::extract_error_line;

/// One call to the remote execution sandbox. No retry policy of its own:
/// the harness and the run endpoint decide what a failure means.
///
/// Implementations never return an error: transport and service failures
/// are folded into an `ExecutionResult` with a non-empty `error_message`,
/// so callers always distinguish "wrong output" from "failed to run" the
/// same way.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult;
}

#[derive(Debug, Serialize)]
struct ExecuteApiRequest<'a> {
    language: &'a str,
    source: &'a str,
    stdin: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExecuteApiResponse {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpExecutionBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExecutionBackend {
    pub fn new(base_url: &str, timeout_seconds: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn from_api_response(response: ExecuteApiResponse) -> ExecutionResult {
        let error_message = response.error.filter(|e| !e.trim().is_empty());
        let error_line = error_message.as_deref().and_then(extract_error_line);
        ExecutionResult {
            stdout: response.stdout.unwrap_or_default(),
            error_message,
            error_line,
        }
    }
}

#[async_trait]
impl ExecutionBackend for HttpExecutionBackend {
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let url = format!("{}/v1/execute", self.base_url);
        let body = ExecuteApiRequest {
            language: &request.language,
            source: &request.source,
            stdin: &request.stdin,
        };

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Execution service call failed: {}", e);
                EXECUTIONS_TOTAL.with_label_values(&["error"]).inc();
                return ExecutionResult::failed(format!("execution service unavailable: {}", e));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!("Execution service returned status: {}", status);
            EXECUTIONS_TOTAL.with_label_values(&["error"]).inc();
            return ExecutionResult::failed(format!("execution service returned {}", status));
        }

        match response.json::<ExecuteApiResponse>().await {
            Ok(api_response) => {
                let result = Self::from_api_response(api_response);
                let label = if result.is_failure() { "error" } else { "ok" };
                EXECUTIONS_TOTAL.with_label_values(&[label]).inc();
                result
            }
            Err(e) => {
                tracing::warn!("Execution service response was unreadable: {}", e);
                EXECUTIONS_TOTAL.with_label_values(&["error"]).inc();
                ExecutionResult::failed(format!("invalid execution service response: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_maps_to_success() {
        let result = HttpExecutionBackend::from_api_response(ExecuteApiResponse {
            stdout: Some("42\n".to_string()),
            error: None,
        });
        assert_eq!(result.stdout, "42\n");
        assert!(!result.is_failure());
        assert_eq!(result.error_line, None);
    }

    #[test]
    fn blank_error_counts_as_success() {
        let result = HttpExecutionBackend::from_api_response(ExecuteApiResponse {
            stdout: Some("ok".to_string()),
            error: Some("   ".to_string()),
        });
        assert!(!result.is_failure());
    }

    #[test]
    fn error_line_is_extracted_from_diagnostics() {
        let result = HttpExecutionBackend::from_api_response(ExecuteApiResponse {
            stdout: None,
            error: Some("File \"main.py\", line 4, in <module>\nNameError: name 'x'".into()),
        });
        assert!(result.is_failure());
        assert_eq!(result.error_line, Some(4));
    }
}
