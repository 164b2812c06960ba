use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::models::problem::ProblemSpec;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// Read-only access to the content collaborator. Problems are fetched once,
/// at session creation.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn fetch_problem(&self, problem_id: &str) -> Result<ProblemSpec>;
}

pub struct HttpContentProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentProvider {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_once(&self, problem_id: &str) -> Result<ProblemSpec> {
        let url = format!("{}/v1/problems/{}", self.base_url, problem_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to call content service")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(anyhow!("Problem not found: {}", problem_id));
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "Content service returned status: {}",
                response.status()
            ));
        }

        // Lenient parse: field-level defaults absorb partial or malformed
        // payloads, so a broken hint list degrades to an empty one instead
        // of failing the whole session load.
        let value: serde_json::Value = response
            .json()
            .await
            .context("Content service response was not JSON")?;
        let spec: ProblemSpec = serde_json::from_value(value)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    "Problem {} payload was malformed ({}), using defaults",
                    problem_id,
                    e
                );
                ProblemSpec {
                    id: problem_id.to_string(),
                    ..Default::default()
                }
            });

        Ok(spec.sanitize(problem_id))
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn fetch_problem(&self, problem_id: &str) -> Result<ProblemSpec> {
        // Reads are idempotent, so a bounded retry is safe here.
        retry_async_with_config(RetryConfig::default(), || self.fetch_once(problem_id)).await
    }
}
