use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::FINALIZE_CALLS_TOTAL;
use crate::models::submission::{FinalizeResponse, FinalizeState, SubmissionRecord};

/// Transport to the grading/persistence collaborator.
#[async_trait]
pub trait GradingBackend: Send + Sync {
    async fn finalize(&self, record: &SubmissionRecord) -> Result<FinalizeResponse>;
}

pub struct HttpGradingBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGradingBackend {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GradingBackend for HttpGradingBackend {
    async fn finalize(&self, record: &SubmissionRecord) -> Result<FinalizeResponse> {
        let url = format!("{}/v1/submissions", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .context("Failed to call grading service")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Grading service returned status: {}",
                response.status()
            ));
        }

        response
            .json::<FinalizeResponse>()
            .await
            .context("Grading service response was not valid JSON")
    }
}

/// Performs the one finalizing network call for a finished session.
///
/// At-most-one call per transition into the finished state is guaranteed by
/// the session state machine's guard, not here: the coordinator trusts its
/// single caller and never retries on its own. A transport failure is
/// folded into `FinalizeState::Failed` so the caller can surface it with a
/// retry affordance without the session ever leaving the finished state.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    backend: Arc<dyn GradingBackend>,
}

impl SubmissionCoordinator {
    pub fn new(backend: Arc<dyn GradingBackend>) -> Self {
        Self { backend }
    }

    pub async fn finalize(&self, record: &SubmissionRecord) -> FinalizeState {
        match self.backend.finalize(record).await {
            Ok(FinalizeResponse { accepted: true, .. }) => {
                tracing::info!(
                    "Submission finalized: session={}, passed={}, duration={}s",
                    record.session_id,
                    record.passed,
                    record.duration_seconds
                );
                FINALIZE_CALLS_TOTAL.with_label_values(&["accepted"]).inc();
                FinalizeState::Accepted
            }
            Ok(FinalizeResponse {
                accepted: false,
                reason,
            }) => {
                tracing::warn!(
                    "Submission rejected by grading service: session={}, reason={:?}",
                    record.session_id,
                    reason
                );
                FINALIZE_CALLS_TOTAL.with_label_values(&["rejected"]).inc();
                FinalizeState::Rejected { reason }
            }
            Err(e) => {
                tracing::error!(
                    "Finalize call failed: session={}, error={:#}",
                    record.session_id,
                    e
                );
                FINALIZE_CALLS_TOTAL.with_label_values(&["failed"]).inc();
                FinalizeState::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
