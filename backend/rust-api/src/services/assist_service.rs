use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::models::AssistMode;

/// Client for the opaque AI assist service. The disclosure gate is enforced
/// by the session service before this is ever called; the remote side is
/// not assumed to enforce anything.
#[async_trait]
pub trait AssistBackend: Send + Sync {
    async fn request_assist(
        &self,
        problem_prompt: &str,
        learner_source: &str,
        mode: AssistMode,
    ) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct AssistApiRequest<'a> {
    problem_prompt: &'a str,
    learner_source: &'a str,
    mode: &'a str,
}

pub struct HttpAssistBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssistBackend {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AssistBackend for HttpAssistBackend {
    async fn request_assist(
        &self,
        problem_prompt: &str,
        learner_source: &str,
        mode: AssistMode,
    ) -> Result<String> {
        let url = format!("{}/v1/assist", self.base_url);
        let body = AssistApiRequest {
            problem_prompt,
            learner_source,
            mode: mode.as_str(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to call assist service")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Assist service returned status: {}",
                response.status()
            ));
        }

        let body: serde_json::Value = response.json().await?;
        let message = body["message"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid assist response format"))?
            .to_string();

        Ok(message)
    }
}
