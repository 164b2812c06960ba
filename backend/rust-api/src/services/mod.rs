use std::sync::Arc;

use crate::config::Config;

pub mod assist_service;
pub mod clock;
pub mod content_service;
pub mod disclosure;
pub mod execution_client;
pub mod session_service;
pub mod submission_service;
pub mod test_harness;

use self::assist_service::{AssistBackend, HttpAssistBackend};
use self::content_service::{ContentProvider, HttpContentProvider};
use self::execution_client::{ExecutionBackend, HttpExecutionBackend};
use self::session_service::{RuntimeSettings, SessionService};
use self::submission_service::{GradingBackend, HttpGradingBackend, SubmissionCoordinator};

pub struct AppState {
    pub config: Config,
    pub sessions: SessionService,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let execution: Arc<dyn ExecutionBackend> = Arc::new(HttpExecutionBackend::new(
            &config.execution_api_url,
            config.execution_timeout_seconds,
        )?);
        let content: Arc<dyn ContentProvider> =
            Arc::new(HttpContentProvider::new(&config.content_api_url)?);
        let assist: Arc<dyn AssistBackend> =
            Arc::new(HttpAssistBackend::new(&config.assist_api_url)?);
        let grading: Arc<dyn GradingBackend> =
            Arc::new(HttpGradingBackend::new(&config.grading_api_url)?);

        Ok(Self::with_backends(
            config, execution, content, assist, grading,
        ))
    }

    /// Wires explicit collaborator backends. Integration tests use this
    /// with in-memory fakes instead of the HTTP clients.
    pub fn with_backends(
        config: Config,
        execution: Arc<dyn ExecutionBackend>,
        content: Arc<dyn ContentProvider>,
        assist: Arc<dyn AssistBackend>,
        grading: Arc<dyn GradingBackend>,
    ) -> Self {
        let settings = RuntimeSettings {
            hint_unlock_interval_seconds: config.hint_unlock_interval_seconds,
            assist_unlock_delay_seconds: config.assist_unlock_delay_seconds,
            default_time_limit_seconds: config.default_time_limit_seconds,
        };
        let sessions = SessionService::new(
            settings,
            execution,
            content,
            assist,
            SubmissionCoordinator::new(grading),
        );
        Self { config, sessions }
    }
}
