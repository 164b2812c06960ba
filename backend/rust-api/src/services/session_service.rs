use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::metrics::{
    ASSIST_REQUESTS_TOTAL, HINTS_SERVED_TOTAL, SESSIONS_ACTIVE, SESSIONS_TOTAL, TEST_RUNS_TOTAL,
};
use crate::models::execution::{
    ExecutionRequest, ExecutionResult, RunTestsResponse, TestVerdictView,
};
use crate::models::problem::ProblemSpec;
use crate::models::submission::{FinalizeState, SubmissionRecord};
use crate::models::timer::{TimeExpired, TimerEvent, TimerTick};
use crate::models::{
    AssistRequest, AssistResponse, CreateSessionRequest, CreateSessionResponse,
    FinishSessionRequest, FinishSessionResponse, HintListResponse, HintView, RunRequest,
    RunTestsRequest, Session, SessionState, SessionStatusResponse,
};
use crate::services::assist_service::AssistBackend;
use crate::services::clock::Clock;
use crate::services::content_service::ContentProvider;
use crate::services::disclosure::DisclosureScheduler;
use crate::services::execution_client::ExecutionBackend;
use crate::services::submission_service::SubmissionCoordinator;
use crate::services::test_harness;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,
    #[error("Problem not found: {0}")]
    ProblemNotFound(String),
    #[error("Session is not active")]
    NotActive,
    #[error("AI assistance is still locked")]
    AssistLocked,
    #[error("Assist service failed: {0}")]
    AssistFailed(String),
    #[error("Finalize retry is only valid after a failed finalize")]
    FinalizeNotRetryable,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Runtime knobs the state machine needs; sourced from Config.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub hint_unlock_interval_seconds: u32,
    pub assist_unlock_delay_seconds: u32,
    pub default_time_limit_seconds: u32,
}

/// Everything one attempt owns: the session record, its read-only problem,
/// the clock (present once started) and the finalize bookkeeping.
pub struct SessionRuntime {
    pub session: Session,
    pub problem: ProblemSpec,
    pub clock: Option<Clock>,
    pub focus_mode_engaged: bool,
    pub finalize_state: Option<FinalizeState>,
    pub pending_record: Option<SubmissionRecord>,
    pub last_passed: Option<bool>,
    pub last_language: Option<String>,
}

type SharedRuntime = Arc<Mutex<SessionRuntime>>;

/// What one 1 Hz tick of the scheduler loop observed for a session.
pub enum TickOutcome {
    /// Regular tick payload.
    Tick(TimerEvent),
    /// This caller won the one-shot expiry latch; it must trigger the
    /// forced finish and emit the expiry event.
    Expired(TimerEvent),
    /// The session is finished (or another stream claimed the expiry);
    /// the stream should end.
    Finished,
}

/// Owns the attempt lifecycle (NotStarted -> Active -> Finished), gates
/// entry to the clock, disclosure, harness and assist components, and is
/// the only caller of the SubmissionCoordinator.
///
/// All cross-task access to one session goes through its mutex; the
/// finish guard (state check + state write under that lock, before any
/// network await) is what makes the submit-click vs deadline-expiry race
/// resolve to exactly one finalize call.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<RwLock<HashMap<String, SharedRuntime>>>,
    scheduler: DisclosureScheduler,
    settings: RuntimeSettings,
    execution: Arc<dyn ExecutionBackend>,
    content: Arc<dyn ContentProvider>,
    assist: Arc<dyn AssistBackend>,
    coordinator: SubmissionCoordinator,
}

impl SessionService {
    pub fn new(
        settings: RuntimeSettings,
        execution: Arc<dyn ExecutionBackend>,
        content: Arc<dyn ContentProvider>,
        assist: Arc<dyn AssistBackend>,
        coordinator: SubmissionCoordinator,
    ) -> Self {
        let scheduler = DisclosureScheduler::new(
            settings.hint_unlock_interval_seconds,
            settings.assist_unlock_delay_seconds,
        );
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            scheduler,
            settings,
            execution,
            content,
            assist,
            coordinator,
        }
    }

    pub async fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Result<CreateSessionResponse, SessionError> {
        let problem = self
            .content
            .fetch_problem(&req.problem_id)
            .await
            .map_err(|e| {
                if e.to_string().contains("not found") {
                    SessionError::ProblemNotFound(req.problem_id.clone())
                } else {
                    SessionError::Internal(e)
                }
            })?;

        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = Session {
            id: session_id.clone(),
            user_id: req.user_id.clone(),
            problem_id: problem.id.clone(),
            mode: req.mode,
            state: SessionState::NotStarted,
            anchor_time: None,
            deadline: None,
            time_limit_seconds: req.time_limit_seconds,
            created_at: now,
        };

        let response = CreateSessionResponse {
            session_id: session_id.clone(),
            mode: session.mode,
            state: session.state,
            problem: (&problem).into(),
            created_at: now,
        };

        let runtime = SessionRuntime {
            session,
            problem,
            clock: None,
            focus_mode_engaged: false,
            finalize_state: None,
            pending_record: None,
            last_passed: None,
            last_language: None,
        };
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(runtime)));

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        tracing::info!(
            "Session created: {} for user: {} (mode={})",
            session_id,
            req.user_id,
            req.mode.as_str()
        );

        Ok(response)
    }

    pub async fn get_status(&self, session_id: &str) -> Result<SessionStatusResponse, SessionError> {
        let runtime = self.runtime(session_id).await?;
        let rt = runtime.lock().await;
        Ok(Self::status_snapshot(&rt, Utc::now()))
    }

    /// Activates a session: stamps the anchor exactly once, derives the
    /// deadline for deadline-bearing modes and arms the deadline watcher.
    /// Calling start on an already-started session is a defensive no-op.
    pub async fn start_session(
        &self,
        session_id: &str,
    ) -> Result<SessionStatusResponse, SessionError> {
        let runtime = self.runtime(session_id).await?;

        let (armed_deadline, status) = {
            let mut rt = runtime.lock().await;
            match rt.session.state {
                SessionState::Active | SessionState::Finished => {
                    tracing::warn!(
                        "Start ignored: session {} is already {}",
                        session_id,
                        rt.session.state.as_str()
                    );
                    (None, Self::status_snapshot(&rt, Utc::now()))
                }
                SessionState::NotStarted => {
                    let now = Utc::now();
                    rt.session.state = SessionState::Active;
                    rt.session.anchor_time = Some(now);

                    let mut deadline = None;
                    if rt.session.mode.has_deadline() {
                        let limit = rt
                            .session
                            .time_limit_seconds
                            .or(rt.problem.time_limit_seconds)
                            .unwrap_or(self.settings.default_time_limit_seconds);
                        rt.session.time_limit_seconds = Some(limit);
                        deadline = Some(now + chrono::Duration::seconds(i64::from(limit)));
                        rt.session.deadline = deadline;
                        rt.focus_mode_engaged = true;
                    }
                    rt.clock = Some(Clock::new(now, deadline));

                    SESSIONS_ACTIVE.inc();
                    tracing::info!(
                        "Session started: {} anchor={} deadline={:?}",
                        session_id,
                        now,
                        deadline
                    );
                    (deadline, Self::status_snapshot(&rt, now))
                }
            }
        };

        if let Some(deadline) = armed_deadline {
            let service = self.clone();
            let id = session_id.to_string();
            tokio::spawn(async move {
                service.watch_deadline(id, deadline).await;
            });
        }

        Ok(status)
    }

    /// Closes a session. Idempotent: the first caller out of Active wins
    /// and triggers the single finalize call; later callers observe
    /// Finished and get the recorded outcome back.
    pub async fn finish_session(
        &self,
        session_id: &str,
        forced: bool,
        req: FinishSessionRequest,
    ) -> Result<FinishSessionResponse, SessionError> {
        let runtime = self.runtime(session_id).await?;

        let record = {
            let mut rt = runtime.lock().await;
            match rt.session.state {
                SessionState::NotStarted => return Err(SessionError::NotActive),
                SessionState::Finished => {
                    tracing::debug!("Finish ignored: session {} already finished", session_id);
                    return Ok(Self::finish_response(&rt));
                }
                SessionState::Active => {}
            }

            // Guard check and state write happen together under the lock,
            // before any network await: the submit-click racing the
            // deadline expiry resolves to exactly one winner.
            let now = Utc::now();
            rt.session.state = SessionState::Finished;
            // Exclusivity is released no matter how the finalize call goes.
            rt.focus_mode_engaged = false;

            let duration_seconds = rt
                .clock
                .as_ref()
                .map(|c| c.elapsed_seconds(now))
                .unwrap_or(0);
            let record = SubmissionRecord {
                session_id: rt.session.id.clone(),
                user_id: rt.session.user_id.clone(),
                problem_id: rt.session.problem_id.clone(),
                mode: rt.session.mode,
                passed: req.passed.or(rt.last_passed).unwrap_or(false),
                duration_seconds,
                language: req.language.clone().or_else(|| rt.last_language.clone()),
                forced,
                submitted_at: now,
            };
            rt.pending_record = Some(record.clone());
            rt.finalize_state = Some(FinalizeState::Pending);

            SESSIONS_ACTIVE.dec();
            let status_label = if forced { "expired" } else { "completed" };
            SESSIONS_TOTAL.with_label_values(&[status_label]).inc();
            tracing::info!(
                "Session finished: {} forced={} passed={} duration={}s",
                session_id,
                forced,
                record.passed,
                duration_seconds
            );
            record
        };

        let outcome = self.coordinator.finalize(&record).await;

        let mut rt = runtime.lock().await;
        rt.finalize_state = Some(outcome);
        Ok(Self::finish_response(&rt))
    }

    /// Re-attempts a finalize that failed on the network. Valid only for a
    /// finished session whose coordinator call failed; the session never
    /// re-enters the active state.
    pub async fn retry_finalize(
        &self,
        session_id: &str,
    ) -> Result<FinishSessionResponse, SessionError> {
        let runtime = self.runtime(session_id).await?;

        let record = {
            let mut rt = runtime.lock().await;
            let retryable = rt.session.state == SessionState::Finished
                && rt
                    .finalize_state
                    .as_ref()
                    .is_some_and(|state| state.is_retryable());
            if !retryable {
                return Err(SessionError::FinalizeNotRetryable);
            }
            // Failed -> Pending under the lock keeps concurrent retries out.
            rt.finalize_state = Some(FinalizeState::Pending);
            rt.pending_record
                .clone()
                .ok_or(SessionError::FinalizeNotRetryable)?
        };

        tracing::info!("Retrying finalize for session {}", session_id);
        let outcome = self.coordinator.finalize(&record).await;

        let mut rt = runtime.lock().await;
        rt.finalize_state = Some(outcome);
        Ok(Self::finish_response(&rt))
    }

    /// One-off execution with learner-provided stdin. No retry; failures
    /// come back inside the result.
    pub async fn run_once(
        &self,
        session_id: &str,
        req: RunRequest,
    ) -> Result<ExecutionResult, SessionError> {
        let runtime = self.runtime(session_id).await?;
        {
            let mut rt = runtime.lock().await;
            if rt.session.state != SessionState::Active {
                return Err(SessionError::NotActive);
            }
            rt.last_language = Some(req.language.clone());
        }

        let request = ExecutionRequest {
            language: req.language,
            source: req.source,
            stdin: req.stdin.unwrap_or_default(),
        };
        Ok(self.execution.execute(&request).await)
    }

    /// Runs the full test harness for the session's problem and records the
    /// outcome for the eventual submission record.
    pub async fn run_tests(
        &self,
        session_id: &str,
        req: RunTestsRequest,
    ) -> Result<RunTestsResponse, SessionError> {
        let runtime = self.runtime(session_id).await?;
        let problem = {
            let mut rt = runtime.lock().await;
            if rt.session.state != SessionState::Active {
                return Err(SessionError::NotActive);
            }
            rt.last_language = Some(req.language.clone());
            rt.problem.clone()
        };

        // The session lock is not held across the sequential harness run;
        // the deadline can still close the session mid-run.
        let verdict =
            test_harness::run(&problem, &req.language, &req.source, self.execution.as_ref()).await;

        let passed_label = if verdict.passed_all { "true" } else { "false" };
        TEST_RUNS_TOTAL.with_label_values(&[passed_label]).inc();

        {
            let mut rt = runtime.lock().await;
            rt.last_passed = Some(verdict.passed_all);
        }

        Ok(RunTestsResponse {
            session_id: session_id.to_string(),
            passed_all: verdict.passed_all,
            verdicts: verdict.verdicts.iter().map(TestVerdictView::from).collect(),
        })
    }

    /// Hint disclosure statuses plus content for unlocked hints. Lock state
    /// is recomputed from the anchor on every call.
    pub async fn list_hints(&self, session_id: &str) -> Result<HintListResponse, SessionError> {
        let runtime = self.runtime(session_id).await?;
        let rt = runtime.lock().await;
        let now = Utc::now();
        let anchor = rt.session.anchor_time;

        let statuses = self.scheduler.hint_statuses(&rt.problem.hints, anchor, now);
        let hints = rt
            .problem
            .hints
            .iter()
            .zip(statuses)
            .map(|(hint, status)| {
                let content = (!status.locked).then(|| {
                    HINTS_SERVED_TOTAL
                        .with_label_values(&[hint.kind.as_str()])
                        .inc();
                    hint.content.clone()
                });
                HintView { status, content }
            })
            .collect();

        Ok(HintListResponse {
            session_id: session_id.to_string(),
            hints,
            assist: self.scheduler.assist_status(anchor, now),
        })
    }

    /// Calls the AI assist collaborator, but only once the disclosure gate
    /// is open. The gate is enforced here, client-side of the assist
    /// service; it is a policy control, not a security boundary.
    pub async fn request_assist(
        &self,
        session_id: &str,
        req: AssistRequest,
    ) -> Result<AssistResponse, SessionError> {
        let runtime = self.runtime(session_id).await?;
        let (prompt, source, mode) = {
            let rt = runtime.lock().await;
            if rt.session.state != SessionState::Active {
                return Err(SessionError::NotActive);
            }
            let gate = self.scheduler.assist_status(rt.session.anchor_time, Utc::now());
            if !gate.unlocked {
                ASSIST_REQUESTS_TOTAL.with_label_values(&["locked"]).inc();
                return Err(SessionError::AssistLocked);
            }
            (
                rt.problem.prompt.clone(),
                req.source.clone().unwrap_or_default(),
                req.mode,
            )
        };

        match self.assist.request_assist(&prompt, &source, mode).await {
            Ok(message) => {
                ASSIST_REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
                Ok(AssistResponse { message })
            }
            Err(e) => {
                ASSIST_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!("Assist call failed for session {}: {}", session_id, e);
                Err(SessionError::AssistFailed(e.to_string()))
            }
        }
    }

    /// One observation of the shared 1 Hz scheduler loop. Everything in the
    /// tick payload is derived from `now`; nothing is carried over from the
    /// previous tick.
    pub async fn tick(&self, session_id: &str, now: DateTime<Utc>) -> Option<TickOutcome> {
        let runtime = self.sessions.read().await.get(session_id).cloned()?;
        let rt = runtime.lock().await;

        if rt.session.state == SessionState::Finished {
            return Some(TickOutcome::Finished);
        }

        if let Some(clock) = &rt.clock {
            if clock.expire_once(now) {
                return Some(TickOutcome::Expired(TimerEvent::TimeExpired(TimeExpired {
                    session_id: session_id.to_string(),
                    timestamp: now,
                    message: "Time limit exceeded".to_string(),
                })));
            }
            if clock.is_expired(now) {
                // Another stream claimed the expiry signal.
                return Some(TickOutcome::Finished);
            }
        }

        Some(TickOutcome::Tick(TimerEvent::TimerTick(TimerTick {
            session_id: session_id.to_string(),
            state: rt.session.state,
            elapsed_seconds: rt.clock.as_ref().map(|c| c.elapsed_seconds(now)),
            remaining_seconds: rt.clock.as_ref().and_then(|c| c.remaining_seconds(now)),
            hints: self
                .scheduler
                .hint_statuses(&rt.problem.hints, rt.session.anchor_time, now),
            assist: self.scheduler.assist_status(rt.session.anchor_time, now),
            timestamp: now,
        })))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn runtime(&self, session_id: &str) -> Result<SharedRuntime, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or(SessionError::NotFound)
    }

    /// Sleeps until the absolute deadline, re-checking wall time on wake so
    /// a suspended host cannot fire early, then forces the finish. All
    /// finish paths are idempotent, so racing the learner's own submit (or
    /// an SSE-driven expiry) is safe.
    async fn watch_deadline(&self, session_id: String, deadline: DateTime<Utc>) {
        loop {
            let now = Utc::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now)
                .to_std()
                .unwrap_or_else(|_| std::time::Duration::from_millis(200));
            tokio::time::sleep(wait).await;
        }

        match self
            .finish_session(&session_id, true, FinishSessionRequest::default())
            .await
        {
            Ok(_) => {
                tracing::info!("Deadline watcher closed session {}", session_id);
            }
            Err(SessionError::NotFound) => {}
            Err(e) => {
                tracing::warn!(
                    "Deadline watcher could not close session {}: {}",
                    session_id,
                    e
                );
            }
        }
    }

    fn status_snapshot(rt: &SessionRuntime, now: DateTime<Utc>) -> SessionStatusResponse {
        SessionStatusResponse {
            session_id: rt.session.id.clone(),
            user_id: rt.session.user_id.clone(),
            problem_id: rt.session.problem_id.clone(),
            mode: rt.session.mode,
            state: rt.session.state,
            anchor_time: rt.session.anchor_time,
            deadline: rt.session.deadline,
            elapsed_seconds: rt.clock.as_ref().map(|c| c.elapsed_seconds(now)),
            remaining_seconds: rt.clock.as_ref().and_then(|c| c.remaining_seconds(now)),
            focus_mode_engaged: rt.focus_mode_engaged,
            finalize: rt.finalize_state.clone(),
        }
    }

    fn finish_response(rt: &SessionRuntime) -> FinishSessionResponse {
        let record = rt.pending_record.as_ref();
        FinishSessionResponse {
            session_id: rt.session.id.clone(),
            state: rt.session.state,
            forced: record.map(|r| r.forced).unwrap_or(false),
            passed: record.map(|r| r.passed).unwrap_or(false),
            duration_seconds: record.map(|r| r.duration_seconds).unwrap_or(0),
            finalize: rt
                .finalize_state
                .clone()
                .unwrap_or(FinalizeState::Pending),
        }
    }
}
