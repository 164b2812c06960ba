use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::metrics::SSE_CONNECTIONS_ACTIVE;
use crate::models::FinishSessionRequest;
use crate::services::{
    session_service::{SessionService, TickOutcome},
    AppState,
};

/// SSE endpoint for timer and disclosure events
/// GET /api/v1/sessions/{id}/stream
///
/// This is the shared 1 Hz scheduler loop: every tick re-derives the
/// countdown and the hint/assist lock states from the current wall clock,
/// so a throttled tab or a reconnect cannot drift the display. The stream
/// that claims the one-shot expiry latch triggers the forced finish and
/// emits `time-expired`; any other stream on the same session simply ends.
pub async fn session_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Client connected to SSE stream: session={}", session_id);

    // Verify session exists
    state
        .sessions
        .get_status(&session_id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Session not found".to_string()))?;

    let max_ticks = max_stream_duration_seconds();
    let tick_interval = tick_interval_ms();
    tracing::info!(
        "Starting SSE stream: session={}, max_duration={}s, tick_interval={}ms",
        session_id,
        max_ticks,
        tick_interval
    );

    let stream = create_timer_stream(
        state.sessions.clone(),
        session_id,
        max_ticks,
        tick_interval,
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn max_stream_duration_seconds() -> u32 {
    std::env::var("SSE_MAX_STREAM_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(3600)
}

fn tick_interval_ms() -> u64 {
    std::env::var("SSE_TICK_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(1000)
}

/// Keeps the active-connection gauge honest however the stream ends
/// (expiry, cap, or client disconnect).
struct ConnectionGuard;

impl ConnectionGuard {
    fn new() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

struct StreamState {
    service: SessionService,
    session_id: String,
    ticks_left: u32,
    tick_interval_ms: u64,
    finished: bool,
    _guard: ConnectionGuard,
}

/// Create a stream of timer events
fn create_timer_stream(
    service: SessionService,
    session_id: String,
    max_ticks: u32,
    tick_interval_ms: u64,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let state = StreamState {
        service,
        session_id,
        ticks_left: max_ticks,
        tick_interval_ms,
        finished: false,
        _guard: ConnectionGuard::new(),
    };

    stream::unfold(state, move |mut st| async move {
        if st.finished || st.ticks_left == 0 {
            return None;
        }
        st.ticks_left -= 1;

        let now = Utc::now();
        match st.service.tick(&st.session_id, now).await? {
            TickOutcome::Finished => None,
            TickOutcome::Expired(event) => {
                // This stream won the expiry latch: close the session before
                // telling the client, so a submit racing the expiry already
                // sees the finished state.
                if let Err(e) = st
                    .service
                    .finish_session(&st.session_id, true, FinishSessionRequest::default())
                    .await
                {
                    tracing::warn!(
                        "Forced finish after expiry failed for session {}: {}",
                        st.session_id,
                        e
                    );
                }
                tracing::info!("Timer expired: session={}", st.session_id);

                let sse_event = Event::default()
                    .event(event.event_name())
                    .data(event.to_sse_data());
                st.finished = true;
                Some((Ok(sse_event), st))
            }
            TickOutcome::Tick(event) => {
                let sse_event = Event::default()
                    .event(event.event_name())
                    .data(event.to_sse_data());

                // Wait before deriving the next tick
                sleep(Duration::from_millis(st.tick_interval_ms)).await;

                Some((Ok(sse_event), st))
            }
        }
    })
}
