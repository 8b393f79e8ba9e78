//! Server-Sent Events push channel
//!
//! One stream per meeting viewer. Events are invalidation hints: after a
//! `Resync` (the viewer fell behind the broadcast buffer) clients re-query
//! the meeting instead of trusting the stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use mqe_common::time;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::services::SessionContext;
use crate::AppState;

/// GET /api/meetings/:id/events
///
/// Streams `ParticipantsUpdated`, `MeetingUpdated` and `PhaseChanged` for one
/// meeting. Connecting counts as a presence ping.
pub async fn meeting_event_stream(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before the presence ping so the viewer sees its own update
    let mut rx = state.engine.event_bus().subscribe();
    state
        .engine
        .record_presence(&ctx, meeting_id, time::now())
        .await?;

    info!(meeting_id = %meeting_id, user_id = %ctx.user_id, "SSE viewer connected");

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if event.meeting_id() == meeting_id => {
                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            debug!(meeting_id = %meeting_id, "SSE: Sending {}", event_type);
                            yield Ok(Event::default().event(event_type).data(event_json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(meeting_id = %meeting_id, skipped, "SSE viewer lagged behind");
                    yield Ok(Event::default().event("Resync").data(skipped.to_string()));
                }
                Err(RecvError::Closed) => {
                    debug!(meeting_id = %meeting_id, "SSE: Event bus closed");
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
