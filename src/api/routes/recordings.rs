//! Recording control endpoints.
//!
//! - POST /recordings/calendar   - start a calendar-linked audio recording
//! - POST /recordings/adhoc     - start a video recording of a window
//! - POST /recordings/:id/stop  - stop an active recording
//! - GET  /recordings           - active sessions, links, pending switches

use crate::engine::{DetectedWindow, Platform};
use crate::orchestrator::CalendarMeeting;
use crate::session::SessionManager;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::super::error::{ApiError, ApiResult};

/// Commands routed into the service loop.
#[derive(Debug)]
pub enum ApiCommand {
    StartCalendar(CalendarMeeting),
    StartAdhoc(DetectedWindow),
    StopRecording { recording_id: String },
}

#[derive(Clone)]
pub struct RecordingsState {
    pub tx: mpsc::Sender<ApiCommand>,
    pub sessions: SessionManager,
}

#[derive(Debug, serde::Deserialize)]
pub struct AdhocRequest {
    pub platform: String,
    pub title: String,
    pub window_id: String,
}

pub fn router(state: RecordingsState) -> Router {
    Router::new()
        .route("/recordings", get(list_recordings))
        .route("/recordings/calendar", post(start_calendar))
        .route("/recordings/adhoc", post(start_adhoc))
        .route("/recordings/:id/stop", post(stop_recording))
        .with_state(state)
}

async fn start_calendar(
    State(state): State<RecordingsState>,
    Json(meeting): Json<CalendarMeeting>,
) -> ApiResult<Json<Value>> {
    info!(
        "Calendar recording requested for meeting {} via API",
        meeting.meeting_id
    );
    let meeting_id = meeting.meeting_id.clone();

    send_command(&state, ApiCommand::StartCalendar(meeting)).await?;
    Ok(Json(json!({
        "success": true,
        "meeting_id": meeting_id,
        "message": "Calendar recording requested",
    })))
}

async fn start_adhoc(
    State(state): State<RecordingsState>,
    Json(req): Json<AdhocRequest>,
) -> ApiResult<Json<Value>> {
    let window = DetectedWindow {
        platform: Platform::parse(&req.platform),
        title: req.title,
        id: req.window_id,
    };
    info!("Ad-hoc recording requested for '{}' via API", window.title);

    send_command(&state, ApiCommand::StartAdhoc(window)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Ad-hoc recording requested",
    })))
}

async fn stop_recording(
    Path(id): Path<String>,
    State(state): State<RecordingsState>,
) -> ApiResult<Json<Value>> {
    if state.sessions.session(&id).await.is_none() {
        return Err(ApiError::not_found(format!("No active recording {id}")));
    }

    send_command(
        &state,
        ApiCommand::StopRecording {
            recording_id: id.clone(),
        },
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "recording_id": id,
        "message": "Stop requested",
    })))
}

async fn list_recordings(State(state): State<RecordingsState>) -> Json<Value> {
    let sessions: Vec<Value> = state
        .sessions
        .sessions()
        .await
        .iter()
        .map(|s| {
            json!({
                "recording_id": s.recording_id,
                "note_id": s.note_id,
                "platform": s.platform.as_str(),
                "state": s.state.as_str(),
                "started_at": s.started_at.to_rfc3339(),
            })
        })
        .collect();

    let links: Vec<Value> = state
        .sessions
        .links_snapshot()
        .await
        .iter()
        .map(|l| {
            json!({
                "recording_id": l.recording_id,
                "meeting_id": l.meeting_id,
                "title": l.title,
                "platform": l.platform.as_str(),
                "audio_only": l.audio_only,
            })
        })
        .collect();

    let pending: Vec<Value> = state
        .sessions
        .pending_snapshot()
        .await
        .iter()
        .map(|p| {
            json!({
                "meeting_id": p.meeting_id,
                "note_id": p.note_id,
                "platform": p.platform.as_str(),
            })
        })
        .collect();

    Json(json!({
        "sessions": sessions,
        "calendar_links": links,
        "pending_switches": pending,
    }))
}

async fn send_command(state: &RecordingsState, command: ApiCommand) -> Result<(), ApiError> {
    state.tx.send(command).await.map_err(|e| {
        error!("Failed to queue API command: {}", e);
        ApiError::internal("Service loop unavailable")
    })
}
