//! Meeting document endpoints.
//!
//! - GET /meetings      - upcoming and past meeting records
//! - GET /meetings/:id  - a single record

use crate::store::{MeetingRecord, StoreSerializer};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};

use super::super::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct MeetingsState {
    pub store: StoreSerializer,
}

pub fn router(state: MeetingsState) -> Router {
    Router::new()
        .route("/meetings", get(list_meetings))
        .route("/meetings/:id", get(get_meeting))
        .with_state(state)
}

async fn list_meetings(State(state): State<MeetingsState>) -> Json<Value> {
    let doc = state.store.read().await;

    Json(json!({
        "upcoming": doc.upcoming_meetings.iter().map(summary).collect::<Vec<_>>(),
        "past": doc.past_meetings.iter().map(summary).collect::<Vec<_>>(),
    }))
}

async fn get_meeting(
    Path(id): Path<String>,
    State(state): State<MeetingsState>,
) -> ApiResult<Json<MeetingRecord>> {
    let doc = state.store.read().await;
    match doc.find(&id) {
        Some(record) => Ok(Json(record.clone())),
        None => Err(ApiError::not_found(format!("No meeting record {id}"))),
    }
}

fn summary(record: &MeetingRecord) -> Value {
    json!({
        "id": record.id,
        "title": record.title,
        "recording_id": record.recording_id,
        "calendar_event_id": record.calendar_event_id,
        "recording_complete": record.recording_complete,
        "transcript_lines": record.transcript.len(),
        "participants": record.participants.len(),
        "start_time": record.start_time,
    })
}
