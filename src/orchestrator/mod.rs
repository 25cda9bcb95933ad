//! Recording lifecycle orchestration.
//!
//! [`MeetingRecorder`] starts calendar-linked audio captures ahead of a
//! scheduled meeting and ad-hoc video captures for unmatched windows.
//! [`switch::SwitchOrchestrator`] handles the audio-to-video transition.
//!
//! All dependencies are injected via constructor — no concrete types
//! hardcoded.

pub mod switch;

pub use switch::{SwitchError, SwitchOrchestrator, SwitchOutcome};

use crate::engine::{CaptureEngine, CaptureState, DetectedWindow, Platform};
use crate::notify::{Notifier, UiEvent};
use crate::session::{CalendarLink, PendingSwitch, SessionManager};
use crate::store::{MeetingRecord, StoreSerializer};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Calendar event metadata handed over by the (external) calendar sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarMeeting {
    pub meeting_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub video_url: Option<String>,
    pub platform: Platform,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StartedRecording {
    pub recording_id: String,
    pub note_id: String,
}

pub struct MeetingRecorder {
    engine: Arc<dyn CaptureEngine>,
    sessions: SessionManager,
    store: StoreSerializer,
    notifier: Notifier,
}

impl MeetingRecorder {
    pub fn new(
        engine: Arc<dyn CaptureEngine>,
        sessions: SessionManager,
        store: StoreSerializer,
        notifier: Notifier,
    ) -> Self {
        Self {
            engine,
            sessions,
            store,
            notifier,
        }
    }

    /// Proactively capture audio for an imminent calendar meeting. The
    /// recording is tracked as calendar-linked so a later video window can
    /// be correlated against it.
    pub async fn begin_calendar_recording(
        &self,
        meeting: CalendarMeeting,
    ) -> Result<StartedRecording> {
        if let Some(existing) = self.sessions.link_for_meeting(&meeting.meeting_id).await {
            bail!(
                "Meeting {} is already being recorded (recording {})",
                meeting.meeting_id,
                existing.recording_id
            );
        }

        let handle = self
            .engine
            .prepare_audio_capture()
            .await
            .context("Failed to prepare audio capture")?;
        let recording_id = handle.recording_id.clone();
        let upload_token = Uuid::new_v4().to_string();

        let note_id = self.ensure_meeting_record(&meeting, &recording_id).await?;

        self.engine
            .start_capture(&handle, &upload_token)
            .await
            .context("Failed to start audio capture")?;

        self.sessions
            .register_recording(&recording_id, &note_id, meeting.platform)
            .await;
        self.sessions
            .track_link(CalendarLink {
                recording_id: recording_id.clone(),
                meeting_id: meeting.meeting_id.clone(),
                title: meeting.title.clone(),
                start_time: meeting.start_time,
                end_time: meeting.end_time,
                video_url: meeting.video_url.clone(),
                platform: meeting.platform,
                audio_only: true,
                upload_token,
            })
            .await;

        info!(
            "Calendar recording {} started for meeting {} (note {})",
            recording_id, meeting.meeting_id, note_id
        );
        self.notifier.emit(UiEvent::RecordingStateChanged {
            recording_id: recording_id.clone(),
            state: CaptureState::Recording,
        });

        Ok(StartedRecording {
            recording_id,
            note_id,
        })
    }

    /// Start a video capture for a window that matched no calendar link.
    /// The engine assigns the recording id asynchronously; a pending switch
    /// entry lets the started event bind it to the fresh note.
    pub async fn begin_adhoc_recording(&self, window: &DetectedWindow) -> Result<String> {
        let mut record = MeetingRecord::new(window.title.clone());
        record.start_time = Some(Utc::now());
        let note_id = record.id.clone();

        self.store
            .schedule(move |mut doc| {
                doc.upcoming_meetings.push(record);
                Some(doc)
            })
            .await
            .context("Failed to create note for ad-hoc recording")?;

        self.sessions
            .register_pending(PendingSwitch {
                meeting_id: note_id.clone(),
                platform: window.platform,
                note_id: note_id.clone(),
            })
            .await;

        let upload_token = Uuid::new_v4().to_string();
        if let Err(e) = self.engine.start_window_capture(window, &upload_token).await {
            self.sessions.clear_pending_for_meeting(&note_id).await;
            return Err(e.context("Failed to start ad-hoc window capture"));
        }

        info!(
            "Ad-hoc recording requested for {} window '{}' (note {})",
            window.platform.as_str(),
            window.title,
            note_id
        );
        Ok(note_id)
    }

    /// Ask the engine to stop a recording; cleanup happens when the
    /// capture-ended event arrives.
    pub async fn stop_recording(&self, recording_id: &str) -> Result<()> {
        if self.sessions.session(recording_id).await.is_none() {
            bail!("No active recording with id {}", recording_id);
        }

        self.engine
            .stop_capture(recording_id)
            .await
            .with_context(|| format!("Failed to stop recording {recording_id}"))?;
        Ok(())
    }

    /// Make sure a meeting record exists for the calendar event and stamp it
    /// with the recording id. Returns the note id.
    async fn ensure_meeting_record(
        &self,
        meeting: &CalendarMeeting,
        recording_id: &str,
    ) -> Result<String> {
        let doc = self.store.read().await;
        let note_id = doc
            .find_by_calendar_event(&meeting.meeting_id)
            .map(|r| r.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let meeting = meeting.clone();
        let recording_id = recording_id.to_string();
        let note_id_for_op = note_id.clone();
        self.store
            .schedule(move |mut doc| {
                match doc.find_mut(&note_id_for_op) {
                    Some(record) => {
                        record.recording_id = Some(recording_id);
                    }
                    None => {
                        let mut record = MeetingRecord::new(meeting.title.clone());
                        record.id = note_id_for_op;
                        record.calendar_event_id = Some(meeting.meeting_id.clone());
                        record.recording_id = Some(recording_id);
                        record.start_time = Some(meeting.start_time);
                        record.end_time = meeting.end_time;
                        record.attendees = meeting.attendees.clone();
                        record.description = meeting.description.clone();
                        doc.upcoming_meetings.push(record);
                    }
                }
                Some(doc)
            })
            .await
            .context("Failed to upsert calendar meeting record")?;

        Ok(note_id)
    }
}
