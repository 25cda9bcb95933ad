//! Audio-to-video switch orchestration.
//!
//! When a detected video window matches an audio-only calendar recording
//! already in progress, the capture is switched to video without creating a
//! duplicate meeting record and without losing transcript data gathered so
//! far. Each step tolerates partial failure: stale in-memory entries are
//! removed eagerly, and errors propagate to the caller for user
//! notification instead of being swallowed.

use crate::engine::{CaptureEngine, DetectedWindow};
use crate::notify::{Notifier, UiEvent};
use crate::session::{CalendarLink, PendingSwitch, SessionManager};
use crate::store::{MeetingDocument, MeetingRecord, StoreError, StoreSerializer};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("no meeting record found for calendar event {meeting_id}")]
    MeetingNotFound { meeting_id: String },
    #[error("capture engine failure: {0}")]
    Engine(#[source] anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct SwitchOutcome {
    pub old_recording_id: String,
    pub new_note_id: String,
}

pub struct SwitchOrchestrator {
    engine: Arc<dyn CaptureEngine>,
    sessions: SessionManager,
    store: StoreSerializer,
    notifier: Notifier,
    settle_delay: Duration,
}

impl SwitchOrchestrator {
    pub fn new(
        engine: Arc<dyn CaptureEngine>,
        sessions: SessionManager,
        store: StoreSerializer,
        notifier: Notifier,
        settle_delay: Duration,
    ) -> Self {
        Self {
            engine,
            sessions,
            store,
            notifier,
            settle_delay,
        }
    }

    /// Transition an audio-only calendar recording to a video recording of
    /// the matched window.
    pub async fn switch_to_video(
        &self,
        window: &DetectedWindow,
        link: CalendarLink,
    ) -> Result<SwitchOutcome, SwitchError> {
        let old_recording_id = link.recording_id.clone();
        info!(
            "Switching recording {} (meeting {}) to video window '{}'",
            old_recording_id, link.meeting_id, window.title
        );
        self.notifier.emit(UiEvent::SwitchStarted {
            recording_id: old_recording_id.clone(),
            meeting_id: link.meeting_id.clone(),
        });

        // The old capture must not upload itself when it ends.
        self.sessions.mark_switching(&old_recording_id).await;

        if let Err(e) = self.engine.stop_capture(&old_recording_id).await {
            // The capture is still live; its eventual end must take the
            // normal upload path.
            self.sessions.take_switching(&old_recording_id).await;
            return Err(SwitchError::Engine(e));
        }

        // Eager removal: a failed later step must not leave orphaned
        // sessions pointing at a stopped capture.
        self.sessions.remove_recording(&old_recording_id).await;
        self.sessions.take_link(&old_recording_id).await;
        self.sessions.cancel_deferred(&old_recording_id).await;
        let cleared = self
            .sessions
            .clear_pending_for_meeting(&link.meeting_id)
            .await;
        if cleared > 0 {
            warn!(
                "Dropped {} stale pending switch(es) for meeting {}",
                cleared, link.meeting_id
            );
        }

        // Let the stop propagate through the engine before trusting
        // persisted state.
        tokio::time::sleep(self.settle_delay).await;

        let doc = self.store.read().await;
        if doc
            .find_by_calendar_event(&link.meeting_id)
            .or_else(|| doc.find_by_recording(&old_recording_id))
            .is_none()
        {
            return Err(SwitchError::MeetingNotFound {
                meeting_id: link.meeting_id.clone(),
            });
        }

        // Locate the record, carry calendar metadata and everything gathered
        // so far into a fresh record, and retire the old one inside a single
        // serialized operation, so a mutation queued meanwhile is never
        // dropped.
        let new_note_id = Uuid::new_v4().to_string();
        let op = {
            let meeting_id = link.meeting_id.clone();
            let old_id = old_recording_id.clone();
            let new_note_id = new_note_id.clone();
            let link_start = link.start_time;
            let link_end = link.end_time;
            move |mut doc: MeetingDocument| {
                let old_record = doc
                    .find_by_calendar_event(&meeting_id)
                    .or_else(|| doc.find_by_recording(&old_id))?
                    .clone();
                let mut new_record = MeetingRecord::new(old_record.title.clone());
                new_record.id = new_note_id;
                new_record.calendar_event_id = Some(meeting_id.clone());
                new_record.content = old_record.content;
                new_record.transcript = old_record.transcript;
                new_record.participants = old_record.participants;
                new_record.start_time = old_record.start_time.or(Some(link_start));
                new_record.end_time = old_record.end_time.or(link_end);
                new_record.attendees = old_record.attendees;
                new_record.description = old_record.description;
                doc.remove(&old_record.id);
                doc.upcoming_meetings.push(new_record);
                Some(doc)
            }
        };
        let swapped = self.store.schedule(op).await?;
        if swapped.find(&new_note_id).is_none() {
            return Err(SwitchError::MeetingNotFound {
                meeting_id: link.meeting_id.clone(),
            });
        }

        // The engine assigns the new recording id asynchronously; the
        // pending entry lets the started event bind it to the new note.
        self.sessions
            .register_pending(PendingSwitch {
                meeting_id: link.meeting_id.clone(),
                platform: window.platform,
                note_id: new_note_id.clone(),
            })
            .await;

        if let Err(e) = self
            .engine
            .start_window_capture(window, &link.upload_token)
            .await
        {
            self.sessions
                .clear_pending_for_meeting(&link.meeting_id)
                .await;
            return Err(SwitchError::Engine(e));
        }

        info!(
            "Switch complete: recording {} retired, note {} awaiting video capture",
            old_recording_id, new_note_id
        );

        Ok(SwitchOutcome {
            old_recording_id,
            new_note_id,
        })
    }
}
