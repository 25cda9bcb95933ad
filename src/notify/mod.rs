//! Outbound events for the UI layer.
//!
//! The desktop shell is an external collaborator; we hand it fire-and-forget
//! notifications over a channel and never block on it.

use crate::engine::{CaptureState, Platform};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    RecordingStateChanged {
        recording_id: String,
        state: CaptureState,
    },
    RecordingEnded {
        recording_id: String,
        note_id: Option<String>,
    },
    SwitchStarted {
        recording_id: String,
        meeting_id: String,
    },
    SwitchCompleted {
        old_recording_id: String,
        new_note_id: String,
    },
    SwitchFailed {
        recording_id: String,
        message: String,
    },
    AdHocWindowDetected {
        platform: Platform,
        title: String,
    },
    TranscriptUpdated {
        note_id: String,
    },
    ParticipantsUpdated {
        note_id: String,
    },
    UploadProgress {
        recording_id: String,
        percent: u8,
    },
    EngineError {
        kind: String,
        message: String,
    },
}

/// Fire-and-forget sender for UI notifications.
#[derive(Clone)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl Notifier {
    pub fn new(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Notifier that drops every event. Used when no UI is attached.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: UiEvent) {
        debug!("UI event: {:?}", event);
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                debug!("UI consumer gone, dropping event");
            }
        }
    }
}
