//! Capture engine event dispatch.
//!
//! One handler per event type, each owning explicit references to the
//! session manager, store serializer, and switch orchestrator. Handlers run
//! to completion one event at a time; the store serializer provides the only
//! ordering guarantee over persisted state.

use crate::correlate::{correlate, CorrelationSettings};
use crate::engine::{CaptureEngine, CaptureState, DetectedWindow, EngineEvent, RealtimeData};
use crate::notify::{Notifier, UiEvent};
use crate::orchestrator::SwitchOrchestrator;
use crate::session::SessionManager;
use crate::store::{StoreSerializer, TranscriptLine};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct EventDispatcher {
    engine: Arc<dyn CaptureEngine>,
    sessions: SessionManager,
    store: StoreSerializer,
    switcher: SwitchOrchestrator,
    notifier: Notifier,
    correlation: CorrelationSettings,
    upload_delay: Duration,
}

impl EventDispatcher {
    pub fn new(
        engine: Arc<dyn CaptureEngine>,
        sessions: SessionManager,
        store: StoreSerializer,
        switcher: SwitchOrchestrator,
        notifier: Notifier,
        correlation: CorrelationSettings,
        upload_delay: Duration,
    ) -> Self {
        Self {
            engine,
            sessions,
            store,
            switcher,
            notifier,
            correlation,
            upload_delay,
        }
    }

    /// Drain engine events until the channel closes.
    pub async fn run(self, mut events: mpsc::Receiver<EngineEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
        info!("Engine event channel closed, dispatcher stopping");
    }

    pub async fn dispatch(&self, event: EngineEvent) {
        match event {
            EngineEvent::WindowDetected(window) => self.on_window_detected(window).await,
            EngineEvent::WindowClosed { window_id } => {
                debug!("Conference window {} closed", window_id);
            }
            EngineEvent::CaptureStateChanged {
                recording_id,
                state,
            } => self.on_capture_state_changed(recording_id, state).await,
            EngineEvent::CaptureEnded { recording_id } => {
                self.on_capture_ended(recording_id).await
            }
            EngineEvent::RealtimeData {
                recording_id,
                data,
            } => self.on_realtime_data(recording_id, data).await,
            EngineEvent::UploadProgress {
                recording_id,
                percent,
            } => {
                self.notifier.emit(UiEvent::UploadProgress {
                    recording_id,
                    percent,
                });
            }
            EngineEvent::EngineError { kind, message } => {
                warn!("Capture engine error [{}]: {}", kind, message);
                self.notifier.emit(UiEvent::EngineError { kind, message });
            }
        }
    }

    /// A conferencing window appeared. If it matches an audio-only calendar
    /// recording, switch that recording to video; otherwise the window is an
    /// ad-hoc call and the UI decides what to do with it.
    async fn on_window_detected(&self, window: DetectedWindow) {
        let links = self.sessions.links_snapshot().await;
        match correlate(&window, &links, Utc::now(), &self.correlation) {
            Some(m) if m.link.audio_only => {
                info!(
                    "Window '{}' correlates with calendar recording {}",
                    window.title, m.recording_id
                );
                match self.switcher.switch_to_video(&window, m.link).await {
                    Ok(outcome) => {
                        self.notifier.emit(UiEvent::SwitchCompleted {
                            old_recording_id: outcome.old_recording_id,
                            new_note_id: outcome.new_note_id,
                        });
                    }
                    Err(e) => {
                        error!("Switch failed for recording {}: {}", m.recording_id, e);
                        self.notifier.emit(UiEvent::SwitchFailed {
                            recording_id: m.recording_id,
                            message: e.to_string(),
                        });
                    }
                }
            }
            Some(m) => {
                debug!(
                    "Window '{}' matches recording {} which already captures video",
                    window.title, m.recording_id
                );
            }
            None => {
                debug!("Window '{}' matched no calendar recording", window.title);
                self.notifier.emit(UiEvent::AdHocWindowDetected {
                    platform: window.platform,
                    title: window.title,
                });
            }
        }
    }

    /// Lifecycle state report. A `Recording` report for an unknown id is the
    /// engine assigning an id to a requested window capture: consume the
    /// oldest pending switch and bind them.
    async fn on_capture_state_changed(&self, recording_id: String, state: CaptureState) {
        if self.sessions.update_state(&recording_id, state).await {
            self.notifier.emit(UiEvent::RecordingStateChanged {
                recording_id,
                state,
            });
            return;
        }

        if state != CaptureState::Recording {
            debug!(
                "State change {} for unknown recording {}",
                state.as_str(),
                recording_id
            );
            return;
        }

        match self.sessions.take_next_pending().await {
            Some(pending) => {
                info!(
                    "Binding engine recording {} to note {}",
                    recording_id, pending.note_id
                );
                self.sessions
                    .register_recording(&recording_id, &pending.note_id, pending.platform)
                    .await;

                let note_id = pending.note_id.clone();
                let bound_id = recording_id.clone();
                let result = self
                    .store
                    .schedule(move |mut doc| {
                        let record = doc.find_mut(&note_id)?;
                        record.recording_id = Some(bound_id);
                        Some(doc)
                    })
                    .await;
                if let Err(e) = result {
                    error!(
                        "Failed to stamp recording id on note {}: {}",
                        pending.note_id, e
                    );
                }

                self.notifier.emit(UiEvent::RecordingStateChanged {
                    recording_id,
                    state,
                });
            }
            None => {
                warn!(
                    "Recording {} started but no pending switch was waiting",
                    recording_id
                );
            }
        }
    }

    /// A capture finished. Mid-switch recordings skip the upload path; for
    /// everything else the record is marked complete and a cancellable
    /// deferred upload is scheduled.
    async fn on_capture_ended(&self, recording_id: String) {
        let was_switching = self.sessions.take_switching(&recording_id).await;
        let session = self.sessions.remove_recording(&recording_id).await;
        self.sessions.take_link(&recording_id).await;

        if was_switching {
            debug!(
                "Recording {} ended mid-switch, upload suppressed",
                recording_id
            );
            return;
        }

        let note_id = session.as_ref().map(|s| s.note_id.clone());
        if let Some(note_id) = note_id.clone() {
            let result = self
                .store
                .schedule(move |mut doc| {
                    let record = doc.find_mut(&note_id)?;
                    record.recording_complete = true;
                    record.end_time = Some(Utc::now());
                    Some(doc)
                })
                .await;
            if let Err(e) = result {
                error!(
                    "Failed to mark recording {} complete: {}",
                    recording_id, e
                );
            }
        } else {
            debug!("Recording {} ended without a tracked session", recording_id);
        }

        let engine = Arc::clone(&self.engine);
        let sessions = self.sessions.clone();
        let delay = self.upload_delay;
        let upload_id = recording_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = engine.upload_capture(&upload_id).await {
                warn!("Deferred upload of recording {} failed: {}", upload_id, e);
            }
            sessions.finish_deferred(&upload_id).await;
        });
        self.sessions.store_deferred(&recording_id, handle).await;

        self.notifier.emit(UiEvent::RecordingEnded {
            recording_id,
            note_id,
        });
    }

    /// Transcript lines and participant joins stream in while a recording
    /// runs; both are appended to the note through the serializer.
    async fn on_realtime_data(&self, recording_id: String, data: RealtimeData) {
        let Some(session) = self.sessions.session(&recording_id).await else {
            debug!(
                "Realtime data for unknown recording {}, dropping",
                recording_id
            );
            return;
        };
        let note_id = session.note_id;

        match data {
            RealtimeData::Transcript { speaker, text } => {
                let note_id_for_op = note_id.clone();
                let result = self
                    .store
                    .schedule(move |mut doc| {
                        let record = doc.find_mut(&note_id_for_op)?;
                        record.transcript.push(TranscriptLine {
                            timestamp: Some(Utc::now()),
                            speaker,
                            text,
                        });
                        Some(doc)
                    })
                    .await;
                match result {
                    Ok(_) => self.notifier.emit(UiEvent::TranscriptUpdated { note_id }),
                    Err(e) => error!("Failed to append transcript to {}: {}", note_id, e),
                }
            }
            RealtimeData::Participant { name } => {
                let note_id_for_op = note_id.clone();
                let result = self
                    .store
                    .schedule(move |mut doc| {
                        let record = doc.find_mut(&note_id_for_op)?;
                        if !record.participants.contains(&name) {
                            record.participants.push(name);
                            Some(doc)
                        } else {
                            None
                        }
                    })
                    .await;
                match result {
                    Ok(_) => self.notifier.emit(UiEvent::ParticipantsUpdated { note_id }),
                    Err(e) => error!("Failed to record participant on {}: {}", note_id, e),
                }
            }
        }
    }
}
