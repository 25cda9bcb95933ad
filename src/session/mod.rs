//! In-memory session state: the recording registry, calendar-link tracker,
//! pending switches, and deferred per-recording tasks.
//!
//! Everything lives behind one handle that is passed to each component —
//! there is no ambient global state.

pub mod registry;
pub mod tracker;

pub use registry::{RecordingRegistry, RecordingSession};
pub use tracker::{CalendarLink, CalendarLinkTracker};

use crate::engine::{CaptureState, Platform};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Marker for a video recording that has been requested from the engine but
/// not yet assigned a recording id. Consumed by the first matching
/// recording-started event.
#[derive(Debug, Clone)]
pub struct PendingSwitch {
    pub meeting_id: String,
    pub platform: Platform,
    pub note_id: String,
}

#[derive(Default)]
struct SessionState {
    registry: RecordingRegistry,
    links: CalendarLinkTracker,
    pending: Vec<PendingSwitch>,
    switching: HashSet<String>,
    deferred: HashMap<String, JoinHandle<()>>,
}

/// Shared handle over all in-memory session state. Critical sections are
/// short and never held across store I/O.
#[derive(Clone, Default)]
pub struct SessionManager {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionManager {
    // --- registry ---

    pub async fn register_recording(&self, recording_id: &str, note_id: &str, platform: Platform) {
        self.inner
            .lock()
            .await
            .registry
            .add(recording_id, note_id, platform);
    }

    pub async fn update_state(&self, recording_id: &str, state: CaptureState) -> bool {
        self.inner.lock().await.registry.update_state(recording_id, state)
    }

    pub async fn remove_recording(&self, recording_id: &str) -> Option<RecordingSession> {
        self.inner.lock().await.registry.remove(recording_id)
    }

    pub async fn session(&self, recording_id: &str) -> Option<RecordingSession> {
        self.inner.lock().await.registry.get(recording_id).cloned()
    }

    pub async fn session_for_note(&self, note_id: &str) -> Option<RecordingSession> {
        self.inner.lock().await.registry.get_for_note(note_id).cloned()
    }

    pub async fn sessions(&self) -> Vec<RecordingSession> {
        self.inner.lock().await.registry.snapshot()
    }

    // --- calendar links ---

    pub async fn track_link(&self, link: CalendarLink) {
        self.inner.lock().await.links.insert(link);
    }

    pub async fn take_link(&self, recording_id: &str) -> Option<CalendarLink> {
        self.inner.lock().await.links.remove(recording_id)
    }

    pub async fn link(&self, recording_id: &str) -> Option<CalendarLink> {
        self.inner.lock().await.links.get(recording_id).cloned()
    }

    pub async fn link_for_meeting(&self, meeting_id: &str) -> Option<CalendarLink> {
        self.inner
            .lock()
            .await
            .links
            .get_for_meeting(meeting_id)
            .cloned()
    }

    pub async fn links_snapshot(&self) -> Vec<CalendarLink> {
        self.inner.lock().await.links.snapshot()
    }

    // --- pending switches ---

    pub async fn register_pending(&self, pending: PendingSwitch) {
        self.inner.lock().await.pending.push(pending);
    }

    /// Consume the oldest pending switch. The engine reports only the new
    /// recording id, so binding is first-in-first-out.
    pub async fn take_next_pending(&self) -> Option<PendingSwitch> {
        let mut state = self.inner.lock().await;
        if state.pending.is_empty() {
            None
        } else {
            Some(state.pending.remove(0))
        }
    }

    /// Drop pending switches for one meeting only; switches for unrelated
    /// meetings stay queued.
    pub async fn clear_pending_for_meeting(&self, meeting_id: &str) -> usize {
        let mut state = self.inner.lock().await;
        let before = state.pending.len();
        state.pending.retain(|p| p.meeting_id != meeting_id);
        before - state.pending.len()
    }

    pub async fn pending_snapshot(&self) -> Vec<PendingSwitch> {
        self.inner.lock().await.pending.clone()
    }

    // --- switch suppression ---

    /// Mark a recording as mid-switch so its end event skips the upload path.
    pub async fn mark_switching(&self, recording_id: &str) {
        self.inner
            .lock()
            .await
            .switching
            .insert(recording_id.to_string());
    }

    pub async fn take_switching(&self, recording_id: &str) -> bool {
        self.inner.lock().await.switching.remove(recording_id)
    }

    // --- deferred tasks ---

    /// Store a deferred task for a recording, aborting any task it replaces.
    pub async fn store_deferred(&self, recording_id: &str, handle: JoinHandle<()>) {
        let mut state = self.inner.lock().await;
        if let Some(previous) = state.deferred.insert(recording_id.to_string(), handle) {
            debug!("Replacing deferred task for recording {}", recording_id);
            previous.abort();
        }
    }

    /// Drop the entry for a deferred task that has run to completion. Called
    /// by the task itself so the map does not grow without bound.
    pub async fn finish_deferred(&self, recording_id: &str) {
        self.inner.lock().await.deferred.remove(recording_id);
    }

    pub async fn deferred_count(&self) -> usize {
        self.inner.lock().await.deferred.len()
    }

    /// Abort and forget the deferred task for a recording, if any.
    pub async fn cancel_deferred(&self, recording_id: &str) -> bool {
        let mut state = self.inner.lock().await;
        match state.deferred.remove(recording_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}
