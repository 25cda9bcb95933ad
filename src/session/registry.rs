//! Authoritative in-memory map of active recordings.

use crate::engine::{CaptureState, Platform};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::warn;

/// One active recording. Absence from the registry means idle.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub recording_id: String,
    pub note_id: String,
    pub platform: Platform,
    pub state: CaptureState,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RecordingRegistry {
    sessions: HashMap<String, RecordingSession>,
}

impl RecordingRegistry {
    /// Insert a session in state `Recording`. Last write wins on a duplicate
    /// recording id. A different session already covering the same note is
    /// evicted so `get_for_note` stays deterministic.
    pub fn add(&mut self, recording_id: &str, note_id: &str, platform: Platform) {
        let stale: Vec<String> = self
            .sessions
            .values()
            .filter(|s| s.note_id == note_id && s.recording_id != recording_id)
            .map(|s| s.recording_id.clone())
            .collect();
        for id in stale {
            warn!(
                "Evicting recording {} — note {} is being re-recorded as {}",
                id, note_id, recording_id
            );
            self.sessions.remove(&id);
        }

        self.sessions.insert(
            recording_id.to_string(),
            RecordingSession {
                recording_id: recording_id.to_string(),
                note_id: note_id.to_string(),
                platform,
                state: CaptureState::Recording,
                started_at: Utc::now(),
            },
        );
    }

    /// Returns false when the id is unknown.
    pub fn update_state(&mut self, recording_id: &str, state: CaptureState) -> bool {
        match self.sessions.get_mut(recording_id) {
            Some(session) => {
                session.state = state;
                true
            }
            None => false,
        }
    }

    /// Safe on unknown ids; returns the removed session if one existed.
    pub fn remove(&mut self, recording_id: &str) -> Option<RecordingSession> {
        self.sessions.remove(recording_id)
    }

    pub fn get(&self, recording_id: &str) -> Option<&RecordingSession> {
        self.sessions.get(recording_id)
    }

    pub fn get_for_note(&self, note_id: &str) -> Option<&RecordingSession> {
        self.sessions.values().find(|s| s.note_id == note_id)
    }

    /// Snapshot copy; callers never see the live map.
    pub fn snapshot(&self) -> Vec<RecordingSession> {
        self.sessions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_round_trip() {
        let mut registry = RecordingRegistry::default();
        registry.add("r1", "n1", Platform::Zoom);
        assert!(registry.get_for_note("n1").is_some());

        assert!(registry.remove("r1").is_some());
        assert!(registry.get_for_note("n1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_double_add_overwrites() {
        let mut registry = RecordingRegistry::default();
        registry.add("r1", "n1", Platform::Zoom);
        registry.add("r1", "n2", Platform::Meet);

        let session = registry.get("r1").unwrap();
        assert_eq!(session.note_id, "n2");
        assert_eq!(session.platform, Platform::Meet);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_note_evicts_previous_session() {
        let mut registry = RecordingRegistry::default();
        registry.add("r1", "n1", Platform::Zoom);
        registry.add("r2", "n1", Platform::Zoom);

        assert!(registry.get("r1").is_none());
        let session = registry.get_for_note("n1").unwrap();
        assert_eq!(session.recording_id, "r2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_state_unknown_id() {
        let mut registry = RecordingRegistry::default();
        assert!(!registry.update_state("missing", CaptureState::Paused));

        registry.add("r1", "n1", Platform::Teams);
        assert!(registry.update_state("r1", CaptureState::Paused));
        assert_eq!(registry.get("r1").unwrap().state, CaptureState::Paused);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry = RecordingRegistry::default();
        assert!(registry.remove("missing").is_none());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut registry = RecordingRegistry::default();
        registry.add("r1", "n1", Platform::Zoom);

        let mut snapshot = registry.snapshot();
        snapshot.clear();
        assert_eq!(registry.len(), 1);
    }
}
