//! End-to-end flow: a calendar-linked audio recording gathers transcript,
//! a matching video window appears, the recording is switched to video, and
//! the engine-assigned id is bound to the new note.

mod common;

use callscribe::config::StoreConfig;
use callscribe::correlate::CorrelationSettings;
use callscribe::dispatch::EventDispatcher;
use callscribe::engine::{CaptureState, DetectedWindow, EngineEvent, Platform, RealtimeData};
use callscribe::notify::Notifier;
use callscribe::orchestrator::{CalendarMeeting, MeetingRecorder, SwitchOrchestrator};
use callscribe::session::SessionManager;
use callscribe::store::StoreSerializer;
use chrono::Utc;
use common::ScriptedEngine;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    engine: Arc<ScriptedEngine>,
    sessions: SessionManager,
    store: StoreSerializer,
    recorder: MeetingRecorder,
    dispatcher: EventDispatcher,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(ScriptedEngine::default());
    let sessions = SessionManager::default();
    let store = StoreSerializer::new(dir.path().join("meetings.json"), &StoreConfig::default());
    let notifier = Notifier::disabled();

    let switcher = SwitchOrchestrator::new(
        engine.clone(),
        sessions.clone(),
        store.clone(),
        notifier.clone(),
        Duration::from_millis(10),
    );
    let dispatcher = EventDispatcher::new(
        engine.clone(),
        sessions.clone(),
        store.clone(),
        switcher,
        notifier.clone(),
        CorrelationSettings::default(),
        Duration::from_millis(10),
    );
    let recorder = MeetingRecorder::new(engine.clone(), sessions.clone(), store.clone(), notifier);

    Harness {
        engine,
        sessions,
        store,
        recorder,
        dispatcher,
        _dir: dir,
    }
}

fn sync_meeting() -> CalendarMeeting {
    CalendarMeeting {
        meeting_id: "ev-1".to_string(),
        title: "Weekly Engineering Sync".to_string(),
        start_time: Utc::now(),
        end_time: None,
        video_url: Some("https://zoom.example/j/123".to_string()),
        platform: Platform::Zoom,
        attendees: vec!["ana@example.com".to_string(), "bo@example.com".to_string()],
        description: Some("Weekly roundup".to_string()),
    }
}

#[tokio::test]
async fn test_audio_to_video_switch_flow() {
    let h = harness();

    // Calendar sync kicks off a proactive audio recording.
    let started = h
        .recorder
        .begin_calendar_recording(sync_meeting())
        .await
        .unwrap();
    let old_recording = started.recording_id.clone();

    // Transcript arrives while only audio is being captured.
    h.dispatcher
        .dispatch(EngineEvent::RealtimeData {
            recording_id: old_recording.clone(),
            data: RealtimeData::Transcript {
                speaker: Some("Ana".to_string()),
                text: "agenda for today".to_string(),
            },
        })
        .await;

    // The matching Zoom window shows up; the dispatcher switches to video.
    h.dispatcher
        .dispatch(EngineEvent::WindowDetected(DetectedWindow {
            platform: Platform::Zoom,
            title: "Engineering Sync - Zoom Meeting".to_string(),
            id: "w1".to_string(),
        }))
        .await;

    // Old recording fully gone from in-memory state.
    assert!(h.sessions.session(&old_recording).await.is_none());
    assert!(h.sessions.link(&old_recording).await.is_none());

    // The old note was replaced by a fresh record that kept the transcript
    // and calendar metadata.
    let doc = h.store.read().await;
    assert!(doc.find(&started.note_id).is_none());
    let pending = h.sessions.pending_snapshot().await;
    assert_eq!(pending.len(), 1);
    let new_note_id = pending[0].note_id.clone();
    let record = doc.find(&new_note_id).unwrap();
    assert_eq!(record.transcript.len(), 1);
    assert_eq!(record.attendees.len(), 2);
    assert_eq!(record.calendar_event_id.as_deref(), Some("ev-1"));

    // The engine reports the new video recording; it binds to the new note.
    h.dispatcher
        .dispatch(EngineEvent::CaptureStateChanged {
            recording_id: "video-9".to_string(),
            state: CaptureState::Recording,
        })
        .await;

    let sessions = h.sessions.sessions().await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].recording_id, "video-9");
    assert_eq!(sessions[0].note_id, new_note_id);
    assert!(h.sessions.pending_snapshot().await.is_empty());

    let doc = h.store.read().await;
    assert_eq!(
        doc.find(&new_note_id).unwrap().recording_id.as_deref(),
        Some("video-9")
    );

    // Exactly one MeetingRecord survives for this logical meeting.
    assert_eq!(doc.len(), 1);

    // The old capture ends mid-switch: no upload for it.
    h.dispatcher
        .dispatch(EngineEvent::CaptureEnded {
            recording_id: old_recording.clone(),
        })
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!h
        .engine
        .calls()
        .contains(&format!("upload:{old_recording}")));

    // The video capture ends normally: record completed, upload deferred.
    h.dispatcher
        .dispatch(EngineEvent::CaptureEnded {
            recording_id: "video-9".to_string(),
        })
        .await;
    let doc = h.store.read().await;
    assert!(doc.find(&new_note_id).unwrap().recording_complete);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.engine.calls().contains(&"upload:video-9".to_string()));
}

#[tokio::test]
async fn test_unmatched_window_does_not_disturb_recording() {
    let h = harness();

    let started = h
        .recorder
        .begin_calendar_recording(sync_meeting())
        .await
        .unwrap();

    // A Teams window with an unrelated title: no platform match, no title
    // overlap, so the calendar recording keeps running untouched.
    h.dispatcher
        .dispatch(EngineEvent::WindowDetected(DetectedWindow {
            platform: Platform::Teams,
            title: "Budget planning".to_string(),
            id: "w2".to_string(),
        }))
        .await;

    assert!(h.sessions.session(&started.recording_id).await.is_some());
    assert!(h.sessions.link(&started.recording_id).await.is_some());
    assert!(h.sessions.pending_snapshot().await.is_empty());
}

#[tokio::test]
async fn test_switch_failure_surfaces_but_does_not_corrupt_store() {
    let h = harness();

    let started = h
        .recorder
        .begin_calendar_recording(sync_meeting())
        .await
        .unwrap();

    // Sabotage: drop the meeting record before the window appears.
    let note_id = started.note_id.clone();
    h.store
        .schedule(move |mut doc| {
            doc.remove(&note_id);
            Some(doc)
        })
        .await
        .unwrap();

    h.dispatcher
        .dispatch(EngineEvent::WindowDetected(DetectedWindow {
            platform: Platform::Zoom,
            title: "Engineering Sync - Zoom Meeting".to_string(),
            id: "w1".to_string(),
        }))
        .await;

    // The switch failed, but stale state was still cleaned up eagerly.
    assert!(h.sessions.session(&started.recording_id).await.is_none());
    assert!(h.sessions.link(&started.recording_id).await.is_none());
    assert!(h.store.read().await.is_empty());
}
