//! Capture engine contract and wire types.
//!
//! The engine is an external process that does the actual audio/video
//! recording and upload. We drive it through [`CaptureEngine`] and consume
//! its lifecycle events as [`EngineEvent`]s.

pub mod process;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use process::ProcessEngine;

/// Conferencing platform a window or calendar event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Zoom,
    Meet,
    Teams,
    Webex,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zoom => "zoom",
            Self::Meet => "meet",
            Self::Teams => "teams",
            Self::Webex => "webex",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "zoom" => Self::Zoom,
            "meet" | "google-meet" => Self::Meet,
            "teams" => Self::Teams,
            "webex" => Self::Webex,
            _ => Self::Unknown,
        }
    }
}

/// Lifecycle state the engine reports for a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    Recording,
    Paused,
    Stopping,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
        }
    }
}

/// Handle for a capture prepared ahead of time. Audio captures get their
/// recording id assigned at prepare time; window captures are assigned one
/// asynchronously by the engine.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    pub recording_id: String,
}

/// A conferencing window the engine has spotted on screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedWindow {
    pub platform: Platform,
    pub title: String,
    pub id: String,
}

/// Realtime payload attached to a running recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RealtimeData {
    Transcript {
        speaker: Option<String>,
        text: String,
    },
    Participant {
        name: String,
    },
}

/// Lifecycle events emitted by the capture engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    WindowDetected(DetectedWindow),
    WindowClosed {
        window_id: String,
    },
    CaptureEnded {
        recording_id: String,
    },
    CaptureStateChanged {
        recording_id: String,
        state: CaptureState,
    },
    UploadProgress {
        recording_id: String,
        percent: u8,
    },
    RealtimeData {
        recording_id: String,
        data: RealtimeData,
    },
    EngineError {
        kind: String,
        message: String,
    },
}

/// Commands the recorder issues to the capture engine.
///
/// Engine failures are surfaced to the user but never terminate other
/// in-flight sessions.
#[async_trait]
pub trait CaptureEngine: Send + Sync {
    /// Reserve an audio capture ahead of a scheduled meeting. The recording
    /// id is known synchronously.
    async fn prepare_audio_capture(&self) -> Result<CaptureHandle>;

    /// Begin a previously prepared capture.
    async fn start_capture(&self, handle: &CaptureHandle, upload_token: &str) -> Result<()>;

    /// Begin a video capture of a detected window. The engine assigns the
    /// recording id asynchronously and reports it via
    /// [`EngineEvent::CaptureStateChanged`].
    async fn start_window_capture(&self, window: &DetectedWindow, upload_token: &str)
        -> Result<()>;

    async fn stop_capture(&self, recording_id: &str) -> Result<()>;

    async fn upload_capture(&self, recording_id: &str) -> Result<()>;
}
