//! Capture engine driven over a child process.
//!
//! The engine binary is spawned once and spoken to with newline-delimited
//! JSON: commands go down stdin, lifecycle events come back on stdout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    CaptureEngine, CaptureHandle, CaptureState, DetectedWindow, EngineEvent, Platform,
    RealtimeData,
};

#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "kebab-case")]
enum WireCommand<'a> {
    Start {
        recording_id: &'a str,
        upload_token: &'a str,
    },
    StartWindow {
        platform: Platform,
        window_id: &'a str,
        upload_token: &'a str,
    },
    Stop {
        recording_id: &'a str,
    },
    Upload {
        recording_id: &'a str,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum WireEvent {
    WindowDetected {
        platform: String,
        title: String,
        id: String,
    },
    WindowClosed {
        id: String,
    },
    CaptureEnded {
        id: String,
    },
    CaptureStateChanged {
        id: String,
        state: CaptureState,
    },
    UploadProgress {
        id: String,
        percent: u8,
    },
    RealtimeData {
        id: String,
        #[serde(flatten)]
        data: RealtimeData,
    },
    Error {
        #[serde(rename = "type")]
        kind: String,
        message: String,
    },
}

impl From<WireEvent> for EngineEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::WindowDetected {
                platform,
                title,
                id,
            } => EngineEvent::WindowDetected(DetectedWindow {
                platform: Platform::parse(&platform),
                title,
                id,
            }),
            WireEvent::WindowClosed { id } => EngineEvent::WindowClosed { window_id: id },
            WireEvent::CaptureEnded { id } => EngineEvent::CaptureEnded { recording_id: id },
            WireEvent::CaptureStateChanged { id, state } => EngineEvent::CaptureStateChanged {
                recording_id: id,
                state,
            },
            WireEvent::UploadProgress { id, percent } => EngineEvent::UploadProgress {
                recording_id: id,
                percent,
            },
            WireEvent::RealtimeData { id, data } => EngineEvent::RealtimeData {
                recording_id: id,
                data,
            },
            WireEvent::Error { kind, message } => EngineEvent::EngineError { kind, message },
        }
    }
}

pub struct ProcessEngine {
    stdin: Arc<Mutex<ChildStdin>>,
    _child: Child,
}

impl ProcessEngine {
    /// Spawn the engine process and start pumping its stdout into `events`.
    pub fn spawn(command: &str, events: mpsc::Sender<EngineEvent>) -> Result<Self> {
        info!("Spawning capture engine: {}", command);

        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn capture engine: {command}"))?;

        let stdin = child
            .stdin
            .take()
            .context("Capture engine stdin not piped")?;
        let stdout = child
            .stdout
            .take()
            .context("Capture engine stdout not piped")?;

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<WireEvent>(line) {
                            Ok(event) => {
                                if events.send(event.into()).await.is_err() {
                                    debug!("Engine event consumer gone, stopping reader");
                                    break;
                                }
                            }
                            Err(e) => warn!("Unparseable engine event: {} ({})", line, e),
                        }
                    }
                    Ok(None) => {
                        error!("Capture engine closed its stdout");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read from capture engine: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            stdin: Arc::new(Mutex::new(stdin)),
            _child: child,
        })
    }

    async fn send(&self, command: WireCommand<'_>) -> Result<()> {
        let mut line = serde_json::to_string(&command)?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .context("Failed to write command to capture engine")?;
        stdin.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl CaptureEngine for ProcessEngine {
    async fn prepare_audio_capture(&self) -> Result<CaptureHandle> {
        // Audio captures are id'd on our side so the registry can track them
        // before the engine confirms anything.
        Ok(CaptureHandle {
            recording_id: Uuid::new_v4().to_string(),
        })
    }

    async fn start_capture(&self, handle: &CaptureHandle, upload_token: &str) -> Result<()> {
        self.send(WireCommand::Start {
            recording_id: &handle.recording_id,
            upload_token,
        })
        .await
    }

    async fn start_window_capture(
        &self,
        window: &DetectedWindow,
        upload_token: &str,
    ) -> Result<()> {
        self.send(WireCommand::StartWindow {
            platform: window.platform,
            window_id: &window.id,
            upload_token,
        })
        .await
    }

    async fn stop_capture(&self, recording_id: &str) -> Result<()> {
        self.send(WireCommand::Stop { recording_id }).await
    }

    async fn upload_capture(&self, recording_id: &str) -> Result<()> {
        self.send(WireCommand::Upload { recording_id }).await
    }
}
