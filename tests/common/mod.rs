//! Shared test doubles for integration tests.

use anyhow::Result;
use async_trait::async_trait;
use callscribe::engine::{CaptureEngine, CaptureHandle, DetectedWindow};
use std::sync::Mutex;

/// Capture engine double that records every command it receives.
#[derive(Default)]
pub struct ScriptedEngine {
    pub calls: Mutex<Vec<String>>,
    counter: Mutex<u32>,
}

impl ScriptedEngine {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptureEngine for ScriptedEngine {
    async fn prepare_audio_capture(&self) -> Result<CaptureHandle> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let recording_id = format!("audio-{}", *counter);
        self.calls
            .lock()
            .unwrap()
            .push(format!("prepare:{recording_id}"));
        Ok(CaptureHandle { recording_id })
    }

    async fn start_capture(&self, handle: &CaptureHandle, _upload_token: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("start:{}", handle.recording_id));
        Ok(())
    }

    async fn start_window_capture(
        &self,
        window: &DetectedWindow,
        _upload_token: &str,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("start_window:{}", window.id));
        Ok(())
    }

    async fn stop_capture(&self, recording_id: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("stop:{recording_id}"));
        Ok(())
    }

    async fn upload_capture(&self, recording_id: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("upload:{recording_id}"));
        Ok(())
    }
}
