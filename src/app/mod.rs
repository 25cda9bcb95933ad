//! Service wiring and the main command loop.

use crate::api::{ApiCommand, ApiServer};
use crate::config::Config;
use crate::correlate::CorrelationSettings;
use crate::dispatch::EventDispatcher;
use crate::engine::{CaptureEngine, EngineEvent, ProcessEngine};
use crate::global;
use crate::notify::{Notifier, UiEvent};
use crate::orchestrator::{MeetingRecorder, SwitchOrchestrator};
use crate::session::SessionManager;
use crate::store::StoreSerializer;
use anyhow::Result;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub async fn run_service() -> Result<()> {
    info!("Starting callscribe service");

    let config = Config::load()?;

    let store = StoreSerializer::new(global::meetings_file()?, &config.store);
    let sessions = SessionManager::default();

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let notifier = Notifier::new(ui_tx);
    tokio::spawn(async move {
        // Stand-in transport: the desktop shell subscribes here once wired.
        while let Some(event) = ui_rx.recv().await {
            debug!("UI outbound: {:?}", event);
        }
    });

    let (engine_tx, engine_rx) = mpsc::channel::<EngineEvent>(64);
    let engine: Arc<dyn CaptureEngine> =
        Arc::new(ProcessEngine::spawn(&config.engine.command, engine_tx)?);

    let correlation = CorrelationSettings {
        buffer: ChronoDuration::minutes(config.correlation.buffer_minutes),
        default_duration: ChronoDuration::minutes(config.correlation.default_duration_minutes),
    };
    let switcher = SwitchOrchestrator::new(
        Arc::clone(&engine),
        sessions.clone(),
        store.clone(),
        notifier.clone(),
        Duration::from_millis(config.switch.settle_delay_ms),
    );
    let dispatcher = EventDispatcher::new(
        Arc::clone(&engine),
        sessions.clone(),
        store.clone(),
        switcher,
        notifier.clone(),
        correlation,
        Duration::from_secs(config.engine.upload_delay_seconds),
    );
    tokio::spawn(dispatcher.run(engine_rx));

    let recorder = MeetingRecorder::new(
        Arc::clone(&engine),
        sessions.clone(),
        store.clone(),
        notifier.clone(),
    );

    let (api_tx, mut api_rx) = mpsc::channel::<ApiCommand>(10);
    let api_server = ApiServer::new(config.api.port, api_tx, sessions.clone(), store.clone());
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("callscribe is ready");

    while let Some(command) = api_rx.recv().await {
        match command {
            ApiCommand::StartCalendar(meeting) => {
                match recorder.begin_calendar_recording(meeting).await {
                    Ok(started) => info!(
                        "Calendar recording {} started (note {})",
                        started.recording_id, started.note_id
                    ),
                    Err(e) => error!("Failed to start calendar recording: {}", e),
                }
            }
            ApiCommand::StartAdhoc(window) => {
                match recorder.begin_adhoc_recording(&window).await {
                    Ok(note_id) => info!("Ad-hoc recording requested (note {})", note_id),
                    Err(e) => error!("Failed to start ad-hoc recording: {}", e),
                }
            }
            ApiCommand::StopRecording { recording_id } => {
                if let Err(e) = recorder.stop_recording(&recording_id).await {
                    error!("Failed to stop recording {}: {}", recording_id, e);
                }
            }
        }
    }

    Ok(())
}
