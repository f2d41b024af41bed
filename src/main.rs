//! Voice Ganga entry point.
//!
//! Builds every collaborator explicitly, starts the capture worker, and runs
//! the avatar window on the main thread until the user closes it or says
//! "exit".

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use eframe::egui;
use tracing::{debug, error, info, warn};

use voice_ganga::audio::{self, ListenGate};
use voice_ganga::avatar::{GangaApp, WINDOW_TITLE};
use voice_ganga::config::{self, paths, AppConfig};
use voice_ganga::conversation::{self, CaptureWorker, Conversation, SHUTDOWN_GRACE};
use voice_ganga::dialogue::{DialogueRouter, PhraseModel, SystemBrowser, WikipediaClient};
use voice_ganga::logger;
use voice_ganga::stt::{self, recognizer::RecognizerSettings, MicrophoneRecognizer};
use voice_ganga::tts::{self, playback::AudioPlayer, SpeechOutput, Synthesizer, TextOnly, TtsOptions};
use voice_ganga::vad::PhraseSettings;

/// Time given to in-flight HTTP requests when the runtime is torn down.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Shown in the response box when no recognizer could be built.
const MICROPHONE_UNAVAILABLE: &str = "Speech recognition is not configured. Check the log for details.";

fn main() -> ExitCode {
    if let Err(e) = logger::init(&paths::get_log_dir()) {
        eprintln!("Logging unavailable: {e:#}");
    }

    match run() {
        Ok(()) => {
            info!("Voice Ganga stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Startup failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let data_dir = paths::get_data_dir();
    let config = config::load_config();
    info!(
        config = %config::get_config_path().display(),
        stt = %config.voice.stt_adapter,
        tts = %config.voice.tts_adapter,
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let handle = runtime.handle().clone();

    let gate = ListenGate::new();
    let (events_tx, events_rx) = conversation::channel();

    let router = build_router(&config, handle.clone())?;
    let speech: Box<dyn Synthesizer> = match build_speech(&config, handle) {
        Ok(speech) => Box::new(speech),
        Err(e) => Box::new(TextOnly::new(&e)),
    };

    let mut session = Conversation::new(router, speech, Arc::clone(&gate), events_rx);
    let worker = match build_recognizer(&config, &data_dir, &runtime, Arc::clone(&gate)) {
        Ok(recognizer) => Some(
            CaptureWorker::spawn(recognizer, Arc::clone(&gate), events_tx.clone())
                .context("Failed to start capture worker")?,
        ),
        Err(e) => {
            error!("Speech recognition unavailable: {e:#}");
            session = session.with_notice(MICROPHONE_UNAVAILABLE);
            None
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };

    let result = eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(GangaApp::new(session, events_tx)))),
    );

    if let Some(worker) = worker {
        if !worker.shutdown(SHUTDOWN_GRACE) {
            warn!("Leaving capture worker detached");
        }
    }
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    result.map_err(|e| anyhow::anyhow!("Window failed: {e}"))
}

fn build_recognizer(
    config: &AppConfig,
    data_dir: &Path,
    runtime: &tokio::runtime::Runtime,
    gate: Arc<ListenGate>,
) -> anyhow::Result<MicrophoneRecognizer> {
    let voice = &config.voice;
    if voice.stt_adapter == "whisper-local" {
        runtime
            .block_on(stt::whisper::ensure_model(data_dir, &voice.stt_model_size))
            .context("Failed to prepare whisper model")?;
    }
    let stt = stt::create_stt_engine(
        &voice.stt_adapter,
        data_dir,
        &voice.stt_model_size,
        voice.stt_api_key.as_deref(),
        voice.stt_endpoint.as_deref(),
    )?;
    info!(adapter = stt.name(), "Speech recognition ready");
    debug!(devices = ?audio::list_devices(), "Audio input devices");

    Ok(MicrophoneRecognizer::new(
        stt,
        runtime.handle().clone(),
        gate,
        RecognizerSettings {
            input_device: voice.input_device.clone(),
            phrase: PhraseSettings {
                time_limit: voice.phrase_time_limit(),
                ..PhraseSettings::default()
            },
            ..RecognizerSettings::default()
        },
    ))
}

fn build_router(config: &AppConfig, handle: tokio::runtime::Handle) -> anyhow::Result<DialogueRouter> {
    let knowledge = WikipediaClient::new(&config.lookup.wikipedia_settings(), handle)
        .context("Failed to build Wikipedia client")?;
    Ok(DialogueRouter::new(
        Box::new(knowledge),
        Box::new(SystemBrowser),
        Box::new(PhraseModel::builtin()),
    )
    .with_summary_sentences(config.lookup.sentences))
}

fn build_speech(config: &AppConfig, handle: tokio::runtime::Handle) -> anyhow::Result<SpeechOutput> {
    let voice = &config.voice;
    let engine = tts::create_tts_engine(
        &voice.tts_adapter,
        &TtsOptions {
            voice: voice.tts_voice.as_deref(),
            speed: voice.tts_speed,
            api_key: voice.tts_api_key.as_deref(),
            endpoint: voice.tts_endpoint.as_deref(),
        },
    )?;
    let player = AudioPlayer::new(voice.tts_volume).context("Failed to open audio output")?;
    Ok(SpeechOutput::new(engine, player, handle))
}
