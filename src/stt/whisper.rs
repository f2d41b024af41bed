//! Local whisper.cpp STT via whisper-rs.
//!
//! The real implementation is gated behind `#[cfg(feature = "whisper")]`.
//! Without the feature a stub refuses to load.

use std::path::{Path, PathBuf};

use tracing::info;

/// Location of the GGML model for `size` under the data directory.
pub fn model_path(data_dir: &Path, size: &str) -> PathBuf {
    data_dir.join("models").join(format!("ggml-{size}.en.bin"))
}

/// Download a whisper GGML model from HuggingFace unless already present.
pub async fn ensure_model(data_dir: &Path, size: &str) -> anyhow::Result<PathBuf> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let model_path = model_path(data_dir, size);
    if model_path.exists() {
        info!(path = %model_path.display(), "Whisper model already present");
        return Ok(model_path);
    }

    tokio::fs::create_dir_all(data_dir.join("models")).await?;

    let url = format!(
        "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-{size}.en.bin"
    );
    info!(url = %url, dest = %model_path.display(), "Downloading whisper model");

    let resp = reqwest::Client::new().get(&url).send().await?;
    if !resp.status().is_success() {
        anyhow::bail!("Failed to download whisper model: HTTP {}", resp.status());
    }

    let total_size = resp.content_length();

    // Write to a temp file, then rename, so a partial download is never
    // mistaken for a model.
    let tmp_path = model_path.with_extension("bin.tmp");
    let mut file = tokio::fs::File::create(&tmp_path).await?;

    let mut downloaded: u64 = 0;
    let mut last_logged: u64 = 0;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size.filter(|t| *t > 0) {
            let pct = downloaded * 100 / total;
            if pct >= last_logged + 10 {
                last_logged = pct;
                info!(size, pct, "Downloading whisper model");
            }
        }
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&tmp_path, &model_path).await?;

    info!(path = %model_path.display(), "Whisper model downloaded");
    Ok(model_path)
}

#[cfg(feature = "whisper")]
mod inner {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use tracing::info;
    use whisper_rs::{
        FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
    };

    use crate::stt::SttEngine;

    /// Clips shorter than 0.4 s at 16 kHz are treated as silence.
    const MIN_SAMPLES: usize = 6_400;

    /// Half the cores, capped 1..=8, so rendering and playback keep a core.
    fn inference_threads() -> i32 {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        (cores / 2).clamp(1, 8) as i32
    }

    /// Context plus a lazily created, reused inference state.
    struct WhisperInner {
        ctx: WhisperContext,
        cached_state: Option<WhisperState>,
    }

    // SAFETY: access to the context and state is serialized by the Mutex.
    unsafe impl Send for WhisperInner {}
    unsafe impl Sync for WhisperInner {}

    pub struct WhisperStt {
        inner: Arc<Mutex<WhisperInner>>,
        n_threads: i32,
    }

    impl WhisperStt {
        pub fn new(model_path: &Path) -> anyhow::Result<Self> {
            if !model_path.exists() {
                anyhow::bail!("Whisper model not found: {}", model_path.display());
            }
            let ctx = WhisperContext::new_with_params(
                model_path.to_str().unwrap_or_default(),
                WhisperContextParameters::default(),
            )
            .map_err(|e| anyhow::anyhow!("Failed to load whisper model: {}", e))?;

            let n_threads = inference_threads();
            info!(model = %model_path.display(), threads = n_threads, "Whisper model loaded");
            Ok(Self {
                inner: Arc::new(Mutex::new(WhisperInner {
                    ctx,
                    cached_state: None,
                })),
                n_threads,
            })
        }
    }

    fn run_inference(inner: &Mutex<WhisperInner>, audio: &[f32], n_threads: i32) -> anyhow::Result<String> {
        let mut guard = inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Whisper state lock poisoned"))?;

        if guard.cached_state.is_none() {
            let state = guard
                .ctx
                .create_state()
                .map_err(|e| anyhow::anyhow!("Failed to create whisper state: {}", e))?;
            guard.cached_state = Some(state);
        }
        let state = guard
            .cached_state
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Whisper state missing"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some("en"));
        params.set_n_threads(n_threads);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_single_segment(true);
        params.set_no_timestamps(true);
        params.set_suppress_non_speech_tokens(true);

        state
            .full(params, audio)
            .map_err(|e| anyhow::anyhow!("Whisper inference failed: {}", e))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| anyhow::anyhow!("Failed to get segment count: {}", e))?;
        let segments: Vec<String> = (0..num_segments)
            .filter_map(|i| state.full_get_segment_text(i).ok())
            .map(|seg| seg.trim().to_string())
            .filter(|seg| !seg.is_empty())
            .collect();
        Ok(segments.join(" "))
    }

    impl SttEngine for WhisperStt {
        async fn transcribe(&self, audio: &[f32]) -> anyhow::Result<String> {
            if audio.len() < MIN_SAMPLES {
                return Ok(String::new());
            }

            let audio = audio.to_vec();
            let inner = Arc::clone(&self.inner);
            let n_threads = self.n_threads;

            tokio::task::spawn_blocking(move || run_inference(&inner, &audio, n_threads))
                .await
                .map_err(|e| anyhow::anyhow!("Whisper task panicked: {}", e))?
        }
    }
}

#[cfg(not(feature = "whisper"))]
mod inner {
    use std::path::Path;

    use tracing::warn;

    use crate::stt::SttEngine;

    pub struct WhisperStt;

    impl WhisperStt {
        pub fn new(model_path: &Path) -> anyhow::Result<Self> {
            warn!(
                model = %model_path.display(),
                "Whisper STT requested but whisper feature is disabled"
            );
            anyhow::bail!("Local whisper STT is not available (compile with --features whisper)")
        }
    }

    impl SttEngine for WhisperStt {
        async fn transcribe(&self, _audio: &[f32]) -> anyhow::Result<String> {
            anyhow::bail!("Local whisper STT is not available (compile with --features whisper)")
        }
    }
}

pub use inner::WhisperStt;
