//! Configuration reading and data directory paths.

pub mod paths;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dialogue::wikipedia::{WikipediaSettings, DEFAULT_USER_AGENT};
use paths::get_data_dir;

pub const CONFIG_FILE: &str = "ganga_config.json";

/// Overrides the user agent sent to Wikipedia.
pub const USER_AGENT_ENV: &str = "WIKIPEDIA_USER_AGENT";
/// Fallback key for the OpenAI STT and TTS adapters.
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Top-level ganga_config.json shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub voice: VoiceConfig,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 700.0,
            height: 600.0,
        }
    }
}

/// Speech recognition and synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub stt_adapter: String,
    pub stt_api_key: Option<String>,
    pub stt_endpoint: Option<String>,
    /// Whisper model size for `whisper-local` ("tiny", "base", "small").
    pub stt_model_size: String,
    pub input_device: Option<String>,
    pub phrase_time_limit_secs: Option<f32>,
    pub tts_adapter: String,
    pub tts_voice: Option<String>,
    pub tts_volume: f32,
    pub tts_speed: Option<f32>,
    pub tts_api_key: Option<String>,
    pub tts_endpoint: Option<String>,
}

/// Local recognition when whisper is compiled in, otherwise the OpenAI API.
pub const DEFAULT_STT_ADAPTER: &str = if cfg!(feature = "whisper") {
    "whisper-local"
} else {
    "openai-cloud"
};

/// Needs no key or network.
pub const DEFAULT_TTS_ADAPTER: &str = "espeak-local";

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_adapter: DEFAULT_STT_ADAPTER.to_string(),
            stt_api_key: None,
            stt_endpoint: None,
            stt_model_size: "base".to_string(),
            input_device: None,
            phrase_time_limit_secs: None,
            tts_adapter: DEFAULT_TTS_ADAPTER.to_string(),
            tts_voice: None,
            tts_volume: 1.0,
            tts_speed: None,
            tts_api_key: None,
            tts_endpoint: None,
        }
    }
}

impl VoiceConfig {
    pub fn phrase_time_limit(&self) -> Option<Duration> {
        self.phrase_time_limit_secs
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f32)
    }
}

/// Knowledge lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub language: String,
    /// Sentences of the article intro to read out.
    pub sentences: usize,
    /// Request timeout; unset waits indefinitely.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            sentences: 3,
            timeout_secs: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl LookupConfig {
    pub fn wikipedia_settings(&self) -> WikipediaSettings {
        WikipediaSettings {
            language: self.language.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl AppConfig {
    /// Apply environment overrides. `lookup` reads one variable by name.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(agent) = lookup(USER_AGENT_ENV).filter(|v| !v.trim().is_empty()) {
            self.lookup.user_agent = agent;
        }
        if let Some(key) = lookup(OPENAI_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.voice.stt_api_key.get_or_insert_with(|| key.clone());
            self.voice.tts_api_key.get_or_insert(key);
        }
    }
}

/// Read ganga_config.json from the data directory, then apply environment
/// overrides. Missing or invalid files fall back to defaults.
pub fn load_config() -> AppConfig {
    let mut config = read_config_file(&get_config_path());
    config.apply_env(|name| std::env::var(name).ok());
    config
}

pub fn read_config_file(path: &Path) -> AppConfig {
    read_json_file(path).unwrap_or_default()
}

/// Path to ganga_config.json.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join(CONFIG_FILE)
}

/// Generic helper: read a JSON file and deserialize it.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {}", path.display(), e);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_config_file(&dir.path().join(CONFIG_FILE));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.window.width, 700.0);
        assert_eq!(config.lookup.sentences, 3);
    }

    #[test]
    fn invalid_json_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "{ not json");
        assert_eq!(read_config_file(&path), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"{ "voice": { "tts_voice": "alloy", "phrase_time_limit_secs": 8 },
                 "lookup": { "timeout_secs": 5 } }"#,
        );
        let config = read_config_file(&path);
        assert_eq!(config.voice.tts_voice.as_deref(), Some("alloy"));
        assert_eq!(config.voice.stt_adapter, DEFAULT_STT_ADAPTER);
        assert_eq!(config.voice.tts_adapter, "espeak-local");
        assert_eq!(
            config.voice.phrase_time_limit(),
            Some(Duration::from_secs(8))
        );
        assert_eq!(config.window, WindowConfig::default());

        let wiki = config.lookup.wikipedia_settings();
        assert_eq!(wiki.timeout, Some(Duration::from_secs(5)));
        assert_eq!(wiki.language, "en");
    }

    #[test]
    fn default_synthesis_needs_no_key() {
        let config = AppConfig::default();
        assert!(config.voice.tts_api_key.is_none());
        let engine = crate::tts::create_tts_engine(
            &config.voice.tts_adapter,
            &crate::tts::TtsOptions::default(),
        );
        if let Err(e) = engine {
            assert!(!e.to_string().contains("API key"), "{e}");
        }
    }

    #[test]
    fn non_positive_time_limit_is_ignored() {
        let voice = VoiceConfig {
            phrase_time_limit_secs: Some(0.0),
            ..VoiceConfig::default()
        };
        assert_eq!(voice.phrase_time_limit(), None);
    }

    #[test]
    fn env_fills_missing_keys_only() {
        let env: HashMap<&str, &str> = [
            (OPENAI_KEY_ENV, "sk-env"),
            (USER_AGENT_ENV, "Tester/1.0 (me@example.com)"),
        ]
        .into();
        let mut config = AppConfig::default();
        config.voice.tts_api_key = Some("sk-file".into());
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.voice.stt_api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.voice.tts_api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.lookup.user_agent, "Tester/1.0 (me@example.com)");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.lookup.user_agent, DEFAULT_USER_AGENT);
        assert!(config.voice.stt_api_key.is_none());
    }
}
