//! Platform-specific data directory paths.
//!
//!   Windows: %APPDATA%/voice-ganga/data
//!   macOS:   ~/Library/Application Support/voice-ganga/data
//!   Linux:   $XDG_CONFIG_HOME/voice-ganga/data (default ~/.config)

use std::path::{Path, PathBuf};

const APP_DIR: &str = "voice-ganga";

/// Get the Voice Ganga data directory (cross-platform).
pub fn get_data_dir() -> PathBuf {
    data_dir_under(&get_config_base())
}

/// Rolling log files live here.
pub fn get_log_dir() -> PathBuf {
    get_data_dir().join("logs")
}

pub(crate) fn data_dir_under(base: &Path) -> PathBuf {
    base.join(APP_DIR).join("data")
}

/// Get the platform-appropriate base config directory.
fn get_config_base() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata);
        }
        dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("AppData")
                .join("Roaming")
        })
    }

    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library")
            .join("Application Support")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    }
}
