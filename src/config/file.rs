//! TOML configuration file loading
//!
//! Supports `~/.config/emote/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::speech::{Emotion, SpeakingRate, Voice};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct EmoteConfigFile {
    /// API credential (environment variables take precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Speech service configuration
    #[serde(default)]
    pub service: ServiceFileConfig,

    /// Default request parameters
    #[serde(default)]
    pub defaults: DefaultsFileConfig,
}

/// Speech service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServiceFileConfig {
    /// Model identifier (e.g. "gemini-2.5-flash-preview-tts")
    pub model: Option<String>,

    /// API base URL
    pub base_url: Option<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Defaults applied when a flag is omitted
#[derive(Debug, Default, Deserialize)]
pub struct DefaultsFileConfig {
    pub emotion: Option<Emotion>,
    pub voice: Option<Voice>,
    pub rate: Option<SpeakingRate>,
}

/// Load the TOML config file from the standard path
///
/// Returns `EmoteConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> EmoteConfigFile {
    config_file_path().map_or_else(EmoteConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Returns `EmoteConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_from(path: &Path) -> EmoteConfigFile {
    if !path.exists() {
        return EmoteConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                EmoteConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            EmoteConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/emote/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("emote").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let fc = load_config_file_from(&dir.path().join("nope.toml"));
        assert!(fc.api_key.is_none());
        assert!(fc.service.model.is_none());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
api_key = "from-file"

[service]
timeout_secs = 10

[defaults]
emotion = "sad"
voice = "puck"
rate = 0.8
"#,
        )
        .unwrap();

        let fc = load_config_file_from(&path);
        assert_eq!(fc.api_key.as_deref(), Some("from-file"));
        assert_eq!(fc.service.timeout_secs, Some(10));
        assert!(fc.service.base_url.is_none());
        assert_eq!(fc.defaults.emotion, Some(Emotion::Sad));
        assert_eq!(fc.defaults.voice, Some(Voice::Puck));
        assert_eq!(fc.defaults.rate.map(SpeakingRate::get), Some(0.8));
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\nrate = 3.0\n").unwrap();

        let fc = load_config_file_from(&path);
        assert!(fc.defaults.rate.is_none());
    }
}
