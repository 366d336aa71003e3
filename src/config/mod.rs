//! Configuration management for emote
//!
//! Precedence is env > TOML file > default.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::speech::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::speech::{Emotion, SpeakingRate, Voice};

/// Environment variables consulted for the API credential, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Default HTTP timeout for a speech request
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// emote configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API credential source
    pub credential: Credential,

    /// Speech service settings
    pub service: ServiceConfig,

    /// Defaults for omitted request parameters
    pub defaults: RequestDefaults,
}

/// Speech service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Model identifier
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Request parameter defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestDefaults {
    pub emotion: Emotion,
    pub voice: Voice,
    pub rate: SpeakingRate,
}

/// Where the API credential comes from
///
/// The environment is re-read on every [`Credential::resolve`] so a key
/// exported after startup is picked up by the next request.
#[derive(Debug, Clone, Default)]
pub struct Credential {
    env_vars: Vec<String>,
    fallback: Option<SecretString>,
}

impl Credential {
    /// Read from the standard environment variables, then `fallback`
    #[must_use]
    pub fn from_env(fallback: Option<SecretString>) -> Self {
        Self {
            env_vars: API_KEY_VARS.iter().map(ToString::to_string).collect(),
            fallback,
        }
    }

    /// Fixed credential that ignores the environment
    #[must_use]
    pub const fn fixed(key: SecretString) -> Self {
        Self {
            env_vars: Vec::new(),
            fallback: Some(key),
        }
    }

    /// No credential at all
    #[must_use]
    pub const fn none() -> Self {
        Self {
            env_vars: Vec::new(),
            fallback: None,
        }
    }

    /// Resolve the credential for one request
    #[must_use]
    pub fn resolve(&self) -> Option<SecretString> {
        self.env_vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
            .map(SecretString::from)
            .or_else(|| self.fallback.clone())
    }
}

impl Config {
    /// Load configuration from the standard config file and environment
    #[must_use]
    pub fn load() -> Self {
        Self::from_file(file::load_config_file())
    }

    /// Load configuration from an explicit config file path and environment
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        Self::from_file(file::load_config_file_from(path))
    }

    fn from_file(fc: file::EmoteConfigFile) -> Self {
        let credential = Credential::from_env(
            fc.api_key
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
        );

        let service = ServiceConfig {
            model: std::env::var("EMOTE_MODEL")
                .ok()
                .or(fc.service.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("EMOTE_BASE_URL")
                .ok()
                .or(fc.service.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("EMOTE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .or(fc.service.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        let defaults = RequestDefaults {
            emotion: fc.defaults.emotion.unwrap_or_default(),
            voice: fc.defaults.voice.unwrap_or_default(),
            rate: fc.defaults.rate.unwrap_or_default(),
        };

        Self {
            credential,
            service,
            defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_fixed_credential() {
        let cred = Credential::fixed(SecretString::from("k"));
        assert_eq!(cred.resolve().unwrap().expose_secret(), "k");
        assert!(Credential::none().resolve().is_none());
    }

    #[test]
    fn test_unset_env_uses_fallback() {
        let cred = Credential {
            env_vars: vec!["EMOTE_TEST_SURELY_UNSET_VAR".to_string()],
            fallback: Some(SecretString::from("file-key")),
        };
        assert_eq!(cred.resolve().unwrap().expose_secret(), "file-key");
    }

    #[test]
    fn test_load_from_file_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\nvoice = \"puck\"\nemotion = \"calm\"\n").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.defaults.voice, Voice::Puck);
        assert_eq!(config.defaults.emotion, Emotion::Calm);
        assert_eq!(config.defaults.rate, SpeakingRate::default());
    }
}
