//! Speech request parameters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Emotional delivery requested from the speech model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Excited,
    Calm,
    Fearful,
    Whispering,
}

impl Emotion {
    /// All emotions in display order
    pub const ALL: [Self; 8] = [
        Self::Neutral,
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Excited,
        Self::Calm,
        Self::Fearful,
        Self::Whispering,
    ];

    /// Instruction prepended to the user's text
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Neutral => "Say in a neutral, even tone",
            Self::Happy => "Say cheerfully",
            Self::Sad => "Say sadly, with a heavy heart",
            Self::Angry => "Say angrily",
            Self::Excited => "Say with great excitement",
            Self::Calm => "Say calmly and soothingly",
            Self::Fearful => "Say fearfully, with a trembling voice",
            Self::Whispering => "Whisper",
        }
    }

    /// Lowercase label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Excited => "excited",
            Self::Calm => "calm",
            Self::Fearful => "fearful",
            Self::Whispering => "whispering",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown emotion: {s}")))
    }
}

/// Prebuilt voice offered by the speech service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Kore,
    Puck,
}

impl Voice {
    /// All voices in display order
    pub const ALL: [Self; 2] = [Self::Kore, Self::Puck];

    /// Voice name on the wire
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kore => "Kore",
            Self::Puck => "Puck",
        }
    }

    /// Short description for listings
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Kore => "firm, clear",
            Self::Puck => "upbeat, lively",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown voice: {s}")))
    }
}

/// Speaking-rate multiplier, 0.75 to 1.25
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SpeakingRate(f32);

impl SpeakingRate {
    pub const MIN: f32 = 0.75;
    pub const MAX: f32 = 1.25;

    /// Validate a rate
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the rate is outside [0.75, 1.25] or not finite
    pub fn new(rate: f32) -> Result<Self> {
        if rate.is_finite() && (Self::MIN..=Self::MAX).contains(&rate) {
            Ok(Self(rate))
        } else {
            Err(Error::InvalidInput(format!(
                "speaking rate {rate} outside {}..={}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    #[must_use]
    pub const fn get(self) -> f32 {
        self.0
    }
}

impl Default for SpeakingRate {
    fn default() -> Self {
        Self(1.0)
    }
}

impl<'de> Deserialize<'de> for SpeakingRate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rate = f32::deserialize(deserializer)?;
        Self::new(rate).map_err(serde::de::Error::custom)
    }
}

impl FromStr for SpeakingRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rate: f32 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("not a number: {s}")))?;
        Self::new(rate)
    }
}

impl fmt::Display for SpeakingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// One speech request, built fresh per submission
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParameters {
    pub text: String,
    pub emotion: Emotion,
    pub voice: Voice,
    pub rate: SpeakingRate,
}

impl RequestParameters {
    #[must_use]
    pub fn new(text: impl Into<String>, emotion: Emotion, voice: Voice, rate: SpeakingRate) -> Self {
        Self {
            text: text.into(),
            emotion,
            voice,
            rate,
        }
    }

    /// Check preconditions that must hold before contacting the service
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the text is empty after trimming
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::InvalidInput("text must not be empty".to_string()));
        }
        Ok(())
    }

    /// Prompt sent to the model: `"<emotion prefix>: <text>"`
    #[must_use]
    pub fn prompt(&self) -> String {
        format!("{}: {}", self.emotion.prefix(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_composition() {
        let params = RequestParameters::new("Hi", Emotion::Happy, Voice::Kore, SpeakingRate::default());
        assert_eq!(params.prompt(), "Say cheerfully: Hi");
    }

    #[test]
    fn test_every_emotion_has_prefix() {
        for emotion in Emotion::ALL {
            assert!(!emotion.prefix().is_empty());
            assert_eq!(emotion.label().parse::<Emotion>().unwrap(), emotion);
        }
    }

    #[test]
    fn test_emotion_parse_case_insensitive() {
        assert_eq!("HAPPY".parse::<Emotion>().unwrap(), Emotion::Happy);
        assert_eq!(" sad ".parse::<Emotion>().unwrap(), Emotion::Sad);
        assert!(matches!("ecstatic".parse::<Emotion>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_voice_parse() {
        assert_eq!("kore".parse::<Voice>().unwrap(), Voice::Kore);
        assert_eq!("Puck".parse::<Voice>().unwrap(), Voice::Puck);
        assert!("Zephyr".parse::<Voice>().is_err());
        assert_eq!(Voice::Kore.to_string(), "Kore");
    }

    #[test]
    fn test_rate_bounds() {
        assert!(SpeakingRate::new(0.75).is_ok());
        assert!(SpeakingRate::new(1.25).is_ok());
        assert!(SpeakingRate::new(0.74).is_err());
        assert!(SpeakingRate::new(1.26).is_err());
        assert!(SpeakingRate::new(f32::NAN).is_err());
        assert_eq!("1.1".parse::<SpeakingRate>().unwrap().get(), 1.1);
        assert!("fast".parse::<SpeakingRate>().is_err());
    }

    #[test]
    fn test_rate_deserialize_validates() {
        #[derive(Deserialize)]
        struct Wrapper {
            rate: SpeakingRate,
        }

        let ok: Wrapper = toml::from_str("rate = 0.9").unwrap();
        assert_eq!(ok.rate.get(), 0.9);
        assert!(toml::from_str::<Wrapper>("rate = 2.0").is_err());
    }

    #[test]
    fn test_validate_rejects_blank_text() {
        let rate = SpeakingRate::default();
        assert!(RequestParameters::new("", Emotion::Calm, Voice::Puck, rate).validate().is_err());
        assert!(RequestParameters::new("  \n\t", Emotion::Calm, Voice::Puck, rate).validate().is_err());
        assert!(RequestParameters::new(" ok ", Emotion::Calm, Voice::Puck, rate).validate().is_ok());
    }
}
