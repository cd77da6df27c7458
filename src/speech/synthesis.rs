use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 tag, e.g. `ko-KR`.
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<Voice>,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        locale: impl Into<String>,
        settings: &SynthesisSettings,
    ) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: Option<Voice>) -> Self {
        self.voice = voice;
        self
    }
}

/// Picks a voice for `locale`: an exact locale match first, then any voice
/// of the same language.
pub fn select_voice(voices: &[Voice], locale: &str) -> Option<Voice> {
    let language = locale.split(&['-', '_'][..]).next().unwrap_or(locale);
    voices
        .iter()
        .find(|v| v.locale.eq_ignore_ascii_case(locale))
        .or_else(|| {
            voices.iter().find(|v| {
                v.locale
                    .split(&['-', '_'][..])
                    .next()
                    .is_some_and(|l| l.eq_ignore_ascii_case(language))
            })
        })
        .cloned()
}

/// Text-to-speech backend. `speak` resolves when playback has finished.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, request: SynthesisRequest) -> Result<(), SynthesisError>;
    fn cancel(&self);
    fn voices(&self) -> Vec<Voice>;
}
