use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;
use crate::nlu::validate::PasswordPolicy;
use crate::speech::capture::{CaptureOptions, RetryPolicy};
use crate::speech::synthesis::SynthesisSettings;

pub const ENV_IDENTITY_KEY: &str = "VOICE_SIGNUP_IDENTITY_KEY";
pub const ENV_IDENTITY_URL: &str = "VOICE_SIGNUP_IDENTITY_URL";
pub const ENV_LOCALE: &str = "VOICE_SIGNUP_LOCALE";

/// Everything tunable about a signup session. Every field has a default, so
/// an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupConfig {
    pub locale: String,
    pub synthesis: SynthesisSettings,
    pub capture: CaptureOptions,
    pub capture_retry: RetryPolicy,
    pub flow: FlowSettings,
    pub password: PasswordPolicy,
    pub identity: IdentitySettings,
    /// Extra spoken-token corrections, `[spoken, literal]` pairs.
    pub corrections: Vec<(String, String)>,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            locale: "ko-KR".to_string(),
            synthesis: SynthesisSettings::default(),
            capture: CaptureOptions::default(),
            capture_retry: RetryPolicy::default(),
            flow: FlowSettings::default(),
            password: PasswordPolicy::default(),
            identity: IdentitySettings::default(),
            corrections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Minimum entity confidence to commit a value.
    pub accept_threshold: f32,
    /// Phone numbers come through digit-word conversion more often, so they
    /// get a lower bar.
    pub phone_threshold: f32,
    /// Failed attempts on one stage before switching to keyboard input.
    pub max_retries: u32,
    pub delays: SettleDelays,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            accept_threshold: 0.7,
            phone_threshold: 0.6,
            max_retries: 3,
            delays: SettleDelays::default(),
        }
    }
}

/// Pauses between the end of playback and the next capture, so the
/// recognizer does not pick up the tail of our own prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleDelays {
    pub after_prompt_ms: u64,
    pub after_reprompt_ms: u64,
    pub after_error_ms: u64,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            after_prompt_ms: 500,
            after_reprompt_ms: 1000,
            after_error_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub base_url: String,
    /// Without a key the in-memory registry is used.
    pub api_key: Option<String>,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            base_url: "https://identitytoolkit.googleapis.com".to_string(),
            api_key: None,
        }
    }
}

impl SignupConfig {
    /// Reads `path` if given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                Self::from_json(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_IDENTITY_KEY).filter(|k| !k.is_empty()) {
            self.identity.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_IDENTITY_URL).filter(|u| !u.is_empty()) {
            self.identity.base_url = url;
        }
        if let Some(locale) = lookup(ENV_LOCALE).filter(|l| !l.is_empty()) {
            self.capture.locale = locale.clone();
            self.locale = locale;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.flow.accept_threshold) || !in_unit(self.flow.phone_threshold) {
            return Err(ConfigError::Invalid("thresholds must be within 0.0..=1.0".into()));
        }
        if self.flow.max_retries == 0 {
            return Err(ConfigError::Invalid("flow.max_retries must be at least 1".into()));
        }
        if self.locale.trim().is_empty() {
            return Err(ConfigError::Invalid("locale must not be empty".into()));
        }
        if self.password.min_len == 0 {
            return Err(ConfigError::Invalid("password.min_len must be at least 1".into()));
        }
        Ok(())
    }
}
