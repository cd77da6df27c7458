use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recognition error reported by the capture backend. Messages are the ones
/// shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum CaptureErrorKind {
    #[error("음성이 감지되지 않았습니다.")]
    NoSpeech,
    #[error("마이크 접근 오류입니다.")]
    AudioCapture,
    #[error("네트워크 연결 오류입니다.")]
    Network,
    #[error("음성 인식이 중단되었습니다.")]
    Aborted,
    #[error("마이크 권한이 거부되었습니다.")]
    NotAllowed,
    #[error("음성 인식 서비스가 허용되지 않았습니다.")]
    ServiceNotAllowed,
    #[error("지원되지 않는 언어입니다.")]
    LanguageNotSupported,
    #[error("문법 오류가 발생했습니다.")]
    BadGrammar,
    #[error("알 수 없는 음성 인식 오류입니다.")]
    Unknown,
}

impl CaptureErrorKind {
    /// Maps a recognizer error code (`no-speech`, `not-allowed`, ...).
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "aborted" => Self::Aborted,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "language-not-supported" => Self::LanguageNotSupported,
            "bad-grammar" => Self::BadGrammar,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::AudioCapture => "audio-capture",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::LanguageNotSupported => "language-not-supported",
            Self::BadGrammar => "bad-grammar",
            Self::Unknown => "unknown",
        }
    }

    /// Worth retrying automatically.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::NoSpeech | Self::AudioCapture | Self::Network)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    pub continuous: bool,
    pub interim_results: bool,
    pub locale: String,
    pub max_alternatives: u32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            locale: "ko-KR".to_string(),
            max_alternatives: 1,
        }
    }
}

/// Speech-to-text backend. Results, errors and end-of-capture are reported
/// back to the session as events; these calls only control the device.
#[async_trait]
pub trait SpeechCapture: Send {
    async fn start(&mut self, options: &CaptureOptions) -> Result<(), CaptureErrorKind>;
    /// Stop and deliver whatever was already recognized.
    async fn stop(&mut self);
    /// Stop and discard pending results.
    async fn abort(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Restart capture after this many milliseconds.
    RetryAfter(u64),
    /// Stay stopped until the user restarts capture.
    WaitForManualRestart,
    /// Repeated aborts; the recognizer itself needs restarting.
    RestartRecommended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Linear backoff step: the n-th retry waits n * backoff_ms.
    pub backoff_ms: u64,
    pub aborted_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 1000,
            aborted_limit: 3,
        }
    }
}

/// Tracks consecutive capture errors and decides how to recover.
#[derive(Debug, Clone, Default)]
pub struct CaptureRecovery {
    policy: RetryPolicy,
    transient: u32,
    aborted: u32,
}

impl CaptureRecovery {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            transient: 0,
            aborted: 0,
        }
    }

    pub fn on_error(&mut self, kind: CaptureErrorKind) -> RecoveryAction {
        if kind.is_transient() {
            self.transient += 1;
            if self.transient > self.policy.max_retries {
                return RecoveryAction::WaitForManualRestart;
            }
            return RecoveryAction::RetryAfter(self.policy.backoff_ms * u64::from(self.transient));
        }
        if kind == CaptureErrorKind::Aborted {
            self.aborted += 1;
            if self.aborted >= self.policy.aborted_limit {
                return RecoveryAction::RestartRecommended;
            }
        }
        RecoveryAction::WaitForManualRestart
    }

    /// A final result came through; the recognizer is healthy again.
    pub fn on_success(&mut self) {
        self.transient = 0;
        self.aborted = 0;
    }

    pub fn reset(&mut self) {
        self.on_success();
    }

    pub fn aborted_count(&self) -> u32 {
        self.aborted
    }
}
