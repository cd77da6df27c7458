use serde::{Deserialize, Serialize};

use super::scheduler::Timer;
use crate::error::SubmissionError;
use crate::nlu::types::Field;
use crate::services::identity::RegisteredUser;
use crate::speech::capture::CaptureErrorKind;

/// Identifies one playback request so late reports can be matched up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeechId(pub u64);

/// One recognition pass. Interim results are only shown; final results are
/// processed.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub is_final: bool,
}

impl Utterance {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyboardAction {
    Edit { field: Field, value: String },
    /// Validate the current field and move on.
    Next,
    Confirm,
    Cancel,
}

#[derive(Debug, Clone)]
pub enum Event {
    Start,
    Utterance(Utterance),
    Keyboard(KeyboardAction),

    // Capture lifecycle
    CaptureStarted,
    CaptureFailed(CaptureErrorKind),
    CaptureEnded,

    // Playback lifecycle
    PlaybackEnded(SpeechId),
    PlaybackFailed(SpeechId),

    SubmissionFinished(Result<RegisteredUser, SubmissionError>),
    TimerFired(Timer),

    SwitchToKeyboard,
    SwitchToVoice,
    /// Manual restart after a capture error that disabled automatic retry.
    ResumeCapture,
    /// The user navigated away. Everything after this is ignored.
    Dispose,
}

impl Event {
    pub fn heard(text: impl Into<String>) -> Self {
        Event::Utterance(Utterance::final_text(text))
    }
}
