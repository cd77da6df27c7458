use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::SpeechId;
use crate::nlu::types::Field;

/// Signup stages in the order they are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Name,
    Email,
    Password,
    Phone,
    Confirm,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::Name,
        Stage::Email,
        Stage::Password,
        Stage::Phone,
        Stage::Confirm,
    ];

    /// The form field collected at this stage. `Confirm` collects none.
    pub fn field(self) -> Option<Field> {
        match self {
            Stage::Name => Some(Field::Name),
            Stage::Email => Some(Field::Email),
            Stage::Password => Some(Field::Password),
            Stage::Phone => Some(Field::Phone),
            Stage::Confirm => None,
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Name => Some(Stage::Email),
            Stage::Email => Some(Stage::Password),
            Stage::Password => Some(Stage::Phone),
            Stage::Phone => Some(Stage::Confirm),
            Stage::Confirm => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field() {
            Some(field) => field.fmt(f),
            None => f.write_str("confirm"),
        }
    }
}

/// A string that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: Secret,
    pub phone: String,
}

impl RegistrationForm {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Password => self.password.expose(),
            Field::Phone => &self.phone,
        }
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::Password => self.password = Secret(value),
            Field::Phone => self.phone = value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub count: u32,
    pub last_suggestion_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Voice,
    Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowStatus {
    NotStarted,
    InProgress,
    Complete,
    Cancelled,
}

impl FlowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowStatus::Complete | FlowStatus::Cancelled)
    }
}

/// What the single capture/playback handle is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoPhase {
    Idle,
    Speaking,
    /// Playback ended; waiting out the settle delay before listening.
    Settling,
    Listening,
    Submitting,
}

/// Strict state delta. This is the ONLY way state mutates.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    FlowStarted,
    FieldWritten { field: Field, value: String },
    StageAdvanced(Stage),
    RetryRecorded { suggestion: usize },
    RetryReset,
    ModeChanged(Mode),
    AutoCapture(bool),
    PhaseChanged(IoPhase),
    SpeechPending { id: SpeechId, resume_after_ms: Option<u64> },
    SpeechSettled,
    SubmissionStarted,
    SubmissionSettled,
    FlowEnded(FlowStatus),
    Disposed,
}

#[derive(Debug, Clone)]
pub struct SignupState {
    pub stage: Stage,
    pub form: RegistrationForm,
    pub retry: RetryState,
    pub mode: Mode,
    pub status: FlowStatus,
    pub phase: IoPhase,
    /// Automatic capture is allowed. Off after keyboard fallback and
    /// terminal capture errors until the user restarts it.
    pub auto_capture: bool,
    pub submitting: bool,
    pub disposed: bool,
    /// Playback the flow is waiting on, and how long to settle before
    /// listening once it ends (`None`: do not listen afterwards).
    pub pending_speech: Option<(SpeechId, Option<u64>)>,
    // Monotonic version, bumped on every mutation
    pub version: u64,
}

impl Default for SignupState {
    fn default() -> Self {
        Self {
            stage: Stage::Name,
            form: RegistrationForm::default(),
            retry: RetryState::default(),
            mode: Mode::Voice,
            status: FlowStatus::NotStarted,
            phase: IoPhase::Idle,
            auto_capture: true,
            submitting: false,
            disposed: false,
            pending_speech: None,
            version: 0,
        }
    }
}

impl SignupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure reduction: State + Delta -> Mutated State
    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;

        match delta {
            StateDelta::FlowStarted => {
                self.status = FlowStatus::InProgress;
                self.stage = Stage::Name;
                self.retry = RetryState::default();
            }
            StateDelta::FieldWritten { field, value } => self.form.set(field, value),
            StateDelta::StageAdvanced(stage) => {
                self.stage = stage;
                self.retry = RetryState::default();
            }
            StateDelta::RetryRecorded { suggestion } => {
                self.retry.count += 1;
                self.retry.last_suggestion_index = Some(suggestion);
            }
            StateDelta::RetryReset => self.retry = RetryState::default(),
            StateDelta::ModeChanged(mode) => self.mode = mode,
            StateDelta::AutoCapture(on) => self.auto_capture = on,
            StateDelta::PhaseChanged(phase) => self.phase = phase,
            StateDelta::SpeechPending { id, resume_after_ms } => {
                self.pending_speech = Some((id, resume_after_ms));
                self.phase = IoPhase::Speaking;
            }
            StateDelta::SpeechSettled => {
                self.pending_speech = None;
                if self.phase == IoPhase::Speaking {
                    self.phase = IoPhase::Idle;
                }
            }
            StateDelta::SubmissionStarted => {
                self.submitting = true;
                self.phase = IoPhase::Submitting;
            }
            StateDelta::SubmissionSettled => {
                self.submitting = false;
                if self.phase == IoPhase::Submitting {
                    self.phase = IoPhase::Idle;
                }
            }
            StateDelta::FlowEnded(status) => {
                self.status = status;
                self.auto_capture = false;
            }
            StateDelta::Disposed => {
                self.disposed = true;
                self.auto_capture = false;
                self.pending_speech = None;
                self.phase = IoPhase::Idle;
            }
        }
    }

    /// Automatic listening may (re)start.
    pub fn can_listen(&self) -> bool {
        !self.disposed
            && !self.status.is_terminal()
            && self.mode == Mode::Voice
            && self.auto_capture
            && !self.submitting
            && self.pending_speech.is_none()
    }
}
