use serde::{Deserialize, Serialize};

use crate::kernel::state::{FlowStatus, Stage};
use crate::speech::capture::CaptureErrorKind;

// Allowed: stages, counts, enums
// Forbidden: transcripts, field values, anything derived from them

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    FlowStarted,

    StageAdvanced {
        from: Stage,
        to: Stage,
    },

    UtteranceAccepted {
        stage: Stage,
        source: AcceptSource,
    },

    ValidationFailed {
        stage: Stage,
        attempt: u32,
    },

    KeyboardFallback {
        stage: Stage,
        reason: FallbackReason,
    },

    CaptureError {
        kind: CaptureErrorKind,
    },

    StaleTimerDiscarded,

    SubmissionFinished {
        success: bool,
    },

    FlowEnded {
        status: FlowStatus,
    },
}

/// Which path put a value into the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptSource {
    Entity,
    MultiInput,
    RawFallback,
    Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    RetriesExhausted,
    UserRequested,
}
