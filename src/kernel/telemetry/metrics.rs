use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use super::event::{FallbackReason, TelemetryEvent};
use crate::kernel::state::{FlowStatus, Stage};
use crate::speech::capture::CaptureErrorKind;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub capture_errors: HashMap<CaptureErrorKind, u64>,
    pub recognition: RecognitionStats,
    pub retries_by_stage: HashMap<Stage, u64>,
    pub fallback_stats: FallbackStats,
    pub submission_stats: SubmissionStats,
    pub flow_stats: FlowStats,
    pub stale_timers: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecognitionStats {
    pub accepted: u64,
    pub failed: u64,
    /// accepted / (accepted + failed); 0.0 before anything was heard.
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FallbackStats {
    pub retries_exhausted: u64,
    pub user_requested: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionStats {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowStats {
    pub started: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub stages_advanced: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::FlowStarted => snap.flow_stats.started += 1,
            TelemetryEvent::StageAdvanced { .. } => snap.flow_stats.stages_advanced += 1,
            TelemetryEvent::UtteranceAccepted { .. } => snap.recognition.accepted += 1,
            TelemetryEvent::ValidationFailed { stage, .. } => {
                snap.recognition.failed += 1;
                *snap.retries_by_stage.entry(*stage).or_default() += 1;
            }
            TelemetryEvent::KeyboardFallback { reason, .. } => match reason {
                FallbackReason::RetriesExhausted => snap.fallback_stats.retries_exhausted += 1,
                FallbackReason::UserRequested => snap.fallback_stats.user_requested += 1,
            },
            TelemetryEvent::CaptureError { kind } => {
                *snap.capture_errors.entry(*kind).or_default() += 1;
            }
            TelemetryEvent::StaleTimerDiscarded => snap.stale_timers += 1,
            TelemetryEvent::SubmissionFinished { success } => {
                if *success {
                    snap.submission_stats.succeeded += 1;
                } else {
                    snap.submission_stats.failed += 1;
                }
            }
            TelemetryEvent::FlowEnded { status } => match status {
                FlowStatus::Complete => snap.flow_stats.completed += 1,
                FlowStatus::Cancelled => snap.flow_stats.cancelled += 1,
                FlowStatus::NotStarted | FlowStatus::InProgress => {}
            },
        }
    }

    let attempts = snap.recognition.accepted + snap.recognition.failed;
    if attempts > 0 {
        snap.recognition.success_rate = snap.recognition.accepted as f64 / attempts as f64;
    }

    snap
}
