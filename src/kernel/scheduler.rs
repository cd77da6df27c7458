use serde::{Deserialize, Serialize};

use super::event::SpeechId;
use super::state::{FlowStatus, Secret, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Start listening once the settle delay after a prompt has passed.
    ResumeListening,
    /// Restart capture after a transient recognition error.
    RetryCapture,
}

/// A deferred callback into the reactor, tagged with the cancellation epoch
/// it was scheduled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub kind: TimerKind,
    pub epoch: u64,
}

impl Timer {
    pub fn new(kind: TimerKind, epoch: u64) -> Self {
        Self { kind, epoch }
    }
}

/// Work the reactor asks the driver to do. Results come back as events.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Speak { id: SpeechId, text: String },
    CancelSpeech,
    /// Status line for the current stage (prompt, error, hint).
    Display { stage: Stage, message: String },
    ShowTranscript { text: String, is_final: bool },
    StartCapture,
    /// Stop listening; a result already in progress may still arrive.
    StopCapture,
    /// Stop listening and drop anything not yet delivered.
    AbortCapture,
    Schedule { delay_ms: u64, timer: Timer },
    /// Drop every timer still queued.
    CancelPending,
    Submit { email: String, password: Secret },
    FlowEnded(FlowStatus),
    Log(String),
}

/// Timers waiting for their deadline, in milliseconds on the session clock.
#[derive(Debug, Default)]
pub struct TimerQueue {
    pending: Vec<(u64, Timer)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, timer: Timer) {
        self.pending.push((now_ms.saturating_add(delay_ms), timer));
    }

    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|(due, _)| *due).min()
    }

    /// Removes and returns every timer due at `now_ms`, earliest first.
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<Timer> {
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|(at, _)| *at <= now_ms);
        self.pending = rest;
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, timer)| timer).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::time::{Clock, ManualClock};

    #[test]
    fn timers_fire_in_deadline_order() {
        let clock = ManualClock::new();
        let mut queue = TimerQueue::new();
        let late = Timer::new(TimerKind::RetryCapture, 0);
        let early = Timer::new(TimerKind::ResumeListening, 0);

        queue.schedule(clock.now_ms(), 900, late);
        queue.schedule(clock.now_ms(), 300, early);
        assert_eq!(queue.next_due(), Some(300));

        clock.advance(299);
        assert!(queue.pop_due(clock.now_ms()).is_empty());

        clock.advance(1000);
        assert_eq!(queue.pop_due(clock.now_ms()), vec![early, late]);
        assert!(queue.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = TimerQueue::new();
        queue.schedule(0, 10, Timer::new(TimerKind::ResumeListening, 1));
        queue.clear();
        assert_eq!(queue.next_due(), None);
    }
}
