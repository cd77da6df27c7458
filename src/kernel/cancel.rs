use std::collections::HashSet;

use super::event::SpeechId;
use super::scheduler::Timer;

/// Decides which pending work is still wanted.
///
/// Timers carry the epoch they were scheduled in; bumping the epoch turns
/// every timer already in flight stale. Playbacks that were cut short are
/// remembered so their late end/failure reports are ignored.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    epoch: u64,
    cancelled_speech: HashSet<SpeechId>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Invalidates everything scheduled so far and returns the new epoch.
    pub fn bump(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    pub fn is_current(&self, timer: &Timer) -> bool {
        timer.epoch == self.epoch
    }

    pub fn cancel_speech(&mut self, id: SpeechId) {
        self.cancelled_speech.insert(id);
    }

    /// Consumes the cancellation mark, so each late report is dropped once.
    pub fn take_cancelled_speech(&mut self, id: SpeechId) -> bool {
        self.cancelled_speech.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scheduler::TimerKind;

    #[test]
    fn bump_makes_old_timers_stale() {
        let mut registry = CancellationRegistry::new();
        let timer = Timer::new(TimerKind::ResumeListening, registry.epoch());
        assert!(registry.is_current(&timer));

        registry.bump();
        assert!(!registry.is_current(&timer));
        assert!(registry.is_current(&Timer::new(TimerKind::RetryCapture, registry.epoch())));
    }

    #[test]
    fn cancelled_speech_is_reported_once() {
        let mut registry = CancellationRegistry::new();
        registry.cancel_speech(SpeechId(3));
        assert!(registry.take_cancelled_speech(SpeechId(3)));
        assert!(!registry.take_cancelled_speech(SpeechId(3)));
    }
}
