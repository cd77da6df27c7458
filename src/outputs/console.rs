use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::SynthesisError;
use crate::speech::capture::{CaptureErrorKind, CaptureOptions, SpeechCapture};
use crate::speech::synthesis::{SpeechSynthesizer, SynthesisRequest, Voice};

/// "Speaks" by printing. Every line is also kept for inspection.
#[derive(Debug, Clone)]
pub struct ConsoleSynthesizer {
    spoken: Arc<Mutex<Vec<String>>>,
    interrupt: Arc<Notify>,
    playback: Duration,
    quiet: bool,
}

impl Default for ConsoleSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSynthesizer {
    pub fn new() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            interrupt: Arc::new(Notify::new()),
            playback: Duration::ZERO,
            quiet: false,
        }
    }

    /// Records without printing.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::new()
        }
    }

    /// Pretend each line takes this long to play.
    pub fn with_playback(mut self, playback: Duration) -> Self {
        self.playback = playback;
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SpeechSynthesizer for ConsoleSynthesizer {
    async fn speak(&self, request: SynthesisRequest) -> Result<(), SynthesisError> {
        if !self.quiet {
            println!("[tts] {}", request.text);
        }
        if let Ok(mut lines) = self.spoken.lock() {
            lines.push(request.text);
        }

        let interrupted = self.interrupt.notified();
        tokio::select! {
            _ = tokio::time::sleep(self.playback) => Ok(()),
            _ = interrupted => Err(SynthesisError::Interrupted),
        }
    }

    fn cancel(&self) {
        self.interrupt.notify_waiters();
    }

    fn voices(&self) -> Vec<Voice> {
        vec![Voice {
            name: "console".to_string(),
            locale: "ko-KR".to_string(),
        }]
    }
}

/// Capture that stands in for a microphone: it only tracks whether the
/// session wants input. The driver reads lines and forwards them while
/// [`ListeningFlag::is_listening`] holds.
#[derive(Debug)]
pub struct ConsoleCapture {
    flag: ListeningFlag,
}

#[derive(Debug, Clone, Default)]
pub struct ListeningFlag {
    listening: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
}

impl ListeningFlag {
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// How many times capture was started.
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl ConsoleCapture {
    pub fn new() -> (Self, ListeningFlag) {
        let flag = ListeningFlag::default();
        (Self { flag: flag.clone() }, flag)
    }
}

#[async_trait]
impl SpeechCapture for ConsoleCapture {
    async fn start(&mut self, _options: &CaptureOptions) -> Result<(), CaptureErrorKind> {
        self.flag.starts.fetch_add(1, Ordering::SeqCst);
        self.flag.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) {
        self.flag.listening.store(false, Ordering::SeqCst);
    }

    async fn abort(&mut self) {
        self.flag.listening.store(false, Ordering::SeqCst);
    }
}
