use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::kernel::session::SessionHandle;
use crate::speech::capture::{CaptureErrorKind, CaptureOptions, SpeechCapture};

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Recognize this text once capture starts.
    Say(String),
    /// Fail this start with the given error.
    Fail(CaptureErrorKind),
}

/// Capture that plays back a fixed sequence, one step per `start`. Once the
/// script runs out, starts succeed and nothing is heard.
pub struct ScriptedCapture {
    script: VecDeque<ScriptStep>,
    handle: SessionHandle,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl ScriptedCapture {
    pub fn new(handle: SessionHandle, script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: script.into_iter().collect(),
            handle,
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shorthand for a script of utterances only.
    pub fn saying<I, S>(handle: SessionHandle, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(handle, lines.into_iter().map(|line| ScriptStep::Say(line.into())))
    }

    /// Shared counter of `start` calls.
    pub fn starts(&self) -> Arc<AtomicUsize> {
        self.starts.clone()
    }

    /// Shared counter of `stop` calls. Aborts are not counted.
    pub fn stops(&self) -> Arc<AtomicUsize> {
        self.stops.clone()
    }
}

#[async_trait]
impl SpeechCapture for ScriptedCapture {
    async fn start(&mut self, _options: &CaptureOptions) -> Result<(), CaptureErrorKind> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(ScriptStep::Fail(kind)) => Err(kind),
            Some(ScriptStep::Say(text)) => {
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    let _ = handle.heard(text).await;
                });
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn abort(&mut self) {}
}
