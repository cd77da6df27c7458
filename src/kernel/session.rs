use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::{Event, KeyboardAction, SpeechId};
use super::reactor::SignupReactor;
use super::scheduler::{SideEffect, TimerQueue};
use super::state::{FlowStatus, RegistrationForm, Stage};
use super::telemetry::TelemetrySnapshot;
use super::time::Clock;
use crate::config::SignupConfig;
use crate::error::SignupError;
use crate::services::identity::RegistrationService;
use crate::speech::capture::{CaptureOptions, SpeechCapture};
use crate::speech::synthesis::{
    select_voice, SpeechSynthesizer, SynthesisRequest, SynthesisSettings, Voice,
};

/// Sends events into a running session. Capture backends and UIs hold one.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<Event>,
    shutdown: CancellationToken,
}

impl SessionHandle {
    pub async fn send(&self, event: Event) -> Result<(), SignupError> {
        self.sender.send(event).await.map_err(|_| SignupError::ChannelClosed)
    }

    /// A final recognition result.
    pub async fn heard(&self, text: impl Into<String>) -> Result<(), SignupError> {
        self.send(Event::heard(text)).await
    }

    pub async fn keyboard(&self, action: KeyboardAction) -> Result<(), SignupError> {
        self.send(Event::Keyboard(action)).await
    }

    /// Stops the session as if the user had left the page.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed() || self.shutdown.is_cancelled()
    }
}

/// Receiving end of [`session_channel`], consumed by [`SignupSession::new`].
pub struct SessionInbox {
    receiver: mpsc::Receiver<Event>,
    sender: mpsc::Sender<Event>,
    shutdown: CancellationToken,
}

pub fn session_channel(capacity: usize) -> (SessionHandle, SessionInbox) {
    let (sender, receiver) = mpsc::channel(capacity);
    let shutdown = CancellationToken::new();
    let handle = SessionHandle {
        sender: sender.clone(),
        shutdown: shutdown.clone(),
    };
    (
        handle,
        SessionInbox {
            receiver,
            sender,
            shutdown,
        },
    )
}

/// The I/O a session drives.
pub struct SessionIo {
    pub capture: Box<dyn SpeechCapture>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub registry: Arc<dyn RegistrationService>,
    /// Must follow tokio time; timer sleeps are computed from it.
    pub clock: Arc<dyn Clock>,
}

/// What a UI should show.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Display { stage: Stage, message: String },
    Transcript { text: String, is_final: bool },
    Ended(FlowStatus),
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub status: FlowStatus,
    pub form: RegistrationForm,
    pub telemetry: TelemetrySnapshot,
}

/// Async driver around [`SignupReactor`]: performs its side effects and
/// feeds their results back in as events.
pub struct SignupSession {
    reactor: SignupReactor,
    io: SessionIo,
    capture_options: CaptureOptions,
    synthesis: SynthesisSettings,
    locale: String,
    voice: Option<Voice>,
    timers: TimerQueue,
    inbox: SessionInbox,
    feedback: VecDeque<Event>,
    speech_tasks: HashMap<SpeechId, JoinHandle<()>>,
    ui: Option<mpsc::UnboundedSender<UiUpdate>>,
}

impl SignupSession {
    pub fn new(config: &SignupConfig, inbox: SessionInbox, io: SessionIo) -> Self {
        let voice = select_voice(&io.synthesizer.voices(), &config.locale);
        match &voice {
            Some(v) => debug!(voice = %v.name, "synthesis voice selected"),
            None => debug!(locale = %config.locale, "no matching voice; using backend default"),
        }
        Self {
            reactor: SignupReactor::new(config),
            io,
            capture_options: config.capture.clone(),
            synthesis: config.synthesis.clone(),
            locale: config.locale.clone(),
            voice,
            timers: TimerQueue::new(),
            inbox,
            feedback: VecDeque::new(),
            speech_tasks: HashMap::new(),
            ui: None,
        }
    }

    pub fn with_ui(mut self, ui: mpsc::UnboundedSender<UiUpdate>) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn reactor(&self) -> &SignupReactor {
        &self.reactor
    }

    /// Starts the flow and runs until it ends, the session is disposed, or
    /// the handle's shutdown is triggered.
    pub async fn run(mut self) -> SessionOutcome {
        info!("signup session running");
        self.dispatch(Event::Start).await;

        while !self.finished() {
            let sleep_ms = self
                .timers
                .next_due()
                .map(|due| due.saturating_sub(self.io.clock.now_ms()));

            tokio::select! {
                _ = self.inbox.shutdown.cancelled() => {
                    self.dispatch(Event::Dispose).await;
                    break;
                }
                Some(event) = self.inbox.receiver.recv() => {
                    self.dispatch(event).await;
                }
                _ = tokio::time::sleep(Duration::from_millis(sleep_ms.unwrap_or(0))),
                    if sleep_ms.is_some() =>
                {
                    let now = self.io.clock.now_ms();
                    for timer in self.timers.pop_due(now) {
                        self.dispatch(Event::TimerFired(timer)).await;
                    }
                }
            }
        }

        for (_, task) in self.speech_tasks.drain() {
            task.abort();
        }
        self.io.capture.abort().await;

        let state = self.reactor.state();
        info!(status = ?state.status, "signup session finished");
        SessionOutcome {
            status: state.status,
            form: state.form.clone(),
            telemetry: self.reactor.telemetry().snapshot(),
        }
    }

    fn finished(&self) -> bool {
        let state = self.reactor.state();
        state.disposed
            || (state.status.is_terminal()
                && state.pending_speech.is_none()
                && !state.submitting)
    }

    /// Steps the reactor with `event` and with every event its effects
    /// produce synchronously, in order.
    async fn dispatch(&mut self, event: Event) {
        self.feedback.push_back(event);
        while let Some(event) = self.feedback.pop_front() {
            for effect in self.reactor.step(event) {
                self.apply(effect).await;
            }
        }
    }

    async fn apply(&mut self, effect: SideEffect) {
        match effect {
            SideEffect::Speak { id, text } => self.speak(id, text),
            SideEffect::CancelSpeech => {
                // Cut-short tasks still report; the reactor drops those reports.
                self.io.synthesizer.cancel();
            }
            SideEffect::Display { stage, message } => {
                self.publish(UiUpdate::Display { stage, message })
            }
            SideEffect::ShowTranscript { text, is_final } => {
                self.publish(UiUpdate::Transcript { text, is_final })
            }
            SideEffect::StartCapture => match self.io.capture.start(&self.capture_options).await {
                Ok(()) => self.feedback.push_back(Event::CaptureStarted),
                Err(kind) => self.feedback.push_back(Event::CaptureFailed(kind)),
            },
            SideEffect::StopCapture => self.io.capture.stop().await,
            SideEffect::AbortCapture => self.io.capture.abort().await,
            SideEffect::Schedule { delay_ms, timer } => {
                self.timers.schedule(self.io.clock.now_ms(), delay_ms, timer);
            }
            SideEffect::CancelPending => self.timers.clear(),
            SideEffect::Submit { email, password } => {
                let registry = self.io.registry.clone();
                let sender = self.inbox.sender.clone();
                tokio::spawn(async move {
                    let result = registry.register(&email, password.expose()).await;
                    let _ = sender.send(Event::SubmissionFinished(result)).await;
                });
            }
            SideEffect::FlowEnded(status) => self.publish(UiUpdate::Ended(status)),
            SideEffect::Log(message) => debug!("{}", message),
        }
    }

    fn speak(&mut self, id: SpeechId, text: String) {
        self.speech_tasks.retain(|_, task| !task.is_finished());

        let request = SynthesisRequest::new(text, self.locale.clone(), &self.synthesis)
            .with_voice(self.voice.clone());
        let synthesizer = self.io.synthesizer.clone();
        let sender = self.inbox.sender.clone();
        let task = tokio::spawn(async move {
            let event = match synthesizer.speak(request).await {
                Ok(()) => Event::PlaybackEnded(id),
                Err(e) => {
                    warn!(speech = id.0, error = %e, "synthesis did not complete");
                    Event::PlaybackFailed(id)
                }
            };
            let _ = sender.send(event).await;
        });
        self.speech_tasks.insert(id, task);
    }

    fn publish(&self, update: UiUpdate) {
        if let Some(ui) = &self.ui {
            let _ = ui.send(update);
        }
    }
}
