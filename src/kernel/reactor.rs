use tracing::{debug, info, warn};

use super::cancel::CancellationRegistry;
use super::event::{Event, KeyboardAction, SpeechId, Utterance};
use super::scheduler::{SideEffect, Timer, TimerKind};
use super::speech::planner::{self, SpeechPlanner};
use super::state::{FlowStatus, IoPhase, Mode, SignupState, Stage, StateDelta};
use super::telemetry::{AcceptSource, FallbackReason, TelemetryEvent, TelemetryRecorder};
use crate::config::{FlowSettings, SignupConfig};
use crate::error::{SubmissionError, ValidationError};
use crate::nlu::types::{Analysis, Field, IntentKind};
use crate::nlu::{FieldExtractor, FieldValidator, IntentClassifier, PhoneticNormalizer};
use crate::services::identity::RegisteredUser;
use crate::speech::capture::{CaptureErrorKind, CaptureRecovery, RecoveryAction};

/// The signup controller.
///
/// `step` is pure with respect to I/O: it folds one event into the state and
/// returns the side effects a driver must carry out. Results of those effects
/// come back in as further events.
pub struct SignupReactor {
    state: SignupState,
    classifier: IntentClassifier,
    validator: FieldValidator,
    planner: SpeechPlanner,
    cancel_registry: CancellationRegistry,
    recovery: CaptureRecovery,
    telemetry: TelemetryRecorder,
    flow: FlowSettings,
    next_speech: u64,
}

impl SignupReactor {
    pub fn new(config: &SignupConfig) -> Self {
        let normalizer = PhoneticNormalizer::with_corrections(config.corrections.clone());
        Self {
            state: SignupState::new(),
            classifier: IntentClassifier::new(FieldExtractor::new(normalizer)),
            validator: FieldValidator::new(config.password.clone()),
            planner: SpeechPlanner::new(),
            cancel_registry: CancellationRegistry::new(),
            recovery: CaptureRecovery::new(config.capture_retry),
            telemetry: TelemetryRecorder::new(),
            flow: config.flow.clone(),
            next_speech: 0,
        }
    }

    pub fn state(&self) -> &SignupState {
        &self.state
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    pub fn epoch(&self) -> u64 {
        self.cancel_registry.epoch()
    }

    /// Advances the flow by one event. MUST NOT await I/O or timers.
    pub fn step(&mut self, event: Event) -> Vec<SideEffect> {
        let mut fx = Vec::new();
        if self.state.disposed {
            debug!("session disposed; ignoring {}", event_name(&event));
            return fx;
        }

        match event {
            Event::Start => self.start(&mut fx),
            Event::Utterance(utterance) => self.on_utterance(&mut fx, utterance),
            Event::Keyboard(action) => self.on_keyboard(&mut fx, action),
            Event::CaptureStarted => {
                if self.state.phase != IoPhase::Listening {
                    self.state.reduce(StateDelta::PhaseChanged(IoPhase::Listening));
                }
            }
            Event::CaptureFailed(kind) => self.on_capture_failed(&mut fx, kind),
            Event::CaptureEnded => self.on_capture_ended(&mut fx),
            Event::PlaybackEnded(id) => self.on_playback_done(&mut fx, id),
            Event::PlaybackFailed(id) => {
                warn!(speech = id.0, "playback failed; continuing without it");
                self.on_playback_done(&mut fx, id);
            }
            Event::SubmissionFinished(result) => self.on_submission(&mut fx, result),
            Event::TimerFired(timer) => self.on_timer(&mut fx, timer),
            Event::SwitchToKeyboard => {
                if self.state.mode == Mode::Voice && !self.state.status.is_terminal() {
                    self.keyboard_fallback(&mut fx, FallbackReason::UserRequested);
                }
            }
            Event::SwitchToVoice => self.switch_to_voice(&mut fx),
            Event::ResumeCapture => self.resume_capture(&mut fx),
            Event::Dispose => self.dispose(&mut fx),
        }

        fx
    }

    fn start(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.status != FlowStatus::NotStarted {
            debug!(status = ?self.state.status, "flow already started");
            return;
        }
        self.state.reduce(StateDelta::FlowStarted);
        self.telemetry.record(TelemetryEvent::FlowStarted);
        info!("signup flow started");

        let prompt = self.planner.prompt(Stage::Name, &self.state.form);
        let resume = self.resume_delay(self.flow.delays.after_prompt_ms);
        self.speak(fx, format!("{} {}", planner::WELCOME, prompt), resume);
    }

    fn on_utterance(&mut self, fx: &mut Vec<SideEffect>, utterance: Utterance) {
        if !utterance.is_final {
            fx.push(SideEffect::ShowTranscript {
                text: utterance.text,
                is_final: false,
            });
            return;
        }
        if self.state.pending_speech.is_some() {
            debug!("dropping utterance heard during playback");
            return;
        }

        let text = utterance.text.trim();
        fx.push(SideEffect::ShowTranscript {
            text: text.to_string(),
            is_final: true,
        });
        if text.is_empty() {
            debug!("empty utterance; still listening");
            return;
        }

        match self.state.status {
            FlowStatus::NotStarted => {
                if self.classifier.classify(text, Stage::Name).kind == IntentKind::StartSignup {
                    self.start(fx);
                }
                return;
            }
            FlowStatus::Complete | FlowStatus::Cancelled => return,
            FlowStatus::InProgress => {}
        }
        if self.state.mode == Mode::Keyboard || self.state.submitting {
            debug!(mode = ?self.state.mode, "utterance ignored");
            return;
        }

        self.recovery.on_success();
        let stage = self.state.stage;
        let analysis = self.classifier.analyze(text, stage);
        debug!(
            %stage,
            intent = ?analysis.intent.kind,
            entities = analysis.entities.len(),
            "utterance classified"
        );

        match analysis.intent.kind {
            IntentKind::Cancel => self.cancel_flow(fx),
            IntentKind::Retry | IntentKind::StartSignup => self.reprompt(fx),
            IntentKind::Confirm if stage == Stage::Confirm => self.submit(fx),
            _ if stage == Stage::Confirm => {
                let resume = self.resume_delay(self.flow.delays.after_reprompt_ms);
                self.speak(fx, planner::YES_OR_NO.to_string(), resume);
            }
            IntentKind::Confirm => self.confirm_current(fx, AcceptSource::Entity),
            IntentKind::MultiInput => self.commit_many(fx, &analysis),
            IntentKind::Input(_) | IntentKind::Unknown => self.commit_one(fx, text, &analysis),
        }
    }

    fn on_keyboard(&mut self, fx: &mut Vec<SideEffect>, action: KeyboardAction) {
        if self.state.status != FlowStatus::InProgress {
            debug!(status = ?self.state.status, "keyboard action outside an active flow");
            return;
        }
        match action {
            KeyboardAction::Edit { field, value } => {
                self.state.reduce(StateDelta::FieldWritten {
                    field,
                    value: value.trim().to_string(),
                });
                fx.push(SideEffect::Display {
                    stage: self.state.stage,
                    message: format!("{}을(를) 입력했습니다.", field.label()),
                });
            }
            KeyboardAction::Confirm if self.state.stage == Stage::Confirm => self.submit(fx),
            KeyboardAction::Next | KeyboardAction::Confirm => {
                if self.state.stage == Stage::Confirm {
                    let summary = self.planner.summary(&self.state.form);
                    fx.push(SideEffect::Display {
                        stage: Stage::Confirm,
                        message: summary,
                    });
                } else {
                    self.confirm_current(fx, AcceptSource::Keyboard);
                }
            }
            KeyboardAction::Cancel => self.cancel_flow(fx),
        }
    }

    /// Commits the best entity for the current field, or failing that the
    /// field-specific rendering of the raw utterance.
    fn commit_one(&mut self, fx: &mut Vec<SideEffect>, text: &str, analysis: &Analysis) {
        let Some(field) = self.state.stage.field() else {
            return;
        };

        if let Some(entity) = analysis.best_for(field) {
            if entity.confidence >= self.threshold(field) {
                match self.validator.validate(field, &entity.value) {
                    Ok(()) => {
                        self.commit(field, entity.value.clone(), AcceptSource::Entity);
                        self.advance();
                        self.prompt_current(fx, None);
                        return;
                    }
                    Err(e) => debug!(%field, error = %e, "entity rejected by validator"),
                }
            } else {
                debug!(%field, confidence = entity.confidence, "entity below threshold");
            }
        }

        let raw = self.classifier.extractor().normalizer().field_value(field, text);
        match self.validator.validate(field, &raw) {
            Ok(()) => {
                self.commit(field, raw, AcceptSource::RawFallback);
                self.advance();
                self.prompt_current(fx, None);
            }
            Err(e) => self.fail(fx, Some(e)),
        }
    }

    /// Commits consecutive stages while the utterance carries a qualifying
    /// value for each. No raw fallback here.
    fn commit_many(&mut self, fx: &mut Vec<SideEffect>, analysis: &Analysis) {
        let mut committed = 0;
        while let Some(field) = self.state.stage.field() {
            let Some(entity) = analysis.best_for(field) else {
                break;
            };
            if entity.confidence < self.threshold(field)
                || !self.validator.is_valid(field, &entity.value)
            {
                break;
            }
            self.commit(field, entity.value.clone(), AcceptSource::MultiInput);
            self.advance();
            committed += 1;
        }

        if committed == 0 {
            self.fail(fx, None);
        } else {
            info!(fields = committed, "multi-field utterance committed");
            self.prompt_current(fx, None);
        }
    }

    /// Accepts whatever is already in the form for the current field.
    fn confirm_current(&mut self, fx: &mut Vec<SideEffect>, source: AcceptSource) {
        let Some(field) = self.state.stage.field() else {
            return;
        };
        match self.validator.validate(field, self.state.form.get(field)) {
            Ok(()) => {
                self.telemetry.record(TelemetryEvent::UtteranceAccepted {
                    stage: self.state.stage,
                    source,
                });
                self.advance();
                self.prompt_current(fx, None);
            }
            Err(e) if source == AcceptSource::Keyboard => fx.push(SideEffect::Display {
                stage: self.state.stage,
                message: e.to_string(),
            }),
            Err(e) => self.fail(fx, Some(e)),
        }
    }

    fn commit(&mut self, field: Field, value: String, source: AcceptSource) {
        self.state.reduce(StateDelta::FieldWritten { field, value });
        self.telemetry.record(TelemetryEvent::UtteranceAccepted {
            stage: self.state.stage,
            source,
        });
        debug!(%field, ?source, "field committed");
    }

    fn advance(&mut self) {
        let from = self.state.stage;
        let Some(to) = from.next() else {
            return;
        };
        self.state.reduce(StateDelta::StageAdvanced(to));
        self.telemetry.record(TelemetryEvent::StageAdvanced { from, to });
        info!(%from, %to, "stage advanced");
    }

    fn fail(&mut self, fx: &mut Vec<SideEffect>, error: Option<ValidationError>) {
        let stage = self.state.stage;
        let attempt = self.state.retry.count + 1;
        let (index, hint) = self.planner.retry_suggestion(stage, attempt);
        self.state.reduce(StateDelta::RetryRecorded { suggestion: index });
        self.telemetry.record(TelemetryEvent::ValidationFailed { stage, attempt });

        if attempt >= self.flow.max_retries {
            warn!(%stage, attempt, "too many failed attempts");
            self.keyboard_fallback(fx, FallbackReason::RetriesExhausted);
            return;
        }

        info!(%stage, attempt, "input not accepted; re-prompting");
        let text = match error {
            Some(e) => format!("{e} {hint}"),
            None => hint.to_string(),
        };
        let resume = self.resume_delay(self.flow.delays.after_reprompt_ms);
        self.speak(fx, text, resume);
    }

    fn reprompt(&mut self, fx: &mut Vec<SideEffect>) {
        self.prompt_current(fx, None);
    }

    fn prompt_current(&mut self, fx: &mut Vec<SideEffect>, prefix: Option<&str>) {
        let prompt = self.planner.prompt(self.state.stage, &self.state.form);
        let text = match prefix {
            Some(p) => format!("{p} {prompt}"),
            None => prompt,
        };
        let resume = self.resume_delay(self.flow.delays.after_prompt_ms);
        self.speak(fx, text, resume);
    }

    fn submit(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.submitting {
            debug!("submission already in flight");
            return;
        }
        for field in Field::ALL {
            if let Err(e) = self.validator.validate(field, self.state.form.get(field)) {
                warn!(%field, "form incomplete at confirmation");
                fx.push(SideEffect::Display {
                    stage: Stage::Confirm,
                    message: format!("{} {}", planner::FAILED, e),
                });
                return;
            }
        }

        self.halt_io(fx);
        self.state.reduce(StateDelta::SubmissionStarted);
        info!("submitting registration");
        fx.push(SideEffect::Display {
            stage: Stage::Confirm,
            message: planner::SUBMITTING.to_string(),
        });
        fx.push(SideEffect::Submit {
            email: self.state.form.email.clone(),
            password: self.state.form.password.clone(),
        });
    }

    fn on_submission(
        &mut self,
        fx: &mut Vec<SideEffect>,
        result: Result<RegisteredUser, SubmissionError>,
    ) {
        if !self.state.submitting {
            debug!("submission result without a pending submission");
            return;
        }
        self.state.reduce(StateDelta::SubmissionSettled);
        self.telemetry.record(TelemetryEvent::SubmissionFinished { success: result.is_ok() });
        if self.state.status.is_terminal() {
            return;
        }

        match result {
            Ok(user) => {
                info!(uid = %user.uid, "registration complete");
                self.finish(fx, FlowStatus::Complete);
                self.speak(fx, planner::COMPLETED.to_string(), None);
                fx.push(SideEffect::FlowEnded(FlowStatus::Complete));
            }
            Err(e) => {
                warn!(error = %e, "registration failed");
                let resume = self.resume_delay(self.flow.delays.after_error_ms);
                self.speak(fx, format!("{} {}", planner::FAILED, e), resume);
            }
        }
    }

    fn cancel_flow(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.status.is_terminal() {
            return;
        }
        // The account may already exist; the registration result decides.
        if self.state.submitting {
            info!("cancel refused while registration is in flight");
            fx.push(SideEffect::Display {
                stage: self.state.stage,
                message: planner::SUBMITTING.to_string(),
            });
            return;
        }
        info!(stage = %self.state.stage, "signup cancelled");
        self.finish(fx, FlowStatus::Cancelled);
        self.speak(fx, planner::CANCELLED.to_string(), None);
        fx.push(SideEffect::FlowEnded(FlowStatus::Cancelled));
    }

    fn finish(&mut self, fx: &mut Vec<SideEffect>, status: FlowStatus) {
        self.halt_io(fx);
        self.state.reduce(StateDelta::FlowEnded(status));
        self.telemetry.record(TelemetryEvent::FlowEnded { status });
    }

    fn keyboard_fallback(&mut self, fx: &mut Vec<SideEffect>, reason: FallbackReason) {
        self.halt_io(fx);
        self.state.reduce(StateDelta::ModeChanged(Mode::Keyboard));
        self.state.reduce(StateDelta::AutoCapture(false));
        self.telemetry.record(TelemetryEvent::KeyboardFallback {
            stage: self.state.stage,
            reason,
        });
        info!(stage = %self.state.stage, ?reason, "switched to keyboard input");
        self.speak(fx, planner::KEYBOARD_FALLBACK.to_string(), None);
    }

    fn switch_to_voice(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.mode == Mode::Voice || self.state.status.is_terminal() {
            return;
        }
        self.state.reduce(StateDelta::ModeChanged(Mode::Voice));
        self.state.reduce(StateDelta::AutoCapture(true));
        self.state.reduce(StateDelta::RetryReset);
        self.recovery.reset();
        info!(stage = %self.state.stage, "switched to voice input");
        if self.state.status == FlowStatus::InProgress {
            self.prompt_current(fx, Some(planner::VOICE_RESUMED));
        }
    }

    fn resume_capture(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.mode != Mode::Voice || self.state.status.is_terminal() {
            return;
        }
        self.recovery.reset();
        self.state.reduce(StateDelta::AutoCapture(true));
        if self.state.can_listen() && self.state.phase != IoPhase::Listening {
            self.start_listening(fx);
        }
    }

    fn dispose(&mut self, fx: &mut Vec<SideEffect>) {
        self.cancel_registry.bump();
        if let Some((id, _)) = self.state.pending_speech {
            self.cancel_registry.cancel_speech(id);
        }
        self.state.reduce(StateDelta::Disposed);
        fx.push(SideEffect::CancelPending);
        fx.push(SideEffect::AbortCapture);
        fx.push(SideEffect::CancelSpeech);
        info!("signup session disposed");
    }

    fn on_capture_failed(&mut self, fx: &mut Vec<SideEffect>, kind: CaptureErrorKind) {
        warn!(code = kind.code(), "capture error");
        self.telemetry.record(TelemetryEvent::CaptureError { kind });
        if self.state.phase == IoPhase::Listening {
            self.state.reduce(StateDelta::PhaseChanged(IoPhase::Idle));
        }
        if self.state.status.is_terminal() {
            return;
        }

        let stage = self.state.stage;
        match self.recovery.on_error(kind) {
            RecoveryAction::RetryAfter(delay_ms) => {
                fx.push(SideEffect::Display {
                    stage,
                    message: kind.to_string(),
                });
                if self.state.can_listen() {
                    self.schedule(fx, delay_ms, TimerKind::RetryCapture);
                }
            }
            RecoveryAction::WaitForManualRestart => {
                self.state.reduce(StateDelta::AutoCapture(false));
                fx.push(SideEffect::Display {
                    stage,
                    message: format!("{} {}", kind, planner::MANUAL_RESTART),
                });
            }
            RecoveryAction::RestartRecommended => {
                self.state.reduce(StateDelta::AutoCapture(false));
                fx.push(SideEffect::Display {
                    stage,
                    message: planner::RESTART_RECOMMENDED.to_string(),
                });
            }
        }
    }

    fn on_capture_ended(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.phase != IoPhase::Listening {
            return;
        }
        self.state.reduce(StateDelta::PhaseChanged(IoPhase::Idle));
        if self.state.can_listen() {
            debug!("capture ended on its own; restarting");
            self.schedule(fx, self.flow.delays.after_prompt_ms, TimerKind::ResumeListening);
        }
    }

    fn on_playback_done(&mut self, fx: &mut Vec<SideEffect>, id: SpeechId) {
        if self.cancel_registry.take_cancelled_speech(id) {
            debug!(speech = id.0, "late report for cancelled playback");
            return;
        }
        match self.state.pending_speech {
            Some((pending, resume)) if pending == id => {
                self.state.reduce(StateDelta::SpeechSettled);
                if let Some(delay_ms) = resume {
                    if self.state.can_listen() {
                        self.state.reduce(StateDelta::PhaseChanged(IoPhase::Settling));
                        self.schedule(fx, delay_ms, TimerKind::ResumeListening);
                    }
                }
            }
            _ => debug!(speech = id.0, "report for unknown playback"),
        }
    }

    fn on_timer(&mut self, fx: &mut Vec<SideEffect>, timer: Timer) {
        if !self.cancel_registry.is_current(&timer) {
            info!(
                "Discarded stale timer: epoch {} vs current {}",
                timer.epoch,
                self.cancel_registry.epoch()
            );
            self.telemetry.record(TelemetryEvent::StaleTimerDiscarded);
            fx.push(SideEffect::Log(format!("stale {:?} timer dropped", timer.kind)));
            return;
        }
        if self.state.can_listen() && self.state.phase != IoPhase::Listening {
            self.start_listening(fx);
        }
    }

    fn start_listening(&mut self, fx: &mut Vec<SideEffect>) {
        self.state.reduce(StateDelta::PhaseChanged(IoPhase::Listening));
        fx.push(SideEffect::StartCapture);
    }

    /// Speaks and shows `text`. Capture is stopped first; after playback the
    /// flow listens again once `resume_after_ms` has passed, if given.
    fn speak(&mut self, fx: &mut Vec<SideEffect>, text: String, resume_after_ms: Option<u64>) {
        if self.state.phase == IoPhase::Listening {
            fx.push(SideEffect::StopCapture);
            self.state.reduce(StateDelta::PhaseChanged(IoPhase::Idle));
        }
        if let Some((previous, _)) = self.state.pending_speech {
            self.cancel_registry.cancel_speech(previous);
            fx.push(SideEffect::CancelSpeech);
        }

        self.next_speech += 1;
        let id = SpeechId(self.next_speech);
        self.state.reduce(StateDelta::SpeechPending { id, resume_after_ms });
        fx.push(SideEffect::Display {
            stage: self.state.stage,
            message: text.clone(),
        });
        fx.push(SideEffect::Speak { id, text });
    }

    /// Stops capture, cuts playback short and invalidates queued timers.
    fn halt_io(&mut self, fx: &mut Vec<SideEffect>) {
        self.cancel_registry.bump();
        fx.push(SideEffect::CancelPending);
        if self.state.phase == IoPhase::Listening {
            fx.push(SideEffect::StopCapture);
        }
        if let Some((id, _)) = self.state.pending_speech {
            self.cancel_registry.cancel_speech(id);
            fx.push(SideEffect::CancelSpeech);
            self.state.reduce(StateDelta::SpeechSettled);
        }
        if matches!(self.state.phase, IoPhase::Listening | IoPhase::Settling) {
            self.state.reduce(StateDelta::PhaseChanged(IoPhase::Idle));
        }
    }

    fn schedule(&self, fx: &mut Vec<SideEffect>, delay_ms: u64, kind: TimerKind) {
        fx.push(SideEffect::Schedule {
            delay_ms,
            timer: Timer::new(kind, self.cancel_registry.epoch()),
        });
    }

    fn resume_delay(&self, delay_ms: u64) -> Option<u64> {
        (self.state.mode == Mode::Voice).then_some(delay_ms)
    }

    fn threshold(&self, field: Field) -> f32 {
        match field {
            Field::Phone => self.flow.phone_threshold,
            _ => self.flow.accept_threshold,
        }
    }
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Start => "Start",
        Event::Utterance(_) => "Utterance",
        Event::Keyboard(_) => "Keyboard",
        Event::CaptureStarted => "CaptureStarted",
        Event::CaptureFailed(_) => "CaptureFailed",
        Event::CaptureEnded => "CaptureEnded",
        Event::PlaybackEnded(_) => "PlaybackEnded",
        Event::PlaybackFailed(_) => "PlaybackFailed",
        Event::SubmissionFinished(_) => "SubmissionFinished",
        Event::TimerFired(_) => "TimerFired",
        Event::SwitchToKeyboard => "SwitchToKeyboard",
        Event::SwitchToVoice => "SwitchToVoice",
        Event::ResumeCapture => "ResumeCapture",
        Event::Dispose => "Dispose",
    }
}
