use std::collections::VecDeque;

use voice_signup::error::SubmissionError;
use voice_signup::kernel::event::{Event, KeyboardAction};
use voice_signup::kernel::reactor::SignupReactor;
use voice_signup::kernel::scheduler::{SideEffect, Timer, TimerKind};
use voice_signup::kernel::state::{FlowStatus, IoPhase, Mode, Stage};
use voice_signup::nlu::Field;
use voice_signup::services::RegisteredUser;
use voice_signup::speech::CaptureErrorKind;
use voice_signup::SignupConfig;

/// Drives the reactor like a session would, minus the waiting: playback
/// finishes at once, timers fire at once, capture always starts.
struct Harness {
    reactor: SignupReactor,
    timers: VecDeque<Timer>,
    submissions: usize,
    submission_result: Option<Result<RegisteredUser, SubmissionError>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            reactor: SignupReactor::new(&SignupConfig::default()),
            timers: VecDeque::new(),
            submissions: 0,
            submission_result: None,
        }
    }

    fn started() -> Self {
        let mut h = Self::new();
        h.drive(Event::Start);
        h
    }

    /// Feeds `event` and everything its effects lead to. Returns every
    /// effect produced along the way.
    fn drive(&mut self, event: Event) -> Vec<SideEffect> {
        let mut queue = VecDeque::from([event]);
        let mut seen = Vec::new();
        loop {
            let next = queue.pop_front().or_else(|| self.timers.pop_front().map(Event::TimerFired));
            let Some(event) = next else {
                break;
            };
            for effect in self.reactor.step(event) {
                match &effect {
                    SideEffect::Speak { id, .. } => queue.push_back(Event::PlaybackEnded(*id)),
                    SideEffect::Schedule { timer, .. } => self.timers.push_back(*timer),
                    SideEffect::CancelPending => self.timers.clear(),
                    SideEffect::StartCapture => queue.push_back(Event::CaptureStarted),
                    SideEffect::Submit { email, .. } => {
                        self.submissions += 1;
                        let result = self.submission_result.clone().unwrap_or_else(|| {
                            Ok(RegisteredUser {
                                uid: "uid-1".into(),
                                email: email.clone(),
                                id_token: None,
                            })
                        });
                        queue.push_back(Event::SubmissionFinished(result));
                    }
                    _ => {}
                }
                seen.push(effect);
            }
        }
        seen
    }

    fn say(&mut self, text: &str) -> Vec<SideEffect> {
        self.drive(Event::heard(text))
    }

    fn stage(&self) -> Stage {
        self.reactor.state().stage
    }
}

fn spoken(effects: &[SideEffect]) -> Vec<&str> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Speak { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn starts_capture(effects: &[SideEffect]) -> bool {
    effects.iter().any(|e| matches!(e, SideEffect::StartCapture))
}

#[test]
fn test_start_prompts_for_name_then_listens() {
    let mut h = Harness::new();
    let effects = h.drive(Event::Start);

    let lines = spoken(&effects);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("음성 회원가입을 시작합니다."));
    assert!(lines[0].contains("이름을 말씀해주세요."));

    let speak_at = effects.iter().position(|e| matches!(e, SideEffect::Speak { .. })).unwrap();
    let capture_at = effects.iter().position(|e| matches!(e, SideEffect::StartCapture)).unwrap();
    assert!(speak_at < capture_at, "capture must wait for the prompt to finish");
    assert_eq!(h.reactor.state().phase, IoPhase::Listening);
    assert_eq!(h.reactor.state().status, FlowStatus::InProgress);
}

#[test]
fn test_capture_is_stopped_before_speaking() {
    let mut h = Harness::started();
    let effects = h.say("이름은 홍길동입니다");

    let stop_at = effects.iter().position(|e| matches!(e, SideEffect::StopCapture)).unwrap();
    let speak_at = effects.iter().position(|e| matches!(e, SideEffect::Speak { .. })).unwrap();
    assert!(stop_at < speak_at);
    assert_eq!(h.reactor.state().form.name, "홍길동");
    assert_eq!(h.stage(), Stage::Email);
}

#[test]
fn test_multi_input_fills_name_and_email() {
    let mut h = Harness::started();
    h.say("이름은 김철수이고 이메일은 kim@test.com 입니다");

    let form = &h.reactor.state().form;
    assert_eq!(form.name, "김철수");
    assert_eq!(form.email, "kim@test.com");
    assert_eq!(h.stage(), Stage::Password);
}

#[test]
fn test_spoken_email_is_committed() {
    let mut h = Harness::started();
    h.say("이름은 이재만입니다");
    assert_eq!(h.stage(), Stage::Email);

    h.say("제이 에이 이 맨 골뱅이 지메일 닷 컴");
    assert_eq!(h.reactor.state().form.email, "jaeman@gmail.com");
    assert_eq!(h.stage(), Stage::Password);
}

#[test]
fn test_full_voice_flow_submits_once() {
    let mut h = Harness::started();
    h.say("이름은 김철수이고 이메일은 kim@test.com 입니다");
    h.say("비밀번호는 987654");
    assert_eq!(h.stage(), Stage::Phone);

    let effects = h.say("공 일 공 일 이 삼 사 오 육 칠 팔");
    assert_eq!(h.reactor.state().form.phone, "01012345678");
    assert_eq!(h.stage(), Stage::Confirm);
    let summary = spoken(&effects).join(" ");
    assert!(summary.contains("kim@test.com"));
    assert!(!summary.contains("987654"), "password must not be read back");

    let effects = h.say("네");
    assert_eq!(h.submissions, 1);
    assert_eq!(h.reactor.state().status, FlowStatus::Complete);
    assert!(effects.contains(&SideEffect::FlowEnded(FlowStatus::Complete)));
    assert!(spoken(&effects).contains(&"회원가입이 완료되었습니다."));
    assert!(!starts_capture(&effects), "no capture after completion");
}

#[test]
fn test_decline_at_confirm_cancels_without_registering() {
    let mut h = Harness::started();
    h.say("이름은 김철수이고 이메일은 kim@test.com 입니다");
    h.say("비밀번호는 123456");
    h.say("010-1234-5678");
    assert_eq!(h.stage(), Stage::Confirm);

    let effects = h.say("아니오");
    assert_eq!(h.reactor.state().status, FlowStatus::Cancelled);
    assert_eq!(h.submissions, 0);
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::Submit { .. })));
    assert!(effects.contains(&SideEffect::FlowEnded(FlowStatus::Cancelled)));
}

#[test]
fn test_other_answers_at_confirm_ask_again() {
    let mut h = Harness::started();
    h.say("이름은 김철수이고 이메일은 kim@test.com 입니다");
    h.say("비밀번호는 123456");
    h.say("010-1234-5678");

    let effects = h.say("글쎄요");
    assert_eq!(spoken(&effects), vec!["네 또는 아니오로 답변해주세요."]);
    assert_eq!(h.stage(), Stage::Confirm);
    assert_eq!(h.reactor.state().retry.count, 0);
}

#[test]
fn test_invalid_value_is_never_committed() {
    let mut h = Harness::started();
    h.say("이름은 홍길동입니다");

    let effects = h.say("잘 모르겠어요");
    assert_eq!(h.stage(), Stage::Email);
    assert_eq!(h.reactor.state().form.email, "");
    assert_eq!(h.reactor.state().retry.count, 1);
    assert!(spoken(&effects)[0].contains("이메일을 천천히 말씀해주세요."));
}

#[test]
fn test_retry_count_grows_within_stage_and_resets_on_advance() {
    let mut h = Harness::started();
    h.say("이름은 홍길동입니다");

    h.say("잘 모르겠어요");
    assert_eq!(h.reactor.state().retry.count, 1);
    h.say("음");
    assert_eq!(h.reactor.state().retry.count, 2);
    assert_eq!(h.reactor.state().retry.last_suggestion_index, Some(1));

    h.say("hong@test.com");
    assert_eq!(h.stage(), Stage::Password);
    assert_eq!(h.reactor.state().retry.count, 0);
    assert_eq!(h.reactor.state().retry.last_suggestion_index, None);
}

#[test]
fn test_third_failure_switches_to_keyboard() {
    let mut h = Harness::started();
    h.say("이름은 홍길동입니다");
    h.say("잘 모르겠어요");
    h.say("음");
    let effects = h.say("어");

    let state = h.reactor.state();
    assert_eq!(state.mode, Mode::Keyboard);
    assert!(!state.auto_capture);
    assert!(spoken(&effects).contains(&"키보드 입력으로 전환하겠습니다."));
    assert!(!starts_capture(&effects), "keyboard mode must not restart capture");

    // Speech is ignored from here on.
    let effects = h.say("hong@test.com");
    assert_eq!(h.reactor.state().form.email, "");
    assert!(!starts_capture(&effects));
}

#[test]
fn test_keyboard_flow_completes() {
    let mut h = Harness::started();
    h.drive(Event::SwitchToKeyboard);
    assert_eq!(h.reactor.state().mode, Mode::Keyboard);

    for (field, value) in [
        (Field::Name, "홍길동"),
        (Field::Email, "hong@test.com"),
        (Field::Password, "abc123"),
        (Field::Phone, "010-9876-5432"),
    ] {
        h.drive(Event::Keyboard(KeyboardAction::Edit {
            field,
            value: value.into(),
        }));
        let effects = h.drive(Event::Keyboard(KeyboardAction::Next));
        assert!(!starts_capture(&effects));
    }
    assert_eq!(h.stage(), Stage::Confirm);

    h.drive(Event::Keyboard(KeyboardAction::Confirm));
    assert_eq!(h.submissions, 1);
    assert_eq!(h.reactor.state().status, FlowStatus::Complete);
}

#[test]
fn test_keyboard_next_rejects_invalid_value() {
    let mut h = Harness::started();
    h.drive(Event::SwitchToKeyboard);
    h.drive(Event::Keyboard(KeyboardAction::Edit {
        field: Field::Name,
        value: "홍".into(),
    }));
    let effects = h.drive(Event::Keyboard(KeyboardAction::Next));

    assert_eq!(h.stage(), Stage::Name);
    assert!(effects.iter().any(|e| matches!(
        e,
        SideEffect::Display { message, .. } if message == "이름은 최소 2자 이상이어야 합니다."
    )));
}

#[test]
fn test_switch_back_to_voice_reprompts_and_listens() {
    let mut h = Harness::started();
    h.drive(Event::SwitchToKeyboard);
    let effects = h.drive(Event::SwitchToVoice);

    assert_eq!(h.reactor.state().mode, Mode::Voice);
    assert!(spoken(&effects)[0].starts_with("음성 입력으로 전환합니다."));
    assert!(starts_capture(&effects));
}

#[test]
fn test_failed_submission_stays_on_confirm() {
    let mut h = Harness::started();
    h.submission_result = Some(Err(SubmissionError::EmailExists));
    h.say("이름은 김철수이고 이메일은 kim@test.com 입니다");
    h.say("비밀번호는 123456");
    h.say("010-1234-5678");

    let effects = h.say("네");
    let state = h.reactor.state();
    assert_eq!(state.status, FlowStatus::InProgress);
    assert_eq!(state.stage, Stage::Confirm);
    assert!(!state.submitting);
    assert!(spoken(&effects)[0].contains("이미 사용 중인 이메일입니다."));
    assert!(starts_capture(&effects), "listens again for another answer");
}

#[test]
fn test_cancel_is_refused_while_registering() {
    let mut reactor = SignupReactor::new(&SignupConfig::default());
    reactor.step(Event::Start);
    reactor.step(Event::SwitchToKeyboard);
    for (field, value) in [
        (Field::Name, "홍길동"),
        (Field::Email, "hong@test.com"),
        (Field::Password, "abc123"),
        (Field::Phone, "01098765432"),
    ] {
        reactor.step(Event::Keyboard(KeyboardAction::Edit {
            field,
            value: value.into(),
        }));
        reactor.step(Event::Keyboard(KeyboardAction::Next));
    }
    reactor.step(Event::Keyboard(KeyboardAction::Confirm));
    assert!(reactor.state().submitting);

    let effects = reactor.step(Event::Keyboard(KeyboardAction::Cancel));
    assert_eq!(reactor.state().status, FlowStatus::InProgress);
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::FlowEnded(_))));
    assert!(effects.iter().any(|e| matches!(
        e,
        SideEffect::Display { message, .. } if message == "회원가입을 진행하고 있습니다."
    )));

    let effects = reactor.step(Event::SubmissionFinished(Ok(RegisteredUser {
        uid: "uid-1".into(),
        email: "hong@test.com".into(),
        id_token: None,
    })));
    assert_eq!(reactor.state().status, FlowStatus::Complete);
    assert!(effects.contains(&SideEffect::FlowEnded(FlowStatus::Complete)));
}

#[test]
fn test_submission_is_not_repeated_while_in_flight() {
    let mut reactor = SignupReactor::new(&SignupConfig::default());
    reactor.step(Event::Start);
    reactor.step(Event::SwitchToKeyboard);
    for (field, value) in [
        (Field::Name, "홍길동"),
        (Field::Email, "hong@test.com"),
        (Field::Password, "abc123"),
        (Field::Phone, "01098765432"),
    ] {
        reactor.step(Event::Keyboard(KeyboardAction::Edit {
            field,
            value: value.into(),
        }));
        reactor.step(Event::Keyboard(KeyboardAction::Next));
    }

    let first = reactor.step(Event::Keyboard(KeyboardAction::Confirm));
    let second = reactor.step(Event::Keyboard(KeyboardAction::Confirm));
    assert!(first.iter().any(|e| matches!(e, SideEffect::Submit { .. })));
    assert!(!second.iter().any(|e| matches!(e, SideEffect::Submit { .. })));
}

#[test]
fn test_stale_timer_is_discarded() {
    let mut reactor = SignupReactor::new(&SignupConfig::default());
    let effects = reactor.step(Event::Start);
    let id = effects
        .iter()
        .find_map(|e| match e {
            SideEffect::Speak { id, .. } => Some(*id),
            _ => None,
        })
        .unwrap();

    let effects = reactor.step(Event::PlaybackEnded(id));
    let timer = effects
        .iter()
        .find_map(|e| match e {
            SideEffect::Schedule { timer, .. } => Some(*timer),
            _ => None,
        })
        .unwrap();
    assert_eq!(timer.kind, TimerKind::ResumeListening);

    // Switching modes invalidates everything queued before it.
    reactor.step(Event::SwitchToKeyboard);
    reactor.step(Event::SwitchToVoice);
    assert!(reactor.epoch() > timer.epoch);

    let effects = reactor.step(Event::TimerFired(timer));
    assert!(!starts_capture(&effects));
    assert!(effects.iter().any(|e| matches!(e, SideEffect::Log(_))));
    assert_eq!(reactor.telemetry().snapshot().stale_timers, 1);
}

#[test]
fn test_utterance_during_playback_is_dropped() {
    let mut reactor = SignupReactor::new(&SignupConfig::default());
    reactor.step(Event::Start);
    assert!(reactor.state().pending_speech.is_some());

    reactor.step(Event::heard("이름은 홍길동입니다"));
    assert_eq!(reactor.state().form.name, "");
    assert_eq!(reactor.state().stage, Stage::Name);
}

#[test]
fn test_interim_results_are_only_shown() {
    let mut h = Harness::started();
    let interim = voice_signup::kernel::event::Utterance::interim("이름은 홍");
    let effects = h.drive(Event::Utterance(interim));
    assert_eq!(
        effects,
        vec![SideEffect::ShowTranscript {
            text: "이름은 홍".into(),
            is_final: false
        }]
    );
    assert_eq!(h.reactor.state().form.name, "");
}

#[test]
fn test_cancel_command_mid_flow() {
    let mut h = Harness::started();
    h.say("이름은 홍길동입니다");
    let effects = h.say("취소할게요");

    assert_eq!(h.reactor.state().status, FlowStatus::Cancelled);
    assert_eq!(spoken(&effects), vec!["회원가입이 취소되었습니다."]);
    assert!(!starts_capture(&effects));
}

#[test]
fn test_transient_capture_errors_back_off_then_wait() {
    let mut reactor = SignupReactor::new(&SignupConfig::default());
    reactor.step(Event::Start);

    let delays: Vec<u64> = (0..3)
        .map(|_| {
            reactor
                .step(Event::CaptureFailed(CaptureErrorKind::NoSpeech))
                .iter()
                .find_map(|e| match e {
                    SideEffect::Schedule { delay_ms, .. } => Some(*delay_ms),
                    _ => None,
                })
                .unwrap_or(0)
        })
        .collect();
    // Playback is still pending, so nothing is scheduled yet.
    assert_eq!(delays, vec![0, 0, 0]);

    let mut h = Harness::started();
    let mut scheduled = Vec::new();
    for _ in 0..3 {
        let effects = h.reactor.step(Event::CaptureFailed(CaptureErrorKind::NoSpeech));
        scheduled.extend(effects.iter().filter_map(|e| match e {
            SideEffect::Schedule { delay_ms, timer } if timer.kind == TimerKind::RetryCapture => {
                Some(*delay_ms)
            }
            _ => None,
        }));
    }
    assert_eq!(scheduled, vec![1000, 2000, 3000]);

    let effects = h.reactor.step(Event::CaptureFailed(CaptureErrorKind::NoSpeech));
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::Schedule { .. })));
    assert!(!h.reactor.state().auto_capture);

    let effects = h.drive(Event::ResumeCapture);
    assert!(starts_capture(&effects));
}

#[test]
fn test_permission_error_needs_manual_restart() {
    let mut h = Harness::started();
    let effects = h.drive(Event::CaptureFailed(CaptureErrorKind::NotAllowed));

    assert!(!starts_capture(&effects));
    assert!(effects.iter().any(|e| matches!(
        e,
        SideEffect::Display { message, .. } if message.contains("마이크 권한이 거부되었습니다.")
    )));
    assert_eq!(h.reactor.telemetry().snapshot().capture_errors[&CaptureErrorKind::NotAllowed], 1);
}

#[test]
fn test_dispose_stops_everything() {
    let mut h = Harness::started();
    let effects = h.drive(Event::Dispose);
    assert!(effects.contains(&SideEffect::CancelPending));
    assert!(effects.contains(&SideEffect::AbortCapture));
    assert!(!effects.contains(&SideEffect::StopCapture));
    assert!(effects.contains(&SideEffect::CancelSpeech));

    assert!(h.reactor.step(Event::heard("이름은 홍길동입니다")).is_empty());
    assert!(h.reactor.step(Event::Start).is_empty());
}
