use crate::kernel::state::{RegistrationForm, Stage};

pub const WELCOME: &str = "음성 회원가입을 시작합니다.";
pub const KEYBOARD_FALLBACK: &str = "키보드 입력으로 전환하겠습니다.";
pub const VOICE_RESUMED: &str = "음성 입력으로 전환합니다.";
pub const COMPLETED: &str = "회원가입이 완료되었습니다.";
pub const CANCELLED: &str = "회원가입이 취소되었습니다.";
pub const FAILED: &str = "회원가입에 실패했습니다.";
pub const SUBMITTING: &str = "회원가입을 진행하고 있습니다.";
pub const YES_OR_NO: &str = "네 또는 아니오로 답변해주세요.";
pub const MANUAL_RESTART: &str = "마이크 버튼을 눌러 음성 인식을 다시 시작해주세요.";
pub const RESTART_RECOMMENDED: &str = "음성 인식이 계속 중단됩니다. 브라우저를 다시 시작해주세요.";

/// Escalating hints per stage; the n-th failure uses the n-th hint and the
/// last one repeats.
fn suggestions(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Name => &[
            "이름을 명확하게 말씀해주세요.",
            "한글 이름을 천천히 말씀해주세요.",
            "이름을 다시 한 번 말씀해주세요.",
        ],
        Stage::Email => &[
            "이메일을 천천히 말씀해주세요.",
            "골뱅이와 점을 명확히 말씀해주세요.",
            "이메일 주소를 다시 말씀해주세요.",
        ],
        Stage::Password => &[
            "비밀번호를 천천히 말씀해주세요.",
            "숫자와 문자를 명확히 말씀해주세요.",
            "비밀번호를 다시 말씀해주세요.",
        ],
        Stage::Phone => &[
            "전화번호를 천천히 말씀해주세요.",
            "숫자만 말씀해주세요.",
            "전화번호를 다시 말씀해주세요.",
        ],
        Stage::Confirm => &[YES_OR_NO],
    }
}

/// Turns flow decisions into the sentences that get spoken and shown.
#[derive(Debug, Clone, Default)]
pub struct SpeechPlanner;

impl SpeechPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn prompt(&self, stage: Stage, form: &RegistrationForm) -> String {
        match stage {
            Stage::Name => "이름을 말씀해주세요.".to_string(),
            Stage::Email => "이메일을 말씀해주세요.".to_string(),
            Stage::Password => "비밀번호를 말씀해주세요. 최소 6자입니다.".to_string(),
            Stage::Phone => "전화번호를 말씀해주세요.".to_string(),
            Stage::Confirm => self.summary(form),
        }
    }

    /// Read-back before submitting. The password is never read out.
    pub fn summary(&self, form: &RegistrationForm) -> String {
        format!(
            "입력하신 정보를 확인해주세요. 이름 {}, 이메일 {}, 전화번호 {}. \
             맞으면 네, 아니면 아니오라고 말씀해주세요.",
            form.name, form.email, form.phone
        )
    }

    /// Hint for the `attempt`-th failure (1-based) and its index.
    pub fn retry_suggestion(&self, stage: Stage, attempt: u32) -> (usize, &'static str) {
        let hints = suggestions(stage);
        let index = (attempt.saturating_sub(1) as usize).min(hints.len() - 1);
        (index, hints[index])
    }
}
