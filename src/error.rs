use thiserror::Error;

use crate::nlu::types::Field;
use crate::speech::capture::CaptureErrorKind;

/// A value that cannot go into the registration form. Messages are the ones
/// read out to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{}을(를) 입력해주세요.", .field.label())]
    Empty { field: Field },
    #[error("이름은 최소 2자 이상이어야 합니다.")]
    NameTooShort,
    #[error("이름은 {max}자 이하여야 합니다.")]
    NameTooLong { max: usize },
    #[error("이름에는 한글 또는 영문만 사용할 수 있습니다.")]
    NameCharacters,
    #[error("올바른 이메일 형식이 아닙니다.")]
    EmailFormat,
    #[error("비밀번호는 최소 {min}자 이상이어야 합니다.")]
    PasswordTooShort { min: usize },
    #[error("비밀번호는 영문, 숫자, 특수문자를 포함해야 합니다.")]
    PasswordComplexity,
    #[error("올바른 전화번호 형식이 아닙니다.")]
    PhoneFormat,
}

/// Failure reported by the identity service for a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("이미 사용 중인 이메일입니다.")]
    EmailExists,
    #[error("올바른 이메일 형식이 아닙니다.")]
    InvalidEmail,
    #[error("비밀번호가 너무 약합니다.")]
    WeakPassword,
    #[error("요청이 너무 많습니다. 잠시 후 다시 시도해주세요.")]
    TooManyAttempts,
    #[error("입력 정보가 올바르지 않습니다: {0}")]
    Incomplete(ValidationError),
    #[error("회원가입 서비스가 설정되지 않았습니다.")]
    Disabled,
    #[error("회원가입 서비스에 연결할 수 없습니다: {0}")]
    Transport(String),
    #[error("회원가입에 실패했습니다: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for SubmissionError {
    fn from(e: reqwest::Error) -> Self {
        SubmissionError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("speech synthesis is not available")]
    Unavailable,
    #[error("speech synthesis was interrupted")]
    Interrupted,
    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

/// Marketplace listing store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("상품 정보가 올바르지 않습니다: {0}")]
    InvalidListing(String),
    #[error("상품 저장소를 사용할 수 없습니다.")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Capture(#[from] CaptureErrorKind),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error("session event channel closed")]
    ChannelClosed,
}

pub type Result<T, E = SignupError> = std::result::Result<T, E>;
