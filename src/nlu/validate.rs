use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::cached;
use super::normalizer::is_hangul_syllable;
use super::types::Field;
use crate::error::ValidationError;

const NAME_MAX_CHARS: usize = 20;
const PASSWORD_SPECIALS: &str = "@$!%*?&";

static EMAIL: OnceLock<Regex> = OnceLock::new();
static PHONE: OnceLock<Regex> = OnceLock::new();

pub(crate) const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_len: usize,
    /// Require a letter, a digit and one of `@$!%*?&`.
    pub require_mixed: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_len: 6,
            require_mixed: false,
        }
    }
}

/// The accept/reject gate for every value that reaches the form.
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    password: PasswordPolicy,
}

impl FieldValidator {
    pub fn new(password: PasswordPolicy) -> Self {
        Self { password }
    }

    pub fn validate(&self, field: Field, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        match field {
            Field::Name => validate_name(value),
            Field::Email => {
                let full = format!("^{EMAIL_PATTERN}$");
                if cached(&EMAIL, &full).is_match(value) {
                    Ok(())
                } else {
                    Err(ValidationError::EmailFormat)
                }
            }
            Field::Password => self.validate_password(value),
            Field::Phone => {
                let digits = value.replace('-', "");
                if cached(&PHONE, r"^01[016789][0-9]{7,8}$").is_match(&digits) {
                    Ok(())
                } else {
                    Err(ValidationError::PhoneFormat)
                }
            }
        }
    }

    pub fn is_valid(&self, field: Field, value: &str) -> bool {
        self.validate(field, value).is_ok()
    }

    fn validate_password(&self, value: &str) -> Result<(), ValidationError> {
        if value.chars().count() < self.password.min_len {
            return Err(ValidationError::PasswordTooShort {
                min: self.password.min_len,
            });
        }
        if self.password.require_mixed {
            let letter = value.chars().any(|c| c.is_ascii_alphabetic());
            let digit = value.chars().any(|c| c.is_ascii_digit());
            let special = value.chars().any(|c| PASSWORD_SPECIALS.contains(c));
            if !(letter && digit && special) {
                return Err(ValidationError::PasswordComplexity);
            }
        }
        Ok(())
    }
}

fn validate_name(value: &str) -> Result<(), ValidationError> {
    let count = value.chars().filter(|c| !c.is_whitespace()).count();
    if count < 2 {
        return Err(ValidationError::NameTooShort);
    }
    if count > NAME_MAX_CHARS {
        return Err(ValidationError::NameTooLong { max: NAME_MAX_CHARS });
    }
    let allowed = value
        .chars()
        .all(|c| is_hangul_syllable(c) || c.is_ascii_alphabetic() || c == ' ');
    if allowed {
        Ok(())
    } else {
        Err(ValidationError::NameCharacters)
    }
}
