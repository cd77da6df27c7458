use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A form field the signup flow collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Email,
    Password,
    Phone,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Name, Field::Email, Field::Password, Field::Phone];

    pub fn entity_kind(self) -> EntityKind {
        match self {
            Field::Name => EntityKind::Name,
            Field::Email => EntityKind::Email,
            Field::Password => EntityKind::Password,
            Field::Phone => EntityKind::Phone,
        }
    }

    /// Korean label used in prompts and read-backs.
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "이름",
            Field::Email => "이메일",
            Field::Password => "비밀번호",
            Field::Phone => "전화번호",
        }
    }

    /// Parses the console/keyboard spelling of a field.
    pub fn parse(s: &str) -> Option<Field> {
        match s.trim().to_lowercase().as_str() {
            "name" | "이름" => Some(Field::Name),
            "email" | "이메일" => Some(Field::Email),
            "password" | "비밀번호" => Some(Field::Password),
            "phone" | "전화번호" => Some(Field::Phone),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Password => "password",
            Field::Phone => "phone",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Name,
    Email,
    Password,
    Phone,
    Number,
}

impl EntityKind {
    pub fn field(self) -> Option<Field> {
        match self {
            EntityKind::Name => Some(Field::Name),
            EntityKind::Email => Some(Field::Email),
            EntityKind::Password => Some(Field::Password),
            EntityKind::Phone => Some(Field::Phone),
            EntityKind::Number => None,
        }
    }
}

/// One candidate value pulled out of an utterance.
///
/// `span` is a byte range into the source utterance. Matches that only exist
/// after the text was rewritten carry the span of the whole utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub value: String,
    pub confidence: f32, // 0.0 to 1.0
    pub span: Range<usize>,
}

impl Entity {
    pub fn new(
        kind: EntityKind,
        value: impl Into<String>,
        confidence: f32,
        span: Range<usize>,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            confidence,
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentKind {
    StartSignup,
    Input(Field),
    /// One utterance carries answers for several fields.
    MultiInput,
    Confirm,
    Cancel,
    Retry,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub confidence: f32,
}

impl Intent {
    pub fn new(kind: IntentKind, confidence: f32) -> Self {
        Self { kind, confidence }
    }

    pub fn unknown() -> Self {
        Self::new(IntentKind::Unknown, 0.1)
    }
}

/// Intent plus the entities the controller acts on for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub intent: Intent,
    pub entities: Vec<Entity>,
}

impl Analysis {
    /// Highest-confidence entity for `field`; ties keep the earliest match.
    pub fn best_for(&self, field: Field) -> Option<&Entity> {
        best_of(&self.entities, field.entity_kind())
    }
}

pub(crate) fn best_of(entities: &[Entity], kind: EntityKind) -> Option<&Entity> {
    entities
        .iter()
        .filter(|e| e.kind == kind)
        .fold(None, |best: Option<&Entity>, e| match best {
            Some(b) if b.confidence >= e.confidence => Some(b),
            _ => Some(e),
        })
}
