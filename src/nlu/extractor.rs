use regex::{Match, Regex};
use std::ops::Range;
use std::sync::OnceLock;

use super::cached;
use super::normalizer::{
    complete_domain, join_spaced_digits, spoken_digits_to_numerals, PhoneticNormalizer,
};
use super::types::{best_of, Entity, EntityKind};
use super::validate::EMAIL_PATTERN;

/// Known names and the ways the recognizer mangles them, longest first.
const NAME_ALIASES: &[(&str, &str)] = &[
    ("jaeman", "이재만"),
    ("e제10", "이재만"),
    ("e재10", "이재만"),
    ("이재만", "이재만"),
    ("이제만", "이재만"),
    ("이민수", "이민수"),
    ("재만", "이재만"),
];

static NAME_PHRASE: OnceLock<Regex> = OnceLock::new();
static EMAIL_STRICT: OnceLock<Regex> = OnceLock::new();
static EMAIL_SPOKEN: OnceLock<Regex> = OnceLock::new();
static EMAIL_SPLIT_DIGITS: OnceLock<Regex> = OnceLock::new();
static EMAIL_BARE_DOMAIN: OnceLock<Regex> = OnceLock::new();
static EMAIL_FLEXIBLE: OnceLock<Regex> = OnceLock::new();
static PHONE: OnceLock<Regex> = OnceLock::new();
static PHONE_PARTIAL: OnceLock<Regex> = OnceLock::new();
static MOBILE: OnceLock<Regex> = OnceLock::new();
static PASSWORD_PHRASE: OnceLock<Regex> = OnceLock::new();
static PASSWORD_DIGITS: OnceLock<Regex> = OnceLock::new();
static NUMBER: OnceLock<Regex> = OnceLock::new();
static FIELD_KEYWORD: OnceLock<Regex> = OnceLock::new();

/// Pulls typed candidates out of an utterance.
///
/// Each kind is tried with its most specific rule first; looser rules only
/// run when the stricter ones found nothing. Callers pick the best candidate
/// and run it through the field validator.
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    normalizer: PhoneticNormalizer,
}

impl FieldExtractor {
    pub fn new(normalizer: PhoneticNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &PhoneticNormalizer {
        &self.normalizer
    }

    pub fn extract(&self, text: &str, kind: EntityKind) -> Vec<Entity> {
        match kind {
            EntityKind::Name => self.names(text),
            EntityKind::Email => self.emails(text),
            EntityKind::Phone => phones(text),
            EntityKind::Password => passwords(text),
            EntityKind::Number => numbers(text),
        }
    }

    pub fn best(&self, text: &str, kind: EntityKind) -> Option<Entity> {
        best_of(&self.extract(text, kind), kind).cloned()
    }

    /// Every field kind against one utterance.
    ///
    /// Digit runs that belong to an email or phone candidate are not offered
    /// as passwords, and known names spelled inside an address are not
    /// offered as names.
    pub fn extract_all(&self, text: &str) -> Vec<Entity> {
        let emails = self.emails(text);
        let phones = phones(text);
        let lower = text.to_ascii_lowercase();

        let names = self.names(text).into_iter().filter(|n| {
            let spoken = lower.get(n.span.clone()).unwrap_or_default();
            spoken.is_empty() || !emails.iter().any(|e| e.value.contains(spoken))
        });
        let passwords = passwords(text).into_iter().filter(|p| {
            !emails
                .iter()
                .chain(phones.iter())
                .any(|other| other.value.contains(p.value.as_str()))
        });

        let mut all: Vec<Entity> = names.collect();
        all.extend(emails.iter().cloned());
        all.extend(passwords);
        all.extend(phones);
        all
    }

    fn names(&self, text: &str) -> Vec<Entity> {
        let lower = text.to_ascii_lowercase();
        if let Some((pos, alias, canonical)) = NAME_ALIASES
            .iter()
            .find_map(|(alias, canonical)| lower.find(alias).map(|pos| (pos, *alias, *canonical)))
        {
            return vec![Entity::new(EntityKind::Name, canonical, 0.9, pos..pos + alias.len())];
        }

        let phrase = cached(
            &NAME_PHRASE,
            concat!(
                r"(?:제\s*이름은|이름은|성함은)\s*([가-힣]{2,4}?)",
                r"(?:이고|이며|입니다|이에요|예요|이야|\s|,|\.|$)",
            ),
        );
        phrase
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| vec![Entity::new(EntityKind::Name, m.as_str(), 0.8, m.range())])
            .unwrap_or_default()
    }

    fn emails(&self, text: &str) -> Vec<Entity> {
        let lower = text.to_ascii_lowercase();
        let whole = 0..text.len();
        let strict = cached(&EMAIL_STRICT, EMAIL_PATTERN);

        let mut out: Vec<Entity> = strict
            .find_iter(&lower)
            .map(|m| Entity::new(EntityKind::Email, m.as_str(), 0.9, m.range()))
            .collect();
        if !out.is_empty() {
            return out;
        }

        // Each clause is normalized on its own so the spelled-out start of
        // the next field cannot run into the address.
        let compact: Vec<String> = clauses(text)
            .map(|clause| self.normalizer.normalize(clause).replace(' ', ""))
            .collect();
        out.extend(compact.iter().flat_map(|clause| {
            strict
                .find_iter(clause)
                .map(|m| Entity::new(EntityKind::Email, m.as_str(), 0.9, whole.clone()))
                .collect::<Vec<_>>()
        }));
        if !out.is_empty() {
            return out;
        }

        let spoken = cached(
            &EMAIL_SPOKEN,
            r"(?:이메일은|메일은)\s*(.+?)\s*(?:골뱅이|@)\s*(.+?)\s*(?:닷|점|\.)\s*(\S+)",
        );
        if let Some(caps) = spoken.captures(&lower) {
            let part = |i: usize| {
                caps.get(i)
                    .map(|m| self.normalizer.normalize(m.as_str()).replace(' ', ""))
                    .unwrap_or_default()
            };
            let candidate = format!("{}@{}.{}", part(1), part(2), part(3));
            if is_email(&candidate) {
                return vec![email_from(candidate, 0.8, caps.get(0))];
            }
        }

        let split = cached(
            &EMAIL_SPLIT_DIGITS,
            r"([a-z0-9._%+-]+)\s+([0-9]+)\s*@\s*([a-z0-9.-]+)\s*\.\s*([a-z]{2,})",
        );
        if let Some(caps) = split.captures(&lower) {
            let candidate = format!("{}{}@{}.{}", &caps[1], &caps[2], &caps[3], &caps[4]);
            return vec![email_from(candidate, 0.7, caps.get(0))];
        }

        let bare = cached(&EMAIL_BARE_DOMAIN, r"[a-z0-9._%+-]+@[a-z0-9-]+");
        let completed = compact
            .iter()
            .find_map(|clause| bare.find_iter(clause).find_map(|m| complete_domain(m.as_str())));
        if let Some(full) = completed {
            return vec![Entity::new(EntityKind::Email, full, 0.7, whole)];
        }

        let flexible = cached(
            &EMAIL_FLEXIBLE,
            r"([a-z0-9._%+-]+)\s*@\s*([a-z0-9.-]+)\s*\.\s*([a-z]{2,})",
        );
        if let Some(caps) = flexible.captures(&lower) {
            let candidate = format!("{}@{}.{}", &caps[1], &caps[2], &caps[3]);
            return vec![email_from(candidate, 0.6, caps.get(0))];
        }

        out
    }
}

/// Splits an utterance before every other-field keyword.
fn clauses(text: &str) -> impl Iterator<Item = &str> {
    let keywords = cached(
        &FIELD_KEYWORD,
        r"비밀번호|패스워드|전화번호|폰번호|연락처|이름은|성함은",
    );
    let mut cuts: Vec<usize> = keywords.find_iter(text).map(|m| m.start()).collect();
    cuts.insert(0, 0);
    cuts.push(text.len());
    cuts.dedup();
    let pieces: Vec<&str> = cuts.windows(2).map(|w| &text[w[0]..w[1]]).collect();
    pieces.into_iter()
}

fn email_from(value: String, confidence: f32, m: Option<Match<'_>>) -> Entity {
    let span = m.map(|m| m.range()).unwrap_or(0..0);
    Entity::new(EntityKind::Email, value, confidence, span)
}

fn is_email(candidate: &str) -> bool {
    cached(&EMAIL_STRICT, EMAIL_PATTERN)
        .find(candidate)
        .is_some_and(|m| m.range() == (0..candidate.len()))
}

fn is_mobile(digits: &str) -> bool {
    cached(&MOBILE, r"^01[016789][0-9]{7,8}$").is_match(digits)
}

fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn phone_matches(text: &str, confidence: f32, span: Option<Range<usize>>) -> Vec<Entity> {
    let pattern = cached(&PHONE, r"([0-9]{3})[-.\s]?([0-9]{3,4})[-.\s]?([0-9]{4})");
    pattern
        .find_iter(text)
        .filter_map(|m| {
            let digits = digits_only(m.as_str());
            is_mobile(&digits).then(|| {
                let span = span.clone().unwrap_or_else(|| m.range());
                Entity::new(EntityKind::Phone, digits, confidence, span)
            })
        })
        .collect()
}

fn phones(text: &str) -> Vec<Entity> {
    let literal = phone_matches(text, 0.9, None);
    if !literal.is_empty() {
        return literal;
    }

    if !text.chars().any(|c| c.is_ascii_digit()) {
        let converted = spoken_digits_to_numerals(text);
        return phone_matches(&converted, 0.7, Some(0..text.len()));
    }

    // "0105689 공팔영영": a typed-looking prefix followed by spoken digits.
    let partial = cached(
        &PHONE_PARTIAL,
        r"([0-9][0-9\s-]*[0-9])\s*([공영일이삼사오육칠팔구](?:\s*[공영일이삼사오육칠팔구])*)",
    );
    partial
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let digits = digits_only(&caps[1]) + &digits_only(&spoken_digits_to_numerals(&caps[2]));
            is_mobile(&digits).then(|| Entity::new(EntityKind::Phone, digits, 0.6, whole.range()))
        })
        .collect()
}

fn passwords(text: &str) -> Vec<Entity> {
    let rewritten = join_spaced_digits(&text.replace("숫자", "").replace('자', ""));
    let exact = rewritten == text;
    let span_of = |m: Match<'_>| if exact { m.range() } else { 0..text.len() };

    let phrase = cached(&PASSWORD_PHRASE, r"(?:비밀번호는|패스워드는)\s*([0-9]{6,})");
    if let Some(m) = phrase.captures(&rewritten).and_then(|caps| caps.get(1)) {
        return vec![Entity::new(EntityKind::Password, m.as_str(), 0.8, span_of(m))];
    }

    let digits = cached(&PASSWORD_DIGITS, r"[0-9]{6,}");
    digits
        .find(&rewritten)
        .map(|m| vec![Entity::new(EntityKind::Password, m.as_str(), 0.7, span_of(m))])
        .unwrap_or_default()
}

fn numbers(text: &str) -> Vec<Entity> {
    cached(&NUMBER, r"[0-9]+")
        .find_iter(text)
        .map(|m| Entity::new(EntityKind::Number, m.as_str(), 0.5, m.range()))
        .collect()
}
