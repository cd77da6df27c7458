use regex::Regex;
use std::sync::OnceLock;

use super::cached;
use super::types::Field;

/// Spoken token → literal text. Applied longest token first, so compounds
/// such as `지메일` resolve before `지` and `메일` do.
const PHONETIC_TABLE: &[(&str, &str)] = &[
    // Symbols
    ("골뱅이", "@"),
    ("골뱅", "@"),
    ("앳사인", "@"),
    ("앳", "@"),
    ("닷컴", ".com"),
    ("닷", "."),
    ("점", "."),
    ("도트", "."),
    ("언더스코어", "_"),
    ("언더바", "_"),
    ("하이픈", "-"),
    ("대시", "-"),
    // Domains
    ("지메일", "gmail"),
    ("네이버", "naver"),
    ("한메일", "hanmail"),
    ("다음", "daum"),
    ("야후", "yahoo"),
    ("핫메일", "hotmail"),
    ("아웃룩", "outlook"),
    ("메일", "mail"),
    ("컴", "com"),
    ("넷", "net"),
    ("오알지", "org"),
    ("에듀", "edu"),
    // Names that come up often enough to deserve a spelling
    ("제이맨", "jaeman"),
    ("재만", "jaeman"),
    ("재맨", "jaeman"),
    ("제이민", "jaemin"),
    ("재민", "jaemin"),
    ("재현", "jaehyun"),
    ("맨", "man"),
    // Digits
    ("제로", "0"),
    ("공", "0"),
    ("영", "0"),
    ("일", "1"),
    ("원", "1"),
    ("투", "2"),
    ("쓰리", "3"),
    ("삼", "3"),
    ("포", "4"),
    ("사", "4"),
    ("파이브", "5"),
    ("식스", "6"),
    ("육", "6"),
    ("세븐", "7"),
    ("칠", "7"),
    ("에이트", "8"),
    ("에잇", "8"),
    ("팔", "8"),
    ("나인", "9"),
    ("구", "9"),
    // Letters
    ("에이치", "h"),
    ("더블유", "w"),
    ("에이", "a"),
    ("비", "b"),
    ("씨", "c"),
    ("디", "d"),
    ("이", "e"),
    ("에프", "f"),
    ("지", "g"),
    ("아이", "i"),
    ("제이", "j"),
    ("케이", "k"),
    ("엘", "l"),
    ("엠", "m"),
    ("엔", "n"),
    ("오", "o"),
    ("피", "p"),
    ("큐", "q"),
    ("알", "r"),
    ("에스", "s"),
    ("티", "t"),
    ("유", "u"),
    ("브이", "v"),
    ("엑스", "x"),
    ("와이", "y"),
    ("제트", "z"),
];

/// Mis-transcriptions the recognizer is known to produce, fixed after the
/// phonetic table has run.
const GARBLED: &[(&str, &str)] = &[
    ("11daum1daume1", "jae"),
    ("11daum", "jae"),
    ("j2aeman", "jaeman"),
    ("j2aem", "jaem"),
    ("j2aman", "jaman"),
    ("j2ama", "jama"),
    ("jaemanpn", "jaeman"),
    ("jaemapn", "jaeman"),
    ("jaemap", "jaeman"),
    ("jaemam", "jaeman"),
    ("메1.com", "gmail.com"),
    ("메1com", "gmail.com"),
    ("메1", "gmail"),
    ("@2gmailcom", "@gmail.com"),
    ("@gmailcom", "@gmail.com"),
    ("@2g1", "@gmail.com"),
];

/// Copulas and particles glued to the end of a spoken token (`컴이에요`,
/// `컴이고`). Longest first. Left in place they would be spelled out as
/// letters and run into the preceding token.
const TRAILING_PARTICLES: &[&str] =
    &["이에요", "이고요", "입니다", "이고", "이며", "이요", "이야", "예요"];

/// Status phrases the recognizer echoes into transcripts.
const JUNK: &[&str] = &["종료되었습니다", "되었습니다", "종료", "뽀뽀", "뽀"];

/// Spoken Korean digits, used for phone numbers where `이` means two.
const DIGIT_WORDS: &[(char, char)] = &[
    ('공', '0'),
    ('영', '0'),
    ('일', '1'),
    ('이', '2'),
    ('삼', '3'),
    ('사', '4'),
    ('오', '5'),
    ('육', '6'),
    ('칠', '7'),
    ('팔', '8'),
    ('구', '9'),
];

/// Bare domains that get their usual suffix when the speaker stopped at `@name`.
const KNOWN_DOMAINS: &[(&str, &str)] = &[
    ("gmail", "gmail.com"),
    ("naver", "naver.com"),
    ("daum", "daum.net"),
    ("hanmail", "hanmail.net"),
    ("yahoo", "yahoo.com"),
    ("hotmail", "hotmail.com"),
    ("outlook", "outlook.com"),
];

static DUP_COM: OnceLock<Regex> = OnceLock::new();
static DUP_DOT_COM: OnceLock<Regex> = OnceLock::new();
static NAME_LEAD: OnceLock<Regex> = OnceLock::new();
static NAME_TAIL: OnceLock<Regex> = OnceLock::new();

/// Rewrites spoken stand-ins for symbols, letters and digits into literals.
///
/// Best effort only: unknown tokens pass through untouched and nothing is
/// ever rejected here. Field validators are the real gate.
#[derive(Debug, Clone)]
pub struct PhoneticNormalizer {
    table: Vec<(String, String)>,
}

impl Default for PhoneticNormalizer {
    fn default() -> Self {
        Self::with_corrections(Vec::new())
    }
}

impl PhoneticNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in table plus deployment-specific corrections. Extra entries
    /// take part in the same longest-first ordering.
    pub fn with_corrections(extra: Vec<(String, String)>) -> Self {
        let mut table: Vec<(String, String)> = PHONETIC_TABLE
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        table.extend(extra.into_iter().map(|(k, v)| (k.to_lowercase(), v)));
        // Stable sort keeps declaration order among tokens of equal length.
        table.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        Self { table }
    }

    /// Full normalization: junk removal, phonetic substitution, garble fixes
    /// and whitespace collapsing.
    pub fn normalize(&self, raw: &str) -> String {
        let mut text = strip_particles(&strip_junk(&raw.to_lowercase()));

        for (spoken, literal) in &self.table {
            if text.contains(spoken.as_str()) {
                text = text.replace(spoken.as_str(), literal);
            }
        }

        text = collapse_repeated_digits(&text);
        for (garbled, fixed) in GARBLED {
            if text.contains(garbled) {
                text = text.replace(garbled, fixed);
            }
        }
        let text = cached(&DUP_COM, r"(?:com){2,}").replace_all(&text, "com");
        let text = cached(&DUP_DOT_COM, r"(?:\.com){2,}").replace_all(&text, ".com");

        collapse_whitespace(&text)
    }

    /// Light cleanup that keeps Korean keywords intact, for classification.
    pub fn clean(&self, raw: &str) -> String {
        collapse_whitespace(&strip_junk(raw))
    }

    /// The literal value a raw utterance stands for when read as `field`.
    /// Used when extraction found nothing usable.
    pub fn field_value(&self, field: Field, raw: &str) -> String {
        match field {
            Field::Name => name_value(&self.clean(raw)),
            Field::Email => email_value(&self.normalize(raw)),
            Field::Password => password_value(raw),
            Field::Phone => spoken_digits_to_numerals(raw)
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect(),
        }
    }
}

/// Converts spoken Korean digit syllables to numerals and joins digits that
/// were only separated by whitespace (`공 일 공` → `010`).
pub fn spoken_digits_to_numerals(text: &str) -> String {
    let converted: String = text
        .chars()
        .map(|c| {
            DIGIT_WORDS
                .iter()
                .find(|(word, _)| *word == c)
                .map(|(_, digit)| *digit)
                .unwrap_or(c)
        })
        .collect();
    join_spaced_digits(&converted)
}

/// Removes whitespace that sits between two ASCII digits.
pub fn join_spaced_digits(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() && out.chars().last().is_some_and(|p| p.is_ascii_digit()) {
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && chars[j].is_ascii_digit() {
                i = j;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Completes `local@gmail` style addresses with their usual suffix.
pub fn complete_domain(email: &str) -> Option<String> {
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.contains('.') {
        return None;
    }
    KNOWN_DOMAINS
        .iter()
        .find(|(bare, _)| *bare == domain)
        .map(|(_, full)| format!("{local}@{full}"))
}

fn strip_junk(text: &str) -> String {
    let mut out = text.to_string();
    for junk in JUNK {
        if out.contains(junk) {
            out = out.replace(junk, "");
        }
    }
    out
}

fn strip_particles(text: &str) -> String {
    text.split_whitespace()
        .map(|token| {
            let bare = token.trim_end_matches(&['.', ',', '?', '!'][..]);
            TRAILING_PARTICLES
                .iter()
                .find_map(|particle| bare.strip_suffix(particle).filter(|stem| !stem.is_empty()))
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `(\d)\1+` → `$1`; the regex crate has no backreferences.
fn collapse_repeated_digits(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if c.is_ascii_digit() && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn name_value(cleaned: &str) -> String {
    let lead = cached(&NAME_LEAD, r"^(?:제\s*이름은|이름은|성함은|저는)\s*");
    let tail = cached(&NAME_TAIL, r"\s*(?:입니다|이에요|예요|이고요|이고|이야|라고 해요)\.?$");
    let text = lead.replace(cleaned, "");
    let text = tail.replace(&text, "");
    let letters: String = text
        .chars()
        .filter(|c| is_hangul_syllable(*c) || c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    collapse_whitespace(&letters)
}

fn email_value(normalized: &str) -> String {
    let compact: String = normalized
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '%' | '+' | '-'))
        .collect();
    let compact = compact.replace(".@", "@").replace("@.", "@");
    complete_domain(&compact).unwrap_or(compact)
}

fn password_value(raw: &str) -> String {
    raw.replace("비밀번호는", "")
        .replace("패스워드는", "")
        .replace("숫자", "")
        .replace('자', "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

pub(crate) fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelled_email_reduces_to_address() {
        let n = PhoneticNormalizer::new();
        let out = n.normalize("제이 에이 이 맨 골뱅이 지메일 닷 컴");
        assert_eq!(out.replace(' ', ""), "jaeman@gmail.com");
    }

    #[test]
    fn compound_tokens_win_over_parts() {
        let n = PhoneticNormalizer::new();
        assert_eq!(n.normalize("지메일"), "gmail");
        assert_eq!(n.normalize("에이치"), "h");
    }

    #[test]
    fn unknown_text_passes_through() {
        let n = PhoneticNormalizer::new();
        assert_eq!(n.normalize("Hello   World"), "hello world");
    }

    #[test]
    fn junk_and_garbles_are_removed() {
        let n = PhoneticNormalizer::new();
        assert_eq!(n.normalize("kim@test.comcomcom 종료되었습니다"), "kim@test.com");
        assert_eq!(n.normalize("j2aeman"), "jaeman");
        assert_eq!(n.normalize("ab112233"), "ab123");
    }

    #[test]
    fn clean_keeps_korean_keywords() {
        let n = PhoneticNormalizer::new();
        assert_eq!(n.clean("  이름은   김철수 종료 "), "이름은 김철수");
    }

    #[test]
    fn spoken_digits_join_into_a_number() {
        assert_eq!(spoken_digits_to_numerals("공 일 공 일 이 삼 사"), "0101234");
        assert_eq!(join_spaced_digits("010 1234 5678 end"), "01012345678 end");
    }

    #[test]
    fn field_values_follow_the_field() {
        let n = PhoneticNormalizer::new();
        assert_eq!(n.field_value(Field::Name, "이름은 홍길동입니다"), "홍길동");
        assert_eq!(n.field_value(Field::Email, "kim 골뱅이 naver"), "kim@naver.com");
        assert_eq!(n.field_value(Field::Password, "숫자 1 2 3 4 5 6"), "123456");
        assert_eq!(n.field_value(Field::Phone, "공일공 1234 오육칠팔"), "01012345678");
    }

    #[test]
    fn glued_copulas_are_not_spelled_out() {
        let n = PhoneticNormalizer::new();
        assert_eq!(n.normalize("test 닷 컴이에요").replace(' ', ""), "test.com");
        assert_eq!(n.normalize("지메일 닷 컴이고").replace(' ', ""), "gmail.com");
        assert_eq!(n.normalize("네이버 닷 컴입니다.").replace(' ', ""), "naver.com");
        // A bare particle is a spoken letter, not a suffix.
        assert_eq!(n.normalize("이"), "e");
    }

    #[test]
    fn extra_corrections_are_applied() {
        let n =
            PhoneticNormalizer::with_corrections(vec![("케이티".to_string(), "kt".to_string())]);
        assert_eq!(n.normalize("케이티"), "kt");
    }
}
