use std::collections::HashSet;

use super::extractor::FieldExtractor;
use super::types::{Analysis, Entity, Field, Intent, IntentKind};
use crate::kernel::state::Stage;

/// Command words, checked in order; the first hit decides.
const COMMANDS: &[(&str, IntentKind)] = &[
    ("회원가입", IntentKind::StartSignup),
    ("취소", IntentKind::Cancel),
    ("확인", IntentKind::Confirm),
    ("다시", IntentKind::Retry),
];

const DECLINE_WORDS: &[&str] = &["아니오", "아니요", "아니"];
const ACCEPT_WORDS: &[&str] = &["네", "예", "좋아요", "동의"];

fn field_keywords(field: Field) -> &'static [&'static str] {
    match field {
        Field::Name => &["이름", "성함"],
        Field::Email => &["이메일", "메일"],
        Field::Password => &["비밀번호", "패스워드"],
        Field::Phone => &["전화번호", "폰번호", "연락처"],
    }
}

/// Keyword-driven intent detection for the signup dialogue.
///
/// heuristics:
/// - command words win outright
/// - yes/no words only mean something while confirming
/// - two or more detectable field values -> MultiInput
/// - the current stage's own keyword -> Input(field)
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    extractor: FieldExtractor,
}

impl IntentClassifier {
    pub fn new(extractor: FieldExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    pub fn classify(&self, text: &str, stage: Stage) -> Intent {
        self.assess(text, stage).0
    }

    /// Intent plus the entities worth acting on: every field kind for
    /// MultiInput, the current stage's field otherwise.
    pub fn analyze(&self, text: &str, stage: Stage) -> Analysis {
        let (intent, all) = self.assess(text, stage);
        let entities = match (intent.kind, all) {
            (IntentKind::MultiInput, Some(all)) => all,
            _ => stage
                .field()
                .map(|field| self.extractor.extract(text, field.entity_kind()))
                .unwrap_or_default(),
        };
        Analysis { intent, entities }
    }

    /// Returns the `extract_all` result when it was computed, so `analyze`
    /// does not run the detectors twice.
    fn assess(&self, text: &str, stage: Stage) -> (Intent, Option<Vec<Entity>>) {
        let cleaned = self.extractor.normalizer().clean(text);

        if let Some((_, kind)) = COMMANDS.iter().find(|(word, _)| cleaned.contains(word)) {
            return (Intent::new(*kind, 0.9), None);
        }

        if stage == Stage::Confirm {
            if DECLINE_WORDS.iter().any(|w| cleaned.contains(w)) {
                return (Intent::new(IntentKind::Cancel, 0.9), None);
            }
            let accepted = cleaned
                .split_whitespace()
                .map(|token| token.trim_matches(|c: char| c.is_ascii_punctuation()))
                .any(|token| ACCEPT_WORDS.contains(&token));
            if accepted {
                return (Intent::new(IntentKind::Confirm, 0.9), None);
            }
        }

        let all = self.extractor.extract_all(text);
        let kinds: HashSet<_> = all.iter().map(|e| e.kind).collect();
        if kinds.len() >= 2 {
            return (Intent::new(IntentKind::MultiInput, 0.9), Some(all));
        }

        if let Some(field) = stage.field() {
            if field_keywords(field).iter().any(|k| cleaned.contains(k)) {
                return (Intent::new(IntentKind::Input(field), 0.8), Some(all));
            }
        }

        (Intent::unknown(), Some(all))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::types::EntityKind;

    fn kind(text: &str, stage: Stage) -> IntentKind {
        IntentClassifier::default().classify(text, stage).kind
    }

    #[test]
    fn commands_win_in_table_order() {
        assert_eq!(kind("회원가입 할래요", Stage::Name), IntentKind::StartSignup);
        assert_eq!(kind("취소 확인", Stage::Email), IntentKind::Cancel);
        assert_eq!(kind("다시 할게요", Stage::Phone), IntentKind::Retry);
    }

    #[test]
    fn yes_no_only_counts_while_confirming() {
        assert_eq!(kind("아니오", Stage::Confirm), IntentKind::Cancel);
        assert_eq!(kind("네.", Stage::Confirm), IntentKind::Confirm);
        assert_eq!(kind("네 좋아요", Stage::Confirm), IntentKind::Confirm);
        assert_eq!(kind("네", Stage::Name), IntentKind::Unknown);
        // 네 inside another word is not an answer.
        assert_eq!(kind("네이버", Stage::Confirm), IntentKind::Unknown);
    }

    #[test]
    fn multi_field_utterance() {
        let analysis = IntentClassifier::default()
            .analyze("이름은 김철수이고 이메일은 kim@test.com 입니다", Stage::Name);
        assert_eq!(analysis.intent.kind, IntentKind::MultiInput);
        assert_eq!(analysis.intent.confidence, 0.9);
        assert_eq!(analysis.best_for(Field::Name).unwrap().value, "김철수");
        assert_eq!(analysis.best_for(Field::Email).unwrap().value, "kim@test.com");
    }

    #[test]
    fn stage_keyword_means_input() {
        let intent = IntentClassifier::default().classify("제 이메일 주소요", Stage::Email);
        assert_eq!(intent.kind, IntentKind::Input(Field::Email));
        assert_eq!(intent.confidence, 0.8);
        assert_eq!(kind("제 이메일 주소요", Stage::Name), IntentKind::Unknown);
    }

    #[test]
    fn single_field_analysis_uses_current_stage() {
        let analysis = IntentClassifier::default().analyze("010-1234-5678", Stage::Phone);
        assert_eq!(analysis.intent.kind, IntentKind::Unknown);
        assert!(analysis.entities.iter().all(|e| e.kind == EntityKind::Phone));
        assert_eq!(analysis.best_for(Field::Phone).unwrap().value, "01012345678");
    }
}
