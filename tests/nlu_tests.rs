use voice_signup::kernel::state::Stage;
use voice_signup::nlu::{
    EntityKind, Field, FieldExtractor, FieldValidator, IntentClassifier, IntentKind,
    PasswordPolicy, PhoneticNormalizer,
};

#[test]
fn test_spoken_addresses_extract_with_high_confidence() {
    let extractor = FieldExtractor::default();
    let validator = FieldValidator::new(PasswordPolicy::default());

    for (spoken, expected) in [
        ("kim@test.com", "kim@test.com"),
        ("제이 에이 이 맨 골뱅이 지메일 닷 컴", "jaeman@gmail.com"),
        ("KIM@Test.COM", "kim@test.com"),
    ] {
        let email = extractor
            .best(spoken, EntityKind::Email)
            .unwrap_or_else(|| panic!("no email in {spoken:?}"));
        assert_eq!(email.value, expected);
        assert!(email.confidence >= 0.9, "{spoken:?} scored {}", email.confidence);
        assert!(validator.is_valid(Field::Email, &email.value));
    }
}

#[test]
fn test_spelled_address_normalizes() {
    let normalized = PhoneticNormalizer::new().normalize("제이 에이 이 맨 골뱅이 지메일 닷 컴");
    assert_eq!(normalized.replace(' ', ""), "jaeman@gmail.com");
}

#[test]
fn test_spoken_phone_number() {
    let phone = FieldExtractor::default()
        .best("공 일 공 일 이 삼 사 오 육 칠 팔", EntityKind::Phone)
        .expect("phone");
    assert_eq!(phone.value, "01012345678");
    assert_eq!(phone.confidence, 0.7);
}

#[test]
fn test_two_field_kinds_mean_multi_input() {
    let classifier = IntentClassifier::default();
    for stage in [Stage::Name, Stage::Email, Stage::Phone] {
        let analysis = classifier.analyze("이름은 김철수이고 이메일은 kim@test.com 입니다", stage);
        assert_eq!(analysis.intent.kind, IntentKind::MultiInput, "at {stage}");
        assert_eq!(analysis.best_for(Field::Name).map(|e| e.value.as_str()), Some("김철수"));
        assert_eq!(analysis.best_for(Field::Email).map(|e| e.value.as_str()), Some("kim@test.com"));
    }

    let analysis =
        classifier.analyze("전화번호는 010-1234-5678 이고 메일은 lee@test.com", Stage::Name);
    assert_eq!(analysis.intent.kind, IntentKind::MultiInput);
    assert_eq!(analysis.best_for(Field::Phone).map(|e| e.value.as_str()), Some("01012345678"));
}

#[test]
fn test_single_kind_is_not_multi_input() {
    let intent = IntentClassifier::default().classify("kim@test.com", Stage::Email);
    assert_ne!(intent.kind, IntentKind::MultiInput);
}

#[test]
fn test_decline_at_confirm_is_cancel() {
    let classifier = IntentClassifier::default();
    for answer in ["아니오", "아니요", "아니 잠깐만요"] {
        assert_eq!(
            classifier.classify(answer, Stage::Confirm).kind,
            IntentKind::Cancel,
            "{answer}"
        );
    }
    assert_eq!(classifier.classify("동의", Stage::Confirm).kind, IntentKind::Confirm);
}

#[test]
fn test_custom_corrections_feed_extraction() {
    let normalizer = PhoneticNormalizer::with_corrections(vec![("케이티".into(), "kt".into())]);
    let extractor = FieldExtractor::new(normalizer);
    let email = extractor.best("케이티 골뱅이 네이버 닷 컴", EntityKind::Email).expect("email");
    assert_eq!(email.value, "kt@naver.com");
}
