//! Utterance understanding: spoken-token normalization, field extraction,
//! intent classification and field validation.
//!
//! Everything here is synchronous and side-effect free. The controller in
//! [`crate::kernel::reactor`] decides what to do with the results.

pub mod classifier;
pub mod extractor;
pub mod normalizer;
pub mod types;
pub mod validate;

pub use classifier::IntentClassifier;
pub use extractor::FieldExtractor;
pub use normalizer::PhoneticNormalizer;
pub use types::{Analysis, Entity, EntityKind, Field, Intent, IntentKind};
pub use validate::{FieldValidator, PasswordPolicy};

use regex::Regex;
use std::sync::OnceLock;

/// Compiles a built-in pattern once. Patterns are string literals, so a
/// failure here is a programming error caught by the unit tests.
pub(crate) fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in pattern must compile"))
}
