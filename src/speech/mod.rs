//! Speech capture and synthesis seams. Backends live behind these traits;
//! the console ones are in [`crate::outputs::console`].

pub mod capture;
pub mod synthesis;

pub use capture::{
    CaptureErrorKind, CaptureOptions, CaptureRecovery, RecoveryAction, RetryPolicy, SpeechCapture,
};
pub use synthesis::{select_voice, SpeechSynthesizer, SynthesisRequest, SynthesisSettings, Voice};
