//! Signup telemetry.
//!
//! Telemetry is a read-only side channel. The reactor records into it but
//! never reads it back when deciding what to do.
//!
//! Events never carry user content: no transcripts, no field values. Only
//! stages, counts and error kinds.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::{AcceptSource, FallbackReason, TelemetryEvent};
pub use metrics::{compute_snapshot, TelemetrySnapshot};
pub use recorder::TelemetryRecorder;
