//! Data models shared by the recorders, the evaluator and the report sinks.

pub mod event;
pub mod report;

pub use event::{CallEvent, EventEnvelope, EventKind, VerificationEvent};
pub use report::{CleanupStatus, EvaluationReport, Outcome, VendorErrorRate};
