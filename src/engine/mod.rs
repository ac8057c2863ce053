//! The windowed aggregation engine: recorders, ingestion dispatch and the
//! window evaluator.

pub mod evaluator;
pub mod ingestor;
pub mod recorder;

pub use evaluator::{EvaluatorError, EvaluatorSettings, WindowEvaluator};
pub use ingestor::{EventIngestor, IngestOutcome};
pub use recorder::{Recorder, RecorderError};
