//! Destinations for evaluation reports.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::models::{EvaluationReport, Outcome};

/// Errors that can occur while emitting a report.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The report could not be encoded.
    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),

    /// The underlying writer failed.
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives every report produced by the evaluator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Emits a single report.
    async fn emit(&self, report: &EvaluationReport) -> Result<(), SinkError>;
}

/// Emits reports as structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn emit(&self, report: &EvaluationReport) -> Result<(), SinkError> {
        let bucket = report.target_bucket.as_str();
        match report.outcome {
            Outcome::NoActivity => {
                tracing::info!(bucket, "No SMS calls recorded in the processing interval.");
            }
            Outcome::Ok => {
                tracing::info!(
                    bucket,
                    total_calls = report.total_calls,
                    verified_calls = report.verified_calls,
                    error_percent = report.error_percent,
                    threshold_percent = report.threshold_percent,
                    "Error percentage ({:.2}%) is within acceptable range.",
                    report.error_percent.unwrap_or_default()
                );
            }
            Outcome::Breach => {
                tracing::warn!(
                    bucket,
                    total_calls = report.total_calls,
                    verified_calls = report.verified_calls,
                    error_percent = report.error_percent,
                    threshold_percent = report.threshold_percent,
                    worst_vendor = report.worst_vendor().map(|v| v.vendor.as_str()),
                    "Error percentage ({:.2}%) exceeds threshold of {}%.",
                    report.error_percent.unwrap_or_default(),
                    report.threshold_percent
                );
                for (rank, entry) in report.vendor_ranking.iter().flatten().enumerate() {
                    tracing::info!(
                        bucket,
                        rank = rank + 1,
                        vendor = %entry.vendor,
                        total = entry.total,
                        errors = entry.errors,
                        error_rate = entry.error_rate,
                        "Vendor error rate."
                    );
                }
            }
        }
        if report.skipped_records > 0 {
            tracing::warn!(bucket, skipped = report.skipped_records, "Unparsable call records were skipped.");
        }
        Ok(())
    }
}

/// Writes each report as one JSON line.
pub struct JsonSink<W> {
    writer: Mutex<W>,
}

impl JsonSink<tokio::io::Stdout> {
    /// A sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> JsonSink<W> {
    /// A sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ReportSink for JsonSink<W> {
    async fn emit(&self, report: &EvaluationReport) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(report)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Forwards every report to several sinks; a failing sink does not stop
/// the others.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl FanoutSink {
    /// Creates a sink forwarding to `sinks` in order.
    pub fn new(sinks: Vec<Arc<dyn ReportSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ReportSink for FanoutSink {
    async fn emit(&self, report: &EvaluationReport) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(report).await {
                tracing::error!(error = %e, "Report sink failed.");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
