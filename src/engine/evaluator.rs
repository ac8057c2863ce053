//! Periodic evaluation of a trailing call window.
//!
//! Each tick is an independent read → compute → delete transaction. The read
//! and the delete are not atomic as a pair: a recorder still appending to the
//! target bucket between the two loses its write, which is why the target is
//! offset from "now" by a configurable lag.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use thiserror::Error;

use crate::{
    models::{CallEvent, CleanupStatus, EvaluationReport, Outcome, VendorErrorRate},
    persistence::{error::PersistenceError, traits::WindowStore},
    sink::ReportSink,
    window::{VERIFICATION_SET_KEY, WindowKey},
};

/// Errors that abort an evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// Reading window state failed; nothing was computed or deleted.
    #[error("Store error: {0}")]
    Store(#[from] PersistenceError),

    /// The evaluation time does not map to a bucket; nothing was read or deleted.
    #[error("Evaluation time {0} ms is out of range")]
    InvalidTimestamp(i64),
}

/// Tunables for the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorSettings {
    /// Minutes subtracted from "now" to select the target bucket.
    pub lag_minutes: u32,
    /// Error percentage above which a window is a breach.
    pub threshold_percent: u32,
}

/// Computes error rates for the lagged call window and reclaims its state.
pub struct WindowEvaluator<S: WindowStore> {
    store: Arc<S>,
    sink: Arc<dyn ReportSink>,
    settings: EvaluatorSettings,
}

impl<S: WindowStore> WindowEvaluator<S> {
    /// Creates a new evaluator.
    pub fn new(store: Arc<S>, sink: Arc<dyn ReportSink>, settings: EvaluatorSettings) -> Self {
        Self { store, sink, settings }
    }

    /// Evaluates the bucket `lag_minutes` before `now_ms`, emits the report to
    /// the sink, and deletes the evaluated call set and the verification set.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn evaluate(&self, now_ms: i64) -> Result<EvaluationReport, EvaluatorError> {
        let bucket = WindowKey::lagged(now_ms, self.settings.lag_minutes)
            .ok_or(EvaluatorError::InvalidTimestamp(now_ms))?;
        let call_key = bucket.call_set_key();

        let call_records = self.store.members(&call_key).await?;
        let verified_numbers = self.store.members(VERIFICATION_SET_KEY).await?;
        tracing::debug!(
            %bucket,
            calls = call_records.len(),
            verified = verified_numbers.len(),
            "Read window state."
        );

        let mut report = compute_report(
            &bucket,
            &call_records,
            &verified_numbers,
            self.settings.threshold_percent,
        );
        report.cleanup = self.cleanup(&call_key).await;

        if let Err(e) = self.sink.emit(&report).await {
            tracing::error!(error = %e, %bucket, "Failed to emit evaluation report.");
        }

        Ok(report)
    }

    /// Deletes both evaluated keys. Failures are logged and left to TTL expiry.
    async fn cleanup(&self, call_key: &str) -> CleanupStatus {
        let mut status = CleanupStatus::default();

        match self.store.delete(call_key).await {
            Ok(()) => status.call_set_deleted = true,
            Err(e) => tracing::error!(error = %e, key = call_key, "Failed to delete call set."),
        }
        match self.store.delete(VERIFICATION_SET_KEY).await {
            Ok(()) => status.verification_set_deleted = true,
            Err(e) => {
                tracing::error!(error = %e, key = VERIFICATION_SET_KEY, "Failed to delete verification set.")
            }
        }

        status
    }
}

/// Builds the report for one window from the raw set members.
///
/// The aggregate figures use the global difference `calls - |verified|`,
/// while the vendor ranking checks each call's phone number against the
/// verification set. The two are deliberately computed independently and may
/// disagree.
pub fn compute_report(
    bucket: &WindowKey,
    call_records: &[String],
    verified_numbers: &[String],
    threshold_percent: u32,
) -> EvaluationReport {
    let total_calls = call_records.len() as u64;
    let verified_calls = verified_numbers.len() as u64;
    let unverified_calls = total_calls as i64 - verified_calls as i64;

    let mut report = EvaluationReport {
        target_bucket: bucket.to_string(),
        total_calls,
        verified_calls,
        unverified_calls,
        error_percent: None,
        breach: false,
        vendor_ranking: None,
        outcome: Outcome::NoActivity,
        threshold_percent,
        skipped_records: 0,
        cleanup: CleanupStatus::default(),
    };

    if total_calls == 0 {
        return report;
    }

    let error_percent = 100.0 * unverified_calls as f64 / total_calls as f64;
    report.error_percent = Some(error_percent);
    report.breach = error_percent > f64::from(threshold_percent);

    if report.breach {
        report.outcome = Outcome::Breach;
        let verified: HashSet<&str> = verified_numbers.iter().map(String::as_str).collect();
        let (ranking, skipped) = rank_vendors(call_records, &verified);
        report.vendor_ranking = Some(ranking);
        report.skipped_records = skipped;
    } else {
        report.outcome = Outcome::Ok;
    }

    report
}

/// Groups stored call records by vendor and ranks vendors by error rate,
/// worst first. Ties keep the order in which vendors were first seen.
///
/// Returns the ranking and the number of records that could not be parsed.
pub fn rank_vendors(call_records: &[String], verified: &HashSet<&str>) -> (Vec<VendorErrorRate>, u64) {
    let mut ranking: Vec<VendorErrorRate> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0;

    for record in call_records {
        let call = match CallEvent::from_member(record) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(error = %e, record = %record, "Skipping unparsable call record.");
                skipped += 1;
                continue;
            }
        };

        let index = *positions.entry(call.vendor.clone()).or_insert_with(|| {
            ranking.push(VendorErrorRate {
                vendor: call.vendor.clone(),
                total: 0,
                errors: 0,
                error_rate: 0.0,
            });
            ranking.len() - 1
        });
        let entry = &mut ranking[index];
        entry.total += 1;
        if !verified.contains(call.phone_number.as_str()) {
            entry.errors += 1;
        }
    }

    for entry in &mut ranking {
        entry.error_rate = 100.0 * entry.errors as f64 / entry.total as f64;
    }
    ranking.sort_by(|a, b| b.error_rate.total_cmp(&a.error_rate));

    (ranking, skipped)
}
