//! The result of one evaluation tick.

use serde::{Deserialize, Serialize};

/// Classification of an evaluated window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The target bucket held no calls; no threshold check was made.
    NoActivity,
    /// The error percentage is at or below the threshold.
    Ok,
    /// The error percentage exceeds the threshold.
    Breach,
}

/// Error statistics for a single vendor within the evaluated window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorErrorRate {
    /// The vendor name as recorded on the call.
    pub vendor: String,
    /// Number of calls routed to this vendor.
    pub total: u64,
    /// Calls whose phone number is absent from the verification set.
    pub errors: u64,
    /// `100 * errors / total`.
    pub error_rate: f64,
}

/// Whether the explicit cleanup after an evaluation succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupStatus {
    /// The evaluated call set key was deleted.
    pub call_set_deleted: bool,
    /// The verification set key was deleted.
    pub verification_set_deleted: bool,
}

/// The report emitted to the sink after every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    /// The `YYYYMMDDHHmm` bucket that was evaluated.
    pub target_bucket: String,
    /// Calls recorded in the target bucket.
    pub total_calls: u64,
    /// Size of the verification set at evaluation time.
    pub verified_calls: u64,
    /// `total_calls - verified_calls`; negative when more numbers were
    /// verified than calls were made in the bucket.
    pub unverified_calls: i64,
    /// Aggregate error percentage, absent when the window was empty.
    pub error_percent: Option<f64>,
    /// Whether `error_percent` exceeded the threshold.
    pub breach: bool,
    /// Per-vendor ranking, worst first; only computed on a breach.
    pub vendor_ranking: Option<Vec<VendorErrorRate>>,
    /// Classification of this window.
    pub outcome: Outcome,
    /// The threshold the window was compared against.
    pub threshold_percent: u32,
    /// Stored call records that could not be parsed during vendor analysis.
    pub skipped_records: u64,
    /// Result of the post-evaluation deletes.
    pub cleanup: CleanupStatus,
}

impl EvaluationReport {
    /// The vendor with the highest error rate, if a ranking was computed.
    pub fn worst_vendor(&self) -> Option<&VendorErrorRate> {
        self.vendor_ranking.as_ref().and_then(|ranking| ranking.first())
    }
}
