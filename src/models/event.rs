//! Inbound events and their canonical stored form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Detail type emitted when a vendor is asked to send an SMS.
pub const SMS_VENDOR_CALL: &str = "SMS Vendor Call";

/// Detail type emitted when the verification endpoint accepts a code.
pub const VERIFY_SMS_ENDPOINT_INVOKED: &str = "Verify SMS Endpoint Invoked";

/// Alternative spelling of [`VERIFY_SMS_ENDPOINT_INVOKED`] used by the
/// event-bus routing rule.
pub const VERIFY_SMS_ENDPOINT_INVOKED_ALIAS: &str = "/verifySMS Endpoint Invoked";

/// Errors raised while turning an inbound payload into an event.
#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    /// A required field is absent, null or empty.
    #[error("missing or empty field '{0}'")]
    MissingField(&'static str),

    /// A field is present but has the wrong shape.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// A request to an SMS vendor to deliver a one-time password.
///
/// The serialized form is the set member stored under a call window key, so
/// field order and names are part of the storage format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    /// The destination phone number.
    #[serde(rename = "phonenumber")]
    pub phone_number: String,

    /// The vendor that was asked to send the SMS.
    #[serde(rename = "smsProvider")]
    pub vendor: String,

    /// When the call happened, in epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub occurred_at_ms: i64,
}

impl CallEvent {
    /// Creates a new call event.
    pub fn new(phone_number: impl Into<String>, vendor: impl Into<String>, occurred_at_ms: i64) -> Self {
        Self { phone_number: phone_number.into(), vendor: vendor.into(), occurred_at_ms }
    }

    /// Builds a call event from an inbound `SMS Vendor Call` detail object
    /// (`{ phonenumber, smsProvider, timestamp }`).
    pub fn from_detail(detail: &Value) -> Result<Self, EventError> {
        let phone_number = required_str(detail, "phonenumber")?;
        let vendor = required_str(detail, "smsProvider")?;
        let occurred_at_ms = match detail.get("timestamp") {
            None | Some(Value::Null) => return Err(EventError::MissingField("timestamp")),
            Some(Value::Number(n)) => epoch_millis(n)?,
            Some(other) => {
                return Err(EventError::InvalidField {
                    field: "timestamp",
                    reason: format!("expected a number, got {other}"),
                });
            }
        };
        let event = Self::new(phone_number, vendor, occurred_at_ms);
        event.validate()?;
        Ok(event)
    }

    /// Checks the field constraints a recorder relies on.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.phone_number.is_empty() {
            return Err(EventError::MissingField("phonenumber"));
        }
        if self.vendor.is_empty() {
            return Err(EventError::MissingField("smsProvider"));
        }
        if chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.occurred_at_ms).is_none() {
            return Err(EventError::InvalidField {
                field: "timestamp",
                reason: format!("{} is outside the representable UTC range", self.occurred_at_ms),
            });
        }
        Ok(())
    }

    /// The canonical string stored as a call set member.
    pub fn to_member(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a stored call set member.
    pub fn from_member(member: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(member)
    }
}

/// A successful verification of a code delivered by SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEvent {
    /// The phone number that completed verification.
    #[serde(rename = "phonenumber")]
    pub phone_number: String,
}

impl VerificationEvent {
    /// Creates a new verification event.
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self { phone_number: phone_number.into() }
    }

    /// Builds a verification event from an inbound detail object
    /// (`{ phonenumber }`).
    pub fn from_detail(detail: &Value) -> Result<Self, EventError> {
        let event = Self::new(required_str(detail, "phonenumber")?);
        event.validate()?;
        Ok(event)
    }

    /// Checks the field constraints a recorder relies on.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.phone_number.is_empty() {
            return Err(EventError::MissingField("phonenumber"));
        }
        Ok(())
    }
}

/// The event-bus envelope delivered to the ingestion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Routing discriminator, e.g. `SMS Vendor Call`.
    #[serde(rename = "detail-type")]
    pub detail_type: String,

    /// The event payload.
    #[serde(default)]
    pub detail: Value,
}

/// What an envelope asks the ingestion path to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Record a vendor call.
    VendorCall,
    /// Record a successful verification.
    Verification,
    /// Not consumed by this service.
    Unrecognized,
}

impl EventEnvelope {
    /// Classifies the envelope by its detail type.
    pub fn kind(&self) -> EventKind {
        match self.detail_type.as_str() {
            SMS_VENDOR_CALL => EventKind::VendorCall,
            VERIFY_SMS_ENDPOINT_INVOKED | VERIFY_SMS_ENDPOINT_INVOKED_ALIAS => {
                EventKind::Verification
            }
            _ => EventKind::Unrecognized,
        }
    }
}

fn required_str(detail: &Value, field: &'static str) -> Result<String, EventError> {
    match detail.get(field) {
        None | Some(Value::Null) => Err(EventError::MissingField(field)),
        Some(Value::String(s)) if s.is_empty() => Err(EventError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(EventError::InvalidField {
            field,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

/// Integral epoch milliseconds from any JSON number; fractions are truncated.
fn epoch_millis(n: &serde_json::Number) -> Result<i64, EventError> {
    if let Some(ms) = n.as_i64() {
        return Ok(ms);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f.trunc() as i64),
        _ => Err(EventError::InvalidField {
            field: "timestamp",
            reason: format!("{n} is not a valid epoch-millisecond value"),
        }),
    }
}
