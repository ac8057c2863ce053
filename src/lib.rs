#![warn(missing_docs)]
//! A health monitor for SMS one-time-password delivery.
//!
//! Vendor-call events and verification events are recorded into minute
//! buckets of a shared key-value store. On a fixed cadence the evaluator reads
//! a lagged bucket, computes the share of calls that were never verified,
//! ranks vendors by error rate when the threshold is breached, and deletes the
//! evaluated state.

pub mod config;
pub mod context;
pub mod engine;
pub mod http_server;
pub mod models;
pub mod persistence;
pub mod scheduler;
pub mod sink;
pub mod supervisor;
pub mod window;
