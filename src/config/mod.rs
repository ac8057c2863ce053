//! Configuration module for the SMS health monitor.

mod app_config;
mod helpers;
mod server;

pub use app_config::AppConfig;
pub use helpers::{deserialize_duration_from_ms, deserialize_duration_from_seconds};
pub use server::ServerConfig;
