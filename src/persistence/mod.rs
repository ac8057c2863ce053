//! Storage for window state.
//!
//! The evaluator and the recorders only ever talk to the store through the
//! [`traits::WindowStore`] capability, so the Redis client used in production
//! can be replaced by [`memory::InMemoryWindowStore`] in tests and dry runs.

pub mod error;
pub mod memory;
pub mod redis;
pub mod traits;

pub use self::{memory::InMemoryWindowStore, redis::RedisWindowStore};
