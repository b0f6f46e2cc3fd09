//! Broadcast campaigns: audience resolution, media reuse, recurrence and
//! the executor that ties them together

pub mod compose;
mod executor;
pub mod media;
pub mod schedule;
pub mod targets;

pub use executor::{BroadcastExecutor, RunSummary, Throttle};
