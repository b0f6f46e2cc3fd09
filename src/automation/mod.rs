//! Automation matching and per-user cooldowns

mod cooldown;
mod matcher;

pub use cooldown::CooldownTracker;
pub use matcher::{match_rule, normalize};
