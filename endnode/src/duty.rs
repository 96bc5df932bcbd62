//! Duty-cycle gate
//!
//! Regulatory airtime accounting is done by the MAC engine. The gate only turns the
//! engine's "next allowed transmission" time into the delay used when arming the send
//! job, so that a frame is never handed over before the budget allows it.

use crate::mac::MacEngine;
use crate::TimeMs;

/// Milliseconds to wait from `now` until `available_at`, zero if already available
pub fn wait_time(now: TimeMs, available_at: TimeMs) -> u32 {
    let wait = available_at.saturating_sub(now);
    u32::try_from(wait).unwrap_or(u32::MAX)
}

/// Milliseconds until the engine's global duty-cycle budget permits a send
pub fn wait_time_ms<M: MacEngine>(engine: &M) -> u32 {
    wait_time(engine.now_ms(), engine.duty_cycle_available_at_ms())
}
