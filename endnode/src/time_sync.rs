//! Network time synchronisation
//!
//! Once joined, a time request is piggybacked on the next uplink whenever the last
//! successful synchronisation is older than the configured interval. The answer carries
//! the network time at which the request left the device; the transit delay measured on
//! the local clock is added to it.
//!
//! A request only rides on the uplink it was handed over with. Once that uplink has
//! completed without an answer, the next uplink asks again. A late answer is still
//! accepted and corrected against the latest request.

use crate::config::TimeSyncConfig;
use crate::TimeMs;

/// Network answer to a time request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkTimeAnswer {
    /// Network epoch time, in milliseconds, when the request was sent
    pub epoch_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    local_ms: TimeMs,
    network_ms: u64,
}

/// Time synchronisation state
#[derive(Debug, Clone)]
pub struct TimeSync {
    config: Option<TimeSyncConfig>,
    requested_at: Option<TimeMs>,
    outstanding: bool,
    last_sync_ms: Option<TimeMs>,
    anchor: Option<Anchor>,
}

impl TimeSync {
    /// Create the synchroniser, `None` disables it
    pub fn new(config: Option<TimeSyncConfig>) -> Self {
        Self {
            config,
            requested_at: None,
            outstanding: false,
            last_sync_ms: None,
            anchor: None,
        }
    }

    /// Whether synchronisation is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Whether the last synchronisation is recent enough
    pub fn is_synced(&self, now: TimeMs) -> bool {
        match (self.config, self.last_sync_ms) {
            (Some(config), Some(last)) => now.saturating_sub(last) < config.interval_ms,
            _ => false,
        }
    }

    /// Whether a request should go out with the next uplink
    pub fn is_due(&self, now: TimeMs) -> bool {
        self.is_enabled() && !self.is_synced(now)
    }

    /// Whether a request rides on the uplink currently in progress
    pub fn is_request_pending(&self) -> bool {
        self.outstanding
    }

    /// Record that a request has been handed to the engine
    pub fn mark_requested(&mut self, now: TimeMs) {
        self.requested_at = Some(now);
        self.outstanding = true;
    }

    /// The uplink carrying the request is done, the next one may ask again
    pub fn uplink_completed(&mut self) {
        self.outstanding = false;
    }

    /// Process the engine's answer, `None` meaning the request failed
    ///
    /// Returns the corrected network time on success.
    pub fn complete(&mut self, answer: Option<NetworkTimeAnswer>, now: TimeMs) -> Option<u64> {
        let requested_at = self.requested_at.take();
        self.outstanding = false;
        let answer = answer?;
        let transit = requested_at.map_or(0, |sent| now.saturating_sub(sent));
        let network_ms = answer.epoch_ms.saturating_add(transit);
        self.anchor = Some(Anchor {
            local_ms: now,
            network_ms,
        });
        self.last_sync_ms = Some(now);
        Some(network_ms)
    }

    /// Forget a pending request, e.g. when the session is lost
    pub fn cancel_request(&mut self) {
        self.requested_at = None;
        self.outstanding = false;
    }

    /// Network time derived from the last synchronisation
    pub fn network_time_ms(&self, now: TimeMs) -> Option<u64> {
        self.anchor
            .map(|anchor| anchor.network_ms + now.saturating_sub(anchor.local_ms))
    }
}
