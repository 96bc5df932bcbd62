//! Runtime configuration
//!
//! This module contains the knobs of the endnode runtime:
//! - Queue overflow policy and default retry bound
//! - Uplink port
//! - Network time synchronisation interval
//! - Link settings applied to the MAC engine at start-up
//!
//! Device credentials and session keys live in [`device`].

/// Device identity and session state
pub mod device;

pub use device::{Identity, Session, SessionKeys};

use crate::TimeMs;

/// EUI-64 (8 bytes)
pub type EUI64 = [u8; 8];
/// AES-128 key (16 bytes)
pub type AESKey = [u8; 16];
/// Device Address
pub type DevAddr = u32;
/// Network identifier
pub type NetId = u32;

/// Default outbound queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// What the outbound queue does with a new message when it is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverflowPolicy {
    /// Drop the oldest pending message and accept the new one
    KeepRecent,
    /// Reject the new message and keep the pending ones
    KeepOld,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::KeepRecent
    }
}

/// Network time synchronisation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSyncConfig {
    /// Minimum time between two successful synchronisations
    pub interval_ms: TimeMs,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: 24 * 60 * 60 * 1000,
        }
    }
}

/// Link settings pushed to the MAC engine after reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Adaptive data rate enabled
    pub adr_enabled: bool,
    /// Tolerated clock error in percent, widens the RX windows
    pub clock_error_percent: u8,
    /// Link check mode, `None` leaves the engine default
    pub link_check_enabled: Option<bool>,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            adr_enabled: true,
            // speeds up the join on boards with a poor crystal
            clock_error_percent: 10,
            link_check_enabled: None,
        }
    }
}

/// Endnode runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndnodeConfig {
    /// Queue overflow policy
    pub overflow: OverflowPolicy,
    /// Retransmissions tolerated for an unacknowledged message, unless the application
    /// picks another bound for the message type
    pub max_retries: u8,
    /// Port used for uplinks
    pub port: u8,
    /// Network time synchronisation, `None` disables it
    pub time_sync: Option<TimeSyncConfig>,
    /// Link settings
    pub link: LinkSettings,
}

impl Default for EndnodeConfig {
    fn default() -> Self {
        Self {
            overflow: OverflowPolicy::KeepRecent,
            max_retries: 1,
            port: 1,
            time_sync: Some(TimeSyncConfig::default()),
            link: LinkSettings::default(),
        }
    }
}

impl EndnodeConfig {
    /// Set the overflow policy
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Set the default retry bound
    pub fn with_max_retries(mut self, max_retries: u8) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the uplink port
    pub fn with_port(mut self, port: u8) -> Self {
        self.port = port;
        self
    }

    /// Set or disable network time synchronisation
    pub fn with_time_sync(mut self, time_sync: Option<TimeSyncConfig>) -> Self {
        self.time_sync = time_sync;
        self
    }

    /// Set the link settings
    pub fn with_link(mut self, link: LinkSettings) -> Self {
        self.link = link;
        self
    }
}
