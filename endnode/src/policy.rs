//! Transmission completion policy
//!
//! Decides, when the engine reports the end of a transmission, whether the message at the
//! back of the queue is done with or must be sent again. A message that did not request
//! an acknowledgment is always done. An acknowledged one is done. A missing
//! acknowledgment bumps the retry counter of the message's [`RetryClass`]; once the
//! counter exceeds the class bound the message is abandoned.

use heapless::FnvIndexMap;

use crate::warn;

/// Maximum number of retry classes tracked at the same time
pub const MAX_RETRY_CLASSES: usize = 8;

/// State of the message handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Sent without acknowledgment request
    Sent,
    /// Sent, waiting to learn whether the network acknowledged it
    AwaitingAckOutcome,
}

impl Phase {
    /// Phase of a message right after it has been handed to the engine
    pub fn after_send(ack_requested: bool) -> Self {
        if ack_requested {
            Phase::AwaitingAckOutcome
        } else {
            Phase::Sent
        }
    }
}

/// Outcome of a completed transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Delivered (or no delivery guarantee requested), removed from the queue
    Satisfied,
    /// Not acknowledged, stays at the back of the queue for another attempt
    RetryPending,
    /// Not acknowledged after exhausting the retries, removed from the queue
    Abandoned,
}

impl Verdict {
    /// Whether the message leaves the queue
    pub fn pops(&self) -> bool {
        !matches!(self, Verdict::RetryPending)
    }
}

/// Retry bound of a logical message type
///
/// Messages with the same `key` share one retry counter, e.g. an alarm may tolerate more
/// retransmissions than a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryClass {
    /// Message type
    pub key: u8,
    /// Retransmissions tolerated before abandoning
    pub max_retries: u8,
}

impl RetryClass {
    /// Create a retry class
    pub const fn new(key: u8, max_retries: u8) -> Self {
        Self { key, max_retries }
    }
}

/// Retry counters per message type
#[derive(Debug, Default)]
pub struct RetryTracker {
    counters: FnvIndexMap<u8, u8, MAX_RETRY_CLASSES>,
}

impl RetryTracker {
    /// Create a tracker with every counter at zero
    pub fn new() -> Self {
        Self {
            counters: FnvIndexMap::new(),
        }
    }

    /// Apply the policy to a completed transmission
    pub fn evaluate(&mut self, ack_requested: bool, acked: bool, class: RetryClass) -> Verdict {
        if !ack_requested || acked {
            self.counters.remove(&class.key);
            return Verdict::Satisfied;
        }
        let retries = self.retries(class.key).saturating_add(1);
        if retries > class.max_retries {
            self.counters.remove(&class.key);
            return Verdict::Abandoned;
        }
        if self.counters.insert(class.key, retries).is_err() {
            warn!("no room for retry class {}, message abandoned", class.key);
            return Verdict::Abandoned;
        }
        Verdict::RetryPending
    }

    /// Current retry counter of a message type
    pub fn retries(&self, key: u8) -> u8 {
        self.counters.get(&key).copied().unwrap_or(0)
    }

    /// Reset every counter
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}
