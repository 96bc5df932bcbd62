//! Standby readiness
//!
//! The device may only enter standby when nothing could still need the CPU: a session
//! exists, no job is armed, the outbound queue is empty, the radio is idle and no
//! callback signal waits to be dispatched.

/// Why the device must stay awake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StandbyBlocker {
    /// No session yet, the join is still running
    Unjoined,
    /// At least one job is armed
    JobsOutstanding,
    /// Messages wait to be sent
    QueueNotEmpty,
    /// A transmission or a join is in progress
    RadioBusy,
    /// Callback signals wait to be dispatched
    SignalsPending,
}

/// Snapshot of the conditions gating standby
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readiness {
    /// A session is established
    pub joined: bool,
    /// Number of armed jobs
    pub outstanding_jobs: usize,
    /// Outbound queue is empty
    pub queue_empty: bool,
    /// No transmission, reception or join in progress
    pub radio_idle: bool,
    /// Mailbox holds undispatched signals
    pub signals_pending: bool,
}

impl Readiness {
    /// First condition preventing standby, `None` when the device may sleep
    pub fn blocker(&self) -> Option<StandbyBlocker> {
        if !self.joined {
            Some(StandbyBlocker::Unjoined)
        } else if self.outstanding_jobs > 0 {
            Some(StandbyBlocker::JobsOutstanding)
        } else if !self.queue_empty {
            Some(StandbyBlocker::QueueNotEmpty)
        } else if !self.radio_idle {
            Some(StandbyBlocker::RadioBusy)
        } else if self.signals_pending {
            Some(StandbyBlocker::SignalsPending)
        } else {
            None
        }
    }

    /// Whether every condition holds
    pub fn is_ready(&self) -> bool {
        self.blocker().is_none()
    }
}
