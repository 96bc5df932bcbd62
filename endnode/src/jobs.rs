//! Timed job registry
//!
//! Jobs are armed through the engine's callback scheduler. The registry remembers which
//! jobs are armed so that a callback fired after its job was cancelled is dropped, and
//! so that the number of outstanding jobs can be asked when deciding on standby.

use heapless::LinearMap;

use crate::TimeMs;

/// Maximum number of simultaneously armed jobs
pub const MAX_JOBS: usize = 16;

/// Job kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Job {
    /// Transmit the next queued message
    Send,
    /// Application defined job
    App(u8),
}

/// An armed job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledJob {
    /// Delay requested when arming
    pub delay_ms: u32,
    /// Local time at which the job was armed
    pub armed_at_ms: TimeMs,
}

impl ScheduledJob {
    /// Earliest local time at which the job fires
    pub fn due_at_ms(&self) -> TimeMs {
        self.armed_at_ms + self.delay_ms as TimeMs
    }
}

/// Result of arming a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Armed {
    /// The job was idle
    Fresh,
    /// The job was already armed and has been moved to the new time
    Rescheduled,
}

/// Every job slot is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistryFull;

/// Registry of armed jobs
#[derive(Debug, Default)]
pub struct JobRegistry {
    armed: LinearMap<Job, ScheduledJob, MAX_JOBS>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            armed: LinearMap::new(),
        }
    }

    /// Record `job` as armed
    pub fn arm(&mut self, job: Job, delay_ms: u32, now: TimeMs) -> Result<Armed, RegistryFull> {
        let scheduled = ScheduledJob {
            delay_ms,
            armed_at_ms: now,
        };
        match self.armed.insert(job, scheduled) {
            Ok(None) => Ok(Armed::Fresh),
            Ok(Some(_)) => Ok(Armed::Rescheduled),
            Err(_) => Err(RegistryFull),
        }
    }

    /// Disarm `job`, returns whether it was armed
    pub fn disarm(&mut self, job: Job) -> bool {
        self.armed.remove(&job).is_some()
    }

    /// Consume a fired callback, returns `false` if the job is not armed any more
    pub fn fire(&mut self, job: Job) -> bool {
        self.armed.remove(&job).is_some()
    }

    /// Whether `job` is armed
    pub fn is_armed(&self, job: Job) -> bool {
        self.armed.contains_key(&job)
    }

    /// Armed job details
    pub fn get(&self, job: Job) -> Option<&ScheduledJob> {
        self.armed.get(&job)
    }

    /// Number of armed jobs
    pub fn outstanding(&self) -> usize {
        self.armed.len()
    }

    /// Armed jobs
    pub fn pending(&self) -> impl Iterator<Item = (&Job, &ScheduledJob)> {
        self.armed.iter()
    }
}
