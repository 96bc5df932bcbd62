//! Free-function callback shims
//!
//! MAC engines written in C expose plain function hooks (event callback, job callback),
//! not closures or method pointers. The shims in this module are those hooks: they only
//! post a [`Signal`] into the process-wide [`MAILBOX`]. The single live endnode claims the
//! mailbox when it is created and drains it on every run loop iteration, so no runtime
//! state is ever touched from inside the engine or an interrupt handler.
//!
//! Only one endnode may own a mailbox at a time. A second claim fails instead of silently
//! stealing the callbacks; dropping the endnode releases the claim.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use heapless::Deque;

use crate::jobs::{Job, MAX_JOBS};
use crate::mac::MacEvent;
use crate::time_sync::NetworkTimeAnswer;
use crate::warn;

/// Maximum number of engine events waiting to be dispatched
pub const MAILBOX_CAPACITY: usize = 16;

const INTERRUPT_WORDS: usize = 8;

/// Asynchronous notification waiting for the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    /// Engine event
    Event(MacEvent),
    /// Timed job fired
    Job(Job),
    /// Answer to a network time request, `None` on failure
    NetworkTime(Option<NetworkTimeAnswer>),
    /// Peripheral interrupt, by application defined source number
    Interrupt(u8),
}

/// The mailbox is already owned by a live endnode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlreadyRegistered;

struct Pending {
    events: Deque<MacEvent, MAILBOX_CAPACITY>,
    time: Option<Option<NetworkTimeAnswer>>,
    jobs: Deque<Job, MAX_JOBS>,
    interrupts: [u32; INTERRUPT_WORDS],
}

impl Pending {
    const fn new() -> Self {
        Self {
            events: Deque::new(),
            time: None,
            jobs: Deque::new(),
            interrupts: [0; INTERRUPT_WORDS],
        }
    }

    fn push_event(&mut self, event: MacEvent) -> bool {
        if self.events.is_full() && !self.evict_informational() {
            return false;
        }
        self.events.push_back(event).is_ok()
    }

    /// Make room by dropping the oldest event nothing depends on
    fn evict_informational(&mut self) -> bool {
        let Some(index) = self.events.iter().position(|event| {
            matches!(
                event,
                MacEvent::Joining | MacEvent::TxStart | MacEvent::LinkAlive | MacEvent::Other(_)
            )
        }) else {
            return false;
        };
        let mut kept: Deque<MacEvent, MAILBOX_CAPACITY> = Deque::new();
        for (i, event) in self.events.iter().enumerate() {
            if i != index {
                let _ = kept.push_back(*event);
            }
        }
        self.events = kept;
        true
    }

    fn push_job(&mut self, job: Job) -> bool {
        self.jobs.iter().any(|queued| *queued == job) || self.jobs.push_back(job).is_ok()
    }

    fn raise(&mut self, source: u8) {
        self.interrupts[usize::from(source / 32)] |= 1 << (source % 32);
    }

    fn take_interrupt(&mut self) -> Option<u8> {
        let (word, bits) = self
            .interrupts
            .iter_mut()
            .enumerate()
            .find(|(_, bits)| **bits != 0)?;
        let bit = bits.trailing_zeros();
        *bits &= !(1 << bit);
        Some((word as u32 * 32 + bit) as u8)
    }

    fn take(&mut self) -> Option<Signal> {
        if let Some(event) = self.events.pop_front() {
            return Some(Signal::Event(event));
        }
        if let Some(answer) = self.time.take() {
            return Some(Signal::NetworkTime(answer));
        }
        if let Some(job) = self.jobs.pop_front() {
            return Some(Signal::Job(job));
        }
        self.take_interrupt().map(Signal::Interrupt)
    }

    fn len(&self) -> usize {
        let interrupts: u32 = self.interrupts.iter().map(|bits| bits.count_ones()).sum();
        self.events.len() + usize::from(self.time.is_some()) + self.jobs.len() + interrupts as usize
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Signal store shared between the callback shims and the endnode
///
/// Engine events keep their order. The latest network time answer wins. Job firings and
/// interrupts are coalesced per job and per source, so a burst of either never pushes an
/// engine event out. Signals are handed out events first, then the time answer, then
/// jobs, then interrupts.
pub struct Mailbox {
    claimed: Mutex<Cell<bool>>,
    dropped: Mutex<Cell<u32>>,
    pending: Mutex<RefCell<Pending>>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    /// Create an unclaimed, empty mailbox
    pub const fn new() -> Self {
        Self {
            claimed: Mutex::new(Cell::new(false)),
            dropped: Mutex::new(Cell::new(0)),
            pending: Mutex::new(RefCell::new(Pending::new())),
        }
    }

    /// Become the only consumer of this mailbox
    pub fn claim(&'static self) -> Result<Registration, AlreadyRegistered> {
        critical_section::with(|cs| {
            let claimed = self.claimed.borrow(cs);
            if claimed.get() {
                return Err(AlreadyRegistered);
            }
            claimed.set(true);
            self.pending.borrow_ref_mut(cs).clear();
            Ok(Registration { mailbox: self })
        })
    }

    /// Whether an endnode owns the mailbox
    pub fn is_claimed(&self) -> bool {
        critical_section::with(|cs| self.claimed.borrow(cs).get())
    }

    /// Store a signal, returns `false` if nobody listens or it could not be kept
    ///
    /// Only engine events beyond [`MAILBOX_CAPACITY`] with no informational event left to
    /// evict, or more distinct jobs than [`MAX_JOBS`], are ever lost.
    pub fn post(&self, signal: Signal) -> bool {
        critical_section::with(|cs| {
            if !self.claimed.borrow(cs).get() {
                return false;
            }
            let mut pending = self.pending.borrow_ref_mut(cs);
            let kept = match signal {
                Signal::Event(event) => pending.push_event(event),
                Signal::Job(job) => pending.push_job(job),
                Signal::NetworkTime(answer) => {
                    pending.time = Some(answer);
                    true
                }
                Signal::Interrupt(source) => {
                    pending.raise(source);
                    true
                }
            };
            if !kept {
                let dropped = self.dropped.borrow(cs);
                dropped.set(dropped.get().wrapping_add(1));
            }
            kept
        })
    }

    /// Next signal to dispatch
    pub fn take(&self) -> Option<Signal> {
        critical_section::with(|cs| self.pending.borrow_ref_mut(cs).take())
    }

    /// Number of pending signals
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.pending.borrow_ref(cs).len())
    }

    /// Whether an engine event is waiting
    pub fn has_events(&self) -> bool {
        critical_section::with(|cs| !self.pending.borrow_ref(cs).events.is_empty())
    }

    /// Whether no signal is pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of signals lost because there was no room left
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.dropped.borrow(cs).get())
    }
}

/// Ownership of a mailbox, released on drop
pub struct Registration {
    mailbox: &'static Mailbox,
}

impl Registration {
    /// The owned mailbox
    pub fn mailbox(&self) -> &'static Mailbox {
        self.mailbox
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        critical_section::with(|cs| {
            self.mailbox.pending.borrow_ref_mut(cs).clear();
            self.mailbox.claimed.borrow(cs).set(false);
        })
    }
}

/// Mailbox reached by the free-function hooks
pub static MAILBOX: Mailbox = Mailbox::new();

fn post(signal: Signal) {
    if !MAILBOX.post(signal) {
        warn!("signal lost: {:?}", signal);
    }
}

/// Engine event hook, takes the engine's numeric event code
pub fn on_event(code: u8) {
    post(Signal::Event(MacEvent::from_code(code)));
}

/// Engine event hook for engines reporting typed events
pub fn on_mac_event(event: MacEvent) {
    post(Signal::Event(event));
}

/// Engine job hook, called when an armed callback fires
pub fn on_job(job: Job) {
    post(Signal::Job(job));
}

/// Engine network time hook, `None` when the request failed
pub fn on_network_time(answer: Option<NetworkTimeAnswer>) {
    post(Signal::NetworkTime(answer));
}

/// Interrupt hook for buttons, timers and other peripherals
///
/// Repeated interrupts from one source before the next run loop pass are reported once.
pub fn on_interrupt(source: u8) {
    post(Signal::Interrupt(source));
}
