//! Outbound message queue
//!
//! A bounded double-ended FIFO. New messages are pushed to the front, the next message to
//! transmit is always the back one, so the oldest surviving message is sent first. When
//! the queue is full the [`OverflowPolicy`] decides whether the oldest pending message or
//! the new one is dropped.
//!
//! Every mutation runs inside a critical section so that a message may be enqueued from
//! an interrupt handler without tearing the queue.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::{Deque, Vec};

use crate::config::OverflowPolicy;
use crate::mac::{TxError, TxRxFlags};
use crate::message::OutboundMessage;
use crate::{debug, warn};

struct Inner<const N: usize> {
    messages: Deque<OutboundMessage, N>,
    /// The back message has been handed to the engine
    dispatching: bool,
}

/// Bounded queue of uplink messages waiting to be sent
pub struct OutboundQueue<const N: usize> {
    policy: OverflowPolicy,
    inner: Mutex<RefCell<Inner<N>>>,
}

impl<const N: usize> OutboundQueue<N> {
    /// Create an empty queue
    pub const fn new(policy: OverflowPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(RefCell::new(Inner {
                messages: Deque::new(),
                dispatching: false,
            })),
        }
    }

    /// Overflow policy of this queue
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Maximum number of pending messages
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Push a message to the front of the queue
    ///
    /// Returns `false` if the message was rejected. Under [`OverflowPolicy::KeepRecent`]
    /// the oldest message is dropped to make room, except the one currently being
    /// dispatched.
    pub fn enqueue(&self, message: OutboundMessage) -> bool {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.messages.is_full() {
                match self.policy {
                    OverflowPolicy::KeepOld => {
                        warn!("queue full, new message rejected");
                        return false;
                    }
                    OverflowPolicy::KeepRecent => {
                        if !inner.evict_oldest() {
                            warn!("queue full, only the message in flight left");
                            return false;
                        }
                        debug!("queue full, oldest message dropped");
                    }
                }
            }
            inner.messages.push_front(message).is_ok()
        })
    }

    /// Whether at least one message is waiting
    pub fn has_pending(&self) -> bool {
        !self.is_empty()
    }

    /// Number of pending messages
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).messages.len())
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).messages.is_empty())
    }

    /// Copy of the message that will be sent next
    pub fn peek_next_to_send(&self) -> Option<OutboundMessage> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).messages.back().cloned())
    }

    /// Mark the next message as handed to the engine and return a copy of it
    pub fn begin_dispatch(&self) -> Option<OutboundMessage> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let next = inner.messages.back().cloned();
            inner.dispatching = next.is_some();
            next
        })
    }

    /// Whether the back message is being dispatched
    pub fn is_dispatching(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).dispatching)
    }

    /// Remove the message that was just sent
    pub fn pop_sent(&self) -> Option<OutboundMessage> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.dispatching = false;
            inner.messages.pop_back()
        })
    }

    /// Keep the message that was just sent for another attempt, recording the result
    pub fn retain_for_retry(&self, flags: TxRxFlags, error: Option<TxError>) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.dispatching = false;
            if let Some(message) = inner.messages.back_mut() {
                message.last_flags = flags;
                message.transport_error = error;
            }
        })
    }

    /// Forget any dispatch in progress, e.g. after an engine reset
    pub fn abort_dispatch(&self) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).dispatching = false)
    }

    /// Drop every pending message
    pub fn clear(&self) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.messages.clear();
            inner.dispatching = false;
        })
    }

    /// Copy of the pending messages in send order
    pub fn snapshot(&self) -> Vec<OutboundMessage, N> {
        critical_section::with(|cs| {
            let inner = self.inner.borrow_ref(cs);
            let mut messages: Vec<OutboundMessage, N> = Vec::new();
            for message in inner.messages.iter() {
                // capacities are equal
                let _ = messages.push(message.clone());
            }
            messages.reverse();
            messages
        })
    }
}

impl<const N: usize> Inner<N> {
    /// Drop the oldest message that is not in flight
    fn evict_oldest(&mut self) -> bool {
        if !self.dispatching {
            return self.messages.pop_back().is_some();
        }
        let Some(in_flight) = self.messages.pop_back() else {
            return false;
        };
        let evicted = self.messages.pop_back().is_some();
        let _ = self.messages.push_back(in_flight);
        evicted
    }
}
