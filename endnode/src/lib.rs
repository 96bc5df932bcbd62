//! LoRaWAN end-device runtime in Rust
//!
//! This crate is the application-facing layer of a LoRaWAN endnode. The radio MAC
//! protocol itself (channel plan, ADR, join cryptography, RX windows, regulatory duty
//! cycle accounting) lives in an external MAC engine reached through the
//! [`mac::MacEngine`] trait. On top of it the runtime provides:
//! - A bounded outbound queue with a configurable overflow policy
//! - A registry of timed jobs armed through the engine's callback scheduler
//! - A duty-cycle gate consulted before every transmission
//! - A retry / acknowledgment policy per logical message type
//! - Dispatch of join, reset, link and transmission events to application logic
//! - Optional network time synchronisation
//! - Pluggable payload codecs
//!
//! Everything runs cooperatively from [`device::Endnode::run_loop_once`]: no threads,
//! no blocking waits. The engine reaches the runtime through the free-function hooks in
//! [`hooks`], which only post into a mailbox owned by the single live endnode.
//!
//! # Example
//! ```no_run
//! use lorawan_endnode::{
//!     codec::RawCodec,
//!     config::{device::Identity, EndnodeConfig},
//!     device::{DefaultEndnode, Endnode},
//! };
//!
//! # fn run<M: lorawan_endnode::mac::MacEngine>(engine: M, pins: M::PinMap) {
//! let identity = Identity::new(
//!     [0x00; 8],  // AppEUI
//!     [0x01; 8],  // DevEUI
//!     [0x02; 16], // AppKey
//! );
//!
//! let mut node: DefaultEndnode<M, RawCodec, ()> =
//!     Endnode::new(engine, RawCodec, (), EndnodeConfig::default()).unwrap();
//! node.begin(&pins, identity).unwrap();
//!
//! node.send(&heapless::Vec::from_slice(b"hello").unwrap(), false);
//! loop {
//!     node.run_loop_once();
//!     if node.is_ready_for_standby() {
//!         // enter low power mode
//!     }
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
use defmt::{debug, error, info, trace, warn};

#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Payload codecs
pub mod codec;

/// Runtime configuration, identity and session keys
pub mod config;

/// High-level endnode interface and event dispatch
pub mod device;

/// Duty-cycle gate
pub mod duty;

/// Free-function callback shims and the signal mailbox
pub mod hooks;

/// Timed job registry
pub mod jobs;

/// MAC engine interface, events and downlink frames
pub mod mac;

/// Uplink and downlink message buffers
pub mod message;

/// Transmission completion policy
pub mod policy;

/// Outbound message queue
pub mod queue;

/// Network time synchronisation
pub mod time_sync;

/// Time as milliseconds of the engine's local clock
pub type TimeMs = u64;
