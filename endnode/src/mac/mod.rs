//! MAC engine interface
//!
//! The LoRaWAN MAC protocol is provided by an external engine. This module contains:
//! - The [`MacEngine`] trait the runtime drives
//! - Events reported by the engine and transmission result flags
//! - Downlink frame classification (application data vs. MAC commands)
//! - MAC command identifiers, for logging

/// MAC command identifiers
pub mod commands;

/// Engine events and transmission flags
pub mod event;

/// Downlink frame inspection
pub mod frame;

/// MAC engine trait
pub mod traits;

pub use commands::{CommandIdentifier, MacCommands};
pub use event::{MacEvent, TxRxFlags};
pub use frame::{FCtrl, FrameKind, MType, RxFrame};
pub use traits::{tx_result_from_code, MacEngine, RadioStatus, TxError};
