use core::fmt::Debug;

use crate::config::{device::Identity, LinkSettings, SessionKeys};
use crate::jobs::Job;
use crate::TimeMs;

use super::{RxFrame, TxRxFlags};

/// Hard rejection of a send request by the engine
///
/// A busy engine is not an error, it is reported as [`nb::Error::WouldBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxError {
    /// Payload longer than the current data rate allows
    TooLarge,
    /// Frame cannot be sent with the current channel plan / data rate
    NotFeasible,
    /// Any other failure
    Failed,
}

/// Convert an engine status code to a transport result
///
/// Codes follow the usual C MAC engine convention: `0` success, `-1` busy, `-2` payload
/// too large, `-3` not feasible, anything else failure.
pub fn tx_result_from_code(code: i32) -> nb::Result<(), TxError> {
    match code {
        0 => Ok(()),
        -1 => Err(nb::Error::WouldBlock),
        -2 => Err(nb::Error::Other(TxError::TooLarge)),
        -3 => Err(nb::Error::Other(TxError::NotFeasible)),
        _ => Err(nb::Error::Other(TxError::Failed)),
    }
}

/// Radio / MAC activity as reported by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioStatus {
    /// A transmission or its receive windows are in progress
    pub txrx_pending: bool,
    /// Data has been handed over and waits for transmission
    pub tx_data_pending: bool,
    /// A join procedure is in progress
    pub joining: bool,
    /// The engine is about to poll the network for pending downlinks
    pub polling: bool,
}

impl RadioStatus {
    const OP_JOINING: u16 = 0x0004;
    const OP_TXDATA: u16 = 0x0008;
    const OP_POLL: u16 = 0x0010;
    const OP_TXRXPEND: u16 = 0x0800;

    /// Idle radio
    pub const fn idle() -> Self {
        Self {
            txrx_pending: false,
            tx_data_pending: false,
            joining: false,
            polling: false,
        }
    }

    /// Build from a C MAC engine `opmode` bit field
    pub fn from_opmode(opmode: u16) -> Self {
        Self {
            txrx_pending: opmode & Self::OP_TXRXPEND != 0,
            tx_data_pending: opmode & Self::OP_TXDATA != 0,
            joining: opmode & Self::OP_JOINING != 0,
            polling: opmode & Self::OP_POLL != 0,
        }
    }

    /// Whether the engine would refuse or delay a new frame
    pub fn is_busy(&self) -> bool {
        self.txrx_pending || self.tx_data_pending || self.joining || self.polling
    }
}

/// External LoRaWAN MAC engine
///
/// The engine owns the protocol: framing, encryption, channel plan, ADR, RX windows and
/// regulatory duty-cycle accounting. It reports asynchronous outcomes by calling the
/// free functions in [`crate::hooks`], never by calling back into the runtime directly.
pub trait MacEngine {
    /// Error type for engine operations
    #[cfg(feature = "defmt")]
    type Error: Debug + defmt::Format;

    /// Error type for engine operations
    #[cfg(not(feature = "defmt"))]
    type Error: Debug;

    /// Board specific radio wiring
    type PinMap;

    /// Initialize the radio and the engine's scheduler
    fn init_radio(&mut self, pins: &Self::PinMap) -> Result<(), Self::Error>;

    /// Reset the MAC state, dropping any session
    fn reset(&mut self);

    /// Apply ADR mode, clock error tolerance and link check mode
    fn apply_link_settings(&mut self, settings: &LinkSettings);

    /// Enable or disable link check mode
    fn set_link_check(&mut self, enabled: bool);

    /// Start (or restart) the OTAA join procedure
    fn start_join(&mut self, identity: &Identity) -> Result<(), Self::Error>;

    /// Arm a one-shot callback firing no earlier than `delay_ms` from now
    ///
    /// Arming an already armed job moves it to the new time.
    fn schedule_callback(&mut self, job: Job, delay_ms: u32);

    /// Disarm a callback, no-op if it is not pending
    fn cancel_callback(&mut self, job: Job);

    /// Hand a frame over for transmission
    ///
    /// Completion is reported later through a transmission-complete event.
    fn send_frame(&mut self, port: u8, data: &[u8], ack_requested: bool)
        -> nb::Result<(), TxError>;

    /// Current activity
    fn radio_status(&self) -> RadioStatus;

    /// Local clock
    fn now_ms(&self) -> TimeMs;

    /// Earliest local time at which the global duty-cycle budget permits a transmission
    fn duty_cycle_available_at_ms(&self) -> TimeMs;

    /// Keys of the current session, if any
    fn session_keys(&self) -> Option<SessionKeys>;

    /// Flags of the last completed transmission
    fn tx_flags(&self) -> TxRxFlags;

    /// Frame received with the last completed transmission, if any
    fn downlink(&self) -> Option<RxFrame<'_>>;

    /// Piggyback a network time request on the next uplink
    fn request_network_time(&mut self);

    /// Run pending engine work, the engine's own run loop iteration
    fn run_once(&mut self);
}
