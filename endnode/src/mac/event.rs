/// Event reported by the MAC engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacEvent {
    /// Join procedure started
    Joining,
    /// Join accepted, session established
    Joined,
    /// Join attempt failed
    JoinFailed,
    /// Rejoin attempt failed
    RejoinFailed,
    /// Transmission finished, including its receive windows
    TxComplete,
    /// Engine was reset
    Reset,
    /// Frame received outside of a transmission (class C)
    RxComplete,
    /// No downlink for too long, the link is considered lost
    LinkDead,
    /// Link is back
    LinkAlive,
    /// Transmission started
    TxStart,
    /// Any other engine event, by code
    Other(u8),
}

impl MacEvent {
    /// Map a C MAC engine event code
    pub fn from_code(code: u8) -> Self {
        match code {
            5 => MacEvent::Joining,
            6 => MacEvent::Joined,
            8 => MacEvent::JoinFailed,
            9 => MacEvent::RejoinFailed,
            10 => MacEvent::TxComplete,
            12 => MacEvent::Reset,
            13 => MacEvent::RxComplete,
            14 => MacEvent::LinkDead,
            15 => MacEvent::LinkAlive,
            17 => MacEvent::TxStart,
            other => MacEvent::Other(other),
        }
    }

    /// Whether the event means the session is gone
    pub fn is_join_loss(&self) -> bool {
        matches!(
            self,
            MacEvent::JoinFailed | MacEvent::RejoinFailed | MacEvent::Reset | MacEvent::LinkDead
        )
    }
}

/// Result flags of the last transmission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxRxFlags(u8);

impl TxRxFlags {
    /// Acknowledgment received
    pub const ACK: u8 = 0x80;
    /// Acknowledgment requested but not received
    pub const NACK: u8 = 0x40;
    /// Downlink without port
    pub const NOPORT: u8 = 0x20;
    /// Downlink with port
    pub const PORT: u8 = 0x10;
    /// Downlink received in the RX1 window
    pub const DNW1: u8 = 0x01;
    /// Downlink received in the RX2 window
    pub const DNW2: u8 = 0x02;
    /// Downlink received in a ping slot
    pub const PING: u8 = 0x04;

    /// No flag set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap raw flag bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw flag bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Whether all bits of `flag` are set
    pub const fn contains(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    /// Acknowledgment received
    pub const fn ack(&self) -> bool {
        self.contains(Self::ACK)
    }

    /// Acknowledgment missing
    pub const fn nack(&self) -> bool {
        self.contains(Self::NACK)
    }
}
