//! Downlink frame inspection
//!
//! The engine hands over the decrypted frame together with the position of the
//! application payload. Frames carrying MAC commands (in FOpts or on port 0) are kept
//! away from the application.

/// MAC header types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MType {
    /// Join request
    JoinRequest = 0x00,
    /// Join accept
    JoinAccept = 0x20,
    /// Unconfirmed uplink
    UnconfirmedDataUp = 0x40,
    /// Unconfirmed downlink
    UnconfirmedDataDown = 0x60,
    /// Confirmed uplink
    ConfirmedDataUp = 0x80,
    /// Confirmed downlink
    ConfirmedDataDown = 0xA0,
    /// Rejoin request
    RejoinRequest = 0xC0,
    /// Proprietary
    Proprietary = 0xE0,
}

impl MType {
    /// Extract the message type from a MAC header byte
    pub fn from_mhdr(mhdr: u8) -> Self {
        match mhdr & 0xE0 {
            0x00 => MType::JoinRequest,
            0x20 => MType::JoinAccept,
            0x40 => MType::UnconfirmedDataUp,
            0x60 => MType::UnconfirmedDataDown,
            0x80 => MType::ConfirmedDataUp,
            0xA0 => MType::ConfirmedDataDown,
            0xC0 => MType::RejoinRequest,
            _ => MType::Proprietary,
        }
    }

    /// Whether the type is a data downlink
    pub fn is_data_down(self) -> bool {
        matches!(self, MType::UnconfirmedDataDown | MType::ConfirmedDataDown)
    }
}

/// Frame header flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FCtrl {
    /// ADR enabled
    pub adr: bool,
    /// ADR acknowledgment requested
    pub adr_ack_req: bool,
    /// Frame acknowledges the last confirmed uplink
    pub ack: bool,
    /// More data pending on the network side
    pub f_pending: bool,
    /// Length of the FOpts field
    pub f_opts_len: u8,
}

impl FCtrl {
    /// Decode the FCtrl byte
    pub fn from_byte(byte: u8) -> Self {
        Self {
            adr: (byte & 0x80) != 0,
            adr_ack_req: (byte & 0x40) != 0,
            ack: (byte & 0x20) != 0,
            f_pending: (byte & 0x10) != 0,
            f_opts_len: byte & 0x0F,
        }
    }
}

const MHDR_OFFSET: usize = 0;
const FCTRL_OFFSET: usize = 5;
const FOPTS_OFFSET: usize = 8;

/// What a downlink frame carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind<'a> {
    /// Nothing for the application, e.g. a bare acknowledgment
    Empty,
    /// MAC commands, from FOpts or a port 0 payload
    MacCommands(&'a [u8]),
    /// Application downlink
    Application {
        /// Application port
        port: u8,
        /// Payload bytes
        payload: &'a [u8],
    },
    /// Not a data downlink, e.g. an echoed uplink or a join accept
    Unexpected(MType),
    /// Offsets or lengths do not fit the frame
    Malformed,
}

/// Decrypted downlink frame as delivered by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFrame<'a> {
    /// Whole frame, starting with the MAC header
    pub frame: &'a [u8],
    /// Offset of the application payload, just after the port byte
    pub data_beg: usize,
    /// Length of the application payload
    pub data_len: usize,
}

impl<'a> RxFrame<'a> {
    /// Wrap a frame
    pub fn new(frame: &'a [u8], data_beg: usize, data_len: usize) -> Self {
        Self {
            frame,
            data_beg,
            data_len,
        }
    }

    /// Message type from the MAC header
    pub fn mtype(&self) -> Option<MType> {
        self.frame.get(MHDR_OFFSET).copied().map(MType::from_mhdr)
    }

    /// Frame header flags
    pub fn fctrl(&self) -> Option<FCtrl> {
        self.frame.get(FCTRL_OFFSET).copied().map(FCtrl::from_byte)
    }

    /// Application payload
    pub fn payload(&self) -> Option<&'a [u8]> {
        let end = self.data_beg.checked_add(self.data_len)?;
        self.frame.get(self.data_beg..end)
    }

    /// Application port, if the frame has a payload
    pub fn port(&self) -> Option<u8> {
        if self.data_len == 0 {
            return None;
        }
        self.frame.get(self.data_beg.checked_sub(1)?).copied()
    }

    /// Split the frame into MAC commands or application data
    pub fn classify(&self) -> FrameKind<'a> {
        match self.mtype() {
            Some(mtype) if !mtype.is_data_down() => return FrameKind::Unexpected(mtype),
            Some(_) => {}
            None => return FrameKind::Malformed,
        }
        let Some(fctrl) = self.fctrl() else {
            return FrameKind::Malformed;
        };
        if fctrl.f_opts_len > 0 {
            let end = FOPTS_OFFSET + fctrl.f_opts_len as usize;
            return match self.frame.get(FOPTS_OFFSET..end) {
                Some(fopts) => FrameKind::MacCommands(fopts),
                None => FrameKind::Malformed,
            };
        }
        if self.data_len == 0 {
            return FrameKind::Empty;
        }
        match (self.port(), self.payload()) {
            (Some(0), Some(payload)) => FrameKind::MacCommands(payload),
            (Some(port), Some(payload)) => FrameKind::Application { port, payload },
            _ => FrameKind::Malformed,
        }
    }
}
