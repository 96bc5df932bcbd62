/// Identifiers of the MAC commands a device receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandIdentifier {
    /// Answer to a link check request
    LinkCheckAns = 0x02,
    /// Data rate, TX power and channel mask change
    LinkADRReq = 0x03,
    /// Maximum aggregated duty cycle
    DutyCycleReq = 0x04,
    /// RX2 / RX1 offset parameters
    RXParamSetupReq = 0x05,
    /// Battery and margin status request
    DevStatusReq = 0x06,
    /// Channel creation or modification
    NewChannelReq = 0x07,
    /// RX1 delay
    RXTimingSetupReq = 0x08,
    /// Dwell time and maximum EIRP
    TxParamSetupReq = 0x09,
    /// Downlink frequency of a channel
    DlChannelReq = 0x0A,
    /// Network time
    DeviceTimeAns = 0x0D,
}

impl CommandIdentifier {
    /// Look up a command identifier
    pub fn from_byte(cid: u8) -> Option<Self> {
        match cid {
            0x02 => Some(CommandIdentifier::LinkCheckAns),
            0x03 => Some(CommandIdentifier::LinkADRReq),
            0x04 => Some(CommandIdentifier::DutyCycleReq),
            0x05 => Some(CommandIdentifier::RXParamSetupReq),
            0x06 => Some(CommandIdentifier::DevStatusReq),
            0x07 => Some(CommandIdentifier::NewChannelReq),
            0x08 => Some(CommandIdentifier::RXTimingSetupReq),
            0x09 => Some(CommandIdentifier::TxParamSetupReq),
            0x0A => Some(CommandIdentifier::DlChannelReq),
            0x0D => Some(CommandIdentifier::DeviceTimeAns),
            _ => None,
        }
    }

    /// Length of the command payload, identifier excluded
    pub fn payload_len(&self) -> usize {
        match self {
            CommandIdentifier::LinkCheckAns => 2,
            CommandIdentifier::LinkADRReq => 4,
            CommandIdentifier::DutyCycleReq => 1,
            CommandIdentifier::RXParamSetupReq => 4,
            CommandIdentifier::DevStatusReq => 0,
            CommandIdentifier::NewChannelReq => 5,
            CommandIdentifier::RXTimingSetupReq => 1,
            CommandIdentifier::TxParamSetupReq => 1,
            CommandIdentifier::DlChannelReq => 4,
            CommandIdentifier::DeviceTimeAns => 5,
        }
    }
}

/// Iterator over the commands packed in a FOpts field or port 0 payload
///
/// Yields `Err(cid)` for an unknown identifier and stops there, since the length of an
/// unknown command cannot be known. A truncated last command also ends the iteration.
#[derive(Debug, Clone)]
pub struct MacCommands<'a> {
    bytes: &'a [u8],
}

impl<'a> MacCommands<'a> {
    /// Iterate over packed commands
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl<'a> Iterator for MacCommands<'a> {
    type Item = Result<(CommandIdentifier, &'a [u8]), u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&cid, rest) = self.bytes.split_first()?;
        let Some(command) = CommandIdentifier::from_byte(cid) else {
            self.bytes = &[];
            return Some(Err(cid));
        };
        let len = command.payload_len();
        if rest.len() < len {
            self.bytes = &[];
            return None;
        }
        let (payload, rest) = rest.split_at(len);
        self.bytes = rest;
        Some(Ok((command, payload)))
    }
}
