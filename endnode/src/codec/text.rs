use heapless::String;

use super::{Codec, CodecError};
use crate::message::{InboundMessage, Message, MAX_MESSAGE_LEN};

/// Text payload
pub type Text = String<MAX_MESSAGE_LEN>;

/// UTF-8 text payloads
///
/// With `nul_terminated` every uplink carries a trailing NUL, as expected by C string
/// decoders on the application server. Trailing NULs are always stripped when decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec {
    /// Append a NUL byte to encoded uplinks
    pub nul_terminated: bool,
}

impl TextCodec {
    /// Create a codec without NUL terminator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec appending a NUL terminator
    pub fn nul_terminated() -> Self {
        Self {
            nul_terminated: true,
        }
    }

    fn decode_bytes(bytes: &[u8]) -> Result<Text, CodecError> {
        let end = bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        let text = core::str::from_utf8(&bytes[..end]).map_err(|_| CodecError::Malformed)?;
        let mut decoded = Text::new();
        decoded.push_str(text).map_err(|_| CodecError::TooLong)?;
        Ok(decoded)
    }
}

impl Codec for TextCodec {
    type Uplink = Text;
    type Downlink = Text;

    fn encode(&self, payload: &Self::Uplink) -> Result<Message, CodecError> {
        let mut message = Message::from_slice(payload.as_bytes())?;
        if self.nul_terminated {
            message
                .buffer_mut()
                .push(0)
                .map_err(|_| CodecError::TooLong)?;
        }
        Ok(message)
    }

    fn decode_uplink(&self, message: &Message) -> Result<Self::Uplink, CodecError> {
        Self::decode_bytes(message.as_bytes())
    }

    fn decode_downlink(&self, message: &InboundMessage) -> Result<Self::Downlink, CodecError> {
        Self::decode_bytes(message.as_bytes())
    }
}
