//! Payload codecs
//!
//! The runtime never interprets payload bytes itself. Uplink payloads are encoded into a
//! [`Message`] when queued and decoded again when the completion policy needs to know
//! what kind of message was sent; downlink payloads are decoded before reaching the
//! application. Concrete formats are swappable:
//! - [`RawCodec`]: bytes in, bytes out
//! - [`TextCodec`]: UTF-8 text
//! - [`PostcardCodec`]: serde types in a compact binary encoding

/// Postcard (serde) codec
pub mod postcard;

/// Raw byte codec
pub mod raw;

/// Text codec
pub mod text;

pub use self::postcard::PostcardCodec;
pub use raw::RawCodec;
pub use text::TextCodec;

use crate::message::{BufferTooSmall, InboundMessage, Message};

/// Codec error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Encoded payload does not fit into a message
    TooLong,
    /// Bytes do not decode to a payload
    Malformed,
}

impl From<BufferTooSmall> for CodecError {
    fn from(_: BufferTooSmall) -> Self {
        CodecError::TooLong
    }
}

/// Encode/decode contract between application payloads and message bytes
pub trait Codec {
    /// Application payload sent to the network
    type Uplink;
    /// Application payload received from the network
    type Downlink;

    /// Encode an uplink payload
    fn encode(&self, payload: &Self::Uplink) -> Result<Message, CodecError>;

    /// Decode a queued uplink message back into its payload
    fn decode_uplink(&self, message: &Message) -> Result<Self::Uplink, CodecError>;

    /// Decode a received downlink
    fn decode_downlink(&self, message: &InboundMessage) -> Result<Self::Downlink, CodecError>;
}
