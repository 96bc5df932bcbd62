use super::{Codec, CodecError};
use crate::message::{InboundMessage, Message, MessageBuffer};

/// Passes payload bytes through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Uplink = MessageBuffer;
    type Downlink = MessageBuffer;

    fn encode(&self, payload: &Self::Uplink) -> Result<Message, CodecError> {
        Ok(Message::from(payload.clone()))
    }

    fn decode_uplink(&self, message: &Message) -> Result<Self::Uplink, CodecError> {
        MessageBuffer::from_slice(message.as_bytes()).map_err(|_| CodecError::TooLong)
    }

    fn decode_downlink(&self, message: &InboundMessage) -> Result<Self::Downlink, CodecError> {
        self.decode_uplink(&message.message)
    }
}
