use core::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use super::{Codec, CodecError};
use crate::message::{InboundMessage, Message, MAX_MESSAGE_LEN};

/// Serde types in postcard's compact binary encoding
///
/// `U` is the uplink payload type, `D` the downlink one.
pub struct PostcardCodec<U, D> {
    _types: PhantomData<fn() -> (U, D)>,
}

impl<U, D> PostcardCodec<U, D> {
    /// Create the codec
    pub const fn new() -> Self {
        Self {
            _types: PhantomData,
        }
    }
}

impl<U, D> Default for PostcardCodec<U, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U, D> Codec for PostcardCodec<U, D>
where
    U: Serialize + DeserializeOwned,
    D: DeserializeOwned,
{
    type Uplink = U;
    type Downlink = D;

    fn encode(&self, payload: &U) -> Result<Message, CodecError> {
        let mut scratch = [0u8; MAX_MESSAGE_LEN];
        let used = ::postcard::to_slice(payload, &mut scratch).map_err(|err| match err {
            ::postcard::Error::SerializeBufferFull => CodecError::TooLong,
            _ => CodecError::Malformed,
        })?;
        Ok(Message::from_slice(used)?)
    }

    fn decode_uplink(&self, message: &Message) -> Result<U, CodecError> {
        ::postcard::from_bytes(message.as_bytes()).map_err(|_| CodecError::Malformed)
    }

    fn decode_downlink(&self, message: &InboundMessage) -> Result<D, CodecError> {
        ::postcard::from_bytes(message.as_bytes()).map_err(|_| CodecError::Malformed)
    }
}
