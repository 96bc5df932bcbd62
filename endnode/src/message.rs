//! Uplink and downlink message buffers
//!
//! Messages are fixed-capacity byte buffers copied by value into queue slots. The
//! capacity is bounded by the largest application payload a LoRaWAN frame can carry.

use core::ops::Deref;

use heapless::Vec;

use crate::mac::{TxError, TxRxFlags};

/// Maximum application payload size
pub const MAX_MESSAGE_LEN: usize = 242;

/// Payload bytes of a message
pub type MessageBuffer = Vec<u8, MAX_MESSAGE_LEN>;

/// The data does not fit into a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferTooSmall;

/// Message buffer = bytes + length
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    buf: MessageBuffer,
}

impl Message {
    /// Create an empty message
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Copy `data` into a new message
    pub fn from_slice(data: &[u8]) -> Result<Self, BufferTooSmall> {
        Vec::from_slice(data)
            .map(|buf| Self { buf })
            .map_err(|_| BufferTooSmall)
    }

    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable access to the underlying buffer, used by codecs while encoding
    pub fn buffer_mut(&mut self) -> &mut MessageBuffer {
        &mut self.buf
    }

    /// Payload length
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Deref for Message {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl From<MessageBuffer> for Message {
    fn from(buf: MessageBuffer) -> Self {
        Self { buf }
    }
}

/// Uplink message = message buffer + ack request + result of the last attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Encoded payload
    pub message: Message,
    /// Whether the network must acknowledge the message
    pub ack_requested: bool,
    /// Flags reported by the engine after the last transmission attempt
    pub last_flags: TxRxFlags,
    /// Error returned by the engine on the last send attempt, if any
    pub transport_error: Option<TxError>,
}

impl OutboundMessage {
    /// Create a message that has not been sent yet
    pub fn new(message: Message, ack_requested: bool) -> Self {
        Self {
            message,
            ack_requested,
            last_flags: TxRxFlags::empty(),
            transport_error: None,
        }
    }

    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.message.as_bytes()
    }
}

/// Downlink message, built on every reception and discarded after delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Application port the frame was received on
    pub port: u8,
    /// Payload
    pub message: Message,
}

impl InboundMessage {
    /// Copy a received payload
    pub fn new(port: u8, payload: &[u8]) -> Result<Self, BufferTooSmall> {
        Ok(Self {
            port,
            message: Message::from_slice(payload)?,
        })
    }

    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.message.as_bytes()
    }
}
