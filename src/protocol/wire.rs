//! Message encoding and decoding.
//!
//! Decoding validates the frame length against the declared message type
//! before any field is interpreted, so a short or inconsistent frame is
//! rejected as a whole.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::WireError;
use crate::protocol::{DATA_HEADER_LEN, MAX_FRAGMENT_PAYLOAD, MessageType};

/// One fragment of a sensor sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFragment {
    /// Sending device.
    pub device_id: u8,
    /// Position of this fragment, 0-based.
    pub fragment_index: u8,
    /// Number of fragments in the sample; identical on every fragment.
    pub total_fragments: u8,
    /// Fragment payload, at most `MAX_FRAGMENT_PAYLOAD` bytes.
    pub payload: Bytes,
}

impl DataFragment {
    /// Creates a fragment, checking the index and payload bounds.
    ///
    /// # Errors
    ///
    /// Returns a `WireError` if `fragment_index >= total_fragments` or the
    /// payload exceeds `MAX_FRAGMENT_PAYLOAD`.
    pub fn new(
        device_id: u8,
        fragment_index: u8,
        total_fragments: u8,
        payload: Bytes,
    ) -> Result<Self, WireError> {
        if fragment_index >= total_fragments {
            return Err(WireError::InvalidFragment {
                index: fragment_index,
                total: total_fragments,
            });
        }
        if payload.len() > MAX_FRAGMENT_PAYLOAD {
            return Err(WireError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_FRAGMENT_PAYLOAD,
            });
        }
        Ok(Self {
            device_id,
            fragment_index,
            total_fragments,
            payload,
        })
    }

    /// Returns true if this is the last fragment of its sample.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.fragment_index as u16 + 1 == self.total_fragments as u16
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Registration request, broadcast by the coordinator.
    Discover,
    /// Registration reply from a sensor.
    Register { device_id: u8 },
    /// Sample request addressed to one sensor.
    Poll { device_id: u8 },
    /// Sample fragment from a sensor.
    Data(DataFragment),
}

impl Message {
    /// Returns the message type discriminator.
    #[must_use]
    pub const fn kind(&self) -> MessageType {
        match self {
            Self::Discover => MessageType::Discover,
            Self::Register { .. } => MessageType::Register,
            Self::Poll { .. } => MessageType::Poll,
            Self::Data(_) => MessageType::Data,
        }
    }

    /// Returns the number of bytes `encode` produces for this message.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Data(fragment) => DATA_HEADER_LEN + fragment.payload.len(),
            other => other.kind().min_len(),
        }
    }
}

/// Encodes a message into a single frame.
///
/// # Panics
///
/// Panics if a `Data` payload exceeds `MAX_FRAGMENT_PAYLOAD`; fragments
/// built through `DataFragment::new` never do.
#[must_use]
pub fn encode(message: &Message) -> Bytes {
    let mut buf = BytesMut::with_capacity(message.encoded_len());
    buf.put_u8(message.kind().into());

    match message {
        Message::Discover => {}
        Message::Register { device_id } | Message::Poll { device_id } => {
            buf.put_u8(*device_id);
        }
        Message::Data(fragment) => {
            assert!(
                fragment.payload.len() <= MAX_FRAGMENT_PAYLOAD,
                "fragment payload exceeds maximum"
            );
            buf.put_u8(fragment.device_id);
            buf.put_u8(fragment.fragment_index);
            buf.put_u8(fragment.total_fragments);
            buf.put_u8(fragment.payload.len() as u8);
            buf.put_slice(&fragment.payload);
        }
    }

    buf.freeze()
}

/// Decodes one frame into a message.
///
/// Trailing bytes beyond the declared layout are ignored.
///
/// # Errors
///
/// Returns a `WireError` if the frame is empty, carries an unknown type,
/// is shorter than its type's layout, or declares an inconsistent fragment.
pub fn decode(frame: &[u8]) -> Result<Message, WireError> {
    let Some(&tag) = frame.first() else {
        return Err(WireError::Empty);
    };
    let kind = MessageType::from_byte(tag).ok_or(WireError::UnknownType(tag))?;

    if frame.len() < kind.min_len() {
        return Err(WireError::TooShort {
            message: kind,
            need: kind.min_len(),
            got: frame.len(),
        });
    }

    let mut cursor = &frame[1..];

    match kind {
        MessageType::Discover => Ok(Message::Discover),
        MessageType::Register => Ok(Message::Register {
            device_id: cursor.get_u8(),
        }),
        MessageType::Poll => Ok(Message::Poll {
            device_id: cursor.get_u8(),
        }),
        MessageType::Data => {
            let device_id = cursor.get_u8();
            let fragment_index = cursor.get_u8();
            let total_fragments = cursor.get_u8();
            let payload_len = cursor.get_u8() as usize;

            if payload_len > MAX_FRAGMENT_PAYLOAD {
                return Err(WireError::PayloadTooLarge {
                    size: payload_len,
                    max: MAX_FRAGMENT_PAYLOAD,
                });
            }
            if cursor.remaining() < payload_len {
                return Err(WireError::Truncated {
                    expected: payload_len,
                    got: cursor.remaining(),
                });
            }

            let payload = Bytes::copy_from_slice(&cursor[..payload_len]);
            DataFragment::new(device_id, fragment_index, total_fragments, payload)
                .map(Message::Data)
        }
    }
}
