//! Message type definitions for the sensor grid protocol.
//!
//! The message type is the first byte of every frame and indicates
//! which fixed layout follows.

/// Message kinds exchanged between coordinator and sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Coordinator broadcast asking sensors to register.
    Discover = 0x01,
    /// Sensor reply to `Discover`.
    Register = 0x02,
    /// Coordinator request for one sensor's current sample.
    Poll = 0x03,
    /// One fragment of a sensor sample.
    Data = 0x04,
}

impl MessageType {
    /// Attempts to parse a message type from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Discover),
            0x02 => Some(Self::Register),
            0x03 => Some(Self::Poll),
            0x04 => Some(Self::Data),
            _ => None,
        }
    }

    /// Minimum encoded length of a message of this type.
    #[must_use]
    pub const fn min_len(self) -> usize {
        match self {
            Self::Discover => 1,
            Self::Register | Self::Poll => 2,
            Self::Data => super::DATA_HEADER_LEN,
        }
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind as Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_from_byte() {
        assert_eq!(MessageType::from_byte(0x01), Some(MessageType::Discover));
        assert_eq!(MessageType::from_byte(0x04), Some(MessageType::Data));
        assert_eq!(MessageType::from_byte(0x00), None);
        assert_eq!(MessageType::from_byte(0xFF), None);
    }

    #[test]
    fn test_min_len() {
        assert_eq!(MessageType::Discover.min_len(), 1);
        assert_eq!(MessageType::Poll.min_len(), 2);
        assert_eq!(MessageType::Data.min_len(), 5);
    }
}
