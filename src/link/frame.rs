// Link-layer wire format:
//   data frame [type:1][seq:2][payload_len:2][payload:1000][crc32:4]
//   ack frame  [type:1][ack_num:2][crc32:4]
// Multi-byte fields are little-endian; the CRC covers all preceding bytes.
// Unused payload is zero-padded before the CRC is computed, and frames are
// never mutated afterwards.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::dsp::crc::crc32;
use crate::utils::consts::{ACK_FRAME_SIZE, DATA_FRAME_SIZE, PAYLOAD_SIZE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("unknown frame type tag {0:#04x}")]
    UnknownType(u8),
    #[error("payload of {0} bytes exceeds frame capacity")]
    Oversized(usize),
    #[error("payload length field {0} is out of range")]
    BadLength(usize),
    #[error("crc mismatch")]
    Crc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Data = 0x01,
    Ack = 0x02,
}

impl FrameType {
    pub fn from_u8(value: u8) -> Result<Self, FrameError> {
        match value {
            0x01 => Ok(FrameType::Data),
            0x02 => Ok(FrameType::Ack),
            other => Err(FrameError::UnknownType(other)),
        }
    }

    /// Total on-air frame length for this type
    pub fn frame_size(self) -> usize {
        match self {
            FrameType::Data => DATA_FRAME_SIZE,
            FrameType::Ack => ACK_FRAME_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub seq: u16,
    /// Used payload only (at most PAYLOAD_SIZE bytes); padding is added
    /// during serialization
    pub payload: Vec<u8>,
}

impl DataFrame {
    pub fn new(seq: u16, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > PAYLOAD_SIZE {
            return Err(FrameError::Oversized(payload.len()));
        }
        Ok(Self {
            seq,
            payload: payload.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; DATA_FRAME_SIZE];
        buf[0] = FrameType::Data as u8;
        LittleEndian::write_u16(&mut buf[1..3], self.seq);
        LittleEndian::write_u16(&mut buf[3..5], self.payload.len() as u16);
        buf[5..5 + self.payload.len()].copy_from_slice(&self.payload);
        let crc = crc32(&buf[..DATA_FRAME_SIZE - 4]);
        LittleEndian::write_u32(&mut buf[DATA_FRAME_SIZE - 4..], crc);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < DATA_FRAME_SIZE {
            return Err(FrameError::Truncated {
                expected: DATA_FRAME_SIZE,
                got: buf.len(),
            });
        }
        let buf = &buf[..DATA_FRAME_SIZE];

        if FrameType::from_u8(buf[0])? != FrameType::Data {
            return Err(FrameError::UnknownType(buf[0]));
        }

        let stored_crc = LittleEndian::read_u32(&buf[DATA_FRAME_SIZE - 4..]);
        if crc32(&buf[..DATA_FRAME_SIZE - 4]) != stored_crc {
            return Err(FrameError::Crc);
        }

        let seq = LittleEndian::read_u16(&buf[1..3]);
        let len = LittleEndian::read_u16(&buf[3..5]) as usize;
        if len > PAYLOAD_SIZE {
            return Err(FrameError::BadLength(len));
        }

        Ok(Self {
            seq,
            payload: buf[5..5 + len].to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    pub ack_num: u16,
}

impl AckFrame {
    pub fn new(ack_num: u16) -> Self {
        Self { ack_num }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; ACK_FRAME_SIZE];
        buf[0] = FrameType::Ack as u8;
        LittleEndian::write_u16(&mut buf[1..3], self.ack_num);
        let crc = crc32(&buf[..ACK_FRAME_SIZE - 4]);
        LittleEndian::write_u32(&mut buf[ACK_FRAME_SIZE - 4..], crc);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < ACK_FRAME_SIZE {
            return Err(FrameError::Truncated {
                expected: ACK_FRAME_SIZE,
                got: buf.len(),
            });
        }
        let buf = &buf[..ACK_FRAME_SIZE];

        if FrameType::from_u8(buf[0])? != FrameType::Ack {
            return Err(FrameError::UnknownType(buf[0]));
        }

        let stored_crc = LittleEndian::read_u32(&buf[ACK_FRAME_SIZE - 4..]);
        if crc32(&buf[..ACK_FRAME_SIZE - 4]) != stored_crc {
            return Err(FrameError::Crc);
        }

        Ok(Self {
            ack_num: LittleEndian::read_u16(&buf[1..3]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_frame_sizing() {
        let frame = DataFrame::new(7, b"abc").unwrap();
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), 1009);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(LittleEndian::read_u16(&bytes[3..5]), 3);
        // payload region zero-padded after "abc"
        assert_eq!(&bytes[5..8], b"abc");
        assert!(bytes[8..1005].iter().all(|&b| b == 0));
        // CRC is the last 4 bytes and covers everything before it
        let crc = LittleEndian::read_u32(&bytes[1005..]);
        assert_eq!(crc, crc32(&bytes[..1005]));
    }

    #[test]
    fn test_data_frame_roundtrip() {
        let frame = DataFrame::new(0xBEEF, b"payload bytes").unwrap();
        let decoded = DataFrame::from_bytes(&frame.to_bytes()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_full_payload() {
        let payload = vec![0x55u8; PAYLOAD_SIZE];
        let frame = DataFrame::new(1, &payload).unwrap();
        let decoded = DataFrame::from_bytes(&frame.to_bytes()).unwrap();
        assert_eq!(decoded.payload, payload);

        assert_eq!(
            DataFrame::new(1, &vec![0u8; PAYLOAD_SIZE + 1]),
            Err(FrameError::Oversized(PAYLOAD_SIZE + 1))
        );
    }

    #[test]
    fn test_corruption_rejected() {
        let mut bytes = DataFrame::new(3, b"xyz").unwrap().to_bytes();
        bytes[100] ^= 0x10;
        assert_eq!(DataFrame::from_bytes(&bytes), Err(FrameError::Crc));
    }

    #[test]
    fn test_truncated_input() {
        let bytes = DataFrame::new(3, b"xyz").unwrap().to_bytes();
        assert!(matches!(
            DataFrame::from_bytes(&bytes[..500]),
            Err(FrameError::Truncated { .. })
        ));
        assert!(matches!(
            AckFrame::from_bytes(&[0x02, 0x00]),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn test_ack_frame_roundtrip() {
        let ack = AckFrame::new(0x0102);
        let bytes = ack.to_bytes();
        assert_eq!(bytes.len(), 7);
        assert_eq!(bytes[0], 0x02);
        assert_eq!(AckFrame::from_bytes(&bytes).unwrap(), ack);
    }

    #[test]
    fn test_unknown_type_tag() {
        assert_eq!(FrameType::from_u8(0x7F), Err(FrameError::UnknownType(0x7F)));
    }
}
