//! Fixed-width binary codec used for every packet on the wire.
//!
//! All numeric fields are 4 bytes, little-endian. Strings are a `u32` byte
//! length followed by UTF-8 bytes zero-padded to the next 4-byte boundary, so
//! every field starts on an aligned offset. A packet always begins with its
//! `u32` type tag.

use crate::math::Point;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Longest string field accepted by either end, in bytes.
pub const MAX_STRING_LENGTH: usize = 1024;

/// Bytes taken by the type tag at the front of every packet.
pub const TAG_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("unexpected end of packet at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("string of {len} bytes exceeds the {max} byte limit")]
    StringTooLong { len: usize, max: usize },
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    #[error("unknown packet type tag {0}")]
    UnknownPacketType(u32),
    #[error("invalid {field} value {value}")]
    InvalidValue { field: &'static str, value: u32 },
    #[error("payload encoding failed: {0}")]
    Payload(String),
}

/// Bytes a string occupies once written: length prefix, bytes, padding.
pub fn string_field_size(value: &str) -> usize {
    4 + padded_len(value.len())
}

/// Bytes a fixed-shape payload occupies once written.
pub fn payload_size<T: Serialize>(payload: &T) -> Result<usize, CodecError> {
    bincode::serialized_size(payload)
        .map(|size| size as usize)
        .map_err(|e| CodecError::Payload(e.to_string()))
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// An immutable, tagged byte buffer ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
}

impl Packet {
    /// Wraps bytes received from the transport. Only the tag is validated.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CodecError> {
        if bytes.len() < TAG_SIZE {
            return Err(CodecError::UnexpectedEnd {
                offset: 0,
                needed: TAG_SIZE,
                available: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    pub fn tag(&self) -> u32 {
        u32::from_le_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.len() == TAG_SIZE
    }

    /// Reader positioned just after the type tag.
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader {
            bytes: &self.bytes,
            offset: TAG_SIZE,
        }
    }
}

/// Accumulates fields into a growable buffer that starts with the type tag.
#[derive(Debug)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    pub fn new(tag: u32) -> Self {
        Self::with_capacity(tag, 64)
    }

    /// Pre-sizes the buffer for `payload_len` bytes after the tag.
    pub fn with_capacity(tag: u32, payload_len: usize) -> Self {
        let mut buffer = Vec::with_capacity(TAG_SIZE + payload_len);
        buffer.extend_from_slice(&tag.to_le_bytes());
        Self { buffer }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u32(value as u32);
    }

    pub fn write_point(&mut self, point: Point) {
        self.write_f32(point.x);
        self.write_f32(point.y);
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        let len = value.len();
        if len > MAX_STRING_LENGTH {
            return Err(CodecError::StringTooLong {
                len,
                max: MAX_STRING_LENGTH,
            });
        }
        self.write_u32(len as u32);
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.resize(self.buffer.len() + padded_len(len) - len, 0);
        Ok(())
    }

    /// Appends a fixed-shape payload struct. Payload structs are made of
    /// 4-byte fields only, so their encoding stays aligned.
    pub fn write_payload<T: Serialize>(&mut self, payload: &T) -> Result<(), CodecError> {
        bincode::serialize_into(&mut self.buffer, payload)
            .map_err(|e| CodecError::Payload(e.to_string()))
    }

    /// Bytes written so far, including the tag.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == TAG_SIZE
    }

    pub fn finish(self) -> Packet {
        Packet {
            bytes: self.buffer,
        }
    }
}

/// Consumes fields in the order they were written.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> PacketReader<'a> {
    /// Reader over raw bytes, starting at the type tag.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let available = self.remaining();
        if needed > available {
            return Err(CodecError::UnexpectedEnd {
                offset: self.offset,
                needed,
                available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn take_word(&mut self) -> Result<[u8; 4], CodecError> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.take(4)?);
        Ok(word)
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.take_word().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.take_word().map(i32::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        self.take_word().map(f32::from_le_bytes)
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::InvalidValue {
                field: "bool",
                value,
            }),
        }
    }

    pub fn read_point(&mut self) -> Result<Point, CodecError> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        Ok(Point::new(x, y))
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u32()? as usize;
        if len > MAX_STRING_LENGTH {
            return Err(CodecError::StringTooLong {
                len,
                max: MAX_STRING_LENGTH,
            });
        }
        let bytes = self.take(len)?;
        self.pad_offset(padded_len(len) - len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn read_payload<T: DeserializeOwned>(&mut self) -> Result<T, CodecError> {
        let mut rest = &self.bytes[self.offset..];
        let before = rest.len();
        let payload =
            bincode::deserialize_from(&mut rest).map_err(|e| CodecError::Payload(e.to_string()))?;
        self.offset += before - rest.len();
        Ok(payload)
    }

    /// Reads an array length and checks that at least `element_size` bytes per
    /// element remain, so a corrupt count cannot trigger a huge allocation.
    pub fn read_count(&mut self, element_size: usize) -> Result<usize, CodecError> {
        let count = self.read_u32()? as usize;
        let needed = count.saturating_mul(element_size);
        if needed > self.remaining() {
            return Err(CodecError::UnexpectedEnd {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        Ok(count)
    }

    /// Skips `len` bytes without decoding them.
    pub fn pad_offset(&mut self, len: usize) -> Result<(), CodecError> {
        self.take(len).map(|_| ())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_at_end(&self) -> bool {
        self.offset == self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestPayload {
        health: f32,
        count: u32,
    }

    #[test]
    fn test_tagged_position_and_string() {
        let mut writer = PacketWriter::new(7);
        writer.write_point(Point::new(123.5, -40.25));
        writer.write_string("cow").unwrap();
        assert_eq!(writer.len(), 20);

        let packet = writer.finish();
        assert_eq!(packet.len(), 20);

        let mut reader = PacketReader::new(packet.as_bytes());
        assert_eq!(reader.read_u32().unwrap(), 7);
        let position = reader.read_point().unwrap();
        assert_eq!(position.x, 123.5);
        assert_eq!(position.y, -40.25);
        assert_eq!(reader.read_string().unwrap(), "cow");
        assert!(reader.is_at_end());
        assert_eq!(reader.offset(), packet.as_bytes().len());
    }

    #[test]
    fn test_packet_reader_skips_tag() {
        let mut writer = PacketWriter::new(42);
        writer.write_i32(-5);
        let packet = writer.finish();

        assert_eq!(packet.tag(), 42);
        let mut reader = packet.reader();
        assert_eq!(reader.read_i32().unwrap(), -5);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_string_padding_keeps_alignment() {
        for text in ["", "a", "ab", "abc", "abcd", "abcde"] {
            let mut writer = PacketWriter::new(1);
            writer.write_string(text).unwrap();
            writer.write_u32(99);
            assert_eq!(writer.len(), 4 + string_field_size(text) + 4);
            assert_eq!(writer.len() % 4, 0);

            let packet = writer.finish();
            let mut reader = packet.reader();
            assert_eq!(reader.read_string().unwrap(), text);
            assert_eq!(reader.read_u32().unwrap(), 99);
        }
    }

    #[test]
    fn test_string_too_long_is_rejected() {
        let mut writer = PacketWriter::new(1);
        let long = "x".repeat(MAX_STRING_LENGTH + 1);
        assert!(matches!(
            writer.write_string(&long),
            Err(CodecError::StringTooLong { .. })
        ));
        assert_eq!(writer.len(), 4);
    }

    #[test]
    fn test_payload_round_trip_and_skip() {
        let payload = TestPayload {
            health: 17.5,
            count: 3,
        };
        assert_eq!(payload_size(&payload).unwrap(), 8);

        let mut writer = PacketWriter::new(2);
        writer.write_payload(&payload).unwrap();
        writer.write_payload(&payload).unwrap();
        writer.write_u32(11);
        let packet = writer.finish();

        let mut reader = packet.reader();
        let decoded: TestPayload = reader.read_payload().unwrap();
        assert_eq!(decoded, payload);
        reader.pad_offset(8).unwrap();
        assert_eq!(reader.read_u32().unwrap(), 11);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_truncated_input_errors() {
        let mut reader = PacketReader::new(&[1, 0]);
        assert!(matches!(
            reader.read_u32(),
            Err(CodecError::UnexpectedEnd {
                offset: 0,
                needed: 4,
                available: 2
            })
        ));

        assert!(Packet::from_bytes(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_read_count_guards_against_huge_lengths() {
        let mut writer = PacketWriter::new(1);
        writer.write_u32(1_000_000);
        writer.write_u32(0);
        let packet = writer.finish();

        let mut reader = packet.reader();
        assert!(reader.read_count(4).is_err());
    }

    #[test]
    fn test_invalid_bool_and_utf8() {
        let mut writer = PacketWriter::new(1);
        writer.write_u32(2);
        writer.write_u32(2);
        writer.write_u32(0xFFFF);
        let packet = writer.finish();

        let mut reader = packet.reader();
        assert!(matches!(
            reader.read_bool(),
            Err(CodecError::InvalidValue { value: 2, .. })
        ));
        assert_eq!(reader.read_string(), Err(CodecError::InvalidUtf8));
    }
}
