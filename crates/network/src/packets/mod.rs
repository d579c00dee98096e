pub mod clientbound;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

pub type DecodeResult<T> = std::result::Result<T, PacketDecodeError>;

#[derive(Debug, Error)]
pub enum PacketDecodeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid utf-8 string: {0}")]
    FromUtf8(#[from] std::string::FromUtf8Error),
    #[error("VarInt is too big")]
    VarIntTooBig,
    #[error("{0}")]
    Malformed(String),
}

impl<T: std::convert::AsRef<[u8]>> PacketDecoderExt for Cursor<T> {}

pub trait PacketDecoderExt: Read + Sized {
    fn read_unsigned_byte(&mut self) -> DecodeResult<u8> {
        Ok(self.read_u8()?)
    }

    fn read_byte(&mut self) -> DecodeResult<i8> {
        Ok(self.read_i8()?)
    }

    /// Reads exactly `bytes` bytes. The buffer only grows as data arrives, so
    /// a length prefix larger than the body fails instead of allocating.
    fn read_bytes(&mut self, bytes: usize) -> DecodeResult<Vec<u8>> {
        let mut read = Vec::new();
        self.by_ref().take(bytes as u64).read_to_end(&mut read)?;
        if read.len() != bytes {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(read)
    }

    fn read_long(&mut self) -> DecodeResult<i64> {
        Ok(self.read_i64::<BigEndian>()?)
    }

    fn read_int(&mut self) -> DecodeResult<i32> {
        Ok(self.read_i32::<BigEndian>()?)
    }

    fn read_double(&mut self) -> DecodeResult<f64> {
        Ok(self.read_f64::<BigEndian>()?)
    }

    fn read_float(&mut self) -> DecodeResult<f32> {
        Ok(self.read_f32::<BigEndian>()?)
    }

    fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_u8()? == 1)
    }

    fn read_varint(&mut self) -> DecodeResult<i32> {
        let mut num_read = 0;
        let mut result = 0i32;
        loop {
            if num_read == 5 {
                return Err(PacketDecodeError::VarIntTooBig);
            }
            let read = self.read_byte()? as u8;
            let value = (read & 0b0111_1111) as i32;
            result |= value << (7 * num_read);

            num_read += 1;
            if read & 0b1000_0000 == 0 {
                break;
            }
        }
        Ok(result)
    }

    fn read_string(&mut self) -> DecodeResult<String> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(PacketDecodeError::Malformed(format!(
                "negative string length {length}"
            )));
        }
        Ok(String::from_utf8(self.read_bytes(length as usize)?)?)
    }

    fn read_to_end(&mut self) -> DecodeResult<Vec<u8>> {
        let mut data = Vec::new();
        Read::read_to_end(self, &mut data)?;
        Ok(data)
    }
}

pub trait PacketEncoderExt: Write {
    fn write_boolean(&mut self, val: bool) {
        self.write_all(&[val as u8]).unwrap();
    }

    fn write_bytes(&mut self, val: &[u8]) {
        self.write_all(val).unwrap();
    }

    fn write_varint(&mut self, val: i32) {
        let _ = self.write_all(&PacketEncoder::varint(val));
    }

    fn write_byte(&mut self, val: i8) {
        self.write_all(&[val as u8]).unwrap();
    }

    fn write_unsigned_byte(&mut self, val: u8) {
        self.write_all(&[val]).unwrap();
    }

    fn write_int(&mut self, val: i32) {
        self.write_i32::<BigEndian>(val).unwrap();
    }

    fn write_long(&mut self, val: i64) {
        self.write_i64::<BigEndian>(val).unwrap();
    }

    fn write_double(&mut self, val: f64) {
        self.write_f64::<BigEndian>(val).unwrap();
    }

    fn write_float(&mut self, val: f32) {
        self.write_f32::<BigEndian>(val).unwrap();
    }

    fn write_string(&mut self, n: usize, val: &str) {
        if val.len() > n * 4 + 3 {
            panic!("Tried to write string longer than the max length!");
        }
        self.write_varint(val.len() as i32);
        self.write_all(val.as_bytes()).unwrap();
    }

    fn write_identifier(&mut self, val: &str) {
        self.write_string(32767, val);
    }
}

// Writing into a `Vec` cannot fail, which is what makes the `unwrap`s above sound.
impl PacketEncoderExt for Vec<u8> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketEncoder {
    buffer: Vec<u8>,
    packet_id: u32,
}

impl PacketEncoder {
    pub fn new(buffer: Vec<u8>, packet_id: u32) -> PacketEncoder {
        PacketEncoder { buffer, packet_id }
    }

    // This function is seperate because it is needed when writing packet headers
    pub fn varint(val: i32) -> Vec<u8> {
        let mut val = val as u32;
        let mut buf = Vec::new();
        loop {
            let mut temp = (val & 0b0111_1111) as u8;
            val >>= 7;
            if val != 0 {
                temp |= 0b1000_0000;
            }
            buf.push(temp);
            if val == 0 {
                return buf;
            }
        }
    }

    pub fn packet_id(&self) -> u32 {
        self.packet_id
    }

    /// The packet body, without the length and id header.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn write_uncompressed(&self, mut w: impl Write) -> io::Result<()> {
        let packet_id = PacketEncoder::varint(self.packet_id as i32);
        let length = PacketEncoder::varint((self.buffer.len() + packet_id.len()) as i32);

        w.write_all(&length)?;
        w.write_all(&packet_id)?;
        w.write_all(&self.buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        assert_eq!(PacketEncoder::varint(0), vec![0x00]);
        assert_eq!(PacketEncoder::varint(127), vec![0x7f]);
        assert_eq!(PacketEncoder::varint(128), vec![0x80, 0x01]);
        assert_eq!(PacketEncoder::varint(255), vec![0xff, 0x01]);
        assert_eq!(PacketEncoder::varint(-1), vec![0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn varint_reads_back() {
        let mut buf = Vec::new();
        buf.write_varint(25565);
        buf.write_varint(-1);
        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_varint().unwrap(), 25565);
        assert_eq!(cursor.read_varint().unwrap(), -1);
    }

    #[test]
    fn oversized_varint_is_rejected() {
        let mut cursor = Cursor::new(vec![0xff; 6]);
        assert!(matches!(
            cursor.read_varint(),
            Err(PacketDecodeError::VarIntTooBig)
        ));
    }

    #[test]
    fn string_longer_than_body_is_rejected() {
        let mut buf = Vec::new();
        buf.write_varint(i32::MAX);
        buf.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(buf);
        assert!(matches!(cursor.read_string(), Err(PacketDecodeError::Io(_))));
    }

    #[test]
    fn uncompressed_frame_has_length_and_id() {
        let encoder = PacketEncoder::new(vec![1, 2, 3], 0x11);
        let mut out = Vec::new();
        encoder.write_uncompressed(&mut out).unwrap();
        assert_eq!(out, vec![4, 0x11, 1, 2, 3]);
    }
}
