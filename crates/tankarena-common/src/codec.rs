//! The wire codec. A length-independent byte buffer with a write half
//! (`ByteWriter`) and a read half with a cursor (`ByteReader`). All
//! multi-byte values are big-endian on the wire; the host is assumed
//! little-endian, so every write/read does an explicit byte-order swap
//! (`to_be_bytes`/`from_be_bytes`) rather than relying on host order.
//!
//! No other serializer is permitted in packet assembly/parsing: every
//! packet in `tankarena-game`/`tankarena-server` is built and parsed
//! exclusively through this module.

use crate::error::CodecError;

/// An append-only, growable output buffer, without a fixed `maxsize` cap —
/// outbound packets here are small and bounded by the packet catalog
/// itself, not by a shared scratch buffer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    data: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: Vec::with_capacity(cap),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.data.push(v);
        self
    }

    pub fn write_i16(&mut self, v: i16) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_f32(&mut self, v: f32) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// `u16`-length-prefixed raw bytes. Truncation past `u16::MAX` bytes is
    /// not attempted — callers clamp string content (name/chat length
    /// limits) well below that bound before reaching here.
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        debug_assert!(bytes.len() <= u16::MAX as usize);
        self.write_u16(bytes.len() as u16);
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }
}

/// A read-only view over a received frame plus a cursor, returning
/// `Result` on short reads rather than a sentinel value.
pub struct ByteReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                field,
                consumed: self.cursor,
            });
        }
        let slice = &self.data[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        let b = self.take(2, "i16")?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2, "u16")?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        let b = self.take(4, "i32")?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4, "u32")?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        let b = self.take(4, "f32")?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        let b = self.take(8, "f64")?;
        Ok(f64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// `u16`-length-prefixed UTF-8 string. Fails with `MalformedFrame` when
    /// the declared length exceeds the remaining bytes — this is the one
    /// place the codec distinguishes "ran off the end of a fixed field"
    /// (`UnexpectedEof`) from "the frame lied about its own length"
    /// (`MalformedFrame`), since the latter is the shape protocol-violation
    /// detection needs to key off of.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u16()? as usize;
        if len > self.remaining() {
            return Err(CodecError::MalformedFrame {
                len,
                remaining: self.remaining(),
            });
        }
        let bytes = self.take(len, "string body")?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
