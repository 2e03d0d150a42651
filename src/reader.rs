//! The bit-stream reader that sits between the byte source and the rest of
//! the decoding pipeline.
//!
//! "JBIG2 streams are either sequential or random-access" and segment
//! headers reference byte offsets into them, so the core assumes a
//! seekable backing store rather than a plain forward-only reader.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{DecodeError, Result};

/// A seekable bit-stream over an arbitrary `Read + Seek` byte source.
///
/// Bits are consumed MSB-first within each byte. The reader tracks its
/// position in bits so that `read_bit`/`read_bits` can be interleaved
/// with byte-aligned reads; `seek` always lands on a byte boundary.
pub struct BitReader<R> {
    inner: R,
    len: u64,
    /// Byte offset of the next unread byte.
    byte_pos: u64,
    /// Number of high bits of `cur_byte` already consumed (0..=7).
    bit_pos: u8,
    /// The byte currently being consumed bit by bit, if any.
    cur_byte: Option<u8>,
}

impl<R: Read + Seek> BitReader<R> {
    /// Wrap `inner` as a bit-stream reader, starting at its current position.
    pub fn new(mut inner: R) -> Result<Self> {
        let pos = inner.stream_position().map_err(|_| DecodeError::EndOfStream { offset: 0 })?;
        let len = inner.seek(SeekFrom::End(0)).map_err(|_| DecodeError::EndOfStream { offset: 0 })?;
        inner
            .seek(SeekFrom::Start(pos))
            .map_err(|_| DecodeError::EndOfStream { offset: pos })?;

        Ok(Self {
            inner,
            len,
            byte_pos: pos,
            bit_pos: 0,
            cur_byte: None,
        })
    }

    /// Total length of the underlying byte source, in bytes.
    pub fn length(&self) -> u64 {
        self.len
    }

    /// Current position, in bytes. If a partial byte is being consumed
    /// bit-by-bit, this is the offset of that byte (not yet advanced past it).
    pub fn position(&self) -> u64 {
        self.byte_pos
    }

    /// Seek to an absolute byte offset, discarding any partially-consumed byte.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|_| DecodeError::EndOfStream { offset })?;
        self.byte_pos = offset;
        self.bit_pos = 0;
        self.cur_byte = None;
        Ok(())
    }

    /// Read the next raw byte, consuming it whole.
    ///
    /// Fails if a bit-level read has left the stream mid-byte; callers that
    /// mix `read_bit` and `read_byte` are responsible for aligning first.
    pub fn read_byte(&mut self) -> Result<u8> {
        debug_assert_eq!(self.bit_pos, 0, "read_byte called mid-byte");

        let mut buf = [0u8; 1];
        let offset = self.byte_pos;
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| DecodeError::EndOfStream { offset })?;
        self.byte_pos += 1;
        Ok(buf[0])
    }

    /// Read a single bit, MSB-first within the current byte.
    pub fn read_bit(&mut self) -> Result<u32> {
        if self.cur_byte.is_none() {
            let offset = self.byte_pos;
            let mut buf = [0u8; 1];
            self.inner
                .read_exact(&mut buf)
                .map_err(|_| DecodeError::EndOfStream { offset })?;
            self.cur_byte = Some(buf[0]);
            self.byte_pos += 1;
        }

        let byte = self.cur_byte.unwrap();
        let shift = 7 - self.bit_pos;
        let bit = (byte >> shift) & 1;

        if self.bit_pos == 7 {
            self.bit_pos = 0;
            self.cur_byte = None;
        } else {
            self.bit_pos += 1;
        }

        Ok(bit as u32)
    }

    /// Read `count` bits (1..=32), big-endian (MSB first) within the stream.
    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        debug_assert!((1..=32).contains(&count));

        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    /// Read `len` bytes into a freshly-allocated buffer.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        debug_assert_eq!(self.bit_pos, 0, "read_bytes called mid-byte");

        let offset = self.byte_pos;
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| DecodeError::EndOfStream { offset })?;
        self.byte_pos += len as u64;
        Ok(buf)
    }
}
