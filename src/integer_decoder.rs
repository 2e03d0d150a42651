//! Arithmetic integer decoding (Annex A).
//!
//! "An invocation of an arithmetic integer decoding procedure involves
//! decoding a sequence of bits, where each bit is decoded using a context
//! formed by the bits decoded previously in this invocation." (A.1)

use std::io::{Read, Seek};

use crate::arithmetic_decoder::ArithmeticDecoder;
use crate::context::ContextMemory;
use crate::error::{DecodeError, Result};

/// The result of an arithmetic integer decoding procedure (A.2): either a
/// signed value, or the out-of-band sentinel some higher-level procedures
/// use to mark "no more items".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerValue {
    /// A decoded signed integer.
    Value(i64),
    /// "OOB if S = 1 and V = 0" (A.2).
    Oob,
}

impl IntegerValue {
    /// Unwrap a non-OOB value, failing with `CorruptedStream` on OOB.
    pub fn require_value(self) -> Result<i64> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Oob => Err(DecodeError::CorruptedStream),
        }
    }
}

/// Length/offset table driving the prefix tree of A.2 / Figure A.1.
const PREFIX_TABLE: [(u32, i64); 6] =
    [(2, 0), (4, 4), (6, 20), (8, 84), (12, 340), (32, 4436)];

/// An arithmetic integer decoder (A.2): owns the 512-entry context array a
/// single "IAx" procedure requires, and decodes a stream of integers
/// against a shared `ArithmeticDecoder`.
pub struct IntegerDecoder {
    contexts: ContextMemory,
}

impl IntegerDecoder {
    /// Create a decoder with a fresh, zero-initialized context array.
    ///
    /// "Each arithmetic integer decoding procedure requires 512 bytes of
    /// storage for its context memory." (A.2)
    pub fn new() -> Self {
        Self { contexts: ContextMemory::new(512) }
    }

    /// Decode one integer (A.2, Figure A.1).
    pub fn decode<R: Read + Seek>(&mut self, ad: &mut ArithmeticDecoder<'_, R>) -> Result<IntegerValue> {
        let mut prev: u32 = 1;

        let s = self.decode_bit(ad, &mut prev)?;

        let mut prefix_len = 0;
        while prefix_len < PREFIX_TABLE.len() - 1 {
            if self.decode_bit(ad, &mut prev)? == 0 {
                break;
            }
            prefix_len += 1;
        }
        let (bits_to_read, offset) = PREFIX_TABLE[prefix_len];

        let v = self.decode_n_bits(ad, &mut prev, bits_to_read)? as i64 + offset;

        Ok(if s == 0 {
            IntegerValue::Value(v)
        } else if v > 0 {
            IntegerValue::Value(-v)
        } else {
            IntegerValue::Oob
        })
    }

    /// Decode a single prefix-tree bit and advance `prev` (A.2, step 3).
    #[inline]
    fn decode_bit<R: Read + Seek>(
        &mut self,
        ad: &mut ArithmeticDecoder<'_, R>,
        prev: &mut u32,
    ) -> Result<u32> {
        let context = (*prev & 0x1FF) as usize;
        let bit = ad.decode(&mut self.contexts, context)? as u32;

        *prev = if *prev < 256 {
            (*prev << 1) | bit
        } else {
            (((*prev << 1) | bit) & 511) | 256
        };

        Ok(bit)
    }

    fn decode_n_bits<R: Read + Seek>(
        &mut self,
        ad: &mut ArithmeticDecoder<'_, R>,
        prev: &mut u32,
        n: u32,
    ) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.decode_bit(ad, prev)?;
        }
        Ok(value)
    }
}

impl Default for IntegerDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a symbol id (`IAID`, A.3): a plain fixed-width binary tree walk,
/// no sign bit and no prefix-length escalation.
///
/// `cx` must have at least `1 << (sym_code_len + 1)` entries ("the IAID
/// decoding procedure requires `2^(SBSYMCODELEN+1)` bytes of context
/// storage", A.3).
pub fn decode_iaid<R: Read + Seek>(
    ad: &mut ArithmeticDecoder<'_, R>,
    cx: &mut ContextMemory,
    sym_code_len: u32,
) -> Result<u32> {
    let mut prev: u32 = 1;
    for _ in 0..sym_code_len {
        let bit = ad.decode(cx, prev as usize)? as u32;
        prev = (prev << 1) | bit;
    }
    Ok(prev - (1 << sym_code_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::BitReader;
    use std::io::Cursor;

    #[test]
    fn decode_does_not_panic_on_short_streams() {
        let data: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
        let mut reader = BitReader::new(Cursor::new(&data[..])).unwrap();
        let mut ad = ArithmeticDecoder::new(&mut reader).unwrap();
        let mut decoder = IntegerDecoder::new();
        let result = decoder.decode(&mut ad);
        assert!(result.is_ok());
    }

    #[test]
    fn iaid_stays_within_declared_code_length() {
        let data: [u8; 8] = [0x55, 0xAA, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let mut reader = BitReader::new(Cursor::new(&data[..])).unwrap();
        let mut ad = ArithmeticDecoder::new(&mut reader).unwrap();
        let mut cx = ContextMemory::new(1 << 5);
        let id = decode_iaid(&mut ad, &mut cx, 4).unwrap();
        assert!(id < (1 << 4));
    }
}
