//! The MQ-style arithmetic entropy decoder (Annex E).
//!
//! "The arithmetic decoding procedure receives an arithmetically coded bit
//! sequence and an associated sequence of context labels, and reconstructs
//! the original string of binary symbols." (E.1.1)
//!
//! Every other decoding procedure in this crate (the integer decoder, the
//! generic region decoder, the halftone bit-plane decoder) is built on top
//! of a single primitive: `decode`, one adaptively-coded bit at a time.

use std::io::{Read, Seek};

use crate::context::ContextMemory;
use crate::error::Result;
use crate::reader::BitReader;

/// The arithmetic decoder state (E.3).
///
/// Holds the `A`/`C`/`CT`/`B` registers of Table E.1 plus a borrow of the
/// bit-stream reader it draws fresh bytes from. A decoder instance is
/// scoped to a single region's data: it is created once `INITDEC` has run
/// and dropped once that region is fully decoded.
pub struct ArithmeticDecoder<'r, R> {
    reader: &'r mut BitReader<R>,
    /// `C` - the code register.
    c: u32,
    /// `A` - the interval register.
    a: u32,
    /// `CT` - bits remaining in the low byte of `C` before a refill is due.
    ct: i32,
    /// `B` - the most recently consumed byte, for stuff-byte detection.
    b: u8,
}

impl<'r, R: Read + Seek> ArithmeticDecoder<'r, R> {
    /// Run `INITDEC` (E.3.5) against `reader` and return a ready decoder.
    pub fn new(reader: &'r mut BitReader<R>) -> Result<Self> {
        let b = reader.read_byte()?;
        let mut decoder = Self { reader, c: (b as u32) << 16, a: 0, ct: 0, b };

        let ct = decoder.byte_in()?;
        decoder.ct = ct as i32 - 7;
        decoder.c <<= 7;
        decoder.a = 0x8000;

        Ok(decoder)
    }

    /// Decode one bit under `context` (E.3.2, the `DECODE` procedure).
    #[inline]
    pub fn decode(&mut self, cx: &mut ContextMemory, context: usize) -> Result<u8> {
        let mps = cx.mps(context)?;
        let qe_row = &QE_TABLE[cx.probability_index(context)? as usize];

        let chigh = self.c >> 16;

        let bit = if chigh >= qe_row.qe {
            self.c -= qe_row.qe << 16;
            self.a -= qe_row.qe;

            if self.a & 0x8000 != 0 {
                return Ok(mps);
            }

            let bit = self.exchange_mps(cx, context, mps, qe_row)?;
            self.renormalize()?;
            bit
        } else {
            let bit = self.exchange_lps(cx, context, mps, qe_row)?;
            self.renormalize()?;
            bit
        };

        Ok(bit)
    }

    /// `MPS_EXCHANGE` (E.3.2, Figure E.16): conditional exchange taken when
    /// renormalization is required after decoding along the MPS path.
    #[inline]
    fn exchange_mps(
        &mut self,
        cx: &mut ContextMemory,
        context: usize,
        mps: u8,
        qe_row: &QeEntry,
    ) -> Result<u8> {
        if self.a < qe_row.qe {
            let new_mps = if qe_row.switch { 1 - mps } else { mps };
            cx.set_state(context, qe_row.nlps, new_mps)?;
            Ok(1 - mps)
        } else {
            cx.set_state(context, qe_row.nmps, mps)?;
            Ok(mps)
        }
    }

    /// `LPS_EXCHANGE` (E.3.2, Figure E.17): conditional exchange taken on
    /// the LPS path, which can still yield an MPS output bit.
    ///
    /// The conditional test compares the *pre-assignment* interval
    /// (`A < Qe`, where `A` is the value `DECODE` had before it took the
    /// LPS branch) — `A` itself is only set to `Qe` afterwards, in both
    /// branches. Testing `A` after that assignment would compare `Qe` to
    /// itself and always take the same branch.
    #[inline]
    fn exchange_lps(
        &mut self,
        cx: &mut ContextMemory,
        context: usize,
        mps: u8,
        qe_row: &QeEntry,
    ) -> Result<u8> {
        let a_was_less = self.a < qe_row.qe;
        self.a = qe_row.qe;

        if a_was_less {
            cx.set_state(context, qe_row.nmps, mps)?;
            Ok(mps)
        } else {
            let new_mps = if qe_row.switch { 1 - mps } else { mps };
            cx.set_state(context, qe_row.nlps, new_mps)?;
            Ok(1 - mps)
        }
    }

    /// `RENORMD` (E.3.3, Figure E.18): shift `A` and `C` left until `A`
    /// regains its 16-bit significance, refilling `C` from the stream as needed.
    #[inline]
    fn renormalize(&mut self) -> Result<()> {
        loop {
            if self.ct == 0 {
                let ct = self.byte_in()?;
                self.ct = ct as i32;
            }

            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.a & 0x8000 != 0 {
                break;
            }
        }

        Ok(())
    }

    /// `BYTEIN` (E.3.4, Figure E.19): refill the low byte of `C`, watching
    /// for the byte-stuffing JBIG2 inserts after a literal `0xFF` data byte.
    fn byte_in(&mut self) -> Result<u32> {
        if self.b == 0xFF {
            let mark = self.reader.position();
            let b1 = self.reader.read_byte()?;

            if b1 < 0x90 {
                self.b = b1;
                self.c = self.c.wrapping_add((b1 as u32) << 9);
                Ok(7)
            } else {
                // Marker code: push the byte back, it belongs to whatever
                // follows this region's arithmetic-coded data.
                #[cfg(feature = "logging")]
                log::debug!("arithmetic decoder hit marker code 0xFF{b1:02X} at offset {mark}");
                self.reader.seek(mark)?;
                self.c = self.c.wrapping_add(0xFF00);
                Ok(8)
            }
        } else {
            let b1 = self.reader.read_byte()?;
            self.b = b1;
            self.c = self.c.wrapping_add((b1 as u32) << 8);
            Ok(8)
        }
    }
}

/// One row of the Qe probability-estimation table (Table E.1).
#[derive(Debug, Clone, Copy)]
struct QeEntry {
    /// The probability estimate for the LPS.
    qe: u32,
    /// Next state index after coding the MPS.
    nmps: u8,
    /// Next state index after coding the LPS.
    nlps: u8,
    /// Whether the sense of MPS flips on this LPS transition.
    switch: bool,
}

macro_rules! qe {
    ($($qe:expr, $nmps:expr, $nlps:expr, $switch:expr),+ $(,)?) => {
        [$(QeEntry { qe: $qe, nmps: $nmps, nlps: $nlps, switch: $switch }),+]
    };
}

/// "Table E.1 - Qe values and probability estimation process"
#[rustfmt::skip]
static QE_TABLE: [QeEntry; 47] = qe!(
    // Index  Qe_Value  NMPS  NLPS  SWITCH
    /*  0 */ 0x5601,    1,    1,    true,
    /*  1 */ 0x3401,    2,    6,    false,
    /*  2 */ 0x1801,    3,    9,    false,
    /*  3 */ 0x0AC1,    4,    12,   false,
    /*  4 */ 0x0521,    5,    29,   false,
    /*  5 */ 0x0221,    38,   33,   false,
    /*  6 */ 0x5601,    7,    6,    true,
    /*  7 */ 0x5401,    8,    14,   false,
    /*  8 */ 0x4801,    9,    14,   false,
    /*  9 */ 0x3801,    10,   14,   false,
    /* 10 */ 0x3001,    11,   17,   false,
    /* 11 */ 0x2401,    12,   18,   false,
    /* 12 */ 0x1C01,    13,   20,   false,
    /* 13 */ 0x1601,    29,   21,   false,
    /* 14 */ 0x5601,    15,   14,   true,
    /* 15 */ 0x5401,    16,   14,   false,
    /* 16 */ 0x5101,    17,   15,   false,
    /* 17 */ 0x4801,    18,   16,   false,
    /* 18 */ 0x3801,    19,   17,   false,
    /* 19 */ 0x3401,    20,   18,   false,
    /* 20 */ 0x3001,    21,   19,   false,
    /* 21 */ 0x2801,    22,   19,   false,
    /* 22 */ 0x2401,    23,   20,   false,
    /* 23 */ 0x2201,    24,   21,   false,
    /* 24 */ 0x1C01,    25,   22,   false,
    /* 25 */ 0x1801,    26,   23,   false,
    /* 26 */ 0x1601,    27,   24,   false,
    /* 27 */ 0x1401,    28,   25,   false,
    /* 28 */ 0x1201,    29,   26,   false,
    /* 29 */ 0x1101,    30,   27,   false,
    /* 30 */ 0x0AC1,    31,   28,   false,
    /* 31 */ 0x09C1,    32,   29,   false,
    /* 32 */ 0x08A1,    33,   30,   false,
    /* 33 */ 0x0521,    34,   31,   false,
    /* 34 */ 0x0441,    35,   32,   false,
    /* 35 */ 0x02A1,    36,   33,   false,
    /* 36 */ 0x0221,    37,   34,   false,
    /* 37 */ 0x0141,    38,   35,   false,
    /* 38 */ 0x0111,    39,   36,   false,
    /* 39 */ 0x0085,    40,   37,   false,
    /* 40 */ 0x0049,    41,   38,   false,
    /* 41 */ 0x0025,    42,   39,   false,
    /* 42 */ 0x0015,    43,   40,   false,
    /* 43 */ 0x0009,    44,   41,   false,
    /* 44 */ 0x0005,    45,   42,   false,
    /* 45 */ 0x0001,    45,   43,   false,
    /* 46 */ 0x5601,    46,   46,   false,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariants_hold_after_decode() {
        // Test data borrowed from the published MQ-coder conformance sequence
        // (ISO/IEC 14492 Annex H / T.88 Annex H test data).
        let data: &[u8] = &[
            0x00, 0x02, 0x00, 0x51, 0x00, 0x00, 0x00, 0xC0, 0x03, 0x52, 0x87, 0x2A, 0xAA, 0xAA,
            0xAA, 0xAA, 0x82, 0xC0, 0x20, 0x00, 0xFC, 0xE7, 0x9A, 0x0A, 0x88, 0x23, 0x83, 0x4C,
            0x88, 0x00, 0x93, 0xB0, 0x05, 0x1C, 0xBF, 0x42, 0x00, 0x80, 0xC0, 0x00, 0xB3, 0xA6,
            0x86, 0x06, 0xD5, 0x00, 0xE4, 0x00, 0x7E, 0xC1, 0x00, 0x00, 0x60, 0x00, 0x00, 0x00,
            0x00, 0x00, 0xFF, 0xAC,
        ];
        let mut reader = BitReader::new(std::io::Cursor::new(data)).unwrap();
        let mut decoder = ArithmeticDecoder::new(&mut reader).unwrap();
        assert_eq!(decoder.a, 0x8000);

        // The decoded bit sequence for this vector, single context, is fixed
        // by the standard: wrong MPS/LPS exchange logic (e.g. testing the
        // post-assignment `A` in LPS_EXCHANGE instead of the pre-assignment
        // one) flips bits partway through this run.
        const EXPECTED: &str = "100101010101011100101010111100001100001110011000000101111001101000111010110010110011011001111111101111011111111111110101101001011101101101100000011000110000011111001101000111100101001101001110001111110110001100010000001110001111011111111110101111011100101";

        let mut cx = ContextMemory::new(1);
        let mut decoded = String::with_capacity(255);
        for _ in 0..255 {
            let bit = decoder.decode(&mut cx, 0).unwrap();
            decoded.push(if bit == 0 { '0' } else { '1' });
            assert!(decoder.a >= 0x8000 && decoder.a < 0x10000);
            assert!(decoder.ct >= 0);
        }

        assert_eq!(decoded, EXPECTED);
    }

    #[test]
    fn context_memory_round_trips_through_decode() {
        let data: &[u8] = &[0x84, 0xC7, 0x3B, 0xFC, 0xE1, 0xA1, 0x43, 0x04, 0x02, 0x20, 0x00, 0x00];
        let mut reader = BitReader::new(std::io::Cursor::new(data)).unwrap();
        let mut decoder = ArithmeticDecoder::new(&mut reader).unwrap();
        let mut cx = ContextMemory::new(2);

        let bit = decoder.decode(&mut cx, 0).unwrap();
        assert!(bit == 0 || bit == 1);
        // Decoding under context 1 must not disturb context 0's state.
        let untouched = cx.get(1).unwrap();
        assert_eq!(untouched, 0);
    }
}
