/*!
A memory-safe, pure-Rust JBIG2 decoding core.

`jbig2-core` implements the bit-level decoding pipeline of ITU-T T.88 (also
known as ISO/IEC 14492): the MQ-style arithmetic entropy decoder, the
arithmetic integer decoder, and the generic and halftone region decoding
procedures, plus the packed bitmap and blitter primitives they produce and
combine.

This crate is deliberately narrow. It decodes the *contents* of a generic or
halftone region once a caller has located that region's arithmetic-coded
data; it does not parse the JBIG2 segment stream, decode MMR (T.6), decode
text or symbol dictionaries, or do anything with colour or scaling. Those
are the responsibility of a higher-level file-format reader built on top of
this core.

# Example
```rust,no_run
use std::io::Cursor;
use jbig2_core::region::generic::{GenericRegionParams, GenericTemplate, decode_generic_region};
use jbig2_core::BitReader;

let data: &[u8] = &[/* arithmetic-coded region data */];
let mut reader = BitReader::new(Cursor::new(data)).unwrap();
let params = GenericRegionParams {
    template: GenericTemplate::Template0,
    at_pixels: GenericTemplate::Template0.default_at_pixels().to_vec(),
    tpgdon: false,
};
let bitmap = decode_generic_region(&mut reader, 64, 64, &params, None, false).unwrap();
println!("{}x{} region", bitmap.width(), bitmap.height());
```

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]

mod arithmetic_decoder;
mod bitmap;
mod blit;
mod context;
mod error;
mod integer_decoder;
mod reader;
pub mod region;

pub use arithmetic_decoder::ArithmeticDecoder;
pub use bitmap::Bitmap;
pub use blit::{CombinationOperator, blit};
pub use context::ContextMemory;
pub use error::{DecodeError, Result};
pub use integer_decoder::{IntegerDecoder, IntegerValue, decode_iaid};
pub use reader::BitReader;
