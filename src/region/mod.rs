//! Region decoding procedures (6.2, 6.6): the two decoders that turn
//! arithmetic-coded bit streams into bitmaps.

pub mod generic;
pub mod halftone;
