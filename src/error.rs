//! Error types for JBIG2 decoding.

use std::fmt;

/// The result type returned by every fallible operation in this crate.
pub type Result<T> = core::result::Result<T, DecodeError>;

/// The error type for JBIG2 core decoding operations.
///
/// Every variant corresponds to one of the failure kinds a conforming
/// decoder can report (ISO/IEC 14492, Annex E and clause 6). Decoding
/// never returns a partial bitmap on error: the caller gets either a
/// complete, correct region or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The byte source was exhausted before a required read completed.
    ///
    /// Carries the byte offset, from the start of the sub-stream the
    /// failing read began at, so the caller can correlate the failure
    /// with the segment that produced it.
    EndOfStream {
        /// Offset into the stream at which the short read began.
        offset: u64,
    },
    /// A header field violates the ranges mandated by the standard
    /// (e.g. a generic region template outside `0..=3`, or a halftone
    /// grid dimension of zero paired with a non-empty region).
    InvalidHeaderValue(&'static str),
    /// A decoded index fell outside the bounds of the structure it
    /// indexes: a halftone gray-scale value with no corresponding
    /// pattern, or a context index beyond the allocated context array.
    IndexOutOfBounds,
    /// The arithmetic decoder's renormalization procedure ran into a
    /// marker byte where data was expected, or the integer decoder
    /// produced a value outside its declared range.
    CorruptedStream,
    /// The request reached a code path this core intentionally does
    /// not implement (MMR/T.6 coding is an out-of-scope external
    /// collaborator; see the crate's module documentation).
    Unsupported(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream { offset } => {
                write!(f, "unexpected end of stream at byte offset {offset}")
            }
            Self::InvalidHeaderValue(field) => write!(f, "invalid header value: {field}"),
            Self::IndexOutOfBounds => write!(f, "index out of bounds"),
            Self::CorruptedStream => write!(f, "corrupted arithmetic-coded stream"),
            Self::Unsupported(what) => write!(f, "unsupported: {what}"),
        }
    }
}

impl std::error::Error for DecodeError {}
