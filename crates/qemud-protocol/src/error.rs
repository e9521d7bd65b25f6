//! Errors raised while encoding or decoding frames.

use thiserror::Error;

/// Errors surfaced by the frame codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A header declared more payload bytes than any variant can hold.
    #[error("payload of {size} bytes exceeds {max} byte limit")]
    Oversized {
        /// Declared payload size.
        size: u32,
        /// Largest payload the protocol defines.
        max: usize,
    },
    /// The operation tag is not part of the protocol.
    #[error("unknown operation tag {tag}")]
    UnknownOperation {
        /// Raw tag read from the header.
        tag: u32,
    },
    /// A text value does not fit its fixed-capacity field.
    #[error("{field} is {len} bytes long; at most {max} bytes fit")]
    TextTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Byte length of the rejected value.
        len: usize,
        /// Longest value the field accepts.
        max: usize,
    },
    /// A text value contains an embedded NUL byte.
    #[error("{field} contains an embedded NUL byte")]
    EmbeddedNul {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A listing declared an entry count outside its array bounds.
    #[error("{field} count {count} is outside 0..={max}")]
    CountOutOfRange {
        /// Name of the listing.
        field: &'static str,
        /// Declared count.
        count: i32,
        /// Array capacity.
        max: usize,
    },
    /// A variant layout ran past the payload buffer.
    #[error("payload layout for {operation} overruns the {max} byte buffer")]
    LayoutOverflow {
        /// Operation whose layout overflowed.
        operation: &'static str,
        /// Payload buffer size.
        max: usize,
    },
}
