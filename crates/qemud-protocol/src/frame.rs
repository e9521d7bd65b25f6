//! One complete header and payload unit.

use crate::error::ProtocolError;
use crate::header::{HEADER_SIZE, Header};
use crate::limits::MAX_PAYLOAD_SIZE;
use crate::operation::Operation;

/// A frame with a receive buffer large enough for any payload variant.
///
/// Only `payload_size` bytes travel on the wire, but the buffer always spans
/// [`MAX_PAYLOAD_SIZE`] zeroed bytes so any variant decodes without reading
/// past the end.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    header: Header,
    payload: Box<[u8; MAX_PAYLOAD_SIZE]>,
}

impl Frame {
    /// Builds an empty frame for `operation`.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            header: Header::new(operation, 0),
            payload: Box::new([0_u8; MAX_PAYLOAD_SIZE]),
        }
    }

    /// Prepares a receive frame for a header read from the peer.
    ///
    /// Fails without allocating when the declared payload is larger than the
    /// protocol allows.
    pub fn for_header(header: Header) -> Result<Self, ProtocolError> {
        header.checked_payload_size()?;
        Ok(Self {
            header,
            payload: Box::new([0_u8; MAX_PAYLOAD_SIZE]),
        })
    }

    /// Returns the frame header.
    #[must_use]
    pub const fn header(&self) -> Header {
        self.header
    }

    /// Returns the operation named by the header tag, if known.
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        self.header.operation()
    }

    /// Number of payload bytes carried on the wire.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.header
            .checked_payload_size()
            .unwrap_or(MAX_PAYLOAD_SIZE)
    }

    /// The full zero-padded payload buffer.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.payload.as_slice()
    }

    /// The bytes of the payload that travel on the wire.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.payload
            .get(..self.payload_len())
            .unwrap_or_default()
    }

    /// Mutable view of the wire payload, used while receiving.
    pub fn body_mut(&mut self) -> &mut [u8] {
        let len = self.payload_len();
        self.payload.get_mut(..len).unwrap_or_default()
    }

    /// Encodes header and wire payload into one contiguous buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.payload_len());
        bytes.extend_from_slice(&self.header.encode());
        bytes.extend_from_slice(self.body());
        bytes
    }

    pub(crate) fn payload_buffer_mut(&mut self) -> &mut [u8] {
        self.payload.as_mut_slice()
    }

    pub(crate) fn set_payload_len(&mut self, len: usize) -> Result<(), ProtocolError> {
        let operation = self.operation().map_or("unknown", Operation::name);
        self.header.payload_size = u32::try_from(len)
            .ok()
            .filter(|_| len <= MAX_PAYLOAD_SIZE)
            .ok_or(ProtocolError::LayoutOverflow {
                operation,
                max: MAX_PAYLOAD_SIZE,
            })?;
        Ok(())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Frame")
            .field("header", &self.header)
            .field("payload_len", &self.payload_len())
            .finish_non_exhaustive()
    }
}
