//! Fixed frame header preceding every payload.

use crate::error::ProtocolError;
use crate::limits::MAX_PAYLOAD_SIZE;
use crate::operation::Operation;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Decoded frame header: operation tag followed by payload byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw operation tag.
    pub tag: u32,
    /// Number of payload bytes following the header.
    pub payload_size: u32,
}

impl Header {
    /// Builds a header for a known operation.
    #[must_use]
    pub const fn new(operation: Operation, payload_size: u32) -> Self {
        Self {
            tag: operation.tag(),
            payload_size,
        }
    }

    /// Returns the operation named by the tag, if the tag is known.
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        Operation::from_tag(self.tag)
    }

    /// Checks the declared payload size against the protocol maximum and
    /// returns it as a byte count.
    pub fn checked_payload_size(&self) -> Result<usize, ProtocolError> {
        usize::try_from(self.payload_size)
            .ok()
            .filter(|size| *size <= MAX_PAYLOAD_SIZE)
            .ok_or(ProtocolError::Oversized {
                size: self.payload_size,
                max: MAX_PAYLOAD_SIZE,
            })
    }

    /// Encodes the header in host byte order.
    #[expect(
        clippy::host_endian_bytes,
        reason = "the daemon exchanges raw host-order structs over a local socket"
    )]
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0_u8; HEADER_SIZE];
        let (tag, size) = bytes.split_at_mut(4);
        tag.copy_from_slice(&self.tag.to_ne_bytes());
        size.copy_from_slice(&self.payload_size.to_ne_bytes());
        bytes
    }

    /// Decodes a header from host byte order.
    #[expect(
        clippy::host_endian_bytes,
        reason = "the daemon exchanges raw host-order structs over a local socket"
    )]
    #[must_use]
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let [t0, t1, t2, t3, s0, s1, s2, s3] = *bytes;
        Self {
            tag: u32::from_ne_bytes([t0, t1, t2, t3]),
            payload_size: u32::from_ne_bytes([s0, s1, s2, s3]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_survives_encoding() {
        let header = Header::new(Operation::DomainDefine, 4096);
        assert_eq!(Header::decode(&header.encode()), header);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let header = Header {
            tag: Operation::GetVersion.tag(),
            payload_size: u32::MAX,
        };
        assert_eq!(
            header.checked_payload_size(),
            Err(ProtocolError::Oversized {
                size: u32::MAX,
                max: MAX_PAYLOAD_SIZE,
            })
        );
    }

    #[test]
    fn maximum_payload_is_accepted() {
        let header = Header {
            tag: Operation::ListDefinedDomains.tag(),
            payload_size: 5008,
        };
        assert_eq!(header.checked_payload_size(), Ok(MAX_PAYLOAD_SIZE));
    }
}
