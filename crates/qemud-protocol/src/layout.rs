//! C-layout cursors over the fixed payload buffer.
//!
//! Payload variants are plain C structs on the daemon side. The cursors
//! reproduce natural alignment: each scalar is placed on a multiple of its
//! own size, and the finished struct is padded to its widest member.

use uuid::Uuid;

use crate::error::ProtocolError;
use crate::limits::{MAX_PAYLOAD_SIZE, UUID_RAW_LEN, max_text_len};

/// Writes one payload variant into a zeroed buffer.
pub(crate) struct PayloadWriter<'a> {
    operation: &'static str,
    buffer: &'a mut [u8],
    position: usize,
    alignment: usize,
}

impl<'a> PayloadWriter<'a> {
    pub(crate) fn new(operation: &'static str, buffer: &'a mut [u8]) -> Self {
        Self {
            operation,
            buffer,
            position: 0,
            alignment: 1,
        }
    }

    fn align_to(&mut self, alignment: usize) {
        self.position = self.position.next_multiple_of(alignment);
        self.alignment = self.alignment.max(alignment);
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let end = self.position.saturating_add(bytes.len());
        let slot = self
            .buffer
            .get_mut(self.position..end)
            .ok_or(ProtocolError::LayoutOverflow {
                operation: self.operation,
                max: MAX_PAYLOAD_SIZE,
            })?;
        slot.copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    #[expect(
        clippy::host_endian_bytes,
        reason = "the daemon exchanges raw host-order structs over a local socket"
    )]
    pub(crate) fn put_i32(&mut self, value: i32) -> Result<(), ProtocolError> {
        self.align_to(4);
        self.put_bytes(&value.to_ne_bytes())
    }

    #[expect(
        clippy::host_endian_bytes,
        reason = "the daemon exchanges raw host-order structs over a local socket"
    )]
    pub(crate) fn put_u32(&mut self, value: u32) -> Result<(), ProtocolError> {
        self.align_to(4);
        self.put_bytes(&value.to_ne_bytes())
    }

    #[expect(
        clippy::host_endian_bytes,
        reason = "the daemon exchanges raw host-order structs over a local socket"
    )]
    pub(crate) fn put_u64(&mut self, value: u64) -> Result<(), ProtocolError> {
        self.align_to(8);
        self.put_bytes(&value.to_ne_bytes())
    }

    pub(crate) fn put_uuid(&mut self, uuid: &Uuid) -> Result<(), ProtocolError> {
        self.put_bytes(uuid.as_bytes())
    }

    /// Writes `value` into a field of `capacity` bytes, zero filling the tail.
    pub(crate) fn put_text(
        &mut self,
        field: &'static str,
        value: &str,
        capacity: usize,
    ) -> Result<(), ProtocolError> {
        check_text(field, value, capacity)?;
        let mut slot = vec![0_u8; capacity];
        if let Some(head) = slot.get_mut(..value.len()) {
            head.copy_from_slice(value.as_bytes());
        }
        self.put_bytes(&slot)
    }

    /// Skips a field of `capacity` bytes, leaving it zeroed.
    pub(crate) fn skip(&mut self, capacity: usize) -> Result<(), ProtocolError> {
        self.put_bytes(&vec![0_u8; capacity])
    }

    /// Returns the struct size, padded to its alignment.
    pub(crate) fn finish(self) -> usize {
        self.position.next_multiple_of(self.alignment)
    }
}

/// Reads one payload variant from a full-size receive buffer.
pub(crate) struct PayloadReader<'a> {
    operation: &'static str,
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    pub(crate) const fn new(operation: &'static str, buffer: &'a [u8]) -> Self {
        Self {
            operation,
            buffer,
            position: 0,
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let slice = self.take_slice(N)?;
        let mut bytes = [0_u8; N];
        bytes.copy_from_slice(slice);
        Ok(bytes)
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self.position.saturating_add(len);
        let slice = self
            .buffer
            .get(self.position..end)
            .ok_or(ProtocolError::LayoutOverflow {
                operation: self.operation,
                max: MAX_PAYLOAD_SIZE,
            })?;
        self.position = end;
        Ok(slice)
    }

    #[expect(
        clippy::host_endian_bytes,
        reason = "the daemon exchanges raw host-order structs over a local socket"
    )]
    pub(crate) fn i32(&mut self) -> Result<i32, ProtocolError> {
        self.position = self.position.next_multiple_of(4);
        self.take().map(i32::from_ne_bytes)
    }

    #[expect(
        clippy::host_endian_bytes,
        reason = "the daemon exchanges raw host-order structs over a local socket"
    )]
    pub(crate) fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.position = self.position.next_multiple_of(4);
        self.take().map(u32::from_ne_bytes)
    }

    #[expect(
        clippy::host_endian_bytes,
        reason = "the daemon exchanges raw host-order structs over a local socket"
    )]
    pub(crate) fn u64(&mut self) -> Result<u64, ProtocolError> {
        self.position = self.position.next_multiple_of(8);
        self.take().map(u64::from_ne_bytes)
    }

    pub(crate) fn uuid(&mut self) -> Result<Uuid, ProtocolError> {
        self.take::<UUID_RAW_LEN>().map(Uuid::from_bytes)
    }

    /// Reads a fixed-capacity text field without trusting its terminator.
    pub(crate) fn text(&mut self, capacity: usize) -> Result<String, ProtocolError> {
        self.take_slice(capacity).map(terminated_text)
    }

    /// Reads a listing count and checks it against the array capacity.
    pub(crate) fn count(&mut self, field: &'static str, max: usize) -> Result<usize, ProtocolError> {
        let count = self.i32()?;
        usize::try_from(count)
            .ok()
            .filter(|entries| *entries <= max)
            .ok_or(ProtocolError::CountOutOfRange { field, count, max })
    }

    pub(crate) fn skip(&mut self, capacity: usize) -> Result<(), ProtocolError> {
        self.take_slice(capacity).map(|_| ())
    }
}

/// Validates a text value against a field capacity before transmission.
pub fn check_text(field: &'static str, value: &str, capacity: usize) -> Result<(), ProtocolError> {
    let max = max_text_len(capacity);
    if value.len() > max {
        return Err(ProtocolError::TextTooLong {
            field,
            len: value.len(),
            max,
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(ProtocolError::EmbeddedNul { field });
    }
    Ok(())
}

/// Decodes a peer-supplied text buffer.
///
/// The final byte is treated as the terminator regardless of its content, and
/// decoding stops at the first NUL inside the remaining bytes.
#[must_use]
pub fn terminated_text(field: &[u8]) -> String {
    let bounded = field
        .get(..max_text_len(field.len()))
        .unwrap_or_default();
    let end = bounded
        .iter()
        .position(|byte| *byte == 0)
        .unwrap_or(bounded.len());
    String::from_utf8_lossy(bounded.get(..end).unwrap_or_default()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn scalars_follow_natural_alignment() {
        let mut buffer = vec![0_u8; MAX_PAYLOAD_SIZE];
        let mut writer = PayloadWriter::new("test", &mut buffer);
        writer.put_u64(7).expect("u64");
        writer.put_i32(1).expect("i32");
        writer.put_u32(2).expect("u32");
        writer.put_u32(3).expect("u32");
        writer.put_u32(4).expect("u32");
        assert_eq!(writer.finish(), 24);
    }

    #[test]
    fn text_after_integer_pads_struct_to_four() {
        let mut buffer = vec![0_u8; MAX_PAYLOAD_SIZE];
        let mut writer = PayloadWriter::new("test", &mut buffer);
        writer.put_i32(-1).expect("id");
        writer.put_text("name", "guest", 50).expect("name");
        assert_eq!(writer.finish(), 56);
    }

    #[test]
    fn byte_only_struct_has_no_padding() {
        let mut buffer = vec![0_u8; MAX_PAYLOAD_SIZE];
        let mut writer = PayloadWriter::new("test", &mut buffer);
        writer.put_uuid(&Uuid::nil()).expect("uuid");
        writer.put_text("name", "guest", 50).expect("name");
        assert_eq!(writer.finish(), 66);
    }

    #[rstest]
    #[case::terminated(b"vm1\0garbage".as_slice(), "vm1")]
    #[case::unterminated(b"abcdef".as_slice(), "abcde")]
    #[case::empty(b"\0\0\0".as_slice(), "")]
    fn terminated_text_never_overreads(#[case] field: &[u8], #[case] expected: &str) {
        assert_eq!(terminated_text(field), expected);
    }

    #[test]
    fn text_longer_than_capacity_is_rejected() {
        let value = "x".repeat(50);
        assert_eq!(
            check_text("name", &value, 50),
            Err(ProtocolError::TextTooLong {
                field: "name",
                len: 50,
                max: 49,
            })
        );
    }

    #[test]
    fn text_with_nul_is_rejected() {
        assert_eq!(
            check_text("name", "a\0b", 50),
            Err(ProtocolError::EmbeddedNul { field: "name" })
        );
    }

    #[test]
    fn listing_count_is_bounded() {
        let mut buffer = vec![0_u8; MAX_PAYLOAD_SIZE];
        let mut writer = PayloadWriter::new("test", &mut buffer);
        writer.put_i32(101).expect("count");
        let mut reader = PayloadReader::new("test", &buffer);
        assert!(matches!(
            reader.count("domains", 100),
            Err(ProtocolError::CountOutOfRange { count: 101, .. })
        ));
    }
}
