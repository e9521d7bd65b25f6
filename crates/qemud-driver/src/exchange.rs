//! One synchronous request/reply exchange over a byte stream.
//!
//! The protocol carries no request identifiers, so only one exchange may be
//! in flight per stream. Any I/O failure or framing violation leaves the
//! stream in an unknown position; callers must discard it.

use std::io::{self, Read, Write};

use qemud_protocol::{Failure, Frame, HEADER_SIZE, Header, Operation, ProtocolError, Reply};
use thiserror::Error;
use tracing::trace;

use crate::PROTOCOL_TARGET;

/// Ways an exchange can fail.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),
    #[error("failed to receive reply: {0}")]
    Receive(#[source] io::Error),
    #[error(transparent)]
    Malformed(#[from] ProtocolError),
    #[error("daemon reported failure {}", .0.code)]
    Remote(Failure),
    #[error("expected reply tag {expected}, received {received}")]
    UnexpectedReply { expected: u32, received: u32 },
}

/// Sends `request` and blocks until the matching reply frame is read.
///
/// The reply header's payload size is checked before any payload byte is
/// read. A reply tagged with a different operation is an error; when it is a
/// failure frame its contents are returned in [`ExchangeError::Remote`].
pub fn exchange<S: Read + Write>(stream: &mut S, request: &Frame) -> Result<Frame, ExchangeError> {
    stream
        .write_all(&request.to_bytes())
        .and_then(|()| stream.flush())
        .map_err(ExchangeError::Send)?;

    let mut header_bytes = [0_u8; HEADER_SIZE];
    stream
        .read_exact(&mut header_bytes)
        .map_err(ExchangeError::Receive)?;
    let header = Header::decode(&header_bytes);
    let mut reply = Frame::for_header(header)?;
    stream
        .read_exact(reply.body_mut())
        .map_err(ExchangeError::Receive)?;
    trace!(
        target: PROTOCOL_TARGET,
        request = request.header().tag,
        reply = header.tag,
        size = header.payload_size,
        "exchanged frames"
    );

    let expected = request.header().tag;
    if header.tag == expected {
        return Ok(reply);
    }
    if header.tag == Operation::Failure.tag() {
        if let Reply::Failure(failure) = Reply::decode(&reply)? {
            return Err(ExchangeError::Remote(failure));
        }
    }
    Err(ExchangeError::UnexpectedReply {
        expected,
        received: header.tag,
    })
}
