//! Error types surfaced at the operation boundary.

use std::fmt;
use std::io;

use qemud_config::EndpointError;
use qemud_protocol::{Failure, ProtocolError};
use thiserror::Error;

use crate::registry::RegistryError;
use crate::transport::ConnectError;

/// Coarse classification handed to the error sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Local protocol violation: malformed frame or unexpected reply.
    Internal,
    /// Failure reported by the daemon, carrying its own code.
    Remote(i32),
    /// Operation or identifier not supported by this driver.
    NoSupport,
    /// The exchange broke down mid-flight.
    OperationFailed,
    /// A caller-supplied value does not fit the protocol.
    InvalidArgument,
    /// No usable connection to the daemon.
    NoConnect,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => formatter.write_str("internal error"),
            Self::Remote(code) => write!(formatter, "remote error {code}"),
            Self::NoSupport => formatter.write_str("not supported"),
            Self::OperationFailed => formatter.write_str("operation failed"),
            Self::InvalidArgument => formatter.write_str("invalid argument"),
            Self::NoConnect => formatter.write_str("no connection"),
        }
    }
}

/// Failure of one driver operation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("cannot open connection: {0}")]
    Connect(#[from] ConnectError),
    #[error("connection to the supervisor daemon is closed")]
    NotConnected,
    #[error("{operation} failed on a broken connection: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
    /// A request value was refused before sending.
    #[error("{operation}: {source}")]
    Rejected {
        operation: &'static str,
        #[source]
        source: ProtocolError,
    },
    /// A received frame could not be interpreted.
    #[error("Malformed data packet: {source}")]
    Malformed {
        #[source]
        source: ProtocolError,
    },
    #[error("Incorrect reply type: expected tag {expected}, received {received}")]
    UnexpectedReply { expected: u32, received: u32 },
    #[error("Incorrect reply type for {operation}")]
    UnexpectedLayout { operation: &'static str },
    #[error("{}", remote_message(.0))]
    Remote(Failure),
    #[error("{operation} is not supported by the QEMU driver")]
    Unsupported { operation: &'static str },
    #[error("daemon reported {count} {what} but only {capacity} fit")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        capacity: usize,
    },
    #[error("daemon reported unknown run state {raw}")]
    UnknownRunState { raw: i32 },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("no registered driver handles '{uri}'")]
    NoDriver { uri: String },
    #[error("a driver named '{name}' is already registered")]
    DuplicateDriver { name: &'static str },
}

fn remote_message(failure: &Failure) -> String {
    failure.message.clone().unwrap_or_else(|| {
        format!("supervisor daemon reported error {}", failure.code)
    })
}

impl DriverError {
    /// Classification used when reporting the error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Endpoint(error) if error.is_foreign() => ErrorCode::NoSupport,
            Self::Endpoint(_) | Self::Connect(_) | Self::NotConnected => ErrorCode::NoConnect,
            Self::Transport { .. } => ErrorCode::OperationFailed,
            Self::Rejected { .. } | Self::CapacityExceeded { .. } => ErrorCode::InvalidArgument,
            Self::Malformed { .. }
            | Self::UnexpectedReply { .. }
            | Self::UnexpectedLayout { .. }
            | Self::UnknownRunState { .. }
            | Self::Registry(_) => ErrorCode::Internal,
            Self::Remote(failure) => ErrorCode::Remote(failure.code),
            Self::Unsupported { .. } | Self::NoDriver { .. } | Self::DuplicateDriver { .. } => {
                ErrorCode::NoSupport
            }
        }
    }

    /// Whether the connection must be discarded after this error.
    #[must_use]
    pub const fn breaks_connection(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Malformed { .. })
    }

    /// Whether the error only says the identifier belongs elsewhere; quiet
    /// opens do not report these.
    #[must_use]
    pub const fn is_unrecognised_uri(&self) -> bool {
        matches!(
            self,
            Self::Endpoint(EndpointError::ForeignScheme { .. } | EndpointError::Parse { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::remote(
        DriverError::Remote(Failure { code: 7, message: None }),
        ErrorCode::Remote(7)
    )]
    #[case::mismatch(DriverError::UnexpectedReply { expected: 1, received: 4 }, ErrorCode::Internal)]
    #[case::unsupported(DriverError::Unsupported { operation: "save" }, ErrorCode::NoSupport)]
    #[case::closed(DriverError::NotConnected, ErrorCode::NoConnect)]
    #[case::capacity(
        DriverError::CapacityExceeded { what: "networks", count: 3, capacity: 1 },
        ErrorCode::InvalidArgument
    )]
    fn classifies_errors(#[case] error: DriverError, #[case] expected: ErrorCode) {
        assert_eq!(error.code(), expected);
    }

    #[test]
    fn remote_message_passes_through() {
        let error = DriverError::Remote(Failure {
            code: 3,
            message: Some(String::from("domain not found")),
        });
        assert_eq!(error.to_string(), "domain not found");
    }

    #[test]
    fn remote_without_message_names_code() {
        let error = DriverError::Remote(Failure {
            code: 3,
            message: None,
        });
        assert_eq!(error.to_string(), "supervisor daemon reported error 3");
    }

    #[test]
    fn foreign_scheme_is_unsupported_rather_than_unreachable() {
        let endpoint = "xen:///system"
            .parse::<qemud_config::EndpointSelector>()
            .expect_err("foreign scheme");
        assert_eq!(DriverError::from(endpoint).code(), ErrorCode::NoSupport);
    }
}
