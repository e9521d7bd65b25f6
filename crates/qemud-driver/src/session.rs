//! An open connection to the supervisor daemon.
//!
//! Every operation follows one template: encode a request, exchange it,
//! project the reply onto the operation's result type. Failures from any
//! step go through the session's [`ErrorTranslator`].

use std::io::{Read, Write};

use qemud_config::{AccessMode, SocketAddress};
use qemud_protocol::{Operation, ProtocolError, Reply, Request};
use tracing::{debug, warn};

use crate::DISPATCH_TARGET;
use crate::error::DriverError;
use crate::exchange::{ExchangeError, exchange};
use crate::registry::ObjectRegistry;
use crate::report::ErrorTranslator;

/// Byte stream carrying frames.
pub trait Stream: Read + Write + Send {}

impl<T: Read + Write + Send> Stream for T {}

/// Connection state plus the handle registries it owns.
pub struct QemuSession {
    stream: Option<Box<dyn Stream>>,
    address: SocketAddress,
    access: AccessMode,
    pub(crate) translator: ErrorTranslator,
    pub(crate) domains: ObjectRegistry,
    pub(crate) networks: ObjectRegistry,
}

impl QemuSession {
    /// Wraps an established stream.
    #[must_use]
    pub fn new(
        stream: Box<dyn Stream>,
        address: SocketAddress,
        access: AccessMode,
        translator: ErrorTranslator,
    ) -> Self {
        Self {
            stream: Some(stream),
            address,
            access,
            translator,
            domains: ObjectRegistry::new("domain"),
            networks: ObjectRegistry::new("network"),
        }
    }

    /// Socket address the session was opened on.
    #[must_use]
    pub const fn address(&self) -> &SocketAddress {
        &self.address
    }

    /// Access mode requested at open.
    #[must_use]
    pub const fn access(&self) -> AccessMode {
        self.access
    }

    /// Whether the stream is still usable.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Registry of domain handles.
    #[must_use]
    pub const fn domain_registry(&self) -> &ObjectRegistry {
        &self.domains
    }

    /// Registry of network handles.
    #[must_use]
    pub const fn network_registry(&self) -> &ObjectRegistry {
        &self.networks
    }

    pub(crate) fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!(
                target: DISPATCH_TARGET,
                address = %self.address,
                "closed supervisor connection"
            );
        }
    }

    /// Runs one exchange and projects the reply, without reporting.
    pub(crate) fn call<T>(
        &mut self,
        request: &Request,
        project: impl FnOnce(Reply) -> Option<T>,
    ) -> Result<T, DriverError> {
        let operation = request.operation();
        let frame = request.encode().map_err(|source| DriverError::Rejected {
            operation: operation.name(),
            source,
        })?;
        let stream = self.stream.as_mut().ok_or(DriverError::NotConnected)?;
        debug!(
            target: DISPATCH_TARGET,
            operation = operation.name(),
            "dispatching request"
        );
        let outcome = exchange(stream, &frame)
            .and_then(|reply| Reply::decode(&reply).map_err(ExchangeError::from))
            .map_err(|error| translate(operation, error));
        match outcome {
            Ok(reply) => project(reply).ok_or(DriverError::UnexpectedLayout {
                operation: operation.name(),
            }),
            Err(error) => {
                if error.breaks_connection() {
                    warn!(
                        target: DISPATCH_TARGET,
                        operation = operation.name(),
                        error = %error,
                        "discarding broken supervisor connection"
                    );
                    self.stream = None;
                }
                Err(error)
            }
        }
    }

    /// [`Self::call`] followed by error reporting.
    pub(crate) fn dispatch<T>(
        &mut self,
        request: &Request,
        object: Option<&str>,
        project: impl FnOnce(Reply) -> Option<T>,
    ) -> Result<T, DriverError> {
        let result = self.call(request, project);
        self.translator.check(result, object)
    }
}

impl std::fmt::Debug for QemuSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("QemuSession")
            .field("address", &self.address)
            .field("access", &self.access)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

fn translate(operation: Operation, error: ExchangeError) -> DriverError {
    match error {
        ExchangeError::Send(source) | ExchangeError::Receive(source) => DriverError::Transport {
            operation: operation.name(),
            source,
        },
        ExchangeError::Malformed(source) => DriverError::Malformed { source },
        ExchangeError::Remote(failure) => DriverError::Remote(failure),
        ExchangeError::UnexpectedReply { expected, received } => {
            DriverError::UnexpectedReply { expected, received }
        }
    }
}

/// Converts a daemon-reported count, rejecting negative values.
pub(crate) fn count(field: &'static str, raw: i32) -> Result<usize, DriverError> {
    usize::try_from(raw).map_err(|_| DriverError::Malformed {
        source: ProtocolError::CountOutOfRange {
            field,
            count: raw,
            max: usize::MAX,
        },
    })
}
