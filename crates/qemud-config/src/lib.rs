//! Shared configuration for the QEMU supervisor client.
//!
//! The crate owns the fixed locations the client depends on: endpoint
//! identifiers and the socket addresses they select, the supervisor binary
//! search used for auto-start, and the logging defaults shared by the
//! binaries.

pub mod defaults;
mod endpoint;
mod logging;
mod server;

pub use defaults::{
    DAEMON_IDLE_TIMEOUT_SECS, DEFAULT_LOG_FILTER, DRIVER_SCHEME, SERVER_CANDIDATES,
    SERVER_ENV_VAR, SESSION_URI, SYSTEM_URI, daemon_arguments, default_uri,
};
pub use endpoint::{AccessMode, EndpointError, EndpointSelector, Scope, SocketAddress};
pub use logging::{LogFormat, LogFormatParseError, LogSettings};
pub use server::{ServerLocator, ServerLookupError};
