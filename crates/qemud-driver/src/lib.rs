//! Client driver for the QEMU supervisor daemon.
//!
//! The driver reaches the daemon over a UNIX socket, starting it on demand,
//! and maps domain and network management operations onto the daemon's
//! fixed-frame request/reply protocol. Sessions are strictly synchronous:
//! one request is in flight per connection, and callers needing concurrency
//! open separate sessions.

mod domains;
mod driver;
mod drivers;
mod error;
mod exchange;
mod handle;
mod launcher;
mod networks;
mod qemu;
mod registry;
mod report;
mod session;
mod transport;

pub use driver::{Backend, HypervisorDriver, NetworkDriver, OpenFlags, Session};
pub use drivers::DriverRegistry;
pub use error::{DriverError, ErrorCode};
pub use exchange::{ExchangeError, exchange};
pub use handle::{Domain, DomainRunInfo, DomainState, NOT_RUNNING, Network};
pub use launcher::{DaemonLauncher, LaunchError, SystemLauncher, spawn_detached};
pub use qemu::{DRIVER_NAME, QemuDriver};
pub use registry::{ObjectRegistry, RegistryError};
pub use report::{ErrorReport, ErrorSink, ErrorTranslator, TracingSink};
pub use session::{QemuSession, Stream};
pub use transport::{ConnectError, RetryPolicy, connect};

pub use qemud_protocol::{NodeInfo, Uuid};

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
pub(crate) const LAUNCHER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launcher");
pub(crate) const PROTOCOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::protocol");
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
pub(crate) const REPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::report");
