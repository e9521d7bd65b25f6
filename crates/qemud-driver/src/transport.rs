//! UNIX socket transport with on-demand daemon start.
//!
//! A failed connect may trigger the launcher up to [`RetryPolicy::launches`]
//! times, each followed by a quadratic backoff before the next connect.

use std::io;
use std::thread;
use std::time::Duration;

use qemud_config::SocketAddress;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use crate::TRANSPORT_TARGET;
use crate::launcher::{DaemonLauncher, LaunchError};

/// Bounds on the autostart loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of launcher invocations.
    pub launches: u32,
    /// Unit of the quadratic backoff.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay after the `attempt`-th launch (1-based): `base_delay * attempt²`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_mul(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            launches: 3,
            base_delay: Duration::from_millis(5),
        }
    }
}

/// Errors raised while connecting to the daemon.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect to {address} after {attempts} attempt(s): {source}")]
    Unreachable {
        address: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to start the supervisor daemon: {0}")]
    Launch(#[source] LaunchError),
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets")]
    UnsupportedPlatform,
}

/// Connects to `address`, starting the daemon through `launcher` when given.
///
/// Without a launcher a single connect is attempted. A launcher failure ends
/// the loop at once.
#[cfg(unix)]
pub fn connect(
    address: &SocketAddress,
    launcher: Option<&dyn DaemonLauncher>,
    policy: RetryPolicy,
) -> Result<UnixStream, ConnectError> {
    let mut launches = 0;
    loop {
        let source = match connect_once(address) {
            Ok(stream) => {
                debug!(
                    target: TRANSPORT_TARGET,
                    %address,
                    launches,
                    "connected to supervisor daemon"
                );
                return Ok(stream);
            }
            Err(source) => source,
        };
        let Some(launcher) = launcher.filter(|_| launches < policy.launches) else {
            warn!(
                target: TRANSPORT_TARGET,
                %address,
                error = %source,
                "giving up on supervisor daemon"
            );
            return Err(ConnectError::Unreachable {
                address: address.to_string(),
                attempts: launches + 1,
                source,
            });
        };
        debug!(
            target: TRANSPORT_TARGET,
            %address,
            error = %source,
            "daemon not reachable; starting it"
        );
        launcher.ensure_running().map_err(ConnectError::Launch)?;
        launches += 1;
        thread::sleep(policy.backoff(launches));
    }
}

/// Connects to `address`, starting the daemon through `launcher` when given.
#[cfg(not(unix))]
pub fn connect(
    _address: &SocketAddress,
    _launcher: Option<&dyn DaemonLauncher>,
    _policy: RetryPolicy,
) -> Result<std::net::TcpStream, ConnectError> {
    Err(ConnectError::UnsupportedPlatform)
}

#[cfg(unix)]
fn connect_once(address: &SocketAddress) -> io::Result<UnixStream> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    use socket2::{Domain, SockAddr, Socket, Type};

    let path = address.sun_path_bytes();
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let target = SockAddr::unix(OsStr::from_bytes(&path))?;
    socket.connect(&target)?;
    Ok(socket.into())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::sync::atomic::{AtomicU32, Ordering};

    use rstest::rstest;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingLauncher {
        calls: AtomicU32,
    }

    impl DaemonLauncher for CountingLauncher {
        fn ensure_running(&self) -> Result<(), LaunchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn missing_socket(dir: &TempDir) -> SocketAddress {
        let path = dir.path().join("sock");
        SocketAddress::new(path.to_string_lossy().into_owned()).expect("socket address")
    }

    #[rstest]
    #[case(1, Duration::from_millis(5))]
    #[case(2, Duration::from_millis(20))]
    #[case(3, Duration::from_millis(45))]
    fn backoff_grows_with_square_of_attempt(#[case] attempt: u32, #[case] expected: Duration) {
        assert_eq!(RetryPolicy::default().backoff(attempt), expected);
    }

    #[test]
    fn connects_to_listening_socket() {
        let dir = tempfile::tempdir().expect("tempdir");
        let address = missing_socket(&dir);
        let _listener = UnixListener::bind(address.as_str()).expect("bind listener");
        assert!(connect(&address, None, RetryPolicy::default()).is_ok());
    }

    #[test]
    fn without_launcher_fails_after_one_attempt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = connect(&missing_socket(&dir), None, RetryPolicy::default())
            .expect_err("nothing listening");
        assert!(matches!(error, ConnectError::Unreachable { attempts: 1, .. }));
    }

    #[test]
    fn autostart_is_bounded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = CountingLauncher::default();
        let error = connect(&missing_socket(&dir), Some(&launcher), RetryPolicy::default())
            .expect_err("nothing ever listens");
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(error, ConnectError::Unreachable { attempts: 4, .. }));
    }

    #[test]
    fn launcher_failure_stops_retrying() {
        struct Broken;
        impl DaemonLauncher for Broken {
            fn ensure_running(&self) -> Result<(), LaunchError> {
                Err(LaunchError::InvalidArgument {
                    argument: String::from("x"),
                })
            }
        }
        let dir = tempfile::tempdir().expect("tempdir");
        let error = connect(&missing_socket(&dir), Some(&Broken), RetryPolicy::default())
            .expect_err("launcher broken");
        assert!(matches!(error, ConnectError::Launch(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reaches_padded_abstract_listener() {
        use socket2::{Domain, SockAddr, Socket, Type};
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = format!("@/qemud-test/{}/sock", std::process::id());
        let address = SocketAddress::new(name).expect("abstract address");
        let bytes = address.sun_path_bytes();
        let listener = Socket::new(Domain::UNIX, Type::STREAM, None).expect("socket");
        listener
            .bind(&SockAddr::unix(OsStr::from_bytes(&bytes)).expect("sockaddr"))
            .expect("bind abstract");
        listener.listen(1).expect("listen");

        assert!(connect(&address, None, RetryPolicy::default()).is_ok());
    }
}
