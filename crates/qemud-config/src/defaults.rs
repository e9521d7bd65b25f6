#[cfg(unix)]
use nix::unistd::Uid;

/// URI scheme, and driver name, handled by this backend.
pub const DRIVER_SCHEME: &str = "qemu";

/// Read-write socket of the privileged supervisor daemon.
pub const SYSTEM_SOCKET: &str = "/var/run/qemud/sock";

/// Read-only socket of the privileged supervisor daemon.
pub const SYSTEM_SOCKET_READONLY: &str = "/var/run/qemud/sock-ro";

/// Socket location below the user's home directory for session daemons.
pub const SESSION_SOCKET_SUFFIX: &str = ".qemud/sock";

/// Marker designating an abstract-namespace socket address.
pub const ABSTRACT_MARKER: char = '@';

/// Bytes available for a socket address, marker or terminator included.
pub const SOCKET_PATH_CAPACITY: usize = 108;

/// Environment variable overriding the supervisor binary search.
pub const SERVER_ENV_VAR: &str = "LIBVIRT_QEMU_SERVER";

/// Installed supervisor binaries, in search order.
pub const SERVER_CANDIDATES: &[&str] = &["/usr/bin/libvirt_qemu", "/usr/bin/libvirt_qemu_dbg"];

/// Seconds of inactivity after which an auto-started daemon exits.
pub const DAEMON_IDLE_TIMEOUT_SECS: u32 = 30;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// URI for the privileged daemon.
pub const SYSTEM_URI: &str = "qemu:///system";

/// URI for the per-user daemon.
pub const SESSION_URI: &str = "qemu:///session";

/// Arguments passed to an auto-started daemon.
pub fn daemon_arguments() -> [String; 2] {
    [
        String::from("--timeout"),
        DAEMON_IDLE_TIMEOUT_SECS.to_string(),
    ]
}

/// URI used when the caller does not name one: the privileged daemon for
/// the superuser, the per-user daemon for everyone else.
pub fn default_uri() -> &'static str {
    if running_as_superuser() {
        SYSTEM_URI
    } else {
        SESSION_URI
    }
}

#[cfg(unix)]
fn running_as_superuser() -> bool {
    Uid::effective().is_root()
}

#[cfg(not(unix))]
fn running_as_superuser() -> bool {
    false
}
