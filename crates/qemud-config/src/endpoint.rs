use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::{
    ABSTRACT_MARKER, DRIVER_SCHEME, SESSION_SOCKET_SUFFIX, SOCKET_PATH_CAPACITY, SYSTEM_SOCKET,
    SYSTEM_SOCKET_READONLY,
};

/// Which supervisor daemon a connection targets.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The privileged, system-wide daemon (`qemu:///system`).
    System,
    /// The daemon owned by the invoking user (`qemu:///session`).
    Session,
}

/// Whether a connection may modify state.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Full access.
    #[default]
    ReadWrite,
    /// Introspection only; selects the read-only system socket.
    ReadOnly,
}

/// A parsed endpoint identifier such as `qemu:///session`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointSelector {
    scope: Scope,
}

impl EndpointSelector {
    /// Builds a selector for the given scope.
    #[must_use]
    pub const fn new(scope: Scope) -> Self {
        Self { scope }
    }

    /// Daemon scope named by the identifier.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Resolves the socket address for this selector.
    ///
    /// `/system` maps to a fixed path that depends on `access`; `/session`
    /// maps to an abstract-namespace address below the effective user's home
    /// directory.
    pub fn resolve(&self, access: AccessMode) -> Result<SocketAddress, EndpointError> {
        let raw = match (self.scope, access) {
            (Scope::System, AccessMode::ReadWrite) => SYSTEM_SOCKET.to_owned(),
            (Scope::System, AccessMode::ReadOnly) => SYSTEM_SOCKET_READONLY.to_owned(),
            (Scope::Session, _) => {
                let home = user_home()?;
                format!("{ABSTRACT_MARKER}{}", home.join(SESSION_SOCKET_SUFFIX))
            }
        };
        SocketAddress::new(raw)
    }
}

impl fmt::Display for EndpointSelector {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::System => write!(formatter, "{DRIVER_SCHEME}:///system"),
            Scope::Session => write!(formatter, "{DRIVER_SCHEME}:///session"),
        }
    }
}

impl FromStr for EndpointSelector {
    type Err = EndpointError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input).map_err(|source| EndpointError::Parse {
            uri: input.to_owned(),
            source,
        })?;
        if url.scheme() != DRIVER_SCHEME {
            return Err(EndpointError::ForeignScheme {
                scheme: url.scheme().to_owned(),
            });
        }
        if let Some(host) = url.host_str().filter(|host| !host.is_empty()) {
            return Err(EndpointError::RemoteHost {
                host: host.to_owned(),
            });
        }
        match url.path() {
            "/system" => Ok(Self::new(Scope::System)),
            "/session" => Ok(Self::new(Scope::Session)),
            other => Err(EndpointError::UnsupportedPath {
                path: other.to_owned(),
            }),
        }
    }
}

/// A UNIX socket address; a leading `@` selects the abstract namespace.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SocketAddress {
    raw: String,
}

impl SocketAddress {
    /// Validates that `raw` fits a UNIX socket address.
    ///
    /// The same bound applies to both namespaces: the marker or the
    /// terminator occupies one byte, so at most `SOCKET_PATH_CAPACITY - 1`
    /// bytes of `raw` are accepted.
    pub fn new(raw: impl Into<String>) -> Result<Self, EndpointError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(EndpointError::EmptyPath);
        }
        if raw.len() >= SOCKET_PATH_CAPACITY {
            return Err(EndpointError::PathTooLong {
                len: raw.len(),
                max: SOCKET_PATH_CAPACITY - 1,
            });
        }
        if raw.as_bytes().contains(&0) {
            return Err(EndpointError::EmbeddedNul);
        }
        Ok(Self { raw })
    }

    /// Whether the address lives in the abstract namespace.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.raw.starts_with(ABSTRACT_MARKER)
    }

    /// Address as written, including any abstract marker.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Bytes to place in `sun_path`.
    ///
    /// Abstract addresses have the marker replaced by a NUL byte and are
    /// zero padded to the full capacity, matching daemons that bind with the
    /// whole `sockaddr_un` length.
    #[must_use]
    pub fn sun_path_bytes(&self) -> Vec<u8> {
        match self.raw.strip_prefix(ABSTRACT_MARKER) {
            Some(name) => {
                let mut bytes = vec![0_u8; SOCKET_PATH_CAPACITY];
                if let Some(slot) = bytes.get_mut(1..=name.len()) {
                    slot.copy_from_slice(name.as_bytes());
                }
                bytes
            }
            None => self.raw.as_bytes().to_vec(),
        }
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unix:{}", self.raw)
    }
}

#[cfg(unix)]
fn user_home() -> Result<Utf8PathBuf, EndpointError> {
    use nix::unistd::{Uid, User};

    let uid = Uid::effective();
    let user = User::from_uid(uid)
        .map_err(|source| EndpointError::UserLookup {
            uid: uid.as_raw(),
            source: source.into(),
        })?
        .ok_or(EndpointError::UnknownUser { uid: uid.as_raw() })?;
    Utf8PathBuf::from_path_buf(user.dir).map_err(|path| EndpointError::NonUtf8Home {
        path: path.display().to_string(),
    })
}

#[cfg(not(unix))]
fn user_home() -> Result<Utf8PathBuf, EndpointError> {
    Err(EndpointError::UnsupportedPlatform)
}

/// Errors encountered while selecting a daemon endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Identifier was not a valid URI.
    #[error("cannot parse '{uri}': {source}")]
    Parse {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    /// Identifier belongs to another driver.
    #[error("scheme '{scheme}' is not handled by the qemu driver")]
    ForeignScheme { scheme: String },
    /// Identifier names a remote host; only local daemons are reachable.
    #[error("remote host '{host}' is not supported")]
    RemoteHost { host: String },
    /// Path was neither `/system` nor `/session`.
    #[error("unsupported path '{path}'; expected /system or /session")]
    UnsupportedPath { path: String },
    /// Socket path was empty.
    #[error("socket path is empty")]
    EmptyPath,
    /// Socket path does not fit a UNIX socket address.
    #[error("socket path is {len} bytes long; at most {max} bytes fit")]
    PathTooLong { len: usize, max: usize },
    /// Socket path contains a NUL byte.
    #[error("socket path contains an embedded NUL byte")]
    EmbeddedNul,
    /// Password database lookup failed.
    #[error("failed to look up user {uid}: {source}")]
    UserLookup {
        uid: u32,
        #[source]
        source: std::io::Error,
    },
    /// Effective user has no password database entry.
    #[error("no password entry for user {uid}")]
    UnknownUser { uid: u32 },
    /// Home directory is not valid UTF-8.
    #[error("home directory '{path}' is not valid UTF-8")]
    NonUtf8Home { path: String },
    /// Platform lacks UNIX sockets.
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets")]
    UnsupportedPlatform,
}

impl EndpointError {
    /// Whether the identifier simply belongs to a different driver, so other
    /// backends may be probed without reporting an error.
    #[must_use]
    pub const fn is_foreign(&self) -> bool {
        matches!(self, Self::ForeignScheme { .. })
    }
}
