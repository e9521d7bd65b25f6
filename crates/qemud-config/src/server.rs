//! Discovery of the supervisor daemon executable.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::defaults::{SERVER_CANDIDATES, SERVER_ENV_VAR};

/// Searches for the supervisor binary used to auto-start session daemons.
///
/// An override, when present, is used as-is without probing; otherwise the
/// first candidate the caller may read and execute wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLocator {
    override_path: Option<PathBuf>,
    candidates: Vec<PathBuf>,
}

impl ServerLocator {
    /// Builds a locator from explicit inputs.
    #[must_use]
    pub fn new(override_path: Option<PathBuf>, candidates: Vec<PathBuf>) -> Self {
        Self {
            override_path,
            candidates,
        }
    }

    /// Builds a locator honouring `LIBVIRT_QEMU_SERVER` and the installed
    /// candidate paths.
    #[must_use]
    pub fn from_env() -> Self {
        let override_path = env::var_os(SERVER_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::new(
            override_path,
            SERVER_CANDIDATES.iter().map(PathBuf::from).collect(),
        )
    }

    /// Returns the binary to launch.
    pub fn locate(&self) -> Result<PathBuf, ServerLookupError> {
        if let Some(path) = &self.override_path {
            return Ok(path.clone());
        }
        self.candidates
            .iter()
            .find(|candidate| is_executable(candidate))
            .cloned()
            .ok_or_else(|| ServerLookupError::NotFound {
                searched: self.candidates.clone(),
            })
    }
}

impl Default for ServerLocator {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};

    access(path, AccessFlags::R_OK | AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Raised when no supervisor binary can be found.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerLookupError {
    #[error("unable to find a supervisor daemon binary (searched {searched:?})")]
    NotFound { searched: Vec<PathBuf> },
}
