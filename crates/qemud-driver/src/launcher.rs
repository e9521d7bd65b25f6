//! Starts the supervisor daemon on demand.
//!
//! The daemon is detached with a double fork: the intermediate child points
//! its standard streams at `/dev/null`, closes every other inherited
//! descriptor, starts a new session and forks the daemon. The caller reaps
//! only the intermediate child, so no zombie remains and the daemon outlives
//! the caller. The daemon exits on its own after an idle timeout.

use std::path::{Path, PathBuf};

use qemud_config::{ServerLocator, ServerLookupError, daemon_arguments};
use thiserror::Error;
use tracing::{debug, info};

use crate::LAUNCHER_TARGET;

/// Abstraction over daemon start-up strategies.
pub trait DaemonLauncher: Send + Sync {
    /// Starts a daemon in the background. Success means a spawn was
    /// attempted, not that the daemon is already listening.
    fn ensure_running(&self) -> Result<(), LaunchError>;
}

/// Errors raised while starting the daemon.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    NotFound(#[from] ServerLookupError),
    #[error("daemon path {path:?} contains a NUL byte")]
    InvalidPath { path: PathBuf },
    #[error("daemon argument '{argument}' contains a NUL byte")]
    InvalidArgument { argument: String },
    #[cfg(unix)]
    #[error("failed to fork the launcher process: {0}")]
    Fork(#[source] nix::Error),
    #[cfg(not(unix))]
    #[error("platform cannot detach background processes")]
    UnsupportedPlatform,
}

/// Launcher that locates the installed supervisor binary and detaches it.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    locator: ServerLocator,
}

impl SystemLauncher {
    /// Builds a launcher using the given binary search.
    #[must_use]
    pub fn new(locator: ServerLocator) -> Self {
        Self { locator }
    }
}

impl DaemonLauncher for SystemLauncher {
    fn ensure_running(&self) -> Result<(), LaunchError> {
        let binary = self.locator.locate()?;
        let arguments = daemon_arguments();
        info!(
            target: LAUNCHER_TARGET,
            binary = %binary.display(),
            "starting supervisor daemon"
        );
        spawn_detached(&binary, &arguments)
    }
}

/// Runs `binary` with `arguments` as a detached background process.
#[cfg(unix)]
pub fn spawn_detached(binary: &Path, arguments: &[String]) -> Result<(), LaunchError> {
    use nix::unistd::{ForkResult, fork};

    let command = detach::Command::prepare(binary, arguments)?;
    let descriptor_limit = detach::descriptor_limit();

    // SAFETY: the child only performs async-signal-safe calls on data
    // prepared before the fork, then execs or calls `_exit`.
    match unsafe { fork() }.map_err(LaunchError::Fork)? {
        ForkResult::Parent { child } => {
            detach::reap(child);
            debug!(
                target: LAUNCHER_TARGET,
                intermediate = child.as_raw(),
                "reaped intermediate launcher process"
            );
            Ok(())
        }
        ForkResult::Child => command.detach_and_exec(descriptor_limit),
    }
}

/// Runs `binary` with `arguments` as a detached background process.
#[cfg(not(unix))]
pub fn spawn_detached(_binary: &Path, _arguments: &[String]) -> Result<(), LaunchError> {
    Err(LaunchError::UnsupportedPlatform)
}

#[cfg(unix)]
mod detach {
    use std::ffi::{CStr, CString};
    use std::os::fd::RawFd;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    use nix::errno::Errno;
    use nix::fcntl::{OFlag, open};
    use nix::sys::stat::Mode;
    use nix::sys::wait::waitpid;
    use nix::unistd::{ForkResult, Pid, SysconfVar, close, dup2, execv, fork, setsid, sysconf};

    use super::LaunchError;

    const DEV_NULL: &CStr = c"/dev/null";
    const FALLBACK_DESCRIPTOR_LIMIT: RawFd = 1024;
    const STDIN: RawFd = 0;
    const STDOUT: RawFd = 1;
    const STDERR: RawFd = 2;

    pub(super) struct Command {
        program: CString,
        argv: Vec<CString>,
    }

    impl Command {
        pub(super) fn prepare(binary: &Path, arguments: &[String]) -> Result<Self, LaunchError> {
            let program = CString::new(binary.as_os_str().as_bytes()).map_err(|_| {
                LaunchError::InvalidPath {
                    path: binary.to_path_buf(),
                }
            })?;
            let mut argv = Vec::with_capacity(arguments.len() + 1);
            argv.push(program.clone());
            for argument in arguments {
                argv.push(CString::new(argument.as_str()).map_err(|_| {
                    LaunchError::InvalidArgument {
                        argument: argument.clone(),
                    }
                })?);
            }
            Ok(Self { program, argv })
        }

        /// Body of the intermediate child; never returns.
        pub(super) fn detach_and_exec(&self, descriptor_limit: RawFd) -> ! {
            let status = match self.detach(descriptor_limit) {
                Ok(()) => 0,
                Err(_) => 1,
            };
            // SAFETY: `_exit` skips the parent's exit handlers, which must
            // not run twice.
            unsafe { libc::_exit(status) }
        }

        fn detach(&self, descriptor_limit: RawFd) -> nix::Result<()> {
            let input = open(DEV_NULL, OFlag::O_RDONLY, Mode::empty())?;
            let output = open(DEV_NULL, OFlag::O_WRONLY, Mode::empty())?;
            dup2(input, STDIN)?;
            dup2(output, STDOUT)?;
            dup2(output, STDERR)?;
            for descriptor in [input, output] {
                if descriptor > STDERR {
                    close(descriptor)?;
                }
            }
            for descriptor in (STDERR + 1)..descriptor_limit {
                // Most descriptors in the range are not open.
                close(descriptor).ok();
            }
            setsid()?;

            // SAFETY: as above, the grandchild only execs or exits.
            if let ForkResult::Child = unsafe { fork() }? {
                execv(&self.program, &self.argv).ok();
                // SAFETY: exec failed; leave without running exit handlers.
                unsafe { libc::_exit(1) }
            }
            Ok(())
        }
    }

    pub(super) fn descriptor_limit() -> RawFd {
        sysconf(SysconfVar::OPEN_MAX)
            .ok()
            .flatten()
            .and_then(|limit| RawFd::try_from(limit).ok())
            .filter(|limit| *limit > STDERR)
            .unwrap_or(FALLBACK_DESCRIPTOR_LIMIT)
    }

    pub(super) fn reap(child: Pid) {
        loop {
            match waitpid(child, None) {
                Err(Errno::EINTR) => continue,
                Ok(_) | Err(_) => break,
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> TempDir {
        tempfile::tempdir().expect("create scratch directory")
    }

    fn wait_for(path: &Path) -> Option<String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(contents) = fs::read_to_string(path) {
                if contents.ends_with('\n') {
                    return Some(contents);
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[rstest]
    fn detached_daemon_receives_idle_timeout(scratch: TempDir) {
        let record = scratch.path().join("args");
        let script = scratch.path().join("daemon.sh");
        fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" > {}.tmp\nmv {0}.tmp {0}\n", record.display()),
        )
        .expect("write daemon script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod script");

        let launcher = SystemLauncher::new(ServerLocator::new(Some(script), Vec::new()));
        launcher.ensure_running().expect("launch daemon");

        assert_eq!(wait_for(&record).as_deref(), Some("--timeout 30\n"));
    }

    #[rstest]
    fn missing_binary_spawns_nothing(scratch: TempDir) {
        let locator = ServerLocator::new(None, vec![scratch.path().join("absent")]);
        let error = SystemLauncher::new(locator)
            .ensure_running()
            .expect_err("no binary");
        assert!(matches!(error, LaunchError::NotFound(_)));
    }

    #[test]
    fn rejects_arguments_with_nul() {
        let result = spawn_detached(Path::new("/bin/true"), &[String::from("a\0b")]);
        assert!(matches!(result, Err(LaunchError::InvalidArgument { .. })));
    }
}
