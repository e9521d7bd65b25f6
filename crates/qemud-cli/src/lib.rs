//! Command-line runtime for `virq`.
//!
//! The runtime parses arguments, installs diagnostics, opens a session
//! through the driver registry and renders one [`Outcome`]. Streams are
//! injected so tests can capture everything the binary would print.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use qemud_config::{DRIVER_SCHEME, LogSettings, default_uri};
use qemud_driver::{
    Backend, DriverError, DriverRegistry, HypervisorDriver, OpenFlags, Session,
};

mod cli;
mod commands;
mod errors;
pub mod output;
pub mod telemetry;

use cli::Cli;
use errors::AppError;
pub use output::{OutputFormat, Outcome, ResolvedOutputFormat, render};

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };
    match execute(cli, stdout, stdout_is_terminal) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "virq: {error}");
            ExitCode::FAILURE
        }
    }
}

fn report_usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    let rendered = error.render();
    let written = match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => write!(stdout, "{rendered}"),
        _ => write!(stderr, "{rendered}"),
    };
    if written.is_err() {
        return ExitCode::FAILURE;
    }
    u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}

fn execute<W: Write>(cli: Cli, stdout: &mut W, stdout_is_terminal: bool) -> Result<(), AppError> {
    let settings = LogSettings::resolve(cli.log_filter.as_deref(), cli.log_format);
    telemetry::initialise(&settings)?;

    let format = cli.output.resolve(stdout_is_terminal);
    let flags = OpenFlags {
        read_only: cli.readonly,
        quiet: false,
    };
    let registry = DriverRegistry::with_default_backends();
    let mut session = open_session(
        &registry,
        cli.uri.as_deref(),
        cli.command.targets_networks(),
        flags,
    )?;
    let outcome = commands::execute(session.as_mut(), cli.command);
    session.close();
    render(&outcome?, format, stdout).map_err(AppError::Emit)
}

/// Domain commands open `uri` or the default; network commands let the
/// backend choose its fallback.
fn open_session(
    registry: &DriverRegistry,
    uri: Option<&str>,
    networks: bool,
    flags: OpenFlags,
) -> Result<Box<dyn Session>, AppError> {
    if networks {
        let backend = registry
            .lookup(DRIVER_SCHEME)
            .ok_or_else(|| DriverError::NoDriver {
                uri: uri.unwrap_or_else(|| default_uri()).to_owned(),
            })?;
        return Ok(backend.open_network(uri, flags)?);
    }
    Ok(registry.open(uri.unwrap_or_else(|| default_uri()), flags)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run_capturing(arguments: &[&str]) -> (ExitCode, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let args = std::iter::once("virq")
            .chain(arguments.iter().copied())
            .map(OsString::from);
        let code = run(args, &mut stdout, &mut stderr, false);
        (
            code,
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
        )
    }

    #[test]
    fn help_goes_to_stdout() {
        let (code, stdout, stderr) = run_capturing(&["--help"]);
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(stdout.contains("net-bridge"), "{stdout}");
        assert!(stderr.is_empty());
    }

    #[test]
    fn usage_errors_go_to_stderr() {
        let (code, stdout, stderr) = run_capturing(&["dominfo"]);
        assert_eq!(code, ExitCode::from(2));
        assert!(stdout.is_empty());
        assert!(stderr.contains("<NAME>"), "{stderr}");
    }

    #[rstest]
    #[case::foreign_scheme("xen:///system", "no registered driver")]
    #[case::remote_host("qemu://elsewhere/system", "elsewhere")]
    #[case::unknown_path("qemu:///nowhere", "/nowhere")]
    fn rejected_identifiers_fail_before_connecting(#[case] uri: &str, #[case] needle: &str) {
        let (code, stdout, stderr) = run_capturing(&["--uri", uri, "version"]);
        assert_eq!(code, ExitCode::FAILURE);
        assert!(stdout.is_empty());
        assert!(stderr.starts_with("virq: "), "{stderr}");
        assert!(stderr.contains(needle), "{stderr}");
    }
}
