//! Command-line interface definitions for `virq`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use qemud_config::LogFormat;

use crate::output::OutputFormat;

/// Manage QEMU domains and virtual networks through the supervisor daemon.
#[derive(Parser, Debug)]
#[command(name = "virq", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Connection identifier: `qemu:///system` or `qemu:///session`.
    #[arg(long, short = 'c', env = "VIRQ_URI", global = true)]
    pub(crate) uri: Option<String>,
    /// Opens the connection read-only.
    #[arg(long, global = true)]
    pub(crate) readonly: bool,
    /// `tracing` filter directive for diagnostics on stderr.
    #[arg(long, env = "VIRQ_LOG_FILTER", global = true)]
    pub(crate) log_filter: Option<String>,
    /// Diagnostic format: `compact` or `json`.
    #[arg(long, env = "VIRQ_LOG_FORMAT", global = true)]
    pub(crate) log_format: Option<LogFormat>,
    /// Controls how results are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto, global = true)]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// A domain selected by name.
#[derive(Args, Debug, Clone)]
pub(crate) struct DomainName {
    /// Domain name.
    pub(crate) name: String,
}

/// A network selected by name.
#[derive(Args, Debug, Clone)]
pub(crate) struct NetworkName {
    /// Network name.
    pub(crate) name: String,
}

/// A descriptor document read from disk.
#[derive(Args, Debug, Clone)]
pub(crate) struct Descriptor {
    /// Path to the XML descriptor.
    pub(crate) file: PathBuf,
}

/// Listing options.
#[derive(Args, Debug, Clone, Copy)]
pub(crate) struct Listing {
    /// Includes defined but inactive objects.
    #[arg(long)]
    pub(crate) all: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Prints the supervisor version.
    Version,
    /// Prints the host node summary.
    Nodeinfo,
    /// Lists running domains.
    List(Listing),
    /// Creates and starts a transient domain.
    Create(Descriptor),
    /// Defines a persistent domain without starting it.
    Define(Descriptor),
    /// Removes a domain definition.
    Undefine(DomainName),
    /// Starts a defined domain.
    Start(DomainName),
    /// Pauses a running domain.
    Suspend(DomainName),
    /// Resumes a paused domain.
    Resume(DomainName),
    /// Stops a running domain.
    Shutdown(DomainName),
    /// Forcibly stops a running domain.
    Destroy(DomainName),
    /// Prints the run state of a domain.
    Dominfo(DomainName),
    /// Prints a domain descriptor.
    Dumpxml(DomainName),
    /// Saves a running domain to a file.
    Save {
        /// Domain name.
        name: String,
        /// Destination file.
        file: PathBuf,
    },
    /// Restores a domain from a saved file.
    Restore(Descriptor),
    /// Lists active networks.
    NetList(Listing),
    /// Creates and starts a transient network.
    NetCreate(Descriptor),
    /// Defines a persistent network without starting it.
    NetDefine(Descriptor),
    /// Removes a network definition.
    NetUndefine(NetworkName),
    /// Starts a defined network.
    NetStart(NetworkName),
    /// Stops an active network.
    NetDestroy(NetworkName),
    /// Prints a network descriptor.
    NetDumpxml(NetworkName),
    /// Prints the bridge interface backing a network.
    NetBridge(NetworkName),
}

impl Command {
    /// Whether the command manages networks rather than domains.
    pub(crate) const fn targets_networks(&self) -> bool {
        matches!(
            self,
            Self::NetList(_)
                | Self::NetCreate(_)
                | Self::NetDefine(_)
                | Self::NetUndefine(_)
                | Self::NetStart(_)
                | Self::NetDestroy(_)
                | Self::NetDumpxml(_)
                | Self::NetBridge(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(arguments: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("virq").chain(arguments.iter().copied()))
            .expect("arguments parse")
    }

    #[rstest]
    #[case(&["net-list", "--all"], true)]
    #[case(&["net-bridge", "default"], true)]
    #[case(&["list"], false)]
    #[case(&["dominfo", "guest"], false)]
    fn classifies_network_commands(#[case] arguments: &[&str], #[case] expected: bool) {
        assert_eq!(parse(arguments).command.targets_networks(), expected);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = parse(&["version", "--readonly", "--uri", "qemu:///system"]);
        assert!(cli.readonly);
        assert_eq!(cli.uri.as_deref(), Some("qemu:///system"));
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        let cli = parse(&["--log-format", "JSON", "version"]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn save_takes_name_and_file() {
        let cli = parse(&["save", "guest", "/tmp/guest.img"]);
        assert!(matches!(
            cli.command,
            Command::Save { ref name, ref file }
                if name == "guest" && file == &PathBuf::from("/tmp/guest.img")
        ));
    }

    #[test]
    fn rejects_missing_subcommand() {
        assert!(Cli::try_parse_from(["virq"]).is_err());
    }
}
