//! Rendering of command results.
//!
//! Every command produces one [`Outcome`]. Terminals get aligned text;
//! redirected output gets one JSON document per invocation.

use std::io::{self, Write};

use clap::ValueEnum;
use qemud_driver::{Domain, DomainRunInfo, Network, NodeInfo};
use serde::Serialize;

/// Output format selection.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit JSON.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Aligned text.
    Human,
    /// A JSON document.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto if stdout_is_terminal => ResolvedOutputFormat::Human,
            Self::Auto | Self::Json => ResolvedOutputFormat::Json,
            Self::Human => ResolvedOutputFormat::Human,
        }
    }
}

/// A domain row in listings and command results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSummary {
    pub name: String,
    pub uuid: String,
    pub id: Option<i32>,
}

impl From<&Domain> for DomainSummary {
    fn from(domain: &Domain) -> Self {
        Self {
            name: domain.name().to_owned(),
            uuid: domain.uuid().to_string(),
            id: domain.id(),
        }
    }
}

/// A network row in listings and command results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub name: String,
    pub uuid: String,
}

impl From<&Network> for NetworkSummary {
    fn from(network: &Network) -> Self {
        Self {
            name: network.name().to_owned(),
            uuid: network.uuid().to_string(),
        }
    }
}

/// Host capabilities as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub model: String,
    pub memory_kib: u32,
    pub cpus: u32,
    pub mhz: u32,
    pub nodes: u32,
    pub sockets: u32,
    pub cores: u32,
    pub threads: u32,
}

impl From<NodeInfo> for NodeSummary {
    fn from(info: NodeInfo) -> Self {
        Self {
            model: info.model,
            memory_kib: info.memory,
            cpus: info.cpus,
            mhz: info.mhz,
            nodes: info.nodes,
            sockets: info.sockets,
            cores: info.cores,
            threads: info.threads,
        }
    }
}

/// Run state of a single domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainStatus {
    pub name: String,
    pub state: String,
    pub max_memory_kib: u32,
    pub memory_kib: u32,
    pub virt_cpus: u32,
    pub cpu_time_ns: u64,
}

impl DomainStatus {
    pub(crate) fn new(name: &str, info: &DomainRunInfo) -> Self {
        Self {
            name: name.to_owned(),
            state: info.state.to_string(),
            max_memory_kib: info.max_memory,
            memory_kib: info.memory,
            virt_cpus: info.virt_cpus,
            cpu_time_ns: info.cpu_time,
        }
    }
}

/// Result of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Version { version: i32 },
    Node(NodeSummary),
    Domains { domains: Vec<DomainSummary> },
    Networks { networks: Vec<NetworkSummary> },
    Domain { action: &'static str, domain: DomainSummary },
    Network { action: &'static str, network: NetworkSummary },
    Status(DomainStatus),
    Document { document: String },
    Bridge { network: String, interface: String },
}

/// Writes `outcome` to `out` in the requested format.
pub fn render<W: Write>(
    outcome: &Outcome,
    format: ResolvedOutputFormat,
    out: &mut W,
) -> io::Result<()> {
    match format {
        ResolvedOutputFormat::Json => {
            serde_json::to_writer(&mut *out, outcome)?;
            writeln!(out)
        }
        ResolvedOutputFormat::Human => render_human(outcome, out),
    }
}

fn render_human<W: Write>(outcome: &Outcome, out: &mut W) -> io::Result<()> {
    match outcome {
        Outcome::Version { version } => writeln!(out, "{}", format_version(*version)),
        Outcome::Node(node) => {
            writeln!(out, "{:<16}{}", "CPU model:", node.model)?;
            writeln!(out, "{:<16}{}", "CPU(s):", node.cpus)?;
            writeln!(out, "{:<16}{} MHz", "CPU frequency:", node.mhz)?;
            writeln!(out, "{:<16}{}", "NUMA cell(s):", node.nodes)?;
            writeln!(out, "{:<16}{}", "Socket(s):", node.sockets)?;
            writeln!(out, "{:<16}{}", "Core(s):", node.cores)?;
            writeln!(out, "{:<16}{}", "Thread(s):", node.threads)?;
            writeln!(out, "{:<16}{} KiB", "Memory:", node.memory_kib)
        }
        Outcome::Domains { domains } => {
            writeln!(out, "{:>5}  {:<20}  UUID", "ID", "NAME")?;
            for domain in domains {
                let id = domain
                    .id
                    .map_or_else(|| String::from("-"), |id| id.to_string());
                writeln!(out, "{id:>5}  {:<20}  {}", domain.name, domain.uuid)?;
            }
            Ok(())
        }
        Outcome::Networks { networks } => {
            writeln!(out, "{:<20}  UUID", "NAME")?;
            for network in networks {
                writeln!(out, "{:<20}  {}", network.name, network.uuid)?;
            }
            Ok(())
        }
        Outcome::Domain { action, domain } => {
            writeln!(out, "Domain {} {action}", domain.name)
        }
        Outcome::Network { action, network } => {
            writeln!(out, "Network {} {action}", network.name)
        }
        Outcome::Status(status) => {
            writeln!(out, "{:<16}{}", "Name:", status.name)?;
            writeln!(out, "{:<16}{}", "State:", status.state)?;
            writeln!(out, "{:<16}{}", "CPU(s):", status.virt_cpus)?;
            writeln!(out, "{:<16}{} ns", "CPU time:", status.cpu_time_ns)?;
            writeln!(out, "{:<16}{} KiB", "Max memory:", status.max_memory_kib)?;
            writeln!(out, "{:<16}{} KiB", "Used memory:", status.memory_kib)
        }
        Outcome::Document { document } => writeln!(out, "{document}"),
        Outcome::Bridge { interface, .. } => writeln!(out, "{interface}"),
    }
}

/// Splits the packed `major * 1_000_000 + minor * 1_000 + release` form.
fn format_version(version: i32) -> String {
    let major = version / 1_000_000;
    let minor = (version % 1_000_000) / 1_000;
    let release = version % 1_000;
    format!("Hypervisor version: {major}.{minor}.{release}")
}
