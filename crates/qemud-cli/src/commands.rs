//! Maps each subcommand onto session operations.

use std::fs;
use std::path::Path;

use qemud_driver::{Domain, HypervisorDriver, Network, NetworkDriver, Session};
use tracing::debug;

use crate::cli::Command;
use crate::errors::AppError;
use crate::output::{DomainStatus, DomainSummary, NetworkSummary, NodeSummary, Outcome};

/// Runs `command` on an open session.
pub(crate) fn execute(session: &mut dyn Session, command: Command) -> Result<Outcome, AppError> {
    debug!(?command, "executing command");
    let outcome = match command {
        Command::Version => Outcome::Version {
            version: session.version()?,
        },
        Command::Nodeinfo => Outcome::Node(NodeSummary::from(session.node_info()?)),
        Command::List(listing) => Outcome::Domains {
            domains: list_domains(session, listing.all)?,
        },
        Command::Create(descriptor) => {
            let xml = read_descriptor(&descriptor.file)?;
            domain_outcome("created", &session.create_domain(&xml)?)
        }
        Command::Define(descriptor) => {
            let xml = read_descriptor(&descriptor.file)?;
            domain_outcome("defined", &session.define_domain(&xml)?)
        }
        Command::Undefine(target) => {
            let domain = session.lookup_domain_by_name(&target.name)?;
            session.undefine_domain(&domain)?;
            domain_outcome("undefined", &domain)
        }
        Command::Start(target) => {
            let mut domain = session.lookup_domain_by_name(&target.name)?;
            session.start_domain(&mut domain)?;
            domain_outcome("started", &domain)
        }
        Command::Suspend(target) => {
            let domain = session.lookup_domain_by_name(&target.name)?;
            session.suspend_domain(&domain)?;
            domain_outcome("suspended", &domain)
        }
        Command::Resume(target) => {
            let domain = session.lookup_domain_by_name(&target.name)?;
            session.resume_domain(&domain)?;
            domain_outcome("resumed", &domain)
        }
        Command::Shutdown(target) => {
            let domain = session.lookup_domain_by_name(&target.name)?;
            session.shutdown_domain(&domain)?;
            domain_outcome("is being shut down", &domain)
        }
        Command::Destroy(target) => {
            let domain = session.lookup_domain_by_name(&target.name)?;
            session.destroy_domain(&domain)?;
            domain_outcome("destroyed", &domain)
        }
        Command::Dominfo(target) => {
            let domain = session.lookup_domain_by_name(&target.name)?;
            let info = session.domain_info(&domain)?;
            Outcome::Status(DomainStatus::new(domain.name(), &info))
        }
        Command::Dumpxml(target) => {
            let domain = session.lookup_domain_by_name(&target.name)?;
            Outcome::Document {
                document: session.domain_xml(&domain)?,
            }
        }
        Command::Save { name, file } => {
            let domain = session.lookup_domain_by_name(&name)?;
            session.save_domain(&domain, &file)?;
            domain_outcome("saved", &domain)
        }
        Command::Restore(saved) => domain_outcome("restored", &session.restore_domain(&saved.file)?),
        Command::NetList(listing) => Outcome::Networks {
            networks: list_networks(session, listing.all)?,
        },
        Command::NetCreate(descriptor) => {
            let xml = read_descriptor(&descriptor.file)?;
            network_outcome("created", &session.create_network(&xml)?)
        }
        Command::NetDefine(descriptor) => {
            let xml = read_descriptor(&descriptor.file)?;
            network_outcome("defined", &session.define_network(&xml)?)
        }
        Command::NetUndefine(target) => {
            let network = session.lookup_network_by_name(&target.name)?;
            session.undefine_network(&network)?;
            network_outcome("undefined", &network)
        }
        Command::NetStart(target) => {
            let network = session.lookup_network_by_name(&target.name)?;
            session.start_network(&network)?;
            network_outcome("started", &network)
        }
        Command::NetDestroy(target) => {
            let network = session.lookup_network_by_name(&target.name)?;
            session.destroy_network(&network)?;
            network_outcome("destroyed", &network)
        }
        Command::NetDumpxml(target) => {
            let network = session.lookup_network_by_name(&target.name)?;
            Outcome::Document {
                document: session.network_xml(&network)?,
            }
        }
        Command::NetBridge(target) => {
            let network = session.lookup_network_by_name(&target.name)?;
            Outcome::Bridge {
                interface: session.network_bridge_name(&network)?,
                network: target.name,
            }
        }
    };
    Ok(outcome)
}

fn domain_outcome(action: &'static str, domain: &Domain) -> Outcome {
    Outcome::Domain {
        action,
        domain: DomainSummary::from(domain),
    }
}

fn network_outcome(action: &'static str, network: &Network) -> Outcome {
    Outcome::Network {
        action,
        network: NetworkSummary::from(network),
    }
}

/// Running domains by id, followed by defined ones when `all` is set.
fn list_domains(session: &mut dyn Session, all: bool) -> Result<Vec<DomainSummary>, AppError> {
    let running = session.num_of_domains()?;
    let mut summaries = Vec::new();
    for id in session.list_domains(running)? {
        summaries.push(DomainSummary::from(&session.lookup_domain_by_id(id)?));
    }
    if all {
        let defined = session.num_of_defined_domains()?;
        for name in session.list_defined_domains(defined)? {
            summaries.push(DomainSummary::from(&session.lookup_domain_by_name(&name)?));
        }
    }
    Ok(summaries)
}

fn list_networks(session: &mut dyn Session, all: bool) -> Result<Vec<NetworkSummary>, AppError> {
    let active = session.num_of_networks()?;
    let mut names = session.list_networks(active)?;
    if all {
        let defined = session.num_of_defined_networks()?;
        names.extend(session.list_defined_networks(defined)?);
    }
    names
        .iter()
        .map(|name| {
            session
                .lookup_network_by_name(name)
                .map(|network| NetworkSummary::from(&network))
                .map_err(AppError::from)
        })
        .collect()
}

fn read_descriptor(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| AppError::ReadDescriptor {
        path: path.to_path_buf(),
        source,
    })
}
