//! Operation sets a backend exposes to the management library.
//!
//! [`HypervisorDriver`] covers the connection and domain operations,
//! [`NetworkDriver`] the virtual network ones. A [`Backend`] opens sessions
//! implementing both.

use std::path::Path;

use qemud_config::AccessMode;
use qemud_protocol::{NodeInfo, Uuid};

use crate::error::DriverError;
use crate::handle::{Domain, DomainRunInfo, Network};

/// Options accepted when opening a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Select the read-only socket.
    pub read_only: bool,
    /// Do not report identifiers this backend does not recognise, so other
    /// backends can be probed.
    pub quiet: bool,
}

impl OpenFlags {
    /// Socket access mode implied by the flags.
    #[must_use]
    pub const fn access(self) -> AccessMode {
        if self.read_only {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        }
    }
}

/// Connection-level and domain operations.
pub trait HypervisorDriver {
    /// Closes the connection. Closing twice is a no-op.
    fn close(&mut self);

    /// Supervisor daemon version.
    fn version(&mut self) -> Result<i32, DriverError>;

    /// Host capability summary.
    fn node_info(&mut self) -> Result<NodeInfo, DriverError>;

    /// Number of running domains.
    fn num_of_domains(&mut self) -> Result<usize, DriverError>;

    /// Runtime ids of running domains, truncated to `capacity`.
    fn list_domains(&mut self, capacity: usize) -> Result<Vec<i32>, DriverError>;

    /// Number of defined but inactive domains.
    fn num_of_defined_domains(&mut self) -> Result<usize, DriverError>;

    /// Names of defined but inactive domains, truncated to `capacity`.
    fn list_defined_domains(&mut self, capacity: usize) -> Result<Vec<String>, DriverError>;

    /// Creates and starts a transient domain from a descriptor.
    fn create_domain(&mut self, descriptor: &str) -> Result<Domain, DriverError>;

    fn lookup_domain_by_id(&mut self, id: i32) -> Result<Domain, DriverError>;

    fn lookup_domain_by_uuid(&mut self, uuid: Uuid) -> Result<Domain, DriverError>;

    fn lookup_domain_by_name(&mut self, name: &str) -> Result<Domain, DriverError>;

    fn suspend_domain(&mut self, domain: &Domain) -> Result<(), DriverError>;

    fn resume_domain(&mut self, domain: &Domain) -> Result<(), DriverError>;

    /// Stops a domain. The daemon offers no graceful path, so this destroys
    /// it.
    fn shutdown_domain(&mut self, domain: &Domain) -> Result<(), DriverError>;

    fn destroy_domain(&mut self, domain: &Domain) -> Result<(), DriverError>;

    /// Runtime state and resource usage.
    fn domain_info(&mut self, domain: &Domain) -> Result<DomainRunInfo, DriverError>;

    /// Domain descriptor text.
    fn domain_xml(&mut self, domain: &Domain) -> Result<String, DriverError>;

    /// Always fails: saving is not offered by this backend.
    fn save_domain(&mut self, domain: &Domain, file: &Path) -> Result<(), DriverError>;

    /// Always fails: restoring is not offered by this backend.
    fn restore_domain(&mut self, file: &Path) -> Result<Domain, DriverError>;

    /// Starts a defined domain and records its runtime id on the handle.
    fn start_domain(&mut self, domain: &mut Domain) -> Result<(), DriverError>;

    /// Defines a persistent domain without starting it.
    fn define_domain(&mut self, descriptor: &str) -> Result<Domain, DriverError>;

    /// Removes a domain definition and releases its handle. The handle is
    /// kept when the daemon refuses.
    fn undefine_domain(&mut self, domain: &Domain) -> Result<(), DriverError>;

    /// Drops the caller's reference to a handle.
    fn release_domain(&mut self, domain: &Domain) -> Result<(), DriverError>;
}

/// Virtual network operations.
pub trait NetworkDriver {
    fn num_of_networks(&mut self) -> Result<usize, DriverError>;

    /// Names of active networks; fails when more than `capacity` exist.
    fn list_networks(&mut self, capacity: usize) -> Result<Vec<String>, DriverError>;

    fn num_of_defined_networks(&mut self) -> Result<usize, DriverError>;

    /// Names of inactive networks; fails when more than `capacity` exist.
    fn list_defined_networks(&mut self, capacity: usize) -> Result<Vec<String>, DriverError>;

    fn lookup_network_by_uuid(&mut self, uuid: Uuid) -> Result<Network, DriverError>;

    fn lookup_network_by_name(&mut self, name: &str) -> Result<Network, DriverError>;

    /// Creates and starts a transient network.
    fn create_network(&mut self, descriptor: &str) -> Result<Network, DriverError>;

    fn define_network(&mut self, descriptor: &str) -> Result<Network, DriverError>;

    /// Removes a network definition and releases its handle. The handle is
    /// kept when the daemon refuses.
    fn undefine_network(&mut self, network: &Network) -> Result<(), DriverError>;

    fn start_network(&mut self, network: &Network) -> Result<(), DriverError>;

    fn destroy_network(&mut self, network: &Network) -> Result<(), DriverError>;

    fn network_xml(&mut self, network: &Network) -> Result<String, DriverError>;

    /// Name of the bridge interface backing the network.
    fn network_bridge_name(&mut self, network: &Network) -> Result<String, DriverError>;

    fn release_network(&mut self, network: &Network) -> Result<(), DriverError>;
}

/// An open connection offering every operation.
pub trait Session: HypervisorDriver + NetworkDriver + Send {}

impl<T: HypervisorDriver + NetworkDriver + Send> Session for T {}

/// A pluggable hypervisor backend.
pub trait Backend: Send + Sync {
    /// Display name.
    fn name(&self) -> &'static str;

    /// URI scheme the backend answers to.
    fn scheme(&self) -> &'static str;

    /// Opens a session for `uri`.
    fn open(&self, uri: &str, flags: OpenFlags) -> Result<Box<dyn Session>, DriverError>;

    /// Opens a session for network management, falling back to a default
    /// identifier when `uri` is absent or belongs to another backend.
    fn open_network(
        &self,
        uri: Option<&str>,
        flags: OpenFlags,
    ) -> Result<Box<dyn Session>, DriverError>;
}
