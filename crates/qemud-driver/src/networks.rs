//! Virtual network operations of [`QemuSession`].
//!
//! Unlike the domain listings, network listings fail when the daemon reports
//! more entries than the caller can take.

use qemud_protocol::{Reply, Request, Uuid};

use crate::domains::{reply_count, reply_identity, reply_names, reply_xml};
use crate::driver::NetworkDriver;
use crate::error::DriverError;
use crate::handle::Network;
use crate::session::{QemuSession, count};

impl QemuSession {
    fn adopt_network(&mut self, name: String, uuid: Uuid) -> Result<Network, DriverError> {
        let result = self
            .networks
            .acquire(uuid, &name)
            .map(|_| Network::new(name, uuid))
            .map_err(DriverError::from);
        self.translator.check(result, None)
    }

    fn network_request(&mut self, request: &Request, network: &Network) -> Result<(), DriverError> {
        self.dispatch(request, Some(network.name()), |reply| {
            matches!(reply, Reply::Empty).then_some(())
        })
    }

    fn bounded_names(
        &mut self,
        request: &Request,
        what: &'static str,
        capacity: usize,
    ) -> Result<Vec<String>, DriverError> {
        let result = self.call(request, reply_names).and_then(|names| {
            if names.len() > capacity {
                Err(DriverError::CapacityExceeded {
                    what,
                    count: names.len(),
                    capacity,
                })
            } else {
                Ok(names)
            }
        });
        self.translator.check(result, None)
    }
}

impl NetworkDriver for QemuSession {
    fn num_of_networks(&mut self) -> Result<usize, DriverError> {
        let result = self
            .call(&Request::NumNetworks, reply_count)
            .and_then(|raw| count("networks", raw));
        self.translator.check(result, None)
    }

    fn list_networks(&mut self, capacity: usize) -> Result<Vec<String>, DriverError> {
        self.bounded_names(&Request::ListNetworks, "networks", capacity)
    }

    fn num_of_defined_networks(&mut self) -> Result<usize, DriverError> {
        let result = self
            .call(&Request::NumDefinedNetworks, reply_count)
            .and_then(|raw| count("defined networks", raw));
        self.translator.check(result, None)
    }

    fn list_defined_networks(&mut self, capacity: usize) -> Result<Vec<String>, DriverError> {
        self.bounded_names(&Request::ListDefinedNetworks, "defined networks", capacity)
    }

    fn lookup_network_by_uuid(&mut self, uuid: Uuid) -> Result<Network, DriverError> {
        let name = self.dispatch(&Request::NetworkLookupByUuid { uuid }, None, |reply| {
            match reply {
                Reply::Name(name) => Some(name),
                _ => None,
            }
        })?;
        self.adopt_network(name, uuid)
    }

    fn lookup_network_by_name(&mut self, name: &str) -> Result<Network, DriverError> {
        let request = Request::NetworkLookupByName {
            name: name.to_owned(),
        };
        let uuid = self.dispatch(&request, Some(name), |reply| match reply {
            Reply::Uuid(uuid) => Some(uuid),
            _ => None,
        })?;
        self.adopt_network(name.to_owned(), uuid)
    }

    fn create_network(&mut self, descriptor: &str) -> Result<Network, DriverError> {
        let request = Request::NetworkCreate {
            xml: descriptor.to_owned(),
        };
        let (uuid, name) = self.dispatch(&request, None, reply_identity)?;
        self.adopt_network(name, uuid)
    }

    fn define_network(&mut self, descriptor: &str) -> Result<Network, DriverError> {
        let request = Request::NetworkDefine {
            xml: descriptor.to_owned(),
        };
        let (uuid, name) = self.dispatch(&request, None, reply_identity)?;
        self.adopt_network(name, uuid)
    }

    fn undefine_network(&mut self, network: &Network) -> Result<(), DriverError> {
        let request = Request::NetworkUndefine {
            uuid: network.uuid(),
        };
        self.network_request(&request, network)?;
        self.release_network(network)
    }

    fn start_network(&mut self, network: &Network) -> Result<(), DriverError> {
        let request = Request::NetworkStart {
            uuid: network.uuid(),
        };
        self.network_request(&request, network)
    }

    fn destroy_network(&mut self, network: &Network) -> Result<(), DriverError> {
        let request = Request::NetworkDestroy {
            uuid: network.uuid(),
        };
        self.network_request(&request, network)
    }

    fn network_xml(&mut self, network: &Network) -> Result<String, DriverError> {
        let request = Request::NetworkDumpXml {
            uuid: network.uuid(),
        };
        self.dispatch(&request, Some(network.name()), reply_xml)
    }

    fn network_bridge_name(&mut self, network: &Network) -> Result<String, DriverError> {
        let request = Request::NetworkGetBridgeName {
            uuid: network.uuid(),
        };
        self.dispatch(&request, Some(network.name()), |reply| match reply {
            Reply::Interface(name) => Some(name),
            _ => None,
        })
    }

    fn release_network(&mut self, network: &Network) -> Result<(), DriverError> {
        let result = self
            .networks
            .release(network.uuid())
            .map(|_| ())
            .map_err(DriverError::from);
        self.translator.check(result, Some(network.name()))
    }
}
