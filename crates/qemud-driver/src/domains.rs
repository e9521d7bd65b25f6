//! Connection and domain operations of [`QemuSession`].

use std::path::Path;

use qemud_protocol::{NodeInfo, Reply, Request, Uuid};

use crate::driver::HypervisorDriver;
use crate::error::DriverError;
use crate::handle::{Domain, DomainRunInfo, NOT_RUNNING};
use crate::session::{QemuSession, count};

impl QemuSession {
    /// Registers a domain handle built from a successful reply.
    fn adopt_domain(&mut self, name: String, uuid: Uuid, id: i32) -> Result<Domain, DriverError> {
        let result = self
            .domains
            .acquire(uuid, &name)
            .map(|_| Domain::new(name, uuid, id))
            .map_err(DriverError::from);
        self.translator.check(result, None)
    }

    fn domain_request(
        &mut self,
        request: &Request,
        domain: &Domain,
    ) -> Result<(), DriverError> {
        self.dispatch(request, Some(domain.name()), |reply| {
            matches!(reply, Reply::Empty).then_some(())
        })
    }

    fn unsupported<T>(&self, operation: &'static str, object: Option<&str>) -> Result<T, DriverError> {
        self.translator
            .check(Err(DriverError::Unsupported { operation }), object)
    }
}

impl HypervisorDriver for QemuSession {
    fn close(&mut self) {
        self.disconnect();
    }

    fn version(&mut self) -> Result<i32, DriverError> {
        self.dispatch(&Request::GetVersion, None, |reply| match reply {
            Reply::Version(version) => Some(version),
            _ => None,
        })
    }

    fn node_info(&mut self) -> Result<NodeInfo, DriverError> {
        self.dispatch(&Request::GetNodeInfo, None, |reply| match reply {
            Reply::NodeInfo(info) => Some(info),
            _ => None,
        })
    }

    fn num_of_domains(&mut self) -> Result<usize, DriverError> {
        let result = self
            .call(&Request::NumDomains, reply_count)
            .and_then(|raw| count("domains", raw));
        self.translator.check(result, None)
    }

    fn list_domains(&mut self, capacity: usize) -> Result<Vec<i32>, DriverError> {
        let mut ids = self.dispatch(&Request::ListDomains, None, |reply| match reply {
            Reply::Ids(ids) => Some(ids),
            _ => None,
        })?;
        ids.truncate(capacity);
        Ok(ids)
    }

    fn num_of_defined_domains(&mut self) -> Result<usize, DriverError> {
        let result = self
            .call(&Request::NumDefinedDomains, reply_count)
            .and_then(|raw| count("defined domains", raw));
        self.translator.check(result, None)
    }

    fn list_defined_domains(&mut self, capacity: usize) -> Result<Vec<String>, DriverError> {
        let mut names = self.dispatch(&Request::ListDefinedDomains, None, reply_names)?;
        names.truncate(capacity);
        Ok(names)
    }

    fn create_domain(&mut self, descriptor: &str) -> Result<Domain, DriverError> {
        let request = Request::DomainCreate {
            xml: descriptor.to_owned(),
        };
        let (id, uuid, name) = self.dispatch(&request, None, |reply| match reply {
            Reply::Created { id, uuid, name } => Some((id, uuid, name)),
            _ => None,
        })?;
        self.adopt_domain(name, uuid, id)
    }

    fn lookup_domain_by_id(&mut self, id: i32) -> Result<Domain, DriverError> {
        let (uuid, name) = self.dispatch(&Request::DomainLookupById { id }, None, reply_identity)?;
        self.adopt_domain(name, uuid, id)
    }

    fn lookup_domain_by_uuid(&mut self, uuid: Uuid) -> Result<Domain, DriverError> {
        let (id, name) = self.dispatch(&Request::DomainLookupByUuid { uuid }, None, |reply| {
            match reply {
                Reply::IdName { id, name } => Some((id, name)),
                _ => None,
            }
        })?;
        self.adopt_domain(name, uuid, id)
    }

    fn lookup_domain_by_name(&mut self, name: &str) -> Result<Domain, DriverError> {
        let request = Request::DomainLookupByName {
            name: name.to_owned(),
        };
        let (id, uuid) = self.dispatch(&request, Some(name), |reply| match reply {
            Reply::IdUuid { id, uuid } => Some((id, uuid)),
            _ => None,
        })?;
        self.adopt_domain(name.to_owned(), uuid, id)
    }

    fn suspend_domain(&mut self, domain: &Domain) -> Result<(), DriverError> {
        let request = Request::DomainSuspend { id: domain.raw_id() };
        self.domain_request(&request, domain)
    }

    fn resume_domain(&mut self, domain: &Domain) -> Result<(), DriverError> {
        let request = Request::DomainResume { id: domain.raw_id() };
        self.domain_request(&request, domain)
    }

    fn shutdown_domain(&mut self, domain: &Domain) -> Result<(), DriverError> {
        self.destroy_domain(domain)
    }

    fn destroy_domain(&mut self, domain: &Domain) -> Result<(), DriverError> {
        let request = Request::DomainDestroy { id: domain.raw_id() };
        self.domain_request(&request, domain)
    }

    fn domain_info(&mut self, domain: &Domain) -> Result<DomainRunInfo, DriverError> {
        let request = Request::DomainGetInfo {
            uuid: domain.uuid(),
        };
        let result = self
            .call(&request, |reply| match reply {
                Reply::DomainInfo(info) => Some(info),
                _ => None,
            })
            .and_then(DomainRunInfo::try_from);
        self.translator.check(result, Some(domain.name()))
    }

    fn domain_xml(&mut self, domain: &Domain) -> Result<String, DriverError> {
        let request = Request::DumpXml {
            uuid: domain.uuid(),
        };
        self.dispatch(&request, Some(domain.name()), reply_xml)
    }

    fn save_domain(&mut self, domain: &Domain, _file: &Path) -> Result<(), DriverError> {
        self.unsupported("save", Some(domain.name()))
    }

    fn restore_domain(&mut self, _file: &Path) -> Result<Domain, DriverError> {
        self.unsupported("restore", None)
    }

    fn start_domain(&mut self, domain: &mut Domain) -> Result<(), DriverError> {
        let request = Request::DomainStart {
            uuid: domain.uuid(),
        };
        let id = self.dispatch(&request, Some(domain.name()), |reply| match reply {
            Reply::Id(id) => Some(id),
            _ => None,
        })?;
        domain.set_id(id);
        Ok(())
    }

    fn define_domain(&mut self, descriptor: &str) -> Result<Domain, DriverError> {
        let request = Request::DomainDefine {
            xml: descriptor.to_owned(),
        };
        let (uuid, name) = self.dispatch(&request, None, reply_identity)?;
        self.adopt_domain(name, uuid, NOT_RUNNING)
    }

    fn undefine_domain(&mut self, domain: &Domain) -> Result<(), DriverError> {
        let request = Request::DomainUndefine {
            uuid: domain.uuid(),
        };
        self.domain_request(&request, domain)?;
        self.release_domain(domain)
    }

    fn release_domain(&mut self, domain: &Domain) -> Result<(), DriverError> {
        let result = self
            .domains
            .release(domain.uuid())
            .map(|_| ())
            .map_err(DriverError::from);
        self.translator.check(result, Some(domain.name()))
    }
}

pub(crate) fn reply_count(reply: Reply) -> Option<i32> {
    match reply {
        Reply::Count(value) => Some(value),
        _ => None,
    }
}

pub(crate) fn reply_names(reply: Reply) -> Option<Vec<String>> {
    match reply {
        Reply::Names(names) => Some(names),
        _ => None,
    }
}

pub(crate) fn reply_identity(reply: Reply) -> Option<(Uuid, String)> {
    match reply {
        Reply::Identity { uuid, name } => Some((uuid, name)),
        _ => None,
    }
}

pub(crate) fn reply_xml(reply: Reply) -> Option<String> {
    match reply {
        Reply::Xml(xml) => Some(xml),
        _ => None,
    }
}
