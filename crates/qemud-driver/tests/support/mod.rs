//! Fake supervisor daemon for integration tests.
//!
//! The daemon accepts one connection on a real UNIX socket, decodes each
//! request frame with the shared protocol types and answers with whatever
//! bytes the responder returns, so tests can send malformed replies too.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use qemud_config::{AccessMode, SocketAddress};
use qemud_driver::{ErrorReport, ErrorSink, ErrorTranslator, QemuSession};
use qemud_protocol::{
    DomainInfo, Failure, Frame, HEADER_SIZE, Header, NodeInfo, Operation, Reply, Request, Uuid,
};

/// Produces the raw reply bytes for one request; no bytes hangs up.
pub type Responder = Box<dyn FnMut(&Request) -> Vec<u8> + Send>;

/// A daemon thread serving a single client connection.
pub struct FakeDaemon {
    requests: Arc<Mutex<Vec<Request>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeDaemon {
    /// Listens on a filesystem socket at `path`.
    pub fn bind(path: &Path, responder: Responder) -> Result<Self> {
        let listener = UnixListener::bind(path).context("bind fake daemon")?;
        Ok(Self::serve(listener, responder))
    }

    /// Listens on `address`, which may be in the abstract namespace.
    pub fn bind_address(address: &SocketAddress, responder: Responder) -> Result<Self> {
        use socket2::{Domain, SockAddr, Socket, Type};
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let socket = Socket::new(Domain::UNIX, Type::STREAM, None).context("socket")?;
        let bytes = address.sun_path_bytes();
        socket
            .bind(&SockAddr::unix(OsStr::from_bytes(&bytes)).context("sockaddr")?)
            .context("bind fake daemon")?;
        socket.listen(4).context("listen")?;
        Ok(Self::serve(socket.into(), responder))
    }

    fn serve(listener: UnixListener, mut responder: Responder) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            listener
                .set_nonblocking(true)
                .context("nonblocking listener")?;
            let Some(mut stream) = accept_within(&listener, Duration::from_secs(5))? else {
                return Ok(());
            };
            stream.set_nonblocking(false).context("blocking stream")?;
            while let Some(request) = read_request(&mut stream)? {
                let reply = responder(&request);
                let hang_up = reply.is_empty();
                recorded
                    .lock()
                    .map_err(|error| anyhow!("lock requests: {error}"))?
                    .push(request);
                if hang_up {
                    break;
                }
                stream.write_all(&reply).context("write reply")?;
            }
            Ok(())
        });
        Self {
            requests,
            handle: Some(handle),
        }
    }

    /// Waits for the client to hang up and returns the decoded requests.
    pub fn finish(&mut self) -> Result<Vec<Request>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake daemon thread panicked"))??;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }
}

fn accept_within(listener: &UnixListener, timeout: Duration) -> Result<Option<UnixStream>> {
    let deadline = Instant::now() + timeout;
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(error) => return Err(error).context("accept connection"),
        }
    }
}

fn read_request(stream: &mut UnixStream) -> Result<Option<Request>> {
    let mut header = [0_u8; HEADER_SIZE];
    match stream.read_exact(&mut header) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(error) => return Err(error).context("read request header"),
    }
    let mut frame = Frame::for_header(Header::decode(&header)).context("request header")?;
    stream
        .read_exact(frame.body_mut())
        .context("read request payload")?;
    Request::decode(&frame).map(Some).context("decode request")
}

/// Encodes `reply` under `operation`'s tag.
pub fn frame(operation: Operation, reply: &Reply) -> Vec<u8> {
    reply
        .encode(operation)
        .map(|frame| frame.to_bytes())
        .unwrap_or_default()
}

/// Encodes a failure frame.
pub fn failure(code: i32, message: &str) -> Vec<u8> {
    frame(
        Operation::Failure,
        &Reply::Failure(Failure {
            code,
            message: Some(message.to_owned()),
        }),
    )
}

/// Socket path inside a scratch directory, plus the directory guard.
pub fn scratch_socket() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("scratch directory")?;
    let path = dir.path().join("sock");
    Ok((dir, path))
}

/// Error sink recording every report.
#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<ErrorReport>>);

impl RecordingSink {
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.0.lock().map(|reports| reports.clone()).unwrap_or_default()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, report: &ErrorReport) {
        if let Ok(mut reports) = self.0.lock() {
            reports.push(report.clone());
        }
    }
}

/// Opens a session on a filesystem socket served by a fake daemon.
pub fn session_at(path: &Path, sink: &Arc<RecordingSink>) -> Result<QemuSession> {
    let stream = UnixStream::connect(path).context("connect to fake daemon")?;
    let address = SocketAddress::new(path.to_string_lossy().into_owned())
        .map_err(|error| anyhow!("socket address: {error}"))?;
    Ok(QemuSession::new(
        Box::new(stream),
        address,
        AccessMode::ReadWrite,
        ErrorTranslator::new(Arc::clone(sink) as Arc<dyn ErrorSink>),
    ))
}

/// One object tracked by [`Hypervisor`].
#[derive(Debug, Clone)]
struct Object {
    uuid: Uuid,
    descriptor: String,
    id: Option<i32>,
}

/// Minimal in-memory supervisor used as an end-to-end responder.
///
/// Descriptors are stored verbatim; the object name is taken from the first
/// `<name>` element.
#[derive(Debug, Default)]
pub struct Hypervisor {
    pub version: i32,
    domains: BTreeMap<String, Object>,
    networks: BTreeMap<String, Object>,
    next_id: i32,
}

impl Hypervisor {
    pub fn with_version(version: i32) -> Self {
        Self {
            version,
            next_id: 1,
            ..Self::default()
        }
    }

    /// Adds a running domain directly.
    pub fn run_domain(&mut self, name: &str) {
        let id = self.allocate_id();
        self.domains.insert(
            name.to_owned(),
            Object {
                uuid: uuid_for(name),
                descriptor: format!("<domain><name>{name}</name></domain>"),
                id: Some(id),
            },
        );
    }

    pub fn into_responder(mut self) -> Responder {
        Box::new(move |request: &Request| self.respond(request))
    }

    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn respond(&mut self, request: &Request) -> Vec<u8> {
        let operation = request.operation();
        let reply = match request {
            Request::GetVersion => Reply::Version(self.version),
            Request::GetNodeInfo => Reply::NodeInfo(NodeInfo {
                model: String::from("x86_64"),
                memory: 2_097_152,
                cpus: 4,
                mhz: 2400,
                nodes: 1,
                sockets: 1,
                cores: 2,
                threads: 2,
            }),
            Request::NumDomains => Reply::Count(count(self.domains.values().filter(|d| d.id.is_some()))),
            Request::ListDomains => {
                Reply::Ids(self.domains.values().filter_map(|domain| domain.id).collect())
            }
            Request::NumDefinedDomains => {
                Reply::Count(count(self.domains.values().filter(|d| d.id.is_none())))
            }
            Request::ListDefinedDomains => Reply::Names(
                self.domains
                    .iter()
                    .filter(|(_, domain)| domain.id.is_none())
                    .map(|(name, _)| name.clone())
                    .collect(),
            ),
            Request::DomainDefine { xml } => match name_of(xml) {
                Some(name) => {
                    let uuid = uuid_for(&name);
                    self.domains.insert(
                        name.clone(),
                        Object {
                            uuid,
                            descriptor: xml.clone(),
                            id: None,
                        },
                    );
                    Reply::Identity { uuid, name }
                }
                None => return failure(2, "descriptor has no name"),
            },
            Request::DomainCreate { xml } => match name_of(xml) {
                Some(name) => {
                    let uuid = uuid_for(&name);
                    let id = self.allocate_id();
                    self.domains.insert(
                        name.clone(),
                        Object {
                            uuid,
                            descriptor: xml.clone(),
                            id: Some(id),
                        },
                    );
                    Reply::Created { id, uuid, name }
                }
                None => return failure(2, "descriptor has no name"),
            },
            Request::DomainLookupByName { name } => match self.domains.get(name) {
                Some(domain) => Reply::IdUuid {
                    id: domain.id.unwrap_or(-1),
                    uuid: domain.uuid,
                },
                None => return failure(3, "domain not found"),
            },
            Request::DomainLookupByUuid { uuid } => match find(&self.domains, *uuid) {
                Some((name, domain)) => Reply::IdName {
                    id: domain.id.unwrap_or(-1),
                    name,
                },
                None => return failure(3, "domain not found"),
            },
            Request::DomainLookupById { id } => {
                match self.domains.iter().find(|(_, domain)| domain.id == Some(*id)) {
                    Some((name, domain)) => Reply::Identity {
                        uuid: domain.uuid,
                        name: name.clone(),
                    },
                    None => return failure(3, "domain not found"),
                }
            }
            Request::DumpXml { uuid } => match find(&self.domains, *uuid) {
                Some((_, domain)) => Reply::Xml(domain.descriptor),
                None => return failure(3, "domain not found"),
            },
            Request::DomainStart { uuid } => {
                let id = self.allocate_id();
                match self.domains.values_mut().find(|domain| domain.uuid == *uuid) {
                    Some(domain) => {
                        domain.id = Some(id);
                        Reply::Id(id)
                    }
                    None => return failure(3, "domain not found"),
                }
            }
            Request::DomainDestroy { id }
            | Request::DomainSuspend { id }
            | Request::DomainResume { id } => {
                if self.domains.values().any(|domain| domain.id == Some(*id)) {
                    if matches!(request, Request::DomainDestroy { .. }) {
                        for domain in self.domains.values_mut() {
                            if domain.id == Some(*id) {
                                domain.id = None;
                            }
                        }
                    }
                    Reply::Empty
                } else {
                    return failure(4, "domain is not running");
                }
            }
            Request::DomainGetInfo { uuid } => match find(&self.domains, *uuid) {
                Some((_, domain)) => Reply::DomainInfo(DomainInfo {
                    cpu_time: 1_000,
                    run_state: if domain.id.is_some() { 1 } else { 3 },
                    memory: 524_288,
                    max_memory: 1_048_576,
                    virt_cpus: 1,
                }),
                None => return failure(3, "domain not found"),
            },
            Request::DomainUndefine { uuid } => {
                let before = self.domains.len();
                self.domains.retain(|_, domain| domain.uuid != *uuid);
                if self.domains.len() == before {
                    return failure(3, "domain not found");
                }
                Reply::Empty
            }
            Request::NumNetworks => Reply::Count(count(self.networks.values().filter(|n| n.id.is_some()))),
            Request::NumDefinedNetworks => {
                Reply::Count(count(self.networks.values().filter(|n| n.id.is_none())))
            }
            Request::ListNetworks | Request::ListDefinedNetworks => {
                let active = matches!(request, Request::ListNetworks);
                Reply::Names(
                    self.networks
                        .iter()
                        .filter(|(_, network)| network.id.is_some() == active)
                        .map(|(name, _)| name.clone())
                        .collect(),
                )
            }
            Request::NetworkDefine { xml } | Request::NetworkCreate { xml } => match name_of(xml) {
                Some(name) => {
                    let uuid = uuid_for(&name);
                    let id = matches!(request, Request::NetworkCreate { .. }).then_some(0);
                    self.networks.insert(
                        name.clone(),
                        Object {
                            uuid,
                            descriptor: xml.clone(),
                            id,
                        },
                    );
                    Reply::Identity { uuid, name }
                }
                None => return failure(2, "descriptor has no name"),
            },
            Request::NetworkLookupByName { name } => match self.networks.get(name) {
                Some(network) => Reply::Uuid(network.uuid),
                None => return failure(5, "network not found"),
            },
            Request::NetworkLookupByUuid { uuid } => match find(&self.networks, *uuid) {
                Some((name, _)) => Reply::Name(name),
                None => return failure(5, "network not found"),
            },
            Request::NetworkStart { uuid } | Request::NetworkDestroy { uuid } => {
                let running = matches!(request, Request::NetworkStart { .. }).then_some(0);
                match self.networks.values_mut().find(|network| network.uuid == *uuid) {
                    Some(network) => {
                        network.id = running;
                        Reply::Empty
                    }
                    None => return failure(5, "network not found"),
                }
            }
            Request::NetworkUndefine { uuid } => {
                let before = self.networks.len();
                self.networks.retain(|_, network| network.uuid != *uuid);
                if self.networks.len() == before {
                    return failure(5, "network not found");
                }
                Reply::Empty
            }
            Request::NetworkDumpXml { uuid } => match find(&self.networks, *uuid) {
                Some((_, network)) => Reply::Xml(network.descriptor),
                None => return failure(5, "network not found"),
            },
            Request::NetworkGetBridgeName { uuid } => match find(&self.networks, *uuid) {
                Some((name, _)) => Reply::Interface(format!("vbr-{name}")),
                None => return failure(5, "network not found"),
            },
            Request::DomainSave { .. } | Request::DomainRestore { .. } => {
                return failure(6, "not implemented");
            }
        };
        frame(operation, &reply)
    }
}

fn count<'a>(objects: impl Iterator<Item = &'a Object>) -> i32 {
    i32::try_from(objects.count()).unwrap_or(i32::MAX)
}

fn find(objects: &BTreeMap<String, Object>, uuid: Uuid) -> Option<(String, Object)> {
    objects
        .iter()
        .find(|(_, object)| object.uuid == uuid)
        .map(|(name, object)| (name.clone(), object.clone()))
}

fn name_of(descriptor: &str) -> Option<String> {
    let start = descriptor.find("<name>")? + "<name>".len();
    let end = descriptor.get(start..)?.find("</name>")? + start;
    descriptor.get(start..end).map(str::to_owned)
}

/// Deterministic UUID derived from a name.
pub fn uuid_for(name: &str) -> Uuid {
    let mut bytes = [0_u8; 16];
    for (slot, byte) in bytes.iter_mut().zip(name.bytes().cycle()) {
        *slot = byte;
    }
    Uuid::from_bytes(bytes)
}
