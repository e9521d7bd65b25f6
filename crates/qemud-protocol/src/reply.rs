//! Reply payload variants.
//!
//! Several operations share a reply layout, so [`Reply`] is organised by
//! layout rather than by operation; the frame's tag says which operation it
//! answers.

use uuid::Uuid;

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::layout::{PayloadReader, PayloadWriter};
use crate::limits::{
    MAX_ERROR_LEN, MAX_IFNAME_LEN, MAX_MODEL_LEN, MAX_NAME_LEN, MAX_NUM_DOMAINS, MAX_XML_LEN,
};
use crate::operation::{Operation, codec_for};

/// Run state reported by the daemon for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Executing guest code.
    Running,
    /// Suspended.
    Paused,
    /// Not running.
    Stopped,
}

impl RunState {
    /// Resolves the raw wire value; anything outside the three states is
    /// rejected.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Running),
            2 => Some(Self::Paused),
            3 => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Raw wire value.
    #[must_use]
    pub const fn raw(self) -> i32 {
        match self {
            Self::Running => 1,
            Self::Paused => 2,
            Self::Stopped => 3,
        }
    }
}

/// Failure payload carried under the reserved tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Error code chosen by the daemon.
    pub code: i32,
    /// Message, absent when the daemon sent an empty buffer.
    pub message: Option<String>,
}

/// Host capability summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeInfo {
    /// CPU model name.
    pub model: String,
    /// Memory size in kilobytes.
    pub memory: u32,
    /// Number of logical CPUs.
    pub cpus: u32,
    /// CPU frequency in MHz.
    pub mhz: u32,
    /// Number of NUMA nodes.
    pub nodes: u32,
    /// Sockets per node.
    pub sockets: u32,
    /// Cores per socket.
    pub cores: u32,
    /// Threads per core.
    pub threads: u32,
}

/// Runtime information for one domain, as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainInfo {
    /// CPU time used, in nanoseconds.
    pub cpu_time: u64,
    /// Raw run state; see [`RunState::from_raw`].
    pub run_state: i32,
    /// Current memory in kilobytes.
    pub memory: u32,
    /// Maximum memory in kilobytes.
    pub max_memory: u32,
    /// Number of virtual CPUs.
    pub virt_cpus: u32,
}

/// A reply from the supervisor daemon, grouped by payload layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Failure frame.
    Failure(Failure),
    /// Empty acknowledgement.
    Empty,
    /// Supervisor version.
    Version(i32),
    /// Host capability summary.
    NodeInfo(NodeInfo),
    /// Object count.
    Count(i32),
    /// Running domain ids.
    Ids(Vec<i32>),
    /// Domain or network names.
    Names(Vec<String>),
    /// Newly created domain.
    Created {
        /// Runtime id.
        id: i32,
        /// Domain UUID.
        uuid: Uuid,
        /// Domain name.
        name: String,
    },
    /// UUID and name of an object.
    Identity {
        /// Object UUID.
        uuid: Uuid,
        /// Object name.
        name: String,
    },
    /// Runtime id and name of a domain.
    IdName {
        /// Runtime id.
        id: i32,
        /// Domain name.
        name: String,
    },
    /// Runtime id and UUID of a domain.
    IdUuid {
        /// Runtime id.
        id: i32,
        /// Domain UUID.
        uuid: Uuid,
    },
    /// Runtime id of a started domain.
    Id(i32),
    /// Domain runtime information.
    DomainInfo(DomainInfo),
    /// Descriptor text.
    Xml(String),
    /// Object name.
    Name(String),
    /// Object UUID.
    Uuid(Uuid),
    /// Bridge interface name.
    Interface(String),
}

impl Reply {
    /// Encodes the reply under `operation`'s tag, as the daemon side does.
    pub fn encode(&self, operation: Operation) -> Result<Frame, ProtocolError> {
        let mut frame = Frame::new(operation);
        let mut writer = PayloadWriter::new(operation.name(), frame.payload_buffer_mut());
        match self {
            Self::Failure(failure) => {
                writer.put_i32(failure.code)?;
                let message = failure.message.as_deref().unwrap_or_default();
                writer.put_text("message", message, MAX_ERROR_LEN)?;
            }
            Self::Empty => {}
            Self::Version(value) | Self::Count(value) | Self::Id(value) => {
                writer.put_i32(*value)?;
            }
            Self::NodeInfo(info) => {
                writer.put_text("model", &info.model, MAX_MODEL_LEN)?;
                for value in [
                    info.memory,
                    info.cpus,
                    info.mhz,
                    info.nodes,
                    info.sockets,
                    info.cores,
                    info.threads,
                ] {
                    writer.put_u32(value)?;
                }
            }
            Self::Ids(ids) => {
                writer.put_i32(listing_count("domain ids", ids.len(), MAX_NUM_DOMAINS)?)?;
                for id in ids {
                    writer.put_i32(*id)?;
                }
                for _ in ids.len()..MAX_NUM_DOMAINS {
                    writer.put_i32(0)?;
                }
            }
            Self::Names(names) => {
                writer.put_i32(listing_count("names", names.len(), MAX_NUM_DOMAINS)?)?;
                for name in names {
                    writer.put_text("name", name, MAX_NAME_LEN)?;
                }
                for _ in names.len()..MAX_NUM_DOMAINS {
                    writer.skip(MAX_NAME_LEN)?;
                }
            }
            Self::Created { id, uuid, name } => {
                writer.put_i32(*id)?;
                writer.put_uuid(uuid)?;
                writer.put_text("name", name, MAX_NAME_LEN)?;
            }
            Self::Identity { uuid, name } => {
                writer.put_uuid(uuid)?;
                writer.put_text("name", name, MAX_NAME_LEN)?;
            }
            Self::IdName { id, name } => {
                writer.put_i32(*id)?;
                writer.put_text("name", name, MAX_NAME_LEN)?;
            }
            Self::IdUuid { id, uuid } => {
                writer.put_i32(*id)?;
                writer.put_uuid(uuid)?;
            }
            Self::DomainInfo(info) => {
                writer.put_u64(info.cpu_time)?;
                writer.put_i32(info.run_state)?;
                writer.put_u32(info.memory)?;
                writer.put_u32(info.max_memory)?;
                writer.put_u32(info.virt_cpus)?;
            }
            Self::Xml(xml) => writer.put_text("descriptor", xml, MAX_XML_LEN)?,
            Self::Name(name) => writer.put_text("name", name, MAX_NAME_LEN)?,
            Self::Uuid(uuid) => writer.put_uuid(uuid)?,
            Self::Interface(name) => writer.put_text("interface", name, MAX_IFNAME_LEN)?,
        }
        let len = writer.finish();
        frame.set_payload_len(len)?;
        Ok(frame)
    }

    /// Decodes a fully received reply frame using its tag's layout.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let codec = codec_for(frame.header().tag)?;
        let mut reader = PayloadReader::new(codec.name, frame.payload());
        (codec.decode_reply)(&mut reader)
    }
}

fn listing_count(field: &'static str, len: usize, max: usize) -> Result<i32, ProtocolError> {
    i32::try_from(len)
        .ok()
        .filter(|_| len <= max)
        .ok_or(ProtocolError::CountOutOfRange {
            field,
            count: i32::try_from(len).unwrap_or(i32::MAX),
            max,
        })
}

pub(crate) fn read_failure(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    let code = reader.i32()?;
    let message = reader.text(MAX_ERROR_LEN)?;
    Ok(Reply::Failure(Failure {
        code,
        message: Some(message).filter(|text| !text.is_empty()),
    }))
}

pub(crate) fn read_empty(_reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    Ok(Reply::Empty)
}

pub(crate) fn read_version(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    reader.i32().map(Reply::Version)
}

pub(crate) fn read_count(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    reader.i32().map(Reply::Count)
}

pub(crate) fn read_id(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    reader.i32().map(Reply::Id)
}

pub(crate) fn read_node_info(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    Ok(Reply::NodeInfo(NodeInfo {
        model: reader.text(MAX_MODEL_LEN)?,
        memory: reader.u32()?,
        cpus: reader.u32()?,
        mhz: reader.u32()?,
        nodes: reader.u32()?,
        sockets: reader.u32()?,
        cores: reader.u32()?,
        threads: reader.u32()?,
    }))
}

pub(crate) fn read_ids(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    let count = reader.count("domain ids", MAX_NUM_DOMAINS)?;
    let ids = (0..count)
        .map(|_| reader.i32())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Reply::Ids(ids))
}

pub(crate) fn read_names(
    reader: &mut PayloadReader<'_>,
    field: &'static str,
    max: usize,
) -> Result<Reply, ProtocolError> {
    let count = reader.count(field, max)?;
    let names = (0..count)
        .map(|_| reader.text(MAX_NAME_LEN))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Reply::Names(names))
}

pub(crate) fn read_created(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    let id = reader.i32()?;
    let uuid = reader.uuid()?;
    let name = reader.text(MAX_NAME_LEN)?;
    Ok(Reply::Created { id, uuid, name })
}

pub(crate) fn read_identity(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    let uuid = reader.uuid()?;
    let name = reader.text(MAX_NAME_LEN)?;
    Ok(Reply::Identity { uuid, name })
}

pub(crate) fn read_id_name(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    let id = reader.i32()?;
    let name = reader.text(MAX_NAME_LEN)?;
    Ok(Reply::IdName { id, name })
}

pub(crate) fn read_id_uuid(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    let id = reader.i32()?;
    let uuid = reader.uuid()?;
    Ok(Reply::IdUuid { id, uuid })
}

pub(crate) fn read_domain_info(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    Ok(Reply::DomainInfo(DomainInfo {
        cpu_time: reader.u64()?,
        run_state: reader.i32()?,
        memory: reader.u32()?,
        max_memory: reader.u32()?,
        virt_cpus: reader.u32()?,
    }))
}

pub(crate) fn read_xml(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    reader.text(MAX_XML_LEN).map(Reply::Xml)
}

pub(crate) fn read_name(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    reader.text(MAX_NAME_LEN).map(Reply::Name)
}

pub(crate) fn read_uuid(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    reader.uuid().map(Reply::Uuid)
}

pub(crate) fn read_interface(reader: &mut PayloadReader<'_>) -> Result<Reply, ProtocolError> {
    reader.text(MAX_IFNAME_LEN).map(Reply::Interface)
}
