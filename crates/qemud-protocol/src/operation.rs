//! Operation tags and the per-tag codec table.
//!
//! The table is the single place where a tag is tied to its wire name and to
//! the decoders for its request and reply variants. Adding an operation means
//! adding a variant and a row; nothing else branches on tags.

use crate::error::ProtocolError;
use crate::layout::PayloadReader;
use crate::limits::{MAX_NAME_LEN, MAX_NUM_DOMAINS, MAX_NUM_NETWORKS, MAX_PATH_LEN, MAX_XML_LEN};
use crate::reply::{self, Reply};
use crate::request::Request;

/// Operations understood by the supervisor daemon, in wire tag order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operation {
    /// Reserved tag carried by failure replies.
    Failure = 0,
    /// Supervisor version.
    GetVersion,
    /// Host capability summary.
    GetNodeInfo,
    /// Numeric ids of running domains.
    ListDomains,
    /// Number of running domains.
    NumDomains,
    /// Create and start a transient domain.
    DomainCreate,
    /// Look a domain up by runtime id.
    DomainLookupById,
    /// Look a domain up by UUID.
    DomainLookupByUuid,
    /// Look a domain up by name.
    DomainLookupByName,
    /// Pause a running domain.
    DomainSuspend,
    /// Resume a paused domain.
    DomainResume,
    /// Stop a domain immediately.
    DomainDestroy,
    /// Runtime information for a domain.
    DomainGetInfo,
    /// Save a domain to a file.
    DomainSave,
    /// Restore a domain from a file.
    DomainRestore,
    /// Domain descriptor text.
    DumpXml,
    /// Names of defined but inactive domains.
    ListDefinedDomains,
    /// Number of defined but inactive domains.
    NumDefinedDomains,
    /// Start a defined domain.
    DomainStart,
    /// Persist a domain definition.
    DomainDefine,
    /// Remove a domain definition.
    DomainUndefine,
    /// Number of active networks.
    NumNetworks,
    /// Names of active networks.
    ListNetworks,
    /// Number of defined but inactive networks.
    NumDefinedNetworks,
    /// Names of defined but inactive networks.
    ListDefinedNetworks,
    /// Look a network up by UUID.
    NetworkLookupByUuid,
    /// Look a network up by name.
    NetworkLookupByName,
    /// Create and start a transient network.
    NetworkCreate,
    /// Persist a network definition.
    NetworkDefine,
    /// Remove a network definition.
    NetworkUndefine,
    /// Start a defined network.
    NetworkStart,
    /// Stop an active network.
    NetworkDestroy,
    /// Network descriptor text.
    NetworkDumpXml,
    /// Bridge interface backing a network.
    NetworkGetBridgeName,
}

impl Operation {
    /// Returns the wire tag.
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Resolves a wire tag.
    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        lookup(tag).map(|codec| codec.operation)
    }

    /// Returns the wire name used in logs and error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        lookup(self.tag()).map_or("unknown", |codec| codec.name)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name())
    }
}

type RequestDecoder = fn(&mut PayloadReader<'_>) -> Result<Request, ProtocolError>;
type ReplyDecoder = fn(&mut PayloadReader<'_>) -> Result<Reply, ProtocolError>;

/// One row of the codec table.
pub(crate) struct OperationCodec {
    pub(crate) operation: Operation,
    pub(crate) name: &'static str,
    pub(crate) decode_request: RequestDecoder,
    pub(crate) decode_reply: ReplyDecoder,
}

/// Looks up the codec row for a raw tag.
pub(crate) fn lookup(tag: u32) -> Option<&'static OperationCodec> {
    usize::try_from(tag).ok().and_then(|index| CODECS.get(index))
}

/// Looks up the codec row for a raw tag, failing on unknown tags.
pub(crate) fn codec_for(tag: u32) -> Result<&'static OperationCodec, ProtocolError> {
    lookup(tag).ok_or(ProtocolError::UnknownOperation { tag })
}

fn no_request(reader: &mut PayloadReader<'_>) -> Result<Request, ProtocolError> {
    let _ = reader;
    Err(ProtocolError::UnknownOperation {
        tag: Operation::Failure.tag(),
    })
}

fn xml(reader: &mut PayloadReader<'_>) -> Result<String, ProtocolError> {
    reader.text(MAX_XML_LEN)
}

fn name(reader: &mut PayloadReader<'_>) -> Result<String, ProtocolError> {
    reader.text(MAX_NAME_LEN)
}

static CODECS: [OperationCodec; 34] = [
    OperationCodec {
        operation: Operation::Failure,
        name: "failure",
        decode_request: no_request,
        decode_reply: reply::read_failure,
    },
    OperationCodec {
        operation: Operation::GetVersion,
        name: "get_version",
        decode_request: |_| Ok(Request::GetVersion),
        decode_reply: reply::read_version,
    },
    OperationCodec {
        operation: Operation::GetNodeInfo,
        name: "get_node_info",
        decode_request: |_| Ok(Request::GetNodeInfo),
        decode_reply: reply::read_node_info,
    },
    OperationCodec {
        operation: Operation::ListDomains,
        name: "list_domains",
        decode_request: |_| Ok(Request::ListDomains),
        decode_reply: reply::read_ids,
    },
    OperationCodec {
        operation: Operation::NumDomains,
        name: "num_domains",
        decode_request: |_| Ok(Request::NumDomains),
        decode_reply: reply::read_count,
    },
    OperationCodec {
        operation: Operation::DomainCreate,
        name: "domain_create",
        decode_request: |reader| Ok(Request::DomainCreate { xml: xml(reader)? }),
        decode_reply: reply::read_created,
    },
    OperationCodec {
        operation: Operation::DomainLookupById,
        name: "domain_lookup_by_id",
        decode_request: |reader| Ok(Request::DomainLookupById { id: reader.i32()? }),
        decode_reply: reply::read_identity,
    },
    OperationCodec {
        operation: Operation::DomainLookupByUuid,
        name: "domain_lookup_by_uuid",
        decode_request: |reader| Ok(Request::DomainLookupByUuid { uuid: reader.uuid()? }),
        decode_reply: reply::read_id_name,
    },
    OperationCodec {
        operation: Operation::DomainLookupByName,
        name: "domain_lookup_by_name",
        decode_request: |reader| Ok(Request::DomainLookupByName { name: name(reader)? }),
        decode_reply: reply::read_id_uuid,
    },
    OperationCodec {
        operation: Operation::DomainSuspend,
        name: "domain_suspend",
        decode_request: |reader| Ok(Request::DomainSuspend { id: reader.i32()? }),
        decode_reply: reply::read_empty,
    },
    OperationCodec {
        operation: Operation::DomainResume,
        name: "domain_resume",
        decode_request: |reader| Ok(Request::DomainResume { id: reader.i32()? }),
        decode_reply: reply::read_empty,
    },
    OperationCodec {
        operation: Operation::DomainDestroy,
        name: "domain_destroy",
        decode_request: |reader| Ok(Request::DomainDestroy { id: reader.i32()? }),
        decode_reply: reply::read_empty,
    },
    OperationCodec {
        operation: Operation::DomainGetInfo,
        name: "domain_get_info",
        decode_request: |reader| Ok(Request::DomainGetInfo { uuid: reader.uuid()? }),
        decode_reply: reply::read_domain_info,
    },
    OperationCodec {
        operation: Operation::DomainSave,
        name: "domain_save",
        decode_request: |reader| {
            let id = reader.i32()?;
            let file = reader.text(MAX_PATH_LEN)?;
            Ok(Request::DomainSave { id, file })
        },
        decode_reply: reply::read_empty,
    },
    OperationCodec {
        operation: Operation::DomainRestore,
        name: "domain_restore",
        decode_request: |reader| {
            Ok(Request::DomainRestore {
                file: reader.text(MAX_PATH_LEN)?,
            })
        },
        decode_reply: reply::read_id,
    },
    OperationCodec {
        operation: Operation::DumpXml,
        name: "dump_xml",
        decode_request: |reader| Ok(Request::DumpXml { uuid: reader.uuid()? }),
        decode_reply: reply::read_xml,
    },
    OperationCodec {
        operation: Operation::ListDefinedDomains,
        name: "list_defined_domains",
        decode_request: |_| Ok(Request::ListDefinedDomains),
        decode_reply: |reader| reply::read_names(reader, "defined domains", MAX_NUM_DOMAINS),
    },
    OperationCodec {
        operation: Operation::NumDefinedDomains,
        name: "num_defined_domains",
        decode_request: |_| Ok(Request::NumDefinedDomains),
        decode_reply: reply::read_count,
    },
    OperationCodec {
        operation: Operation::DomainStart,
        name: "domain_start",
        decode_request: |reader| Ok(Request::DomainStart { uuid: reader.uuid()? }),
        decode_reply: reply::read_id,
    },
    OperationCodec {
        operation: Operation::DomainDefine,
        name: "domain_define",
        decode_request: |reader| Ok(Request::DomainDefine { xml: xml(reader)? }),
        decode_reply: reply::read_identity,
    },
    OperationCodec {
        operation: Operation::DomainUndefine,
        name: "domain_undefine",
        decode_request: |reader| Ok(Request::DomainUndefine { uuid: reader.uuid()? }),
        decode_reply: reply::read_empty,
    },
    OperationCodec {
        operation: Operation::NumNetworks,
        name: "num_networks",
        decode_request: |_| Ok(Request::NumNetworks),
        decode_reply: reply::read_count,
    },
    OperationCodec {
        operation: Operation::ListNetworks,
        name: "list_networks",
        decode_request: |_| Ok(Request::ListNetworks),
        decode_reply: |reader| reply::read_names(reader, "networks", MAX_NUM_NETWORKS),
    },
    OperationCodec {
        operation: Operation::NumDefinedNetworks,
        name: "num_defined_networks",
        decode_request: |_| Ok(Request::NumDefinedNetworks),
        decode_reply: reply::read_count,
    },
    OperationCodec {
        operation: Operation::ListDefinedNetworks,
        name: "list_defined_networks",
        decode_request: |_| Ok(Request::ListDefinedNetworks),
        decode_reply: |reader| reply::read_names(reader, "defined networks", MAX_NUM_NETWORKS),
    },
    OperationCodec {
        operation: Operation::NetworkLookupByUuid,
        name: "network_lookup_by_uuid",
        decode_request: |reader| Ok(Request::NetworkLookupByUuid { uuid: reader.uuid()? }),
        decode_reply: reply::read_name,
    },
    OperationCodec {
        operation: Operation::NetworkLookupByName,
        name: "network_lookup_by_name",
        decode_request: |reader| Ok(Request::NetworkLookupByName { name: name(reader)? }),
        decode_reply: reply::read_uuid,
    },
    OperationCodec {
        operation: Operation::NetworkCreate,
        name: "network_create",
        decode_request: |reader| Ok(Request::NetworkCreate { xml: xml(reader)? }),
        decode_reply: reply::read_identity,
    },
    OperationCodec {
        operation: Operation::NetworkDefine,
        name: "network_define",
        decode_request: |reader| Ok(Request::NetworkDefine { xml: xml(reader)? }),
        decode_reply: reply::read_identity,
    },
    OperationCodec {
        operation: Operation::NetworkUndefine,
        name: "network_undefine",
        decode_request: |reader| Ok(Request::NetworkUndefine { uuid: reader.uuid()? }),
        decode_reply: reply::read_empty,
    },
    OperationCodec {
        operation: Operation::NetworkStart,
        name: "network_start",
        decode_request: |reader| Ok(Request::NetworkStart { uuid: reader.uuid()? }),
        decode_reply: reply::read_empty,
    },
    OperationCodec {
        operation: Operation::NetworkDestroy,
        name: "network_destroy",
        decode_request: |reader| Ok(Request::NetworkDestroy { uuid: reader.uuid()? }),
        decode_reply: reply::read_empty,
    },
    OperationCodec {
        operation: Operation::NetworkDumpXml,
        name: "network_dump_xml",
        decode_request: |reader| Ok(Request::NetworkDumpXml { uuid: reader.uuid()? }),
        decode_reply: reply::read_xml,
    },
    OperationCodec {
        operation: Operation::NetworkGetBridgeName,
        name: "network_get_bridge_name",
        decode_request: |reader| Ok(Request::NetworkGetBridgeName { uuid: reader.uuid()? }),
        decode_reply: reply::read_interface,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_follow_tag_order() {
        for (index, codec) in CODECS.iter().enumerate() {
            let tag = u32::try_from(index).expect("table index fits in u32");
            assert_eq!(codec.operation.tag(), tag, "row {} is out of order", codec.name);
        }
    }

    #[test]
    fn unknown_tags_do_not_resolve() {
        assert_eq!(Operation::from_tag(34), None);
        assert_eq!(Operation::from_tag(u32::MAX), None);
    }

    #[test]
    fn tags_resolve_to_their_operation() {
        assert_eq!(Operation::from_tag(0), Some(Operation::Failure));
        assert_eq!(
            Operation::from_tag(33),
            Some(Operation::NetworkGetBridgeName)
        );
        assert_eq!(Operation::DomainUndefine.name(), "domain_undefine");
    }
}
