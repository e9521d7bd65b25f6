//! Request payload variants.

use uuid::Uuid;

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::layout::{PayloadReader, PayloadWriter};
use crate::limits::{MAX_NAME_LEN, MAX_PATH_LEN, MAX_XML_LEN};
use crate::operation::{Operation, codec_for};

/// A request the client sends to the supervisor daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Supervisor version.
    GetVersion,
    /// Host capability summary.
    GetNodeInfo,
    /// Running domain ids.
    ListDomains,
    /// Running domain count.
    NumDomains,
    /// Create and start a domain from a descriptor.
    DomainCreate {
        /// Domain descriptor text.
        xml: String,
    },
    /// Look a domain up by runtime id.
    DomainLookupById {
        /// Runtime id.
        id: i32,
    },
    /// Look a domain up by UUID.
    DomainLookupByUuid {
        /// Domain UUID.
        uuid: Uuid,
    },
    /// Look a domain up by name.
    DomainLookupByName {
        /// Domain name.
        name: String,
    },
    /// Pause a domain.
    DomainSuspend {
        /// Runtime id.
        id: i32,
    },
    /// Resume a domain.
    DomainResume {
        /// Runtime id.
        id: i32,
    },
    /// Stop a domain.
    DomainDestroy {
        /// Runtime id.
        id: i32,
    },
    /// Runtime information for a domain.
    DomainGetInfo {
        /// Domain UUID.
        uuid: Uuid,
    },
    /// Save a domain to a file.
    DomainSave {
        /// Runtime id.
        id: i32,
        /// Destination path.
        file: String,
    },
    /// Restore a domain from a file.
    DomainRestore {
        /// Source path.
        file: String,
    },
    /// Domain descriptor text.
    DumpXml {
        /// Domain UUID.
        uuid: Uuid,
    },
    /// Inactive domain names.
    ListDefinedDomains,
    /// Inactive domain count.
    NumDefinedDomains,
    /// Start a defined domain.
    DomainStart {
        /// Domain UUID.
        uuid: Uuid,
    },
    /// Persist a domain definition.
    DomainDefine {
        /// Domain descriptor text.
        xml: String,
    },
    /// Remove a domain definition.
    DomainUndefine {
        /// Domain UUID.
        uuid: Uuid,
    },
    /// Active network count.
    NumNetworks,
    /// Active network names.
    ListNetworks,
    /// Inactive network count.
    NumDefinedNetworks,
    /// Inactive network names.
    ListDefinedNetworks,
    /// Look a network up by UUID.
    NetworkLookupByUuid {
        /// Network UUID.
        uuid: Uuid,
    },
    /// Look a network up by name.
    NetworkLookupByName {
        /// Network name.
        name: String,
    },
    /// Create and start a network from a descriptor.
    NetworkCreate {
        /// Network descriptor text.
        xml: String,
    },
    /// Persist a network definition.
    NetworkDefine {
        /// Network descriptor text.
        xml: String,
    },
    /// Remove a network definition.
    NetworkUndefine {
        /// Network UUID.
        uuid: Uuid,
    },
    /// Start a defined network.
    NetworkStart {
        /// Network UUID.
        uuid: Uuid,
    },
    /// Stop a network.
    NetworkDestroy {
        /// Network UUID.
        uuid: Uuid,
    },
    /// Network descriptor text.
    NetworkDumpXml {
        /// Network UUID.
        uuid: Uuid,
    },
    /// Bridge interface of a network.
    NetworkGetBridgeName {
        /// Network UUID.
        uuid: Uuid,
    },
}

impl Request {
    /// Operation tag carried by this request.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::GetVersion => Operation::GetVersion,
            Self::GetNodeInfo => Operation::GetNodeInfo,
            Self::ListDomains => Operation::ListDomains,
            Self::NumDomains => Operation::NumDomains,
            Self::DomainCreate { .. } => Operation::DomainCreate,
            Self::DomainLookupById { .. } => Operation::DomainLookupById,
            Self::DomainLookupByUuid { .. } => Operation::DomainLookupByUuid,
            Self::DomainLookupByName { .. } => Operation::DomainLookupByName,
            Self::DomainSuspend { .. } => Operation::DomainSuspend,
            Self::DomainResume { .. } => Operation::DomainResume,
            Self::DomainDestroy { .. } => Operation::DomainDestroy,
            Self::DomainGetInfo { .. } => Operation::DomainGetInfo,
            Self::DomainSave { .. } => Operation::DomainSave,
            Self::DomainRestore { .. } => Operation::DomainRestore,
            Self::DumpXml { .. } => Operation::DumpXml,
            Self::ListDefinedDomains => Operation::ListDefinedDomains,
            Self::NumDefinedDomains => Operation::NumDefinedDomains,
            Self::DomainStart { .. } => Operation::DomainStart,
            Self::DomainDefine { .. } => Operation::DomainDefine,
            Self::DomainUndefine { .. } => Operation::DomainUndefine,
            Self::NumNetworks => Operation::NumNetworks,
            Self::ListNetworks => Operation::ListNetworks,
            Self::NumDefinedNetworks => Operation::NumDefinedNetworks,
            Self::ListDefinedNetworks => Operation::ListDefinedNetworks,
            Self::NetworkLookupByUuid { .. } => Operation::NetworkLookupByUuid,
            Self::NetworkLookupByName { .. } => Operation::NetworkLookupByName,
            Self::NetworkCreate { .. } => Operation::NetworkCreate,
            Self::NetworkDefine { .. } => Operation::NetworkDefine,
            Self::NetworkUndefine { .. } => Operation::NetworkUndefine,
            Self::NetworkStart { .. } => Operation::NetworkStart,
            Self::NetworkDestroy { .. } => Operation::NetworkDestroy,
            Self::NetworkDumpXml { .. } => Operation::NetworkDumpXml,
            Self::NetworkGetBridgeName { .. } => Operation::NetworkGetBridgeName,
        }
    }

    /// Encodes the request, sizing the payload to its variant exactly.
    ///
    /// Text values that do not fit their fields are rejected here, before
    /// anything reaches the socket.
    pub fn encode(&self) -> Result<Frame, ProtocolError> {
        let operation = self.operation();
        let mut frame = Frame::new(operation);
        let mut writer = PayloadWriter::new(operation.name(), frame.payload_buffer_mut());
        match self {
            Self::GetVersion
            | Self::GetNodeInfo
            | Self::ListDomains
            | Self::NumDomains
            | Self::ListDefinedDomains
            | Self::NumDefinedDomains
            | Self::NumNetworks
            | Self::ListNetworks
            | Self::NumDefinedNetworks
            | Self::ListDefinedNetworks => {}
            Self::DomainCreate { xml }
            | Self::DomainDefine { xml }
            | Self::NetworkCreate { xml }
            | Self::NetworkDefine { xml } => writer.put_text("descriptor", xml, MAX_XML_LEN)?,
            Self::DomainLookupById { id }
            | Self::DomainSuspend { id }
            | Self::DomainResume { id }
            | Self::DomainDestroy { id } => writer.put_i32(*id)?,
            Self::DomainLookupByName { name } | Self::NetworkLookupByName { name } => {
                writer.put_text("name", name, MAX_NAME_LEN)?;
            }
            Self::DomainLookupByUuid { uuid }
            | Self::DomainGetInfo { uuid }
            | Self::DumpXml { uuid }
            | Self::DomainStart { uuid }
            | Self::DomainUndefine { uuid }
            | Self::NetworkLookupByUuid { uuid }
            | Self::NetworkUndefine { uuid }
            | Self::NetworkStart { uuid }
            | Self::NetworkDestroy { uuid }
            | Self::NetworkDumpXml { uuid }
            | Self::NetworkGetBridgeName { uuid } => writer.put_uuid(uuid)?,
            Self::DomainSave { id, file } => {
                writer.put_i32(*id)?;
                writer.put_text("file", file, MAX_PATH_LEN)?;
            }
            Self::DomainRestore { file } => writer.put_text("file", file, MAX_PATH_LEN)?,
        }
        let len = writer.finish();
        frame.set_payload_len(len)?;
        Ok(frame)
    }

    /// Decodes a request frame, as the daemon side does.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let codec = codec_for(frame.header().tag)?;
        let mut reader = PayloadReader::new(codec.name, frame.payload());
        (codec.decode_request)(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::no_payload(Request::GetVersion, 0)]
    #[case::id(Request::DomainSuspend { id: 4 }, 4)]
    #[case::uuid(Request::DomainStart { uuid: Uuid::nil() }, 16)]
    #[case::name(Request::DomainLookupByName { name: String::from("vm") }, 50)]
    #[case::descriptor(Request::DomainDefine { xml: String::from("<domain/>") }, 4096)]
    #[case::save(Request::DomainSave { id: 1, file: String::from("/tmp/x") }, 4100)]
    fn payload_size_matches_variant(#[case] request: Request, #[case] expected: usize) {
        let frame = request.encode().expect("encode request");
        assert_eq!(frame.payload_len(), expected);
        assert_eq!(frame.to_bytes().len(), 8 + expected);
    }

    #[test]
    fn oversized_descriptor_is_rejected_before_encoding() {
        let request = Request::DomainDefine {
            xml: "x".repeat(MAX_XML_LEN),
        };
        assert!(matches!(
            request.encode(),
            Err(ProtocolError::TextTooLong { len: 4096, max: 4095, .. })
        ));
    }

    #[test]
    fn daemon_side_decodes_lookup_by_name() {
        let request = Request::NetworkLookupByName {
            name: String::from("default"),
        };
        let frame = request.encode().expect("encode request");
        assert_eq!(Request::decode(&frame), Ok(request));
    }
}
