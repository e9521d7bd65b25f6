//! Fixed capacities shared by the client and the supervisor daemon.
//!
//! Every text field on the wire is a fixed byte buffer whose last byte is
//! reserved for the terminator, so the longest accepted value is one byte
//! shorter than the capacity listed here.

/// Raw UUID length in bytes.
pub const UUID_RAW_LEN: usize = 16;
/// Capacity of a domain or network name field.
pub const MAX_NAME_LEN: usize = 50;
/// Capacity of a descriptor (XML) field.
pub const MAX_XML_LEN: usize = 4096;
/// Capacity of a bridge interface name field.
pub const MAX_IFNAME_LEN: usize = 50;
/// Maximum number of entries in a domain listing.
pub const MAX_NUM_DOMAINS: usize = 100;
/// Maximum number of entries in a network listing.
pub const MAX_NUM_NETWORKS: usize = 100;
/// Capacity of the failure message field.
pub const MAX_ERROR_LEN: usize = 1024;
/// Capacity of the CPU model field in node information.
pub const MAX_MODEL_LEN: usize = 32;
/// Capacity of a file path field (save/restore).
pub const MAX_PATH_LEN: usize = 4096;

/// Size of the payload union: the largest variant (a name listing of
/// `4 + 100 * 50` bytes) rounded up to the union's 8-byte alignment.
pub const MAX_PAYLOAD_SIZE: usize = 5008;

/// Longest text value accepted for a field of the given capacity.
#[must_use]
pub const fn max_text_len(capacity: usize) -> usize {
    capacity.saturating_sub(1)
}
