//! Wire types for the supervisor daemon's packet protocol.
//!
//! A frame is a fixed [`Header`] (operation tag and payload byte count)
//! followed by one payload variant laid out as the daemon's C structs. The
//! crate encodes and decodes both directions so the client driver and test
//! daemons share one definition of the format.

mod error;
mod frame;
mod header;
mod layout;
pub mod limits;
mod operation;
mod reply;
mod request;

pub use error::ProtocolError;
pub use frame::Frame;
pub use header::{HEADER_SIZE, Header};
pub use layout::{check_text, terminated_text};
pub use operation::Operation;
pub use reply::{DomainInfo, Failure, NodeInfo, Reply, RunState};
pub use request::Request;
pub use uuid::Uuid;
