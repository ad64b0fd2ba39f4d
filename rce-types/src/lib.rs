//! Shared addressing, size limits, message-type tokens and error taxonomy for the
//! RCE messaging and routing core.
//!
//! This crate has no I/O and no async runtime dependency; it is the vocabulary every
//! other crate in the workspace builds on, the way `flo-event` underlies
//! `flo-protocol` and `flo-server`.

pub mod addr;
pub mod error;
pub mod interface;
pub mod limits;
pub mod msgid;
pub mod msgtype;

pub use addr::CommId;
pub use error::{RceError, Result};
pub use interface::{InterfaceKind, RemovalKind};
pub use msgid::MsgId;
pub use msgtype::MsgType;
