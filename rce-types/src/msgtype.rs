//! The short string tokens that identify a wire message's content type, and the
//! fixed-width encoding of those tokens used in the message header.

use crate::error::{RceError, Result};
use crate::limits::TYPE_LEN;
use std::convert::TryFrom;
use std::fmt;

/// One of the content types known to this core. Each variant is registered with
/// exactly one serializer and, usually, one processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    /// Order to connect to other relay managers: a list of `(commID, ip)` pairs.
    Connect,
    /// The communication ID of a relay manager, sent to the container manager.
    CommInfo,
    /// A request dict: `{user, type, args}`.
    Request,
    /// A polymorphic command, resolved via an inner fixed-length identifier.
    Command,
    /// A `{user, tag, type}` tag announcement.
    Tag,
    /// A single serialized ROS message plus routing/correlation metadata.
    RosMsg,
    /// Request to start an interface inside a container.
    RosAdd,
    /// Request to remove an interface (or other node-level object).
    RosRemove,
    /// Add/remove a user reference on an existing interface.
    RosUser,
}

impl MsgType {
    /// All variants, in a stable order -- used to drive exhaustive registry checks
    /// and the interface filter's allow-lists.
    pub const ALL: [MsgType; 9] = [
        MsgType::Connect,
        MsgType::CommInfo,
        MsgType::Request,
        MsgType::Command,
        MsgType::Tag,
        MsgType::RosMsg,
        MsgType::RosAdd,
        MsgType::RosRemove,
        MsgType::RosUser,
    ];

    /// The wire token for this type, e.g. `"ROS_MSG"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            MsgType::Connect => "CONNECT",
            MsgType::CommInfo => "COMM_INFO",
            MsgType::Request => "REQUEST",
            MsgType::Command => "COMMAND",
            MsgType::Tag => "TAG",
            MsgType::RosMsg => "ROS_MSG",
            MsgType::RosAdd => "ROS_ADD",
            MsgType::RosRemove => "ROS_REMOVE",
            MsgType::RosUser => "ROS_USER",
        }
    }

    /// Encodes into a zero-padded `TYPE_LEN`-byte field.
    pub fn to_fixed_bytes(self) -> [u8; TYPE_LEN] {
        let s = self.as_str().as_bytes();
        debug_assert!(s.len() <= TYPE_LEN, "message type token too long for TYPE_LEN");
        let mut buf = [0u8; TYPE_LEN];
        buf[..s.len()].copy_from_slice(s);
        buf
    }

    /// Decodes a zero-padded `TYPE_LEN`-byte field back into a known type.
    ///
    /// # Errors
    /// Returns [`RceError::SerializationError`] if the token does not match any
    /// known type.
    pub fn from_fixed_bytes(bytes: &[u8; TYPE_LEN]) -> Result<Self> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(TYPE_LEN);
        let token = std::str::from_utf8(&bytes[..end])
            .map_err(|_| RceError::SerializationError("message type token is not valid utf-8".into()))?;
        MsgType::try_from(token)
    }
}

impl TryFrom<&str> for MsgType {
    type Error = RceError;

    fn try_from(token: &str) -> Result<Self> {
        MsgType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == token)
            .ok_or_else(|| RceError::SerializationError(format!("unknown message type: {token}")))
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
