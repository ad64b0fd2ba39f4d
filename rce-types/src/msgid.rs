//! The request/response correlator carried in every wire message header.

use crate::limits::MSG_ID_LEN;
use std::fmt;

/// Opaque correlator used to match a request to its response (e.g. a ROS service
/// call to its reply). Encoded the same way a [`crate::CommId`] is: a zero-padded
/// fixed-width ASCII field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MsgId(String);

impl MsgId {
    pub fn new(id: impl Into<String>) -> Self {
        MsgId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_fixed_bytes(&self) -> Option<[u8; MSG_ID_LEN]> {
        let bytes = self.0.as_bytes();
        if bytes.len() > MSG_ID_LEN {
            return None;
        }
        let mut buf = [0u8; MSG_ID_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(buf)
    }

    pub fn from_fixed_bytes(bytes: &[u8; MSG_ID_LEN]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(MSG_ID_LEN);
        MsgId(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MsgId {
    fn from(s: &str) -> Self {
        MsgId::new(s)
    }
}

impl From<String> for MsgId {
    fn from(s: String) -> Self {
        MsgId::new(s)
    }
}
