//! Overlay addressing: communication identifiers and the reserved prefixes/sentinels
//! that the router and stream handlers use to make routing decisions.

use std::fmt;

/// Width, in bytes, of a [`CommId`] as it appears in a wire message header.
pub const ADDR_LEN: usize = 32;

/// Prefix reserved for container-manager-only addresses. A message addressed to a
/// `CommId` starting with this prefix must never be forwarded through an arbitrary
/// relay; see the routing decision table.
pub const PREFIX_PRIV_ADDR: &str = "$priv-";

/// Sentinel value meaning "addressed to whichever node is on the other end of this
/// direct connection", regardless of its actual `CommId`.
pub const NEIGHBOR_ADDR: &str = "$neighbor";

/// Opaque, fixed-width overlay address of a node.
///
/// `CommId` is logically just an identifier; it carries no routing information of its
/// own beyond the private-prefix convention. It is encoded on the wire as a
/// zero-padded, `ADDR_LEN`-byte ASCII field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommId(String);

impl CommId {
    /// Builds a `CommId` from an owned string. Longer than `ADDR_LEN` bytes is a
    /// caller error detected at encode time, not here, since the id may still be
    /// used for local comparisons (e.g. `local_comm_id`) before ever hitting the wire.
    pub fn new(id: impl Into<String>) -> Self {
        CommId(id.into())
    }

    /// The distinguished "next hop" sentinel.
    pub fn neighbor() -> Self {
        CommId(NEIGHBOR_ADDR.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this address falls under the private prefix and must never be
    /// forwarded through an arbitrary relay.
    pub fn is_private(&self) -> bool {
        self.0.starts_with(PREFIX_PRIV_ADDR)
    }

    /// Whether this is the sentinel meaning "the directly connected peer".
    pub fn is_neighbor(&self) -> bool {
        self.0 == NEIGHBOR_ADDR
    }

    /// Encodes into a zero-padded `ADDR_LEN`-byte field. Returns `None` if the id is
    /// too long to fit.
    pub fn to_fixed_bytes(&self) -> Option<[u8; ADDR_LEN]> {
        let bytes = self.0.as_bytes();
        if bytes.len() > ADDR_LEN {
            return None;
        }
        let mut buf = [0u8; ADDR_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(buf)
    }

    /// Decodes a zero-padded `ADDR_LEN`-byte field, trimming trailing NUL padding.
    pub fn from_fixed_bytes(bytes: &[u8; ADDR_LEN]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(ADDR_LEN);
        CommId(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

impl fmt::Display for CommId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommId {
    fn from(s: &str) -> Self {
        CommId::new(s)
    }
}

impl From<String> for CommId {
    fn from(s: String) -> Self {
        CommId::new(s)
    }
}
