//! A complete wire message: header plus typed content, and the full
//! serialize/deserialize round trip through a [`crate::registry::ContentRegistry`].

use crate::content::Content;
use crate::fifo::MessageFifo;
use crate::header::WireHeader;
use crate::registry::ContentRegistry;
use rce_types::error::{RceError, Result};
use rce_types::limits::HDR_LEN;
use rce_types::{CommId, MsgId};

/// A fully formed message: routing metadata plus a typed content payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub origin: CommId,
    pub dest: CommId,
    pub msg_id: MsgId,
    pub content: Content,
}

impl WireMessage {
    pub fn new(origin: CommId, dest: CommId, msg_id: MsgId, content: Content) -> Self {
        WireMessage {
            origin,
            dest,
            msg_id,
            content,
        }
    }

    /// Serializes this message into its full wire representation (header + content),
    /// using `registry` to encode the content.
    ///
    /// # Errors
    /// Propagates whatever the content codec returns, and `SerializationError` if
    /// the resulting message would exceed `MAX_LENGTH`.
    pub fn serialize(&self, registry: &ContentRegistry) -> Result<Vec<u8>> {
        let mut body = MessageFifo::new();
        registry.serialize(&mut body, &self.content)?;
        let body_bytes = body.to_vec();

        let total_len = HDR_LEN + body_bytes.len();
        if total_len > rce_types::limits::MAX_LENGTH {
            return Err(RceError::SerializationError(format!(
                "message of {total_len} bytes exceeds MAX_LENGTH"
            )));
        }

        let header = WireHeader {
            total_len: total_len as u32,
            msg_type: self.content.msg_type(),
            msg_id: self.msg_id.clone(),
            origin: self.origin.clone(),
            dest: self.dest.clone(),
        };

        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(&header.encode()?);
        out.extend_from_slice(&body_bytes);
        Ok(out)
    }

    /// Parses a complete wire message (header + content) from `bytes`.
    pub fn deserialize(bytes: &[u8], registry: &ContentRegistry) -> Result<WireMessage> {
        if bytes.len() < HDR_LEN {
            return Err(RceError::SerializationError(
                "message shorter than the fixed header".into(),
            ));
        }
        let header = WireHeader::parse(&bytes[..HDR_LEN])?;
        let mut body = MessageFifo::from(bytes[HDR_LEN..].to_vec());
        let content = registry.deserialize(header.msg_type, &mut body)?;

        Ok(WireMessage {
            origin: header.origin,
            dest: header.dest,
            msg_id: header.msg_id,
            content,
        })
    }
}
