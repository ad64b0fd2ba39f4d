//! The fixed-size header that precedes every message's content on the wire:
//! `[total-length:4][type:TYPE_LEN][msgID:MSG_ID_LEN][origin:ADDR_LEN][dest:ADDR_LEN]`.
//!
//! The header is parsed before any content bytes are consumed, since `type` and
//! `dest` alone are enough to make the routing decision in the router.

use byteorder::{BigEndian, ByteOrder};
use nom::bytes::complete::take;
use nom::number::complete::be_u32;
use nom::IResult;
use rce_types::addr::ADDR_LEN;
use rce_types::error::{RceError, Result};
use rce_types::limits::{HDR_LEN, MSG_ID_LEN, TYPE_LEN};
use rce_types::{CommId, MsgId, MsgType};

/// A parsed wire-message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireHeader {
    /// Total serialized length of the message, header included.
    pub total_len: u32,
    pub msg_type: MsgType,
    pub msg_id: MsgId,
    pub origin: CommId,
    pub dest: CommId,
}

impl WireHeader {
    /// Serializes the header to its fixed `HDR_LEN`-byte wire representation.
    pub fn encode(&self) -> Result<[u8; HDR_LEN]> {
        let mut buf = [0u8; HDR_LEN];
        let mut offset = 0;

        BigEndian::write_u32(&mut buf[offset..offset + 4], self.total_len);
        offset += 4;

        buf[offset..offset + TYPE_LEN].copy_from_slice(&self.msg_type.to_fixed_bytes());
        offset += TYPE_LEN;

        let msg_id = self.msg_id.to_fixed_bytes().ok_or_else(|| {
            RceError::SerializationError("msgID does not fit in MSG_ID_LEN".into())
        })?;
        buf[offset..offset + MSG_ID_LEN].copy_from_slice(&msg_id);
        offset += MSG_ID_LEN;

        let origin = self.origin.to_fixed_bytes().ok_or_else(|| {
            RceError::SerializationError("origin CommId does not fit in ADDR_LEN".into())
        })?;
        buf[offset..offset + ADDR_LEN].copy_from_slice(&origin);
        offset += ADDR_LEN;

        let dest = self.dest.to_fixed_bytes().ok_or_else(|| {
            RceError::SerializationError("dest CommId does not fit in ADDR_LEN".into())
        })?;
        buf[offset..offset + ADDR_LEN].copy_from_slice(&dest);

        Ok(buf)
    }

    /// Parses a header from exactly `HDR_LEN` bytes using `nom` combinators, the way
    /// the rest of this workspace's protocol framing is parsed.
    pub fn parse(input: &[u8]) -> Result<WireHeader> {
        match parse_header(input) {
            Ok((_, header)) => Ok(header),
            Err(_) => Err(RceError::SerializationError(
                "malformed message header".into(),
            )),
        }
    }
}

fn parse_header(input: &[u8]) -> IResult<&[u8], WireHeader> {
    let (input, total_len) = be_u32(input)?;
    let (input, type_bytes) = take(TYPE_LEN)(input)?;
    let (input, msg_id_bytes) = take(MSG_ID_LEN)(input)?;
    let (input, origin_bytes) = take(ADDR_LEN)(input)?;
    let (input, dest_bytes) = take(ADDR_LEN)(input)?;

    let msg_type = MsgType::from_fixed_bytes(type_bytes.try_into().unwrap())
        .map_err(|_| nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Verify)))?;
    let msg_id = MsgId::from_fixed_bytes(msg_id_bytes.try_into().unwrap());
    let origin = CommId::from_fixed_bytes(origin_bytes.try_into().unwrap());
    let dest = CommId::from_fixed_bytes(dest_bytes.try_into().unwrap());

    Ok((
        input,
        WireHeader {
            total_len,
            msg_type,
            msg_id,
            origin,
            dest,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = WireHeader {
            total_len: 1234,
            msg_type: MsgType::RosMsg,
            msg_id: MsgId::new("req-1"),
            origin: CommId::new("A"),
            dest: CommId::new("B"),
        };

        let encoded = header.encode().unwrap();
        assert_eq!(encoded.len(), HDR_LEN);

        let decoded = WireHeader::parse(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let short = [0u8; 4];
        assert!(WireHeader::parse(&short).is_err());
    }

    #[test]
    fn unknown_type_token_is_rejected() {
        let header = WireHeader {
            total_len: 0,
            msg_type: MsgType::Connect,
            msg_id: MsgId::default(),
            origin: CommId::new("A"),
            dest: CommId::new("B"),
        };
        let mut encoded = header.encode().unwrap();
        // Corrupt the type token (right after the 4-byte length field).
        encoded[4] = b'!';
        assert!(WireHeader::parse(&encoded).is_err());
    }
}
