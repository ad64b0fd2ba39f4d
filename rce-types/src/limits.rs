//! Wire-format size limits shared between the protocol codec and the stream handlers.

/// Width, in bytes, of a message type token in the header (see [`crate::msgtype::MsgType`]).
pub const TYPE_LEN: usize = 16;

/// Width, in bytes, of the `msgID` correlator field in the header.
pub const MSG_ID_LEN: usize = 16;

/// Width, in bytes, of the inner identifier used to resolve polymorphic `COMMAND`
/// payloads (see `CommandSerializer` in the original source).
pub const CMD_ID_LEN: usize = 1;

/// Upper bound on the serialized length of a single wire message. Messages claiming
/// a larger length are drained and discarded without being buffered.
pub const MAX_LENGTH: usize = 8 * 1024 * 1024;

/// Upper bound on the number of bytes moved per pump/write on the transport.
pub const CHUNK_SIZE: usize = 4096;

/// Length, in bytes, of the header total-length field.
pub const LENGTH_FIELD_LEN: usize = 4;

/// Total length, in bytes, of the fixed header that precedes every message's content:
/// `[total-length][type][msgID][origin][dest]`.
pub const HDR_LEN: usize =
    LENGTH_FIELD_LEN + TYPE_LEN + MSG_ID_LEN + 2 * crate::addr::ADDR_LEN;
