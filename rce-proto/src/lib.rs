//! Wire framing, the FIFO handoff buffer and the content serializer registry for
//! the RCE messaging core.
//!
//! This is the `flo-protocol` analogue in this workspace: a dependency-light crate
//! that defines the bytes-on-the-wire format and nothing about how those bytes are
//! pumped through sockets (that is `rce-relay`'s job).

pub mod command;
pub mod content;
pub mod fifo;
pub mod header;
pub mod message;
pub mod registry;
pub mod stream;

pub use command::{Command, CommandClassRegistry, CommandContentCodec, CommandPayload};
pub use content::Content;
pub use fifo::MessageFifo;
pub use header::WireHeader;
pub use message::WireMessage;
pub use registry::ContentRegistry;
