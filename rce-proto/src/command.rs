//! The polymorphic `COMMAND` content type: a `user` element followed by a
//! fixed-length inner identifier and a command-specific body, resolved through a
//! registry of command classes rather than language-level dispatch (ported from
//! `CommandSerializer`/`registerCommand` in the original source).

use crate::content::{Content, ContentCodec};
use crate::fifo::MessageFifo;
use rce_types::error::{RceError, Result};
use rce_types::limits::CMD_ID_LEN;
use rce_types::MsgType;
use std::collections::HashMap;

/// A command object that knows how to serialize itself and is tagged with a fixed
/// `CMD_ID_LEN`-byte identifier used to route decoding back to the right type.
pub trait Command: std::fmt::Debug + Send + Sync {
    fn identifier(&self) -> [u8; CMD_ID_LEN];
    fn write_body(&self, stream: &mut MessageFifo);
}

/// A decoded (or about-to-be-encoded) `COMMAND` payload: the already-serialized
/// inner identifier plus body bytes. The concrete meaning of `body` is opaque to
/// this crate and is interpreted by whoever owns the matching [`CommandClassRegistry`]
/// entry (typically a control distributor).
#[derive(Clone)]
pub struct CommandPayload {
    pub identifier: [u8; CMD_ID_LEN],
    pub body: Vec<u8>,
}

impl std::fmt::Debug for CommandPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPayload")
            .field("identifier", &self.identifier)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl PartialEq for CommandPayload {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.body == other.body
    }
}

impl CommandPayload {
    /// Builds a payload from a live command object by invoking its own serializer.
    pub fn from_command(cmd: &dyn Command) -> Self {
        let mut stream = MessageFifo::new();
        cmd.write_body(&mut stream);
        CommandPayload {
            identifier: cmd.identifier(),
            body: stream.to_vec(),
        }
    }
}

/// Registry of command classes known to this node, keyed by their fixed-length
/// identifier. Used only to validate that a given identifier is recognized; actual
/// decoding of the body is left to the owning control distributor, since command
/// bodies are domain-specific and outside this core's scope.
#[derive(Default)]
pub struct CommandClassRegistry {
    known: HashMap<[u8; CMD_ID_LEN], &'static str>,
}

impl CommandClassRegistry {
    pub fn new() -> Self {
        CommandClassRegistry::default()
    }

    /// Registers a command class under `identifier`, tagged with `name` for log
    /// messages. Fails with `InternalError` on a duplicate identifier.
    pub fn register(&mut self, identifier: [u8; CMD_ID_LEN], name: &'static str) -> Result<()> {
        if self.known.contains_key(&identifier) {
            return Err(RceError::InternalError(format!(
                "a command class is already registered under identifier {identifier:?}"
            )));
        }
        self.known.insert(identifier, name);
        Ok(())
    }

    /// Unregisters a previously registered command class.
    ///
    /// # Errors
    /// `InternalError` if the identifier was never registered.
    pub fn unregister(&mut self, identifier: &[u8; CMD_ID_LEN]) -> Result<()> {
        self.known
            .remove(identifier)
            .map(|_| ())
            .ok_or_else(|| RceError::InternalError("cannot unregister a non-existent command".into()))
    }

    pub fn is_known(&self, identifier: &[u8; CMD_ID_LEN]) -> bool {
        self.known.contains_key(identifier)
    }
}

/// The `COMMAND` content codec: `user`, then the inner identifier, then the
/// command-specific body. Decoding fails with `SerializationError` if the inner
/// identifier is not registered.
pub struct CommandContentCodec {
    pub classes: std::sync::Arc<CommandClassRegistry>,
}

impl ContentCodec for CommandContentCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::Command
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::Command { user, cmd } = content else {
            return Err(RceError::InternalError(
                "content does not match codec for COMMAND".into(),
            ));
        };
        if !self.classes.is_known(&cmd.identifier) {
            return Err(RceError::SerializationError(
                "the object class is not registered".into(),
            ));
        }
        stream.add_str(user);
        stream.add_identifier(&cmd.identifier, CMD_ID_LEN)?;
        stream.push(cmd.body.clone());
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        let user = stream.get_str()?;
        let identifier: [u8; CMD_ID_LEN] = stream
            .get_identifier(CMD_ID_LEN)?
            .try_into()
            .map_err(|_| RceError::SerializationError("malformed command identifier".into()))?;
        if !self.classes.is_known(&identifier) {
            return Err(RceError::SerializationError(
                "the object class is not registered".into(),
            ));
        }
        // The remainder of the stream is the command-specific body; it is handed to
        // the control distributor, which owns the concrete command types.
        let body = stream.to_vec();
        stream.clear();
        Ok(Content::Command {
            user,
            cmd: CommandPayload { identifier, body },
        })
    }
}
