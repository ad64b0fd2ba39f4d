//! The content-type registry: a read-only-after-startup mapping from `MsgType` to
//! the serializer that knows how to encode/decode it.

use crate::content::Content;
use crate::content::ContentCodec;
use crate::fifo::MessageFifo;
use rce_types::error::{RceError, Result};
use rce_types::MsgType;
use std::collections::HashMap;

/// Maps a content type to its serializer. Registered once at startup and treated as
/// read-only thereafter, matching the content-type registry in the data model.
#[derive(Default)]
pub struct ContentRegistry {
    codecs: HashMap<MsgType, Box<dyn ContentCodec>>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        ContentRegistry::default()
    }

    /// Registers a codec under its own declared `msg_type()`.
    ///
    /// # Errors
    /// `InternalError` if a codec is already registered for that type.
    pub fn register(&mut self, codec: Box<dyn ContentCodec>) -> Result<()> {
        let msg_type = codec.msg_type();
        if self.codecs.contains_key(&msg_type) {
            return Err(RceError::InternalError(format!(
                "a content serializer is already registered for {msg_type}"
            )));
        }
        self.codecs.insert(msg_type, codec);
        Ok(())
    }

    pub fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let msg_type = content.msg_type();
        let codec = self.codecs.get(&msg_type).ok_or_else(|| {
            RceError::InternalError(format!("no content serializer registered for {msg_type}"))
        })?;
        codec.serialize(stream, content)
    }

    pub fn deserialize(&self, msg_type: MsgType, stream: &mut MessageFifo) -> Result<Content> {
        let codec = self.codecs.get(&msg_type).ok_or_else(|| {
            RceError::SerializationError(format!("no content serializer registered for {msg_type}"))
        })?;
        codec.deserialize(stream)
    }

    /// Builds a registry with the standard codecs for every non-`COMMAND` content
    /// type (`COMMAND` additionally needs a [`crate::command::CommandClassRegistry`],
    /// so it is registered separately via [`ContentRegistry::register`] with a
    /// [`crate::command::CommandContentCodec`]).
    pub fn with_standard_codecs() -> Self {
        let mut registry = ContentRegistry::new();
        registry
            .register(Box::new(crate::content::ConnectCodec))
            .expect("built-in codecs never collide");
        registry
            .register(Box::new(crate::content::CommInfoCodec))
            .expect("built-in codecs never collide");
        registry
            .register(Box::new(crate::content::RequestCodec))
            .expect("built-in codecs never collide");
        registry
            .register(Box::new(crate::content::TagCodec))
            .expect("built-in codecs never collide");
        registry
            .register(Box::new(crate::content::RosMsgCodec))
            .expect("built-in codecs never collide");
        registry
            .register(Box::new(crate::content::RosAddCodec))
            .expect("built-in codecs never collide");
        registry
            .register(Box::new(crate::content::RosRemoveCodec))
            .expect("built-in codecs never collide");
        registry
            .register(Box::new(crate::content::RosUserCodec))
            .expect("built-in codecs never collide");
        registry
    }
}
