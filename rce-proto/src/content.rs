//! The typed content payloads carried inside a wire message, and the per-type
//! codecs that (de)serialize them onto a [`MessageFifo`].
//!
//! Every variant here corresponds to one row of the content-encoding table: the
//! fields and their order are load-bearing, since the peer on the other end decodes
//! them positionally.

use crate::command::CommandPayload;
use crate::fifo::MessageFifo;
use rce_types::error::{RceError, Result};
use rce_types::interface::{InterfaceKind, RemovalKind};
use rce_types::{CommId, MsgType};

/// The decoded content of a wire message, tagged by the `MsgType` that selected its
/// codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Order to connect to other relay managers: `(commID, ip)` pairs.
    Connect(Vec<(CommId, String)>),
    /// The communication ID of a relay manager.
    CommInfo(CommId),
    /// A request dict.
    Request {
        user: String,
        req_type: String,
        args: Vec<Vec<u8>>,
    },
    /// A polymorphic command, resolved by inner identifier.
    Command { user: String, cmd: CommandPayload },
    /// A tag announcement.
    Tag {
        user: String,
        tag: String,
        tag_type: String,
    },
    /// A single serialized ROS message plus routing/correlation metadata.
    ///
    /// `push` distinguishes a message an interface originated locally (`Interface::send`,
    /// `srcTag` empty, `msgID` carrying the client's own correlation id) from one a
    /// `Messenger` is relaying between two tagged interfaces (`srcTag`/`destTag` both set).
    RosMsg {
        msg: Vec<u8>,
        dest_tag: String,
        src_tag: String,
        msg_id: String,
        user: String,
        push: bool,
    },
    /// Request to start an interface inside a container.
    RosAdd {
        ros_addr: String,
        tag: String,
        msg_type: String,
        kind: InterfaceKind,
    },
    /// Request to remove an interface (or other node-level object).
    RosRemove { kind: RemovalKind, tag: String },
    /// Add/remove a user reference on an existing interface.
    RosUser {
        tag: String,
        target: String,
        comm_id: CommId,
        add: bool,
    },
}

impl Content {
    /// The `MsgType` this content is tagged with; used to pick the right codec.
    pub fn msg_type(&self) -> MsgType {
        match self {
            Content::Connect(_) => MsgType::Connect,
            Content::CommInfo(_) => MsgType::CommInfo,
            Content::Request { .. } => MsgType::Request,
            Content::Command { .. } => MsgType::Command,
            Content::Tag { .. } => MsgType::Tag,
            Content::RosMsg { .. } => MsgType::RosMsg,
            Content::RosAdd { .. } => MsgType::RosAdd,
            Content::RosRemove { .. } => MsgType::RosRemove,
            Content::RosUser { .. } => MsgType::RosUser,
        }
    }
}

/// A (de)serializer for one content type, keyed by `MsgType`.
pub trait ContentCodec: Send + Sync {
    fn msg_type(&self) -> MsgType;
    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()>;
    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content>;
}

fn mismatch(expected: MsgType) -> RceError {
    RceError::InternalError(format!("content does not match codec for {expected}"))
}

/// `CONNECT`: a list of `(commID, ip)` pairs.
pub struct ConnectCodec;

impl ContentCodec for ConnectCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::Connect
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::Connect(pairs) = content else {
            return Err(mismatch(self.msg_type()));
        };
        stream.add_int(pairs.len() as u32);
        for (comm_id, ip) in pairs {
            stream.add_str(comm_id.as_str());
            stream.add_str(ip);
        }
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        let n = stream.get_int()?;
        let mut pairs = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let comm_id = CommId::new(stream.get_str()?);
            let ip = stream.get_str()?;
            pairs.push((comm_id, ip));
        }
        Ok(Content::Connect(pairs))
    }
}

/// `COMM_INFO`: a single CommId element.
pub struct CommInfoCodec;

impl ContentCodec for CommInfoCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::CommInfo
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::CommInfo(comm_id) = content else {
            return Err(mismatch(self.msg_type()));
        };
        stream.add_str(comm_id.as_str());
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        Ok(Content::CommInfo(CommId::new(stream.get_str()?)))
    }
}

/// `REQUEST`: `user`, `reqType`, `args` list.
pub struct RequestCodec;

impl ContentCodec for RequestCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::Request
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::Request {
            user,
            req_type,
            args,
        } = content
        else {
            return Err(mismatch(self.msg_type()));
        };
        stream.add_str(user);
        stream.add_str(req_type);
        stream.add_list(args);
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        Ok(Content::Request {
            user: stream.get_str()?,
            req_type: stream.get_str()?,
            args: stream.get_list()?,
        })
    }
}

/// `TAG`: `user`, `tag`, `tagType`.
pub struct TagCodec;

impl ContentCodec for TagCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::Tag
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::Tag {
            user,
            tag,
            tag_type,
        } = content
        else {
            return Err(mismatch(self.msg_type()));
        };
        stream.add_str(user);
        stream.add_str(tag);
        stream.add_str(tag_type);
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        Ok(Content::Tag {
            user: stream.get_str()?,
            tag: stream.get_str()?,
            tag_type: stream.get_str()?,
        })
    }
}

/// `ROS_MSG`: `msg`, `destTag`, `srcTag`, `msgID`, `user`, `push` -- in that order.
pub struct RosMsgCodec;

impl ContentCodec for RosMsgCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::RosMsg
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::RosMsg {
            msg,
            dest_tag,
            src_tag,
            msg_id,
            user,
            push,
        } = content
        else {
            return Err(mismatch(self.msg_type()));
        };
        stream.add_element(msg);
        stream.add_str(dest_tag);
        stream.add_str(src_tag);
        stream.add_str(msg_id);
        stream.add_str(user);
        stream.push(vec![if *push { 1u8 } else { 0u8 }]);
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        let msg = stream.get_element()?;
        let dest_tag = stream.get_str()?;
        let src_tag = stream.get_str()?;
        let msg_id = stream.get_str()?;
        let user = stream.get_str()?;
        let (byte, n) = stream.pop(1);
        if n != 1 {
            return Err(RceError::SerializationError(
                "unexpected end of stream while reading ROS_MSG push flag".into(),
            ));
        }
        Ok(Content::RosMsg {
            msg,
            dest_tag,
            src_tag,
            msg_id,
            user,
            push: byte[0] != 0,
        })
    }
}

/// `ROS_ADD`: an interface-type record.
pub struct RosAddCodec;

impl ContentCodec for RosAddCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::RosAdd
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::RosAdd {
            ros_addr,
            tag,
            msg_type,
            kind,
        } = content
        else {
            return Err(mismatch(self.msg_type()));
        };
        stream.add_str(ros_addr);
        stream.add_str(tag);
        stream.add_str(msg_type);
        stream.add_str(kind.as_str());
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        let ros_addr = stream.get_str()?;
        let tag = stream.get_str()?;
        let msg_type = stream.get_str()?;
        let kind_str = stream.get_str()?;
        let kind = kind_str
            .parse()
            .map_err(|e: RceError| RceError::SerializationError(e.to_string()))?;
        Ok(Content::RosAdd {
            ros_addr,
            tag,
            msg_type,
            kind,
        })
    }
}

/// `ROS_REMOVE`: `type` and `tag`.
pub struct RosRemoveCodec;

impl ContentCodec for RosRemoveCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::RosRemove
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::RosRemove { kind, tag } = content else {
            return Err(mismatch(self.msg_type()));
        };
        stream.add_str(kind.as_str());
        stream.add_str(tag);
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        let kind_str = stream.get_str()?;
        let kind = kind_str
            .parse()
            .map_err(|e: RceError| RceError::SerializationError(e.to_string()))?;
        Ok(Content::RosRemove {
            kind,
            tag: stream.get_str()?,
        })
    }
}

/// `ROS_USER`: `tag`, `target`, `commID`, `add` (as a single byte, 1 = true).
pub struct RosUserCodec;

impl ContentCodec for RosUserCodec {
    fn msg_type(&self) -> MsgType {
        MsgType::RosUser
    }

    fn serialize(&self, stream: &mut MessageFifo, content: &Content) -> Result<()> {
        let Content::RosUser {
            tag,
            target,
            comm_id,
            add,
        } = content
        else {
            return Err(mismatch(self.msg_type()));
        };
        stream.add_str(tag);
        stream.add_str(target);
        stream.add_str(comm_id.as_str());
        stream.push(vec![if *add { 1u8 } else { 0u8 }]);
        Ok(())
    }

    fn deserialize(&self, stream: &mut MessageFifo) -> Result<Content> {
        let tag = stream.get_str()?;
        let target = stream.get_str()?;
        let comm_id = CommId::new(stream.get_str()?);
        let (byte, n) = stream.pop(1);
        if n != 1 {
            return Err(RceError::SerializationError(
                "unexpected end of stream while reading ROS_USER add flag".into(),
            ));
        }
        Ok(Content::RosUser {
            tag,
            target,
            comm_id,
            add: byte[0] != 0,
        })
    }
}
