//! The Messenger (4.I): delivers ROS payloads to either the local interface manager
//! or a remote endpoint through the router, and dispatches inbound `ROS_MSG` traffic
//! back to the local manager.

use std::sync::Arc;

use rce_proto::{Content, WireMessage};
use rce_relay::router::Router;
use rce_types::{CommId, MsgId};

use crate::manager::InterfaceManager;

/// Routes ROS payloads between local interfaces and the wire. `send` decides, per
/// call, whether `commID` names this node (deliver straight into `manager`) or a
/// remote one (hand a `ROS_MSG` wire message to the router).
pub struct Messenger {
    local_comm_id: CommId,
    router: Arc<Router>,
    manager: Arc<InterfaceManager>,
}

impl Messenger {
    pub fn new(local_comm_id: CommId, router: Arc<Router>, manager: Arc<InterfaceManager>) -> Self {
        Messenger {
            local_comm_id,
            router,
            manager,
        }
    }

    /// `send(userID, tag, commID, senderTag, msg, msgID)`. The original payload
    /// bytes in `msg` always end up in `content.msg` untouched -- the wire message
    /// built here is a distinct value, never reusing `msg`'s name or slot the way the
    /// source's `Messenger.send` mistakenly did.
    pub fn send(&self, user: &str, tag: &str, comm_id: &CommId, sender_tag: &str, msg: &[u8], msg_id: &str) {
        if *comm_id == self.local_comm_id {
            self.manager.received(user, tag, comm_id, sender_tag, msg, msg_id);
            return;
        }

        let wire = WireMessage::new(
            self.local_comm_id.clone(),
            comm_id.clone(),
            MsgId::new(msg_id),
            Content::RosMsg {
                msg: msg.to_vec(),
                dest_tag: tag.to_string(),
                src_tag: sender_tag.to_string(),
                msg_id: msg_id.to_string(),
                user: user.to_string(),
                push: false,
            },
        );
        self.router.send_message(&wire);
    }

    /// `processMessage(wire)`: unpacks a `ROS_MSG` wire message and hands it to the
    /// local manager, keyed by the origin commID it arrived from. Any other content
    /// type reaching here is a routing mistake upstream and is logged, not panicked.
    pub fn process_message(&self, wire: &WireMessage) {
        let Content::RosMsg {
            msg,
            dest_tag,
            src_tag,
            msg_id,
            user,
            ..
        } = &wire.content
        else {
            log::warn!(
                "Messenger received a non-ROS_MSG content type {:?} from {}",
                wire.content.msg_type(),
                wire.origin
            );
            return;
        };

        self.manager
            .received(user, dest_tag, &wire.origin, src_tag, msg, msg_id);
    }
}
