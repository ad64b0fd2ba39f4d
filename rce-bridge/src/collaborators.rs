//! Boundary traits for the external collaborators this crate consumes but does not
//! implement: the ROS type loader, the ROS↔JSON converter and the owning container.
//! Concretely wiring these to an actual ROS installation is explicitly out of scope
//! (see the specification's non-goals); `rce-node` or an embedder supplies real
//! implementations.

use rce_proto::MessageFifo;
use rce_types::error::Result;

/// A decoded ROS message, request or response value, ready to be serialized onto the
/// wire or encoded to JSON.
pub trait RosValue: Send {
    /// Serializes this value's ROS wire bytes, e.g. onto the `msg` element of a
    /// `ROS_MSG` content payload.
    fn serialize(&self, fifo: &mut MessageFifo);
}

/// A loaded ROS message or service class: knows how to decode raw ROS-serialized
/// bytes into a [`RosValue`]. Corresponds to the class objects `loadMsg`/`loadSrv`
/// return in the original source.
pub trait RosClass: Send + Sync {
    fn deserialize(&self, bytes: &[u8]) -> Result<Box<dyn RosValue>>;
}

/// ROS type loader: `loadMsg(pkg, name)`, `loadSrv(pkg, name) -> (request, response)`.
pub trait RosLoader: Send + Sync {
    fn load_msg(&self, pkg: &str, name: &str) -> Result<std::sync::Arc<dyn RosClass>>;
    fn load_srv(
        &self,
        pkg: &str,
        name: &str,
    ) -> Result<(std::sync::Arc<dyn RosClass>, std::sync::Arc<dyn RosClass>)>;
}

/// ROS↔JSON converter: `encode(rosMsg) -> json`, `decode(cls, json) -> rosMsg`.
pub trait JsonConverter: Send + Sync {
    fn encode(&self, value: &dyn RosValue) -> Result<serde_json::Value>;
    fn decode(&self, class: &dyn RosClass, json: &serde_json::Value) -> Result<Box<dyn RosValue>>;
}

/// The container an interface lives inside: owns ROS address allocation and the
/// client-facing half of message delivery.
pub trait Container: Send + Sync {
    fn reserve_addr(&self) -> Result<String>;
    fn free_addr(&self, addr: &str);
    /// Delivers a fully formed wire message (e.g. `ROS_ADD`/`ROS_REMOVE`/`ROS_USER`
    /// container-management traffic, or an outbound `ROS_MSG`) out of this container.
    fn send(&self, msg: rce_proto::WireMessage) -> Result<()>;
    fn received_from_interface(&self, event: ReceivedEvent);
}

/// The `{type, msgID, interfaceTag, msg}` dict handed to a container's
/// `receivedFromInterface`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEvent {
    pub msg_type: String,
    pub msg_id: String,
    pub interface_tag: String,
    pub msg: serde_json::Value,
}

/// An external client's request to push a payload into an interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    pub msg_type: String,
    pub payload: serde_json::Value,
}
