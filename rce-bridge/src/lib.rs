//! ROS interface objects and the Messenger: the bridge between a container's client
//! payloads (ROS messages, JSON) and the wire-level messaging core in `rce-relay`.
//!
//! This is the `flo-client-lib` analogue in this workspace: where `rce-relay` moves
//! opaque bytes between connections, this crate gives those bytes ROS-shaped meaning
//! at the endpoints, without itself depending on a real ROS installation -- the ROS
//! type loader and JSON converter are boundary traits an embedder supplies.

pub mod collaborators;
pub mod interface;
pub mod manager;
pub mod messenger;

pub use collaborators::{ClientMessage, Container, JsonConverter, ReceivedEvent, RosClass, RosLoader, RosValue};
pub use interface::Interface;
pub use manager::InterfaceManager;
pub use messenger::Messenger;
