//! The local interface manager: a container's tag -> [`Interface`] registry, and the
//! `received` entry point the Messenger hands local deliveries to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::interface::Interface;

/// Owns every interface a single container currently hosts, keyed by tag.
#[derive(Default)]
pub struct InterfaceManager {
    interfaces: Mutex<HashMap<String, Arc<Interface>>>,
}

impl InterfaceManager {
    pub fn new() -> Self {
        InterfaceManager::default()
    }

    pub fn register(&self, interface: Arc<Interface>) {
        self.interfaces
            .lock()
            .expect("interface manager mutex poisoned")
            .insert(interface.tag().to_string(), interface);
    }

    pub fn unregister(&self, tag: &str) -> Option<Arc<Interface>> {
        self.interfaces
            .lock()
            .expect("interface manager mutex poisoned")
            .remove(tag)
    }

    pub fn get(&self, tag: &str) -> Option<Arc<Interface>> {
        self.interfaces
            .lock()
            .expect("interface manager mutex poisoned")
            .get(tag)
            .cloned()
    }

    /// Dispatches a delivered ROS payload to the interface named by `tag`. `user`,
    /// `comm_id` and `sender_tag` identify where the message came from but play no
    /// role in locating the interface; an interface unknown to this container drops
    /// the message with a warning, mirroring the propagation policy for inbound
    /// deserialization failures.
    pub fn received(
        &self,
        user: &str,
        tag: &str,
        comm_id: &rce_types::CommId,
        sender_tag: &str,
        msg: &[u8],
        msg_id: &str,
    ) {
        let Some(interface) = self.get(tag) else {
            log::warn!(
                "dropping delivery for unknown interface tag {tag} (user={user}, from={comm_id}, senderTag={sender_tag})"
            );
            return;
        };
        if let Err(err) = interface.receive(msg_id, msg) {
            log::warn!("interface {tag} rejected delivery: {err}");
        }
    }
}
