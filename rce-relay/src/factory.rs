//! Per-connection protocol state: the authentication flag and allow-list filter used
//! by the router's routing decision (4.F).
//!
//! A freshly accepted connection starts unauthenticated; while unauthenticated,
//! every inbound message routes to the handshake handler regardless of its type --
//! the filter only applies once authenticated.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rce_proto::WireMessage;
use rce_types::MsgType;

/// Invoked with the first successfully decoded message on an unauthenticated
/// connection. Typically validates a `CONNECT`/`COMM_INFO` handshake and, on
/// success, the connection is marked authenticated.
pub type HandshakeHandler = Box<dyn FnMut(WireMessage) + Send>;

/// The allow-list a connection enforces once authenticated. Shared across every
/// connection a listener accepts; per-connection state lives in [`ProtocolState`].
#[derive(Clone)]
pub struct ProtocolFactory {
    authenticated_types: HashSet<MsgType>,
}

impl ProtocolFactory {
    pub fn new(authenticated_types: impl IntoIterator<Item = MsgType>) -> Self {
        ProtocolFactory {
            authenticated_types: authenticated_types.into_iter().collect(),
        }
    }

    /// Builds the state for a freshly accepted connection, starting unauthenticated.
    pub fn new_connection(&self, handshake: HandshakeHandler) -> ProtocolState {
        ProtocolState {
            authenticated: Arc::new(Mutex::new(false)),
            handshake: Arc::new(Mutex::new(Some(handshake))),
            allowed: Arc::new(self.authenticated_types.clone()),
        }
    }
}

/// One connection's authentication flag plus a handle back to its handshake handler.
/// Cheap to clone: every clone shares the same underlying state.
#[derive(Clone)]
pub struct ProtocolState {
    authenticated: Arc<Mutex<bool>>,
    handshake: Arc<Mutex<Option<HandshakeHandler>>>,
    allowed: Arc<HashSet<MsgType>>,
}

impl ProtocolState {
    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.lock().expect("protocol state mutex poisoned")
    }

    /// `filterMessage(type) -> bool`: whether `msg_type` should be dropped on this
    /// connection. Only meaningful once authenticated; pre-authentication routing
    /// never consults this (see the routing decision in `router.rs`).
    pub fn filter_accepts(&self, msg_type: MsgType) -> bool {
        self.allowed.contains(&msg_type)
    }

    /// Returns a callback that, when invoked with a decoded message, runs the
    /// connection's handshake handler once and then marks it authenticated. Safe to
    /// hand out to multiple `EndReceiver`s; only the first invocation reaches the
    /// underlying handler.
    pub fn handshake_handler(&self) -> HandshakeHandler {
        let authenticated = self.authenticated.clone();
        let handshake = self.handshake.clone();
        Box::new(move |msg| {
            if let Some(mut handler) = handshake.lock().expect("protocol state mutex poisoned").take() {
                handler(msg);
            }
            *authenticated.lock().expect("protocol state mutex poisoned") = true;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rce_proto::Content;
    use rce_types::{CommId, MsgId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fresh_connection_is_unauthenticated() {
        let factory = ProtocolFactory::new([MsgType::Connect]);
        let state = factory.new_connection(Box::new(|_| {}));
        assert!(!state.is_authenticated());
    }

    #[test]
    fn handshake_marks_authenticated_and_runs_once() {
        let factory = ProtocolFactory::new([MsgType::RosMsg]);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let state = factory.new_connection(Box::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let msg = WireMessage::new(
            CommId::new("A"),
            CommId::new("B"),
            MsgId::new("1"),
            Content::CommInfo(CommId::new("relay-1")),
        );
        let mut handler = state.handshake_handler();
        handler(msg.clone());
        assert!(state.is_authenticated());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut second = state.handshake_handler();
        second(msg);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn filter_only_accepts_configured_types() {
        let factory = ProtocolFactory::new([MsgType::RosMsg]);
        let state = factory.new_connection(Box::new(|_| {}));
        assert!(state.filter_accepts(MsgType::RosMsg));
        assert!(!state.filter_accepts(MsgType::Connect));
    }
}
