//! Interface objects (4.H): one per logical endpoint inside a container, translating
//! between external client payloads and ROS messages, with reference counting over
//! interested users.

use std::sync::{Arc, Mutex};

use rce_proto::{Content, MessageFifo, WireMessage};
use rce_types::error::{RceError, Result};
use rce_types::interface::RemovalKind;
use rce_types::{CommId, InterfaceKind, MsgId};

use crate::collaborators::{ClientMessage, Container, JsonConverter, RosClass, RosLoader};

/// A single user's reference onto an interface: `(target, commID)`. Multiset
/// semantics -- the same pair may be registered more than once.
type UserRef = (String, CommId);

/// One ROS interface (service, publisher or subscriber) hosted inside a container.
/// Reserves its ROS address for the duration of its lifetime and frees it on drop.
pub struct Interface {
    tag: String,
    ros_addr: String,
    msg_type: String,
    kind: InterfaceKind,
    to_class: Option<Arc<dyn RosClass>>,
    from_class: Option<Arc<dyn RosClass>>,
    converter: Arc<dyn JsonConverter>,
    container: Arc<dyn Container>,
    refs: Mutex<Vec<UserRef>>,
}

impl Interface {
    /// Reserves a ROS address via `container` and builds a new interface. `to_class`
    /// must be present for `Service`/`Publisher`; `from_class` for `Service`/`Subscriber`.
    pub fn new(
        container: Arc<dyn Container>,
        converter: Arc<dyn JsonConverter>,
        tag: String,
        msg_type: String,
        kind: InterfaceKind,
        to_class: Option<Arc<dyn RosClass>>,
        from_class: Option<Arc<dyn RosClass>>,
    ) -> Result<Self> {
        let ros_addr = container.reserve_addr()?;
        Ok(Interface {
            tag,
            ros_addr,
            msg_type,
            kind,
            to_class,
            from_class,
            converter,
            container,
            refs: Mutex::new(Vec::new()),
        })
    }

    /// Like [`Interface::new`], but resolves `to_class`/`from_class` itself by asking
    /// `loader` for the ROS type named by `msg_type` (`"pkg/Name"`), the way the
    /// original's constructor calls `loadMsg`/`loadSrv` rather than taking already
    /// loaded classes as arguments.
    pub fn with_loader(
        container: Arc<dyn Container>,
        converter: Arc<dyn JsonConverter>,
        loader: Arc<dyn RosLoader>,
        tag: String,
        msg_type: String,
        kind: InterfaceKind,
    ) -> Result<Self> {
        let (pkg, name) = msg_type
            .split_once('/')
            .ok_or_else(|| RceError::InvalidRequest(format!("malformed ROS type name {msg_type}")))?;

        let (to_class, from_class) = match kind {
            InterfaceKind::Service => {
                let (request, response) = loader.load_srv(pkg, name)?;
                (Some(request), Some(response))
            }
            InterfaceKind::Publisher => (Some(loader.load_msg(pkg, name)?), None),
            InterfaceKind::Subscriber => (None, Some(loader.load_msg(pkg, name)?)),
        };

        Self::new(container, converter, tag, msg_type, kind, to_class, from_class)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn ros_addr(&self) -> &str {
        &self.ros_addr
    }

    /// Exact-match check used for idempotent re-registration: does this interface
    /// already serve `(tag, rosAddr, msgType, kind)`?
    pub fn validate(&self, tag: &str, ros_addr: &str, msg_type: &str, kind: InterfaceKind) -> bool {
        self.tag == tag && self.ros_addr == ros_addr && self.msg_type == msg_type && self.kind == kind
    }

    fn emit(&self, content: Content) -> Result<()> {
        self.container.send(WireMessage::new(
            CommId::new(self.ros_addr.clone()),
            CommId::neighbor(),
            MsgId::default(),
            content,
        ))
    }

    /// If the reference set was empty, emits `ROS_ADD`; then always emits
    /// `ROS_USER{add=true}`; then appends `(target, commID)`.
    pub fn register_user(&self, target: &str, comm_id: CommId) -> Result<()> {
        let mut refs = self.refs.lock().expect("interface mutex poisoned");
        if refs.is_empty() {
            self.emit(Content::RosAdd {
                ros_addr: self.ros_addr.clone(),
                tag: self.tag.clone(),
                msg_type: self.msg_type.clone(),
                kind: self.kind,
            })?;
        }
        self.emit(Content::RosUser {
            tag: self.tag.clone(),
            target: target.to_string(),
            comm_id: comm_id.clone(),
            add: true,
        })?;
        refs.push((target.to_string(), comm_id));
        Ok(())
    }

    /// Removes the first matching `(target, commID)`. If the reference set becomes
    /// empty, emits `ROS_REMOVE`; otherwise `ROS_USER{add=false}`. Removing a user
    /// that was never registered is a domain error.
    pub fn unregister_user(&self, target: &str, comm_id: &CommId) -> Result<()> {
        let mut refs = self.refs.lock().expect("interface mutex poisoned");
        let pos = refs
            .iter()
            .position(|(t, c)| t == target && c == comm_id)
            .ok_or_else(|| {
                RceError::InvalidRequest(format!(
                    "no registration of user {target} on interface {}",
                    self.tag
                ))
            })?;
        refs.remove(pos);

        if refs.is_empty() {
            self.emit(Content::RosRemove {
                kind: RemovalKind::Interface,
                tag: self.tag.clone(),
            })?;
        } else {
            self.emit(Content::RosUser {
                tag: self.tag.clone(),
                target: target.to_string(),
                comm_id: comm_id.clone(),
                add: false,
            })?;
        }
        Ok(())
    }

    /// `send(clientMsg, sender)`: a client pushes a payload into this interface
    /// (publish, or a service request). Rejects a `publisher`-receive / `subscriber`-
    /// send contract violation and a content-type mismatch as `InvalidRequest`.
    pub fn send(&self, client_msg: &ClientMessage, sender: &str, msg_id: MsgId) -> Result<()> {
        if self.kind == InterfaceKind::Subscriber {
            return Err(RceError::InvalidRequest(
                "cannot send on a subscriber interface".into(),
            ));
        }
        if client_msg.msg_type != self.msg_type {
            return Err(RceError::InvalidRequest(format!(
                "interface {} expects type {}, got {}",
                self.tag, self.msg_type, client_msg.msg_type
            )));
        }
        let to_class = self.to_class.as_ref().ok_or_else(|| {
            RceError::InternalError(format!("interface {} has no to-ROS class", self.tag))
        })?;
        let ros_value = self
            .converter
            .decode(to_class.as_ref(), &client_msg.payload)
            .map_err(|err| RceError::InvalidRequest(err.to_string()))?;

        let mut fifo = MessageFifo::new();
        ros_value.serialize(&mut fifo);

        // Originated here, not relayed from another tagged interface: no srcTag, and
        // `push` marks this apart from a Messenger-relayed ROS_MSG.
        self.emit(Content::RosMsg {
            msg: fifo.to_vec(),
            dest_tag: self.tag.clone(),
            src_tag: String::new(),
            msg_id: msg_id.as_str().to_string(),
            user: sender.to_string(),
            push: true,
        })
    }

    /// `receive(msg)`: a ROS payload arrived for this interface. Deserializes it,
    /// encodes to JSON, and hands `{type, msgID, interfaceTag, msg}` to the
    /// container. Rejects a `publisher`-receive contract violation.
    pub fn receive(&self, msg_id: &str, ros_bytes: &[u8]) -> Result<()> {
        if self.kind == InterfaceKind::Publisher {
            return Err(RceError::InvalidRequest(
                "cannot receive on a publisher interface".into(),
            ));
        }
        let from_class = self.from_class.as_ref().ok_or_else(|| {
            RceError::InternalError(format!("interface {} has no from-ROS class", self.tag))
        })?;
        let ros_value = from_class.deserialize(ros_bytes)?;
        let json = self
            .converter
            .encode(ros_value.as_ref())
            .map_err(|err| RceError::InvalidRequest(err.to_string()))?;

        self.container.received_from_interface(crate::collaborators::ReceivedEvent {
            msg_type: self.msg_type.clone(),
            msg_id: msg_id.to_string(),
            interface_tag: self.tag.clone(),
            msg: json,
        });
        Ok(())
    }
}

impl Drop for Interface {
    fn drop(&mut self) {
        let still_referenced = !self.refs.lock().expect("interface mutex poisoned").is_empty();
        if still_referenced {
            if let Err(err) = self.emit(Content::RosRemove {
                kind: RemovalKind::Interface,
                tag: self.tag.clone(),
            }) {
                log::warn!("failed to emit ROS_REMOVE while dropping interface {}: {err}", self.tag);
            }
        }
        self.container.free_addr(&self.ros_addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct NoopRosValue;
    impl crate::collaborators::RosValue for NoopRosValue {
        fn serialize(&self, fifo: &mut MessageFifo) {
            fifo.add_str("ros-bytes");
        }
    }

    struct NoopRosClass;
    impl RosClass for NoopRosClass {
        fn deserialize(&self, _bytes: &[u8]) -> Result<Box<dyn crate::collaborators::RosValue>> {
            Ok(Box::new(NoopRosValue))
        }
    }

    struct PassthroughConverter;
    impl JsonConverter for PassthroughConverter {
        fn encode(&self, _value: &dyn crate::collaborators::RosValue) -> Result<serde_json::Value> {
            Ok(serde_json::json!({"ok": true}))
        }
        fn decode(
            &self,
            _class: &dyn RosClass,
            _json: &serde_json::Value,
        ) -> Result<Box<dyn crate::collaborators::RosValue>> {
            Ok(Box::new(NoopRosValue))
        }
    }

    #[derive(Default)]
    struct RecordingContainer {
        sent: StdMutex<Vec<WireMessage>>,
        received: StdMutex<Vec<crate::collaborators::ReceivedEvent>>,
        freed: StdMutex<Vec<String>>,
    }

    impl Container for RecordingContainer {
        fn reserve_addr(&self) -> Result<String> {
            Ok("/ns/topic".into())
        }
        fn free_addr(&self, addr: &str) {
            self.freed.lock().unwrap().push(addr.to_string());
        }
        fn send(&self, msg: WireMessage) -> Result<()> {
            self.sent.lock().unwrap().push(msg);
            Ok(())
        }
        fn received_from_interface(&self, event: crate::collaborators::ReceivedEvent) {
            self.received.lock().unwrap().push(event);
        }
    }

    fn make_interface(container: Arc<RecordingContainer>, kind: InterfaceKind) -> Interface {
        Interface::new(
            container,
            Arc::new(PassthroughConverter),
            "camera".into(),
            "sensor_msgs/Image".into(),
            kind,
            Some(Arc::new(NoopRosClass)),
            Some(Arc::new(NoopRosClass)),
        )
        .unwrap()
    }

    #[test]
    fn validate_matches_exact_fields_only() {
        let container = Arc::new(RecordingContainer::default());
        let iface = make_interface(container, InterfaceKind::Publisher);
        assert!(iface.validate("camera", "/ns/topic", "sensor_msgs/Image", InterfaceKind::Publisher));
        assert!(!iface.validate("camera", "/ns/topic", "sensor_msgs/Image", InterfaceKind::Subscriber));
        assert!(!iface.validate("other", "/ns/topic", "sensor_msgs/Image", InterfaceKind::Publisher));
    }

    #[test]
    fn refcount_invariant_emits_add_then_user_then_remove() {
        let container = Arc::new(RecordingContainer::default());
        let iface = make_interface(container.clone(), InterfaceKind::Publisher);

        iface.register_user("t1", CommId::new("C1")).unwrap();
        iface.register_user("t2", CommId::new("C2")).unwrap();
        iface.unregister_user("t1", &CommId::new("C1")).unwrap();
        iface.unregister_user("t2", &CommId::new("C2")).unwrap();

        let sent = container.sent.lock().unwrap();
        let kinds: Vec<_> = sent.iter().map(|m| m.content.msg_type()).collect();
        assert_eq!(
            kinds,
            vec![
                rce_types::MsgType::RosAdd,
                rce_types::MsgType::RosUser,
                rce_types::MsgType::RosUser,
                rce_types::MsgType::RosUser,
                rce_types::MsgType::RosRemove,
            ]
        );
    }

    #[test]
    fn unregistering_absent_user_is_invalid_request() {
        let container = Arc::new(RecordingContainer::default());
        let iface = make_interface(container, InterfaceKind::Publisher);
        assert!(matches!(
            iface.unregister_user("ghost", &CommId::new("C1")),
            Err(RceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn send_on_subscriber_is_a_contract_violation() {
        let container = Arc::new(RecordingContainer::default());
        let iface = make_interface(container, InterfaceKind::Subscriber);
        let client_msg = ClientMessage {
            msg_type: "sensor_msgs/Image".into(),
            payload: serde_json::json!({}),
        };
        assert!(matches!(
            iface.send(&client_msg, "alice", MsgId::new("1")),
            Err(RceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn receive_on_publisher_is_a_contract_violation() {
        let container = Arc::new(RecordingContainer::default());
        let iface = make_interface(container, InterfaceKind::Publisher);
        assert!(matches!(
            iface.receive("1", b"bytes"),
            Err(RceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn send_rejects_mismatched_client_type() {
        let container = Arc::new(RecordingContainer::default());
        let iface = make_interface(container, InterfaceKind::Publisher);
        let client_msg = ClientMessage {
            msg_type: "std_msgs/String".into(),
            payload: serde_json::json!({}),
        };
        assert!(matches!(
            iface.send(&client_msg, "alice", MsgId::new("1")),
            Err(RceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn send_emits_a_push_marked_ros_msg() {
        let container = Arc::new(RecordingContainer::default());
        let iface = make_interface(container.clone(), InterfaceKind::Publisher);
        let client_msg = ClientMessage {
            msg_type: "sensor_msgs/Image".into(),
            payload: serde_json::json!({}),
        };
        iface.send(&client_msg, "alice", MsgId::new("1")).unwrap();

        let sent = container.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        match &sent[0].content {
            Content::RosMsg { dest_tag, src_tag, push, .. } => {
                assert_eq!(dest_tag, "camera");
                assert!(src_tag.is_empty());
                assert!(*push, "Interface::send must mark itself as the originating push");
            }
            other => panic!("expected RosMsg content, got {other:?}"),
        }
    }

    #[test]
    fn receive_encodes_and_forwards_to_container() {
        let container = Arc::new(RecordingContainer::default());
        let iface = make_interface(container.clone(), InterfaceKind::Subscriber);
        iface.receive("42", b"raw-ros-bytes").unwrap();

        let received = container.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].msg_id, "42");
        assert_eq!(received[0].interface_tag, "camera");
    }

    #[test]
    fn drop_frees_the_reserved_address() {
        let container = Arc::new(RecordingContainer::default());
        {
            let _iface = make_interface(container.clone(), InterfaceKind::Publisher);
        }
        assert_eq!(*container.freed.lock().unwrap(), vec!["/ns/topic".to_string()]);
    }

    struct RecordingLoader {
        msg_calls: StdMutex<Vec<(String, String)>>,
    }

    impl crate::collaborators::RosLoader for RecordingLoader {
        fn load_msg(&self, pkg: &str, name: &str) -> Result<Arc<dyn RosClass>> {
            self.msg_calls.lock().unwrap().push((pkg.to_string(), name.to_string()));
            Ok(Arc::new(NoopRosClass))
        }
        fn load_srv(&self, pkg: &str, name: &str) -> Result<(Arc<dyn RosClass>, Arc<dyn RosClass>)> {
            self.msg_calls.lock().unwrap().push((pkg.to_string(), name.to_string()));
            Ok((Arc::new(NoopRosClass), Arc::new(NoopRosClass)))
        }
    }

    #[test]
    fn with_loader_resolves_a_publisher_class_from_pkg_and_name() {
        let container = Arc::new(RecordingContainer::default());
        let loader = Arc::new(RecordingLoader {
            msg_calls: StdMutex::new(Vec::new()),
        });
        let iface = Interface::with_loader(
            container,
            Arc::new(PassthroughConverter),
            loader.clone(),
            "camera".into(),
            "sensor_msgs/Image".into(),
            InterfaceKind::Publisher,
        )
        .unwrap();

        assert_eq!(
            *loader.msg_calls.lock().unwrap(),
            vec![("sensor_msgs".to_string(), "Image".to_string())]
        );
        assert!(iface.to_class.is_some());
        assert!(iface.from_class.is_none());
    }

    #[test]
    fn with_loader_resolves_both_classes_for_a_service() {
        let container = Arc::new(RecordingContainer::default());
        let loader = Arc::new(RecordingLoader {
            msg_calls: StdMutex::new(Vec::new()),
        });
        let iface = Interface::with_loader(
            container,
            Arc::new(PassthroughConverter),
            loader,
            "adder".into(),
            "my_pkg/Add".into(),
            InterfaceKind::Service,
        )
        .unwrap();

        assert!(iface.to_class.is_some());
        assert!(iface.from_class.is_some());
    }

    #[test]
    fn with_loader_rejects_a_malformed_type_name() {
        let container = Arc::new(RecordingContainer::default());
        let loader = Arc::new(RecordingLoader {
            msg_calls: StdMutex::new(Vec::new()),
        });
        assert!(matches!(
            Interface::with_loader(
                container,
                Arc::new(PassthroughConverter),
                loader,
                "camera".into(),
                "NoSlashHere".into(),
                InterfaceKind::Publisher,
            ),
            Err(RceError::InvalidRequest(_))
        ));
    }

    #[test]
    fn drop_with_references_remaining_emits_ros_remove_before_freeing() {
        let container = Arc::new(RecordingContainer::default());
        {
            let iface = make_interface(container.clone(), InterfaceKind::Publisher);
            iface.register_user("x", CommId::new("C1")).unwrap();
            // Dropped here without unregistering "x" first -- mirrors __del__'s
            // `if self._ref: self._stop()` in the original.
        }

        let sent = container.sent.lock().unwrap();
        let kinds: Vec<_> = sent.iter().map(|m| m.content.msg_type()).collect();
        assert_eq!(
            kinds,
            vec![rce_types::MsgType::RosAdd, rce_types::MsgType::RosUser, rce_types::MsgType::RosRemove]
        );
        assert_eq!(*container.freed.lock().unwrap(), vec!["/ns/topic".to_string()]);
    }
}
