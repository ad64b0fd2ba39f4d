//! Message processor registry (4.G): dispatches a fully decoded message to whichever
//! processor is registered for its content type.
//!
//! The concrete processors named in the specification -- handing `CONNECT` to the
//! relay manager's `processRequest`, registering a peer's `COMM_INFO`, routing
//! `COMMAND`/`TAG` to a control distributor, invoking the Messenger for `ROS_MSG` --
//! are all owned by collaborators outside this crate (the relay manager, the control
//! distributor, `rce-bridge`'s `Messenger`). This registry only holds the dispatch
//! table; `rce-node` wires the real processors in at startup.

use std::collections::HashMap;
use std::sync::Arc;

use rce_proto::WireMessage;
use rce_types::MsgType;

/// Handles one fully decoded message. Implementations are expected to be cheap
/// `Arc`-friendly handles onto the real collaborator (a channel sender, a shared
/// manager reference), not the collaborator itself.
pub trait MessageProcessor: Send + Sync {
    fn process(&self, msg: WireMessage);
}

impl<F: Fn(WireMessage) + Send + Sync> MessageProcessor for F {
    fn process(&self, msg: WireMessage) {
        self(msg)
    }
}

/// `content-type -> processor` dispatch table, per 4.G. Registered once at startup
/// and read thereafter; a lookup miss is logged and the message dropped, matching
/// `processMessage`'s contract in 4.E.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<MsgType, Arc<dyn MessageProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        ProcessorRegistry::default()
    }

    /// Registers (or replaces) the processor for `msg_type`.
    pub fn register(&mut self, msg_type: MsgType, processor: Arc<dyn MessageProcessor>) {
        self.processors.insert(msg_type, processor);
    }

    /// `processMessage(msg)`: look up the processor for `msg.type`; if absent, log
    /// and drop.
    pub fn dispatch(&self, msg: WireMessage) {
        let msg_type = msg.content.msg_type();
        match self.processors.get(&msg_type) {
            Some(processor) => processor.process(msg),
            None => log::warn!("no message processor registered for {msg_type}, dropping message"),
        }
    }
}
