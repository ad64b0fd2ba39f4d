//! The Router / CommManager (4.E): holds the local communication ID, applies the
//! routing decision to every inbound message, and dispatches outgoing ones to the
//! right outbound connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rce_proto::ContentRegistry;
use rce_types::error::Result;
use rce_types::{CommId, MsgId, MsgType};

use crate::factory::ProtocolState;
use crate::handler::{Consumer, EndReceiver, Forwarder, OutboundHandler, Sender, Sink};
use crate::processor::ProcessorRegistry;

/// The outcome of the routing decision for one inbound message header, before its
/// content bytes are touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Sink,
    HandshakeEndReceiver,
    LocalEndReceiver,
    Forward,
}

/// Pure routing decision per the table in 4.E, steps 1-6. Kept free of any I/O or
/// shared state so the routing predicate invariant can be tested directly.
pub fn decide_route(
    msg_len: usize,
    msg_type: MsgType,
    dest: &CommId,
    local_comm_id: &CommId,
    authenticated: bool,
    filter_accepts: impl FnOnce(MsgType) -> bool,
) -> Route {
    if msg_len > rce_types::limits::MAX_LENGTH {
        return Route::Sink;
    }
    if !authenticated {
        return Route::HandshakeEndReceiver;
    }
    if !filter_accepts(msg_type) {
        return Route::Sink;
    }
    if dest == local_comm_id || dest.is_neighbor() {
        return Route::LocalEndReceiver;
    }
    if dest.is_private() {
        return Route::Sink;
    }
    Route::Forward
}

/// A handle onto one outbound connection: hands out a fresh [`Consumer`] each time a
/// producer needs to attach to this connection's write path. Implemented by the
/// transport glue in `connection.rs`; kept as a trait here so the router can be
/// exercised without real sockets.
pub trait ConnectionSink: Send + Sync {
    fn new_consumer(&self) -> Box<dyn Consumer>;
}

/// Holds the local `commID`, the destination -> outbound-connection table, and the
/// message processor registry. The single owner of routing decisions for every
/// connection this node has accepted or initiated.
pub struct Router {
    local_comm_id: CommId,
    connections: Mutex<HashMap<CommId, Arc<dyn ConnectionSink>>>,
    content_registry: Arc<ContentRegistry>,
    processors: Arc<ProcessorRegistry>,
}

impl Router {
    pub fn new(
        local_comm_id: CommId,
        content_registry: Arc<ContentRegistry>,
        processors: Arc<ProcessorRegistry>,
    ) -> Self {
        Router {
            local_comm_id,
            connections: Mutex::new(HashMap::new()),
            content_registry,
            processors,
        }
    }

    pub fn local_comm_id(&self) -> &CommId {
        &self.local_comm_id
    }

    pub fn register_connection(&self, comm_id: CommId, sink: Arc<dyn ConnectionSink>) {
        self.connections.lock().expect("router mutex poisoned").insert(comm_id, sink);
    }

    pub fn unregister_connection(&self, comm_id: &CommId) {
        self.connections.lock().expect("router mutex poisoned").remove(comm_id);
    }

    /// `registerProducer(sender, dest)`: find the connection for `dest`, attach
    /// `handler` as its producer. If no route exists, the handler is dropped and the
    /// failure logged.
    pub fn register_producer(&self, handler: Box<dyn OutboundHandler>, dest: &CommId) {
        let sink = self
            .connections
            .lock()
            .expect("router mutex poisoned")
            .get(dest)
            .cloned();

        match sink {
            Some(sink) => {
                if let Err(err) = handler.attach(sink.new_consumer()) {
                    log::warn!("could not attach producer to connection for {dest}: {err}");
                }
            }
            None => log::warn!("no route to {dest}, dropping producer"),
        }
    }

    /// `processMessage(msg)`.
    pub fn process_message(&self, msg: rce_proto::WireMessage) {
        self.processors.dispatch(msg);
    }

    /// Outbound data flow (§2): a producer hands this router an in-memory message;
    /// it is serialized, wrapped in a [`Sender`], and registered as the producer
    /// against the outbound connection for `msg.dest`. Serialization failures are
    /// logged and the message dropped, per the error propagation policy -- they
    /// never surface to the caller or tear down a connection.
    pub fn send_message(&self, msg: &rce_proto::WireMessage) {
        let bytes = match msg.serialize(&self.content_registry) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("failed to serialize outbound message to {}: {err}", msg.dest);
                return;
            }
        };
        let sender = Sender::new(
            bytes.len(),
            msg.origin.clone(),
            msg.dest.clone(),
            rce_proto::MessageFifo::from(bytes),
        );
        self.register_producer(Box::new(sender), &msg.dest);
    }

    /// Builds the handler for one inbound message, applying the routing decision and
    /// -- for the `Forward` outcome -- immediately registering the new [`Forwarder`]
    /// as a producer against the outbound connection for `dest`.
    #[allow(clippy::too_many_arguments)]
    pub fn receive(
        &self,
        msg_len: usize,
        msg_type: MsgType,
        msg_id: MsgId,
        origin: CommId,
        dest: CommId,
        protocol: &ProtocolState,
    ) -> Box<dyn Consumer> {
        let route = decide_route(
            msg_len,
            msg_type,
            &dest,
            &self.local_comm_id,
            protocol.is_authenticated(),
            |t| protocol.filter_accepts(t),
        );

        match route {
            Route::Sink => Box::new(Sink),
            Route::HandshakeEndReceiver => Box::new(EndReceiver::new(
                msg_len,
                origin,
                dest,
                msg_id,
                msg_type,
                self.content_registry.clone(),
                protocol.handshake_handler(),
            )),
            Route::LocalEndReceiver => {
                let processors = self.processors.clone();
                Box::new(EndReceiver::new(
                    msg_len,
                    origin,
                    dest,
                    msg_id,
                    msg_type,
                    self.content_registry.clone(),
                    Box::new(move |msg| processors.dispatch(msg)),
                ))
            }
            Route::Forward => {
                let forwarder = Forwarder::new(msg_len, origin, dest.clone());
                self.register_producer(Box::new(forwarder.clone()), &dest);
                Box::new(forwarder)
            }
        }
    }
}
