//! End-to-end routing scenarios (S3-S5): a node applying the routing decision to
//! inbound traffic and streaming the body through the resulting handler, using an
//! in-memory `ConnectionSink` stand-in for a real socket.

use std::sync::{Arc, Mutex};

use rce_proto::ContentRegistry;
use rce_relay::{ConnectionSink, Consumer, Producer, ProcessorRegistry, ProtocolFactory, Router};
use rce_types::{CommId, MsgId, MsgType};

struct RecordingConsumer {
    written: Arc<Mutex<Vec<u8>>>,
}

impl Consumer for RecordingConsumer {
    fn register_producer(&mut self, _producer: Box<dyn Producer>) -> rce_types::error::Result<()> {
        Ok(())
    }
    fn write(&mut self, data: &[u8]) {
        self.written.lock().unwrap().extend_from_slice(data);
    }
    fn unregister_producer(&mut self) {}
}

struct RecordingSink {
    written: Arc<Mutex<Vec<u8>>>,
}

impl ConnectionSink for RecordingSink {
    fn new_consumer(&self) -> Box<dyn Consumer> {
        Box::new(RecordingConsumer {
            written: self.written.clone(),
        })
    }
}

fn authenticated_router(local: &str, allowed: impl IntoIterator<Item = MsgType>) -> (Arc<Router>, rce_relay::ProtocolState) {
    let router = Arc::new(Router::new(
        CommId::new(local),
        Arc::new(ContentRegistry::with_standard_codecs()),
        Arc::new(ProcessorRegistry::new()),
    ));
    let protocol = ProtocolFactory::new(allowed).new_connection(Box::new(|_| {}));
    protocol.handshake_handler()(rce_proto::WireMessage::new(
        CommId::new("x"),
        CommId::new("y"),
        MsgId::new("0"),
        rce_proto::Content::CommInfo(CommId::new("z")),
    ));
    (router, protocol)
}

/// S3: node "R" forwards a ROS_MSG for dest "C" arriving in three chunks; the
/// chunks must land at "C"'s connection concatenated, in order.
#[test]
fn s3_forward_through_relay_preserves_chunk_order() {
    let (router, protocol) = authenticated_router("R", [MsgType::RosMsg]);
    let written = Arc::new(Mutex::new(Vec::new()));
    router.register_connection(CommId::new("C"), Arc::new(RecordingSink { written: written.clone() }));

    let chunk_a = vec![1u8; 100];
    let chunk_b = vec![2u8; 5];
    let chunk_c = vec![3u8; 42];
    let total_len = chunk_a.len() + chunk_b.len() + chunk_c.len();
    assert_eq!(total_len, 147);

    let mut handler = router.receive(
        total_len,
        MsgType::RosMsg,
        MsgId::new("1"),
        CommId::new("source"),
        CommId::new("C"),
        &protocol,
    );
    handler.write(&chunk_a);
    handler.write(&chunk_b);
    handler.write(&chunk_c);
    handler.unregister_producer();

    let mut expected = chunk_a;
    expected.extend(chunk_b);
    expected.extend(chunk_c);
    assert_eq!(*written.lock().unwrap(), expected);
}

/// S4: a message addressed to a `$priv-`-prefixed destination must be sunk, never
/// forwarded, even though a connection for that literal destination exists.
#[test]
fn s4_private_prefix_destination_is_dropped_not_forwarded() {
    let (router, protocol) = authenticated_router("R", [MsgType::RosMsg]);
    let written = Arc::new(Mutex::new(Vec::new()));
    router.register_connection(
        CommId::new("$priv-containerA"),
        Arc::new(RecordingSink { written: written.clone() }),
    );

    let mut handler = router.receive(
        16,
        MsgType::RosMsg,
        MsgId::new("1"),
        CommId::new("source"),
        CommId::new("$priv-containerA"),
        &protocol,
    );
    handler.write(b"should not forward");
    handler.unregister_producer();

    assert!(written.lock().unwrap().is_empty());
}

/// S5: a declared length over `MAX_LENGTH` routes to `Sink` regardless of body
/// content; the whole stream is consumed without being forwarded anywhere.
#[test]
fn s5_over_length_message_is_sunk() {
    let (router, protocol) = authenticated_router("R", [MsgType::RosMsg]);
    let written = Arc::new(Mutex::new(Vec::new()));
    router.register_connection(CommId::new("C"), Arc::new(RecordingSink { written: written.clone() }));

    let oversized_len = rce_types::limits::MAX_LENGTH + 1;
    let mut handler = router.receive(
        oversized_len,
        MsgType::RosMsg,
        MsgId::new("1"),
        CommId::new("source"),
        CommId::new("C"),
        &protocol,
    );
    handler.write(&vec![0u8; 4096]);
    handler.unregister_producer();

    assert!(written.lock().unwrap().is_empty());
}
