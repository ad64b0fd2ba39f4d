//! The per-message stream handlers: `Sink`, `Receiver`, `Sender`, `Forwarder` and
//! `EndReceiver`, and the `Producer`/`Consumer` contract they implement.
//!
//! This is the `flo-server` connection-handler analogue, generalized from "one TCP
//! connection, one client" to "one wire message, one handler" per the routing
//! decision table: every inbound message gets exactly one handler for its lifetime,
//! and that handler is either a sink for bytes nobody wants, a buffer feeding a local
//! deserializer, or a relay pumping bytes straight through to another connection.

use std::sync::{Arc, Mutex};

use rce_proto::{ContentRegistry, WireMessage};
use rce_types::error::{RceError, Result};
use rce_types::limits::CHUNK_SIZE;
use rce_types::{CommId, MsgId, MsgType};

/// Pull-side control surface exposed to whoever is feeding bytes into a handler: a
/// connection that has filled up can `pause_producing` and later `resume_producing`;
/// a connection that is going away calls `stop_producing` once.
pub trait Producer: Send {
    fn pause_producing(&self);
    fn resume_producing(&self);
    fn stop_producing(&self);
}

/// Push-side sink a handler drains itself into. `register_producer` lets a consumer
/// hold onto whoever feeds it, purely so it can propagate cancellation upstream (see
/// [`Forwarder::stop_producing`]); it is otherwise inert for `Sink`, `Receiver` and
/// `EndReceiver`, which never originate a `stop_producing` call of their own.
pub trait Consumer: Send {
    fn register_producer(&mut self, producer: Box<dyn Producer>) -> Result<()>;
    fn write(&mut self, data: &[u8]);
    fn unregister_producer(&mut self);
}

/// A producer that can additionally be told to begin delivering into a freshly
/// attached consumer. `Sender` and `Forwarder` implement this; pure consumers
/// (`Sink`, `Receiver`, `EndReceiver`) have no producer side and so don't need it.
pub trait OutboundHandler: Producer {
    /// Attaches `consumer` as this handler's downstream sink and starts pumping
    /// whatever is already buffered. Fails with `InternalError` if a consumer is
    /// already attached -- at most one consumer per handler, ever.
    fn attach(&self, consumer: Box<dyn Consumer>) -> Result<()>;
}

/// Discards everything written to it. Used when a message's destination can't be
/// resolved: the bytes still have to be read off the wire to keep the stream framed
/// correctly, they just have nowhere useful to go.
#[derive(Default)]
pub struct Sink;

impl Consumer for Sink {
    fn register_producer(&mut self, _producer: Box<dyn Producer>) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, _data: &[u8]) {}

    fn unregister_producer(&mut self) {}
}

/// Accumulates a message's content bytes for a caller who will pull them out once the
/// producer signals it is done. Used directly by the handshake init path; the
/// ordinary relay path uses [`EndReceiver`] instead, which also deserializes.
pub struct Receiver {
    msg_len: usize,
    origin: CommId,
    dest: CommId,
    buf: rce_proto::MessageFifo,
    received: usize,
}

impl Receiver {
    pub fn new(msg_len: usize, origin: CommId, dest: CommId) -> Self {
        Receiver {
            msg_len,
            origin,
            dest,
            buf: rce_proto::MessageFifo::new(),
            received: 0,
        }
    }

    pub fn origin(&self) -> &CommId {
        &self.origin
    }

    pub fn dest(&self) -> &CommId {
        &self.dest
    }

    pub fn into_buf(self) -> rce_proto::MessageFifo {
        self.buf
    }
}

impl Consumer for Receiver {
    fn register_producer(&mut self, _producer: Box<dyn Producer>) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, data: &[u8]) {
        self.buf.push(data.to_vec());
        self.received += data.len();
    }

    fn unregister_producer(&mut self) {
        log::info!(
            "Message Handler: {} of {} bytes received.",
            self.received,
            self.msg_len
        );
    }
}

struct SenderInner {
    msg_len: usize,
    origin: CommId,
    dest: CommId,
    buf: rce_proto::MessageFifo,
    sent: usize,
    consumer: Option<Box<dyn Consumer>>,
    paused: bool,
    aborted: bool,
    finished: bool,
}

impl SenderInner {
    fn pump(&mut self) {
        while !self.paused && !self.buf.is_empty() {
            let (chunk, n) = self.buf.pop(CHUNK_SIZE);
            if let Some(consumer) = self.consumer.as_mut() {
                consumer.write(&chunk);
            }
            self.sent += n;
        }
        if self.sent >= self.msg_len || self.buf.is_empty() || self.aborted {
            self.finish();
        }
    }

    /// Calls `unregister_producer` on the attached consumer exactly once, regardless
    /// of how many times `pump`/`stop_producing` observe the finishing condition.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        log::info!(
            "Message Handler: {} of {} bytes sent.",
            self.sent,
            self.msg_len
        );
        if let Some(consumer) = self.consumer.as_mut() {
            consumer.unregister_producer();
        }
    }
}

/// Feeds a single message's bytes out to a destination connection, `CHUNK_SIZE` at a
/// time, honoring backpressure from its consumer. Registered as the producer on the
/// outbound connection for the message's origin (local round trip) or for the dest
/// (direct delivery).
#[derive(Clone)]
pub struct Sender {
    inner: Arc<Mutex<SenderInner>>,
}

impl Sender {
    pub fn new(msg_len: usize, origin: CommId, dest: CommId, buf: rce_proto::MessageFifo) -> Self {
        Sender {
            inner: Arc::new(Mutex::new(SenderInner {
                msg_len,
                origin,
                dest,
                buf,
                sent: 0,
                consumer: None,
                paused: false,
                aborted: false,
                finished: false,
            })),
        }
    }

    pub fn paused(&self) -> bool {
        self.inner.lock().expect("sender mutex poisoned").paused
    }

    pub fn origin(&self) -> CommId {
        self.inner.lock().expect("sender mutex poisoned").origin.clone()
    }

    pub fn dest(&self) -> CommId {
        self.inner.lock().expect("sender mutex poisoned").dest.clone()
    }
}

impl Producer for Sender {
    fn pause_producing(&self) {
        self.inner.lock().expect("sender mutex poisoned").paused = true;
    }

    fn resume_producing(&self) {
        let mut inner = self.inner.lock().expect("sender mutex poisoned");
        inner.paused = false;
        inner.pump();
    }

    fn stop_producing(&self) {
        let mut inner = self.inner.lock().expect("sender mutex poisoned");
        inner.paused = true;
        inner.aborted = true;
        inner.finish();
    }
}

impl OutboundHandler for Sender {
    fn attach(&self, consumer: Box<dyn Consumer>) -> Result<()> {
        let mut inner = self.inner.lock().expect("sender mutex poisoned");
        if inner.consumer.is_some() {
            return Err(RceError::InternalError(
                "this message sender is already sending a message".into(),
            ));
        }
        inner.consumer = Some(consumer);
        inner.pump();
        Ok(())
    }
}

struct ForwarderInner {
    msg_len: usize,
    origin: CommId,
    dest: CommId,
    buf: rce_proto::MessageFifo,
    received: usize,
    sent: usize,
    consumer: Option<Box<dyn Consumer>>,
    upstream: Option<Box<dyn Producer>>,
    paused: bool,
    aborted: bool,
    finished: bool,
}

impl ForwarderInner {
    fn pump(&mut self) {
        while !self.paused && !self.buf.is_empty() {
            let (chunk, n) = self.buf.pop(CHUNK_SIZE);
            if let Some(consumer) = self.consumer.as_mut() {
                consumer.write(&chunk);
            }
            self.sent += n;
        }
        if self.sent >= self.msg_len || (self.received >= self.msg_len && self.buf.is_empty())
            || self.aborted
        {
            self.finish();
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        log::info!(
            "Message Handler: {} of {} bytes forwarded.",
            self.sent,
            self.msg_len
        );
        self.buf.clear();
        if let Some(consumer) = self.consumer.as_mut() {
            consumer.unregister_producer();
        }
    }
}

/// Pumps one message straight from an inbound connection to an outbound one without
/// ever handing the content to a local deserializer. Plays both roles at once: the
/// `Consumer` upstream writes into it, and as a `Producer` it is registered against
/// the outbound connection for `dest`.
#[derive(Clone)]
pub struct Forwarder {
    inner: Arc<Mutex<ForwarderInner>>,
}

impl Forwarder {
    pub fn new(msg_len: usize, origin: CommId, dest: CommId) -> Self {
        Forwarder {
            inner: Arc::new(Mutex::new(ForwarderInner {
                msg_len,
                origin,
                dest,
                buf: rce_proto::MessageFifo::new(),
                received: 0,
                sent: 0,
                consumer: None,
                upstream: None,
                paused: false,
                aborted: false,
                finished: false,
            })),
        }
    }

    pub fn origin(&self) -> CommId {
        self.inner.lock().expect("forwarder mutex poisoned").origin.clone()
    }

    pub fn dest(&self) -> CommId {
        self.inner.lock().expect("forwarder mutex poisoned").dest.clone()
    }
}

impl Consumer for Forwarder {
    fn register_producer(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        self.inner.lock().expect("forwarder mutex poisoned").upstream = Some(producer);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) {
        let mut inner = self.inner.lock().expect("forwarder mutex poisoned");
        inner.buf.push(data.to_vec());
        inner.received += data.len();
        if inner.consumer.is_some() {
            inner.pump();
        }
    }

    fn unregister_producer(&mut self) {
        let inner = self.inner.lock().expect("forwarder mutex poisoned");
        log::info!(
            "Message Handler: {} of {} bytes received.",
            inner.received,
            inner.msg_len
        );
    }
}

impl Producer for Forwarder {
    fn pause_producing(&self) {
        self.inner.lock().expect("forwarder mutex poisoned").paused = true;
    }

    fn resume_producing(&self) {
        let mut inner = self.inner.lock().expect("forwarder mutex poisoned");
        inner.paused = false;
        inner.pump();
    }

    fn stop_producing(&self) {
        let upstream = {
            let mut inner = self.inner.lock().expect("forwarder mutex poisoned");
            inner.paused = true;
            inner.aborted = true;
            inner.finish();
            inner.upstream.take()
        };
        if let Some(upstream) = upstream {
            upstream.stop_producing();
        }
    }
}

impl OutboundHandler for Forwarder {
    fn attach(&self, consumer: Box<dyn Consumer>) -> Result<()> {
        let mut inner = self.inner.lock().expect("forwarder mutex poisoned");
        if inner.consumer.is_some() {
            return Err(RceError::InternalError(
                "this forwarder already has a downstream consumer".into(),
            ));
        }
        inner.consumer = Some(consumer);
        inner.pump();
        Ok(())
    }
}

/// Accumulates a message's bytes, then on `unregister_producer` deserializes its
/// content and hands the resulting [`WireMessage`] to a completion callback. A
/// deserialization failure is logged and never reaches the callback -- callers only
/// see successfully decoded messages.
pub struct EndReceiver {
    msg_len: usize,
    origin: CommId,
    dest: CommId,
    msg_id: MsgId,
    msg_type: MsgType,
    buf: rce_proto::MessageFifo,
    received: usize,
    registry: Arc<ContentRegistry>,
    on_message: Box<dyn FnMut(WireMessage) + Send>,
}

impl EndReceiver {
    pub fn new(
        msg_len: usize,
        origin: CommId,
        dest: CommId,
        msg_id: MsgId,
        msg_type: MsgType,
        registry: Arc<ContentRegistry>,
        on_message: Box<dyn FnMut(WireMessage) + Send>,
    ) -> Self {
        EndReceiver {
            msg_len,
            origin,
            dest,
            msg_id,
            msg_type,
            buf: rce_proto::MessageFifo::new(),
            received: 0,
            registry,
            on_message,
        }
    }
}

impl Consumer for EndReceiver {
    fn register_producer(&mut self, _producer: Box<dyn Producer>) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, data: &[u8]) {
        self.buf.push(data.to_vec());
        self.received += data.len();
    }

    fn unregister_producer(&mut self) {
        log::info!(
            "Message Handler: {} of {} bytes received.",
            self.received,
            self.msg_len
        );
        match self.registry.deserialize(self.msg_type, &mut self.buf) {
            Ok(content) => {
                let msg = WireMessage::new(
                    self.origin.clone(),
                    self.dest.clone(),
                    self.msg_id.clone(),
                    content,
                );
                (self.on_message)(msg);
            }
            Err(err) => {
                log::warn!("Could not deserialize message content: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct RecordingConsumer {
        written: Arc<Mutex<Vec<u8>>>,
        unregistered: Arc<AtomicUsize>,
    }

    impl Consumer for RecordingConsumer {
        fn register_producer(&mut self, _producer: Box<dyn Producer>) -> Result<()> {
            Ok(())
        }

        fn write(&mut self, data: &[u8]) {
            self.written.lock().unwrap().extend_from_slice(data);
        }

        fn unregister_producer(&mut self) {
            self.unregistered.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn sender_delivers_all_bytes_and_unregisters_exactly_once() {
        let mut buf = rce_proto::MessageFifo::new();
        buf.push(vec![1u8; 10_000]);
        let sender = Sender::new(10_000, CommId::new("A"), CommId::new("B"), buf);

        let consumer = RecordingConsumer::default();
        sender.attach(Box::new(consumer.clone())).unwrap();

        assert_eq!(consumer.written.lock().unwrap().len(), 10_000);
        assert_eq!(consumer.unregistered.load(Ordering::SeqCst), 1);

        // A second pump-triggering call (e.g. a stray resume after completion) must
        // not call unregister_producer again.
        sender.resume_producing();
        assert_eq!(consumer.unregistered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sender_honors_pause_and_resume() {
        let mut buf = rce_proto::MessageFifo::new();
        buf.push(vec![0u8; CHUNK_SIZE * 3]);
        let sender = Sender::new(CHUNK_SIZE * 3, CommId::new("A"), CommId::new("B"), buf);
        sender.pause_producing();

        let consumer = RecordingConsumer::default();
        sender.attach(Box::new(consumer.clone())).unwrap();
        assert!(consumer.written.lock().unwrap().is_empty());
        assert_eq!(consumer.unregistered.load(Ordering::SeqCst), 0);

        sender.resume_producing();
        assert_eq!(consumer.written.lock().unwrap().len(), CHUNK_SIZE * 3);
        assert_eq!(consumer.unregistered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_attach_is_internal_error() {
        let sender = Sender::new(0, CommId::new("A"), CommId::new("B"), rce_proto::MessageFifo::new());
        sender.attach(Box::new(RecordingConsumer::default())).unwrap();
        assert!(matches!(
            sender.attach(Box::new(RecordingConsumer::default())),
            Err(RceError::InternalError(_))
        ));
    }

    #[test]
    fn forwarder_conserves_byte_count_end_to_end() {
        let mut forwarder = Forwarder::new(5_000, CommId::new("A"), CommId::new("B"));
        let consumer = RecordingConsumer::default();
        forwarder.attach(Box::new(consumer.clone())).unwrap();

        let payload = vec![7u8; 5_000];
        forwarder.write(&payload);
        forwarder.unregister_producer();

        assert_eq!(*consumer.written.lock().unwrap(), payload);
        assert_eq!(consumer.unregistered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn forwarder_stop_producing_propagates_upstream() {
        #[derive(Clone, Default)]
        struct StoppableProducer(Arc<AtomicUsize>);
        impl Producer for StoppableProducer {
            fn pause_producing(&self) {}
            fn resume_producing(&self) {}
            fn stop_producing(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut forwarder = Forwarder::new(100, CommId::new("A"), CommId::new("B"));
        let upstream_stopped = Arc::new(AtomicUsize::new(0));
        forwarder
            .register_producer(Box::new(StoppableProducer(upstream_stopped.clone())))
            .unwrap();
        forwarder.attach(Box::new(RecordingConsumer::default())).unwrap();

        forwarder.stop_producing();
        assert_eq!(upstream_stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sink_discards_without_retaining_anything() {
        let mut sink = Sink;
        sink.write(b"whatever");
        sink.unregister_producer();
    }

    #[test]
    fn end_receiver_decodes_and_invokes_callback_once() {
        use rce_proto::content::ContentCodec;

        let registry = Arc::new(ContentRegistry::with_standard_codecs());
        let mut codec_stream = rce_proto::MessageFifo::new();
        rce_proto::content::CommInfoCodec
            .serialize(&mut codec_stream, &rce_proto::Content::CommInfo(CommId::new("relay-1")))
            .unwrap();
        let bytes = codec_stream.to_vec();

        let received = Arc::new(Mutex::new(None));
        let received_clone = received.clone();
        let mut end_receiver = EndReceiver::new(
            bytes.len(),
            CommId::new("A"),
            CommId::new("B"),
            MsgId::new("1"),
            MsgType::CommInfo,
            registry,
            Box::new(move |msg| {
                *received_clone.lock().unwrap() = Some(msg);
            }),
        );

        end_receiver.write(&bytes);
        end_receiver.unregister_producer();

        let msg = received.lock().unwrap().take().expect("callback invoked");
        assert_eq!(msg.content, rce_proto::Content::CommInfo(CommId::new("relay-1")));
    }

    #[test]
    fn end_receiver_logs_and_skips_callback_on_bad_content() {
        let registry = Arc::new(ContentRegistry::with_standard_codecs());
        let called = Arc::new(AtomicUsize::new(0));
        let called_clone = called.clone();
        let mut end_receiver = EndReceiver::new(
            3,
            CommId::new("A"),
            CommId::new("B"),
            MsgId::new("1"),
            MsgType::CommInfo,
            registry,
            Box::new(move |_| {
                called_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        end_receiver.write(&[0xFF, 0xFF, 0xFF]);
        end_receiver.unregister_producer();
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }
}
