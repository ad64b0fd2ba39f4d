//! Transport glue: reads the fixed header and content bytes off a TCP connection,
//! drives them through the router's routing decision, and pumps outbound bytes back
//! out over a per-connection write task.
//!
//! Mirrors `flo-server`'s per-connection I/O loop (`flo_io`/`connection_handler`),
//! modernized from that crate's `tokio-core`/`futures 0.1` stack onto `tokio` 1.x.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use rce_proto::{Content, WireHeader};
use rce_types::error::{RceError, Result};
use rce_types::limits::{CHUNK_SIZE, HDR_LEN};
use rce_types::CommId;

use crate::factory::ProtocolFactory;
use crate::handler::Consumer;
use crate::router::{ConnectionSink, Router};

/// The write half of a connection's outbound path, addressable from anywhere in the
/// process via a cheap clone. Implements both [`Consumer`] (so a `Sender`/`Forwarder`
/// can pump bytes into it) and [`ConnectionSink`] (so the router can hand out fresh
/// consumer handles onto it for each new message).
#[derive(Clone)]
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Consumer for OutboundQueue {
    fn register_producer(&mut self, _producer: Box<dyn crate::handler::Producer>) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, data: &[u8]) {
        // The write task owns the socket; a send error here only means the
        // connection already went away, which the read loop will also observe.
        let _ = self.tx.send(data.to_vec());
    }

    fn unregister_producer(&mut self) {}
}

impl ConnectionSink for OutboundQueue {
    fn new_consumer(&self) -> Box<dyn Consumer> {
        Box::new(self.clone())
    }
}

async fn write_loop(mut writer: impl AsyncWrite + Unpin, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(chunk) = rx.recv().await {
        if writer.write_all(&chunk).await.is_err() {
            break;
        }
    }
}

/// Runs one accepted (or initiated) connection to completion: spawns its write task,
/// then loops reading `[header][content]` frames and handing each one to the router.
pub async fn run_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router>,
    factory: Arc<ProtocolFactory>,
) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();
    let outbound = OutboundQueue { tx };
    tokio::spawn(write_loop(write_half, rx));

    let handshake_outbound = outbound.clone();
    let handshake_router = router.clone();
    let protocol = factory.new_connection(Box::new(move |msg| {
        if let Content::CommInfo(peer_comm_id) = msg.content {
            log::info!("Relay connection from {peer_addr} identified itself as {peer_comm_id}");
            handshake_router.register_connection(peer_comm_id, Arc::new(handshake_outbound.clone()));
        } else {
            log::warn!("Relay connection from {peer_addr} sent a non-handshake message before authenticating");
        }
    }));

    let mut reader = BufReader::new(read_half);
    loop {
        let mut hdr_buf = [0u8; HDR_LEN];
        match reader.read_exact(&mut hdr_buf).await {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(RceError::ConnectionError(err.to_string())),
        }

        let header = WireHeader::parse(&hdr_buf)?;
        let body_len = (header.total_len as usize).saturating_sub(HDR_LEN);

        let mut handler = router.receive(
            body_len,
            header.msg_type,
            header.msg_id,
            header.origin,
            header.dest,
            &protocol,
        );

        let mut remaining = body_len;
        while remaining > 0 {
            let take = remaining.min(CHUNK_SIZE);
            let mut chunk = vec![0u8; take];
            reader
                .read_exact(&mut chunk)
                .await
                .map_err(|e| RceError::ConnectionError(e.to_string()))?;
            handler.write(&chunk);
            remaining -= take;
        }
        handler.unregister_producer();
    }

    Ok(())
}

/// Accepts connections on `addr` and spawns [`run_connection`] for each one. Mirrors
/// `flo-server`'s top-level `run()`: binds once, then loops forever handing off
/// accepted sockets.
pub async fn serve(addr: SocketAddr, router: Arc<Router>, factory: Arc<ProtocolFactory>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| RceError::ConnectionError(e.to_string()))?;
    log::info!("RCE relay listening on {addr}");

    loop {
        let (stream, peer_addr) = listener
            .accept()
            .await
            .map_err(|e| RceError::ConnectionError(e.to_string()))?;
        log::info!("Accepted relay connection from {peer_addr}");

        let router = router.clone();
        let factory = factory.clone();
        tokio::spawn(async move {
            if let Err(err) = run_connection(stream, peer_addr, router, factory).await {
                log::warn!("Connection from {peer_addr} ended with an error: {err}");
            }
        });
    }
}

/// Opens an outbound connection to `addr` and wires it into `router` the same way an
/// accepted connection is, so local code can proactively dial a peer relay (the
/// `CONNECT` processor's job).
pub async fn dial(
    addr: SocketAddr,
    router: Arc<Router>,
    factory: Arc<ProtocolFactory>,
) -> Result<()> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| RceError::ConnectionError(e.to_string()))?;
    run_connection(stream, addr, router, factory).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rce_proto::ContentRegistry;
    use rce_types::MsgType;

    #[tokio::test]
    async fn serve_binds_and_accepts_one_connection() {
        let router = Arc::new(Router::new(
            CommId::new("local"),
            Arc::new(ContentRegistry::with_standard_codecs()),
            Arc::new(crate::processor::ProcessorRegistry::new()),
        ));
        let factory = Arc::new(ProtocolFactory::new([MsgType::CommInfo]));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let server_router = router.clone();
        let server_factory = factory.clone();
        let server = tokio::spawn(async move {
            let _ = serve(addr, server_router, server_factory).await;
        });

        // Give the listener a moment to bind before dialing.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let client = TcpStream::connect(addr).await.unwrap();
        drop(client);

        server.abort();
    }
}
