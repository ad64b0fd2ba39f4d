//! The relay node binary: parses `NodeOptions`, configures logging, wires the
//! router/protocol-factory/processor-registry triple together and runs the accept
//! loop, dialing any seeded peers alongside it.
//!
//! This is the `flo` binary's analogue in this workspace: `flo-server`'s `main`
//! loads a log4rs config, builds an `Engine`, and runs it to completion; this binary
//! loads the same way, builds a `Router`, and serves.

mod options;

use std::sync::Arc;

use clap::Parser;

use rce_bridge::{InterfaceManager, Messenger};
use rce_proto::{CommandClassRegistry, CommandContentCodec, ContentRegistry};
use rce_relay::{ProcessorRegistry, ProtocolFactory, Router};
use rce_types::{CommId, MsgType};

use options::NodeOptions;

#[tokio::main]
async fn main() {
    let options = NodeOptions::parse();

    if let Err(err) = log4rs::init_file(&options.log_config, Default::default()) {
        eprintln!(
            "failed to load log4rs config from {}: {err}",
            options.log_config.display()
        );
        std::process::exit(1);
    }

    if let Err(err) = run(options).await {
        log::error!("rce-node exited with an error: {err}");
        std::process::exit(1);
    }
}

async fn run(options: NodeOptions) -> rce_types::error::Result<()> {
    let local_comm_id = CommId::new(options.comm_id.clone());
    log::info!("starting relay node {local_comm_id}, listening on {}", options.listen);

    let mut content_registry = ContentRegistry::with_standard_codecs();
    content_registry
        .register(Box::new(CommandContentCodec {
            classes: Arc::new(CommandClassRegistry::new()),
        }))
        .expect("COMMAND is not registered by with_standard_codecs");
    let content_registry = Arc::new(content_registry);

    let manager = Arc::new(InterfaceManager::new());

    // The Messenger needs the very `Router` being assembled here (to submit remote
    // ROS_MSG traffic), so its processor closure reads it back out of this cell once
    // construction finishes rather than the two depending on each other directly.
    let messenger_cell: Arc<std::sync::OnceLock<Messenger>> = Arc::new(std::sync::OnceLock::new());

    // Same problem for CONNECT: dialing a named peer needs the Router and
    // ProtocolFactory this processor is itself being registered into.
    let dial_cell: Arc<std::sync::OnceLock<(Arc<Router>, Arc<ProtocolFactory>)>> =
        Arc::new(std::sync::OnceLock::new());

    let mut processors = ProcessorRegistry::new();
    {
        let cell = messenger_cell.clone();
        processors.register(
            MsgType::RosMsg,
            Arc::new(move |msg: rce_proto::WireMessage| match cell.get() {
                Some(messenger) => messenger.process_message(&msg),
                None => log::warn!("ROS_MSG arrived before the Messenger was ready, dropping"),
            }),
        );
    }
    processors.register(
        MsgType::CommInfo,
        Arc::new(|msg: rce_proto::WireMessage| {
            log::debug!("COMM_INFO processor invoked for a message from {}", msg.origin);
        }),
    );
    {
        let cell = dial_cell.clone();
        processors.register(
            MsgType::Connect,
            Arc::new(move |msg: rce_proto::WireMessage| {
                let rce_proto::Content::Connect(pairs) = &msg.content else {
                    return;
                };
                let Some((router, factory)) = cell.get() else {
                    log::warn!("CONNECT arrived before the router was ready, dropping");
                    return;
                };
                for (comm_id, addr) in pairs.clone() {
                    let addr: std::net::SocketAddr = match addr.parse() {
                        Ok(addr) => addr,
                        Err(err) => {
                            log::warn!("CONNECT named an unparseable address {addr:?} for {comm_id}: {err}");
                            continue;
                        }
                    };
                    let router = router.clone();
                    let factory = factory.clone();
                    log::info!("CONNECT from {} dialing peer {comm_id} at {addr}", msg.origin);
                    tokio::spawn(async move {
                        if let Err(err) = rce_relay::dial(addr, router, factory).await {
                            log::warn!("connection to peer {comm_id} at {addr} ended: {err}");
                        }
                    });
                }
            }),
        );
    }
    processors.register(
        MsgType::Request,
        Arc::new(|msg: rce_proto::WireMessage| {
            if let rce_proto::Content::Request { user, req_type, .. } = &msg.content {
                log::info!("REQUEST from {} user={user} type={req_type}", msg.origin);
                // The owning manager this request is handed to lives outside this core.
            }
        }),
    );
    processors.register(
        MsgType::Command,
        Arc::new(|msg: rce_proto::WireMessage| {
            if let rce_proto::Content::Command { user, .. } = &msg.content {
                log::info!("COMMAND from {} user={user}", msg.origin);
                // A control distributor keyed by user/identifier lives outside this core.
            }
        }),
    );
    processors.register(
        MsgType::Tag,
        Arc::new(|msg: rce_proto::WireMessage| {
            if let rce_proto::Content::Tag { user, tag, tag_type } = &msg.content {
                log::info!("TAG from {} user={user} tag={tag} type={tag_type}", msg.origin);
                // Dispatched to the same control distributor as COMMAND, by user/tag.
            }
        }),
    );

    let router = Arc::new(Router::new(local_comm_id.clone(), content_registry, Arc::new(processors)));

    let messenger = Messenger::new(local_comm_id, router.clone(), manager);
    let _ = messenger_cell.set(messenger);

    let factory = Arc::new(ProtocolFactory::new(options.allowed_types));
    let _ = dial_cell.set((router.clone(), factory.clone()));

    for (comm_id, addr) in options.peers {
        let peer_router = router.clone();
        let peer_factory = factory.clone();
        log::info!("dialing peer {comm_id} at {addr}");
        tokio::spawn(async move {
            if let Err(err) = rce_relay::dial(addr, peer_router, peer_factory).await {
                log::warn!("connection to peer {comm_id} at {addr} ended: {err}");
            }
        });
    }

    rce_relay::serve(options.listen, router, factory).await
}
