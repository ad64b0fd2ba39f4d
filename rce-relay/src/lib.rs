//! Stream handlers, the router, the protocol factory, the message processor
//! registry and the tokio transport glue that pumps wire messages through them.
//!
//! This is the `flo-server` analogue in this workspace: where `rce-proto` defines
//! what bytes mean, this crate defines how they flow between connections.

pub mod connection;
pub mod factory;
pub mod handler;
pub mod processor;
pub mod router;

pub use connection::{dial, run_connection, serve, OutboundQueue};
pub use factory::{HandshakeHandler, ProtocolFactory, ProtocolState};
pub use handler::{Consumer, EndReceiver, Forwarder, OutboundHandler, Producer, Receiver, Sender, Sink};
pub use processor::{MessageProcessor, ProcessorRegistry};
pub use router::{decide_route, ConnectionSink, Route, Router};
