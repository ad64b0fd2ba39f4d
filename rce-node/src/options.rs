//! The relay node's command-line surface, analogous to the teacher's
//! `ServerOptions`/`ControllerOptions` pair, modernized onto `clap` 4's derive API.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use rce_types::{CommId, MsgType};

/// Parses a `commID=addr` pair used to seed the outbound routing table at startup.
fn parse_peer(s: &str) -> Result<(CommId, SocketAddr), String> {
    let (comm_id, addr) = s
        .split_once('=')
        .ok_or_else(|| format!("expected commID=addr, got {s:?}"))?;
    let addr = addr
        .parse::<SocketAddr>()
        .map_err(|e| format!("invalid peer address {addr:?}: {e}"))?;
    Ok((CommId::new(comm_id), addr))
}

/// Parses a wire-level message type token, e.g. `ROS_MSG`, for `--allow`.
fn parse_msg_type(s: &str) -> Result<MsgType, String> {
    MsgType::try_from(s).map_err(|e| e.to_string())
}

/// The set of message types an authenticated connection may carry, absent an
/// explicit `--allow`. Everything this core knows how to route.
fn default_allowed() -> Vec<MsgType> {
    MsgType::ALL.to_vec()
}

/// Startup configuration for one relay node: its own overlay address, where it
/// listens, which peers to dial immediately, and which message types an
/// authenticated connection may carry.
#[derive(Parser, Debug)]
#[command(name = "rce-node", about = "RCE messaging and routing core relay node")]
pub struct NodeOptions {
    /// This node's own communication ID on the overlay.
    #[arg(long)]
    pub comm_id: String,

    /// Address to accept incoming relay connections on.
    #[arg(long, default_value = "0.0.0.0:10000")]
    pub listen: SocketAddr,

    /// A peer to dial at startup, given as `commID=host:port`. Repeatable.
    #[arg(long = "peer", value_parser = parse_peer)]
    pub peers: Vec<(CommId, SocketAddr)>,

    /// Path to the log4rs YAML configuration file.
    #[arg(long, default_value = "log4rs.yaml")]
    pub log_config: PathBuf,

    /// Message types an authenticated connection may carry. Repeatable; defaults
    /// to every type this core knows how to route.
    #[arg(long = "allow", value_parser = parse_msg_type, default_values_t = default_allowed())]
    pub allowed_types: Vec<MsgType>,
}
