//! Shared vocabulary for ROS interfaces: the kinds of interface a container can host,
//! and the kinds of thing a `ROS_REMOVE` message can refer to.

use crate::error::{RceError, Result};
use std::fmt;

/// The three interface shapes a container can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    /// Has both a `to-ROS` (request) and `from-ROS` (response) message class.
    Service,
    /// Has only a `to-ROS` message class; clients publish into it.
    Publisher,
    /// Has only a `from-ROS` message class; clients receive from it.
    Subscriber,
}

impl InterfaceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            InterfaceKind::Service => "service",
            InterfaceKind::Publisher => "publisher",
            InterfaceKind::Subscriber => "subscriber",
        }
    }
}

impl std::str::FromStr for InterfaceKind {
    type Err = RceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "service" => Ok(InterfaceKind::Service),
            "publisher" => Ok(InterfaceKind::Publisher),
            "subscriber" => Ok(InterfaceKind::Subscriber),
            other => Err(RceError::InvalidRequest(format!(
                "\"{other}\" is not a valid interface type"
            ))),
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a `ROS_REMOVE` message is tearing down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalKind {
    /// A single named interface inside a container.
    Interface,
    /// The whole node (e.g. container shutdown).
    Node,
}

impl RemovalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RemovalKind::Interface => "interface",
            RemovalKind::Node => "node",
        }
    }
}

impl std::str::FromStr for RemovalKind {
    type Err = RceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "interface" => Ok(RemovalKind::Interface),
            "node" => Ok(RemovalKind::Node),
            other => Err(RceError::SerializationError(format!(
                "\"{other}\" is not a valid removal kind"
            ))),
        }
    }
}

impl fmt::Display for RemovalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
