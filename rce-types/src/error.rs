//! The error taxonomy shared by every crate in this workspace.
//!
//! These are error *kinds*, not wrappers around foreign error types: each variant
//! names an invariant violation or a caller mistake, and call sites pick the one that
//! matches their failure rather than funnelling everything through a single generic
//! variant. See the propagation policy in the specification for which variants are
//! allowed to cross which boundaries.

use thiserror::Error;

/// The single error type used across `rce-types`, `rce-proto`, `rce-relay` and
/// `rce-bridge`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RceError {
    /// The caller supplied bad input: unknown interface type, ROS address conflict,
    /// mismatched content type, decode failure. Surfaces to the API boundary.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A program invariant was broken: duplicate producer registration, unknown
    /// content identifier at send time, double-unregistering a command class.
    /// Programmer error; the current operation is aborted and the error is logged.
    #[error("internal error: {0}")]
    InternalError(String),

    /// A codec saw malformed data, either while encoding (e.g. a missing dict key)
    /// or decoding (e.g. an unregistered polymorphic identifier).
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Transport-level loss of a connection.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// Signal, not a failure: the connection the caller was operating on is already
    /// gone. Never surfaced to a user; only used to short-circuit cleanup.
    #[error("connection is already dead")]
    DeadConnection,

    /// A configured quota (e.g. max connections, max interfaces) was exceeded.
    #[error("quota exceeded: {0}")]
    MaxNumberExceeded(String),

    /// A termination callback was registered on a connection that had already
    /// finished tearing down.
    #[error("late registration on an already-dead connection")]
    AlreadyDead,
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RceError>;
