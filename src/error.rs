use std::io;

use thiserror::Error;

/// The engine's error taxonomy. Low-level failures are either recovered
/// internally (reconnect, evict a peer) or surfaced through the `error`
/// callback; this type is only returned from operations the user invokes
/// directly (`bind`, `send`, `subscribe`, ...).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("operation not supported by role {role}: {operation}")]
    RoleMismatch { role: &'static str, operation: &'static str },

    #[error("socket setup failed: {0}")]
    SocketSetup(io::Error),

    #[error("reply not received within timeout")]
    ReplyTimeout,

    #[error("no peer available to send to")]
    SendToNoPeers,

    #[error("endpoint was released")]
    Teardown,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
