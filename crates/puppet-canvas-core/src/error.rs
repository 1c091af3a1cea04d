// Error types for puppet-canvas-core

use crate::wire::RootId;
use thiserror::Error;

/// Result type alias for puppet-canvas-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur inside the executor or on the transport
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level error (stdio communication)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol-level error (malformed frames, unexpected shapes)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation against a root that was never attached or has been released.
    ///
    /// Surfaced immediately to the caller; never retried. Reference ids minted
    /// under the root die with its table.
    #[error("Unknown root object {0}: never attached or already released")]
    UnknownRoot(RootId),

    /// A SET or APPLY path did not resolve to a live parent object.
    ///
    /// GET on a broken chain is a benign nothing-result, but mutations and
    /// invocations against nothing are reported as hard failures rather than
    /// silently swallowed.
    #[error("Path '{0}' does not resolve to an object on the target")]
    Path(String),

    /// APPLY addressed something that is not an invocable method
    #[error("'{0}' is not callable")]
    NotCallable(String),

    /// The invoked method itself failed inside the renderer
    #[error("Script error: {0}")]
    Script(String),

    /// Font or image loading failed (decode error, abort, missing resource)
    #[error("Resource load error: {0}")]
    ResourceLoad(String),

    /// Request method the executor does not understand
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),
}

impl Error {
    /// Stable error name carried in response payloads so the controller can
    /// map failures back to typed errors.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Error::UnknownRoot(_) => "UnknownRootError",
            Error::Path(_) => "PathError",
            Error::NotCallable(_) => "NotCallableError",
            Error::Script(_) => "ScriptError",
            Error::ResourceLoad(_) => "ResourceLoadError",
            Error::UnsupportedMethod(_) => "UnsupportedMethodError",
            Error::Json(_) => "JsonError",
            Error::Protocol(_) => "ProtocolError",
            Error::Transport(_) | Error::Io(_) => "TransportError",
        }
    }
}
