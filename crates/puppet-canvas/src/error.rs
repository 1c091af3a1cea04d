// Error types for puppet-canvas

use puppet_canvas_core::wire::ErrorPayload;
use thiserror::Error;

/// Result type alias for puppet-canvas operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when driving a remote canvas
#[derive(Debug, Error)]
pub enum Error {
    /// Renderer executable was not found
    ///
    /// Set the `PUPPET_CANVAS_RENDERER` environment variable or put
    /// `puppet-canvas-renderer` on PATH.
    #[error(
        "Renderer executable not found. Set PUPPET_CANVAS_RENDERER or install puppet-canvas-renderer"
    )]
    RendererNotFound,

    /// Failed to launch the renderer process
    #[error("Failed to launch renderer: {0}")]
    LaunchFailed(String),

    /// Transport-level error (stdio communication)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Protocol-level error (malformed or unexpected frames)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection closed before a response arrived
    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation against a root that was never attached or already released
    #[error("Unknown root: {0}")]
    UnknownRoot(String),

    /// SET or APPLY path did not resolve to a live parent in the renderer
    #[error("Path error: {0}")]
    Path(String),

    /// APPLY addressed something that is not callable
    #[error("Not callable: {0}")]
    NotCallable(String),

    /// The invoked method failed inside the renderer
    #[error("Script error: {0}")]
    Script(String),

    /// Font or image loading failed (decode error, abort, missing resource)
    #[error("Resource load error: {0}")]
    ResourceLoad(String),

    /// Invalid argument provided to a call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Map a wire error payload back to a typed error by its stable name.
    pub(crate) fn from_payload(payload: ErrorPayload) -> Self {
        match payload.name.as_deref() {
            Some("UnknownRootError") => Error::UnknownRoot(payload.message),
            Some("PathError") => Error::Path(payload.message),
            Some("NotCallableError") => Error::NotCallable(payload.message),
            Some("ScriptError") => Error::Script(payload.message),
            Some("ResourceLoadError") => Error::ResourceLoad(payload.message),
            Some("TransportError") => Error::Transport(payload.message),
            _ => Error::Protocol(payload.message),
        }
    }
}

impl From<puppet_canvas_core::Error> for Error {
    fn from(err: puppet_canvas_core::Error) -> Self {
        use puppet_canvas_core::Error as Core;
        match err {
            Core::Transport(msg) => Error::Transport(msg),
            Core::Protocol(msg) => Error::Protocol(msg),
            Core::Io(err) => Error::Io(err),
            Core::Json(err) => Error::Json(err),
            other => Error::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: Option<&str>, message: &str) -> ErrorPayload {
        ErrorPayload {
            message: message.to_string(),
            name: name.map(|n| n.to_string()),
        }
    }

    #[test]
    fn test_payload_name_mapping() {
        assert!(matches!(
            Error::from_payload(payload(Some("UnknownRootError"), "gone")),
            Error::UnknownRoot(_)
        ));
        assert!(matches!(
            Error::from_payload(payload(Some("PathError"), "missing.prop")),
            Error::Path(_)
        ));
        assert!(matches!(
            Error::from_payload(payload(Some("ScriptError"), "boom")),
            Error::Script(_)
        ));
        assert!(matches!(
            Error::from_payload(payload(Some("ResourceLoadError"), "decode")),
            Error::ResourceLoad(_)
        ));
        assert!(matches!(
            Error::from_payload(payload(None, "generic")),
            Error::Protocol(_)
        ));
    }
}
