//! Interface to the page-bootstrapping collaborator
//!
//! The executor does not know how pages, fonts or images come to exist; a
//! renderer binary supplies a [`PageHost`] that does the actual document work
//! and hands back [`ScriptObject`]s for the executor to adopt.

use crate::error::Result;
use crate::object::ScriptObject;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Renderer-side collaborator that bootstraps pages and loads resources.
///
/// One-shot helper requests (`screenshot`, `loadFont`, `loadImage`) are
/// forwarded here; only their results touch the reference tables.
#[async_trait]
pub trait PageHost: Send + Sync {
    /// Create a fresh page containing a canvas-like element of the given size
    /// and return the element as the root object.
    async fn new_canvas(&self, width: u32, height: u32) -> Result<Arc<dyn ScriptObject>>;

    /// Capture the canvas element as encoded image bytes.
    ///
    /// `options` is the controller's screenshot option object (format,
    /// quality, clip region); unknown fields are the host's to ignore.
    async fn screenshot(&self, canvas: Arc<dyn ScriptObject>, options: &Value) -> Result<Vec<u8>>;

    /// Load a font by name and URL and register it with the document.
    ///
    /// Failures surface as [`crate::Error::ResourceLoad`] with a descriptive
    /// message.
    async fn load_font(&self, name: &str, url: &str) -> Result<()>;

    /// Load an image element from `url`.
    ///
    /// The executor registers the returned object in the requesting root's
    /// reference table. Decode errors and aborts surface as
    /// [`crate::Error::ResourceLoad`].
    async fn load_image(&self, url: &str) -> Result<Arc<dyn ScriptObject>>;
}
