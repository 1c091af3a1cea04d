//! puppet-canvas: drive an HTML canvas inside a headless renderer as if it
//! were a local object
//!
//! The renderer process hosts real canvas elements; this crate hands out
//! transparent stand-ins for them. Property access on a stand-in is recorded
//! as a path and resolved on demand; method calls and assignments cross the
//! stdio transport immediately. Objects that cannot leave the renderer (a 2d
//! context, a gradient, a loaded image) come back as new stand-ins and can be
//! chained or passed as arguments to further calls.
//!
//! # Examples
//!
//! ```ignore
//! use puppet_canvas::{ScreenshotOptions, create_canvas, close, screenshot_canvas};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let canvas = create_canvas(400, 300).await?;
//!
//!     let ctx = canvas
//!         .invoke("getContext", vec!["2d".into()])
//!         .await?
//!         .into_object()
//!         .unwrap();
//!     ctx.set("fillStyle", "#fa0").await?;
//!     ctx.invoke(
//!         "fillRect",
//!         vec![10.into(), 10.into(), 100.into(), 50.into()],
//!     )
//!     .await?;
//!
//!     let png = screenshot_canvas(&canvas, &ScreenshotOptions::default()).await?;
//!     std::fs::write("out.png", png)?;
//!
//!     close().await?;
//!     Ok(())
//! }
//! ```
//!
//! The crate-level functions share one lazily launched renderer per process.
//! For explicit lifecycle control (or several renderers side by side), use
//! [`Renderer::launch`] and its [`Session`] directly.

pub mod connection;
mod error;
pub mod proxy;
mod renderer;
mod screenshot;
mod session;

pub use error::{Error, Result};
pub use proxy::{Arg, RemoteObject, RemoteValue};
pub use puppet_canvas_core::wire::RootId;
pub use renderer::{DEFAULT_RENDERER, RENDERER_ENV, Renderer};
pub use screenshot::{ScreenshotClip, ScreenshotFormat, ScreenshotOptions};
pub use session::Session;

use std::sync::Arc;

/// Create a canvas of the given size in the shared renderer, launching the
/// renderer first if none is running.
pub async fn create_canvas(width: u32, height: u32) -> Result<RemoteObject> {
    let renderer = renderer::shared().await?;
    renderer.session().create_canvas(width, height).await
}

/// Attach a root the shared renderer's executor already holds and hand back
/// a stand-in for it. Launches the renderer if none is running.
pub async fn link_canvas(root: RootId) -> Result<RemoteObject> {
    let renderer = renderer::shared().await?;
    Ok(renderer.session().link(root))
}

/// Capture a canvas as encoded image bytes.
pub async fn screenshot_canvas(
    canvas: &RemoteObject,
    options: &ScreenshotOptions,
) -> Result<Vec<u8>> {
    let renderer = running_renderer(canvas).await?;
    renderer.session().screenshot(canvas, options).await
}

/// Release a canvas root, dropping it and everything its reference table
/// retained on the renderer side.
///
/// A no-op when no shared renderer is running.
pub async fn release_canvas(canvas: &RemoteObject) -> Result<()> {
    match renderer::current().await {
        Some(renderer) => renderer.session().release(canvas).await,
        None => Ok(()),
    }
}

/// Load a font into the shared renderer's page.
pub async fn load_font(name: &str, url: &str, canvas: &RemoteObject) -> Result<()> {
    let renderer = running_renderer(canvas).await?;
    renderer.session().load_font(name, url, canvas).await
}

/// Load an image in the shared renderer and hand back a stand-in for it.
pub async fn load_image(url: &str, canvas: &RemoteObject) -> Result<RemoteObject> {
    let renderer = running_renderer(canvas).await?;
    renderer.session().load_image(url, canvas).await
}

/// Shut down the shared renderer. No-op when none is running. The next
/// [`create_canvas`] launches a fresh one.
pub async fn close() -> Result<()> {
    renderer::close_shared().await
}

/// Operations on an existing stand-in never launch a renderer; without one
/// running, the stand-in's root cannot be live.
async fn running_renderer(canvas: &RemoteObject) -> Result<Arc<Renderer>> {
    renderer::current()
        .await
        .ok_or_else(|| Error::UnknownRoot(canvas.root_id().to_string()))
}
