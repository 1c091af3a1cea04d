//! puppet-canvas-core: wire protocol and in-renderer executor
//!
//! The internal half of puppet-canvas. It defines the framed JSON wire
//! protocol (GET/SET/APPLY ops, deferred references, request/response
//! correlation frames), the renderer-side [`Executor`] that runs ops against
//! a live object graph, and the per-root reference tables that let objects
//! stay remote while the controller keeps chaining against them.
//!
//! A renderer binary embeds this crate: implement [`PageHost`] for the real
//! page objects, wrap them in [`ScriptObject`], and hand the process stdio to
//! [`Executor::serve`]. The controller-facing API lives in the `puppet-canvas`
//! crate.

pub mod error;
pub mod executor;
pub mod host;
pub mod object;
pub mod refs;
pub mod transport;
pub mod wire;

pub use error::{Error, Result};
pub use executor::Executor;
pub use host::PageHost;
pub use object::{ScriptObject, ScriptValue};
pub use refs::ReferenceTable;
pub use wire::{Op, OpParams, Reference, Request, Response, RootId};
