//! Remote executor: runs GET/SET/APPLY ops against the live object graph
//!
//! This is the half that lives inside the renderer process. It owns one
//! reference table per adopted root, dereferences incoming [`Reference`]
//! markers, walks property paths, dispatches the three op kinds, and decides
//! whether a result crosses the boundary as plain data or stays resident and
//! travels back as a fresh reference.
//!
//! A renderer binary embeds this as:
//!
//! ```ignore
//! let executor = Arc::new(Executor::new(host));
//! executor.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
//! ```

use crate::error::{Error, Result};
use crate::host::PageHost;
use crate::object::{ScriptObject, ScriptValue};
use crate::refs::ReferenceTable;
use crate::transport;
use crate::wire::{
    CreateCanvasParams, ErrorPayload, ErrorWrapper, LoadFontParams, LoadImageParams, Op, OpParams,
    Reference, ReleaseParams, Request, Response, RootId, ScreenshotParams,
};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

struct RootEntry {
    object: Arc<dyn ScriptObject>,
    refs: ReferenceTable,
}

#[derive(Default)]
struct ExecutorState {
    next_root: RootId,
    roots: HashMap<RootId, RootEntry>,
}

/// Executes protocol requests against adopted root objects.
///
/// State is isolated per root: each root gets its own reference table when it
/// is adopted and loses it, atomically and completely, on release. The serve
/// loop processes one frame at a time; concurrently issued ops on the
/// controller side are executed in arrival order, which is deliberately
/// unspecified for callers that do not await sequentially.
pub struct Executor {
    host: Arc<dyn PageHost>,
    state: Mutex<ExecutorState>,
}

impl Executor {
    pub fn new(host: Arc<dyn PageHost>) -> Self {
        Self {
            host,
            state: Mutex::new(ExecutorState::default()),
        }
    }

    /// Adopt an already-existing object as a root, creating its reference
    /// table. Returns the root id the controller addresses it by.
    ///
    /// This is the executor half of attaching: `createCanvas` calls it with a
    /// freshly bootstrapped page element, and embedders call it directly for
    /// objects obtained some other way.
    pub fn adopt_root(&self, object: Arc<dyn ScriptObject>) -> RootId {
        let mut state = self.state.lock();
        state.next_root += 1;
        let root = state.next_root;
        state.roots.insert(
            root,
            RootEntry {
                object,
                refs: ReferenceTable::new(),
            },
        );
        tracing::debug!(root, "Adopted root object");
        root
    }

    /// Remove a root and its entire reference table. Returns whether the root
    /// existed. There is no per-reference release.
    pub fn release_root(&self, root: RootId) -> bool {
        let removed = self.state.lock().roots.remove(&root).is_some();
        tracing::debug!(root, removed, "Released root");
        removed
    }

    /// Execute one GET/SET/APPLY op.
    pub fn execute_op(&self, params: &OpParams) -> Result<Value> {
        let mut state = self.state.lock();
        let entry = state
            .roots
            .get_mut(&params.root)
            .ok_or(Error::UnknownRoot(params.root))?;

        // Resolve the dispatcher's backing handle: the root object itself, or
        // a previously exported reference.
        let start: Arc<dyn ScriptObject> = match &params.target {
            Some(id) => match entry.refs.resolve(id) {
                Some(object) => object,
                None => {
                    // Stale handle. Reads dissolve to nothing, mutations and
                    // invocations are hard failures.
                    return match &params.op {
                        Op::Get { .. } => Ok(Value::Null),
                        _ => Err(Error::Path(params.op.path().join("."))),
                    };
                }
            },
            None => Arc::clone(&entry.object),
        };

        tracing::debug!(root = params.root, op = ?params.op, "Executing op");

        let result = match &params.op {
            Op::Get { path } => walk(start, path),
            Op::Set { path, value } => {
                let (prop, parent_path) = path
                    .split_last()
                    .ok_or_else(|| Error::Protocol("SET requires a non-empty path".to_string()))?;
                let parent = resolve_parent(start, parent_path)?;
                parent.set(prop, deref(&entry.refs, value))?;
                // Success marker, not the assigned value
                return Ok(Value::Bool(true));
            }
            Op::Apply { path, args } => {
                let (method, parent_path) = path
                    .split_last()
                    .ok_or_else(|| Error::NotCallable("<root>".to_string()))?;
                let parent = resolve_parent(start, parent_path)?;
                let args: Vec<ScriptValue> =
                    args.iter().map(|arg| deref(&entry.refs, arg)).collect();
                Some(parent.call(method, args)?)
            }
        };

        // Result classification: only JSON-safe data crosses the boundary;
        // objects stay resident and go back as references.
        Ok(match result {
            None => Value::Null,
            Some(ScriptValue::Data(value)) => value,
            Some(ScriptValue::Object(object)) => entry.refs.export(object).to_value(),
        })
    }

    /// Handle one request frame, turning errors into wire error payloads.
    pub async fn handle(&self, request: Request) -> Response {
        match self.dispatch(&request.method, request.params).await {
            Ok(value) => Response {
                id: request.id,
                result: Some(value),
                error: None,
            },
            Err(err) => {
                tracing::debug!(id = request.id, method = %request.method, %err, "Request failed");
                Response {
                    id: request.id,
                    result: None,
                    error: Some(ErrorWrapper {
                        error: ErrorPayload {
                            message: err.to_string(),
                            name: Some(err.wire_name().to_string()),
                        },
                    }),
                }
            }
        }
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "createCanvas" => {
                let params: CreateCanvasParams = serde_json::from_value(params)?;
                let object = self.host.new_canvas(params.width, params.height).await?;
                let root = self.adopt_root(object);
                Ok(json!({ "root": root }))
            }
            "op" => {
                let params: OpParams = serde_json::from_value(params)?;
                self.execute_op(&params)
            }
            "releaseCanvas" => {
                let params: ReleaseParams = serde_json::from_value(params)?;
                Ok(Value::Bool(self.release_root(params.root)))
            }
            "screenshot" => {
                let params: ScreenshotParams = serde_json::from_value(params)?;
                let canvas = self.root_object(params.root)?;
                let bytes = self.host.screenshot(canvas, &params.options).await?;
                Ok(json!({ "binary": BASE64_STANDARD.encode(bytes) }))
            }
            "loadFont" => {
                let params: LoadFontParams = serde_json::from_value(params)?;
                self.root_object(params.root)?;
                self.host.load_font(&params.name, &params.url).await?;
                Ok(Value::Bool(true))
            }
            "loadImage" => {
                let params: LoadImageParams = serde_json::from_value(params)?;
                self.root_object(params.root)?;
                let image = self.host.load_image(&params.url).await?;
                // The root may have been released while the host was loading
                let mut state = self.state.lock();
                let entry = state
                    .roots
                    .get_mut(&params.root)
                    .ok_or(Error::UnknownRoot(params.root))?;
                Ok(entry.refs.export(image).to_value())
            }
            other => Err(Error::UnsupportedMethod(other.to_string())),
        }
    }

    fn root_object(&self, root: RootId) -> Result<Arc<dyn ScriptObject>> {
        self.state
            .lock()
            .roots
            .get(&root)
            .map(|entry| Arc::clone(&entry.object))
            .ok_or(Error::UnknownRoot(root))
    }

    /// Serve requests over a framed transport until EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        while let Some(frame) = transport::read_message(&mut reader).await? {
            let request: Request = match serde_json::from_value(frame) {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!("Discarding unparseable request frame: {}", err);
                    continue;
                }
            };

            let response = self.handle(request).await;
            transport::send_message(&mut writer, serde_json::to_value(&response)?).await?;
        }

        tracing::debug!("Executor transport closed");
        Ok(())
    }
}

/// Walk `path` from `start`, short-circuiting to nothing the moment an
/// intermediate step is missing or is plain data.
fn walk(start: Arc<dyn ScriptObject>, path: &[String]) -> Option<ScriptValue> {
    let mut current = ScriptValue::Object(start);
    for segment in path {
        let object = Arc::clone(current.as_object()?);
        current = object.get(segment)?;
    }
    Some(current)
}

/// Resolve the parent of a SET/APPLY target. An unresolved parent is a hard
/// failure, not a silent no-op.
fn resolve_parent(start: Arc<dyn ScriptObject>, parent_path: &[String]) -> Result<Arc<dyn ScriptObject>> {
    match walk(start, parent_path) {
        Some(ScriptValue::Object(object)) => Ok(object),
        _ => Err(Error::Path(parent_path.join("."))),
    }
}

/// Dereference an incoming value or argument: reference markers resolve
/// through the table (absent ids become nothing), everything else is data.
fn deref(refs: &ReferenceTable, value: &Value) -> ScriptValue {
    match Reference::from_value(value) {
        Some(reference) => refs
            .resolve(&reference.id)
            .map(ScriptValue::Object)
            .unwrap_or_else(ScriptValue::null),
        None => ScriptValue::Data(value.clone()),
    }
}
