//! Local stand-ins for remote objects
//!
//! A [`RemoteObject`] is a transparent local representative of something that
//! lives inside the renderer: the canvas root, or a derived object a call
//! handed back. Property access is recorded lazily as a path; nothing crosses
//! the transport until a terminal operation fires:
//!
//! - [`RemoteObject::resolve`] issues a GET for the accumulated path
//! - [`RemoteObject::set`] issues a SET immediately
//! - [`RemoteObject::call`] issues an APPLY immediately
//!
//! ```ignore
//! let canvas = session.create_canvas(400, 300).await?;
//! let ctx = canvas
//!     .invoke("getContext", vec!["2d".into()])
//!     .await?
//!     .into_object()
//!     .unwrap();
//! ctx.set("fillStyle", "#fa0").await?;
//! ctx.invoke("fillRect", vec![10.into(), 10.into(), 100.into(), 50.into()]).await?;
//! let width = canvas.get("width").resolve().await?;
//! ```
//!
//! When an APPLY or GET produces a composite object, the executor retains it
//! and answers with a reference marker; the dispatcher wraps that marker in a
//! new `RemoteObject` bound directly to the reference id, so further chaining
//! addresses the actual returned object and never replays a path from the
//! root.

use crate::connection::ConnectionLike;
use crate::error::{Error, Result};
use puppet_canvas_core::wire::{Op, OpParams, Reference, RootId};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Controller-side handle for one attached root: which root id to address and
/// which connection carries its session.
pub(crate) struct RootHandle {
    pub(crate) id: RootId,
    pub(crate) connection: Arc<dyn ConnectionLike>,
}

/// A value coming back from the renderer: plain data, or a stand-in for an
/// object that stayed remote.
#[derive(Debug, Clone)]
pub enum RemoteValue {
    Data(Value),
    Object(RemoteObject),
}

impl RemoteValue {
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            RemoteValue::Data(value) => Some(value),
            RemoteValue::Object(_) => None,
        }
    }

    pub fn into_object(self) -> Option<RemoteObject> {
        match self {
            RemoteValue::Object(object) => Some(object),
            RemoteValue::Data(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_data()?.as_f64()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data()?.as_str()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data()?.as_bool()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RemoteValue::Data(Value::Null))
    }
}

/// Argument to a remote SET or APPLY: plain JSON data, or a previously
/// obtained stand-in passed by reference.
#[derive(Debug, Clone)]
pub enum Arg {
    Data(Value),
    Object(RemoteObject),
}

macro_rules! arg_from_data {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Data(Value::from(value))
                }
            }
        )*
    };
}

arg_from_data!(bool, i32, i64, u32, u64, f64, &str, String, Value);

impl From<RemoteObject> for Arg {
    fn from(object: RemoteObject) -> Self {
        Arg::Object(object)
    }
}

impl From<&RemoteObject> for Arg {
    fn from(object: &RemoteObject) -> Self {
        Arg::Object(object.clone())
    }
}

/// Transparent stand-in for a remote object.
///
/// Cloning is cheap; a stand-in is just a root handle, an optional backing
/// reference id, and the property path accumulated so far. It owns no remote
/// resource — the object it denotes is owned by its root's reference table
/// until the root is released.
#[derive(Clone)]
pub struct RemoteObject {
    root: Arc<RootHandle>,
    /// Reference id this stand-in is bound to, if it was created by
    /// dereferencing an executor handle. `None` means the root object.
    target: Option<Arc<str>>,
    path: Vec<String>,
}

impl RemoteObject {
    pub(crate) fn root(root: Arc<RootHandle>) -> Self {
        Self {
            root,
            target: None,
            path: Vec::new(),
        }
    }

    fn derived(root: Arc<RootHandle>, id: Arc<str>) -> Self {
        Self {
            root,
            target: Some(id),
            path: Vec::new(),
        }
    }

    /// Record a property access. Lazy: no transport activity until a terminal
    /// operation fires.
    pub fn get(&self, prop: &str) -> RemoteObject {
        let mut path = self.path.clone();
        path.push(prop.to_string());
        Self {
            root: Arc::clone(&self.root),
            target: self.target.clone(),
            path,
        }
    }

    /// The backing reference id, for stand-ins created by dereferencing an
    /// executor handle. This is what lets a stand-in be passed as an argument
    /// to calls on other chains.
    pub fn reference_id(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Root id this stand-in is anchored to.
    pub fn root_id(&self) -> RootId {
        self.root.id
    }

    /// Resolve the accumulated path with a GET.
    ///
    /// An empty path resolves to the stand-in itself without touching the
    /// transport, so a root (or freshly dereferenced object) behaves as
    /// already-present.
    pub async fn resolve(&self) -> Result<RemoteValue> {
        if self.path.is_empty() {
            return Ok(RemoteValue::Object(self.clone()));
        }
        self.dispatch(Op::Get {
            path: self.path.clone(),
        })
        .await
    }

    /// Assign `value` to property `prop` at the current path. Issued
    /// immediately.
    pub async fn set(&self, prop: &str, value: impl Into<Arg>) -> Result<()> {
        let mut path = self.path.clone();
        path.push(prop.to_string());
        self.dispatch(Op::Set {
            path,
            value: encode_arg(value.into())?,
        })
        .await?;
        Ok(())
    }

    /// Invoke the callable at the current path. Issued immediately.
    ///
    /// Stand-in arguments are sent as references and arrive in the renderer
    /// as the same live objects they denote.
    pub async fn call(&self, args: Vec<Arg>) -> Result<RemoteValue> {
        let args = args
            .into_iter()
            .map(encode_arg)
            .collect::<Result<Vec<_>>>()?;
        self.dispatch(Op::Apply {
            path: self.path.clone(),
            args,
        })
        .await
    }

    /// Convenience for `get(method).call(args)`.
    pub async fn invoke(&self, method: &str, args: Vec<Arg>) -> Result<RemoteValue> {
        self.get(method).call(args).await
    }

    async fn dispatch(&self, op: Op) -> Result<RemoteValue> {
        let params = OpParams {
            root: self.root.id,
            target: self.target.as_ref().map(|id| id.to_string()),
            op,
        };
        let result = self
            .root
            .connection
            .send_request("op", serde_json::to_value(&params)?)
            .await?;
        Ok(self.wrap(result))
    }

    /// Turn an executor result into a caller-facing value: reference markers
    /// become new stand-ins bound to the referenced object.
    pub(crate) fn wrap(&self, result: Value) -> RemoteValue {
        match Reference::from_value(&result) {
            Some(reference) => RemoteValue::Object(RemoteObject::derived(
                Arc::clone(&self.root),
                Arc::from(reference.id.as_str()),
            )),
            None => RemoteValue::Data(result),
        }
    }
}

impl fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteObject")
            .field("root", &self.root.id)
            .field("target", &self.target)
            .field("path", &self.path)
            .finish()
    }
}

/// Substitute stand-in arguments with their reference markers.
fn encode_arg(arg: Arg) -> Result<Value> {
    match arg {
        Arg::Data(value) => Ok(value),
        Arg::Object(object) => match object.reference_id() {
            Some(id) => Ok(Reference::new(id).to_value()),
            None => Err(Error::InvalidArgument(
                "only stand-ins backed by a reference id can be passed as arguments".to_string(),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;

    /// Scripted connection: records every request and answers from a queue.
    #[derive(Default)]
    struct MockConnection {
        requests: Mutex<Vec<(String, Value)>>,
        responses: Mutex<Vec<Result<Value>>>,
    }

    impl MockConnection {
        fn respond_with(&self, value: Value) {
            self.responses.lock().push(Ok(value));
        }
    }

    impl ConnectionLike for MockConnection {
        fn send_request(
            &self,
            method: &str,
            params: Value,
        ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>> {
            self.requests.lock().push((method.to_string(), params));
            let response = {
                let mut responses = self.responses.lock();
                if responses.is_empty() {
                    Ok(Value::Null)
                } else {
                    responses.remove(0)
                }
            };
            Box::pin(async move { response })
        }
    }

    fn root_standin() -> (Arc<MockConnection>, RemoteObject) {
        let connection = Arc::new(MockConnection::default());
        let handle = Arc::new(RootHandle {
            id: 1,
            connection: Arc::clone(&connection) as Arc<dyn ConnectionLike>,
        });
        (connection, RemoteObject::root(handle))
    }

    #[tokio::test]
    async fn test_path_building_is_lazy() {
        let (connection, canvas) = root_standin();

        let chain = canvas.get("style").get("border").get("width");
        assert!(connection.requests.lock().is_empty());
        assert_eq!(chain.path, vec!["style", "border", "width"]);

        // The intermediate stand-ins are untouched
        assert_eq!(canvas.path, Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_empty_path_resolves_to_self_without_io() {
        let (connection, canvas) = root_standin();

        let resolved = canvas.resolve().await.unwrap();
        assert!(connection.requests.lock().is_empty());
        let object = resolved.into_object().expect("resolves to itself");
        assert_eq!(object.root_id(), 1);
    }

    #[tokio::test]
    async fn test_resolve_issues_get() {
        let (connection, canvas) = root_standin();
        connection.respond_with(json!(300));

        let value = canvas.get("width").resolve().await.unwrap();
        assert_eq!(value.as_f64(), Some(300.0));

        let requests = connection.requests.lock();
        let (method, params) = &requests[0];
        assert_eq!(method, "op");
        assert_eq!(params["root"], 1);
        assert!(params.get("target").is_none());
        assert_eq!(params["op"], json!({"type": "GET", "path": ["width"]}));
    }

    #[tokio::test]
    async fn test_set_is_immediate_and_appends_prop() {
        let (connection, canvas) = root_standin();
        connection.respond_with(json!(true));

        canvas.get("style").set("border", "1px").await.unwrap();

        let requests = connection.requests.lock();
        let (_, params) = &requests[0];
        assert_eq!(
            params["op"],
            json!({"type": "SET", "path": ["style", "border"], "value": "1px"})
        );
    }

    #[tokio::test]
    async fn test_call_substitutes_reference_args() {
        let (connection, canvas) = root_standin();
        // First call returns a deferred marker, minting a derived stand-in
        connection.respond_with(json!({"type": "_deferred_", "id": "r1"}));
        connection.respond_with(json!(null));

        let image = canvas
            .invoke("makeImage", vec![])
            .await
            .unwrap()
            .into_object()
            .expect("object result");
        assert_eq!(image.reference_id(), Some("r1"));

        canvas
            .invoke("drawImage", vec![(&image).into(), 0.into(), 0.into()])
            .await
            .unwrap();

        let requests = connection.requests.lock();
        let (_, params) = &requests[1];
        assert_eq!(
            params["op"]["args"],
            json!([{"type": "_deferred_", "id": "r1"}, 0, 0])
        );
    }

    #[tokio::test]
    async fn test_derived_standin_targets_reference() {
        let (connection, canvas) = root_standin();
        connection.respond_with(json!({"type": "_deferred_", "id": "r4"}));
        connection.respond_with(json!("#fa0"));

        let ctx = canvas
            .invoke("getContext", vec!["2d".into()])
            .await
            .unwrap()
            .into_object()
            .unwrap();

        let _ = ctx.get("fillStyle").resolve().await.unwrap();

        let requests = connection.requests.lock();
        let (_, params) = &requests[1];
        // Chaining talks to the referenced object, not a path from the root
        assert_eq!(params["target"], "r4");
        assert_eq!(params["op"]["path"], json!(["fillStyle"]));
    }

    #[tokio::test]
    async fn test_root_as_argument_is_rejected() {
        let (connection, canvas) = root_standin();

        let err = canvas
            .invoke("drawImage", vec![(&canvas).into()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        // Rejected before anything was sent
        assert!(connection.requests.lock().is_empty());
    }
}
