//! Session state over one renderer connection
//!
//! A [`Session`] tracks which canvas roots are attached through its
//! connection and exposes the lifecycle operations: create, link, release,
//! screenshot, and resource loading. All state lives here; dropping the
//! session (and its connection) abandons every root it held.

use crate::connection::ConnectionLike;
use crate::error::{Error, Result};
use crate::proxy::{RemoteObject, RemoteValue, RootHandle};
use crate::screenshot::ScreenshotOptions;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use parking_lot::Mutex;
use puppet_canvas_core::wire::{
    CreateCanvasParams, LoadFontParams, LoadImageParams, ReleaseParams, RootId, ScreenshotParams,
};
use std::collections::HashSet;
use std::sync::Arc;

/// One controller session: a connection to an executor plus the set of roots
/// attached through it.
pub struct Session {
    connection: Arc<dyn ConnectionLike>,
    roots: Mutex<HashSet<RootId>>,
}

impl Session {
    pub fn new(connection: Arc<dyn ConnectionLike>) -> Self {
        Self {
            connection,
            roots: Mutex::new(HashSet::new()),
        }
    }

    /// Ask the executor to create a fresh canvas and attach it as a root.
    pub async fn create_canvas(&self, width: u32, height: u32) -> Result<RemoteObject> {
        let params = CreateCanvasParams { width, height };
        let result = self
            .connection
            .send_request("createCanvas", serde_json::to_value(&params)?)
            .await?;
        let root = result
            .get("root")
            .and_then(|value| value.as_u64())
            .ok_or_else(|| {
                Error::Protocol(format!("createCanvas returned no root id: {result}"))
            })?;
        tracing::debug!(root, width, height, "Created canvas");
        Ok(self.attach(root))
    }

    /// Attach a root the executor already holds, e.g. one adopted on the
    /// renderer side, and hand back a stand-in for it.
    pub fn link(&self, root: RootId) -> RemoteObject {
        self.attach(root)
    }

    /// Release a canvas root. The executor drops the root object and every
    /// reference its table retained; existing stand-ins for it become stale.
    ///
    /// Releasing a root this session does not hold is a no-op.
    pub async fn release(&self, canvas: &RemoteObject) -> Result<()> {
        let root = canvas.root_id();
        if !self.roots.lock().remove(&root) {
            return Ok(());
        }
        let params = ReleaseParams { root };
        self.connection
            .send_request("releaseCanvas", serde_json::to_value(&params)?)
            .await?;
        tracing::debug!(root, "Released canvas");
        Ok(())
    }

    /// Capture the canvas as encoded image bytes.
    pub async fn screenshot(
        &self,
        canvas: &RemoteObject,
        options: &ScreenshotOptions,
    ) -> Result<Vec<u8>> {
        let root = canvas.root_id();
        self.ensure_attached(root)?;
        let params = ScreenshotParams {
            root,
            options: options.to_json(),
        };
        let result = self
            .connection
            .send_request("screenshot", serde_json::to_value(&params)?)
            .await?;
        let encoded = result
            .get("binary")
            .and_then(|value| value.as_str())
            .ok_or_else(|| Error::Protocol(format!("screenshot returned no binary: {result}")))?;
        BASE64_STANDARD
            .decode(encoded)
            .map_err(|e| Error::Protocol(format!("screenshot payload is not base64: {e}")))
    }

    /// Load a font into the renderer page so subsequent text drawing on any
    /// canvas there can use it.
    pub async fn load_font(&self, name: &str, url: &str, canvas: &RemoteObject) -> Result<()> {
        let root = canvas.root_id();
        self.ensure_attached(root)?;
        let params = LoadFontParams {
            root,
            name: name.to_string(),
            url: url.to_string(),
        };
        self.connection
            .send_request("loadFont", serde_json::to_value(&params)?)
            .await?;
        Ok(())
    }

    /// Load an image in the renderer and hand back a stand-in for it,
    /// suitable as a `drawImage` argument.
    pub async fn load_image(&self, url: &str, canvas: &RemoteObject) -> Result<RemoteObject> {
        let root = canvas.root_id();
        self.ensure_attached(root)?;
        let params = LoadImageParams {
            root,
            url: url.to_string(),
        };
        let result = self
            .connection
            .send_request("loadImage", serde_json::to_value(&params)?)
            .await?;
        match canvas.wrap(result) {
            RemoteValue::Object(image) => Ok(image),
            RemoteValue::Data(other) => Err(Error::Protocol(format!(
                "loadImage returned a non-reference: {other}"
            ))),
        }
    }

    fn attach(&self, root: RootId) -> RemoteObject {
        self.roots.lock().insert(root);
        RemoteObject::root(Arc::new(RootHandle {
            id: root,
            connection: Arc::clone(&self.connection),
        }))
    }

    fn ensure_attached(&self, root: RootId) -> Result<()> {
        if self.roots.lock().contains(&root) {
            Ok(())
        } else {
            Err(Error::UnknownRoot(root.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::future::Future;
    use std::pin::Pin;

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

    fn session() -> (Arc<MockConnection>, Session) {
        let connection = Arc::new(MockConnection::default());
        let session = Session::new(Arc::clone(&connection) as Arc<dyn ConnectionLike>);
        (connection, session)
    }

    #[tokio::test]
    async fn test_create_canvas_attaches_root() {
        let (connection, session) = session();
        connection.respond_with(json!({"root": 7}));

        let canvas = session.create_canvas(400, 300).await.unwrap();
        assert_eq!(canvas.root_id(), 7);

        let requests = connection.requests.lock();
        assert_eq!(requests[0].0, "createCanvas");
        assert_eq!(requests[0].1, json!({"width": 400, "height": 300}));
    }

    #[tokio::test]
    async fn test_release_unknown_root_is_noop() {
        let (connection, session) = session();
        connection.respond_with(json!({"root": 1}));
        let canvas = session.create_canvas(10, 10).await.unwrap();

        session.release(&canvas).await.unwrap();
        // Second release: the root is gone from the session, nothing is sent
        session.release(&canvas).await.unwrap();

        let requests = connection.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].0, "releaseCanvas");
        assert_eq!(requests[1].1, json!({"root": 1}));
    }

    #[tokio::test]
    async fn test_screenshot_decodes_base64() {
        let (connection, session) = session();
        connection.respond_with(json!({"root": 1}));
        connection.respond_with(json!({"binary": BASE64_STANDARD.encode([1u8, 2, 3])}));

        let canvas = session.create_canvas(10, 10).await.unwrap();
        let bytes = session
            .screenshot(&canvas, &ScreenshotOptions::default())
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_screenshot_after_release_fails_locally() {
        let (connection, session) = session();
        connection.respond_with(json!({"root": 1}));
        let canvas = session.create_canvas(10, 10).await.unwrap();
        session.release(&canvas).await.unwrap();

        let sent_before = connection.requests.lock().len();
        let err = session
            .screenshot(&canvas, &ScreenshotOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRoot(_)));
        assert_eq!(connection.requests.lock().len(), sent_before);
    }

    #[tokio::test]
    async fn test_load_image_yields_standin() {
        let (connection, session) = session();
        connection.respond_with(json!({"root": 1}));
        connection.respond_with(json!({"type": "_deferred_", "id": "r2"}));

        let canvas = session.create_canvas(10, 10).await.unwrap();
        let image = session
            .load_image("https://example.com/cat.png", &canvas)
            .await
            .unwrap();
        assert_eq!(image.reference_id(), Some("r2"));

        let requests = connection.requests.lock();
        assert_eq!(requests[1].0, "loadImage");
        assert_eq!(
            requests[1].1,
            json!({"root": 1, "url": "https://example.com/cat.png"})
        );
    }

    #[tokio::test]
    async fn test_load_font_sends_params() {
        let (connection, session) = session();
        connection.respond_with(json!({"root": 1}));
        connection.respond_with(json!(true));

        let canvas = session.create_canvas(10, 10).await.unwrap();
        session
            .load_font("Roboto", "https://example.com/roboto.woff2", &canvas)
            .await
            .unwrap();

        let requests = connection.requests.lock();
        assert_eq!(requests[1].0, "loadFont");
        assert_eq!(
            requests[1].1,
            json!({
                "root": 1,
                "name": "Roboto",
                "url": "https://example.com/roboto.woff2"
            })
        );
    }
}
