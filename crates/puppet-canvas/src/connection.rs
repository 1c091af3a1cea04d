//! Request/response correlation layer on top of the pipe transport
//!
//! The controller sends request frames and awaits the matching response:
//!
//! 1. `send_request()` allocates a unique id and a oneshot channel
//! 2. The frame is serialized and written to the renderer's stdin
//! 3. The run loop reads frames from stdout and correlates them by id
//! 4. Wire error payloads are mapped back to typed [`Error`]s
//!
//! Frames without an id are renderer events (console output and the like);
//! they are logged and dropped. The protocol imposes no timeout: a request
//! suspends its caller until the transport yields a response or closes.

use crate::error::{Error, Result};
use puppet_canvas_core::transport::{self, PipeTransport, PipeTransportReceiver};
use puppet_canvas_core::wire::{Message, Request, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::{mpsc, oneshot};

/// Interface the proxy layer needs from a connection.
///
/// Kept as a trait so stand-ins can be exercised against a mock transport in
/// tests without a renderer process.
pub trait ConnectionLike: Send + Sync {
    /// Send a request to the executor and await its result
    fn send_request(
        &self,
        method: &str,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>;
}

/// Connection to the renderer process.
///
/// Thread-safe; share it across tasks with `Arc`. Multiple in-flight requests
/// are supported, correlated by sequential ids. Ordering between requests
/// issued concurrently is not guaranteed; await each result before depending
/// on it.
pub struct Connection<W, R>
where
    W: tokio::io::AsyncWrite + Unpin + Send + Sync + 'static,
    R: tokio::io::AsyncRead + Unpin + Send + Sync + 'static,
{
    /// Sequential request id counter
    last_id: AtomicU32,
    /// Pending request callbacks keyed by request id
    callbacks: Arc<TokioMutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>,
    /// Write half of the transport (mutex-wrapped for concurrent sends)
    stdin: Arc<TokioMutex<W>>,
    /// Receiver for frames pumped in by the transport read loop
    message_rx: Arc<TokioMutex<Option<mpsc::UnboundedReceiver<Value>>>>,
    /// Read loop half of the transport (taken once by `run`)
    transport_receiver: Arc<TokioMutex<Option<PipeTransportReceiver<R>>>>,
}

impl<W, R> Connection<W, R>
where
    W: tokio::io::AsyncWrite + Unpin + Send + Sync + 'static,
    R: tokio::io::AsyncRead + Unpin + Send + Sync + 'static,
{
    pub fn new(transport: PipeTransport<W, R>, message_rx: mpsc::UnboundedReceiver<Value>) -> Self {
        let (stdin, transport_receiver) = transport.into_parts();

        Self {
            last_id: AtomicU32::new(0),
            callbacks: Arc::new(TokioMutex::new(HashMap::new())),
            stdin: Arc::new(TokioMutex::new(stdin)),
            message_rx: Arc::new(TokioMutex::new(Some(message_rx))),
            transport_receiver: Arc::new(TokioMutex::new(Some(transport_receiver))),
        }
    }

    /// Send a request to the executor and await the correlated response.
    ///
    /// Transport failures and wire errors propagate unmodified; nothing is
    /// retried, since APPLY ops are not assumed idempotent.
    pub async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(id, method, "Sending request");

        let (tx, rx) = oneshot::channel();
        self.callbacks.lock().await.insert(id, tx);

        let request = Request {
            id,
            method: method.to_string(),
            params,
        };

        let frame = serde_json::to_value(&request)?;
        if let Err(err) = transport::send_message(&mut *self.stdin.lock().await, frame).await {
            self.callbacks.lock().await.remove(&id);
            return Err(err.into());
        }

        rx.await
            .map_err(|_| Error::ChannelClosed)
            .and_then(|result| result)
    }

    /// Run the dispatch loop until the transport closes.
    ///
    /// Spawn this in a background task. When the loop ends, every pending
    /// request fails with [`Error::ChannelClosed`].
    pub async fn run(self: &Arc<Self>) {
        let transport_receiver = self
            .transport_receiver
            .lock()
            .await
            .take()
            .expect("run() can only be called once - transport receiver already taken");

        // The read loop owns stdout and runs independently of sends
        let transport_handle = tokio::spawn(async move {
            if let Err(err) = transport_receiver.run().await {
                tracing::error!("Transport error: {}", err);
            }
        });

        let mut message_rx = self
            .message_rx
            .lock()
            .await
            .take()
            .expect("run() can only be called once - message receiver already taken");

        while let Some(frame) = message_rx.recv().await {
            match serde_json::from_value::<Message>(frame) {
                Ok(Message::Response(response)) => self.dispatch_response(response).await,
                Ok(Message::Event(event)) => {
                    tracing::debug!(method = %event.method, params = %event.params, "Renderer event");
                }
                Err(err) => {
                    tracing::error!("Failed to parse frame: {}", err);
                }
            }
        }

        tracing::debug!("Message loop ended (transport closed)");

        // Fail anything still waiting rather than leaving it suspended forever
        self.callbacks.lock().await.clear();

        let _ = transport_handle.await;
    }

    async fn dispatch_response(&self, response: Response) {
        let callback = self.callbacks.lock().await.remove(&response.id);

        let Some(callback) = callback else {
            tracing::warn!(id = response.id, "Response for unknown request");
            return;
        };

        let result = if let Some(wrapper) = response.error {
            Err(Error::from_payload(wrapper.error))
        } else {
            Ok(response.result.unwrap_or(Value::Null))
        };

        // Ignore send failure: the requester may have been dropped
        let _ = callback.send(result);
    }
}

impl<W, R> ConnectionLike for Connection<W, R>
where
    W: tokio::io::AsyncWrite + Unpin + Send + Sync + 'static,
    R: tokio::io::AsyncRead + Unpin + Send + Sync + 'static,
{
    fn send_request(
        &self,
        method: &str,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>> {
        let method = method.to_string();
        Box::pin(async move { Connection::send_request(self, &method, params).await })
    }
}
