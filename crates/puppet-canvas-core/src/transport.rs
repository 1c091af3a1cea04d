//! Length-prefixed JSON framing over stdio pipes
//!
//! Both halves speak the same framing: a 4-byte little-endian length prefix
//! followed by a JSON payload. The controller uses [`PipeTransport`] (a send
//! half plus a receive loop that pumps frames into an mpsc channel); the
//! executor reads frames directly with [`read_message`] from its serve loop.

use crate::error::{Error, Result};
use serde_json::Value as JsonValue;
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

const CHUNK_SIZE: usize = 32_768; // 32KB chunks

/// Send a JSON message using length-prefixed framing
pub async fn send_message<W>(stdin: &mut W, message: JsonValue) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let json_bytes = serde_json::to_vec(&message)
        .map_err(|e| Error::Transport(format!("Failed to serialize JSON: {}", e)))?;

    let length = json_bytes.len() as u32;

    stdin
        .write_all(&length.to_le_bytes())
        .await
        .map_err(|e| Error::Transport(format!("Failed to write length: {}", e)))?;

    stdin
        .write_all(&json_bytes)
        .await
        .map_err(|e| Error::Transport(format!("Failed to write message: {}", e)))?;

    stdin
        .flush()
        .await
        .map_err(|e| Error::Transport(format!("Failed to flush: {}", e)))?;

    Ok(())
}

/// Read one framed JSON message; `None` on clean EOF at a frame boundary
pub async fn read_message<R>(stdout: &mut R) -> Result<Option<JsonValue>>
where
    R: AsyncRead + Unpin,
{
    // Read 4-byte little-endian length prefix
    let mut len_buf = [0u8; 4];

    let n = stdout
        .read(&mut len_buf)
        .await
        .map_err(|e| Error::Transport(format!("Failed to read length prefix: {}", e)))?;

    if n == 0 {
        return Ok(None);
    }

    if n < 4 {
        stdout.read_exact(&mut len_buf[n..]).await.map_err(|e| {
            Error::Transport(format!("Failed to finish reading length prefix: {}", e))
        })?;
    }

    let length = u32::from_le_bytes(len_buf) as usize;

    // Read message payload, chunked for large frames
    let message_buf = if length <= CHUNK_SIZE {
        let mut buf = vec![0u8; length];
        stdout
            .read_exact(&mut buf)
            .await
            .map_err(|e| Error::Transport(format!("Failed to read message: {}", e)))?;
        buf
    } else {
        let mut buf = Vec::with_capacity(length);
        let mut remaining = length;

        while remaining > 0 {
            let to_read = std::cmp::min(remaining, CHUNK_SIZE);
            let mut chunk = vec![0u8; to_read];

            stdout
                .read_exact(&mut chunk)
                .await
                .map_err(|e| Error::Transport(format!("Failed to read message chunk: {}", e)))?;

            buf.extend_from_slice(&chunk);
            remaining -= to_read;
        }

        buf
    };

    let message: JsonValue = serde_json::from_slice(&message_buf)
        .map_err(|e| Error::Protocol(format!("Failed to parse JSON: {}", e)))?;

    Ok(Some(message))
}

/// Pipe-based transport for talking to the renderer process
pub struct PipeTransport<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    stdin: W,
    stdout: R,
    message_tx: mpsc::UnboundedSender<JsonValue>,
}

/// Receive-only part of [`PipeTransport`]
pub struct PipeTransportReceiver<R>
where
    R: AsyncRead + Unpin + Send,
{
    stdout: R,
    message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl<W, R> PipeTransport<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    pub fn new(stdin: W, stdout: R) -> (Self, mpsc::UnboundedReceiver<JsonValue>) {
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        let transport = Self {
            stdin,
            stdout,
            message_tx,
        };

        (transport, message_rx)
    }

    /// Split into the send half and the receive loop.
    ///
    /// Keeping them separate prevents deadlock: stdin can be locked for sends
    /// while the receiver runs independently.
    pub fn into_parts(self) -> (W, PipeTransportReceiver<R>) {
        (
            self.stdin,
            PipeTransportReceiver {
                stdout: self.stdout,
                message_tx: self.message_tx,
            },
        )
    }
}

impl<R> PipeTransportReceiver<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Run the message read loop until EOF or the channel closes
    pub async fn run_loop(&mut self) -> Result<()> {
        while let Some(message) = read_message(&mut self.stdout).await? {
            if self.message_tx.send(message).is_err() {
                break;
            }
        }
        Ok(())
    }

    pub fn run(mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
    where
        R: 'static,
    {
        Box::pin(async move { self.run_loop().await })
    }
}
