// Renderer process management
//
// Launches the headless renderer executable and wires its stdio pipes into a
// connection/session pair. Also hosts the process-wide shared renderer used
// by the crate-level convenience functions.

use crate::connection::{Connection, ConnectionLike};
use crate::error::{Error, Result};
use crate::session::Session;
use puppet_canvas_core::transport::PipeTransport;
use std::sync::Arc;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

/// Environment variable naming the renderer executable to launch.
pub const RENDERER_ENV: &str = "PUPPET_CANVAS_RENDERER";

/// Executable looked up on PATH when [`RENDERER_ENV`] is unset.
pub const DEFAULT_RENDERER: &str = "puppet-canvas-renderer";

/// A launched renderer process and the session speaking to it over stdio.
pub struct Renderer {
    session: Session,
    process: Mutex<Option<Child>>,
}

impl Renderer {
    /// Launch the renderer executable and establish a session with it.
    ///
    /// The executable is taken from `PUPPET_CANVAS_RENDERER`, falling back to
    /// `puppet-canvas-renderer` on PATH. Frames travel over the child's
    /// stdin/stdout; its stderr is inherited so renderer diagnostics reach
    /// the terminal.
    pub async fn launch() -> Result<Arc<Self>> {
        let executable =
            std::env::var(RENDERER_ENV).unwrap_or_else(|_| DEFAULT_RENDERER.to_string());

        let mut child = Command::new(&executable)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::RendererNotFound
                } else {
                    Error::LaunchFailed(format!("Failed to spawn {executable}: {e}"))
                }
            })?;

        // Give it a moment to potentially fail
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        match child.try_wait() {
            Ok(Some(status)) => {
                return Err(Error::LaunchFailed(format!(
                    "Renderer exited immediately with status: {status}"
                )));
            }
            Ok(None) => {}
            Err(e) => {
                return Err(Error::LaunchFailed(format!(
                    "Failed to check renderer status: {e}"
                )));
            }
        }

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::LaunchFailed("Renderer stdin not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::LaunchFailed("Renderer stdout not piped".to_string()))?;

        let connection = Self::connect(stdin, stdout);
        tracing::info!(executable, "Renderer launched");

        Ok(Arc::new(Self {
            session: Session::new(connection),
            process: Mutex::new(Some(child)),
        }))
    }

    /// Wire a stdio pair into a running connection.
    fn connect(stdin: ChildStdin, stdout: ChildStdout) -> Arc<dyn ConnectionLike> {
        let (transport, message_rx) = PipeTransport::new(stdin, stdout);
        let connection = Arc::new(Connection::new(transport, message_rx));

        let dispatch = Arc::clone(&connection);
        tokio::spawn(async move {
            dispatch.run().await;
        });

        connection
    }

    /// The session attached to this renderer.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Terminate the renderer process. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(mut child) = self.process.lock().await.take() else {
            return Ok(());
        };

        child
            .kill()
            .await
            .map_err(|e| Error::LaunchFailed(format!("Failed to kill renderer: {e}")))?;
        let _ = child.wait().await;

        tracing::info!("Renderer shut down");
        Ok(())
    }
}

/// The lazily launched renderer behind the crate-level functions. One
/// renderer per process; [`shared`] launches it on first use and [`close`]
/// tears it down.
static SHARED: Mutex<Option<Arc<Renderer>>> = Mutex::const_new(None);

/// The shared renderer, launching it if none is running.
pub(crate) async fn shared() -> Result<Arc<Renderer>> {
    let mut slot = SHARED.lock().await;
    if let Some(renderer) = slot.as_ref() {
        return Ok(Arc::clone(renderer));
    }
    let renderer = Renderer::launch().await?;
    *slot = Some(Arc::clone(&renderer));
    Ok(renderer)
}

/// The shared renderer if one is running, without launching.
pub(crate) async fn current() -> Option<Arc<Renderer>> {
    SHARED.lock().await.as_ref().map(Arc::clone)
}

/// Shut down the shared renderer. No-op when none is running.
pub(crate) async fn close_shared() -> Result<()> {
    let taken = SHARED.lock().await.take();
    match taken {
        Some(renderer) => renderer.shutdown().await,
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_launch_without_renderer_reports_not_found() {
        // Point at an executable that cannot exist so the failure mode is
        // deterministic regardless of what is installed.
        unsafe {
            std::env::set_var(RENDERER_ENV, "/nonexistent/puppet-canvas-renderer");
        }
        let result = Renderer::launch().await;
        unsafe {
            std::env::remove_var(RENDERER_ENV);
        }

        match result {
            Err(Error::RendererNotFound) => {}
            Err(Error::LaunchFailed(msg)) => {
                panic!("expected RendererNotFound, got LaunchFailed: {msg}")
            }
            Err(e) => panic!("unexpected error: {e:?}"),
            Ok(renderer) => {
                // Shouldn't happen, but clean up rather than leak a process
                let _ = renderer.shutdown().await;
                panic!("launch of a nonexistent executable succeeded");
            }
        }
    }

    #[tokio::test]
    async fn test_close_shared_without_renderer_is_noop() {
        assert!(current().await.is_none() || close_shared().await.is_ok());
        close_shared().await.unwrap();
        close_shared().await.unwrap();
    }
}
