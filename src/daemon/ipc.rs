//! IPC server for the live timer daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer commands
//! - Surface button presses routed through the action bus

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};

use crate::messaging::ActionSender;
use crate::presentation::Control;
use crate::surface::SurfaceKind;
use crate::types::{IpcRequest, IpcResponse, ResponseData, StartParams, TimerState};

use super::service::TimerService;
use super::timer::TimerError;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// How long a client gets to send its request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// IpcError
// ============================================================================

/// Failures on the daemon side of the socket.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// The socket could not be prepared or bound
    #[error("cannot bind {}: {source}", .path.display())]
    Bind {
        /// Socket path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// No connection could be accepted
    #[error("cannot accept connection: {0}")]
    Accept(#[source] io::Error),

    /// The request could not be read
    #[error("cannot read request: {0}")]
    Read(#[source] io::Error),

    /// The response could not be written
    #[error("cannot write response: {0}")]
    Write(#[source] io::Error),

    /// The request is not a known command
    #[error("malformed request: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    /// The response could not be encoded
    #[error("cannot encode response: {0}")]
    Encode(#[source] serde_json::Error),

    /// The client sent nothing in time
    #[error("timed out waiting for a request")]
    Timeout,

    /// The client hung up without sending a request
    #[error("client hung up before sending a request")]
    ConnectionClosed,
}

impl IpcError {
    /// Returns true if the client can still be told what went wrong.
    pub fn can_reply(&self) -> bool {
        matches!(self, Self::MalformedRequest(_) | Self::Timeout)
    }

    /// Error response for a connection that never reached the handler.
    pub fn to_response(&self) -> IpcResponse {
        IpcResponse::error(self.to_string())
    }
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix socket the daemon answers timer commands on.
///
/// The socket file is removed again when the server is dropped.
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Binds the daemon socket, replacing a stale socket file.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Bind`] if the directory or socket cannot be set up.
    pub fn new(socket_path: &Path) -> Result<Self, IpcError> {
        let bind_error = |source| IpcError::Bind {
            path: socket_path.to_path_buf(),
            source,
        };

        if socket_path.exists() {
            std::fs::remove_file(socket_path).map_err(bind_error)?;
        }
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(bind_error)?;
        }
        let listener = UnixListener::bind(socket_path).map_err(bind_error)?;

        tracing::info!(socket = %socket_path.display(), "IPC server listening");
        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Waits for the next client.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Accept`] if the listener fails.
    pub async fn accept(&self) -> Result<UnixStream, IpcError> {
        let (stream, _addr) = self.listener.accept().await.map_err(IpcError::Accept)?;
        Ok(stream)
    }

    /// Reads one JSON request from `stream`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is silent for too long, hangs up, or
    /// sends something that is not a known command.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest, IpcError> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE];
        let n = timeout(REQUEST_TIMEOUT, stream.read(&mut buffer))
            .await
            .map_err(|_| IpcError::Timeout)?
            .map_err(IpcError::Read)?;

        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }
        serde_json::from_slice(&buffer[..n]).map_err(IpcError::MalformedRequest)
    }

    /// Writes `response` to `stream` as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub async fn send_response(
        stream: &mut UnixStream,
        response: &IpcResponse,
    ) -> Result<(), IpcError> {
        let json = serde_json::to_vec(response).map_err(IpcError::Encode)?;
        stream.write_all(&json).await.map_err(IpcError::Write)?;
        stream.flush().await.map_err(IpcError::Write)
    }

    /// Serves one connection: read a request, handle it, write the response.
    ///
    /// A request that cannot be handled still gets an error response when
    /// the client is there to read it.
    ///
    /// # Errors
    ///
    /// Returns the read failure, or the write failure for the response.
    pub async fn serve_connection(
        mut stream: UnixStream,
        handler: &RequestHandler,
    ) -> Result<(), IpcError> {
        let request = match Self::receive_request(&mut stream).await {
            Ok(request) => request,
            Err(e) => {
                if e.can_reply() {
                    // The client may already be gone.
                    let _ = Self::send_response(&mut stream, &e.to_response()).await;
                }
                return Err(e);
            }
        };
        let response = handler.handle(request).await;
        Self::send_response(&mut stream, &response).await
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            tracing::debug!(socket = %self.socket_path.display(), "socket not removed: {}", e);
        }
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the timer service.
#[derive(Clone)]
pub struct RequestHandler {
    /// The authoritative timer
    service: Arc<TimerService>,
    /// Action bus used for simulated surface presses
    actions: ActionSender,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(service: Arc<TimerService>, actions: ActionSender) -> Self {
        Self { service, actions }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        tracing::debug!(?request, "handling request");
        match request {
            IpcRequest::Start { params } => self.handle_start(params).await,
            IpcRequest::Pause { timestamp } => {
                let result = self.service.pause(timestamp).await;
                self.respond(result, "Timer paused")
            }
            IpcRequest::Resume => {
                let result = self.service.resume().await;
                self.respond(result, "Timer resumed")
            }
            IpcRequest::Restart { limit_time } => {
                let result = self.service.restart(limit_time).await;
                self.respond(result, "Timer restarted")
            }
            IpcRequest::Reset => {
                let state = self.service.reset().await;
                self.respond(Ok(state), "Timer reset")
            }
            IpcRequest::Finish => {
                let result = self.service.finish().await;
                self.respond(result, "Timer finished")
            }
            IpcRequest::Status => self.handle_status().await,
            IpcRequest::Press { surface, control } => self.handle_press(surface, control).await,
        }
    }

    /// Handles the start command.
    async fn handle_start(&self, params: StartParams) -> IpcResponse {
        let result = self.service.start(params.limit_time, params.started_at).await;
        self.respond(result, "Timer started")
    }

    /// Handles the status command.
    async fn handle_status(&self) -> IpcResponse {
        let (state, now) = self.service.status().await;
        IpcResponse::success("", Some(ResponseData::from_timer_state(&state, now)))
    }

    /// Handles a simulated surface button press.
    async fn handle_press(&self, surface: SurfaceKind, control: Control) -> IpcResponse {
        let (state, _) = self.service.status().await;
        let Some(action) = surface.resolve_press(control, state.phase) else {
            return IpcResponse::error(format!(
                "{} has no {} button while {}",
                surface, control, state.phase
            ));
        };

        match self.actions.for_surface(surface).request(action).await {
            Ok(result) => self.respond(result, format!("{} sent from {}", action, surface)),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    fn respond(
        &self,
        result: Result<TimerState, TimerError>,
        message: impl Into<String>,
    ) -> IpcResponse {
        match result {
            Ok(state) => {
                let data = ResponseData::from_timer_state(&state, self.service.now_ms());
                IpcResponse::success(message, Some(data))
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
