//! IPC client for communicating with the live timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::cli::commands::{RestartArgs, StartArgs};
use crate::presentation::Control;
use crate::surface::SurfaceKind;
use crate::types::{DaemonConfig, IpcRequest, IpcResponse, StartParams};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: u64 = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a client for the configured socket.
    ///
    /// Honors the socket environment override, then the home directory
    /// default.
    pub fn new() -> Self {
        Self::with_socket_path(DaemonConfig::from_env().socket_path)
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends a start command to the daemon.
    pub async fn start(&self, args: &StartArgs) -> Result<IpcResponse> {
        let params = StartParams {
            limit_time: args.duration,
            started_at: None,
        };
        self.call(&IpcRequest::Start { params }).await
    }

    /// Sends a pause command to the daemon.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Pause { timestamp: None }).await
    }

    /// Sends a resume command to the daemon.
    pub async fn resume(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Resume).await
    }

    /// Sends a restart command to the daemon.
    pub async fn restart(&self, args: &RestartArgs) -> Result<IpcResponse> {
        self.call(&IpcRequest::Restart {
            limit_time: args.duration,
        })
        .await
    }

    /// Sends a reset command to the daemon.
    pub async fn reset(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Reset).await
    }

    /// Sends a finish command to the daemon.
    pub async fn finish(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Finish).await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.call(&IpcRequest::Status).await
    }

    /// Simulates a button press on a surface.
    pub async fn press(&self, surface: SurfaceKind, control: Control) -> Result<IpcResponse> {
        self.call(&IpcRequest::Press { surface, control }).await
    }

    /// Sends a request and turns error responses into errors.
    async fn call(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let response = self.send_request_with_retry(request).await?;
        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Sends a request to the daemon with retry logic.
    ///
    /// Only transport failures are retried; an error response is returned
    /// as is.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;
        loop {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!("request failed (attempt {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timed out")?
            .context("Cannot connect to the daemon. Start it with 'live-timer daemon'")?;

        let request_json = serde_json::to_string(request).context("Failed to serialize request")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(request_json.as_bytes()),
        )
        .await
        .context("Write timed out")?
        .context("Failed to send request")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("Failed to shut down write side")?;

        let mut buffer = Vec::new();
        let n = timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream).take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("Read timed out")?
        .context("Failed to receive response")?;

        if n == 0 {
            anyhow::bail!("No response from the daemon");
        }

        let response: IpcResponse =
            serde_json::from_slice(&buffer).context("Failed to parse response")?;

        Ok(response)
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseData;
    use tokio::net::UnixListener;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        // Keep the directory so it's not deleted
        std::mem::forget(dir);
        path
    }

    /// Accepts one connection, returns the raw request and answers with `response`.
    async fn serve_once(listener: UnixListener, response: IpcResponse) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await.unwrap();
        let json = serde_json::to_vec(&response).unwrap();
        stream.write_all(&json).await.unwrap();
        stream.flush().await.unwrap();
        String::from_utf8(buffer).unwrap()
    }

    // ------------------------------------------------------------------------
    // IpcClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;

        #[test]
        fn test_with_socket_path() {
            let path = PathBuf::from("/tmp/test.sock");
            let client = IpcClient::with_socket_path(path.clone());
            assert_eq!(client.socket_path(), path.as_path());
        }

        #[test]
        fn test_default_socket_path() {
            let client = IpcClient::default();
            assert!(client.socket_path().to_string_lossy().ends_with(".sock"));
        }

        #[tokio::test]
        async fn test_connection_failure() {
            let socket_path = create_temp_socket_path();
            let client = IpcClient::with_socket_path(socket_path);

            let result = client.send_request(&IpcRequest::Status).await;
            let err = result.unwrap_err();
            assert!(format!("{:#}", err).contains("live-timer daemon"));
        }

        #[tokio::test]
        async fn test_send_start_request() {
            let socket_path = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();

            let data = ResponseData {
                state: Some("running".to_string()),
                limit_time: Some(10),
                ..ResponseData::default()
            };
            let server = tokio::spawn(serve_once(
                listener,
                IpcResponse::success("Timer started", Some(data)),
            ));

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.start(&StartArgs { duration: 10 }).await.unwrap();

            assert_eq!(response.message, "Timer started");
            assert_eq!(response.data.unwrap().limit_time, Some(10));

            let raw = server.await.unwrap();
            let sent: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(sent["command"], "start");
            assert_eq!(sent["limitTime"], 10);
            assert!(sent.get("startedAt").is_none());
        }

        #[tokio::test]
        async fn test_send_press_request() {
            let socket_path = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let server = tokio::spawn(serve_once(listener, IpcResponse::success("ok", None)));

            let client = IpcClient::with_socket_path(socket_path);
            client
                .press(SurfaceKind::LiveActivity, Control::Restart)
                .await
                .unwrap();

            let raw = server.await.unwrap();
            assert_eq!(
                raw,
                r#"{"command":"press","surface":"live-activity","control":"restart"}"#
            );
        }

        #[tokio::test]
        async fn test_restart_without_duration_omits_limit() {
            let socket_path = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let server = tokio::spawn(serve_once(listener, IpcResponse::success("ok", None)));

            let client = IpcClient::with_socket_path(socket_path);
            client.restart(&RestartArgs::default()).await.unwrap();

            assert_eq!(server.await.unwrap(), r#"{"command":"restart"}"#);
        }

        #[tokio::test]
        async fn test_error_response_is_not_retried() {
            let socket_path = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let server = tokio::spawn(serve_once(
                listener,
                IpcResponse::error("cannot resume while running"),
            ));

            let client = IpcClient::with_socket_path(socket_path);
            let err = client.resume().await.unwrap_err();
            assert_eq!(err.to_string(), "cannot resume while running");

            server.await.unwrap();
        }
    }
}
