//! Integration tests for daemon-CLI IPC communication.
//!
//! These tests drive the real client against the real server and request
//! handler, with a manual clock standing in for wall time.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use live_timer::cli::client::IpcClient;
use live_timer::cli::commands::{RestartArgs, StartArgs};
use live_timer::clock::ManualClock;
use live_timer::daemon::ipc::{IpcServer, RequestHandler};
use live_timer::daemon::TimerService;
use live_timer::messaging::{action_bus, TimerBridge};
use live_timer::presentation::{Control, FINISHED_MESSAGE};
use live_timer::surface::SurfaceKind;
use live_timer::types::ResponseData;

// ============================================================================
// Test Helpers
// ============================================================================

/// Creates a temporary socket path for testing.
fn create_temp_socket_path() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("integration_test.sock");
    // Keep the directory so it's not deleted
    std::mem::forget(dir);
    path
}

/// A server, bridge and client wired to one timer service.
struct TestDaemon {
    client: IpcClient,
    clock: Arc<ManualClock>,
    server_task: JoinHandle<()>,
    bridge_task: JoinHandle<()>,
}

impl TestDaemon {
    fn spawn() -> Self {
        let socket_path = create_temp_socket_path();
        let clock = Arc::new(ManualClock::new(1_000_000));
        let service = Arc::new(TimerService::new(clock.clone(), Duration::from_millis(10)));
        let (actions, receiver) = action_bus();
        let bridge_task = TimerBridge::new(service.clone(), receiver).spawn();

        let server = IpcServer::new(&socket_path).unwrap();
        let handler = RequestHandler::new(service, actions);
        let server_task = tokio::spawn(async move {
            while let Ok(stream) = server.accept().await {
                let _ = IpcServer::serve_connection(stream, &handler).await;
            }
        });

        Self {
            client: IpcClient::with_socket_path(socket_path),
            clock,
            server_task,
            bridge_task,
        }
    }

    async fn status(&self) -> ResponseData {
        self.client.status().await.unwrap().data.unwrap()
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        self.server_task.abort();
        self.bridge_task.abort();
    }
}

// ============================================================================
// Start / Status
// ============================================================================

#[tokio::test]
async fn test_start_via_ipc() {
    let daemon = TestDaemon::spawn();

    let response = daemon.client.start(&StartArgs { duration: 10 }).await.unwrap();

    assert!(response.is_success());
    assert_eq!(response.message, "Timer started");
    let data = response.data.unwrap();
    assert_eq!(data.state.as_deref(), Some("running"));
    assert_eq!(data.limit_time, Some(10));
    assert_eq!(data.started_at, Some(1_000_000));
    assert_eq!(data.display_time.as_deref(), Some("0:00"));
    assert_eq!(data.controls, vec![Control::Pause]);
}

#[tokio::test]
async fn test_status_reports_elapsed_time() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 100 }).await.unwrap();

    daemon.clock.advance(75_000);
    let data = daemon.status().await;

    assert_eq!(data.display_time.as_deref(), Some("1:15"));
    assert_eq!(data.elapsed_seconds, Some(75));
    assert!((data.progress.unwrap() - 0.75).abs() < 1e-9);
}

#[tokio::test]
async fn test_status_when_idle() {
    let daemon = TestDaemon::spawn();

    let data = daemon.status().await;

    assert_eq!(data.state.as_deref(), Some("idle"));
    assert_eq!(data.display_time.as_deref(), Some("0:00"));
    assert_eq!(data.controls, vec![Control::Play]);
    assert!(data.message.is_none());
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 10 }).await.unwrap();

    let err = daemon.client.start(&StartArgs { duration: 20 }).await.unwrap_err();

    assert!(err.to_string().contains("cannot start while running"));
    assert_eq!(daemon.status().await.limit_time, Some(10));
}

// ============================================================================
// Pause / Resume
// ============================================================================

#[tokio::test]
async fn test_pause_freezes_elapsed_time() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 60 }).await.unwrap();

    daemon.clock.advance(3_000);
    let response = daemon.client.pause().await.unwrap();
    assert_eq!(response.data.unwrap().state.as_deref(), Some("paused"));

    daemon.clock.advance(5_000);
    let data = daemon.status().await;
    assert_eq!(data.display_time.as_deref(), Some("0:03"));
    assert_eq!(data.controls, vec![Control::Play, Control::Restart]);
}

#[tokio::test]
async fn test_resume_continues_from_pause() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 60 }).await.unwrap();

    daemon.clock.advance(3_000);
    daemon.client.pause().await.unwrap();
    daemon.clock.advance(10_000);
    daemon.client.resume().await.unwrap();
    daemon.clock.advance(2_000);

    let data = daemon.status().await;
    assert_eq!(data.state.as_deref(), Some("running"));
    assert_eq!(data.display_time.as_deref(), Some("0:05"));
    // The anchor moved forward by the paused span.
    assert_eq!(data.started_at, Some(1_010_000));
}

#[tokio::test]
async fn test_resume_while_running_is_rejected() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 60 }).await.unwrap();

    let err = daemon.client.resume().await.unwrap_err();

    assert_eq!(err.to_string(), "cannot resume while running");
}

// ============================================================================
// Finish / Restart / Reset
// ============================================================================

#[tokio::test]
async fn test_finish_shows_message() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 60 }).await.unwrap();
    daemon.clock.advance(4_000);

    let response = daemon.client.finish().await.unwrap();

    let data = response.data.unwrap();
    assert_eq!(data.state.as_deref(), Some("finished"));
    assert_eq!(data.message.as_deref(), Some(FINISHED_MESSAGE));
    assert_eq!(data.controls, vec![Control::Restart, Control::Reset]);
}

#[tokio::test]
async fn test_run_finishes_when_limit_reached() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 2 }).await.unwrap();

    daemon.clock.advance(2_500);
    let mut data = daemon.status().await;
    for _ in 0..100 {
        if data.state.as_deref() == Some("finished") {
            break;
        }
        sleep(Duration::from_millis(10)).await;
        data = daemon.status().await;
    }

    assert_eq!(data.state.as_deref(), Some("finished"));
    assert_eq!(data.display_time.as_deref(), Some("0:02"));
    assert_eq!(data.progress, Some(1.0));
    assert_eq!(data.message.as_deref(), Some(FINISHED_MESSAGE));
}

#[tokio::test]
async fn test_restart_with_new_duration() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 10 }).await.unwrap();
    daemon.clock.advance(4_000);
    daemon.client.finish().await.unwrap();

    let response = daemon
        .client
        .restart(&RestartArgs { duration: Some(30) })
        .await
        .unwrap();

    let data = response.data.unwrap();
    assert_eq!(data.state.as_deref(), Some("running"));
    assert_eq!(data.limit_time, Some(30));
    assert_eq!(data.display_time.as_deref(), Some("0:00"));
}

#[tokio::test]
async fn test_restart_from_idle_is_rejected() {
    let daemon = TestDaemon::spawn();

    let err = daemon.client.restart(&RestartArgs::default()).await.unwrap_err();

    assert!(err.to_string().contains("cannot restart while idle"));
}

#[tokio::test]
async fn test_reset_returns_to_idle() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 10 }).await.unwrap();
    daemon.clock.advance(4_000);

    daemon.client.reset().await.unwrap();

    let data = daemon.status().await;
    assert_eq!(data.state.as_deref(), Some("idle"));
    assert_eq!(data.display_time.as_deref(), Some("0:00"));
    assert!(data.started_at.is_none());
}

// ============================================================================
// Surface Presses
// ============================================================================

#[tokio::test]
async fn test_press_live_activity_pause() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 10 }).await.unwrap();

    let response = daemon
        .client
        .press(SurfaceKind::LiveActivity, Control::Pause)
        .await
        .unwrap();

    assert_eq!(response.message, "onPause sent from live-activity");
    assert_eq!(daemon.status().await.state.as_deref(), Some("paused"));
}

#[tokio::test]
async fn test_press_notification_play_resumes() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 10 }).await.unwrap();
    daemon.client.pause().await.unwrap();

    daemon
        .client
        .press(SurfaceKind::Notification, Control::Play)
        .await
        .unwrap();

    assert_eq!(daemon.status().await.state.as_deref(), Some("running"));
}

#[tokio::test]
async fn test_press_hidden_control_is_rejected() {
    let daemon = TestDaemon::spawn();
    daemon.client.start(&StartArgs { duration: 10 }).await.unwrap();

    let err = daemon
        .client
        .press(SurfaceKind::InApp, Control::Play)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("has no play button while running"));
    assert_eq!(daemon.status().await.state.as_deref(), Some("running"));
}

// ============================================================================
// Connection Errors
// ============================================================================

#[tokio::test]
async fn test_connection_error_without_daemon() {
    let client = IpcClient::with_socket_path(create_temp_socket_path());

    let err = client.status().await.unwrap_err();

    assert!(format!("{:#}", err).contains("Cannot connect to the daemon"));
}
