//! Daemon wiring and main loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::Duration;

use super::ipc::{IpcServer, RequestHandler};
use super::service::TimerService;
use crate::clock::{SharedClock, SystemClock};
use crate::messaging::{action_bus, TimerBridge};
use crate::surface::{InAppSurface, LiveActivitySurface, NotificationSurface, SurfaceHub};
use crate::types::DaemonConfig;

/// Time surfaces get to process the final reset before shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Runs the daemon until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the socket cannot be
/// bound.
pub async fn run_daemon(config: DaemonConfig) -> Result<()> {
    run_daemon_with_clock(config, Arc::new(SystemClock)).await
}

/// Runs the daemon with the given clock.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the socket cannot be
/// bound.
pub async fn run_daemon_with_clock(config: DaemonConfig, clock: SharedClock) -> Result<()> {
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid daemon configuration")?;

    let service = Arc::new(TimerService::new(
        clock,
        Duration::from_millis(config.sample_interval_ms),
    ));
    let (actions, receiver) = action_bus();

    let mut hub = SurfaceHub::new().with_surface(InAppSurface::new().with_actions(&actions));
    if config.notification_enabled {
        hub.attach(NotificationSurface::new().with_actions(&actions));
    }
    if config.live_activity_enabled {
        hub.attach(LiveActivitySurface::new(config.live_activity_authorized).with_actions(&actions));
    }
    let hub_task = hub.spawn(service.subscribe());
    let bridge_task = TimerBridge::new(service.clone(), receiver).spawn();

    let server = IpcServer::new(&config.socket_path)?;
    let handler = RequestHandler::new(service.clone(), actions);

    tracing::info!(
        socket = %server.socket_path().display(),
        sample_interval_ms = config.sample_interval_ms,
        "daemon started"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => {
                match accepted {
                    Ok(stream) => {
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = IpcServer::serve_connection(stream, &handler).await {
                                tracing::debug!("connection ended with error: {:#}", e);
                            }
                        });
                    }
                    Err(e) => tracing::warn!("{:#}", e),
                }
            }
            () = &mut shutdown => break,
        }
    }

    tracing::info!("shutting down");
    service.reset().await;

    // Surfaces hold action senders, so neither task ends on its own.
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    bridge_task.abort();
    hub_task.abort();
    drop(server);

    Ok(())
}

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
