//! Cross-surface messaging.
//!
//! Any surface can originate a timer action (a tapped notification button,
//! a Live Activity intent, an in-app control). Actions travel over a single
//! action bus to the [`TimerBridge`], which applies them to the one
//! authoritative [`TimerService`]. The resulting snapshot reaches every
//! surface through the engine's broadcast channel, so the originating surface
//! is updated the same way as all the others.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::daemon::service::TimerService;
use crate::daemon::timer::TimerError;
use crate::presentation::Control;
use crate::surface::SurfaceKind;
use crate::types::{TimerPhase, TimerState};

// ============================================================================
// SurfaceAction
// ============================================================================

/// A timer action a surface can originate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceAction {
    /// Pause the running timer
    Pause,
    /// Resume the paused timer
    Resume,
    /// Start the run over
    Restart,
    /// Return to idle
    Reset,
    /// Force the terminal state
    Finish,
}

impl SurfaceAction {
    /// Wire name of the action as exchanged with the app.
    pub fn event_name(&self) -> &'static str {
        match self {
            SurfaceAction::Pause => "onPause",
            SurfaceAction::Resume => "onResume",
            SurfaceAction::Restart => "onRestart",
            SurfaceAction::Reset => "onReset",
            SurfaceAction::Finish => "onFinish",
        }
    }

    /// Parses a wire name.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "onPause" => Some(SurfaceAction::Pause),
            "onResume" => Some(SurfaceAction::Resume),
            "onRestart" => Some(SurfaceAction::Restart),
            "onReset" => Some(SurfaceAction::Reset),
            "onFinish" => Some(SurfaceAction::Finish),
            _ => None,
        }
    }

    /// Action triggered by pressing `control` while the timer is in `phase`.
    ///
    /// Play resumes a paused timer. Starting from idle needs a duration and
    /// cannot come from a surface button.
    pub fn for_control(control: Control, phase: TimerPhase) -> Option<Self> {
        match (control, phase) {
            (Control::Play, TimerPhase::Paused) => Some(SurfaceAction::Resume),
            (Control::Play, _) => None,
            (Control::Pause, _) => Some(SurfaceAction::Pause),
            (Control::Restart, _) => Some(SurfaceAction::Restart),
            (Control::Reset, _) => Some(SurfaceAction::Reset),
        }
    }
}

impl fmt::Display for SurfaceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

// ============================================================================
// MessagingError
// ============================================================================

/// Errors raised while delivering an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    /// The bridge is gone; nothing will apply the action.
    #[error("action bus is closed")]
    BusClosed,

    /// The bridge dropped the action without answering.
    #[error("action was dropped before it was applied")]
    NoReply,
}

// ============================================================================
// Action bus
// ============================================================================

type Reply = oneshot::Sender<Result<TimerState, TimerError>>;

/// An action in flight on the bus.
#[derive(Debug)]
pub struct ActionEnvelope {
    /// Requested action
    pub action: SurfaceAction,
    /// Surface that originated the action, if any
    pub source: Option<SurfaceKind>,
    reply: Option<Reply>,
}

/// Cloneable handle surfaces use to send actions.
#[derive(Debug, Clone)]
pub struct ActionSender {
    tx: mpsc::UnboundedSender<ActionEnvelope>,
    source: Option<SurfaceKind>,
}

/// Receiving end of the action bus, consumed by the [`TimerBridge`].
#[derive(Debug)]
pub struct ActionReceiver {
    rx: mpsc::UnboundedReceiver<ActionEnvelope>,
}

/// Creates a new action bus.
pub fn action_bus() -> (ActionSender, ActionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ActionSender { tx, source: None }, ActionReceiver { rx })
}

impl ActionSender {
    /// Returns a sender that tags its actions with `kind`.
    #[must_use]
    pub fn for_surface(&self, kind: SurfaceKind) -> Self {
        Self {
            tx: self.tx.clone(),
            source: Some(kind),
        }
    }

    /// Returns the surface this sender is tagged with.
    pub fn source(&self) -> Option<SurfaceKind> {
        self.source
    }

    /// Sends an action without waiting for it to be applied.
    ///
    /// Returns false if the bus is closed; the action is dropped and logged.
    pub fn send(&self, action: SurfaceAction) -> bool {
        let envelope = ActionEnvelope {
            action,
            source: self.source,
            reply: None,
        };
        if self.tx.send(envelope).is_err() {
            tracing::debug!(action = action.event_name(), "action bus closed, dropping action");
            return false;
        }
        true
    }

    /// Sends an action and waits for the bridge to apply it.
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge is not running.
    pub async fn request(
        &self,
        action: SurfaceAction,
    ) -> Result<Result<TimerState, TimerError>, MessagingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = ActionEnvelope {
            action,
            source: self.source,
            reply: Some(reply_tx),
        };
        self.tx
            .send(envelope)
            .map_err(|_| MessagingError::BusClosed)?;
        reply_rx.await.map_err(|_| MessagingError::NoReply)
    }
}

impl ActionReceiver {
    /// Receives the next action, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ActionEnvelope> {
        self.rx.recv().await
    }
}

// ============================================================================
// TimerBridge
// ============================================================================

/// Applies bus actions to the authoritative timer.
pub struct TimerBridge {
    service: Arc<TimerService>,
    receiver: ActionReceiver,
}

impl TimerBridge {
    /// Creates a bridge bound to `service`.
    pub fn new(service: Arc<TimerService>, receiver: ActionReceiver) -> Self {
        Self { service, receiver }
    }

    /// Runs the bridge on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Applies actions until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(envelope) = self.receiver.recv().await {
            let action = envelope.action;
            let source = envelope.source.map(|kind| kind.as_str()).unwrap_or("app");
            let result = self.service.apply(action).await;

            match &result {
                Ok(state) => {
                    tracing::debug!(action = action.event_name(), source, phase = %state.phase, "action applied");
                }
                Err(e) if e.is_invalid_transition() => {
                    tracing::debug!(action = action.event_name(), source, "ignoring action: {}", e);
                }
                Err(e) => {
                    tracing::warn!(action = action.event_name(), source, "action failed: {}", e);
                }
            }

            if let Some(reply) = envelope.reply {
                // Requester may have given up waiting.
                let _ = reply.send(result);
            }
        }
        tracing::debug!("action bus closed, bridge stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================
