//! Persistent notification surface.
//!
//! Models the ongoing notification of a foreground timer service: a time
//! label, a determinate progress bar and inline action buttons. Button taps
//! arrive as action identifiers and are mapped back to timer actions.

use crate::daemon::timer::{TimerEvent, TimerUpdate};
use crate::messaging::{ActionSender, SurfaceAction};
use crate::presentation::{Control, TimerView};
use crate::types::TimerPhase;

use super::{Surface, SurfaceError, SurfaceKind};

/// Notification channel the timer posts to.
pub const CHANNEL_ID: &str = "TIMER_NOTIFICATION_CHANNEL";

/// Identifier of the single ongoing notification.
pub const NOTIFICATION_ID: u32 = 100;

/// Notification action identifiers.
pub mod action_ids {
    /// Pause the running timer.
    pub const PAUSE: &str = "ACTION_PAUSE";
    /// Resume the paused timer.
    pub const RESUME: &str = "ACTION_RESUME";
    /// Stop the timer and return to idle.
    pub const STOP: &str = "ACTION_STOP";
    /// Start the run over.
    pub const RESTART: &str = "ACTION_RESTART";
    /// Finish the run now.
    pub const FINISH: &str = "ACTION_FINISH";
}

/// Maps an action identifier to the timer action it requests.
pub fn action_for_id(action_id: &str) -> Option<SurfaceAction> {
    match action_id {
        action_ids::PAUSE => Some(SurfaceAction::Pause),
        action_ids::RESUME => Some(SurfaceAction::Resume),
        action_ids::STOP => Some(SurfaceAction::Reset),
        action_ids::RESTART => Some(SurfaceAction::Restart),
        action_ids::FINISH => Some(SurfaceAction::Finish),
        _ => None,
    }
}

/// Action identifier of the button drawn for `control` in `phase`.
pub fn action_id_for(control: Control, phase: TimerPhase) -> Option<&'static str> {
    match control {
        Control::Play if phase == TimerPhase::Paused => Some(action_ids::RESUME),
        Control::Play => None,
        Control::Pause => Some(action_ids::PAUSE),
        Control::Restart => Some(action_ids::RESTART),
        Control::Reset => Some(action_ids::STOP),
    }
}

// ============================================================================
// NotificationLayout
// ============================================================================

/// An inline button on the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationButton {
    /// Action identifier delivered when tapped
    pub action_id: &'static str,
    /// Control the button stands for
    pub control: Control,
}

/// What the notification currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationLayout {
    /// Time label, or the finished message
    pub time_text: String,
    /// Progress bar maximum (the limit in seconds)
    pub progress_max: u32,
    /// Progress bar value (elapsed seconds)
    pub progress_value: u32,
    /// Whether the progress bar is drawn
    pub progress_visible: bool,
    /// Inline buttons, in display order
    pub buttons: Vec<NotificationButton>,
}

impl NotificationLayout {
    /// Builds the layout for a rendered view.
    pub fn from_view(view: &TimerView, limit_seconds: u32, elapsed_seconds: u64) -> Self {
        let finished = view.phase == TimerPhase::Finished;
        let elapsed = u32::try_from(elapsed_seconds).unwrap_or(u32::MAX);
        Self {
            time_text: view.headline().to_string(),
            progress_max: limit_seconds,
            progress_value: elapsed.min(limit_seconds),
            progress_visible: !finished,
            buttons: view
                .visible_controls
                .iter()
                .filter_map(|control| {
                    action_id_for(control, view.phase)
                        .map(|action_id| NotificationButton { action_id, control })
                })
                .collect(),
        }
    }

    /// Returns true if a button with `action_id` is shown.
    pub fn has_button(&self, action_id: &str) -> bool {
        self.buttons.iter().any(|b| b.action_id == action_id)
    }
}

// ============================================================================
// NotificationSurface
// ============================================================================

/// Ongoing notification with inline controls.
#[derive(Debug, Default)]
pub struct NotificationSurface {
    layout: Option<NotificationLayout>,
    actions: Option<ActionSender>,
}

impl NotificationSurface {
    /// Creates a notification surface that is not yet shown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects button taps to the action bus.
    #[must_use]
    pub fn with_actions(mut self, sender: &ActionSender) -> Self {
        self.actions = Some(sender.for_surface(SurfaceKind::Notification));
        self
    }

    /// Returns the layout currently shown.
    pub fn layout(&self) -> Option<&NotificationLayout> {
        self.layout.as_ref()
    }

    /// Handles a tap on an inline button.
    ///
    /// Returns the action that was forwarded, if the identifier is known.
    pub fn on_action(&self, action_id: &str) -> Option<SurfaceAction> {
        let Some(action) = action_for_id(action_id) else {
            tracing::debug!(action_id, "unknown notification action");
            return None;
        };
        if let Some(sender) = &self.actions {
            sender.send(action);
        }
        Some(action)
    }

    fn render(&mut self, update: &TimerUpdate, view: &TimerView) {
        let limit = update
            .state
            .limit_time
            .or_else(|| self.layout.as_ref().map(|l| l.progress_max))
            .unwrap_or(0);
        let elapsed = update.state.elapsed_seconds(update.at_ms);
        self.layout = Some(NotificationLayout::from_view(view, limit, elapsed));
    }
}

impl Surface for NotificationSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Notification
    }

    fn create(&mut self, update: &TimerUpdate, view: &TimerView) -> Result<(), SurfaceError> {
        self.render(update, view);
        tracing::debug!(channel = CHANNEL_ID, id = NOTIFICATION_ID, "notification posted");
        Ok(())
    }

    fn update(&mut self, update: &TimerUpdate, view: &TimerView) -> Result<(), SurfaceError> {
        if self.layout.is_none() {
            return Err(SurfaceError::RenderFailed(
                "notification is not posted".to_string(),
            ));
        }
        if update.event == TimerEvent::Finished {
            tracing::debug!("notification switched to finished layout");
        }
        self.render(update, view);
        Ok(())
    }

    fn teardown(&mut self) {
        if self.layout.take().is_some() {
            tracing::debug!(id = NOTIFICATION_ID, "notification removed");
        }
    }

    fn is_presented(&self) -> bool {
        self.layout.is_some()
    }
}
