//! Live Activity surface.
//!
//! The widget renders from a [`ContentState`] and counts time on its own
//! from the timestamps it is given, so updates are only needed when a
//! transition happens. Buttons on the widget trigger intents that are mapped
//! back to timer actions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::daemon::timer::{TimerEvent, TimerUpdate};
use crate::messaging::{ActionSender, SurfaceAction};
use crate::presentation::{Control, TimerView, FINISHED_MESSAGE};
use crate::types::{TimerPhase, TimerState};

use super::{Surface, SurfaceError, SurfaceKind};

/// Limit the widget assumes when none is present.
pub const DEFAULT_LIMIT_SECONDS: u32 = 60;

/// Intent names the widget buttons trigger.
pub mod intents {
    /// Pause the running timer.
    pub const PAUSE: &str = "PauseIntent";
    /// Resume the paused timer.
    pub const RESUME: &str = "ResumeIntent";
    /// Start the run over.
    pub const RESTART: &str = "RestartIntent";
    /// Return to idle.
    pub const RESET: &str = "ResetIntent";
    /// Finish the run now.
    pub const FINISH: &str = "FinishTimeIntent";
}

/// Maps an intent name to the timer action it requests.
pub fn action_for_intent(intent: &str) -> Option<SurfaceAction> {
    match intent {
        intents::PAUSE => Some(SurfaceAction::Pause),
        intents::RESUME => Some(SurfaceAction::Resume),
        intents::RESTART => Some(SurfaceAction::Restart),
        intents::RESET => Some(SurfaceAction::Reset),
        intents::FINISH => Some(SurfaceAction::Finish),
        _ => None,
    }
}

/// Intent behind the widget button for `control` in `phase`.
pub fn intent_for(control: Control, phase: TimerPhase) -> Option<&'static str> {
    match control {
        Control::Play if phase == TimerPhase::Paused => Some(intents::RESUME),
        Control::Play => None,
        Control::Pause => Some(intents::PAUSE),
        Control::Restart => Some(intents::RESTART),
        Control::Reset => Some(intents::RESET),
    }
}

// ============================================================================
// ContentState
// ============================================================================

/// Dynamic content of the Live Activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentState {
    /// Logical zero of the run (ms since epoch)
    pub started_at: Option<u64>,
    /// Pause timestamp (ms since epoch)
    pub paused_at: Option<u64>,
    /// Run duration in seconds
    pub limit_time: Option<u32>,
    /// Terminal message; present only once finished
    pub message: Option<String>,
}

impl ContentState {
    /// Builds the content for a timer state.
    ///
    /// A finished run drops its timestamps and only carries the message.
    pub fn from_timer_state(state: &TimerState) -> Self {
        if state.is_finished() {
            return Self {
                message: Some(FINISHED_MESSAGE.to_string()),
                ..Self::default()
            };
        }
        Self {
            started_at: state.started_at,
            paused_at: state.paused_at,
            limit_time: state.limit_time,
            message: None,
        }
    }

    /// Returns true unless paused.
    pub fn is_running(&self) -> bool {
        self.paused_at.is_none()
    }

    /// Returns true once the finished message is set.
    pub fn is_finished(&self) -> bool {
        self.message.is_some()
    }

    /// Limit in seconds, falling back to [`DEFAULT_LIMIT_SECONDS`].
    pub fn limit_seconds(&self) -> u32 {
        self.limit_time.unwrap_or(DEFAULT_LIMIT_SECONDS)
    }

    /// Whole seconds elapsed at `now_ms`.
    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let end = self.paused_at.unwrap_or(now_ms);
        end.saturating_sub(started_at) / 1_000
    }

    /// Progress fraction at `now_ms`, clamped to `[0, 1]`.
    pub fn progress(&self, now_ms: u64) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let end = self.paused_at.unwrap_or(now_ms);
        let elapsed_ms = end.saturating_sub(started_at) as f64;
        let total_ms = f64::from(self.limit_seconds()) * 1_000.0;
        (elapsed_ms / total_ms).clamp(0.0, 1.0)
    }
}

// ============================================================================
// LiveActivitySurface
// ============================================================================

#[derive(Debug, Clone)]
struct Activity {
    id: Uuid,
    content: ContentState,
}

/// Live Activity / Dynamic Island presence.
#[derive(Debug)]
pub struct LiveActivitySurface {
    authorized: bool,
    activity: Option<Activity>,
    actions: Option<ActionSender>,
}

impl LiveActivitySurface {
    /// Creates a surface; `authorized` says whether activities are enabled.
    pub fn new(authorized: bool) -> Self {
        Self {
            authorized,
            activity: None,
            actions: None,
        }
    }

    /// Connects widget intents to the action bus.
    #[must_use]
    pub fn with_actions(mut self, sender: &ActionSender) -> Self {
        self.actions = Some(sender.for_surface(SurfaceKind::LiveActivity));
        self
    }

    /// Identifier of the current activity.
    pub fn activity_id(&self) -> Option<Uuid> {
        self.activity.as_ref().map(|a| a.id)
    }

    /// Content currently shown.
    pub fn content(&self) -> Option<&ContentState> {
        self.activity.as_ref().map(|a| &a.content)
    }

    /// Handles an intent performed from the widget.
    pub fn on_intent(&self, intent: &str) -> Option<SurfaceAction> {
        let Some(action) = action_for_intent(intent) else {
            tracing::debug!(intent, "unknown live activity intent");
            return None;
        };
        if let Some(sender) = &self.actions {
            sender.send(action);
        }
        Some(action)
    }
}

impl Surface for LiveActivitySurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::LiveActivity
    }

    fn create(&mut self, update: &TimerUpdate, _view: &TimerView) -> Result<(), SurfaceError> {
        if !self.authorized {
            return Err(SurfaceError::Unavailable(
                "live activities are not enabled".to_string(),
            ));
        }
        let activity = Activity {
            id: Uuid::new_v4(),
            content: ContentState::from_timer_state(&update.state),
        };
        tracing::debug!(activity_id = %activity.id, "live activity requested");
        self.activity = Some(activity);
        Ok(())
    }

    fn update(&mut self, update: &TimerUpdate, _view: &TimerView) -> Result<(), SurfaceError> {
        let Some(activity) = self.activity.as_mut() else {
            return Err(SurfaceError::RenderFailed(
                "no live activity to update".to_string(),
            ));
        };
        // The widget counts on its own; samples carry nothing new.
        if update.event == TimerEvent::Tick {
            return Ok(());
        }
        activity.content = ContentState::from_timer_state(&update.state);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(activity) = self.activity.take() {
            tracing::debug!(activity_id = %activity.id, "live activity ended");
        }
    }

    fn is_presented(&self) -> bool {
        self.activity.is_some()
    }
}
