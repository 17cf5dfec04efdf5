//! In-app surface.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::daemon::timer::{TimerEvent, TimerUpdate};
use crate::messaging::{ActionSender, SurfaceAction};
use crate::presentation::{Control, TimerView};

use super::{Surface, SurfaceError, SurfaceKind};

#[derive(Debug, Default)]
struct Screen {
    view: Option<TimerView>,
    last_event: Option<TimerEvent>,
}

/// The app's own timer screen.
///
/// Clones share the screen, so a handle kept outside the hub always sees
/// the latest view.
#[derive(Debug, Clone, Default)]
pub struct InAppSurface {
    screen: Arc<Mutex<Screen>>,
    actions: Option<ActionSender>,
}

impl InAppSurface {
    /// Creates an in-app surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects the on-screen controls to the action bus.
    #[must_use]
    pub fn with_actions(mut self, sender: &ActionSender) -> Self {
        self.actions = Some(sender.for_surface(SurfaceKind::InApp));
        self
    }

    /// Latest rendered view.
    pub fn view(&self) -> Option<TimerView> {
        self.lock().view.clone()
    }

    /// Event that produced the latest view.
    pub fn last_event(&self) -> Option<TimerEvent> {
        self.lock().last_event
    }

    /// Handles a tap on an on-screen control.
    ///
    /// Only controls that are currently visible do anything.
    pub fn press(&self, control: Control) -> Option<SurfaceAction> {
        let view = self.view()?;
        if !view.visible_controls.contains(control) {
            tracing::debug!(%control, "control not visible, ignoring");
            return None;
        }
        let action = SurfaceAction::for_control(control, view.phase)?;
        if let Some(sender) = &self.actions {
            sender.send(action);
        }
        Some(action)
    }

    fn show(&self, update: &TimerUpdate, view: &TimerView) {
        let mut screen = self.lock();
        screen.view = Some(view.clone());
        screen.last_event = Some(update.event);
    }

    fn lock(&self) -> MutexGuard<'_, Screen> {
        self.screen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Surface for InAppSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::InApp
    }

    fn create(&mut self, update: &TimerUpdate, view: &TimerView) -> Result<(), SurfaceError> {
        self.show(update, view);
        Ok(())
    }

    fn update(&mut self, update: &TimerUpdate, view: &TimerView) -> Result<(), SurfaceError> {
        self.show(update, view);
        Ok(())
    }

    fn teardown(&mut self) {
        // The app screen stays; it just falls back to idle.
        let mut screen = self.lock();
        screen.view = None;
        screen.last_event = Some(TimerEvent::Reset);
    }

    fn is_presented(&self) -> bool {
        self.lock().view.is_some()
    }
}
