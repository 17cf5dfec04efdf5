//! Surfaces that present the live timer.
//!
//! A surface owns the render model its native counterpart would draw and
//! receives every [`TimerUpdate`] through the [`SurfaceHub`]:
//!
//! - `notification`: persistent notification with inline action buttons
//! - `live_activity`: Live Activity / Dynamic Island content state
//! - `in_app`: the app's own view
//!
//! Started and restarted runs create an OS-level presence, reset tears it
//! down, everything else updates it in place.

pub mod error;
pub mod hub;
pub mod in_app;
pub mod live_activity;
pub mod notification;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

pub use self::error::SurfaceError;
pub use self::hub::SurfaceHub;
pub use self::in_app::InAppSurface;
pub use self::live_activity::{ContentState, LiveActivitySurface};
pub use self::notification::{NotificationLayout, NotificationSurface};

use crate::daemon::timer::TimerUpdate;
use crate::messaging::SurfaceAction;
use crate::presentation::{Control, TimerView};
use crate::types::TimerPhase;

// ============================================================================
// SurfaceKind
// ============================================================================

/// Identifies a kind of surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    /// Persistent notification
    Notification,
    /// Live Activity / Dynamic Island
    LiveActivity,
    /// In-app view
    InApp,
}

impl SurfaceKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Notification => "notification",
            SurfaceKind::LiveActivity => "live-activity",
            SurfaceKind::InApp => "in-app",
        }
    }

    /// Resolves a button press through this surface's own action mapping.
    ///
    /// Returns `None` if the surface has no button that does anything for
    /// `control` in `phase`.
    pub fn resolve_press(&self, control: Control, phase: TimerPhase) -> Option<SurfaceAction> {
        match self {
            SurfaceKind::Notification => notification::action_id_for(control, phase)
                .and_then(notification::action_for_id),
            SurfaceKind::LiveActivity => live_activity::intent_for(control, phase)
                .and_then(live_activity::action_for_intent),
            SurfaceKind::InApp => SurfaceAction::for_control(control, phase),
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Surface
// ============================================================================

/// A view of the timer that lives outside the core.
///
/// Calls never block on the timer; failures are reported back to the hub,
/// which logs them and carries on.
pub trait Surface: Send {
    /// Kind of this surface.
    fn kind(&self) -> SurfaceKind;

    /// Creates the OS-level presence for a new run.
    fn create(&mut self, update: &TimerUpdate, view: &TimerView) -> Result<(), SurfaceError>;

    /// Applies a snapshot to the existing presence.
    fn update(&mut self, update: &TimerUpdate, view: &TimerView) -> Result<(), SurfaceError>;

    /// Removes the OS-level presence.
    fn teardown(&mut self);

    /// Returns true while the presence exists.
    fn is_presented(&self) -> bool;
}

// ============================================================================
// MockSurface
// ============================================================================

/// A recorded call on a [`MockSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    /// `create` with the rendered view
    Create(TimerView),
    /// `update` with the rendered view
    Update(TimerView),
    /// `teardown`
    Teardown,
}

#[derive(Debug, Default)]
struct MockInner {
    calls: Mutex<Vec<SurfaceCall>>,
    presented: AtomicBool,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
}

/// Surface that records calls, for tests.
///
/// Clones share the same recording so a test can keep a handle after the
/// surface is attached to a hub.
#[derive(Debug, Clone)]
pub struct MockSurface {
    kind: SurfaceKind,
    inner: Arc<MockInner>,
}

impl MockSurface {
    /// Creates a mock surface of the given kind.
    #[must_use]
    pub fn new(kind: SurfaceKind) -> Self {
        Self {
            kind,
            inner: Arc::new(MockInner::default()),
        }
    }

    /// Makes `create` fail with [`SurfaceError::Unavailable`].
    pub fn set_fail_create(&self, fail: bool) {
        self.inner.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Makes `update` fail with [`SurfaceError::RenderFailed`].
    pub fn set_fail_update(&self, fail: bool) {
        self.inner.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.lock_calls().clone()
    }

    /// Returns the most recently rendered view.
    #[must_use]
    pub fn last_view(&self) -> Option<TimerView> {
        self.lock_calls().iter().rev().find_map(|call| match call {
            SurfaceCall::Create(view) | SurfaceCall::Update(view) => Some(view.clone()),
            SurfaceCall::Teardown => None,
        })
    }

    /// Clears the recording.
    pub fn clear_recorded(&self) {
        self.lock_calls().clear();
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<SurfaceCall>> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Surface for MockSurface {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn create(&mut self, _update: &TimerUpdate, view: &TimerView) -> Result<(), SurfaceError> {
        if self.inner.fail_create.load(Ordering::SeqCst) {
            return Err(SurfaceError::Unavailable("mock refused".to_string()));
        }
        self.lock_calls().push(SurfaceCall::Create(view.clone()));
        self.inner.presented.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn update(&mut self, _update: &TimerUpdate, view: &TimerView) -> Result<(), SurfaceError> {
        if self.inner.fail_update.load(Ordering::SeqCst) {
            return Err(SurfaceError::RenderFailed("mock failure".to_string()));
        }
        self.lock_calls().push(SurfaceCall::Update(view.clone()));
        Ok(())
    }

    fn teardown(&mut self) {
        self.lock_calls().push(SurfaceCall::Teardown);
        self.inner.presented.store(false, Ordering::SeqCst);
    }

    fn is_presented(&self) -> bool {
        self.inner.presented.load(Ordering::SeqCst)
    }
}
