//! Fan-out of timer updates to every attached surface.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::daemon::timer::{TimerEvent, TimerUpdate};
use crate::presentation::{Presenter, TimerView};

use super::{Surface, SurfaceError};

/// Delivers every [`TimerUpdate`] to the attached surfaces.
///
/// One surface failing never affects the others or the timer.
#[derive(Default)]
pub struct SurfaceHub {
    surfaces: Vec<Box<dyn Surface>>,
}

impl SurfaceHub {
    /// Creates a hub with no surfaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a surface.
    #[must_use]
    pub fn with_surface(mut self, surface: impl Surface + 'static) -> Self {
        self.attach(surface);
        self
    }

    /// Attaches a surface.
    pub fn attach(&mut self, surface: impl Surface + 'static) {
        tracing::debug!(surface = surface.kind().as_str(), "surface attached");
        self.surfaces.push(Box::new(surface));
    }

    /// Number of attached surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Returns true if no surface is attached.
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Applies one update to every surface.
    pub fn dispatch(&mut self, update: &TimerUpdate) {
        let view = Presenter::render(&update.state, update.at_ms);
        for surface in &mut self.surfaces {
            if let Err(e) = Self::apply(surface.as_mut(), update, &view) {
                tracing::warn!(
                    surface = surface.kind().as_str(),
                    event = update.event.as_str(),
                    "{} ({})",
                    e,
                    e.suggestion()
                );
            }
        }
    }

    fn apply(
        surface: &mut dyn Surface,
        update: &TimerUpdate,
        view: &TimerView,
    ) -> Result<(), SurfaceError> {
        match update.event {
            TimerEvent::Started | TimerEvent::Restarted => {
                if surface.is_presented() {
                    surface.teardown();
                }
                surface.create(update, view)
            }
            TimerEvent::Reset => {
                surface.teardown();
                Ok(())
            }
            _ if surface.is_presented() => surface.update(update, view),
            // Never came up (e.g. not authorized); wait for the next run.
            _ => Ok(()),
        }
    }

    /// Runs the hub on a background task until the channel closes.
    pub fn spawn(self, updates: broadcast::Receiver<TimerUpdate>) -> JoinHandle<Self> {
        tokio::spawn(self.run(updates))
    }

    /// Receives updates until the channel closes, then returns the hub.
    pub async fn run(mut self, mut updates: broadcast::Receiver<TimerUpdate>) -> Self {
        loop {
            match updates.recv().await {
                Ok(update) => self.dispatch(&update),
                Err(RecvError::Lagged(skipped)) => {
                    // Snapshots are absolute; the next one resynchronises.
                    tracing::warn!(skipped, "surfaces lagged behind timer updates");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("update channel closed, surface hub stopped");
        self
    }
}
