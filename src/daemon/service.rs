//! The authoritative timer with its sampler.
//!
//! [`TimerService`] is the one handle every caller goes through: the IPC
//! handler, the messaging bridge and the daemon shutdown path. Each operation
//! reads the clock, applies the transition and starts or stops the sampler
//! while holding the engine lock, so transitions never interleave.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::time::Duration;

use super::sampler::Sampler;
use super::timer::{TimerEngine, TimerError, TimerUpdate, UPDATE_CHANNEL_CAPACITY};
use crate::clock::SharedClock;
use crate::messaging::SurfaceAction;
use crate::types::TimerState;

/// Timer engine plus the sampler that drives it.
pub struct TimerService {
    engine: Arc<Mutex<TimerEngine>>,
    sampler: Mutex<Sampler>,
    updates: broadcast::Sender<TimerUpdate>,
    clock: SharedClock,
    sample_interval: Duration,
}

impl TimerService {
    /// Creates an idle service sampling every `sample_interval`.
    pub fn new(clock: SharedClock, sample_interval: Duration) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            engine: Arc::new(Mutex::new(TimerEngine::new(updates.clone()))),
            sampler: Mutex::new(Sampler::new()),
            updates,
            clock,
            sample_interval,
        }
    }

    /// Subscribes to timer updates.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerUpdate> {
        self.updates.subscribe()
    }

    /// Current clock reading in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Starts a run, anchored at `started_at` or at the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not idle, the duration is invalid or
    /// `started_at` is later than the current time.
    pub async fn start(
        &self,
        limit_seconds: u32,
        started_at: Option<u64>,
    ) -> Result<TimerState, TimerError> {
        let mut engine = self.engine.lock().await;
        let now = self.clock.now_ms();
        engine.start_at(started_at.unwrap_or(now), now, limit_seconds)?;
        self.start_sampler().await;
        Ok(engine.get_state().clone())
    }

    /// Pauses at `timestamp` or at the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not running or `timestamp` lies
    /// outside the run.
    pub async fn pause(&self, timestamp: Option<u64>) -> Result<TimerState, TimerError> {
        let mut engine = self.engine.lock().await;
        let now = self.clock.now_ms();
        match timestamp {
            Some(at_ms) => engine.pause_at(at_ms, now)?,
            None => engine.pause(now)?,
        }
        self.sampler.lock().await.stop();
        Ok(engine.get_state().clone())
    }

    /// Resumes a paused run.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not paused.
    pub async fn resume(&self) -> Result<TimerState, TimerError> {
        let mut engine = self.engine.lock().await;
        engine.resume(self.clock.now_ms())?;
        self.start_sampler().await;
        Ok(engine.get_state().clone())
    }

    /// Starts the run over, optionally with a new duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is idle or the duration is invalid.
    pub async fn restart(&self, limit_seconds: Option<u32>) -> Result<TimerState, TimerError> {
        let mut engine = self.engine.lock().await;
        engine.restart(self.clock.now_ms(), limit_seconds)?;
        self.start_sampler().await;
        Ok(engine.get_state().clone())
    }

    /// Returns the timer to idle.
    pub async fn reset(&self) -> TimerState {
        let mut engine = self.engine.lock().await;
        engine.reset(self.clock.now_ms());
        self.sampler.lock().await.stop();
        engine.get_state().clone()
    }

    /// Forces the terminal state now.
    ///
    /// # Errors
    ///
    /// Returns an error unless the timer is running or paused.
    pub async fn finish(&self) -> Result<TimerState, TimerError> {
        let mut engine = self.engine.lock().await;
        engine.finish(self.clock.now_ms())?;
        self.sampler.lock().await.stop();
        Ok(engine.get_state().clone())
    }

    /// Applies an action that came from a surface.
    ///
    /// # Errors
    ///
    /// Returns the transition error; callers on the surface side ignore it.
    pub async fn apply(&self, action: SurfaceAction) -> Result<TimerState, TimerError> {
        match action {
            SurfaceAction::Pause => self.pause(None).await,
            SurfaceAction::Resume => self.resume().await,
            SurfaceAction::Restart => self.restart(None).await,
            SurfaceAction::Reset => Ok(self.reset().await),
            SurfaceAction::Finish => self.finish().await,
        }
    }

    /// Returns the current state together with the time it was read at.
    pub async fn status(&self) -> (TimerState, u64) {
        let engine = self.engine.lock().await;
        (engine.get_state().clone(), self.clock.now_ms())
    }

    /// Returns true while the sampler task is alive.
    pub async fn is_sampling(&self) -> bool {
        self.sampler.lock().await.is_active()
    }

    async fn start_sampler(&self) {
        self.sampler.lock().await.start(
            self.engine.clone(),
            self.clock.clone(),
            self.sample_interval,
        );
    }
}
