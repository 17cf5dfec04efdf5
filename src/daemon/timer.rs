//! Timer engine for the live timer.
//!
//! This module provides the single authoritative timer:
//! - State transitions (Idle → Running ⇄ Paused → Finished, Reset, Restart)
//! - Timestamp-anchored elapsed time
//! - Event fan-out to every attached surface

use tokio::sync::broadcast;

use crate::types::{TimerConfig, TimerPhase, TimerState};

/// Capacity of the update broadcast channel.
pub const UPDATE_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// TimerEvent
// ============================================================================

/// What changed in the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// A run was started from idle
    Started,
    /// Running timer paused
    Paused,
    /// Paused timer resumed
    Resumed,
    /// Current run replaced by a fresh one
    Restarted,
    /// Timer returned to idle
    Reset,
    /// Run reached its terminal state
    Finished,
    /// Periodic sample while running
    Tick,
}

impl TimerEvent {
    /// Returns the event name surfaces listen for.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerEvent::Started => "started",
            TimerEvent::Paused => "paused",
            TimerEvent::Resumed => "resumed",
            TimerEvent::Restarted => "restarted",
            TimerEvent::Reset => "reset",
            TimerEvent::Finished => "finished",
            TimerEvent::Tick => "tick",
        }
    }
}

// ============================================================================
// TimerUpdate
// ============================================================================

/// Snapshot pushed to every surface after a transition or sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerUpdate {
    /// What happened
    pub event: TimerEvent,
    /// State right after the event
    pub state: TimerState,
    /// When the snapshot was taken (ms since epoch)
    pub at_ms: u64,
}

// ============================================================================
// TimerError
// ============================================================================

/// Errors returned by timer operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// The operation is not allowed in the current phase.
    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        /// Operation that was attempted
        operation: &'static str,
        /// Phase the timer was in
        phase: TimerPhase,
    },

    /// The requested duration is out of range.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// A caller-supplied timestamp lies outside the range it must fall in.
    #[error("invalid {name} timestamp {at_ms}: {reason}")]
    InvalidTimestamp {
        /// Which timestamp was rejected
        name: &'static str,
        /// The rejected value (ms since epoch)
        at_ms: u64,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl TimerError {
    /// Returns true if the error left the timer untouched and can be ignored.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

// ============================================================================
// TickOutcome
// ============================================================================

/// Result of a sampler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer is not running; the sampler should stop
    Inactive,
    /// Timer is still running
    Running,
    /// This tick moved the timer to finished
    Finished,
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that owns the state and publishes updates.
pub struct TimerEngine {
    /// Current timer state
    state: TimerState,
    /// Fan-out channel to surfaces
    update_tx: broadcast::Sender<TimerUpdate>,
}

impl TimerEngine {
    /// Creates an idle engine publishing on `update_tx`.
    pub fn new(update_tx: broadcast::Sender<TimerUpdate>) -> Self {
        Self {
            state: TimerState::new(),
            update_tx,
        }
    }

    /// Creates an engine together with its own update channel.
    pub fn with_channel() -> (Self, broadcast::Receiver<TimerUpdate>) {
        let (tx, rx) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        (Self::new(tx), rx)
    }

    /// Subscribes a new listener to updates.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerUpdate> {
        self.update_tx.subscribe()
    }

    /// Starts a new run anchored at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not idle or the duration is invalid.
    pub fn start(&mut self, now_ms: u64, limit_seconds: u32) -> Result<(), TimerError> {
        self.start_at(now_ms, now_ms, limit_seconds)
    }

    /// Starts a new run anchored at `started_at`, observed at `now_ms`.
    ///
    /// The anchor may lie in the past but not after `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not idle, the duration is invalid or
    /// the anchor is in the future.
    pub fn start_at(
        &mut self,
        started_at: u64,
        now_ms: u64,
        limit_seconds: u32,
    ) -> Result<(), TimerError> {
        self.require(&[TimerPhase::Idle], "start")?;
        TimerConfig::new(limit_seconds)
            .validate()
            .map_err(TimerError::InvalidDuration)?;
        if started_at > now_ms {
            return Err(TimerError::InvalidTimestamp {
                name: "start",
                at_ms: started_at,
                reason: "later than the current time",
            });
        }

        self.state.start(started_at, limit_seconds);
        tracing::info!(limit_seconds, started_at, "timer started");
        self.publish(TimerEvent::Started, now_ms);
        Ok(())
    }

    /// Pauses the running timer at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not running.
    pub fn pause(&mut self, now_ms: u64) -> Result<(), TimerError> {
        // A clock that stepped back before the anchor pauses at zero elapsed.
        let at_ms = self.state.started_at.map_or(now_ms, |s| now_ms.max(s));
        self.pause_at(at_ms, at_ms.max(now_ms))
    }

    /// Pauses the running timer at `paused_at`, observed at `now_ms`.
    ///
    /// `paused_at` must lie between the run's anchor and `now_ms`, so the
    /// frozen elapsed time is one the run actually reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not running or `paused_at` is out of
    /// range.
    pub fn pause_at(&mut self, paused_at: u64, now_ms: u64) -> Result<(), TimerError> {
        self.require(&[TimerPhase::Running], "pause")?;
        let started_at = self.state.started_at.unwrap_or(paused_at);
        if paused_at < started_at {
            return Err(TimerError::InvalidTimestamp {
                name: "pause",
                at_ms: paused_at,
                reason: "earlier than the start of the run",
            });
        }
        if paused_at > now_ms {
            return Err(TimerError::InvalidTimestamp {
                name: "pause",
                at_ms: paused_at,
                reason: "later than the current time",
            });
        }

        self.state.pause(paused_at);
        tracing::info!(
            elapsed_ms = self.state.elapsed_ms(paused_at),
            "timer paused"
        );
        self.publish(TimerEvent::Paused, now_ms);
        Ok(())
    }

    /// Resumes the paused timer at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not paused.
    pub fn resume(&mut self, now_ms: u64) -> Result<(), TimerError> {
        if self.state.paused_at.is_none() {
            return Err(self.invalid("resume"));
        }
        self.require(&[TimerPhase::Paused], "resume")?;

        self.state.resume(now_ms);
        tracing::info!(
            elapsed_ms = self.state.elapsed_ms(now_ms),
            "timer resumed"
        );
        self.publish(TimerEvent::Resumed, now_ms);
        Ok(())
    }

    /// Discards the current run and starts a fresh one at `now_ms`.
    ///
    /// The previous duration is kept unless `limit_seconds` overrides it.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is idle or the duration is invalid.
    pub fn restart(&mut self, now_ms: u64, limit_seconds: Option<u32>) -> Result<(), TimerError> {
        if self.state.is_idle() {
            return Err(self.invalid("restart"));
        }
        let limit = match (limit_seconds, self.state.limit_time) {
            (Some(limit), _) | (None, Some(limit)) => limit,
            (None, None) => return Err(self.invalid("restart")),
        };
        TimerConfig::new(limit)
            .validate()
            .map_err(TimerError::InvalidDuration)?;

        self.state.start(now_ms, limit);
        tracing::info!(limit_seconds = limit, started_at = now_ms, "timer restarted");
        self.publish(TimerEvent::Restarted, now_ms);
        Ok(())
    }

    /// Returns the timer to idle from any phase.
    pub fn reset(&mut self, now_ms: u64) {
        self.state.reset();
        tracing::info!("timer reset");
        self.publish(TimerEvent::Reset, now_ms);
    }

    /// Forces the terminal state at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the timer is running or paused.
    pub fn finish(&mut self, now_ms: u64) -> Result<(), TimerError> {
        self.require(&[TimerPhase::Running, TimerPhase::Paused], "finish")?;

        self.state.finish(now_ms);
        tracing::info!(
            elapsed_ms = self.state.elapsed_ms(now_ms),
            "timer finished"
        );
        self.publish(TimerEvent::Finished, now_ms);
        Ok(())
    }

    /// Samples the timer at `now_ms`.
    ///
    /// Moves a running timer to finished the first time its elapsed time
    /// reaches the limit; otherwise publishes a tick snapshot.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        if !self.state.is_running() {
            return TickOutcome::Inactive;
        }

        if self.state.has_reached_limit(now_ms) {
            self.state.finish(now_ms);
            tracing::info!(limit_seconds = ?self.state.limit_time, "timer reached its limit");
            self.publish(TimerEvent::Finished, now_ms);
            return TickOutcome::Finished;
        }

        self.publish(TimerEvent::Tick, now_ms);
        TickOutcome::Running
    }

    /// Returns a reference to the current timer state.
    pub fn get_state(&self) -> &TimerState {
        &self.state
    }

    /// Returns a mutable reference to the timer state (for testing).
    #[cfg(test)]
    pub fn get_state_mut(&mut self) -> &mut TimerState {
        &mut self.state
    }

    fn require(&self, allowed: &[TimerPhase], operation: &'static str) -> Result<(), TimerError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> TimerError {
        TimerError::InvalidTransition {
            operation,
            phase: self.state.phase,
        }
    }

    fn publish(&self, event: TimerEvent, at_ms: u64) {
        let update = TimerUpdate {
            event,
            state: self.state.clone(),
            at_ms,
        };
        // No subscribers is fine: surfaces pick up the next update.
        if self.update_tx.send(update).is_err() {
            tracing::trace!(event = event.as_str(), "no surface listening");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
