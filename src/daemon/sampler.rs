//! Periodic sampler that drives the timer while it runs.
//!
//! The sampler never accumulates time; each tick hands the current clock
//! reading to [`TimerEngine::tick`], which derives elapsed time from the
//! run's anchor timestamp. A late or skipped tick therefore costs nothing
//! but a missed redraw.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use super::timer::{TickOutcome, TimerEngine};
use crate::clock::SharedClock;

/// Cancellable periodic task calling [`TimerEngine::tick`].
#[derive(Debug, Default)]
pub struct Sampler {
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    /// Creates a stopped sampler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts sampling `engine` every `period`, replacing any running task.
    pub fn start(&mut self, engine: Arc<Mutex<TimerEngine>>, clock: SharedClock, period: Duration) {
        self.stop();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let outcome = engine.lock().await.tick(clock.now_ms());
                match outcome {
                    TickOutcome::Running => continue,
                    TickOutcome::Finished => {
                        tracing::debug!("sampler stopping: run finished");
                        break;
                    }
                    TickOutcome::Inactive => {
                        tracing::debug!("sampler stopping: timer not running");
                        break;
                    }
                }
            }
        });

        tracing::debug!(period_ms = period.as_millis() as u64, "sampler started");
        self.handle = Some(handle);
    }

    /// Stops sampling. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
                tracing::debug!("sampler stopped");
            }
        }
    }

    /// Returns true while the sampling task is alive.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::daemon::timer::TimerEvent;

    fn create_engine() -> (
        Arc<Mutex<TimerEngine>>,
        tokio::sync::broadcast::Receiver<crate::daemon::timer::TimerUpdate>,
    ) {
        let (engine, rx) = TimerEngine::with_channel();
        (Arc::new(Mutex::new(engine)), rx)
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut sampler = Sampler::new();
        assert!(!sampler.is_active());
        sampler.stop();
        sampler.stop();
        assert!(!sampler.is_active());
    }

    #[tokio::test]
    async fn test_ticks_until_finished() {
        let (engine, mut rx) = create_engine();
        let clock = Arc::new(ManualClock::new(0));
        engine.lock().await.start(0, 1).unwrap();
        let _ = rx.recv().await;

        let mut sampler = Sampler::new();
        sampler.start(engine.clone(), clock.clone(), Duration::from_millis(10));
        assert!(sampler.is_active());

        clock.set(500);
        assert_eq!(rx.recv().await.unwrap().event, TimerEvent::Tick);

        clock.set(1_000);
        loop {
            let update = rx.recv().await.unwrap();
            if update.event == TimerEvent::Finished {
                break;
            }
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!sampler.is_active());
        assert!(engine.lock().await.get_state().is_finished());
    }

    #[tokio::test]
    async fn test_stop_halts_ticks() {
        let (engine, mut rx) = create_engine();
        let clock = Arc::new(ManualClock::new(0));
        engine.lock().await.start(0, 60).unwrap();
        let _ = rx.recv().await;

        let mut sampler = Sampler::new();
        sampler.start(engine.clone(), clock, Duration::from_millis(10));
        assert_eq!(rx.recv().await.unwrap().event, TimerEvent::Tick);

        sampler.stop();
        tokio::time::sleep(Duration::from_millis(30)).await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(rx.try_recv().is_err());
        assert!(!sampler.is_active());
    }
}
