//! Presentation adapter for the live timer.
//!
//! This module projects a [`TimerState`] sampled at an instant into the view
//! model every surface draws:
//! - Display time (`m:ss`, built from tens and units digits)
//! - Progress fraction in `[0, 1]`
//! - The set of controls the current phase permits
//!
//! The mapping lives in one place so the in-app view, the notification
//! layout and the Live Activity cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{TimerPhase, TimerState};

// ============================================================================
// Constants
// ============================================================================

/// Text shown by every surface once a run has finished.
pub const FINISHED_MESSAGE: &str = "Well done!";

// ============================================================================
// Control
// ============================================================================

/// A user-facing timer control.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    /// Start from idle or resume from pause
    Play,
    /// Pause a running timer
    Pause,
    /// Start the run over
    Restart,
    /// Return to idle
    Reset,
}

impl Control {
    const ALL: [Control; 4] = [Control::Play, Control::Pause, Control::Restart, Control::Reset];

    fn bit(self) -> u8 {
        match self {
            Control::Play => 0b0001,
            Control::Pause => 0b0010,
            Control::Restart => 0b0100,
            Control::Reset => 0b1000,
        }
    }

    /// Returns the string representation of the control.
    pub fn as_str(&self) -> &'static str {
        match self {
            Control::Play => "play",
            Control::Pause => "pause",
            Control::Restart => "restart",
            Control::Reset => "reset",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ControlSet
// ============================================================================

/// A small set of controls, iterated in a fixed order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Control>", from = "Vec<Control>")]
pub struct ControlSet(u8);

impl ControlSet {
    /// Creates an empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Returns the set with `control` added.
    #[must_use]
    pub fn with(self, control: Control) -> Self {
        Self(self.0 | control.bit())
    }

    /// Returns true if `control` is in the set.
    pub fn contains(&self, control: Control) -> bool {
        self.0 & control.bit() != 0
    }

    /// Returns the number of controls in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns true if no control is visible.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates the controls in play, pause, restart, reset order.
    pub fn iter(&self) -> impl Iterator<Item = Control> + '_ {
        Control::ALL.into_iter().filter(|c| self.contains(*c))
    }

    /// Controls a phase permits.
    ///
    /// - Idle: play
    /// - Running: pause
    /// - Paused: play, restart
    /// - Finished: restart, reset
    pub fn for_phase(phase: TimerPhase) -> Self {
        let set = Self::empty();
        match phase {
            TimerPhase::Idle => set.with(Control::Play),
            TimerPhase::Running => set.with(Control::Pause),
            TimerPhase::Paused => set.with(Control::Play).with(Control::Restart),
            TimerPhase::Finished => set.with(Control::Restart).with(Control::Reset),
        }
    }
}

impl From<ControlSet> for Vec<Control> {
    fn from(set: ControlSet) -> Self {
        set.iter().collect()
    }
}

impl From<Vec<Control>> for ControlSet {
    fn from(controls: Vec<Control>) -> Self {
        controls
            .into_iter()
            .fold(ControlSet::empty(), |set, control| set.with(control))
    }
}

// ============================================================================
// TimerView
// ============================================================================

/// Renderable projection of the timer at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    /// Phase the view was rendered from
    pub phase: TimerPhase,
    /// Formatted elapsed time (`m:ss`)
    pub display_time: String,
    /// Progress fraction in `[0, 1]`
    pub progress_fraction: f64,
    /// Controls that should be shown
    pub visible_controls: ControlSet,
    /// Terminal message for finished runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TimerView {
    /// Text a surface should put in its primary label.
    pub fn headline(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.display_time)
    }
}

// ============================================================================
// Presenter
// ============================================================================

/// Builds [`TimerView`]s from timer state.
#[derive(Debug, Default, Clone, Copy)]
pub struct Presenter;

impl Presenter {
    /// Renders `state` as seen at `now_ms`.
    pub fn render(state: &TimerState, now_ms: u64) -> TimerView {
        let finished = state.is_finished();
        TimerView {
            phase: state.phase,
            display_time: format_elapsed(state.elapsed_seconds(now_ms)),
            progress_fraction: if finished { 1.0 } else { state.progress(now_ms) },
            visible_controls: ControlSet::for_phase(state.phase),
            message: finished.then(|| FINISHED_MESSAGE.to_string()),
        }
    }
}

/// Formats elapsed seconds as `minutes:TU`.
///
/// The seconds part is split into a tens digit (`(secs / 10) % 6`) and a
/// units digit (`secs % 10`); minutes are not wrapped into hours.
pub fn format_elapsed(elapsed_seconds: u64) -> String {
    let minutes = elapsed_seconds / 60;
    let tens = (elapsed_seconds / 10) % 6;
    let units = elapsed_seconds % 10;
    format!("{}:{}{}", minutes, tens, units)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // format_elapsed Tests
    // ------------------------------------------------------------------------

    mod format_tests {
        use super::*;

        #[test]
        fn test_zero() {
            assert_eq!(format_elapsed(0), "0:00");
        }

        #[test]
        fn test_single_digit_seconds() {
            assert_eq!(format_elapsed(4), "0:04");
        }

        #[test]
        fn test_tens_digit() {
            assert_eq!(format_elapsed(59), "0:59");
            assert_eq!(format_elapsed(65), "1:05");
        }

        #[test]
        fn test_minutes_do_not_wrap_into_hours() {
            assert_eq!(format_elapsed(3_600), "60:00");
            assert_eq!(format_elapsed(750), "12:30");
        }
    }

    // ------------------------------------------------------------------------
    // ControlSet Tests
    // ------------------------------------------------------------------------

    mod control_set_tests {
        use super::*;

        #[test]
        fn test_phase_mapping() {
            let idle: Vec<Control> = ControlSet::for_phase(TimerPhase::Idle).into();
            assert_eq!(idle, vec![Control::Play]);

            let running: Vec<Control> = ControlSet::for_phase(TimerPhase::Running).into();
            assert_eq!(running, vec![Control::Pause]);

            let paused: Vec<Control> = ControlSet::for_phase(TimerPhase::Paused).into();
            assert_eq!(paused, vec![Control::Play, Control::Restart]);

            let finished: Vec<Control> = ControlSet::for_phase(TimerPhase::Finished).into();
            assert_eq!(finished, vec![Control::Restart, Control::Reset]);
        }

        #[test]
        fn test_contains_and_len() {
            let set = ControlSet::empty().with(Control::Reset).with(Control::Play);
            assert!(set.contains(Control::Play));
            assert!(set.contains(Control::Reset));
            assert!(!set.contains(Control::Pause));
            assert_eq!(set.len(), 2);
            assert!(!set.is_empty());
            assert!(ControlSet::empty().is_empty());
        }

        #[test]
        fn test_serializes_as_list() {
            let set = ControlSet::for_phase(TimerPhase::Finished);
            let json = serde_json::to_string(&set).unwrap();
            assert_eq!(json, r#"["restart","reset"]"#);

            let back: ControlSet = serde_json::from_str(&json).unwrap();
            assert_eq!(back, set);
        }
    }

    // ------------------------------------------------------------------------
    // Presenter Tests
    // ------------------------------------------------------------------------

    mod presenter_tests {
        use super::*;

        #[test]
        fn test_idle_view() {
            let view = Presenter::render(&TimerState::new(), 1_000);
            assert_eq!(view.display_time, "0:00");
            assert_eq!(view.progress_fraction, 0.0);
            assert_eq!(view.visible_controls, ControlSet::for_phase(TimerPhase::Idle));
            assert_eq!(view.message, None);
        }

        #[test]
        fn test_running_view() {
            let mut state = TimerState::new();
            state.start(0, 10);

            let view = Presenter::render(&state, 2_500);
            assert_eq!(view.display_time, "0:02");
            assert!((view.progress_fraction - 0.25).abs() < f64::EPSILON);
            assert!(view.visible_controls.contains(Control::Pause));
            assert_eq!(view.headline(), "0:02");
        }

        #[test]
        fn test_running_view_past_limit_is_clamped() {
            let mut state = TimerState::new();
            state.start(0, 5);

            let view = Presenter::render(&state, 9_000);
            assert_eq!(view.display_time, "0:05");
            assert_eq!(view.progress_fraction, 1.0);
        }

        #[test]
        fn test_finished_view() {
            let mut state = TimerState::new();
            state.start(0, 5);
            state.finish(5_000);

            let view = Presenter::render(&state, 30_000);
            assert_eq!(view.display_time, "0:05");
            assert_eq!(view.progress_fraction, 1.0);
            assert_eq!(view.message.as_deref(), Some(FINISHED_MESSAGE));
            assert_eq!(view.headline(), FINISHED_MESSAGE);
            assert!(view.visible_controls.contains(Control::Restart));
            assert!(view.visible_controls.contains(Control::Reset));
        }
    }
}
