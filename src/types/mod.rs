//! Core data types for the live timer.
//!
//! This module defines the data structures used for:
//! - Timer state and the timestamp math behind elapsed time
//! - Timer and daemon configuration with validation
//! - IPC request/response serialization

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::presentation::{Control, Presenter};
use crate::surface::SurfaceKind;

// ============================================================================
// Constants
// ============================================================================

/// Longest duration a single run may be configured for (24 hours).
pub const MAX_LIMIT_SECONDS: u32 = 86_400;

/// Default sampler cadence, matching the native services' one-second refresh.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1_000;

/// Default socket location relative to the home directory.
const DEFAULT_SOCKET_RELATIVE_PATH: &str = ".live-timer/live-timer.sock";

/// Environment variable overriding the socket path.
pub const SOCKET_ENV_VAR: &str = "LIVE_TIMER_SOCKET";

/// Environment variable overriding the sampler interval.
pub const SAMPLE_INTERVAL_ENV_VAR: &str = "LIVE_TIMER_SAMPLE_MS";

// ============================================================================
// TimerPhase
// ============================================================================

/// Represents the current phase of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// No run in progress
    #[default]
    Idle,
    /// Elapsed time is advancing
    Running,
    /// Elapsed time is frozen at the pause timestamp
    Paused,
    /// The run reached its limit (or was finished externally)
    Finished,
}

impl TimerPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Paused => "paused",
            TimerPhase::Finished => "finished",
        }
    }

    /// Returns true if a run exists in this phase.
    pub fn has_run(&self) -> bool {
        !matches!(self, TimerPhase::Idle)
    }
}

impl std::fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TimerConfig
// ============================================================================

/// Configuration for a single timer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Run duration in seconds (1-86400)
    #[serde(rename = "limitTime")]
    pub limit_seconds: u32,
}

impl TimerConfig {
    /// Creates a configuration for the given duration.
    pub fn new(limit_seconds: u32) -> Self {
        Self { limit_seconds }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.limit_seconds < 1 || self.limit_seconds > MAX_LIMIT_SECONDS {
            return Err(format!(
                "duration must be between 1 and {} seconds",
                MAX_LIMIT_SECONDS
            ));
        }
        Ok(())
    }
}

// ============================================================================
// DaemonConfig
// ============================================================================

fn default_socket_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_SOCKET_RELATIVE_PATH)
}

fn default_sample_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

/// Settings for the daemon that hosts the authoritative timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket the IPC server listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Sampler cadence in milliseconds (10-60000).
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Whether the persistent notification surface is attached.
    #[serde(default = "default_true")]
    pub notification_enabled: bool,

    /// Whether the Live Activity surface is attached.
    #[serde(default = "default_true")]
    pub live_activity_enabled: bool,

    /// Whether the OS allows Live Activities to be shown.
    #[serde(default = "default_true")]
    pub live_activity_authorized: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            sample_interval_ms: default_sample_interval_ms(),
            notification_enabled: true,
            live_activity_enabled: true,
            live_activity_authorized: true,
        }
    }
}

impl DaemonConfig {
    /// Builds the configuration from defaults plus environment overrides.
    ///
    /// Unparseable overrides are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var(SOCKET_ENV_VAR) {
            if !path.is_empty() {
                config.socket_path = PathBuf::from(path);
            }
        }

        if let Ok(raw) = std::env::var(SAMPLE_INTERVAL_ENV_VAR) {
            match raw.parse::<u64>() {
                Ok(ms) => config.sample_interval_ms = ms,
                Err(e) => tracing::warn!(value = %raw, "ignoring invalid {}: {}", SAMPLE_INTERVAL_ENV_VAR, e),
            }
        }

        config
    }

    /// Sets the socket path.
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// Sets the sampler interval.
    pub fn with_sample_interval_ms(mut self, ms: u64) -> Self {
        self.sample_interval_ms = ms;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_interval_ms < 10 || self.sample_interval_ms > 60_000 {
            return Err("sample interval must be between 10 and 60000 ms".to_string());
        }
        if self.socket_path.as_os_str().is_empty() {
            return Err("socket path must not be empty".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// The single authoritative timer state.
///
/// All elapsed-time values are derived from the difference of two absolute
/// timestamps, so a late or skipped sample never drifts the displayed time.
///
/// Invariants:
/// - `paused_at` is set iff `phase == Paused`
/// - `started_at` and `limit_time` are set iff `phase != Idle`
/// - `finished_at` is set iff `phase == Finished`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Current phase of the timer
    pub phase: TimerPhase,
    /// Logical zero of the run (ms since epoch)
    pub started_at: Option<u64>,
    /// When the pause happened (ms since epoch)
    pub paused_at: Option<u64>,
    /// Run duration in seconds
    pub limit_time: Option<u32>,
    /// When the run became terminal (ms since epoch)
    pub finished_at: Option<u64>,
}

impl TimerState {
    /// Creates an idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a fresh run anchored at `now_ms`.
    pub fn start(&mut self, now_ms: u64, limit_seconds: u32) {
        self.phase = TimerPhase::Running;
        self.started_at = Some(now_ms);
        self.paused_at = None;
        self.limit_time = Some(limit_seconds);
        self.finished_at = None;
    }

    /// Freezes elapsed time at `now_ms`.
    ///
    /// Only works while running; a second pause never recaptures `paused_at`.
    pub fn pause(&mut self, now_ms: u64) {
        if self.phase == TimerPhase::Running {
            self.paused_at = Some(now_ms);
            self.phase = TimerPhase::Paused;
        }
    }

    /// Resumes from pause by shifting the anchor forward by the paused gap.
    ///
    /// Does nothing without a recorded pause.
    pub fn resume(&mut self, now_ms: u64) {
        if self.phase != TimerPhase::Paused {
            return;
        }
        if let (Some(started_at), Some(paused_at)) = (self.started_at, self.paused_at.take()) {
            let gap = now_ms.saturating_sub(paused_at);
            self.started_at = Some(started_at.saturating_add(gap));
            self.phase = TimerPhase::Running;
        }
    }

    /// Moves the run to its terminal state at `at_ms`.
    ///
    /// The terminal timestamp is capped so frozen elapsed never exceeds the
    /// limit.
    pub fn finish(&mut self, at_ms: u64) {
        let Some(started_at) = self.started_at else {
            return;
        };
        let effective = match self.paused_at.take() {
            Some(paused_at) => paused_at,
            None => at_ms,
        };
        let cap = started_at.saturating_add(self.limit_ms());
        self.finished_at = Some(effective.clamp(started_at, cap));
        self.phase = TimerPhase::Finished;
    }

    /// Clears every field and returns to idle.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Limit in milliseconds, zero when idle.
    pub fn limit_ms(&self) -> u64 {
        u64::from(self.limit_time.unwrap_or(0)) * 1_000
    }

    /// Raw elapsed milliseconds at `now_ms`.
    ///
    /// While running this may exceed the limit until the finish transition is
    /// observed.
    pub fn raw_elapsed_ms(&self, now_ms: u64) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        match self.phase {
            TimerPhase::Idle => 0,
            TimerPhase::Running => now_ms.saturating_sub(started_at),
            TimerPhase::Paused => self
                .paused_at
                .map_or(0, |paused_at| paused_at.saturating_sub(started_at)),
            TimerPhase::Finished => self
                .finished_at
                .map_or(self.limit_ms(), |finished_at| finished_at.saturating_sub(started_at)),
        }
    }

    /// Elapsed milliseconds at `now_ms`, bounded by the limit.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.raw_elapsed_ms(now_ms).min(self.limit_ms())
    }

    /// Whole elapsed seconds at `now_ms`, bounded by the limit.
    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        self.elapsed_ms(now_ms) / 1_000
    }

    /// Fraction of the limit consumed, clamped to `[0, 1]`.
    pub fn progress(&self, now_ms: u64) -> f64 {
        let limit_ms = self.limit_ms();
        if limit_ms == 0 {
            return 0.0;
        }
        (self.raw_elapsed_ms(now_ms) as f64 / limit_ms as f64).clamp(0.0, 1.0)
    }

    /// Returns true once a running timer has consumed its whole limit.
    pub fn has_reached_limit(&self, now_ms: u64) -> bool {
        self.phase == TimerPhase::Running && self.raw_elapsed_ms(now_ms) >= self.limit_ms()
    }

    /// Returns true if the timer is running.
    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Returns true if the timer is paused.
    pub fn is_paused(&self) -> bool {
        self.phase == TimerPhase::Paused
    }

    /// Returns true if the timer is idle.
    pub fn is_idle(&self) -> bool {
        self.phase == TimerPhase::Idle
    }

    /// Returns true if the timer has finished.
    pub fn is_finished(&self) -> bool {
        self.phase == TimerPhase::Finished
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// Parameters for the start command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartParams {
    /// Run duration in seconds
    #[serde(rename = "limitTime")]
    pub limit_time: u32,
    /// Anchor timestamp chosen by the caller (ms since epoch)
    #[serde(rename = "startedAt", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Start a new run
    Start {
        /// Start parameters
        #[serde(flatten)]
        params: StartParams,
    },
    /// Pause the running timer
    Pause {
        /// Pause timestamp (ms since epoch); the daemon clock when absent
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },
    /// Resume the paused timer
    Resume,
    /// Restart the current run
    Restart {
        /// Overrides the previous duration when present
        #[serde(rename = "limitTime", skip_serializing_if = "Option::is_none")]
        limit_time: Option<u32>,
    },
    /// Return to idle
    Reset,
    /// Force the terminal state
    Finish,
    /// Query the current status
    Status,
    /// Simulate a button press on an OS surface
    Press {
        /// Surface the button belongs to
        surface: SurfaceKind,
        /// Button that was pressed
        control: Control,
    },
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// Current phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Anchor timestamp (ms since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    /// Pause timestamp (ms since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<u64>,
    /// Run duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_time: Option<u32>,
    /// Elapsed whole seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<u64>,
    /// Formatted elapsed time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_time: Option<String>,
    /// Progress fraction in [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Controls the current phase permits
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<Control>,
    /// Terminal message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResponseData {
    /// Creates response data from a timer state sampled at `now_ms`.
    pub fn from_timer_state(state: &TimerState, now_ms: u64) -> Self {
        let view = Presenter::render(state, now_ms);
        Self {
            state: Some(state.phase.as_str().to_string()),
            started_at: state.started_at,
            paused_at: state.paused_at,
            limit_time: state.limit_time,
            elapsed_seconds: Some(state.elapsed_seconds(now_ms)),
            display_time: Some(view.display_time),
            progress: Some(view.progress_fraction),
            controls: view.visible_controls.iter().collect(),
            message: view.message,
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for success responses.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================
