//! Live Timer Library
//!
//! A timestamp-anchored timer kept live on several surfaces at once.
//! It includes:
//! - Timer engine with Idle, Running, Paused and Finished phases
//! - Presentation of elapsed time, progress and the visible controls
//! - Surfaces: persistent notification, Live Activity and in-app view
//! - An action bus that routes surface button presses back to the timer
//! - IPC server/client for daemon-CLI communication

pub mod cli;
pub mod clock;
pub mod daemon;
pub mod messaging;
pub mod presentation;
pub mod surface;
pub mod types;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use daemon::{TimerEngine, TimerError, TimerEvent, TimerService, TimerUpdate};
pub use messaging::{action_bus, ActionSender, SurfaceAction, TimerBridge};
pub use presentation::{format_elapsed, Control, ControlSet, Presenter, TimerView, FINISHED_MESSAGE};
pub use surface::{
    InAppSurface, LiveActivitySurface, MockSurface, NotificationSurface, Surface, SurfaceError,
    SurfaceHub, SurfaceKind,
};
pub use types::{
    DaemonConfig, IpcRequest, IpcResponse, ResponseData, StartParams, TimerConfig, TimerPhase,
    TimerState,
};
