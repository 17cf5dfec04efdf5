//! Surface error types.

use thiserror::Error;

/// Errors a surface can report while presenting the timer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The surface cannot show anything right now (disabled, not authorized).
    #[error("surface unavailable: {0}")]
    Unavailable(String),

    /// An update could not be applied to the presented surface.
    #[error("failed to render surface: {0}")]
    RenderFailed(String),
}

impl SurfaceError {
    /// Returns true if the timer can keep running without this surface.
    ///
    /// Surface failures never stop the timer, so this is always true today;
    /// callers still check it before deciding to skip a surface.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::RenderFailed(_))
    }

    /// Returns true if the OS refused to show the surface.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Returns a user-facing hint for resolving the error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "enable live activities and notifications for the app",
            Self::RenderFailed(_) => "the surface resynchronises on the next update",
        }
    }
}
