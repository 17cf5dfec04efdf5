//! Display utilities for the live timer CLI.
//!
//! This module provides formatted output for:
//! - Success messages
//! - Error messages
//! - Status display

use crate::types::{IpcResponse, ResponseData};

/// Width of the status progress bar in cells.
const PROGRESS_BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows a success message for timer start.
    pub fn show_start_success(response: &IpcResponse) {
        println!("> Timer started");
        Self::show_limit(response);
    }

    /// Shows a success message for timer pause.
    pub fn show_pause_success(response: &IpcResponse) {
        println!("|| Timer paused");
        Self::show_time(response);
    }

    /// Shows a success message for timer resume.
    pub fn show_resume_success(response: &IpcResponse) {
        println!("> Timer resumed");
        Self::show_time(response);
    }

    /// Shows a success message for timer restart.
    pub fn show_restart_success(response: &IpcResponse) {
        println!(">> Timer restarted");
        Self::show_limit(response);
    }

    /// Shows a success message for timer reset.
    pub fn show_reset_success(_response: &IpcResponse) {
        println!("[] Timer reset");
    }

    /// Shows a success message for timer finish.
    pub fn show_finish_success(response: &IpcResponse) {
        let message = response
            .data
            .as_ref()
            .and_then(|data| data.message.as_deref())
            .unwrap_or("Timer finished");
        println!("* {}", message);
    }

    /// Shows the result of a surface button press.
    pub fn show_press_success(response: &IpcResponse) {
        println!("* {}", response.message);
        Self::show_time(response);
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        println!("Live timer status");
        println!("─────────────────────────────");
        match &response.data {
            Some(data) => {
                for line in Self::status_lines(data) {
                    println!("{}", line);
                }
            }
            None => println!("No timer state available"),
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    fn show_limit(response: &IpcResponse) {
        if let Some(limit) = response.data.as_ref().and_then(|data| data.limit_time) {
            println!("  Duration: {}s", limit);
        }
    }

    fn show_time(response: &IpcResponse) {
        if let Some(time) = response
            .data
            .as_ref()
            .and_then(|data| data.display_time.as_deref())
        {
            println!("  Elapsed: {}", time);
        }
    }

    /// Builds the status lines for the given response data.
    fn status_lines(data: &ResponseData) -> Vec<String> {
        let state = data.state.as_deref().unwrap_or("unknown");
        let mut lines = vec![format!("State: {}", state)];

        if let Some(time) = &data.display_time {
            match data.limit_time {
                Some(limit) => lines.push(format!("Elapsed: {} / {}s", time, limit)),
                None => lines.push(format!("Elapsed: {}", time)),
            }
        }
        if let Some(progress) = data.progress {
            lines.push(format!(
                "Progress: {} {:>3}%",
                Self::progress_bar(progress, PROGRESS_BAR_WIDTH),
                (progress * 100.0).round() as u32
            ));
        }
        if !data.controls.is_empty() {
            let controls: Vec<&str> = data.controls.iter().map(|c| c.as_str()).collect();
            lines.push(format!("Controls: {}", controls.join(", ")));
        }
        if let Some(message) = &data.message {
            lines.push(message.clone());
        }
        lines
    }

    /// Renders a fraction in `[0, 1]` as a fixed-width bar.
    fn progress_bar(fraction: f64, width: usize) -> String {
        let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as usize;
        format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
    }
}

// ============================================================================
// Tests
// ============================================================================
