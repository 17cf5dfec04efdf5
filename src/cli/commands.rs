//! Command definitions for the live timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::presentation::Control;
use crate::surface::SurfaceKind;
use crate::types::MAX_LIMIT_SECONDS;

// ============================================================================
// CLI Structure
// ============================================================================

/// Live timer CLI
#[derive(Parser, Debug)]
#[command(
    name = "live-timer",
    version,
    about = "A timer that stays live in notifications and Live Activities",
    long_about = "Controls a timestamp-anchored timer hosted by a background daemon.\n\
                  The daemon keeps the persistent notification, the Live Activity and \n\
                  the in-app view in sync with one authoritative clock.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Socket path of the daemon (defaults to ~/.live-timer/live-timer.sock)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a new run
    Start(StartArgs),

    /// Pause the running timer
    Pause,

    /// Resume a paused timer
    Resume,

    /// Start the current run over
    Restart(RestartArgs),

    /// Stop the timer and return to idle
    Reset,

    /// Finish the current run now
    Finish,

    /// Show current timer status
    Status,

    /// Press a button on one of the timer's surfaces
    Press {
        /// Surface the button belongs to
        #[arg(value_enum)]
        surface: SurfaceKind,

        /// Button to press
        #[arg(value_enum)]
        control: Control,
    },

    /// Run as daemon (background service)
    Daemon(DaemonArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for the start command
#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    /// Run duration in seconds (1-86400)
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LIMIT_SECONDS))
    )]
    pub duration: u32,
}

/// Arguments for the restart command
#[derive(Args, Debug, Clone, Default)]
pub struct RestartArgs {
    /// New run duration in seconds; keeps the previous one when omitted
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LIMIT_SECONDS))
    )]
    pub duration: Option<u32>,
}

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Sampler interval in milliseconds (10-60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(10..=60_000))]
    pub sample_ms: Option<u64>,

    /// Do not post the persistent notification
    #[arg(long)]
    pub no_notification: bool,

    /// Do not show a Live Activity
    #[arg(long)]
    pub no_live_activity: bool,

    /// Treat Live Activities as disabled by the OS
    #[arg(long)]
    pub activities_disabled: bool,
}

// ============================================================================
// Tests
// ============================================================================
