//! Live Timer CLI
//!
//! Talks to the background daemon that owns the timer. The daemon keeps the
//! persistent notification, the Live Activity and the in-app view showing
//! the same elapsed time, and routes their button presses back to the timer.

use anyhow::Result;
use clap::{CommandFactory, Parser};

use live_timer::cli::{Cli, Commands, DaemonArgs, Display, IpcClient};
use live_timer::daemon::run_daemon;
use live_timer::types::DaemonConfig;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins over the verbose flag.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let client = match &cli.socket {
        Some(path) => IpcClient::with_socket_path(path.clone()),
        None => IpcClient::new(),
    };

    match cli.command {
        Some(Commands::Start(args)) => {
            let response = client.start(&args).await?;
            Display::show_start_success(&response);
        }
        Some(Commands::Pause) => {
            let response = client.pause().await?;
            Display::show_pause_success(&response);
        }
        Some(Commands::Resume) => {
            let response = client.resume().await?;
            Display::show_resume_success(&response);
        }
        Some(Commands::Restart(args)) => {
            let response = client.restart(&args).await?;
            Display::show_restart_success(&response);
        }
        Some(Commands::Reset) => {
            let response = client.reset().await?;
            Display::show_reset_success(&response);
        }
        Some(Commands::Finish) => {
            let response = client.finish().await?;
            Display::show_finish_success(&response);
        }
        Some(Commands::Status) => {
            let response = client.status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Press { surface, control }) => {
            let response = client.press(surface, control).await?;
            Display::show_press_success(&response);
        }
        Some(Commands::Daemon(args)) => {
            let config = daemon_config(DaemonConfig::from_env(), &cli.socket, &args);
            run_daemon(config).await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Applies command line overrides on top of the environment configuration.
fn daemon_config(
    mut config: DaemonConfig,
    socket: &Option<std::path::PathBuf>,
    args: &DaemonArgs,
) -> DaemonConfig {
    if let Some(path) = socket {
        config.socket_path = path.clone();
    }
    if let Some(ms) = args.sample_ms {
        config.sample_interval_ms = ms;
    }
    if args.no_notification {
        config.notification_enabled = false;
    }
    if args.no_live_activity {
        config.live_activity_enabled = false;
    }
    if args.activities_disabled {
        config.live_activity_authorized = false;
    }
    config
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
