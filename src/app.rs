//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands::{self, RecordArgs};
use crate::logging;
use clap::{Parser, Subcommand};
use std::process;

/// A terminal microphone recorder with live waveform and frequency visualization
#[derive(Parser)]
#[command(name = "micwave")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "A terminal microphone recorder with live waveform and frequency visualization.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n    Record options can be used without explicitly saying 'record'.\n\nKEYS:\n    r       start / stop recording\n    space   pause / resume\n    q, Esc  quit\n\nEXAMPLES:\n    # Record with the spectrum bars\n    $ micwave --style frequencyBars\n\n    # Record ten seconds of mono audio into ./takes\n    $ micwave record --channels 1 --duration 10 -o takes\n\n    # Show saved recordings\n    $ micwave history")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/micwave/micwave.toml\n    Recordings:         ~/.local/share/micwave/recordings\n    Logs:               ~/.local/state/micwave/micwave.log.*"
)]
struct Cli {
    #[command(flatten)]
    record: RecordArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record audio with live visualization (default)
    ///
    /// Recording starts immediately. Press r to stop or start again,
    /// Space to pause, Enter/Escape/q to quit.
    #[command(visible_alias = "r")]
    Record(RecordArgs),

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in micwave.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Open configuration file in your preferred editor
    ///
    /// Creates the file with default values if it does not exist.
    #[command(visible_alias = "c")]
    Config,

    /// List saved recordings, or show one by id
    #[command(visible_alias = "h")]
    History {
        /// Recording id from the listing
        id: Option<String>,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Record(cli.record));

    // list-devices runs without file logging.
    if !matches!(command, Commands::ListDevices) {
        logging::init_logging()?;
    }

    match command {
        Commands::Record(args) => commands::handle_record(args).await?,
        Commands::ListDevices => {
            if let Err(e) = commands::handle_list_devices() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        Commands::Config => commands::handle_config()?,
        Commands::History { id } => commands::handle_history(id.as_deref())?,
    }

    Ok(())
}
