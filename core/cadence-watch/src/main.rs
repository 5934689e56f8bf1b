//! cadence-watch: page-event watcher for Cadence activity tracking.
//!
//! Reads interaction events from the browser-side collector over stdin
//! (native messaging style), classifies them into actions, and records
//! them as counter bumps against the Cadence daemon.
//!
//! ## Subcommands
//!
//! - `watch`: the stdin event loop
//! - `status`: fetch counters and render the progress panel

mod classify;
mod daemon_client;
mod dedup;
mod event;
mod logging;
mod status;
mod tracker;
mod watch;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cadence-watch")]
#[command(about = "Cadence posting-activity watcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume page events from stdin and record activity
    Watch,

    /// Show current counters and goal progress
    Status {
        /// Emit the panel as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch => {
            if let Err(e) = watch::run() {
                tracing::error!(error = %e, "cadence-watch watch failed");
                std::process::exit(1);
            }
        }
        Commands::Status { json } => {
            if let Err(e) = status::run(json) {
                eprintln!("cadence-watch: {}", e);
                std::process::exit(1);
            }
        }
    }
}
