//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Live document viewer host
#[derive(Parser, Debug)]
#[command(
    name = "marklive",
    version = env!("CARGO_PKG_VERSION"),
    about = "Live document viewer host",
    long_about = "Watches a document and keeps a display process in sync, \
                  preserving scroll position across automatic reloads.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve FILE to a display process over stdio (JSON lines)
    View {
        /// Document to display
        file: PathBuf,

        /// Debounce window in milliseconds (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Content-ready timeout in milliseconds (overrides config)
        #[arg(long)]
        content_ready_timeout_ms: Option<u64>,
    },

    /// Print watch events for FILE until interrupted
    Watch {
        /// File to watch
        file: PathBuf,

        /// Debounce window in milliseconds (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Display active settings
    Config,
}
