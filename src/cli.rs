use clap::{Parser, Subcommand};
use localreel_common::DeliveryMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "localreel")]
#[command(author, version, about = "Stream media from a local directory")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose the media directory and remember it
    Select {
        /// Directory to use (prompts if omitted)
        dir: Option<PathBuf>,
    },

    /// Rescan the saved directory
    Scan,

    /// List media files in the saved directory
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a listed file by index
    Play {
        /// Index as shown by `list`
        index: usize,

        /// Delivery mode (defaults to stream.default_mode)
        #[arg(long, value_parser = parse_mode)]
        mode: Option<DeliveryMode>,
    },

    /// Forget the saved directory
    Forget,

    /// Serve the application shell from the offline cache
    Serve {
        /// Host to bind to (defaults to assets.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to assets.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

fn parse_mode(s: &str) -> Result<DeliveryMode, String> {
    s.parse::<DeliveryMode>().map_err(|e| e.to_string())
}
