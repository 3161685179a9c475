//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "card-stash")]
#[command(about = "Download and localize card images for per-Pokémon record files", long_about = None)]
pub(crate) struct Cli {
    /// Settings file to use instead of ~/.config/card-stash/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log output to a file (ANSI codes stripped)
    #[arg(long, global = true)]
    pub logfile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Data and image locations; override the settings file.
#[derive(Args, Clone, Default)]
pub(crate) struct DirArgs {
    /// Directory containing the record JSON files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory to save images in (artifacts go to <image-dir>/small)
    #[arg(long)]
    pub image_dir: Option<PathBuf>,
}

#[derive(Args, Clone, Default)]
pub(crate) struct AcquireArgs {
    #[command(flatten)]
    pub dirs: DirArgs,

    /// Only process this record (case-insensitive, e.g. pikachu)
    #[arg(short, long)]
    pub record: Option<String>,

    /// Records per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Average pause between batches in seconds (jittered by 20%)
    #[arg(long)]
    pub batch_break: Option<f64>,

    /// Minimum delay before each attempt, in seconds
    #[arg(long)]
    pub min_delay: Option<f64>,

    /// Maximum delay before each attempt, in seconds
    #[arg(long)]
    pub max_delay: Option<f64>,

    /// Retries after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Records processed concurrently inside a batch (1-4)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Do not rewrite the record files with local image paths
    #[arg(long)]
    pub no_update: bool,

    /// Retry sources listed in problem_urls.txt instead of skipping them
    #[arg(long)]
    pub no_skip_problem_files: bool,

    /// Leave failed images untouched instead of pointing them at a placeholder
    #[arg(long)]
    pub no_placeholder: bool,

    /// Custom placeholder image to copy into the image directory
    #[arg(long)]
    pub placeholder_path: Option<PathBuf>,

    /// Render card pages to extract images that cannot be downloaded directly
    #[arg(long)]
    pub render: bool,

    /// Disable the acquire log file
    #[arg(long)]
    pub no_log: bool,

    /// Do not regenerate the publication file after the run
    #[arg(long)]
    pub no_publish: bool,

    /// Publication file written after a completed run
    #[arg(short, long, default_value = "pokemonData.js")]
    pub output: PathBuf,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Download card images and point the record files at them
    Acquire(AcquireArgs),

    /// List cards whose small image is missing
    Missing {
        #[command(flatten)]
        dirs: DirArgs,

        /// Only check this record
        #[arg(short, long)]
        record: Option<String>,
    },

    /// Combine all record files into a single JavaScript data file
    Publish {
        #[command(flatten)]
        dirs: DirArgs,

        /// Output file
        #[arg(short, long, default_value = "pokemonData.js")]
        output: PathBuf,
    },

    /// Manage the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Print the settings file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a settings file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
