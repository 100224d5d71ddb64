// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "honey-snap")]
#[command(about = "Live camera filters: previews, countdown photos and filtered recordings")]
#[command(version = honey_snap::constants::app_info::version())]
struct Cli {
    /// Configuration file (default: ~/.config/honey-snap/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Capture device: /dev/videoN, test-pattern or image:<path>
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Do not mirror frames
    #[arg(long, global = true)]
    natural: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture devices
    List,

    /// List filter presets
    Filters,

    /// Render every filter preview and save the thumbnails
    Preview {
        /// Frames to render before saving
        #[arg(short, long, default_value = "30")]
        frames: u32,

        /// Output directory (default: the photo directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Take a photo after the countdown
    Photo {
        /// Preset active when the photo is taken
        #[arg(short, long)]
        filter: Option<String>,

        /// Preset to export the photo with, instead of the capture filter
        #[arg(long)]
        photo_filter: Option<String>,

        /// Also save the photo exactly as captured
        #[arg(long)]
        original: bool,

        /// Output file path (default: ~/Pictures/Honey Snap/honey-snap-photo_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a filtered video
    Record {
        /// Recording duration in seconds
        #[arg(short = 't', long, default_value = "5")]
        duration: f64,

        /// Preset active when recording starts
        #[arg(short, long)]
        filter: Option<String>,

        /// Preset to switch to during the recording
        #[arg(long, requires = "switch_after")]
        switch_to: Option<String>,

        /// Seconds after the start at which to switch presets
        #[arg(long)]
        switch_after: Option<f64>,

        /// Output file path (default: ~/Videos/Honey Snap/honey-snap-video_TIMESTAMP.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ask the camera for microphone tracks too (devices may offer none)
        #[arg(long)]
        audio: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=honey_snap=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let options = cli::CommonOptions {
        config: cli.config,
        device: cli.device,
        natural: cli.natural,
    };

    match cli.command {
        Commands::List => cli::list_devices(),
        Commands::Filters => cli::list_filters(),
        Commands::Preview { frames, output } => cli::save_previews(&options, frames, output),
        Commands::Photo {
            filter,
            photo_filter,
            original,
            output,
        } => cli::take_photo(&options, filter, photo_filter, original, output),
        Commands::Record {
            duration,
            filter,
            switch_to,
            switch_after,
            output,
            audio,
        } => cli::record_video(
            &options,
            cli::RecordPlan {
                duration,
                filter,
                switch: switch_to.zip(switch_after),
                audio,
            },
            output,
        ),
    }
}
