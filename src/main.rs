//! CLI entry point for the live strip-chart viewer.
//!
//! Two modes:
//! - `view` (the default): follow the newest session bucket file and render
//!   the live trace.
//! - `feed`: generate synthetic samples into bucket files, standing in for
//!   the ingest service during development.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ecg_strip::config::{RendererKind, Settings};
use ecg_strip::feed::FeedOptions;
use ecg_strip::{app, feed, logging};

#[derive(Parser)]
#[command(name = "ecg-strip")]
#[command(about = "Live clinical strip-chart viewer for streaming biosignal data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the newest session file and render the live trace
    View {
        /// Configuration file
        #[arg(long, default_value = "config/default.toml")]
        config: PathBuf,

        /// Override the directory holding session bucket files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Follow only this session
        #[arg(long)]
        session: Option<String>,

        /// Rendering variant: strip or scope
        #[arg(long)]
        renderer: Option<String>,
    },

    /// Append synthetic samples to bucket files (stands in for the ingest service)
    Feed {
        /// Output directory
        #[arg(long, default_value = "./ecg_data")]
        dir: PathBuf,

        /// Session identifier
        #[arg(long, default_value = "sim")]
        session: String,

        /// Sample rate in Hz
        #[arg(long, default_value_t = 250.0)]
        rate: f64,

        /// Waveform amplitude in mV
        #[arg(long, default_value_t = 1.0)]
        amplitude_mv: f64,

        /// Uniform noise amplitude in mV
        #[arg(long, default_value_t = 0.05)]
        noise_mv: f64,

        /// Stop after this many seconds (default: run until interrupted)
        #[arg(long)]
        duration_s: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::View {
        config: PathBuf::from("config/default.toml"),
        data_dir: None,
        session: None,
        renderer: None,
    });

    match command {
        Commands::View {
            config,
            data_dir,
            session,
            renderer,
        } => run_view(config, data_dir, session, renderer),
        Commands::Feed {
            dir,
            session,
            rate,
            amplitude_mv,
            noise_mv,
            duration_s,
        } => {
            logging::init("info")?;
            let opts = FeedOptions {
                dir,
                session,
                sample_rate_hz: rate,
                amplitude_mv,
                noise_mv,
                duration_s,
                ..FeedOptions::default()
            };
            feed::run(&opts)?;
            Ok(())
        }
    }
}

fn run_view(
    config: PathBuf,
    data_dir: Option<PathBuf>,
    session: Option<String>,
    renderer: Option<String>,
) -> Result<()> {
    let mut settings = Settings::load_from(&config)?;

    if let Some(dir) = data_dir {
        settings.input.data_dir = dir;
    }
    if let Some(session) = session {
        settings.input.session_prefix = Some(session);
    }
    if let Some(renderer) = renderer {
        settings.display.renderer = match renderer.as_str() {
            "strip" => RendererKind::Strip,
            "scope" => RendererKind::Scope,
            other => return Err(anyhow!("Unknown renderer '{other}'. Must be strip or scope")),
        };
    }

    settings.validate()?;
    logging::init(&settings.application.log_level)?;

    tracing::info!(
        dir = %settings.input.data_dir.display(),
        session = settings.input.session_prefix.as_deref().unwrap_or("<any>"),
        renderer = ?settings.display.renderer,
        "starting viewer"
    );

    app::run(settings)?;
    Ok(())
}
