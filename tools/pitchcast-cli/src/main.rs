//! Pitchcast CLI: cricket commentary videos from match data.
//!
//! Usage:
//!   pitchcast run [OPTIONS]     Run the full pipeline
//!   pitchcast scripts           Write the commentary segments
//!   pitchcast charts            Render chart images from saved scripts
//!   pitchcast avatars           Render avatar clips for saved scripts
//!   pitchcast compose           Compose and assemble saved avatar clips
//!   pitchcast check             Check toolchain and provider setup
//!
//! Exit codes: 0 on success (degraded runs included), 1 on failure,
//! 130 when interrupted.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pitchcast_common::clock::CancelFlag;
use pitchcast_common::config::{AppConfig, AvatarProvider};
use pitchcast_pipeline::PipelineError;

mod commands;

const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "pitchcast",
    about = "Generate cricket commentary videos with AI avatars",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/pitchcast/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Working directory for run state and the final video
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Avatar provider: heygen, d-id, offline
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Never call a remote provider
    #[arg(long, global = true)]
    offline: bool,

    /// Burn segment titles into the clips
    #[arg(long, global = true)]
    lower_thirds: bool,

    /// Background music mixed under the final video
    #[arg(long, global = true)]
    music: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage: scripts, charts, avatar clips, assembly
    Run,

    /// Write the commentary segments
    Scripts,

    /// Render chart images from the saved scripts
    Charts,

    /// Submit and poll avatar renders for the saved scripts
    Avatars,

    /// Compose and assemble the saved avatar clips
    Compose,

    /// Check toolchain availability and provider setup
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    pitchcast_common::logging::init_logging(&logging);

    let cancel = CancelFlag::new();
    install_interrupt_handler(cancel.clone());

    let result = match cli.command {
        Commands::Run => commands::run::run(config, cancel).await,
        Commands::Scripts => commands::stage::scripts(config),
        Commands::Charts => commands::stage::charts(config),
        Commands::Avatars => commands::stage::avatars(config, cancel).await,
        Commands::Compose => commands::stage::compose(config).await,
        Commands::Check => commands::check::run(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let interrupted = e
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_cancelled);
            if interrupted {
                eprintln!("Interrupted: {e}");
                ExitCode::from(EXIT_INTERRUPTED)
            } else {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}

/// Load config, then apply environment keys and CLI flags on top.
fn build_config(cli: &Cli) -> anyhow::Result<Arc<AppConfig>> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    }
    .with_env_overrides();

    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(raw) = &cli.provider {
        let provider = AvatarProvider::parse(raw)?;
        if provider != config.avatar.provider {
            config.avatar.api_key = api_key_env(provider).and_then(|var| std::env::var(var).ok());
        }
        config.avatar.provider = provider;
    }
    if cli.offline {
        config.avatar.provider = AvatarProvider::Offline;
    }
    if cli.lower_thirds {
        config.composition.lower_thirds = true;
    }
    if let Some(music) = &cli.music {
        config.composition.background_music = Some(music.clone());
    }

    Ok(Arc::new(config))
}

fn api_key_env(provider: AvatarProvider) -> Option<&'static str> {
    match provider {
        AvatarProvider::HeyGen => Some("HEYGEN_API_KEY"),
        AvatarProvider::DId => Some("DID_API_KEY"),
        AvatarProvider::Offline => None,
    }
}

/// First Ctrl+C stops the run at the next stage or poll round; a second one
/// exits immediately.
fn install_interrupt_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("\nStopping after the current step (Ctrl+C again to abort)...");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborted.");
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });
}
