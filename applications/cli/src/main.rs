/// Riff - play a configured queue through the playback engine
use clap::{Parser, Subcommand};
use riff_cli::{config::AppConfig, driver, simulated::SimulatedBackend};
use riff_playback::{format_time, Player, RepeatMode};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "riff")]
#[command(about = "Riff playback engine driver", long_about = None)]
struct Cli {
    /// Configuration file path (default: riff.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the configured queue
    Play {
        /// Start with shuffle enabled
        #[arg(long)]
        shuffle: bool,

        /// Repeat mode: none, one or all
        #[arg(long, value_parser = parse_repeat)]
        repeat: Option<RepeatMode>,

        /// Simulated playback speed multiplier
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Validate the configuration and list the queue
    Queue,
}

fn parse_repeat(value: &str) -> Result<RepeatMode, String> {
    RepeatMode::parse(value)
        .ok_or_else(|| format!("invalid repeat mode '{value}' (none, one, all)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "riff_cli=info,riff_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            shuffle,
            repeat,
            speed,
        } => {
            if shuffle {
                config.playback.shuffle = true;
            }
            if let Some(repeat) = repeat {
                config.playback.repeat = repeat;
            }
            if let Some(speed) = speed {
                config.simulation.speed = speed;
            }
            config.validate()?;
            play(config).await?;
        }
        Commands::Queue => {
            config.validate()?;
            list_queue(&config);
        }
    }

    Ok(())
}

async fn play(config: AppConfig) -> anyhow::Result<()> {
    let tracks = config.queue_tracks();
    let backend = Arc::new(SimulatedBackend::new(&config.simulation, &tracks));
    let player = Player::spawn(config.playback.clone(), backend, tracks)?;

    tracing::info!(
        tracks = config.tracks.len(),
        shuffle = config.playback.shuffle,
        repeat = %config.playback.repeat,
        speed = config.simulation.speed,
        "Starting playback"
    );

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let outcome = driver::drive(&player, interrupt).await;
    tracing::debug!(?outcome, "Playback loop finished");

    player.shutdown().await?;
    Ok(())
}

fn list_queue(config: &AppConfig) {
    println!("{} tracks", config.tracks.len());
    for (i, track) in config.queue_tracks().iter().enumerate() {
        let kind = if track.source().is_some() {
            ""
        } else {
            " (metadata only)"
        };
        println!(
            "{:>3}. {} - {} [{}]{}",
            i + 1,
            track.title,
            track.artist,
            format_time(track.duration),
            kind
        );
    }
    println!(
        "shuffle: {}, repeat: {}, volume: {:.0}%",
        config.playback.shuffle,
        config.playback.repeat,
        config.playback.volume * 100.0
    );
}
