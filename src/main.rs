//! Driveguard Fusion CLI

use clap::{Parser, Subcommand};
use driveguard_fusion::{
    classifier::HeuristicClassifier,
    config::EngineConfig,
    events::{EpisodeDispatcher, EventSink, JsonlSink, LogSink},
    registry::SessionRegistry,
    signal::FrameSignals,
    stats::EngineStats,
    FatigueState, VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "driveguard")]
#[command(version = VERSION)]
#[command(about = "Temporal-fusion engine for driver fatigue monitoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP control surface (requires the `server` feature)
    Serve {
        /// Port to bind to (0 for random)
        #[arg(long, default_value = "8750")]
        port: u16,

        /// Directory for the episode log
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Feed synthetic frames through one session and print transitions
    Simulate {
        /// Number of frames to feed
        #[arg(long, default_value = "6000")]
        frames: u64,

        /// Subject key for the simulated session
        #[arg(long, default_value = "sim-driver")]
        subject: String,

        /// Frame after which the simulated driver turns drowsy
        #[arg(long, default_value = "3000")]
        drowsy_after: u64,

        /// Shrink window lags so the warm-up completes quickly
        #[arg(long)]
        fast: bool,

        /// Append episodes to this JSONL file instead of the log
        #[arg(long)]
        episode_log: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, data_dir } => {
            cmd_serve(port, data_dir);
        }
        Commands::Simulate {
            frames,
            subject,
            drowsy_after,
            fast,
            episode_log,
        } => {
            cmd_simulate(frames, &subject, drowsy_after, fast, episode_log);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

#[cfg(feature = "server")]
fn cmd_serve(port: u16, data_dir: Option<PathBuf>) {
    use driveguard_fusion::server::{run, ServerConfig};

    let engine = EngineConfig::load().unwrap_or_default();
    let data_dir = data_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("driveguard-fusion")
    });

    let config = ServerConfig::new(port, engine, data_dir);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: could not start async runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        let (addr, _shutdown_tx) = match run(config).await {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("Error: could not start server: {e}");
                std::process::exit(1);
            }
        };
        println!("Driveguard Fusion v{VERSION} listening on http://{addr}");
        println!("Press Ctrl+C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Error waiting for shutdown signal: {e}");
        }
    });
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_port: u16, _data_dir: Option<PathBuf>) {
    eprintln!("Error: the `serve` command requires the `server` feature");
    eprintln!("Rebuild with: cargo build --features server");
    std::process::exit(1);
}

fn cmd_simulate(
    frames: u64,
    subject: &str,
    drowsy_after: u64,
    fast: bool,
    episode_log: Option<PathBuf>,
) {
    let mut config = EngineConfig::load().unwrap_or_default();
    if fast {
        config.fatigue_lag = 6;
        config.eye_lag = 6;
        config.yawn_lag = 6;
    }

    println!("Driveguard Fusion v{VERSION}");
    println!("Simulating {frames} frames for subject '{subject}'");
    println!(
        "  Windows: combined={} eye={} yawn={}",
        config.combined_capacity(),
        config.eye_lag,
        config.yawn_lag
    );
    println!("  Drowsy after frame {drowsy_after}");
    println!();

    let stats = Arc::new(EngineStats::new());
    let sink: Arc<dyn EventSink> = match episode_log {
        Some(path) => {
            println!("  Episode log: {}", path.display());
            Arc::new(JsonlSink::new(path))
        }
        None => Arc::new(LogSink),
    };
    let dispatcher = EpisodeDispatcher::new(sink, config.episode_queue_capacity, stats.clone());
    let registry = SessionRegistry::new(
        config,
        Arc::new(HeuristicClassifier::default()),
        dispatcher.sender(),
        stats.clone(),
    );

    let mut last_state = FatigueState::Initializing;
    for frame in 0..frames {
        // Alert drivers blink briefly; drowsy drivers hold eyes shut and yawn.
        let drowsy = frame >= drowsy_after;
        let eye_closed = if drowsy { frame % 5 != 0 } else { frame % 25 == 0 };
        let mouth_open = drowsy && frame % 3 != 0;

        let signals = FrameSignals::cues(eye_closed, mouth_open);
        match registry.ingest(subject, &signals) {
            Ok(snapshot) => {
                if snapshot.fatigue_level != last_state {
                    println!(
                        "frame {frame:>6}: {} -> {} (eye_closure={}, yawn={})",
                        last_state.as_str(),
                        snapshot.fatigue_level.as_str(),
                        snapshot.eye_closure,
                        snapshot.yawn_detected
                    );
                    last_state = snapshot.fatigue_level;
                }
            }
            Err(e) => {
                eprintln!("frame {frame}: rejected: {e}");
            }
        }
    }

    drop(registry);
    dispatcher.shutdown();

    let snapshot = stats.snapshot();
    println!();
    println!("Simulation complete:");
    println!("  Frames ingested:  {}", snapshot.frames_ingested);
    println!("  Ticks processed:  {}", snapshot.ticks_processed);
    println!("  Episodes emitted: {}", snapshot.episodes_emitted);
    println!("  Episodes dropped: {}", snapshot.episodes_dropped);
}

fn cmd_config() {
    match EngineConfig::load() {
        Ok(config) => {
            println!("Configuration file: {:?}", EngineConfig::config_path());
            match serde_json::to_string_pretty(&config) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error serializing configuration: {e}"),
            }
        }
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    }
}
