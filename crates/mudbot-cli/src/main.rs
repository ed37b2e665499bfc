//! mudbot CLI - autonomous MUD bots.
//!
//! Single binary that provides:
//! - `mudbot run` - run a bot against the simulated world
//! - `mudbot init` - write a default configuration
//! - `mudbot weights` - inspect configured weights at a population
//! - `mudbot events` - show the event journal

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, EnvFilter};

use mudbot_kernel::config::DEFAULT_CONFIG_YAML;
use mudbot_kernel::{Bot, BotConfig, ControllerEvent, EventJournal, EventKind, SimWorld};

#[derive(Parser)]
#[command(name = "mudbot")]
#[command(about = "Autonomous MUD bot", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a bot in the simulated world
    Run {
        /// Config file (defaults to .mudbot/config.yaml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed overriding the configured one
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Event journal (defaults to .mudbot/events.jsonl)
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Initialize a new project
    Init,

    /// Show configured action weights for a room population
    Weights {
        /// Awake characters in the room
        #[arg(long)]
        population: u32,
    },

    /// Show recent controller events
    Events {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let project_root = match cli.project {
        Some(p) => p,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Some(Commands::Run {
            config,
            seed,
            duration,
            events,
        }) => run_bot(&project_root, config, seed, duration, events).await,
        Some(Commands::Init) => init_project(&project_root),
        Some(Commands::Weights { population }) => show_weights(&project_root, population),
        Some(Commands::Events { limit }) => show_events(&project_root, limit),
        None => {
            println!("mudbot - autonomous MUD bot");
            println!();
            println!("Usage: mudbot <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run      Run a bot in the simulated world");
            println!("  init     Initialize a new project");
            println!("  weights  Show action weights for a room population");
            println!("  events   Show recent controller events");
            println!();
            println!("Run 'mudbot --help' for more information.");
            Ok(())
        }
    }
}

async fn sleep_for(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

async fn run_bot(
    project_root: &Path,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    duration: Option<u64>,
    events_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => BotConfig::load(&path)?,
        None => BotConfig::load_from_project(project_root)?,
    };
    if seed.is_some() {
        config.seed = seed;
    }

    let journal = match events_path {
        Some(path) => EventJournal::new(path),
        None => EventJournal::for_project(project_root),
    };

    let world = Arc::new(SimWorld::demo());
    let mut bot = Bot::new(world.clone(), config)?;
    tracing::info!(
        project = %project_root.display(),
        seed = bot.seed(),
        journal = %journal.path().display(),
        "Starting bot"
    );

    let mut events = bot.controller().subscribe();
    bot.start()?;

    let stop = sleep_for(duration.map(Duration::from_secs));
    tokio::pin!(stop);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => journal.append(&event)?,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Journal fell behind controller events");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut stop => {
                tracing::info!("Run duration elapsed");
                break;
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    bot.dispose();
    while let Ok(event) = events.try_recv() {
        journal.append(&event)?;
    }

    let transcript = world.transcript();
    println!();
    println!("Transcript ({} lines):", transcript.len());
    for line in &transcript {
        println!("  {}", line);
    }

    Ok(())
}

fn init_project(project_root: &Path) -> Result<()> {
    let config_path = BotConfig::project_path(project_root);
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    std::fs::write(&config_path, DEFAULT_CONFIG_YAML)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Initialized mudbot project at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .mudbot/config.yaml - bot configuration");
    println!();
    println!("Next steps:");
    println!("  1. Tune action weights in .mudbot/config.yaml");
    println!("  2. Run: mudbot run --duration 600");

    Ok(())
}

fn show_weights(project_root: &Path, population: u32) -> Result<()> {
    let config = BotConfig::load_from_project(project_root)?;
    let actions = &config.actions;

    println!("Weights with {} awake in the room", population);
    println!("=================================");
    println!("  idle     {:>8.2}", actions.idle.weight);
    println!("  sleep    {:>8.2}", actions.sleep.weight);
    println!("  wakeup   {:>8.2}", actions.wakeup.weight);
    println!(
        "  say      {:>8.2}",
        actions.say.population_weight.weight_at(population)
    );
    println!(
        "  whisper  {:>8.2}  (shared between everyone awake)",
        actions.whisper.population_weight.weight_at(population)
    );
    println!(
        "  address  {:>8.2}  (shared between everyone awake)",
        actions.address.population_weight.weight_at(population)
    );
    println!(
        "  pose     {:>8.2}",
        actions.pose.population_weight.weight_at(population)
    );
    println!(
        "  go       {:>8.2}",
        actions.go.population_weight.weight_at(population)
    );
    println!(
        "  teleport {:>8.2}",
        actions.teleport.population_weight.weight_at(population)
    );
    println!("  lurk     {:>8.2}  (only without a character)", actions.lurk.weight);

    Ok(())
}

fn describe(event: &ControllerEvent) -> String {
    match &event.kind {
        EventKind::Queued {
            item,
            action,
            priority,
            position,
        } => format!("queued {} #{} (priority {}, position {})", action, item, priority, position),
        EventKind::Idle => "idle".to_string(),
        EventKind::Executed {
            item,
            action,
            message,
        } => match message {
            Some(msg) => format!("executed {} #{}: {}", action, item, msg),
            None => format!("executed {} #{}", action, item),
        },
        EventKind::Failed { item, action, error } => {
            format!("failed {} #{}: {}", action, item, error)
        }
        EventKind::Completed { item, action } => format!("completed {} #{}", action, item),
        EventKind::Disposed => "disposed".to_string(),
    }
}

fn show_events(project_root: &Path, limit: usize) -> Result<()> {
    let journal = EventJournal::for_project(project_root);
    let events = journal.read_recent(limit);

    if events.is_empty() {
        println!("No events in {}", journal.path().display());
        return Ok(());
    }

    for event in &events {
        println!(
            "[{}] {}",
            event
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S"),
            describe(event)
        );
    }

    Ok(())
}
