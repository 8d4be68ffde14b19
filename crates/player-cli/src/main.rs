//! `player-cli`: terminal music player for a catalog server.
//!
//! Streams tracks from the catalog over HTTP, keeps liked songs, volume and
//! the user profile between runs, and reads commands from stdin
//! (`help` lists them).

mod analytics;
mod backend;
mod catalog;
mod commands;
mod config;
mod shell;

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use player_session::{EngineAdapter, PersistedState, PlayerController};
use tracing_subscriber::EnvFilter;

use crate::backend::StreamBackend;
use crate::catalog::CatalogClient;
use crate::config::ClientConfig;
use crate::shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "player-cli", version)]
struct Args {
    /// Base URL of the catalog server, e.g. http://192.168.1.10:8000
    #[arg(long)]
    server: Option<String>,

    /// Optional client config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// File holding liked songs, volume and the user profile
    #[arg(long)]
    state: Option<PathBuf>,

    /// Output device name (substring match)
    #[arg(long)]
    device: Option<String>,

    /// Print output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,player_cli=info,player_session=info")
        }))
        .init();

    if args.list_devices {
        let host = cpal::default_host();
        for name in audio_player::device::list_devices(&host)? {
            println!("{name}");
        }
        return Ok(());
    }

    let cfg = match args.config.as_deref() {
        Some(path) => ClientConfig::load(path)?,
        None => match ClientConfig::auto_path() {
            Some(path) => ClientConfig::load(&path)?,
            None => ClientConfig::default(),
        },
    };
    let server = cfg.server(args.server.as_deref())?;
    let state_path = cfg.state_path(args.state.as_deref());
    let persisted = PersistedState::load(&state_path)?;
    tracing::info!(
        server = %server,
        state = ?state_path,
        user_id = %persisted.user_id,
        "starting player"
    );

    let engine = EngineAdapter::new(
        StreamBackend::new(cfg.engine(args.device.as_deref())),
        server.clone(),
        cfg.poll_interval(),
    );
    let reporter = analytics::spawn_reporter(&server, cfg.catalog_timeout())?;
    let catalog = CatalogClient::new(&server, &persisted.user_id, cfg.catalog_timeout());
    let controller = PlayerController::new(engine, Box::new(reporter), persisted);

    let mut shell = Shell::new(controller, catalog, state_path, std::io::stdout());
    shell.refresh_library();
    println!(
        "{} tracks from {server}; type `help` for commands",
        shell.controller().library().len()
    );

    let lines = spawn_stdin_reader()?;
    shell.run(&lines)
}

/// Forward stdin lines to the control loop; the channel closes at EOF.
fn spawn_stdin_reader() -> Result<crossbeam_channel::Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("spawn stdin reader")?;
    Ok(rx)
}
