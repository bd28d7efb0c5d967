use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use log::{error, info};
use tagnotes::{App, Cli, Config, FileKeyValueStore, LogFeedback, NoteStore, Result, TagStore};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    info!("Using data directory {}", config.data_dir.display());

    let kv = Arc::new(FileKeyValueStore::open(&config.data_dir)?);
    let feedback = Arc::new(LogFeedback);
    let notes = Arc::new(NoteStore::open(kv.clone(), &config.notes_key, feedback.clone())?);
    let tags = Arc::new(TagStore::open(kv, &config.tags_key, config.tag_name_collisions)?);

    // A one-shot command needs the persisted state before acting on it
    notes.wait_loaded().await;
    tags.wait_loaded().await;

    let mut app = App::new(
        Arc::clone(&notes),
        Arc::clone(&tags),
        config,
        config_path,
        feedback,
        cli.verbose,
    );
    let outcome = app.run(cli.command).await;

    notes.shutdown().await;
    tags.shutdown().await;
    outcome
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");
    match run(cli).await {
        Ok(()) => {
            info!("Application shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
