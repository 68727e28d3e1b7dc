mod api;
mod cli;
mod config;
mod db;
mod engine;
mod ingest;
mod model;
mod store;
#[cfg(test)]
mod test_support;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::db::Database;
use crate::engine::aggregator;
use crate::ingest::IngestRequest;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::Status => handle_status(),
        Commands::Ingest { file, batch } => handle_ingest(&file, batch),
        Commands::Reprocess { user } => handle_reprocess(user.as_deref()),
        Commands::Recompute { user, date } => handle_recompute(user.as_deref(), &date),
        Commands::RecomputeRange { user, from, to } => {
            handle_recompute_range(user.as_deref(), &from, &to)
        }
        Commands::Config { command } => handle_config_command(command),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;

    println!("worktime status");
    println!("- db_path: {}", config.db_path.display());
    println!("- default_user: {}", config.default_user);
    println!("- unprocessed_sessions: {}", database.unprocessed_count()?);
    println!(
        "- latest_aggregation_date: {}",
        database
            .latest_aggregation_date()?
            .map(|date| date.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_ingest(file: &Path, batch: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let mut database = Database::open(&config.db_path)?;

    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read ingest file: {}", file.display()))?;

    if batch {
        let requests: Vec<IngestRequest> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse ingest file: {}", file.display()))?;

        let outcome = ingest::ingest_batch(&mut database, requests);
        println!(
            "Ingested {} session(s), {} duplicate(s), {} failed",
            outcome.ingested, outcome.duplicates, outcome.failed
        );
    } else {
        let request: IngestRequest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse ingest file: {}", file.display()))?;

        let session = ingest::ingest_session(&mut database, request)?;
        println!("Ingested session {} (processed: {})", session.id, session.processed);
    }

    Ok(())
}

fn handle_reprocess(user: Option<&str>) -> Result<()> {
    let config = load_or_default_config()?;
    let mut database = Database::open(&config.db_path)?;

    let processed = ingest::reprocess_unprocessed(&mut database, user)?;
    println!("Reprocessed {processed} session(s)");

    Ok(())
}

fn handle_recompute(user: Option<&str>, date: &str) -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;
    let target = parse_date(date)?;
    let user = user.unwrap_or(&config.default_user);

    let aggregation = aggregator::compute_daily_aggregation(&database, user, target)?;
    println!(
        "Recomputed {} for {}: day_type={}, total_steps={}",
        target,
        user,
        aggregation.day_type.as_str(),
        aggregation
            .total_steps
            .map(|steps| steps.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_recompute_range(user: Option<&str>, from: &str, to: &str) -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;
    let from = parse_date(from)?;
    let to = parse_date(to)?;
    let user = user.unwrap_or(&config.default_user);

    let recomputed = aggregator::recompute_range(&database, user, from, to)?;
    println!("Recomputed {recomputed} date(s) for {user}");

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    let api_config = Arc::clone(&shared_config);

    info!("worktime service started");

    tokio::select! {
        api_result = api::run_server(api_config) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}
