//! `parkspot` - CLI for the parking spot keeper
//!
//! This binary saves, shows and deletes the current parking spot stored by
//! the parkspot library.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;

use parkspot::cli::{
    Cli, Command, ConfigCommand, DistanceCommand, HistoryCommand, SaveCommand, StatusCommand,
};
use parkspot::geo::format_distance;
use parkspot::location::{FixedPosition, NoGeolocation};
use parkspot::notify::TracingNotifier;
use parkspot::{
    init_logging, Config, ParkingDraft, ParkingManager, ParkingRecord, Position, PositionSource,
    Storage,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let command = match cli.command {
        // Config commands must work even when the config is broken
        Command::Config(config_cmd) => return handle_config(cli.config, config_cmd),
        command => command,
    };

    let config = Config::load_from(cli.config).context("failed to load configuration")?;

    match command {
        Command::Save(save_cmd) => handle_save(&config, &save_cmd).await,
        Command::Show(show_cmd) => handle_show(&config, show_cmd.json).await,
        Command::Delete => handle_delete(&config).await,
        Command::History(history_cmd) => handle_history(&config, &history_cmd).await,
        Command::Directions => handle_directions(&config).await,
        Command::Distance(distance_cmd) => handle_distance(&config, &distance_cmd).await,
        Command::Status(status_cmd) => handle_status(&config, &status_cmd).await,
        Command::Config(_) => unreachable!("handled above"),
    }
}

async fn open_manager(config: &Config, source: Arc<dyn PositionSource>) -> Result<ParkingManager> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open parking store at {}", path.display()))?;

    ParkingManager::from_config(config, storage, source, Arc::new(TracingNotifier))
        .await
        .map_err(user_error)
}

/// Attach the end-user explanation to a library error.
fn user_error(err: parkspot::Error) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

async fn handle_save(config: &Config, cmd: &SaveCommand) -> Result<()> {
    let position = Position::new(cmd.lat, cmd.lng, cmd.accuracy).map_err(user_error)?;

    let mut draft = ParkingDraft::new();
    draft.memo = cmd.memo.clone();
    draft.floor = cmd.floor.clone();
    draft.zone = cmd.zone.clone();
    draft.reminder = cmd.reminder();
    if let Some(path) = &cmd.photo {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read photo {}", path.display()))?;
        draft.photo = Some(bytes);
    }

    let mut manager = open_manager(config, Arc::new(FixedPosition::new(position))).await?;
    let record = manager.save(&draft).await.map_err(user_error)?;

    println!("Saved: {}", record.summary());
    if let Some(photo) = &record.photo {
        println!("Photo:      {} bytes", photo.len());
    }
    println!("Directions: {}", record.directions_url());

    if let Some(handle) = manager.pending_reminder() {
        println!(
            "Reminder:   {}",
            handle.fire_at().with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }

    if cmd.wait {
        if let Some(handle) = manager.take_reminder() {
            println!("Waiting for the reminder...");
            handle.wait().await;
        }
    }
    Ok(())
}

async fn handle_show(config: &Config, json: bool) -> Result<()> {
    let manager = open_manager(config, Arc::new(NoGeolocation)).await?;

    let Some(record) = manager.current() else {
        if json {
            println!("null");
        } else {
            println!("No parking spot saved.");
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &ParkingRecord) {
    println!("Parked at:  {:.6}, {:.6}", record.latitude, record.longitude);
    if let Some(accuracy) = record.accuracy_meters {
        println!("Accuracy:   ±{}", format_distance(accuracy));
    }
    println!(
        "Saved:      {}",
        record.created_at().with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if let Some(floor) = &record.floor {
        println!("Floor:      {floor}");
    }
    if let Some(zone) = &record.zone {
        println!("Zone:       {zone}");
    }
    if let Some(memo) = &record.memo {
        println!("Memo:       {memo}");
    }
    if let Some(photo) = &record.photo {
        println!("Photo:      {} bytes", photo.len());
    }
    if let (Some(interval), Some(due)) = (record.reminder_minutes, record.reminder_due_at()) {
        println!(
            "Reminder:   {} ({})",
            interval,
            due.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
}

async fn handle_delete(config: &Config) -> Result<()> {
    let mut manager = open_manager(config, Arc::new(NoGeolocation)).await?;

    if manager.delete().await.map_err(user_error)? {
        println!("Parking spot deleted.");
    } else {
        println!("No parking spot saved.");
    }
    Ok(())
}

async fn handle_history(config: &Config, cmd: &HistoryCommand) -> Result<()> {
    let manager = open_manager(config, Arc::new(NoGeolocation)).await?;
    let mut history = manager.history().await.map_err(user_error)?;
    if let Some(limit) = cmd.limit {
        history.truncate(limit);
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No earlier parking spots.");
        return Ok(());
    }
    for (i, record) in history.iter().enumerate() {
        println!(
            "{:>2}. {}  {}",
            i + 1,
            record.created_at().with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.summary()
        );
    }
    Ok(())
}

async fn handle_directions(config: &Config) -> Result<()> {
    let manager = open_manager(config, Arc::new(NoGeolocation)).await?;
    match manager.directions_url() {
        Some(url) => println!("{url}"),
        None => println!("No parking spot saved."),
    }
    Ok(())
}

async fn handle_distance(config: &Config, cmd: &DistanceCommand) -> Result<()> {
    let here = Position::new(cmd.lat, cmd.lng, 0.0).map_err(user_error)?;
    let manager = open_manager(config, Arc::new(NoGeolocation)).await?;
    match manager.distance_from(&here) {
        Some(meters) => println!("{}", format_distance(meters)),
        None => println!("No parking spot saved."),
    }
    Ok(())
}

async fn handle_status(config: &Config, cmd: &StatusCommand) -> Result<()> {
    let manager = open_manager(config, Arc::new(NoGeolocation)).await?;
    let stats = manager.storage().stats().await.map_err(user_error)?;
    let permission = manager.scheduler().request_permission().await;

    if cmd.json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "backend": manager.storage().backend_name(),
            "parked": stats.has_current,
            "history_len": stats.history_len,
            "newest_history": stats.newest_history,
            "oldest_history": stats.oldest_history,
            "notifier": manager.scheduler().notifier_name(),
            "notification_permission": permission.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("parkspot status");
        println!("---------------");
        println!("Database:      {}", config.database_path().display());
        println!("Backend:       {}", manager.storage().backend_name());
        println!("Parked:        {}", if stats.has_current { "yes" } else { "no" });
        println!("History:       {} entries", stats.history_len);
        if let Some(oldest) = stats.oldest_history {
            println!(
                "Oldest entry:  {}",
                oldest.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
        }
        println!(
            "Notifications: {} ({})",
            manager.scheduler().notifier_name(),
            permission
        );
    }
    Ok(())
}

fn handle_config(config_path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:       {}", config.database_path().display());
                println!(
                    "  Record current:      {}",
                    config.storage.record_current_in_history
                );
                println!();
                println!("[Location]");
                println!("  High accuracy:       {}", config.location.high_accuracy);
                println!("  Timeout (ms):        {}", config.location.timeout_ms);
                println!("  Max cache age (ms):  {}", config.location.max_cache_age_ms);
                println!();
                println!("[Photo]");
                println!("  Max dimension (px):  {}", config.photo.max_dimension_px);
                println!("  Quality:             {}", config.photo.quality);
                println!();
                println!("[Notifications]");
                println!("  Enabled:             {}", config.notifications.enabled);
                println!(
                    "  Cancel on delete:    {}",
                    config.notifications.cancel_reminder_on_delete
                );
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                config_path
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
