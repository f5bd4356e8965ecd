//! `skywatch` - CLI for the live aircraft view
//!
//! This binary watches a map region against OpenSky and lets you inspect the
//! local cache and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::{mpsc, watch};

use skywatch::cli::{CacheCommand, Cli, Command, ConfigCommand, WatchCommand};
use skywatch::{
    init_logging, CacheKey, Config, LiveView, OpenSkySource, SqliteStore, SyncController,
    TtlCache, ViewCommand, ViewState,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Watch(watch_cmd) => handle_watch(&config, &watch_cmd),
        Command::Cache(cache_cmd) => handle_cache(&config, &cache_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn open_cache(config: &Config) -> Result<TtlCache<SqliteStore>, Box<dyn std::error::Error>> {
    let store = SqliteStore::open(config.store_path())?;
    Ok(TtlCache::new(store, config.ttl()))
}

fn handle_watch(config: &Config, cmd: &WatchCommand) -> Result<(), Box<dyn std::error::Error>> {
    let region = cmd.region()?;
    let mut controller = SyncController::new(open_cache(config)?, config.debounce_window());
    if let Some(filters) = cmd.filters() {
        controller.apply_filters(filters);
    }

    let source = Arc::new(OpenSkySource::from_config(config)?);
    let (view, mut state_rx) = LiveView::new(controller, source, config.refresh_interval());
    let (tx, rx) = mpsc::channel(16);
    let duration = cmd.duration.map(Duration::from_secs);
    let json = cmd.json;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        tx.send(ViewCommand::Viewport(region)).await?;

        let stop = async {
            match duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Cannot listen for Ctrl-C");
                    }
                }
            }
        };

        let control = async {
            tokio::select! {
                () = stop => {}
                () = print_states(&mut state_rx, json) => {}
            }
            let _ = tx.send(ViewCommand::Shutdown).await;
        };

        tokio::join!(view.run(rx), control);
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}

async fn print_states(state_rx: &mut watch::Receiver<ViewState>, json: bool) {
    while state_rx.changed().await.is_ok() {
        let state = state_rx.borrow_and_update().clone();
        if let Err(e) = print_view(&state, json) {
            tracing::error!(error = %e, "Cannot print view");
            return;
        }
    }
}

fn print_view(state: &ViewState, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(state)?);
        return Ok(());
    }

    let mut status = format!(
        "{:<8} {}/{} aircraft",
        state.phase.to_string(),
        state.entities.len(),
        state.total
    );
    if let Some(region) = &state.region {
        status.push_str(&format!(" in {region}"));
    }
    if state.loading {
        status.push_str(" (loading)");
    }
    if state.refreshing {
        status.push_str(" (refreshing)");
    }
    if let Some(fetched_at) = state.fetched_at {
        status.push_str(&format!(" as of {}", fetched_at.format("%H:%M:%S")));
    }
    println!("{status}");

    if let Some(error) = &state.error {
        let kind = if state.blocking { "error" } else { "warning" };
        println!("  {kind}: {error}");
    }

    for entity in &state.entities {
        println!(
            "  {:<8} {:<10} {:>9.4} {:>10.4} {:>8} {:>7} {:>5}  {}",
            entity.id,
            entity.callsign.as_deref().unwrap_or("-"),
            entity.position.lat,
            entity.position.lon,
            entity
                .altitude
                .map_or_else(|| "-".to_string(), |a| format!("{a:.0}m")),
            entity
                .speed
                .map_or_else(|| "-".to_string(), |s| format!("{s:.0}m/s")),
            entity
                .heading
                .map_or_else(|| "-".to_string(), |h| format!("{h:.0}")),
            entity.origin_country.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn handle_cache(config: &Config, cmd: &CacheCommand) -> Result<(), Box<dyn std::error::Error>> {
    let cache = open_cache(config)?;

    match cmd {
        CacheCommand::Status { json } => {
            let stats = cache.store().stats()?;
            if *json {
                let status = serde_json::json!({
                    "store_path": cache.store().path(),
                    "total_records": stats.total_records,
                    "db_size_bytes": stats.db_size_bytes,
                    "last_write": stats.last_write,
                    "ttl_secs": cache.ttl().as_secs(),
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("skywatch cache");
                println!("--------------");
                println!("Store:         {}", cache.store().path().display());
                println!("Records:       {}", stats.total_records);
                println!("Size:          {} bytes", stats.db_size_bytes);
                println!("TTL:           {}s", cache.ttl().as_secs());
                match stats.last_write {
                    Some(at) => println!("Last write:    {}", at.to_rfc3339()),
                    None => println!("Last write:    never"),
                }
            }
        }
        CacheCommand::Show => {
            for key in CacheKey::ALL {
                match cache.inspect(key) {
                    Some(info) => {
                        let freshness = if !key.expires() {
                            "never expires"
                        } else if info.fresh {
                            "fresh"
                        } else {
                            "expired"
                        };
                        println!(
                            "{:<18} stored {}  age {:>6}s  {freshness}",
                            key.as_str(),
                            info.stored_at.format("%Y-%m-%d %H:%M:%S"),
                            info.age.as_secs()
                        );
                    }
                    None => println!("{:<18} (absent)", key.as_str()),
                }
            }
        }
        CacheCommand::Clear => {
            cache.clear();
            println!("Cleared cached records.");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Cache]");
                println!("  Store path:         {}", config.store_path().display());
                println!("  TTL (secs):         {}", config.cache.ttl_secs);
                println!();
                println!("[Tracker]");
                println!("  Debounce (ms):      {}", config.tracker.debounce_ms);
                println!();
                println!("[Refresh]");
                println!("  Interval (secs):    {}", config.refresh.interval_secs);
                println!();
                println!("[Source]");
                println!("  Base URL:           {}", config.source.base_url);
                println!("  Timeout (secs):     {}", config.source.timeout_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
