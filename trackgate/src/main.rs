//! trackgate - record analytics events and page views from the command line
//!
//! Every recording command configures the dispatcher from the config file,
//! hands the hit to it, and drains the queue before exiting.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/trackgate/hits.db (~/.local/share/trackgate/hits.db)
//! - Logs: $XDG_STATE_HOME/trackgate/trackgate.log (~/.local/state/trackgate/trackgate.log)
//! - Config: $XDG_CONFIG_HOME/trackgate/config.toml (~/.config/trackgate/config.toml)

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use trackgate_core::store::FIRST_RUN_KEY;
use trackgate_core::{Analytics, Config, Database, SettingsStore, SqliteTracker, StoredHit};

#[derive(Parser)]
#[command(name = "trackgate")]
#[command(about = "Record analytics events and page views")]
#[command(version)]
struct Args {
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Turn analytics off for this run (hits are discarded)
    #[arg(long, global = true)]
    disable: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record an event
    Event {
        category: String,
        action: String,
        #[arg(short, long, default_value = "")]
        label: String,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        value: i32,
    },

    /// Record a page view
    Page { path: String },

    /// Show configuration and hit store state
    Status,

    /// List recently recorded hits
    Hits {
        /// Number of hits to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let mut config = Config::load().context("failed to load configuration")?;
    if args.verbose {
        config.logging.level = "debug".to_string();
    }

    let _log_guard =
        trackgate_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Arc::new(Database::open(&db_path).context("failed to open database")?);
    db.migrate().context("failed to run database migrations")?;

    match args.command {
        Command::Event {
            category,
            action,
            label,
            value,
        } => {
            record(&config, db, args.disable, |analytics| {
                analytics.active()?.track_event(&category, &action, &label, value);
                Ok(())
            })
            .await
        }
        Command::Page { path } => {
            record(&config, db, args.disable, |analytics| {
                analytics.active()?.track_page_view(&path);
                Ok(())
            })
            .await
        }
        Command::Status => cmd_status(&config, &db),
        Command::Hits { limit, json } => cmd_hits(&db, limit, json),
    }
}

/// Configure a gate, run `report` against it and drain the queue
async fn record<F>(config: &Config, db: Arc<Database>, disable: bool, report: F) -> Result<()>
where
    F: FnOnce(&Analytics) -> trackgate_core::Result<()>,
{
    let tracking_key = config.tracking_key()?;

    let analytics = Analytics::builder(Arc::new(SqliteTracker::new(Arc::clone(&db))), db)
        .config(config)
        .build()
        .context("invalid dispatch configuration")?;
    analytics
        .configure(tracking_key)
        .context("failed to configure analytics")?;
    if disable {
        analytics.set_enabled(false);
    }

    report(&analytics)?;
    analytics.shutdown().await;

    let stats = analytics.stats();
    if stats.delivered > 0 {
        println!("Recorded {} hit(s) under {}", stats.delivered, tracking_key);
    } else if !analytics.is_enabled() {
        println!("Analytics disabled, nothing recorded");
    } else {
        println!(
            "Nothing recorded ({} failed, {} dropped); see {}",
            stats.failed,
            stats.dropped,
            trackgate_core::logging::log_file_path().display()
        );
    }
    Ok(())
}

fn cmd_status(config: &Config, db: &Database) -> Result<()> {
    println!("trackgate status");
    println!("================");
    println!();
    println!("Config:          {}", Config::config_path().display());
    println!(
        "Tracking key:    {}",
        config.tracker.tracking_key.as_deref().unwrap_or("<not set>")
    );
    println!("Timeout:         {}s", config.tracker.network_timeout_secs);
    println!("Enabled:         {}", config.dispatch.enabled);
    println!("Queue capacity:  {}", config.dispatch.queue_capacity);
    println!("Workers:         {}", config.dispatch.workers);
    println!();
    println!("Database:        {}", Config::database_path().display());

    let first_run_pending = db.get_bool(FIRST_RUN_KEY, true)?;
    println!(
        "First run:       {}",
        if first_run_pending {
            "pending"
        } else {
            "reported"
        }
    );

    match db.latest_tracker_start()? {
        Some(start) => println!(
            "Last start:      {} ({})",
            start.tracking_key,
            start.started_at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("Last start:      never"),
    }
    println!("Hits recorded:   {}", db.count_hits()?);

    Ok(())
}

fn cmd_hits(db: &Database, limit: usize, json: bool) -> Result<()> {
    let hits = db.list_recent_hits(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No hits recorded");
        return Ok(());
    }

    for hit in &hits {
        println!(
            "{:>5}  {}  {:<10} {}",
            hit.id,
            hit.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            hit.kind.as_str(),
            describe(hit)
        );
    }
    Ok(())
}

fn describe(hit: &StoredHit) -> String {
    match &hit.path {
        Some(path) => path.clone(),
        None => format!(
            "{} / {} / {} / {}",
            hit.category.as_deref().unwrap_or(""),
            hit.action.as_deref().unwrap_or(""),
            hit.label.as_deref().unwrap_or(""),
            hit.value.unwrap_or(0)
        ),
    }
}
