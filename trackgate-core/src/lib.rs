//! # trackgate-core
//!
//! Fire-and-forget analytics reporting around a blocking tracker.
//!
//! This library provides:
//! - The [`Analytics`] gate: one-time configuration, an enable switch and
//!   non-blocking reporters backed by a bounded queue and worker pool
//! - First-run device metadata reporting, recorded in a [`SettingsStore`]
//! - A [`Tracker`] trait plus a SQLite-backed implementation
//! - Configuration management and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trackgate_core::{Analytics, Config, Database, SqliteTracker};
//!
//! # async fn run() -> trackgate_core::Result<()> {
//! let config = Config::load()?;
//! let db = Arc::new(Database::open(&Config::database_path())?);
//! db.migrate()?;
//!
//! let analytics = Analytics::builder(Arc::new(SqliteTracker::new(db.clone())), db)
//!     .config(&config)
//!     .build()?;
//! analytics.configure("UA-12345-1")?;
//!
//! analytics.active()?.track_event("ui", "click", "button_x", 1);
//! analytics.active()?.track_page_view("/home");
//!
//! analytics.shutdown().await;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use device::DeviceInfo;
pub use dispatch::{Analytics, DispatchStats, Reporter};
pub use error::{Error, Result};
pub use store::{MemorySettings, SettingsStore};
pub use tracker::{SqliteTracker, Tracker};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod store;
pub mod tracker;
pub mod types;
