//! The analytics client that actually records hits.
//!
//! Trackers are synchronous: a call may block on disk or network I/O, which is
//! why the dispatcher only ever invokes them from blocking worker threads.

use std::sync::{Arc, RwLock};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{CustomVariable, EventHit, HitPayload, TrackerSettings};

/// An analytics client.
///
/// Implementations must tolerate concurrent calls from several workers.
pub trait Tracker: Send + Sync {
    /// Connect the tracker to an account. Called once, before any hit.
    fn start(&self, settings: &TrackerSettings) -> Result<()>;

    /// Attach a named value to one of the tracker's slots
    fn set_custom_variable(&self, var: &CustomVariable) -> Result<()>;

    /// Record an event
    fn track_event(&self, event: &EventHit) -> Result<()>;

    /// Record a page view
    fn track_page_view(&self, path: &str) -> Result<()>;
}

/// Tracker that records hits into the local SQLite hit store.
pub struct SqliteTracker {
    db: Arc<Database>,
    settings: RwLock<Option<TrackerSettings>>,
}

impl SqliteTracker {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            settings: RwLock::new(None),
        }
    }

    /// Settings passed to `start`, if it was called
    pub fn settings(&self) -> Option<TrackerSettings> {
        self.settings
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn tracking_key(&self) -> Result<String> {
        self.settings()
            .map(|s| s.tracking_key)
            .ok_or_else(|| Error::Tracker("tracker not started".to_string()))
    }

    fn record(&self, payload: HitPayload) -> Result<()> {
        let tracking_key = self.tracking_key()?;
        let vars = serde_json::to_value(self.db.list_custom_variables()?)?;
        let id = self.db.insert_hit(&tracking_key, &payload, &vars)?;
        tracing::trace!(hit_id = id, kind = %payload.kind(), "Hit recorded");
        Ok(())
    }
}

impl Tracker for SqliteTracker {
    fn start(&self, settings: &TrackerSettings) -> Result<()> {
        self.db.record_tracker_start(settings)?;
        *self.settings.write().unwrap_or_else(|p| p.into_inner()) = Some(settings.clone());
        tracing::info!(
            tracking_key = %settings.tracking_key,
            network_timeout_secs = settings.network_timeout.as_secs(),
            "Tracker started"
        );
        Ok(())
    }

    fn set_custom_variable(&self, var: &CustomVariable) -> Result<()> {
        if !var.has_valid_index() {
            return Err(Error::Tracker(format!(
                "custom variable index {} out of range",
                var.index
            )));
        }
        self.db.upsert_custom_variable(var)?;
        tracing::debug!(
            index = var.index,
            name = %var.name,
            scope = var.scope.code(),
            "Custom variable set"
        );
        Ok(())
    }

    fn track_event(&self, event: &EventHit) -> Result<()> {
        self.record(HitPayload::Event(event.clone()))
    }

    fn track_page_view(&self, path: &str) -> Result<()> {
        self.record(HitPayload::PageView {
            path: path.to_string(),
        })
    }
}
