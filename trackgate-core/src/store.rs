//! Persistent key/value flags, used for the first-run fact.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::Database;
use crate::error::Result;

/// Key of the first-run fact
pub const FIRST_RUN_KEY: &str = "firstRun";

/// Boolean settings that outlive a single dispatcher.
///
/// Writes are best effort: implementations should persist before returning
/// but callers do not rely on crash safety.
pub trait SettingsStore: Send + Sync {
    /// Read a flag, falling back to `default` when it was never written
    fn get_bool(&self, key: &str, default: bool) -> Result<bool>;

    /// Write a flag
    fn set_bool(&self, key: &str, value: bool) -> Result<()>;
}

impl SettingsStore for Database {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(match self.get_setting(key)?.as_deref() {
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                tracing::warn!(key, value = other, "Ignoring non-boolean setting");
                default
            }
            None => default,
        })
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_setting(key, if value { "true" } else { "false" })
    }
}

/// In-process settings, lost when dropped.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, bool>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        let values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        Ok(values.get(key).copied().unwrap_or(default))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}
