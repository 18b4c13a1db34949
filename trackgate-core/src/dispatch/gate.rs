//! The analytics gate: one-time configuration, the enable switch and
//! reporter selection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::runtime::Handle;

use super::pool::{DispatchStats, WorkerPool};
use super::reporter::{ActiveReporter, NullReporter, Reporter};
use crate::config::{Config, DispatchConfig};
use crate::device::DeviceInfo;
use crate::error::{Error, Result};
use crate::store::{SettingsStore, FIRST_RUN_KEY};
use crate::tracker::Tracker;
use crate::types::TrackerSettings;

/// Network timeout handed to the tracker unless overridden
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(300);

/// A started tracker together with the workers feeding it.
pub struct Dispatcher {
    tracking_key: String,
    pool: WorkerPool,
    reported_first_run: bool,
}

impl Dispatcher {
    /// Start the tracker, report device metadata if this is the first run,
    /// and spawn the workers.
    ///
    /// Everything before the workers is synchronous; it runs once per gate.
    fn start(
        settings: TrackerSettings,
        tracker: Arc<dyn Tracker>,
        store: &dyn SettingsStore,
        device: &DeviceInfo,
        dispatch: &DispatchConfig,
        handle: &Handle,
    ) -> Result<Self> {
        tracker.start(&settings)?;

        let first_run = store.get_bool(FIRST_RUN_KEY, true)?;
        if first_run {
            for var in device.custom_variables() {
                tracker.set_custom_variable(&var)?;
            }
            store.set_bool(FIRST_RUN_KEY, false)?;
            tracing::info!(
                platform_version = %device.platform_version,
                model = %device.model,
                "Reported first-run device metadata"
            );
        }

        let pool = WorkerPool::spawn(handle, tracker, dispatch);

        Ok(Self {
            tracking_key: settings.tracking_key,
            pool,
            reported_first_run: first_run,
        })
    }

    /// Key the tracker was started with
    pub fn tracking_key(&self) -> &str {
        &self.tracking_key
    }

    /// Whether this dispatcher reported the first-run device metadata
    pub fn reported_first_run(&self) -> bool {
        self.reported_first_run
    }

    pub fn stats(&self) -> DispatchStats {
        self.pool.queue().stats()
    }

    fn reporter(&self) -> ActiveReporter {
        ActiveReporter::new(Arc::clone(self.pool.queue()))
    }
}

/// Entry point for application code.
///
/// Build one at startup, share it by reference (or `Arc`), call
/// [`configure`](Self::configure) once, then fetch a reporter with
/// [`active`](Self::active) wherever something needs recording.
///
/// Configuring again only replaces the stored tracking key: the tracker
/// keeps the key it was first started with.
pub struct Analytics {
    tracker: Arc<dyn Tracker>,
    store: Arc<dyn SettingsStore>,
    device: DeviceInfo,
    network_timeout: Duration,
    dispatch: DispatchConfig,
    runtime: Option<Handle>,
    enabled: AtomicBool,
    tracking_key: RwLock<Option<String>>,
    dispatcher: RwLock<Option<Arc<Dispatcher>>>,
}

impl Analytics {
    pub fn builder(tracker: Arc<dyn Tracker>, store: Arc<dyn SettingsStore>) -> AnalyticsBuilder {
        AnalyticsBuilder {
            tracker,
            store,
            device: None,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            dispatch: DispatchConfig::default(),
            runtime: None,
        }
    }

    /// Start the tracker on first call; later calls only update the stored key.
    ///
    /// Must run inside a tokio runtime unless one was given to the builder.
    /// On error the gate stays unconfigured and a later call retries.
    pub fn configure(&self, tracking_key: &str) -> Result<()> {
        if tracking_key.trim().is_empty() {
            return Err(Error::Config("tracking key must not be empty".to_string()));
        }

        tracing::debug!(tracking_key, "configure()");

        let mut slot = self.dispatcher.write().unwrap_or_else(|p| p.into_inner());
        if let Some(existing) = slot.as_ref() {
            if existing.tracking_key() != tracking_key {
                tracing::warn!(
                    active = existing.tracking_key(),
                    requested = tracking_key,
                    "Tracker already started; new tracking key is stored but not applied"
                );
            }
            self.store_tracking_key(tracking_key);
            return Ok(());
        }

        let handle = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| {
                Error::Config("configure() must be called within a tokio runtime".to_string())
            })?,
        };

        let settings = TrackerSettings {
            tracking_key: tracking_key.to_string(),
            network_timeout: self.network_timeout,
        };
        let dispatcher = Dispatcher::start(
            settings,
            Arc::clone(&self.tracker),
            self.store.as_ref(),
            &self.device,
            &self.dispatch,
            &handle,
        )?;

        *slot = Some(Arc::new(dispatcher));
        self.store_tracking_key(tracking_key);
        Ok(())
    }

    fn store_tracking_key(&self, tracking_key: &str) {
        *self.tracking_key.write().unwrap_or_else(|p| p.into_inner()) =
            Some(tracking_key.to_string());
    }

    /// Flip the enable switch. Only later [`active`](Self::active) calls see it.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        tracing::debug!(enabled, "Analytics enable switch set");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Reporter for the current state of the enable switch.
    ///
    /// Fails with [`Error::NotConfigured`] until [`configure`](Self::configure) succeeded.
    pub fn active(&self) -> Result<Reporter> {
        let slot = self.dispatcher.read().unwrap_or_else(|p| p.into_inner());
        let dispatcher = slot.as_ref().ok_or(Error::NotConfigured)?;

        if !self.is_enabled() {
            return Ok(Reporter::Null(NullReporter));
        }
        Ok(Reporter::Active(dispatcher.reporter()))
    }

    /// Last key passed to a successful `configure`
    pub fn tracking_key(&self) -> Option<String> {
        self.tracking_key
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn is_configured(&self) -> bool {
        self.dispatcher().is_some()
    }

    /// The running dispatcher, once configured
    pub fn dispatcher(&self) -> Option<Arc<Dispatcher>> {
        self.dispatcher
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Dispatch counters; all zero before `configure`
    pub fn stats(&self) -> DispatchStats {
        self.dispatcher().map(|d| d.stats()).unwrap_or_default()
    }

    /// Stop accepting hits, deliver everything already queued and wait for the workers.
    ///
    /// Reporters keep working afterwards but drop what they are given.
    pub async fn shutdown(&self) {
        if let Some(dispatcher) = self.dispatcher() {
            dispatcher.pool.shutdown().await;
        }
    }
}

/// Builder for [`Analytics`].
pub struct AnalyticsBuilder {
    tracker: Arc<dyn Tracker>,
    store: Arc<dyn SettingsStore>,
    device: Option<DeviceInfo>,
    network_timeout: Duration,
    dispatch: DispatchConfig,
    runtime: Option<Handle>,
}

impl AnalyticsBuilder {
    /// Device metadata reported on first run (defaults to [`DeviceInfo::detect`])
    pub fn device(mut self, device: DeviceInfo) -> Self {
        self.device = Some(device);
        self
    }

    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    /// Queue size, worker count and the initial enable switch
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Runtime the workers are spawned on, for callers outside async code
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Apply the `[tracker]` and `[dispatch]` sections of a config file
    pub fn config(self, config: &Config) -> Self {
        self.network_timeout(config.tracker.network_timeout())
            .dispatch(config.dispatch.clone())
    }

    pub fn build(self) -> Result<Analytics> {
        self.dispatch.validate()?;
        if self.network_timeout.is_zero() {
            return Err(Error::Config("network timeout must be positive".to_string()));
        }

        Ok(Analytics {
            tracker: self.tracker,
            store: self.store,
            device: self.device.unwrap_or_else(DeviceInfo::detect),
            network_timeout: self.network_timeout,
            enabled: AtomicBool::new(self.dispatch.enabled),
            dispatch: self.dispatch,
            runtime: self.runtime,
            tracking_key: RwLock::new(None),
            dispatcher: RwLock::new(None),
        })
    }
}
