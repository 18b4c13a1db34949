//! Fake trackers shared by the dispatcher tests

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trackgate_core::{
    Analytics, CustomVariable, DeviceInfo, Error, EventHit, MemorySettings, Result,
    SettingsStore, Tracker, TrackerSettings,
};

/// One call made into a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    CustomVariable(u8, String, String),
    Event(String, String, String, i32),
    PageView(String),
}

/// Records every call; optionally fails or panics on hits, or fails one
/// setup step once.
#[derive(Default)]
pub struct RecordingTracker {
    calls: Mutex<Vec<Call>>,
    mode: FailureMode,
    setup_failure: Mutex<Option<SetupFailure>>,
}

/// Setup step that fails the first time it is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupFailure {
    Start,
    Variable(u8),
}

#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    None,
    Error,
    Panic,
}

impl RecordingTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(mode: FailureMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            ..Default::default()
        })
    }

    pub fn failing_setup_once(step: SetupFailure) -> Arc<Self> {
        Arc::new(Self {
            setup_failure: Mutex::new(Some(step)),
            ..Default::default()
        })
    }

    fn setup(&self, step: SetupFailure) -> Result<()> {
        let mut pending = self.setup_failure.lock().unwrap();
        if *pending == Some(step) {
            *pending = None;
            return Err(Error::Tracker(format!("simulated {:?} failure", step)));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn hits(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Event(..) | Call::PageView(_)))
            .collect()
    }

    pub fn custom_variable_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::CustomVariable(..)))
            .count()
    }

    pub fn start_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Start(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    fn hit(&self, call: Call) -> Result<()> {
        match self.mode {
            FailureMode::None => {
                self.calls.lock().unwrap().push(call);
                Ok(())
            }
            FailureMode::Error => Err(Error::Tracker("simulated write failure".to_string())),
            FailureMode::Panic => panic!("simulated tracker crash"),
        }
    }
}

impl Tracker for RecordingTracker {
    fn start(&self, settings: &TrackerSettings) -> Result<()> {
        self.setup(SetupFailure::Start)?;
        self.calls
            .lock()
            .unwrap()
            .push(Call::Start(settings.tracking_key.clone()));
        Ok(())
    }

    fn set_custom_variable(&self, var: &CustomVariable) -> Result<()> {
        self.setup(SetupFailure::Variable(var.index))?;
        self.calls.lock().unwrap().push(Call::CustomVariable(
            var.index,
            var.name.clone(),
            var.value.clone(),
        ));
        Ok(())
    }

    fn track_event(&self, event: &EventHit) -> Result<()> {
        self.hit(Call::Event(
            event.category.clone(),
            event.action.clone(),
            event.label.clone(),
            event.value,
        ))
    }

    fn track_page_view(&self, path: &str) -> Result<()> {
        self.hit(Call::PageView(path.to_string()))
    }
}

/// Blocks every hit until the test opens the gate.
pub struct GatedTracker {
    inner: Arc<RecordingTracker>,
    gate: Mutex<Receiver<()>>,
    entered: Mutex<Sender<()>>,
}

/// Test-side handles of a [`GatedTracker`]
pub struct Gate {
    release: Sender<()>,
    entered: Receiver<()>,
}

impl Gate {
    /// Let one blocked hit through
    pub fn release_one(&self) {
        self.release.send(()).unwrap();
    }

    /// Let `n` hits through
    pub fn release(&self, n: usize) {
        for _ in 0..n {
            self.release_one();
        }
    }

    /// Wait until a worker is inside the tracker
    pub fn wait_entered(&self) {
        self.entered
            .recv_timeout(Duration::from_secs(5))
            .expect("no hit reached the tracker");
    }
}

impl GatedTracker {
    pub fn new() -> (Arc<Self>, Arc<RecordingTracker>, Gate) {
        let (release, gate) = mpsc::channel();
        let (entered_tx, entered) = mpsc::channel();
        let inner = RecordingTracker::new();
        let tracker = Arc::new(Self {
            inner: Arc::clone(&inner),
            gate: Mutex::new(gate),
            entered: Mutex::new(entered_tx),
        });
        (tracker, inner, Gate { release, entered })
    }

    fn wait(&self) {
        let _ = self.entered.lock().unwrap().send(());
        self.gate
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5))
            .expect("gate never opened");
    }
}

impl Tracker for GatedTracker {
    fn start(&self, settings: &TrackerSettings) -> Result<()> {
        self.inner.start(settings)
    }

    fn set_custom_variable(&self, var: &CustomVariable) -> Result<()> {
        self.inner.set_custom_variable(var)
    }

    fn track_event(&self, event: &EventHit) -> Result<()> {
        self.wait();
        self.inner.track_event(event)
    }

    fn track_page_view(&self, path: &str) -> Result<()> {
        self.wait();
        self.inner.track_page_view(path)
    }
}

/// In-memory settings whose next `n` writes fail
pub struct FlakySettings {
    inner: MemorySettings,
    failing_writes: AtomicUsize,
}

impl FlakySettings {
    pub fn failing_writes(n: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemorySettings::new(),
            failing_writes: AtomicUsize::new(n),
        })
    }
}

impl SettingsStore for FlakySettings {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        self.inner.get_bool(key, default)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let failed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::Io(io::Error::new(io::ErrorKind::Other, "disk full")));
        }
        self.inner.set_bool(key, value)
    }
}

/// Gate over `tracker` and `store` with fixed device metadata
pub fn analytics(tracker: Arc<dyn Tracker>, store: Arc<dyn SettingsStore>) -> Analytics {
    Analytics::builder(tracker, store)
        .device(DeviceInfo::new("34", "Pixel 8"))
        .build()
        .unwrap()
}
