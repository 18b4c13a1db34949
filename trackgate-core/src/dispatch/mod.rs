//! Fire-and-forget reporting
//!
//! Application code holds an [`Analytics`] gate, configures it once, and asks
//! it for a [`Reporter`] whenever it has something to record:
//!
//! - An enabled gate hands out an active reporter that puts one hit per call
//!   on a bounded queue and returns immediately.
//! - A fixed pool of workers drains the queue, calling the tracker on the
//!   blocking thread pool. Tracker errors and panics are logged and dropped.
//! - A disabled gate hands out a null reporter that does nothing.
//!
//! `shutdown` closes the queue and waits until the workers have delivered
//! everything that was accepted.

mod gate;
mod pool;
mod reporter;

pub use gate::{Analytics, AnalyticsBuilder, Dispatcher, DEFAULT_NETWORK_TIMEOUT};
pub use pool::{DispatchStats, Queue, WorkerPool};
pub use reporter::{ActiveReporter, NullReporter, Reporter};
