//! Client-side engine that keeps an infoview in sync with a remote
//! language-analysis worker.
//!
//! Everything runs on one thread: shared state is `Rc<RefCell<_>>` and
//! background work is spawned with `tokio::task::spawn_local`, so callers
//! drive the engine from inside a [`tokio::task::LocalSet`].

pub mod bus;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod goals;
pub mod host;
pub mod messages;
pub mod pause;
pub mod protocol;
pub mod router;
pub mod throttle;
pub mod transport;

mod session;

pub use bus::{EventEmitter, Subscription};
pub use config::SchedulerConfig;
pub use diagnostics::{DiagnosticsAggregator, DiagnosticsSnapshot};
pub use error::{HostError, WorkerError};
pub use goals::{GoalOrchestrator, GoalState, GoalStatus};
pub use host::{EditorHost, GoalWorker, HostCommand, LocalFut, run_host_pump};
pub use messages::{KeyedMessage, order_messages};
pub use pause::Pausable;
pub use router::NotificationRouter;
pub use session::{InfoviewSession, UiState};
pub use throttle::DelayedThrottle;
pub use transport::{InboundNotification, StdioHost};
