//! The offline worker: lifecycle handlers and the host that drives them.
//!
//! # Components
//!
//! - `lifecycle`: the cache lifecycle manager (install, activate, fetch).
//! - `events`: install/activate events with wait-until, fetch events with
//!   respond-with.
//! - `runtime`: one worker instance and its state machine.
//! - `registration`: active/waiting instances and version swaps.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod events;
pub mod lifecycle;
pub mod registration;
pub mod runtime;
pub mod scope;
pub mod state;

pub use events::{EventKind, ExtendableEvent, FetchEvent};
pub use lifecycle::{network_first, CacheLifecycleManager, LifecycleHandler};
pub use registration::Registration;
pub use runtime::WorkerRuntime;
pub use scope::WorkerGlobalScope;
pub use state::WorkerState;
