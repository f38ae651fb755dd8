//! Issue lifecycle, scoring and notification dispatch engine.
//!
//! Everything here is built against the repository traits in [`store`];
//! binaries wire the Postgres store, tests wire the in-memory one.

pub mod classify;
pub mod events;
pub mod issue;
pub mod lifecycle;
pub mod notification;
pub mod notify;
pub mod pagination;
pub mod scoring;
pub mod store;
pub mod testutil;
pub mod transcribe;

pub use classify::{Classification, Classifier};
pub use events::{DomainEvent, EventBus};
pub use lifecycle::LifecycleEngine;
pub use notify::dispatcher::Dispatcher;
