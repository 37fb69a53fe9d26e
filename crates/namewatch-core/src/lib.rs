// # namewatch-core
//
// Core library for the namewatch display-name tracker.
//
// ## Architecture Overview
//
// This library provides the poll-detect-notify loop:
// - **ProfileTransport**: Trait for a single-shot remote profile lookup
// - **RemoteClient**: Rate-window bookkeeping and bounded retry around a transport
// - **ChangeDetector**: Classifies each observation against the last known value
// - **NotificationDispatcher**: Decides when to notify and sends through a `NotificationSink`
// - **SharedState**: The latest `Snapshot`, readable from any number of tasks
// - **PollLoop**: Orchestrates fetch -> classify -> notify -> publish -> sleep
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Transports and sinks are plugins; policy lives here
// 2. **Bounded Failure**: Every steady-state error degrades one cycle only
// 3. **Library-First**: The daemon is a thin integration layer over this crate
// 4. **Explicit Sharing**: `SharedState` is the only state crossing task boundaries

pub mod traits;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod client;
pub mod detector;
pub mod notify;
pub mod state;
pub mod engine;

// Re-export core types for convenience
pub use traits::{NotificationSink, ProfileTransport};
pub use client::RemoteClient;
pub use config::{NotifyMode, WatchConfig};
pub use detector::{ChangeDetector, Classification};
pub use engine::{CycleOutcome, PollEvent, PollLoop};
pub use error::{Error, FetchError, Result, SendError, TransportError};
pub use notify::{DisabledSink, MemorySink, NotificationAction, NotificationDispatcher};
pub use rate_limit::RateLimiter;
pub use state::{SharedState, Snapshot};
