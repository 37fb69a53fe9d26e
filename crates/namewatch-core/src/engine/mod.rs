//! Poll loop
//!
//! The PollLoop is responsible for:
//! - Fetching the tracked profile via RemoteClient
//! - Classifying it against the last successful observation
//! - Dispatching change or reminder notifications
//! - Publishing a new Snapshot to SharedState
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   Profile   ┌────────────────┐
//! │ RemoteClient │────────────▶│    PollLoop    │
//! └──────────────┘             └────────────────┘
//!                                      │
//!         ┌────────────────────────────┼────────────────────────────┐
//!         │                            │                            │
//!         ▼                            ▼                            ▼
//! ┌────────────────┐        ┌──────────────────────┐        ┌──────────────┐
//! │ ChangeDetector │        │ NotificationDispatcher│        │ SharedState  │
//! │ (classify)     │        │ (notify)             │        │ (publish)    │
//! └────────────────┘        └──────────────────────┘        └──────────────┘
//! ```
//!
//! ## Cycle
//!
//! `Idle -> Fetching -> (Success | Failed) -> Sleeping -> Fetching ...`
//!
//! A failed fetch is logged and skipped: the remembered value and the published
//! snapshot stay as they were. The loop always reaches its sleep step.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::RemoteClient;
use crate::config::WatchConfig;
use crate::detector::{ChangeDetector, Classification};
use crate::error::{FetchError, Result};
use crate::notify::{NotificationAction, NotificationDispatcher, NotificationKind};
use crate::state::{SharedState, Snapshot};
use crate::traits::{NotificationSink, Profile, ProfileTransport};

/// Events emitted by the PollLoop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// Loop started
    Started { handle: String },

    /// Profile fetched successfully
    Observed { name: String, changed: bool },

    /// Display name changed
    NameChanged { previous: String, current: String },

    /// Fetch failed, cycle skipped
    FetchFailed { error: String },

    /// Notification handed to the sink
    NotificationSent { kind: NotificationKind },

    /// Notification was due but delivery failed
    NotificationFailed { kind: NotificationKind },

    /// Loop stopped
    Stopped { reason: String },
}

/// Result of one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The fetch succeeded and a new snapshot was published
    Observed {
        classification: Classification,
        notification: NotificationAction,
    },
    /// The fetch failed; nothing was published
    Skipped { error: String },
}

/// Poll-detect-notify loop for a single tracked account
///
/// ## Lifecycle
///
/// 1. Create with [`PollLoop::new()`] (configuration errors stop here)
/// 2. Start with [`PollLoop::run()`] or [`PollLoop::run_with_shutdown()`]
/// 3. The loop runs until a shutdown signal is received
///
/// ## Threading
///
/// The loop runs on a single task and owns its RemoteClient, ChangeDetector
/// and NotificationDispatcher. Only the [`SharedState`] handle is shared.
pub struct PollLoop {
    /// Tracked handle
    handle: String,

    /// Rate-limit aware lookup client
    client: RemoteClient,

    /// Last successful observation
    detector: ChangeDetector,

    /// Notification policy and sink
    dispatcher: NotificationDispatcher,

    /// Published snapshot
    state: SharedState,

    /// Delay between cycles
    poll_interval: Duration,

    /// When a change was last detected
    last_changed_at: Option<DateTime<Utc>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<PollEvent>,
}

impl PollLoop {
    /// Create a new poll loop
    ///
    /// # Parameters
    ///
    /// - `transport`: Profile lookup implementation
    /// - `sink`: Notification sink implementation
    /// - `state`: Shared snapshot handle (clone it for query handlers first)
    /// - `config`: namewatch configuration
    ///
    /// # Returns
    ///
    /// A tuple of (poll_loop, event_receiver) where event_receiver yields poll events
    pub fn new(
        transport: Box<dyn ProfileTransport>,
        sink: Box<dyn NotificationSink>,
        state: SharedState,
        config: WatchConfig,
    ) -> Result<(Self, mpsc::Receiver<PollEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.poll.event_channel_capacity);

        let poll_loop = Self {
            handle: config.target.handle.clone(),
            client: RemoteClient::new(transport, &config.rate_limit, config.retry.clone()),
            detector: ChangeDetector::new(),
            dispatcher: NotificationDispatcher::new(sink, &config.notify, Utc::now()),
            state,
            poll_interval: config.poll.interval(),
            last_changed_at: None,
            event_tx: tx,
        };

        Ok((poll_loop, rx))
    }

    /// Run the loop until Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the loop until `shutdown_rx` fires
    ///
    /// With `None`, the loop waits for Ctrl-C instead. The signal is checked
    /// while fetching (including rate-limit waits) and while sleeping; a cycle
    /// that has fetched successfully always finishes publishing.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        let mut shutdown_rx = shutdown_rx;

        info!(
            "Tracking @{} every {:?}",
            self.handle, self.poll_interval
        );
        self.emit_event(PollEvent::Started {
            handle: self.handle.clone(),
        });

        loop {
            let fetched = tokio::select! {
                result = self.client.fetch(&self.handle) => Some(result),
                _ = shutdown_signal(&mut shutdown_rx) => None,
            };

            let Some(result) = fetched else {
                break;
            };

            self.process(result).await;

            debug!("Sleeping {:?} until next check", self.poll_interval);
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown_signal(&mut shutdown_rx) => break,
            }
        }

        info!("Shutdown signal received");
        self.emit_event(PollEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        Ok(())
    }

    /// Run exactly one cycle without the trailing sleep
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let result = self.client.fetch(&self.handle).await;
        self.process(result).await
    }

    /// Shared snapshot handle
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Handle the result of one fetch
    async fn process(&mut self, result: std::result::Result<Profile, FetchError>) -> CycleOutcome {
        let profile = match result {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Failed to fetch @{}, skipping this check: {}", self.handle, e);
                self.emit_event(PollEvent::FetchFailed {
                    error: e.to_string(),
                });
                return CycleOutcome::Skipped {
                    error: e.to_string(),
                };
            }
        };

        let now = Utc::now();
        let classification = self.detector.check(&profile.name);

        match &classification {
            Classification::FirstObservation => {
                info!(
                    "Display name: {} (@{}), first observation",
                    profile.name, profile.handle
                );
            }
            Classification::Unchanged => {
                info!(
                    "@{} has not changed their display name ({})",
                    profile.handle, profile.name
                );
            }
            Classification::Changed { previous } => {
                info!(
                    "Alert! @{} changed their display name from '{}' to '{}'",
                    profile.handle, previous, profile.name
                );
                self.last_changed_at = Some(now);
                self.emit_event(PollEvent::NameChanged {
                    previous: previous.clone(),
                    current: profile.name.clone(),
                });
            }
        }

        let notification = self
            .dispatcher
            .maybe_notify(&classification, &profile, now)
            .await;

        match notification {
            NotificationAction::Sent(kind) => {
                self.emit_event(PollEvent::NotificationSent { kind });
            }
            NotificationAction::Failed(kind) => {
                self.emit_event(PollEvent::NotificationFailed { kind });
            }
            NotificationAction::None => {}
        }

        let changed = classification.is_changed();
        self.state
            .write(Snapshot::new(&profile, now, changed, self.last_changed_at))
            .await;
        self.detector.remember(&profile.name);

        self.emit_event(PollEvent::Observed {
            name: profile.name.clone(),
            changed,
        });

        CycleOutcome::Observed {
            classification,
            notification,
        }
    }

    /// Emit a poll event
    fn emit_event(&self, event: PollEvent) {
        // Dropped when nobody keeps up; the loop itself must never block on observers
        if self.event_tx.try_send(event).is_err() {
            debug!("Event channel full or closed, dropping poll event");
        }
    }
}

/// Resolve when the loop should stop
///
/// With a receiver, waits for it (a dropped sender also counts). Without one,
/// waits for Ctrl-C.
async fn shutdown_signal(shutdown_rx: &mut Option<oneshot::Receiver<()>>) {
    match shutdown_rx {
        Some(rx) => {
            let _ = rx.await;
        }
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}
