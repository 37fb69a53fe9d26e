// # namewatchd - Display Name Tracker Daemon
//
// The namewatchd daemon is a thin integration layer over namewatch-core:
// 1. Reading configuration from environment variables (and `.env`)
// 2. Initializing logging and the runtime
// 3. Building the X transport and the notification sink
// 4. Running the poll loop and the query server until SIGTERM/SIGINT
//
// Detection, notification policy and retry all live in namewatch-core.
// See `config.rs` for the full list of environment variables.
//
// ## Commands
//
// - `namewatchd` / `namewatchd run`: run the tracker (default)
// - `namewatchd test-email`: send one change-style and one reminder-style
//   message through the configured sink, then exit
//
// ## Example
//
// ```bash
// export NAMEWATCH_BEARER_TOKEN=your_token
// export NAMEWATCH_HANDLE=elonmusk
// export SENDER_EMAIL=alerts@example.com
// export SENDER_PASSWORD=app_password
// export RECEIVER_EMAIL=me@example.com
//
// namewatchd
// ```

mod config;
mod server;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use namewatch_core::notify::Notification;
use namewatch_core::{NotificationSink, PollEvent, PollLoop, SharedState};
use namewatch_notify_smtp::build_sink;
use namewatch_source_x::XUserTransport;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::{Config, TestEmailConfig};

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// How long the poll loop gets to stop after the server has shut down
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamewatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<NamewatchExitCode> for ExitCode {
    fn from(code: NamewatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "namewatchd", version, about = "Track a display name and notify on change")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Run the tracker and the query server (default)
    Run,
    /// Send test notifications through the configured sink and exit
    TestEmail,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // A missing .env file is fine; the environment may already be set
    if let Err(e) = dotenv::dotenv()
        && !e.not_found()
    {
        eprintln!("Failed to load .env file: {}", e);
        return NamewatchExitCode::ConfigError.into();
    }

    // Load configuration from environment
    let command = cli.command.unwrap_or(Command::Run);
    let config = match CommandConfig::from_env(command) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return NamewatchExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return NamewatchExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return NamewatchExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NamewatchExitCode::ConfigError.into();
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NamewatchExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match config {
            CommandConfig::Run(config) => run(config).await,
            CommandConfig::TestEmail(config) => test_email(config).await,
        }
    });

    result.into()
}

/// Configuration loaded for the selected command
enum CommandConfig {
    Run(Config),
    TestEmail(TestEmailConfig),
}

impl CommandConfig {
    fn from_env(command: Command) -> Result<Self> {
        Ok(match command {
            Command::Run => Self::Run(Config::from_env()?),
            Command::TestEmail => Self::TestEmail(TestEmailConfig::from_env()?),
        })
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Run(config) => config.validate(),
            Self::TestEmail(config) => config.validate(),
        }
    }

    fn log_level(&self) -> Result<Level> {
        match self {
            Self::Run(config) => config.log_level(),
            Self::TestEmail(config) => config.log_level(),
        }
    }
}

/// Build components, then run the daemon
async fn run(config: Config) -> NamewatchExitCode {
    info!("Starting namewatchd, tracking @{}", config.watch.target.handle);
    debug!("Configuration: {:?}", config);

    let components = match build_components(&config) {
        Ok(components) => components,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return NamewatchExitCode::ConfigError;
        }
    };

    if let Err(e) = run_daemon(config, components).await {
        error!("Daemon error: {:#}", e);
        NamewatchExitCode::RuntimeError
    } else {
        NamewatchExitCode::CleanShutdown
    }
}

/// Send one change-style and one reminder-style message
async fn test_email(config: TestEmailConfig) -> NamewatchExitCode {
    let sink = match build_sink(&config.email) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Startup error: {}", e);
            return NamewatchExitCode::ConfigError;
        }
    };

    match send_test_messages(sink.as_ref(), &config.handle).await {
        Ok(()) => NamewatchExitCode::CleanShutdown,
        Err(e) => {
            error!("Test email failed: {:#}", e);
            NamewatchExitCode::RuntimeError
        }
    }
}

async fn send_test_messages(sink: &dyn NotificationSink, handle: &str) -> Result<()> {
    let now = Utc::now();
    let messages = [
        Notification::change(handle, "Test Name", "Updated Test Name", now),
        Notification::reminder(handle, "Test Name", now),
    ];

    for message in &messages {
        sink.send(&message.subject, &message.body)
            .await
            .with_context(|| format!("Failed to send '{}'", message.subject))?;
        info!("Test email sent: {}", message.subject);
    }

    Ok(())
}

/// Transport and sink built from configuration
struct Components {
    transport: XUserTransport,
    sink: Box<dyn NotificationSink>,
}

fn build_components(config: &Config) -> Result<Components> {
    let transport = XUserTransport::new(config.bearer_token.clone(), config.api_base.clone())
        .context("Failed to create X API transport")?;
    let sink = build_sink(&config.email).context("Failed to create notification sink")?;

    info!(
        "Notification sink: {}, mode: {:?}",
        sink.sink_name(),
        config.watch.notify.mode
    );

    Ok(Components { transport, sink })
}

/// Run the poll loop and the query server until a shutdown signal
async fn run_daemon(config: Config, components: Components) -> Result<()> {
    let Components { transport, sink } = components;
    let handle = config.watch.target.handle.clone();
    let state = SharedState::new();

    let (mut poll_loop, mut events) =
        PollLoop::new(Box::new(transport), sink, state.clone(), config.watch)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    // Install handlers before anything starts so a failure aborts cleanly
    let signals = ShutdownSignals::install()?;

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("Query server listening on http://{}", config.listen_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let poll_task = tokio::spawn(async move { poll_loop.run_with_shutdown(Some(shutdown_rx)).await });

    let serve_result = axum::serve(listener, server::router(state, handle))
        .with_graceful_shutdown(async move {
            let signal = signals.recv().await;
            info!("Received shutdown signal: {}", signal);
        })
        .await;

    info!("Shutting down daemon");
    // The loop may already have stopped; nothing to notify then
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, poll_task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => anyhow::bail!("Poll loop task failed: {}", e),
        Err(_) => anyhow::bail!("Poll loop did not stop within {:?}", SHUTDOWN_TIMEOUT),
    }

    serve_result.context("Query server failed")?;

    Ok(())
}

fn log_event(event: &PollEvent) {
    match event {
        PollEvent::NotificationFailed { kind } => {
            warn!("{:?} notification was due but not delivered", kind)
        }
        other => debug!("Poll event: {:?}", other),
    }
}

/// SIGTERM and SIGINT handlers
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for either signal and return its name
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Ctrl-C handler
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}
