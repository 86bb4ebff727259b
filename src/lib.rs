//! # profile-harvester
//!
//! Resumable, multi-session profile harvesting.
//!
//! A run reads a work file of profile references, fetches each profile through
//! a rotation of credential sessions, appends one row per profile to a result
//! file, and records its position after every item. The next run picks up at
//! that position. A session whose fetch misses its deadline is disabled in the
//! configuration; the independent health probe re-enables it once it works
//! again.
//!
//! ## Quick Start
//!
//! ```no_run
//! use profile_harvester::Harvester;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut harvester = Harvester::open("config.json")?;
//!     let fetcher = harvester.http_fetcher();
//!
//!     let report = harvester.run(fetcher).await?;
//!     println!("resume at {}", report.end_index);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Durable run state and process lock
pub mod checkpoint;
/// Configuration types
pub mod config;
/// Minimal CSV reading and writing
pub mod csv;
/// Error types
pub mod error;
/// Profile fetch boundary
pub mod fetcher;
/// Library facade
pub mod harvester;
/// Session health probe
pub mod health_probe;
/// Work file validation and failure marking
pub mod input;
/// Main processing loop
pub mod orchestrator;
/// Result file writer
pub mod output;
/// Retry logic with exponential backoff
pub mod retry;
/// Active session rotation
pub mod session_pool;
/// Core types
pub mod types;
/// Per-fetch deadline enforcement
pub mod watchdog;

// Re-export commonly used types
pub use checkpoint::{Checkpoint, ConfigStore, RunLock};
pub use config::{RetryConfig, RunConfig};
pub use error::{Error, FetchError, Result};
pub use fetcher::{HttpProfileFetcher, ProfileFetcher};
pub use harvester::Harvester;
pub use health_probe::SessionHealthProbe;
pub use input::ValidationSummary;
pub use orchestrator::Orchestrator;
pub use output::OutputWriter;
pub use session_pool::{ActiveRotation, RotationSlot, SessionPool};
pub use types::{
    Profile, ProfileResult, ProbeReport, RunReport, Session, SessionHealth, WorkItem,
};
pub use watchdog::Watchdog;

use std::future::Future;
use std::sync::Arc;

/// Run one batch, stopping between items on a termination signal.
///
/// The item in flight when the signal arrives is finished and checkpointed;
/// the returned report's `end_index` is where the next run resumes.
///
/// - **Unix:** SIGTERM or SIGINT; falls back to Ctrl+C if neither can be registered.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use profile_harvester::{Harvester, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut harvester = Harvester::open("config.json")?;
///     let fetcher = harvester.http_fetcher();
///
///     let report = run_with_shutdown(&mut harvester, fetcher).await?;
///     println!("{} profiles saved", report.succeeded);
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    harvester: &mut Harvester,
    fetcher: Arc<dyn ProfileFetcher>,
) -> Result<RunReport> {
    run_until(harvester, fetcher, wait_for_signal()).await
}

/// Run one batch, stopping between items once `stop` completes.
///
/// [`run_with_shutdown`] passes a signal listener; any other future works
/// the same way.
pub async fn run_until<S>(
    harvester: &mut Harvester,
    fetcher: Arc<dyn ProfileFetcher>,
    stop: S,
) -> Result<RunReport>
where
    S: Future<Output = ()> + Send + 'static,
{
    let shutdown = harvester.shutdown_token();
    let watcher = tokio::spawn(async move {
        stop.await;
        shutdown.cancel();
    });

    let report = harvester.run(fetcher).await;
    watcher.abort();
    report
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::SignalKind;

    let mut terminate = listen(SignalKind::terminate(), "SIGTERM");
    let mut interrupt = listen(SignalKind::interrupt(), "SIGINT");

    let received = match (terminate.as_mut(), interrupt.as_mut()) {
        (Some(term), Some(int)) => tokio::select! {
            _ = term.recv() => "SIGTERM",
            _ = int.recv() => "SIGINT",
        },
        (Some(term), None) => {
            term.recv().await;
            "SIGTERM"
        }
        (None, Some(int)) => {
            int.recv().await;
            "SIGINT"
        }
        (None, None) => {
            tracing::error!("No termination signal can be watched, falling back to Ctrl+C");
            wait_for_ctrl_c().await;
            "Ctrl+C"
        }
    };
    tracing::warn!(signal = received, "Stopping run after the current item");
}

#[cfg(unix)]
fn listen(
    kind: tokio::signal::unix::SignalKind,
    name: &'static str,
) -> Option<tokio::signal::unix::Signal> {
    match tokio::signal::unix::signal(kind) {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!(signal = name, error = %e, "Cannot watch signal");
            None
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
    tracing::warn!(signal = "Ctrl+C", "Stopping run after the current item");
}

// A failed listener must not look like a shutdown request
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Ctrl+C listener failed, run will only stop when done");
        std::future::pending::<()>().await;
    }
}
