//! Main processing loop
//!
//! Items are processed strictly one at a time, in increasing source index
//! order. For each item the loop:
//! 1. picks the session at `index mod rotation length`;
//! 2. runs the fetch under the [`Watchdog`]; a missed deadline disables that
//!    session in the session table (the rotation itself is left alone);
//! 3. appends a row on success, logs a warning for a missing identity, logs an
//!    error and records the index for anything else;
//! 4. sleeps for the configured delay;
//! 5. advances and persists the checkpoint, whatever the outcome.
//!
//! Per-item failures never stop the loop. The run always ends with the index
//! it reached, which is where the next run resumes.

use crate::checkpoint::Checkpoint;
use crate::fetcher::ProfileFetcher;
use crate::output::OutputWriter;
use crate::session_pool::ActiveRotation;
use crate::types::{ProfileResult, RunReport, WorkItem};
use crate::watchdog::Watchdog;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives one run over a slice of the work list
pub struct Orchestrator {
    fetcher: Arc<dyn ProfileFetcher>,
    watchdog: Watchdog,
    delay: Duration,
    checkpoint: Checkpoint,
    output: OutputWriter,
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator; deadline and delay come from the checkpoint's configuration
    pub fn new(
        fetcher: Arc<dyn ProfileFetcher>,
        checkpoint: Checkpoint,
        output: OutputWriter,
    ) -> Self {
        let config = checkpoint.config();
        Self {
            fetcher,
            watchdog: Watchdog::new(config.fetch_timeout),
            delay: config.delay,
            checkpoint,
            output,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop between items once `shutdown` is cancelled
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// The checkpoint, reflecting every change made so far
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Give back the checkpoint
    pub fn into_checkpoint(self) -> Checkpoint {
        self.checkpoint
    }

    /// Process `items[start_index .. start_index + count]` (clamped to the list).
    pub async fn process(
        &mut self,
        items: &[WorkItem],
        rotation: &ActiveRotation,
        start_index: usize,
        count: usize,
    ) -> RunReport {
        let mut report = RunReport::idle(start_index);

        if rotation.is_empty() {
            tracing::error!(
                start_index,
                "No active session available, nothing will be processed"
            );
            return report;
        }

        let end_index = start_index
            .saturating_add(count)
            .min(items.len())
            .max(start_index);
        tracing::info!(
            start_index,
            end_index,
            total = items.len(),
            sessions = rotation.len(),
            "Starting run"
        );

        let mut reached = start_index;
        for (index, item) in items
            .iter()
            .enumerate()
            .take(end_index)
            .skip(start_index)
        {
            if self.shutdown.is_cancelled() {
                tracing::warn!(index, "Shutdown requested, stopping before next item");
                break;
            }

            self.process_item(index, item, rotation, &mut report).await;

            if !self.delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = self.shutdown.cancelled() => {}
                }
            }

            if let Err(e) = self.checkpoint.advance(index + 1) {
                tracing::error!(index, error = %e, "Failed to persist checkpoint");
            }
            reached = index + 1;
        }

        report.end_index = reached;
        report.finished_at = chrono::Utc::now();
        tracing::info!(
            end_index = reached,
            succeeded = report.succeeded,
            not_found = report.not_found,
            failed = report.failed_indices.len(),
            "Run finished"
        );
        report
    }

    async fn process_item(
        &mut self,
        index: usize,
        item: &WorkItem,
        rotation: &ActiveRotation,
        report: &mut RunReport,
    ) {
        let Some(slot) = rotation.select(index) else {
            return;
        };

        tracing::info!(
            index,
            identity = %item.identity,
            session = %slot.tag,
            "Processing item"
        );

        let fetcher = Arc::clone(&self.fetcher);
        let identity = item.identity.clone();
        let credential = slot.credential.clone();

        let watchdog = self.watchdog;
        let checkpoint = &mut self.checkpoint;
        let timed_out_sessions = &mut report.timed_out_sessions;
        let on_timeout = || {
            tracing::error!(
                index,
                session = %slot.tag,
                deadline_ms = watchdog.deadline().as_millis(),
                "Fetch deadline elapsed, disabling session"
            );
            match checkpoint.disable_session(slot.config_index) {
                Ok(Some(tag)) => timed_out_sessions.push(tag),
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Failed to persist disabled session"),
            }
        };

        let outcome = watchdog
            .run(
                move |cancel| async move {
                    fetcher.fetch_profile(&identity, &credential, cancel).await
                },
                on_timeout,
            )
            .await;

        match outcome {
            Ok(profile) => match self.output.append(&ProfileResult::new(profile, item)) {
                Ok(()) => {
                    report.succeeded += 1;
                    tracing::info!(index, identity = %item.identity, "Profile saved");
                }
                Err(e) => {
                    tracing::error!(index, error = %e, "Failed to append result row");
                    report.failed_indices.push(index);
                }
            },
            Err(e) if e.is_not_found() => {
                report.not_found += 1;
                tracing::warn!(index, identity = %item.identity, "Profile not found");
            }
            Err(e) => {
                tracing::error!(
                    index,
                    identity = %item.identity,
                    session = %slot.tag,
                    error = %e,
                    error_code = e.error_code(),
                    "Fetch failed"
                );
                report.failed_indices.push(index);
            }
        }
    }
}
