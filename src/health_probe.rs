//! Session health probe
//!
//! Checks every configured session, active or not, by fetching a fixed
//! reference identity with that session's credential. A reachable session is
//! enabled, an unreachable one disabled. The table is written back once, after
//! every session has been checked.

use crate::checkpoint::Checkpoint;
use crate::config::{RetryConfig, RunConfig};
use crate::error::{FetchError, Result};
use crate::fetcher::ProfileFetcher;
use crate::retry::with_retry;
use crate::types::ProbeReport;
use crate::watchdog::Watchdog;
use std::sync::Arc;

/// Probes sessions against a reference identity
pub struct SessionHealthProbe {
    fetcher: Arc<dyn ProfileFetcher>,
    reference_identity: String,
    watchdog: Watchdog,
    retry: RetryConfig,
}

impl SessionHealthProbe {
    /// Build a probe from the run configuration
    pub fn from_config(fetcher: Arc<dyn ProfileFetcher>, config: &RunConfig) -> Self {
        Self {
            fetcher,
            reference_identity: config.probe_identity.clone(),
            watchdog: Watchdog::new(config.fetch_timeout),
            retry: config.probe_retry.clone(),
        }
    }

    /// Check a single credential. Transient failures are retried.
    pub async fn check(&self, credential: &str) -> std::result::Result<(), FetchError> {
        with_retry(&self.retry, || {
            let fetcher = Arc::clone(&self.fetcher);
            let identity = self.reference_identity.clone();
            let credential = credential.to_string();
            self.watchdog.run(
                move |cancel| async move {
                    fetcher.fetch_profile(&identity, &credential, cancel).await
                },
                || {},
            )
        })
        .await
        .map(|_| ())
    }

    /// Probe every session in the checkpoint's table and persist the result once
    pub async fn probe(&self, checkpoint: &mut Checkpoint) -> Result<ProbeReport> {
        let credentials: Vec<String> = checkpoint
            .config()
            .sessions
            .iter()
            .map(|s| s.credential().to_string())
            .collect();

        let mut outcomes = Vec::with_capacity(credentials.len());
        for credential in &credentials {
            outcomes.push(self.check(credential).await);
        }

        let mut report = ProbeReport::default();
        for (session, outcome) in checkpoint.sessions_mut().iter_mut().zip(outcomes) {
            report.checked += 1;
            match outcome {
                Ok(()) => {
                    if session.enable() {
                        tracing::info!(session = %session.display_tag(), "Session reachable again, enabled");
                        report.enabled.push(session.display_tag().to_string());
                    } else {
                        report.unchanged += 1;
                    }
                }
                Err(e) => {
                    if session.disable() {
                        tracing::warn!(
                            session = %session.display_tag(),
                            error = %e,
                            "Session unreachable, disabled"
                        );
                        report.disabled.push(session.display_tag().to_string());
                    } else {
                        tracing::debug!(session = %session.display_tag(), error = %e, "Session still unreachable");
                        report.unchanged += 1;
                    }
                }
            }
        }

        checkpoint.persist()?;
        tracing::info!(
            checked = report.checked,
            enabled = report.enabled.len(),
            disabled = report.disabled.len(),
            "Session health probe complete"
        );
        Ok(report)
    }
}
