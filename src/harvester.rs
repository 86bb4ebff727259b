//! Library entry point tying the pieces together
//!
//! A [`Harvester`] owns one configuration document for its lifetime: it holds
//! the process lock, keeps the loaded [`RunConfig`], and runs the operations
//! that read or rewrite it.

use crate::checkpoint::{Checkpoint, ConfigStore, RunLock};
use crate::config::RunConfig;
use crate::error::Result;
use crate::fetcher::{HttpProfileFetcher, ProfileFetcher};
use crate::health_probe::SessionHealthProbe;
use crate::input::{self, ValidationSummary};
use crate::orchestrator::Orchestrator;
use crate::output::OutputWriter;
use crate::session_pool::SessionPool;
use crate::types::{ProbeReport, RunReport};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Handle on a locked configuration document
#[derive(Debug)]
pub struct Harvester {
    store: ConfigStore,
    config: RunConfig,
    shutdown: CancellationToken,
    _lock: RunLock,
}

impl Harvester {
    /// Lock and load the configuration document at `config_path`
    ///
    /// Fails with [`crate::Error::AlreadyRunning`] when another process holds
    /// the document, and with [`crate::Error::Config`] when it cannot be read.
    pub fn open(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let lock = RunLock::acquire(config_path)?;
        let store = ConfigStore::new(config_path);
        let config = store.load()?;

        tracing::info!(
            config = %config_path.display(),
            sessions = config.sessions.len(),
            last_processed_index = config.last_processed_index,
            "Configuration loaded"
        );

        Ok(Self {
            store,
            config,
            shutdown: CancellationToken::new(),
            _lock: lock,
        })
    }

    /// The configuration as last loaded or written
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Token that stops a run between items once cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The HTTP fetcher for the configured profile endpoint
    pub fn http_fetcher(&self) -> Arc<dyn ProfileFetcher> {
        Arc::new(HttpProfileFetcher::new(self.config.profile_endpoint.clone()))
    }

    /// Normalize the work file in place
    pub fn validate_input(&self) -> Result<ValidationSummary> {
        self.config.validate()?;
        input::validate_input(&self.config.input_file)
    }

    /// Run one batch: validate the work file, build the rotation, process up
    /// to `count` items from the checkpoint onward.
    pub async fn run(&mut self, fetcher: Arc<dyn ProfileFetcher>) -> Result<RunReport> {
        self.validate_input()?;
        let items = input::load_work_items(&self.config.input_file)?;
        let rotation = SessionPool::build(&self.config.sessions, self.config.max_active_sessions);
        let output = OutputWriter::open(&self.config.output_file)?;

        let checkpoint = Checkpoint::new(self.store.clone(), self.config.clone());
        let start_index = checkpoint.last_processed_index();
        let count = self.config.count;

        let mut orchestrator =
            Orchestrator::new(fetcher, checkpoint, output).with_shutdown(self.shutdown.clone());
        let report = orchestrator
            .process(&items, &rotation, start_index, count)
            .await;

        self.config = orchestrator.into_checkpoint().into_config();
        Ok(report)
    }

    /// Probe every session and rewrite the session table
    pub async fn probe(&mut self, fetcher: Arc<dyn ProfileFetcher>) -> Result<ProbeReport> {
        let mut checkpoint = Checkpoint::new(self.store.clone(), self.config.clone());
        let probe = SessionHealthProbe::from_config(fetcher, &self.config);
        let report = probe.probe(&mut checkpoint).await?;
        self.config = checkpoint.into_config();
        Ok(report)
    }

    /// Put the failure marker on the given work file rows
    pub fn mark_failures(&self, failed_indices: &[usize]) -> Result<usize> {
        if failed_indices.is_empty() {
            return Ok(0);
        }
        input::mark_failures(&self.config.input_file, failed_indices)
    }
}
