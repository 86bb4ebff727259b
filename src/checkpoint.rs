//! Durable run state
//!
//! The checkpoint is not a file of its own: it is the `last_processed_index`
//! and `sessions` fields of [`RunConfig`], written back to the configuration
//! document after every state change.
//!
//! - [`ConfigStore`] loads the document and saves it atomically
//!   (temp file, fsync, rename), so a crash mid-write never leaves a torn file.
//! - [`RunLock`] holds an exclusive lock next to the document for the
//!   lifetime of a run or probe; a second process gets
//!   [`Error::AlreadyRunning`].
//! - [`Checkpoint`] owns the in-memory [`RunConfig`] for a run and is the
//!   only writer of it.

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::types::Session;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reads and atomically rewrites the configuration document
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store for the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. Missing, empty, or malformed files are fatal.
    pub fn load(&self) -> Result<RunConfig> {
        let content = fs::read_to_string(&self.path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {e}", self.path.display()),
            key: None,
        })?;

        if content.trim().is_empty() {
            return Err(Error::Config {
                message: format!("{} is empty", self.path.display()),
                key: None,
            });
        }

        RunConfig::from_json(&content)
    }

    /// Save the document atomically
    pub fn save(&self, config: &RunConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

/// Replace `path` with `contents` via a sibling temp file, fsync, and rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(contents)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)
}

/// Exclusive process-level lock for one configuration document
///
/// Released when dropped.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    lock_path: PathBuf,
}

impl RunLock {
    /// Lock `<config>.lock`, failing immediately if another process holds it
    pub fn acquire(config_path: &Path) -> Result<Self> {
        let lock_path = config_path.with_extension("lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        fs2::FileExt::try_lock_exclusive(&file)
            .map_err(|_| Error::AlreadyRunning {
                lock_path: lock_path.clone(),
            })?;

        tracing::debug!(lock = %lock_path.display(), "Run lock acquired");
        Ok(Self { file, lock_path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Single writer of the run configuration during a run
#[derive(Debug)]
pub struct Checkpoint {
    store: ConfigStore,
    config: RunConfig,
}

impl Checkpoint {
    /// Wrap a loaded configuration
    pub fn new(store: ConfigStore, config: RunConfig) -> Self {
        Self { store, config }
    }

    /// Load the configuration from `store`
    pub fn load(store: ConfigStore) -> Result<Self> {
        let config = store.load()?;
        Ok(Self::new(store, config))
    }

    /// Current configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Index of the next item to process
    pub fn last_processed_index(&self) -> usize {
        self.config.last_processed_index
    }

    /// Record that everything before `next_index` has been processed and
    /// persist. The index never moves backwards.
    pub fn advance(&mut self, next_index: usize) -> Result<()> {
        if next_index > self.config.last_processed_index {
            self.config.last_processed_index = next_index;
        }
        self.persist()
    }

    /// Disable the session at `config_index` in the session table and
    /// persist. Returns the session's tag when the record changed.
    pub fn disable_session(&mut self, config_index: usize) -> Result<Option<String>> {
        let Some(session) = self.config.sessions.get_mut(config_index) else {
            return Ok(None);
        };
        if !session.disable() {
            return Ok(None);
        }
        let tag = session.display_tag().to_string();
        self.persist()?;
        Ok(Some(tag))
    }

    /// Mutable access to the session table; call [`Checkpoint::persist`] after
    pub fn sessions_mut(&mut self) -> &mut [Session] {
        &mut self.config.sessions
    }

    /// Write the configuration back to disk
    pub fn persist(&self) -> Result<()> {
        self.store.save(&self.config)
    }

    /// Give back the configuration
    pub fn into_config(self) -> RunConfig {
        self.config
    }
}
