//! Session rotation
//!
//! The rotation is built once per run from the persisted session table and
//! never changes while the run lasts: item `i` always goes to slot
//! `i mod len`. Health changes made during a run (watchdog timeouts) are
//! written to the session table and only take effect the next time a
//! rotation is built.

use crate::types::Session;

/// One entry of the rotation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationSlot {
    /// Position of the session in the persisted session table
    pub config_index: usize,
    /// Credential token handed to the fetcher
    pub credential: String,
    /// Human-readable label, for logs
    pub tag: String,
}

/// Fixed, ordered list of active sessions for one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveRotation {
    slots: Vec<RotationSlot>,
}

impl ActiveRotation {
    /// Session assigned to the item at `source_index`, or `None` when the
    /// rotation is empty (no work can proceed)
    pub fn select(&self, source_index: usize) -> Option<&RotationSlot> {
        if self.slots.is_empty() {
            return None;
        }
        self.slots.get(source_index % self.slots.len())
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no session is eligible
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in rotation order
    pub fn slots(&self) -> &[RotationSlot] {
        &self.slots
    }
}

/// Builds rotations from a session table
pub struct SessionPool;

impl SessionPool {
    /// Take active sessions in listed order until `cap` is reached.
    pub fn build(sessions: &[Session], cap: usize) -> ActiveRotation {
        let mut slots = Vec::with_capacity(cap.min(sessions.len()));

        for (config_index, session) in sessions.iter().enumerate() {
            if !session.is_active() {
                tracing::info!(session = %session.tag, "Skipping disabled session");
                continue;
            }
            if slots.len() >= cap {
                tracing::warn!(
                    max_active_sessions = cap,
                    "Active session cap reached, remaining sessions left out of the rotation"
                );
                break;
            }
            slots.push(RotationSlot {
                config_index,
                credential: session.credential().to_string(),
                tag: session.tag.clone(),
            });
        }

        tracing::info!(active_sessions = slots.len(), "Session rotation built");
        ActiveRotation { slots }
    }
}
