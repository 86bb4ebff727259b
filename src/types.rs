//! Core types for profile-harvester

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix on a persisted `session_id` marking the session as disabled
pub const DISABLED_SENTINEL: char = '#';

/// Suffix on a persisted `tag` marking the session as disabled
pub const DISABLED_TAG_SUFFIX: &str = " - Disabled";

/// Base of the canonical profile URL written to the result file
pub const PROFILE_URL_BASE: &str = "https://www.instagram.com/";

/// Session health, derived from the persisted record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionHealth {
    /// Eligible for the rotation
    Active,
    /// Skipped when the rotation is built
    Disabled,
}

/// A credential session as persisted in the configuration
///
/// Health is encoded in the record itself: a disabled session carries the
/// [`DISABLED_SENTINEL`] in front of its id and [`DISABLED_TAG_SUFFIX`] after
/// its tag. [`Session::disable`] and [`Session::enable`] always move both
/// markers together and are idempotent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Raw credential token, prefixed with the sentinel when disabled
    pub session_id: String,
    /// Human-readable label
    pub tag: String,
}

impl Session {
    /// Create an active session
    pub fn new(session_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            tag: tag.into(),
        }
    }

    /// Current health
    pub fn health(&self) -> SessionHealth {
        if self.session_id.starts_with(DISABLED_SENTINEL) {
            SessionHealth::Disabled
        } else {
            SessionHealth::Active
        }
    }

    /// True when the session may join the rotation
    pub fn is_active(&self) -> bool {
        self.health() == SessionHealth::Active
    }

    /// The credential token with every sentinel stripped
    pub fn credential(&self) -> &str {
        self.session_id.trim_start_matches(DISABLED_SENTINEL)
    }

    /// The tag without any disabled suffix
    pub fn display_tag(&self) -> &str {
        let mut tag = self.tag.as_str();
        while let Some(stripped) = tag.strip_suffix(DISABLED_TAG_SUFFIX) {
            tag = stripped;
        }
        tag
    }

    /// Mark the session disabled. Returns `true` if the record changed.
    pub fn disable(&mut self) -> bool {
        let session_id = format!("{DISABLED_SENTINEL}{}", self.credential());
        let tag = format!("{}{DISABLED_TAG_SUFFIX}", self.display_tag());
        self.replace_markers(session_id, tag)
    }

    /// Mark the session active. Returns `true` if the record changed.
    pub fn enable(&mut self) -> bool {
        let session_id = self.credential().to_string();
        let tag = self.display_tag().to_string();
        self.replace_markers(session_id, tag)
    }

    fn replace_markers(&mut self, session_id: String, tag: String) -> bool {
        let changed = session_id != self.session_id || tag != self.tag;
        self.session_id = session_id;
        self.tag = tag;
        changed
    }
}

/// One row of validated work
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    /// Identity requested from the upstream (a profile handle)
    pub identity: String,
    /// Category passthrough
    pub category: String,
    /// City passthrough
    pub city: String,
    /// Position in the validated work list; the unit the checkpoint advances over
    pub source_index: usize,
}

impl WorkItem {
    /// Build an item from the reference column and passthrough fields
    pub fn new(
        reference: &str,
        category: impl Into<String>,
        city: impl Into<String>,
        source_index: usize,
    ) -> Self {
        Self {
            identity: identity_from_reference(reference),
            category: category.into(),
            city: city.into(),
            source_index,
        }
    }
}

/// Turn a work-file reference into an identity.
///
/// Profile links (`https://host/<handle>/`, or `host/<handle>/` without a
/// scheme) yield their last non-empty path segment; bare handles are used as
/// given, minus a leading `@`.
pub fn identity_from_reference(reference: &str) -> String {
    let reference = reference.trim();
    let parsed = url::Url::parse(reference).or_else(|e| {
        if reference.contains('/') {
            url::Url::parse(&format!("https://{reference}"))
        } else {
            Err(e)
        }
    });
    if let Ok(url) = parsed {
        if url.has_host() {
            if let Some(segment) = url
                .path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            {
                return segment.to_string();
            }
        }
    }
    reference.trim_start_matches('@').to_string()
}

/// Profile data returned by a fetcher
///
/// Fields the upstream may omit are explicit options; nothing is inferred.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Numeric upstream identifier
    pub user_id: u64,
    /// Handle
    pub username: String,
    /// Display name
    #[serde(default)]
    pub full_name: String,
    /// Follower count
    pub followers: u64,
    /// Following count
    pub followees: u64,
    /// Post count
    pub media_count: u64,
    /// Biography text
    #[serde(default)]
    pub biography: String,
    /// External website
    #[serde(default)]
    pub external_url: Option<String>,
    /// Privacy flag
    #[serde(default)]
    pub is_private: bool,
    /// Verification flag
    #[serde(default)]
    pub is_verified: bool,
    /// Profile image URL
    #[serde(default)]
    pub profile_pic_url: String,
    /// Business contact phone
    #[serde(default)]
    pub business_phone_number: Option<String>,
    /// Business contact email
    #[serde(default)]
    pub business_email: Option<String>,
    /// Business address
    #[serde(default)]
    pub business_address: Option<String>,
}

impl Profile {
    /// Canonical profile URL for this handle
    pub fn canonical_url(&self) -> String {
        format!("{PROFILE_URL_BASE}{}/", self.username)
    }
}

/// A fetched profile together with the work item's passthrough fields
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileResult {
    /// The fetched profile
    pub profile: Profile,
    /// Category from the work item
    pub category: String,
    /// City from the work item
    pub city: String,
}

impl ProfileResult {
    /// Attach a work item's passthrough fields to a profile
    pub fn new(profile: Profile, item: &WorkItem) -> Self {
        Self {
            profile,
            category: item.category.clone(),
            city: item.city.clone(),
        }
    }
}

/// Summary of one orchestrator run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Index the run started from
    pub start_index: usize,
    /// Index to resume from next time
    pub end_index: usize,
    /// Items written to the result file
    pub succeeded: usize,
    /// Items whose identity did not exist upstream
    pub not_found: usize,
    /// Source indices of items that failed (errors and timeouts)
    pub failed_indices: Vec<usize>,
    /// Tags of sessions disabled by the watchdog during this run
    pub timed_out_sessions: Vec<String>,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// A report for a run that processed nothing
    pub fn idle(start_index: usize) -> Self {
        let now = Utc::now();
        Self {
            start_index,
            end_index: start_index,
            succeeded: 0,
            not_found: 0,
            failed_indices: Vec::new(),
            timed_out_sessions: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Number of items the run stepped over
    pub fn processed(&self) -> usize {
        self.end_index - self.start_index
    }
}

/// Summary of one health probe pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Sessions probed
    pub checked: usize,
    /// Tags of sessions flipped from disabled to active
    pub enabled: Vec<String>,
    /// Tags of sessions flipped from active to disabled
    pub disabled: Vec<String>,
    /// Sessions whose health did not change
    pub unchanged: usize,
}
