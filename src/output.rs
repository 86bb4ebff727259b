//! Result file writer
//!
//! One row per fetched profile, appended and synced before the next item
//! starts. The column header is written exactly once: before the first row
//! ever appended to the file, judged by whether the file already had any
//! content when the writer was opened.

use crate::csv::write_row;
use crate::error::Result;
use crate::types::ProfileResult;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Result file columns, in order
pub const OUTPUT_COLUMNS: [&str; 17] = [
    "instagramID",
    "Username",
    "query",
    "Full Name",
    "followersCount",
    "followingCount",
    "PostCount",
    "bio",
    "website",
    "Is Private",
    "Is Verified",
    "imageUrl",
    "Category",
    "City",
    "Business Phone Number",
    "Business Email",
    "Business Address",
];

/// Streaming, append-only writer for the result file
#[derive(Debug)]
pub struct OutputWriter {
    path: PathBuf,
    header_written: bool,
}

impl OutputWriter {
    /// Prepare to append to `path`. The file is not created until the first row.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let header_written = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() > 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            header_written,
        })
    }

    /// Path of the result file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one result row, preceded by the header if the file has none yet
    pub fn append(&mut self, result: &ProfileResult) -> Result<()> {
        let mut buf: Vec<u8> = Vec::new();
        if !self.header_written {
            write_row(&mut buf, &OUTPUT_COLUMNS)?;
        }
        write_row(&mut buf, &result_row(result))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        std::io::Write::write_all(&mut file, &buf)?;
        file.sync_data()?;

        self.header_written = true;
        Ok(())
    }
}

fn result_row(result: &ProfileResult) -> Vec<String> {
    let profile = &result.profile;
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        profile.user_id.to_string(),
        profile.username.clone(),
        profile.canonical_url(),
        profile.full_name.clone(),
        profile.followers.to_string(),
        profile.followees.to_string(),
        profile.media_count.to_string(),
        profile.biography.clone(),
        optional(&profile.external_url),
        profile.is_private.to_string(),
        profile.is_verified.to_string(),
        profile.profile_pic_url.clone(),
        result.category.clone(),
        result.city.clone(),
        optional(&profile.business_phone_number),
        optional(&profile.business_email),
        optional(&profile.business_address),
    ]
}
