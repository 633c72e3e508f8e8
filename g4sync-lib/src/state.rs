use crate::error::G4Error;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Time of the last successful sync, stored as ASCII milliseconds since the
/// Unix epoch.
#[derive(Debug, Clone)]
pub struct LastSyncStore {
    path: PathBuf,
}

impl LastSyncStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored instant. A missing file means "never synced" and reads
    /// as the Unix epoch.
    pub fn load(&self) -> Result<DateTime<Utc>, G4Error> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No last sync file at {}", self.path.display());
                return Ok(DateTime::UNIX_EPOCH);
            }
            Err(e) => return Err(e.into()),
        };
        let millis: i64 = text.trim().parse().map_err(|_| {
            G4Error::InvalidSyncState(format!(
                "last sync file {} does not hold a millisecond count: {:?}",
                self.path.display(),
                text.trim()
            ))
        })?;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| G4Error::InvalidSyncState(format!("last sync time {millis} is out of range")))
    }

    /// Record `instant` as the last successful sync.
    pub fn store(&self, instant: DateTime<Utc>) -> Result<(), G4Error> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, instant.timestamp_millis().to_string())?;
        fs::rename(&tmp, &self.path)?;
        info!("Last sync time set to {}", instant.to_rfc3339());
        Ok(())
    }
}
