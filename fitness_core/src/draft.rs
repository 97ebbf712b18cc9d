//! Draft workout persistence with file locking.
//!
//! Each CLI invocation is its own process, so the draft being assembled is
//! kept in a small JSON file between runs. Reads take a shared lock, writes
//! go through a locked temp file that is renamed over the original.

use crate::{Error, Exercise, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// On-disk representation of the draft workout
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DraftFile {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl DraftFile {
    pub fn new(exercises: Vec<Exercise>) -> Self {
        Self { exercises }
    }

    /// Load the draft with a shared lock.
    ///
    /// A missing file is an empty draft. An unreadable or corrupted file is
    /// logged and also treated as an empty draft.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No draft file at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open draft file {:?}: {}. Starting empty.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock draft file {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;

        if let Err(e) = read {
            tracing::warn!("Failed to read draft file {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        match serde_json::from_str::<DraftFile>(&contents) {
            Ok(draft) => {
                tracing::debug!(
                    "Loaded draft with {} exercises from {:?}",
                    draft.exercises.len(),
                    path
                );
                Ok(draft)
            }
            Err(e) => {
                tracing::warn!("Failed to parse draft file {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Atomically replace the draft file
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Draft(format!("{:?} has no parent directory", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved draft with {} exercises to {:?}", self.exercises.len(), path);
        Ok(())
    }
}
