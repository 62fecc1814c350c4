//! Discovery of the most recent session bucket file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Finds the most recently modified bucket file in a directory.
///
/// The ingest service names files `{session}__{hour}.{ext}`; an optional
/// session prefix narrows candidates to one session. A missing directory or
/// an empty match set is not an error — discovery is retried on every poll.
pub struct SessionFileLocator {
    dir: PathBuf,
    prefix: Option<String>,
    suffix: String,
}

impl SessionFileLocator {
    pub fn new(dir: impl Into<PathBuf>, session_prefix: Option<&str>, ext: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: session_prefix.map(|p| format!("{p}__")),
            suffix: format!(".{ext}"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn matches(&self, name: &str) -> bool {
        if !name.ends_with(&self.suffix) {
            return false;
        }
        match &self.prefix {
            Some(prefix) => name.starts_with(prefix.as_str()),
            None => true,
        }
    }

    /// The matching file with the greatest modification time, or `None`.
    /// Equal modification times resolve to the last enumerated entry.
    pub fn latest(&self) -> io::Result<Option<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut best: Option<(SystemTime, PathBuf)> = None;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !self.matches(name) {
                continue;
            }
            // files that vanish mid-listing are simply skipped this round
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(mtime) = metadata.modified() else {
                continue;
            };
            if best.as_ref().map_or(true, |(t, _)| mtime >= *t) {
                best = Some((mtime, entry.path()));
            }
        }
        Ok(best.map(|(_, path)| path))
    }
}
