//! Live-tail reading of a growing, rotating bucket file.
//!
//! The reader binds to whichever file the locator reports as newest and
//! follows its live edge. Binding always seeks to the current end of file:
//! content that existed before the bind is never replayed. When the ingest
//! service rolls over to a new hour bucket, the locator starts reporting the
//! new path; the reader verifies the change with a filesystem identity token
//! before releasing the old handle and rebinding at the new file's live end.

use std::fs;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::info;

use super::locator::SessionFileLocator;

/// Identity token used to reject false rotation positives, such as
/// modification-time ties making the locator flap between paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileIdentity(u64);

impl FileIdentity {
    #[cfg(unix)]
    fn of(metadata: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        FileIdentity(metadata.ino())
    }

    /// Without inodes this falls back to length + mtime, which is weaker:
    /// a rotation replacing a file with an equally sized, equally stamped
    /// one would go undetected.
    #[cfg(not(unix))]
    fn of(metadata: &fs::Metadata) -> Self {
        use std::time::UNIX_EPOCH;
        let mtime_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos() as u64);
        FileIdentity(metadata.len().wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ mtime_nanos)
    }
}

struct TailState {
    path: PathBuf,
    reader: BufReader<File>,
    identity: FileIdentity,
    offset: u64,
}

/// The outcome of one poll.
#[derive(Debug, Default)]
pub struct TailPoll {
    /// Complete lines appended since the previous poll, in order,
    /// terminators stripped.
    pub lines: Vec<String>,
    /// True when this poll bound a file (first discovery or rotation);
    /// downstream state keyed to the followed file should reset.
    pub rebound: bool,
}

/// Follows the newest session file at its live edge.
pub struct TailReader {
    locator: SessionFileLocator,
    state: Option<TailState>,
    max_lines: usize,
}

impl TailReader {
    pub fn new(locator: SessionFileLocator, max_lines: usize) -> Self {
        Self {
            locator,
            state: None,
            max_lines,
        }
    }

    /// The path currently being followed, if any.
    pub fn followed_path(&self) -> Option<&Path> {
        self.state.as_ref().map(|s| s.path.as_path())
    }

    /// Byte offset of the read position in the followed file. Never
    /// decreases except on rotation.
    pub fn offset(&self) -> Option<u64> {
        self.state.as_ref().map(|s| s.offset)
    }

    /// Read up to `max_lines` complete lines appended since the last poll.
    ///
    /// A trailing partial line is left unconsumed by rewinding the read
    /// position, so it is delivered whole on a later poll. Returns
    /// immediately when no new data exists. Errors are transient: the
    /// caller retries on the next poll.
    pub fn read_new(&mut self) -> io::Result<TailPoll> {
        let rebound = self.rebind_if_rotated()?;
        let mut poll = TailPoll {
            lines: Vec::new(),
            rebound,
        };
        let Some(state) = &mut self.state else {
            return Ok(poll);
        };

        let mut line = String::new();
        for _ in 0..self.max_lines {
            line.clear();
            let n = state.reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            if !line.ends_with('\n') {
                // partial line: rewind so only complete lines are consumed
                state.reader.seek_relative(-(n as i64))?;
                break;
            }
            state.offset += n as u64;
            poll.lines
                .push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        Ok(poll)
    }

    fn rebind_if_rotated(&mut self) -> io::Result<bool> {
        let Some(latest) = self.locator.latest()? else {
            return Ok(false);
        };
        match &self.state {
            None => {
                self.bind(&latest)?;
                Ok(true)
            }
            Some(state) if state.path != latest => {
                let identity = FileIdentity::of(&fs::metadata(&latest)?);
                if identity != state.identity {
                    self.bind(&latest)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Some(_) => Ok(false),
        }
    }

    fn bind(&mut self, path: &Path) -> io::Result<()> {
        let file = File::open(path)?;
        let identity = FileIdentity::of(&file.metadata()?);
        let mut reader = BufReader::new(file);
        // start at the live edge; earlier content is history, not signal
        let offset = reader.seek(SeekFrom::End(0))?;
        info!(path = %path.display(), offset, "following");
        self.state = Some(TailState {
            path: path.to_path_buf(),
            reader,
            identity,
            offset,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::time::{Duration, UNIX_EPOCH};

    fn append(path: &Path, data: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(data.as_bytes()).unwrap();
    }

    fn set_mtime(path: &Path, mtime_s: u64) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(mtime_s))
            .unwrap();
    }

    fn reader_for(dir: &Path) -> TailReader {
        TailReader::new(SessionFileLocator::new(dir, None, "csv"), 4096)
    }

    #[test]
    fn test_existing_content_is_never_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s__20250826_22.csv");
        append(&path, "#header\n1,100,0\n2,101,0\n");

        let mut tail = reader_for(dir.path());
        let poll = tail.read_new().unwrap();
        assert!(poll.rebound);
        assert!(poll.lines.is_empty());

        append(&path, "3,102,0\n");
        let poll = tail.read_new().unwrap();
        assert_eq!(poll.lines, vec!["3,102,0"]);
    }

    #[test]
    fn test_partial_line_left_unconsumed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s__20250826_22.csv");
        append(&path, "");

        let mut tail = reader_for(dir.path());
        tail.read_new().unwrap();

        append(&path, "1,100,0\n2,10");
        let poll = tail.read_new().unwrap();
        assert_eq!(poll.lines, vec!["1,100,0"]);

        // the fragment stays pending until its newline arrives
        let poll = tail.read_new().unwrap();
        assert!(poll.lines.is_empty());

        append(&path, "1,0\n");
        let poll = tail.read_new().unwrap();
        assert_eq!(poll.lines, vec!["2,101,0"]);
    }

    #[test]
    fn test_offset_only_advances_past_complete_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s__20250826_22.csv");
        append(&path, "");

        let mut tail = reader_for(dir.path());
        tail.read_new().unwrap();
        let base = tail.offset().unwrap();

        append(&path, "1,100,0\npartial");
        tail.read_new().unwrap();
        assert_eq!(tail.offset().unwrap(), base + "1,100,0\n".len() as u64);
    }

    #[test]
    fn test_max_lines_bounds_a_poll() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s__20250826_22.csv");
        append(&path, "");

        let mut tail = TailReader::new(SessionFileLocator::new(dir.path(), None, "csv"), 2);
        tail.read_new().unwrap();

        append(&path, "1,1,0\n2,2,0\n3,3,0\n");
        assert_eq!(tail.read_new().unwrap().lines.len(), 2);
        assert_eq!(tail.read_new().unwrap().lines.len(), 1);
    }

    #[test]
    fn test_rotation_rebinds_at_new_live_end() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("s__20250826_22.csv");
        append(&old, "");
        set_mtime(&old, 1_000);

        let mut tail = reader_for(dir.path());
        tail.read_new().unwrap();
        append(&old, "1,100,0\n");
        assert_eq!(tail.read_new().unwrap().lines.len(), 1);
        set_mtime(&old, 1_000);

        // the hour rolls over: a newer bucket appears, already holding data
        let new = dir.path().join("s__20250826_23.csv");
        append(&new, "50,200,0\n51,201,0\n");
        set_mtime(&new, 2_000);

        let poll = tail.read_new().unwrap();
        assert!(poll.rebound);
        assert!(poll.lines.is_empty(), "history of the new file must not replay");
        assert_eq!(tail.followed_path(), Some(new.as_path()));

        append(&new, "52,202,0\n");
        assert_eq!(tail.read_new().unwrap().lines, vec!["52,202,0"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_identity_tie_rejects_false_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s__20250826_22.csv");
        append(&path, "");
        set_mtime(&path, 1_000);

        let mut tail = reader_for(dir.path());
        tail.read_new().unwrap();

        // same inode surfacing under a newer-looking name is not a rotation
        let alias = dir.path().join("s__20250826_23.csv");
        fs::hard_link(&path, &alias).unwrap();
        set_mtime(&alias, 2_000);

        let poll = tail.read_new().unwrap();
        assert!(!poll.rebound);
        assert_eq!(tail.followed_path(), Some(path.as_path()));

        // appends keep flowing through the original binding
        append(&path, "1,100,0\n");
        assert_eq!(tail.read_new().unwrap().lines.len(), 1);
    }

    #[test]
    fn test_no_file_yet_is_quietly_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut tail = reader_for(dir.path());
        let poll = tail.read_new().unwrap();
        assert!(!poll.rebound);
        assert!(poll.lines.is_empty());
        assert_eq!(tail.followed_path(), None);
    }
}
