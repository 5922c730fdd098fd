//! File-backed line store.

use mettbot_error::{StorageError, StorageErrorKind, StorageResult};
use rand::Rng;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Counts the `\n`-terminated lines readable from `reader`.
///
/// # Examples
///
/// ```
/// use mettbot_store::count_lines;
///
/// assert_eq!(count_lines(&b"a\nb\nfragment"[..]).unwrap(), 2);
/// ```
pub fn count_lines<R: BufRead>(mut reader: R) -> io::Result<usize> {
    let mut buf = Vec::new();
    let mut lines = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 || buf.last() != Some(&b'\n') {
            return Ok(lines);
        }
        lines += 1;
    }
}

/// Returns the `index`-th terminated line without its terminator.
///
/// Uses the same termination rule as [`count_lines`], so any index below the
/// count yields `Some`.
pub fn nth_line<R: BufRead>(mut reader: R, index: usize) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    for _ in 0..=index {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 || buf.last() != Some(&b'\n') {
            return Ok(None);
        }
    }
    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// An append-only newline-delimited text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStore {
    path: PathBuf,
}

impl LineStore {
    /// Creates a handle for the store at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_read(&self) -> StorageResult<File> {
        File::open(&self.path).map_err(|e| {
            StorageError::new(StorageErrorKind::Open(format!(
                "{}: {}",
                self.path.display(),
                e
            )))
        })
    }

    fn read_error(&self, e: io::Error) -> StorageError {
        StorageError::new(StorageErrorKind::Read(format!(
            "{}: {}",
            self.path.display(),
            e
        )))
    }

    /// Counts the terminated lines currently stored.
    pub fn line_count(&self) -> StorageResult<usize> {
        let file = self.open_read()?;
        count_lines(BufReader::new(file)).map_err(|e| self.read_error(e))
    }

    /// Reads the line at `index`, or `None` past the end.
    pub fn line(&self, index: usize) -> StorageResult<Option<String>> {
        let file = self.open_read()?;
        nth_line(BufReader::new(file), index).map_err(|e| self.read_error(e))
    }

    /// Opens the backing file for appending, creating it if absent, and
    /// counts the lines it holds before anything is written.
    ///
    /// The returned [`PendingAppend`] performs the write; the count can be
    /// handed to the requester in between.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn begin_append(&self) -> StorageResult<PendingAppend> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| {
                StorageError::new(StorageErrorKind::Open(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            })?;
        let existing = count_lines(BufReader::new(&file)).map_err(|e| self.read_error(e))?;
        tracing::debug!(existing, "Opened line store for append");
        Ok(PendingAppend {
            file,
            path: self.path.clone(),
            existing,
        })
    }

    /// Appends `payload` verbatim and returns the line count seen before it.
    pub fn append(&self, payload: &str) -> StorageResult<usize> {
        let pending = self.begin_append()?;
        let existing = pending.existing();
        pending.write(payload)?;
        Ok(existing)
    }

    /// Picks a uniformly random stored line.
    ///
    /// Counts first, draws an index in `[0, count)`, then re-reads from the
    /// start up to that index. Nothing is cached between calls.
    pub fn random_line_with<G: Rng + ?Sized>(&self, rng: &mut G) -> StorageResult<String> {
        let count = self.line_count()?;
        if count == 0 {
            return Err(StorageError::new(StorageErrorKind::NoContent(
                self.path.display().to_string(),
            )));
        }
        let index = rng.gen_range(0..count);
        self.line(index)?.ok_or_else(|| {
            StorageError::new(StorageErrorKind::Read(format!(
                "{}: reached end of store before line {}",
                self.path.display(),
                index
            )))
        })
    }

    /// [`random_line_with`](Self::random_line_with) using the thread RNG.
    pub fn random_line(&self) -> StorageResult<String> {
        self.random_line_with(&mut rand::thread_rng())
    }
}

/// An open store whose pre-append line count is known.
#[derive(Debug)]
pub struct PendingAppend {
    file: File,
    path: PathBuf,
    existing: usize,
}

impl PendingAppend {
    /// Lines stored before this append.
    pub fn existing(&self) -> usize {
        self.existing
    }

    /// Writes `payload` at the end of the file and closes it.
    pub fn write(mut self, payload: &str) -> StorageResult<()> {
        self.file
            .write_all(payload.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| {
                StorageError::new(StorageErrorKind::Write(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            })
    }
}
