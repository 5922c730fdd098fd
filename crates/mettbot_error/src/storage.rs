//! Line-store error types.

/// Kinds of line-store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to open or create the backing file
    #[display("Failed to open line store: {}", _0)]
    Open(String),
    /// Failed to scan lines from the backing file
    #[display("Failed to read line store: {}", _0)]
    Read(String),
    /// Failed to append to the backing file
    #[display("Failed to write line store: {}", _0)]
    Write(String),
    /// The store holds no complete line
    #[display("No content in line store: {}", _0)]
    NoContent(String),
    /// The owning writer is gone
    #[display("Line store unavailable: {}", _0)]
    Unavailable(String),
}

/// Line-store error with location tracking.
///
/// # Examples
///
/// ```
/// use mettbot_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NoContent("metts.txt".to_string()));
/// assert!(err.is_no_content());
/// assert!(format!("{}", err).contains("No content"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the store was simply empty, as opposed to an I/O failure.
    pub fn is_no_content(&self) -> bool {
        matches!(self.kind, StorageErrorKind::NoContent(_))
    }
}

/// Result type for line-store operations.
pub type StorageResult<T> = Result<T, StorageError>;
