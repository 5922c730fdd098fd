//! Error types for the Mettbot workspace.
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use mettbot_error::{MettbotResult, StorageError, StorageErrorKind};
//!
//! fn read_quotes() -> MettbotResult<String> {
//!     Err(StorageError::new(StorageErrorKind::NoContent("quotes.txt".into())))?
//! }
//!
//! assert!(read_quotes().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod config;
mod error;
mod storage;
mod transport;

pub use command::{CommandError, CommandErrorKind};
pub use config::ConfigError;
pub use error::{MettbotError, MettbotErrorKind, MettbotResult};
pub use storage::{StorageError, StorageErrorKind, StorageResult};
pub use transport::TransportError;
