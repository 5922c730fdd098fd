//! Top-level error wrapper types.

use crate::{CommandError, ConfigError, StorageError, TransportError};

/// Every error the Mettbot crates can produce.
///
/// # Examples
///
/// ```
/// use mettbot_error::{MettbotError, TransportError};
///
/// let err: MettbotError = TransportError::new("queue closed").into();
/// assert!(format!("{}", err).contains("Transport Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum MettbotErrorKind {
    /// Line-store error
    #[from(StorageError)]
    Storage(StorageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Console command error
    #[from(CommandError)]
    Command(CommandError),
    /// Chat transport error
    #[from(TransportError)]
    Transport(TransportError),
}

/// Mettbot error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Mettbot Error: {}", _0)]
pub struct MettbotError(Box<MettbotErrorKind>);

impl MettbotError {
    /// Create a new error from a kind.
    pub fn new(kind: MettbotErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MettbotErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to MettbotErrorKind
impl<T> From<T> for MettbotError
where
    T: Into<MettbotErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Mettbot operations.
pub type MettbotResult<T> = std::result::Result<T, MettbotError>;
