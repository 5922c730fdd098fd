//! Chat transport error types.

/// Raised when an outbound request cannot be handed to the chat transport.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Transport Error: {} at line {} in {}", message, line, file)]
pub struct TransportError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl TransportError {
    /// Create a new TransportError at the current location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
