//! Console command error types.
//!
//! The display strings of [`CommandErrorKind`] are what the operator sees on
//! the console, so they are kept short.

/// Kinds of malformed console input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CommandErrorKind {
    /// `s` without both a key and a value
    #[display("Wrong Syntax")]
    WrongSyntax,
    /// Integer setting given a non-integer value
    #[display("No Number: {}", _0)]
    NotANumber(String),
    /// Float setting given a non-float value
    #[display("No Float: {}", _0)]
    NotAFloat(String),
    /// Setting name not recognized
    #[display("Unknown variable: {}", _0)]
    UnknownVariable(String),
}

/// Console command error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("{}", kind)]
pub struct CommandError {
    /// The kind of error that occurred
    pub kind: CommandErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CommandError {
    /// Create a new command error with automatic location tracking.
    ///
    /// # Examples
    ///
    /// ```
    /// use mettbot_error::{CommandError, CommandErrorKind};
    ///
    /// let err = CommandError::new(CommandErrorKind::UnknownVariable("bogus".into()));
    /// assert_eq!(err.to_string(), "Unknown variable: bogus");
    /// ```
    #[track_caller]
    pub fn new(kind: CommandErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
