//! Append-only line stores.
//!
//! A line store is a flat UTF-8 text file holding one record per line, in
//! insertion order. The line index is the record's only identifier. Only lines
//! terminated by `\n` count; a trailing unterminated fragment is ignored by
//! both counting and indexed reads.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod line_store;

pub use line_store::{LineStore, PendingAppend, count_lines, nth_line};
