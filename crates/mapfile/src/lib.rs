//! # mapfile - memory-mapped file with buffered appends
//!
//! Random-access binary reads and writes against a file through an OS
//! memory mapping, with transparent appends past the mapped extent. A
//! mapping has a fixed size, so growing the file requires tearing the
//! mapping down and re-creating it; to avoid a remap on every small
//! append, appended bytes are staged in an in-process buffer and committed
//! in batches.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌──────────────────────────────────────────────────┐
//! │                   MappedFile                      │
//! │                                                  │
//! │ read_*/write_* ──► mapping [0, physical_len)      │
//! │                                                  │
//! │ append_bytes ──► pending buffer                   │
//! │        |                                         │
//! │        |  (buffer >= flush threshold?)           │
//! │        |             yes                         │
//! │        v                                         │
//! │     flush() ──► drop mapping                      │
//! │              ──► write buffer + grow file         │
//! │              ──► re-map grown file                │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module      | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | [`file`]    | `MappedFile`: accessors, append buffer, flush, views |
//! | [`mapping`] | Creation and replacement of the OS memory mapping    |
//! | [`error`]   | [`MapFileError`] taxonomy                            |
//!
//! ## Lengths
//!
//! ```text
//! ┌───────────────────────────────┬────────────────┐
//! │ mapped bytes (on disk)        │ pending buffer │
//! └───────────────────────────────┴────────────────┘
//! 0                    mapped_len()             len()
//! ```
//!
//! Offsets in `[0, mapped_len())` are readable and writable through the
//! mapping. Offsets in `[mapped_len(), len())` exist only in the append
//! buffer and become readable after the next flush, which happens
//! automatically once the buffer reaches the flush threshold, explicitly
//! via [`MappedFile::flush`], or on drop.
//!
//! All multi-byte integers are little-endian. Removing byte ranges is not
//! possible on mapped storage and always fails.

mod error;
mod file;
mod mapping;

pub use error::MapFileError;
pub use file::{MappedFile, View};

/// Append-buffer size in bytes that triggers an automatic flush (64 KiB).
pub const DEFAULT_FLUSH_THRESHOLD: usize = 64 * 1024;

#[cfg(test)]
mod tests;
