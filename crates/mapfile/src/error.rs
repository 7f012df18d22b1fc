use std::io;
use thiserror::Error;

/// Errors that can occur during mapped-file operations.
#[derive(Debug, Error)]
pub enum MapFileError {
    /// An underlying I/O error (open, seek, write, resize, or map failure).
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// An offset or width outside the mapped range.
    ///
    /// Reported whenever the `len` bytes starting at `offset` do not lie
    /// fully inside `[0, mapped)`. Out-of-range access is never clamped.
    #[error("range [{offset}, {offset}+{len}) outside mapped length {mapped}")]
    OutOfRange {
        /// Requested start offset.
        offset: u64,
        /// Requested width in bytes.
        len: u64,
        /// Mapped (physical) length at the time of the call.
        mapped: u64,
    },

    /// The operation is not possible on memory-mapped storage.
    #[error("operation not supported on memory-mapped storage")]
    Unsupported,

    /// The file is unusable: a failed flush tore down the mapping, or a
    /// panic poisoned the state lock.
    #[error("mapped file is in an unusable state")]
    InvalidState,
}
