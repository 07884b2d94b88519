//! Error taxonomy (spec.md §7).
//!
//! The reference engine reports failure as `-1` plus a global error code;
//! here each abstract kind from §7 is a variant of [`FsError`] and the API
//! surface returns `Result<T, FsError>` instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// I/O error, malformed image, or internal inconsistency.
    #[error("general file system error")]
    General,
    /// Target already exists, or inode/entry allocation failed.
    #[error("create failed")]
    Create,
    /// Named path does not resolve to an existing file.
    #[error("no such file")]
    NoSuchFile,
    /// Named path does not resolve to an existing directory.
    #[error("no such directory")]
    NoSuchDir,
    /// File is currently open.
    #[error("file in use")]
    InUse,
    /// Open-file table is full.
    #[error("too many open files")]
    TooManyOpen,
    /// File descriptor out of range or refers to a closed slot.
    #[error("bad file descriptor")]
    BadFd,
    /// Sector bitmap exhausted mid-write.
    #[error("no space left on device")]
    NoSpace,
    /// Write would exceed `M * S`.
    #[error("file too big")]
    FileTooBig,
    /// Offset outside `[0, size]`.
    #[error("seek out of bounds")]
    SeekOutOfBounds,
    /// Directory still has entries (possibly tombstoned, see spec.md §4.4).
    #[error("directory not empty")]
    NotEmpty,
    /// Attempt to remove `/`.
    #[error("cannot remove root directory")]
    RootDir,
    /// Caller's buffer cannot hold the requested directory entries.
    #[error("buffer too small")]
    BufferTooSmall,
}

impl From<std::io::Error> for FsError {
    fn from(_: std::io::Error) -> Self {
        // Low-level disk errors escalate directly to `general` (spec.md §7).
        FsError::General
    }
}
