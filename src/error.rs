//! Stable error taxonomy returned by every fallible operation in this crate.

/// Domain and resource errors produced by [`crate::SimpleFs`] and its components.
///
/// Numeric discriminants are preserved where the originating taxonomy assigned
/// them; the remaining variants complete the set without a fixed numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[repr(i32)]
pub enum Error {
    /// A file with this name already exists in the directory.
    #[error("a file with this name already exists")]
    NonUniqueName = 111,
    /// No file with this name exists in the directory.
    #[error("no file with this name exists")]
    NotExists = 112,
    /// The block pool has no free blocks left to satisfy the request.
    #[error("out of free blocks")]
    Oom = 113,
    /// The block index does not refer to a currently allocated block.
    #[error("block is not allocated")]
    PtrNotAllocated = 114,
    /// The file is not currently open; the operation requires an open handle.
    #[error("file is not open")]
    FileNotOpen,
    /// The file is currently open and cannot be deleted.
    #[error("file is open")]
    FileOpen,
    /// The requested name exceeds `MAX_FILENAME_LENGTH` bytes.
    #[error("file name exceeds the maximum length")]
    NameLengthExceeded,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
