//! An in-memory, single-level filesystem.
//!
//! Four layers, leaves first: a bitmap-backed [`allocator::BlockAllocator`]
//! carving a fixed-size arena into blocks; a reader/writer-locked
//! [`directory::Directory`] stacking file-metadata blocks by name; a
//! [`hash_table::HashTable`]-backed [`open_file_table::OpenFileTable`]
//! tracking per-file open counts and content locks; and [`facade::SimpleFs`],
//! which composes the three into `create`/`open`/`read`/`write`/`close`/
//! `dir`/`delete`.
//!
//! No component is internally synchronized beyond what it documents: the
//! facade is the only thing that acquires more than one lock, always in the
//! order directory, then per-file, then allocator.

mod allocator;
mod bitmap;
mod block;
mod directory;
mod error;
mod facade;
mod hash_table;
mod open_file_table;

pub use block::{BLOCK_SIZE, MAX_DATA_SIZE, MAX_FILENAME_LENGTH};
pub use error::{Error, Result};
pub use facade::{FileHandle, SimpleFs};
