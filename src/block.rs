//! Block sizing, the arena, and the two block payload types it carries.
//!
//! Blocks live in one contiguous `Vec` allocated once at [`crate::SimpleFs::init`]
//! time and addressed by [`BlockIndex`] rather than by raw pointer. A slot's
//! fields are split across two locks that live *outside* the arena (the
//! directory's and, for file content, the owning open-file entry's); see the
//! module docs on [`crate::directory`] and [`crate::open_file_table`] for which
//! lock protects which field of [`FileNode`].

use std::cell::UnsafeCell;
use std::time::SystemTime;

/// Size in bytes of one block. The historical default of the system this crate
/// reimplements.
pub const BLOCK_SIZE: usize = 512;

const LINK_SIZE: usize = std::mem::size_of::<u32>();
const LEN_SIZE: usize = std::mem::size_of::<u32>();

/// Maximum number of payload bytes a single data block can hold.
pub const MAX_DATA_SIZE: usize = BLOCK_SIZE - LINK_SIZE - LEN_SIZE;

/// Maximum length, in bytes, of a file name.
pub const MAX_FILENAME_LENGTH: usize = BLOCK_SIZE - 2 * LINK_SIZE;

/// An index into the arena. Stable for as long as the block it names stays
/// allocated; never dereferenced directly outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockIndex(pub(crate) usize);

impl BlockIndex {
    pub(crate) fn get(self) -> usize {
        self.0
    }
}

/// A file metadata block.
///
/// `name`, `next` and `create_time` are touched only while the directory's
/// write lock is held (they belong to the directory's list structure).
/// `data` and `mod_time` are touched only while the owning file's open-file
/// entry lock is held (they belong to the file's content). Both halves live in
/// the same struct because both halves occupy the same arena block, exactly as
/// the source's `fp_node` does; only the synchronization discipline, not the
/// layout, differs.
#[derive(Debug, Clone)]
pub struct FileNode {
    pub name: String,
    pub create_time: SystemTime,
    pub mod_time: SystemTime,
    pub next: Option<BlockIndex>,
    pub data: Option<BlockIndex>,
}

impl FileNode {
    pub(crate) fn new(name: String) -> Self {
        let now = SystemTime::now();
        FileNode {
            name,
            create_time: now,
            mod_time: now,
            next: None,
            data: None,
        }
    }
}

/// A file data block: up to [`MAX_DATA_SIZE`] bytes, plus a link to the next
/// block in the chain. Only the last block in a chain may hold fewer than
/// `MAX_DATA_SIZE` valid bytes.
#[derive(Debug, Clone)]
pub struct DataNode {
    pub next: Option<BlockIndex>,
    pub bytes: usize,
    pub data: Box<[u8; MAX_DATA_SIZE]>,
}

impl DataNode {
    pub(crate) fn new() -> Self {
        DataNode {
            next: None,
            bytes: 0,
            data: Box::new([0u8; MAX_DATA_SIZE]),
        }
    }
}

/// Tagged contents of one arena slot.
#[derive(Debug)]
pub(crate) enum Slot {
    Free,
    File(FileNode),
    Data(DataNode),
}

/// The contiguous backing pool, carved into `num_blocks` fixed-size slots.
///
/// `UnsafeCell` is required here because two different fields of the same
/// `FileNode` slot are guarded by two different external locks rather than one
/// lock per slot (see the struct docs on [`FileNode`]); the accessors below are
/// `pub(crate)` and documented with the lock their caller must already hold.
/// Slots never move once the arena is constructed, so a `BlockIndex` is valid
/// for as long as the block it names is allocated.
pub(crate) struct Arena {
    slots: Vec<UnsafeCell<Slot>>,
}

// SAFETY: access to a slot's contents is disciplined entirely by the external
// locks documented on `FileNode` and in `open_file_table`; `Arena` itself hands
// out no unguarded references.
unsafe impl Sync for Arena {}
unsafe impl Send for Arena {}

impl Arena {
    pub(crate) fn new(num_blocks: usize) -> Self {
        let mut slots = Vec::with_capacity(num_blocks);
        slots.resize_with(num_blocks, || UnsafeCell::new(Slot::Free));
        Arena { slots }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// # Safety
    /// Caller must hold a lock that disciplines access to this slot (the
    /// directory's lock for `FileNode` structural fields, the owning entry's
    /// lock for `FileNode` content fields or any `DataNode`), and must not
    /// alias this reference with a concurrent `&mut` access to the same slot.
    pub(crate) unsafe fn slot(&self, idx: BlockIndex) -> &Slot {
        &*self.slots[idx.get()].get()
    }

    /// # Safety
    /// See [`Arena::slot`]; additionally the caller must hold exclusive access
    /// (a write lock) for the duration of the returned reference.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slot_mut(&self, idx: BlockIndex) -> &mut Slot {
        &mut *self.slots[idx.get()].get()
    }

    /// Overwrite a slot, returning whatever was there before. Used by the
    /// allocator when handing out or reclaiming a block.
    ///
    /// # Safety
    /// Same discipline as [`Arena::slot_mut`].
    pub(crate) unsafe fn replace(&self, idx: BlockIndex, slot: Slot) -> Slot {
        std::mem::replace(self.slot_mut(idx), slot)
    }
}
