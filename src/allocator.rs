//! Fixed-capacity block allocator over a single contiguous arena.

use std::sync::Arc;

use crate::bitmap::FreeBitmap;
use crate::block::{Arena, BlockIndex, Slot};
use crate::error::{Error, Result};

/// Carves a contiguous pool of `num_blocks` fixed-size blocks and hands them
/// out by index. Not internally synchronized: the facade serializes calls to
/// [`BlockAllocator::malloc`] and [`BlockAllocator::free`] behind one mutex
/// that guards only the bitmap and free count, never the arena's block
/// storage itself (see the crate's synchronization notes in `facade`).
pub(crate) struct BlockAllocator {
    arena: Arc<Arena>,
    bitmap: FreeBitmap,
    n_free: usize,
}

impl BlockAllocator {
    pub(crate) fn new(num_blocks: usize) -> Self {
        log::debug!("allocator: reserving {num_blocks} blocks");
        let arena = Arc::new(Arena::new(num_blocks));
        BlockAllocator {
            arena,
            bitmap: FreeBitmap::new(num_blocks),
            n_free: num_blocks,
        }
    }

    pub(crate) fn arena(&self) -> Arc<Arena> {
        self.arena.clone()
    }

    pub(crate) fn n_free(&self) -> usize {
        self.n_free
    }

    /// Lowest-indexed free block, marked allocated. `None` if the pool is
    /// exhausted.
    pub(crate) fn malloc(&mut self) -> Option<BlockIndex> {
        let i = self.bitmap.first_zero()?;
        self.bitmap.set(i);
        self.n_free -= 1;
        Some(BlockIndex(i))
    }

    /// Releases a block back to the pool, resetting its slot to `Slot::Free`.
    /// Fails with [`Error::PtrNotAllocated`] if the block was not allocated.
    pub(crate) fn free(&mut self, idx: BlockIndex) -> Result<()> {
        if !self.bitmap.get(idx.get()) {
            return Err(Error::PtrNotAllocated);
        }
        self.bitmap.clear(idx.get());
        self.n_free += 1;
        // SAFETY: the bitmap confirmed this block was allocated and is not
        // concurrently addressed by any live FileHandle or directory entry,
        // since callers free a block only after unlinking it from every
        // structure that could reach it.
        unsafe {
            self.arena.replace(idx, Slot::Free);
        }
        Ok(())
    }
}

impl Drop for BlockAllocator {
    fn drop(&mut self) {
        log::debug!(
            "allocator: releasing pool ({} blocks, {} still free)",
            self.arena.len(),
            self.n_free
        );
    }
}
