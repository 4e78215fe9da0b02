//! The public filesystem facade composing the allocator, directory and
//! open-file table into the user-visible operations.

use parking_lot::Mutex;

use crate::allocator::BlockAllocator;
use crate::block::{BlockIndex, DataNode, Slot, MAX_DATA_SIZE};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::open_file_table::OpenFileTable;

/// A reference to an open file: an owned name and the block it lives at.
/// Every operation re-validates the handle through the open-file table by
/// name before touching arena memory, so a handle outliving its file (after
/// deletion by another thread) can never cause a stale access — it simply
/// yields `FileNotOpen`.
#[derive(Debug, Clone)]
pub struct FileHandle {
    name: String,
    node: BlockIndex,
}

impl FileHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An in-memory, single-level filesystem over a fixed-capacity block pool.
///
/// Locks are acquired in a fixed order — directory, then per-file, then
/// allocator — and released in reverse, to avoid deadlock across operations.
/// No operation holds the directory write lock and a per-file write lock at
/// once except [`SimpleFs::delete`], which needs only the directory write
/// lock: `delete` is reachable only when the file has no open entry at all.
pub struct SimpleFs {
    directory: Directory,
    open_files: OpenFileTable,
    allocator: Mutex<BlockAllocator>,
}

impl SimpleFs {
    /// Reserves a pool of `num_blocks` fixed-size blocks.
    pub fn init(num_blocks: usize) -> Self {
        let allocator = BlockAllocator::new(num_blocks);
        let directory = Directory::new(allocator.arena());
        SimpleFs {
            directory,
            open_files: OpenFileTable::new(num_blocks),
            allocator: Mutex::new(allocator),
        }
    }

    /// Creates a new, empty, open file.
    pub fn create(&self, name: &str) -> Result<FileHandle> {
        log::debug!("create({name:?})");
        if self.directory.file_exists(name) {
            return Err(Error::NonUniqueName);
        }
        let idx = {
            let mut alloc = self.allocator.lock();
            alloc.malloc().ok_or(Error::Oom)?
        };
        if let Err(e) = self.directory.create_checked(idx, name) {
            let mut alloc = self.allocator.lock();
            // the block was never linked anywhere; safe to reclaim.
            let _ = alloc.free(idx);
            return Err(e);
        }
        self.open_files.open(name);
        Ok(FileHandle {
            name: name.to_owned(),
            node: idx,
        })
    }

    /// Opens an existing file, incrementing its open count.
    pub fn open(&self, name: &str) -> Result<FileHandle> {
        log::debug!("open({name:?})");
        let idx = self.directory.search(name)?;
        self.open_files.open(name);
        Ok(FileHandle {
            name: name.to_owned(),
            node: idx,
        })
    }

    /// Closes a handle, decrementing its open count.
    pub fn close(&self, handle: &FileHandle) -> Result<()> {
        log::debug!("close({:?})", handle.name());
        self.open_files.close(&handle.name)
    }

    /// Reads up to `n` bytes starting at the beginning of the file's data
    /// chain. There is no seek: every read starts at offset zero. Returns a
    /// buffer of exactly `n_read` bytes rather than a zero-padded buffer of
    /// length `n`; the `(buf, n_read)` pair carries the same information.
    pub fn read(&self, handle: &FileHandle, n: usize) -> Result<(Vec<u8>, usize)> {
        log::trace!("read({:?}, {n})", handle.name());
        let _guard = self.open_files.read_lock(&handle.name)?;
        let arena = self.allocator.lock().arena();

        // SAFETY: the entry's content read lock is held; `data` is one of
        // the fields a FileNode's content lock guards.
        let mut cur = match unsafe { arena.slot(handle.node) } {
            Slot::File(f) => f.data,
            _ => unreachable!("handle does not point at a FileNode"),
        };

        let mut out = Vec::with_capacity(n.min(MAX_DATA_SIZE * 4));
        while out.len() < n {
            let Some(idx) = cur else { break };
            // SAFETY: content read lock held; reachable only via this
            // file's data chain.
            let node = match unsafe { arena.slot(idx) } {
                Slot::Data(d) => d,
                _ => unreachable!("data chain points at a non-data block"),
            };
            let remaining = n - out.len();
            let take = remaining.min(node.bytes);
            out.extend_from_slice(&node.data[..take]);
            cur = node.next;
        }
        let n_read = out.len();
        Ok((out, n_read))
    }

    /// Appends `bytes` to the end of the file's data chain.
    pub fn write(&self, handle: &FileHandle, bytes: &[u8]) -> Result<()> {
        log::trace!("write({:?}, {} bytes)", handle.name(), bytes.len());
        let _guard = self.open_files.write_lock(&handle.name)?;
        let arena = self.allocator.lock().arena();

        // SAFETY: content write lock held; `data` is guarded by this lock.
        let head = match unsafe { arena.slot(handle.node) } {
            Slot::File(f) => f.data,
            _ => unreachable!("handle does not point at a FileNode"),
        };

        let mut tail = match head {
            Some(idx) => {
                let mut cur = idx;
                loop {
                    // SAFETY: content write lock held; reachable only via
                    // this file's data chain.
                    let next = match unsafe { arena.slot(cur) } {
                        Slot::Data(d) => d.next,
                        _ => unreachable!("data chain points at a non-data block"),
                    };
                    match next {
                        Some(n) => cur = n,
                        None => break cur,
                    }
                }
            }
            None => {
                let idx = {
                    let mut alloc = self.allocator.lock();
                    alloc.malloc().ok_or(Error::Oom)?
                };
                // SAFETY: freshly allocated, not reachable from elsewhere.
                unsafe {
                    *arena.slot_mut(idx) = Slot::Data(DataNode::new());
                }
                // SAFETY: content write lock held; `data` is guarded by it.
                if let Slot::File(f) = unsafe { arena.slot_mut(handle.node) } {
                    f.data = Some(idx);
                }
                idx
            }
        };

        let mut written = 0;
        while written < bytes.len() {
            // SAFETY: content write lock held.
            let space = match unsafe { arena.slot(tail) } {
                Slot::Data(d) => MAX_DATA_SIZE - d.bytes,
                _ => unreachable!("data chain points at a non-data block"),
            };
            if space == 0 {
                let idx = {
                    let mut alloc = self.allocator.lock();
                    alloc.malloc().ok_or(Error::Oom)?
                };
                // SAFETY: freshly allocated, not reachable from elsewhere.
                unsafe {
                    *arena.slot_mut(idx) = Slot::Data(DataNode::new());
                }
                // SAFETY: content write lock held.
                if let Slot::Data(d) = unsafe { arena.slot_mut(tail) } {
                    d.next = Some(idx);
                }
                tail = idx;
                continue;
            }
            let take = space.min(bytes.len() - written);
            // SAFETY: content write lock held.
            if let Slot::Data(d) = unsafe { arena.slot_mut(tail) } {
                d.data[d.bytes..d.bytes + take].copy_from_slice(&bytes[written..written + take]);
                d.bytes += take;
            }
            written += take;
        }

        // SAFETY: content write lock held; `mod_time` is guarded by it.
        if let Slot::File(f) = unsafe { arena.slot_mut(handle.node) } {
            f.mod_time = std::time::SystemTime::now();
        }
        Ok(())
    }

    /// Lists every file name currently in the directory.
    pub fn dir(&self) -> Vec<String> {
        self.directory.gather().into_iter().map(|e| e.name).collect()
    }

    /// Deletes a file by name. Fails with [`Error::FileOpen`] if any open
    /// handle to it exists; the original implementation this corrects
    /// silently no-oped in that case instead.
    pub fn delete(&self, name: &str) -> Result<()> {
        log::debug!("delete({name:?})");
        // The existence check, open check and removal are not one atomic
        // section (each acquires the directory or table lock in turn, not
        // both at once), so a concurrent `open` of the same name can in
        // principle interleave between the open check below and removal.
        // The original implementation this corrects has the same window;
        // closing it fully would require the directory and table to share
        // one lock, which would serialize unrelated files' opens behind
        // every delete.
        let idx = self.directory.search(name)?;
        if self.open_files.is_open(name) {
            return Err(Error::FileOpen);
        }
        let removed = self.directory.remove(name)?;
        debug_assert_eq!(removed, idx);

        let arena = self.allocator.lock().arena();
        // SAFETY: the file is closed (checked above) and has just been
        // unlinked from the directory, so no other thread can reach this
        // node's data chain concurrently.
        let mut cur = match unsafe { arena.slot(idx) } {
            Slot::File(f) => f.data,
            _ => unreachable!("directory entry does not point at a FileNode"),
        };
        while let Some(data_idx) = cur {
            // SAFETY: see above; the entire chain is unreachable from any
            // other thread at this point.
            let next = match unsafe { arena.slot(data_idx) } {
                Slot::Data(d) => d.next,
                _ => unreachable!("data chain points at a non-data block"),
            };
            let mut alloc = self.allocator.lock();
            alloc.free(data_idx)?;
            cur = next;
        }
        let mut alloc = self.allocator.lock();
        alloc.free(idx)?;
        Ok(())
    }
}
