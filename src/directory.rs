//! The single-level directory: a reader/writer-locked, singly linked stack of
//! `FileNode` blocks, newest entry first.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::block::{Arena, BlockIndex, Slot, MAX_FILENAME_LENGTH};
use crate::error::{Error, Result};

struct DirState {
    head: Option<BlockIndex>,
    n_files: usize,
}

/// An owned snapshot of one directory entry, detached from any lock.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub node: BlockIndex,
    pub create_time: std::time::SystemTime,
    pub mod_time: std::time::SystemTime,
}

pub(crate) struct Directory {
    arena: Arc<Arena>,
    state: RwLock<DirState>,
}

impl Directory {
    pub(crate) fn new(arena: Arc<Arena>) -> Self {
        Directory {
            arena,
            state: RwLock::new(DirState {
                head: None,
                n_files: 0,
            }),
        }
    }

    pub(crate) fn file_exists(&self, name: &str) -> bool {
        let state = self.state.read();
        self.find(&state, name).is_some()
    }

    pub(crate) fn search(&self, name: &str) -> Result<BlockIndex> {
        let state = self.state.read();
        self.find(&state, name).ok_or(Error::NotExists)
    }

    fn find(&self, state: &DirState, name: &str) -> Option<BlockIndex> {
        let mut cur = state.head;
        while let Some(idx) = cur {
            // SAFETY: directory read lock held; FileNode's `name`/`next` are
            // structural fields guarded by this lock.
            let node = match unsafe { self.arena.slot(idx) } {
                Slot::File(f) => f,
                _ => unreachable!("directory entry does not point at a FileNode"),
            };
            if node.name == name {
                return Some(idx);
            }
            cur = node.next;
        }
        None
    }

    /// Writes `name`/timestamps into the pre-allocated block `idx` and
    /// prepends it to the directory. Does not check uniqueness; callers
    /// (the facade) must do so under the same write-lock acquisition this
    /// call makes, via [`Directory::create_checked`].
    fn add_locked(&self, state: &mut DirState, idx: BlockIndex, name: &str) -> Result<()> {
        if name.len() >= MAX_FILENAME_LENGTH {
            return Err(Error::NameLengthExceeded);
        }
        let mut node = crate::block::FileNode::new(name.to_owned());
        node.next = state.head;
        // SAFETY: directory write lock held (via `state: &mut DirState`);
        // this block was just allocated by the facade and is not reachable
        // from anywhere else yet.
        unsafe {
            *self.arena.slot_mut(idx) = Slot::File(node);
        }
        state.head = Some(idx);
        state.n_files += 1;
        Ok(())
    }

    /// Atomically checks for `name`'s absence and inserts `idx` under it,
    /// using an upgradable read so the check-then-insert cannot race a second
    /// caller doing the same for the same name. Grounded in the spec's
    /// "upgrade atomically" requirement: the read is dropped and replaced by
    /// a write before any mutation, and existence is re-confirmed once
    /// holding the write lock.
    pub(crate) fn create_checked(&self, idx: BlockIndex, name: &str) -> Result<()> {
        let upgradable = self.state.upgradable_read();
        if self.find(&upgradable, name).is_some() {
            return Err(Error::NonUniqueName);
        }
        let mut state = RwLockUpgradableReadGuard::upgrade(upgradable);
        if self.find(&state, name).is_some() {
            return Err(Error::NonUniqueName);
        }
        self.add_locked(&mut state, idx, name)
    }

    /// Unlinks the named entry and returns its block index. Does not free the
    /// block; the caller walks its data chain and frees both afterward.
    pub(crate) fn remove(&self, name: &str) -> Result<BlockIndex> {
        let mut state = self.state.write();
        let mut cur = state.head;
        let mut prev: Option<BlockIndex> = None;
        while let Some(idx) = cur {
            // SAFETY: directory write lock held.
            let next = match unsafe { self.arena.slot(idx) } {
                Slot::File(f) if f.name == name => f.next,
                Slot::File(f) => {
                    prev = Some(idx);
                    cur = f.next;
                    continue;
                }
                _ => unreachable!("directory entry does not point at a FileNode"),
            };
            match prev {
                Some(p) => {
                    // SAFETY: directory write lock held.
                    if let Slot::File(pf) = unsafe { self.arena.slot_mut(p) } {
                        pf.next = next;
                    }
                }
                None => state.head = next,
            }
            state.n_files -= 1;
            return Ok(idx);
        }
        Err(Error::NotExists)
    }

    /// Owned snapshot of every directory entry, head first.
    pub(crate) fn gather(&self) -> Vec<DirEntry> {
        let state = self.state.read();
        let mut out = Vec::with_capacity(state.n_files);
        let mut cur = state.head;
        while let Some(idx) = cur {
            // SAFETY: directory read lock held.
            let node = match unsafe { self.arena.slot(idx) } {
                Slot::File(f) => f,
                _ => unreachable!("directory entry does not point at a FileNode"),
            };
            out.push(DirEntry {
                name: node.name.clone(),
                node: idx,
                create_time: node.create_time,
                mod_time: node.mod_time,
            });
            cur = node.next;
        }
        out
    }

    pub(crate) fn n_files(&self) -> usize {
        self.state.read().n_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::BlockAllocator;

    fn setup(n: usize) -> (BlockAllocator, Directory) {
        let alloc = BlockAllocator::new(n);
        let dir = Directory::new(alloc.arena());
        (alloc, dir)
    }

    #[test]
    fn create_stack_order() {
        let (mut alloc, dir) = setup(12);
        for name in ["file 1", "file 2", "file 3", "file 4"] {
            let idx = alloc.malloc().unwrap();
            dir.create_checked(idx, name).unwrap();
        }
        let names: Vec<_> = dir.gather().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["file 4", "file 3", "file 2", "file 1"]);
        assert_eq!(dir.n_files(), 4);
    }

    #[test]
    fn duplicate_rejected() {
        let (mut alloc, dir) = setup(4);
        let idx = alloc.malloc().unwrap();
        dir.create_checked(idx, "name").unwrap();
        let idx2 = alloc.malloc().unwrap();
        assert_eq!(dir.create_checked(idx2, "name"), Err(Error::NonUniqueName));
        assert_eq!(dir.n_files(), 1);
    }

    #[test]
    fn remove_in_arbitrary_order() {
        let (mut alloc, dir) = setup(4);
        for name in ["file 1", "file 2", "file 3", "file 4"] {
            let idx = alloc.malloc().unwrap();
            dir.create_checked(idx, name).unwrap();
        }
        dir.remove("file 3").unwrap();
        assert_eq!(dir.gather()[0].name, "file 4");
        assert_eq!(dir.n_files(), 3);
        dir.remove("file 4").unwrap();
        assert_eq!(dir.gather()[0].name, "file 2");
        dir.remove("file 2").unwrap();
        assert_eq!(dir.gather()[0].name, "file 1");
        dir.remove("file 1").unwrap();
        assert_eq!(dir.n_files(), 0);
        assert_eq!(dir.remove("file 1"), Err(Error::NotExists));
    }

    #[test]
    fn name_too_long_is_rejected() {
        let (mut alloc, dir) = setup(4);
        let idx = alloc.malloc().unwrap();
        let long = "x".repeat(MAX_FILENAME_LENGTH + 1);
        assert_eq!(dir.create_checked(idx, &long), Err(Error::NameLengthExceeded));
    }
}
