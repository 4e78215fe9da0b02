//! Name-keyed table of open files: tracks open count and hands out the
//! reader/writer lock guarding each file's content.

use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, Mutex, RawRwLock, RwLock};

use crate::error::{Error, Result};
use crate::hash_table::HashTable;

pub(crate) type ReadGuard = ArcRwLockReadGuard<RawRwLock, ()>;
pub(crate) type WriteGuard = ArcRwLockWriteGuard<RawRwLock, ()>;

struct OpenFileEntry {
    open_cnt: usize,
    content: Arc<RwLock<()>>,
}

/// Bookkeeping (presence, open count) lives behind one internal mutex. The
/// per-entry content lock is cloned out of that mutex's critical section
/// before being acquired, so holding a file's read or write lock across an
/// entire read/write call never blocks unrelated files' table lookups.
pub(crate) struct OpenFileTable {
    table: Mutex<HashTable<OpenFileEntry>>,
}

impl OpenFileTable {
    pub(crate) fn new(capacity: usize) -> Self {
        OpenFileTable {
            table: Mutex::new(HashTable::with_capacity(capacity)),
        }
    }

    pub(crate) fn is_open(&self, name: &str) -> bool {
        self.table.lock().get(name).is_some()
    }

    /// Registers an open of `name`, creating the entry on first open or
    /// incrementing its open count thereafter.
    pub(crate) fn open(&self, name: &str) {
        let mut table = self.table.lock();
        if let Some(entry) = table.get_mut(name) {
            entry.open_cnt += 1;
        } else {
            log::debug!("open_file_table: first open of {name:?}");
            table.insert(
                name,
                OpenFileEntry {
                    open_cnt: 1,
                    content: Arc::new(RwLock::new(())),
                },
            );
        }
    }

    /// Decrements the open count, destroying the entry once it reaches zero.
    pub(crate) fn close(&self, name: &str) -> Result<()> {
        let mut table = self.table.lock();
        let entry = table.get_mut(name).ok_or(Error::FileNotOpen)?;
        entry.open_cnt -= 1;
        if entry.open_cnt == 0 {
            log::debug!("open_file_table: last close of {name:?}");
            table.remove(name);
        }
        Ok(())
    }

    /// Acquires the named file's content lock for reading. The returned guard
    /// owns a clone of the lock `Arc`, so it outlives this call without
    /// holding the table's bookkeeping mutex.
    pub(crate) fn read_lock(&self, name: &str) -> Result<ReadGuard> {
        let content = {
            let table = self.table.lock();
            table.get(name).ok_or(Error::FileNotOpen)?.content.clone()
        };
        Ok(RwLock::read_arc(&content))
    }

    /// Acquires the named file's content lock for writing. See
    /// [`OpenFileTable::read_lock`] for the locking discipline.
    pub(crate) fn write_lock(&self, name: &str) -> Result<WriteGuard> {
        let content = {
            let table = self.table.lock();
            table.get(name).ok_or(Error::FileNotOpen)?.content.clone()
        };
        Ok(RwLock::write_arc(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_close_removes_entry() {
        let t = OpenFileTable::new(8);
        t.open("a");
        assert!(t.is_open("a"));
        t.close("a").unwrap();
        assert!(!t.is_open("a"));
    }

    #[test]
    fn close_without_open_is_rejected() {
        let t = OpenFileTable::new(8);
        assert_eq!(t.close("a"), Err(Error::FileNotOpen));
    }

    #[test]
    fn reopen_increments_count_and_requires_matching_closes() {
        let t = OpenFileTable::new(8);
        t.open("a");
        t.open("a");
        t.close("a").unwrap();
        assert!(t.is_open("a"));
        t.close("a").unwrap();
        assert!(!t.is_open("a"));
    }

    #[test]
    fn locking_a_closed_file_fails() {
        let t = OpenFileTable::new(8);
        assert_eq!(t.read_lock("a").map(|_| ()), Err(Error::FileNotOpen));
        assert_eq!(t.write_lock("a").map(|_| ()), Err(Error::FileNotOpen));
    }
}
