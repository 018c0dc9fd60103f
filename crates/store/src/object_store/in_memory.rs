use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tally_core::Handle;

use super::r#trait::{CommitReceipt, ObjectStore, StoreError, StoredObject, WriteBatch};

#[derive(Debug, Default)]
struct Committed {
    objects: BTreeMap<Handle, StoredObject>,
    root: Option<Handle>,
    revision: u64,
}

/// In-memory object store.
///
/// Intended for tests/dev. Not optimized for performance: kind scans walk
/// every record.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    committed: RwLock<Committed>,
    next_handle: AtomicU64,
    closed: AtomicBool,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self {
            committed: RwLock::new(Committed::default()),
            next_handle: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed records.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.objects.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Committed>, StoreError> {
        self.ensure_open()?;
        self.committed
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn allocate(&self) -> Result<Handle, StoreError> {
        self.ensure_open()?;
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        Handle::new(raw).map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn load(&self, handle: Handle) -> Result<Option<StoredObject>, StoreError> {
        Ok(self.read()?.objects.get(&handle).cloned())
    }

    fn load_kind(&self, kind: &str) -> Result<Vec<StoredObject>, StoreError> {
        Ok(self
            .read()?
            .objects
            .values()
            .filter(|o| o.kind == kind)
            .cloned()
            .collect())
    }

    fn root(&self) -> Result<Option<Handle>, StoreError> {
        Ok(self.read()?.root)
    }

    fn apply(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        self.ensure_open()?;
        if batch.is_empty() {
            return Ok(CommitReceipt::default());
        }

        let mut committed = self
            .committed
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        // Check everything before touching anything.
        for put in &batch.puts {
            if let Some(existing) = committed.objects.get(&put.handle) {
                if existing.kind != put.kind {
                    return Err(StoreError::Codec(format!(
                        "object {} is stored as '{}', attempted write as '{}'",
                        put.handle, existing.kind, put.kind
                    )));
                }
            }
        }

        committed.revision += 1;
        let revision = committed.revision;

        let mut receipt = CommitReceipt::default();
        for mut put in batch.puts {
            put.revision = revision;
            receipt.written.push((put.handle, revision));
            committed.objects.insert(put.handle, put);
        }
        for handle in batch.deletes {
            if committed.objects.remove(&handle).is_some() {
                receipt.deleted.push(handle);
            }
            if committed.root == Some(handle) {
                committed.root = None;
            }
        }
        if let Some(root) = batch.root {
            committed.root = Some(root);
        }

        Ok(receipt)
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
