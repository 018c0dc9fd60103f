//! Working session against an object store.
//!
//! A `Session` is one client's view of the store. It owns three pieces of
//! state:
//!
//! - **Staged writes**: saves and deletes made since the last commit. They are
//!   visible to this session immediately and to nobody else until `commit`.
//! - **Activated records**: committed records this session has loaded, either
//!   directly or by cascade. Later reads of an activated handle are served from
//!   here, so data committed by other sessions only shows up after a fresh
//!   query or a [`refresh`](Session::refresh).
//! - **Identity cache**: materialized objects keyed by handle. Two reads of the
//!   same handle in one session return the same `Arc` as long as the record
//!   has not changed in between.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tally_core::{
    ActivationPolicies, AggregateRoot, EngineError, EngineResult, Handle, Persistent, Ref,
    SessionId,
};
use tracing::{debug, warn};

use crate::hooks::ChangeListeners;
use crate::object_store::{ObjectStore, PENDING_REVISION, StoreError, StoredObject, WriteBatch};
use crate::query::matches_example;

#[derive(Debug, Clone, PartialEq)]
enum Staged {
    Put(StoredObject),
    Delete,
}

struct Cached {
    object: Arc<dyn Any + Send + Sync>,
    revision: u64,
}

/// Staged state captured by [`Session::savepoint`].
#[derive(Debug, Clone)]
pub struct Savepoint {
    staged: BTreeMap<Handle, Staged>,
    root: Option<Handle>,
}

pub struct Session {
    id: SessionId,
    store: Arc<dyn ObjectStore>,
    policies: Arc<ActivationPolicies>,
    listeners: Arc<ChangeListeners>,
    cache: HashMap<Handle, Cached>,
    activated: HashMap<Handle, StoredObject>,
    staged: BTreeMap<Handle, Staged>,
    staged_root: Option<Handle>,
    read_only: bool,
    closed: bool,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("cached", &self.cache.len())
            .field("activated", &self.activated.len())
            .field("staged", &self.staged.len())
            .field("read_only", &self.read_only)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Session {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        policies: Arc<ActivationPolicies>,
        listeners: Arc<ChangeListeners>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            store,
            policies,
            listeners,
            cache: HashMap::new(),
            activated: HashMap::new(),
            staged: BTreeMap::new(),
            staged_root: None,
            read_only: false,
            closed: false,
        }
    }

    /// A session that refuses every write.
    pub fn read_only(
        store: Arc<dyn ObjectStore>,
        policies: Arc<ActivationPolicies>,
        listeners: Arc<ChangeListeners>,
    ) -> Self {
        Self {
            read_only: true,
            ..Self::new(store, policies, listeners)
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn policies(&self) -> &ActivationPolicies {
        &self.policies
    }

    /// Whether anything is staged and not yet committed.
    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty() || self.staged_root.is_some()
    }

    /// Handles with staged writes, in handle order.
    pub fn pending(&self) -> Vec<Handle> {
        self.staged.keys().copied().collect()
    }

    /// Whether `handle` has been loaded into this session (or staged by it).
    pub fn is_activated(&self, handle: Handle) -> bool {
        matches!(self.staged.get(&handle), Some(Staged::Put(_))) || self.activated.contains_key(&handle)
    }

    pub fn activated_len(&self) -> usize {
        self.activated.len()
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::illegal_state("session is closed"));
        }
        Ok(())
    }

    pub(crate) fn ensure_writable(&self) -> EngineResult<()> {
        self.ensure_open()?;
        if self.read_only {
            return Err(EngineError::illegal_state("session is read-only"));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Stage `object`, allocating a handle first if it has never been saved.
    pub fn save<T: Persistent>(&mut self, object: &mut T) -> EngineResult<Handle> {
        self.ensure_writable()?;
        let handle = match object.identity().handle() {
            Ok(handle) => handle,
            Err(_) => {
                let handle = self.store.allocate()?;
                object.set_identity(handle.into());
                handle
            }
        };

        let record = StoredObject::from_typed(object)?;
        self.cache.insert(
            handle,
            Cached {
                object: Arc::new(object.clone()),
                revision: PENDING_REVISION,
            },
        );
        self.staged.insert(handle, Staged::Put(record));
        debug!(session = %self.id, kind = T::KIND, %handle, "staged save");
        Ok(handle)
    }

    /// Stage removal of the object behind `target`.
    pub fn delete<T: Persistent>(&mut self, target: Ref<T>) -> EngineResult<()> {
        self.ensure_writable()?;
        let handle = target.handle();
        self.cache.remove(&handle);
        self.staged.insert(handle, Staged::Delete);
        if self.staged_root == Some(handle) {
            self.staged_root = None;
        }
        debug!(session = %self.id, kind = T::KIND, %handle, "staged delete");
        Ok(())
    }

    /// Stage `root` and mark it as the store's single root object.
    pub fn set_root<T: AggregateRoot>(&mut self, root: &mut T) -> EngineResult<Handle> {
        let handle = self.save(root)?;
        self.staged_root = Some(handle);
        Ok(handle)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn fetch<T: Persistent>(&mut self, target: Ref<T>) -> EngineResult<Arc<T>> {
        self.fetch_by_identity(target.handle())
    }

    /// Materialize the object behind `handle` and activate its neighbourhood.
    pub fn fetch_by_identity<T: Persistent>(&mut self, handle: Handle) -> EngineResult<Arc<T>> {
        self.ensure_open()?;
        let record = self
            .record(handle)?
            .ok_or_else(|| EngineError::not_found(format!("no {} with handle {handle}", T::KIND)))?;
        let object = self.materialize::<T>(record)?;
        self.activate(handle)?;
        Ok(object)
    }

    /// Like [`fetch`](Self::fetch), with a dangling reference mapped to `None`.
    pub fn try_fetch<T: Persistent>(&mut self, target: Ref<T>) -> EngineResult<Option<Arc<T>>> {
        match self.fetch(target) {
            Ok(object) => Ok(Some(object)),
            Err(EngineError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The store's root object.
    pub fn root<T: AggregateRoot>(&mut self) -> EngineResult<Arc<T>> {
        self.ensure_open()?;
        let handle = match self.staged_root {
            Some(handle) => handle,
            None => self
                .store
                .root()?
                .ok_or_else(|| EngineError::not_found("store has no root object"))?,
        };
        self.fetch_by_identity(handle)
    }

    /// Every object of kind `T` accepted by `selector`, in handle order.
    ///
    /// Always reads through to the store, so objects committed by other
    /// sessions become visible here.
    pub fn query<T, F>(&mut self, selector: F) -> EngineResult<Vec<Arc<T>>>
    where
        T: Persistent,
        F: Fn(&T) -> bool,
    {
        self.ensure_open()?;
        let mut found = Vec::new();
        for record in self.kind_records(T::KIND)? {
            let handle = record.handle;
            let object = self.materialize::<T>(record)?;
            if selector(&object) {
                self.activate(handle)?;
                found.push(object);
            }
        }
        Ok(found)
    }

    /// Every object of kind `T` whose payload matches the populated fields of `prototype`.
    pub fn query_by_example<T: Persistent>(&mut self, prototype: &T) -> EngineResult<Vec<Arc<T>>> {
        self.ensure_open()?;
        let example = serde_json::to_value(prototype)
            .map_err(|e| StoreError::Codec(format!("{} prototype serialization failed: {e}", T::KIND)))?;

        let mut found = Vec::new();
        for record in self.kind_records(T::KIND)? {
            if !matches_example(&example, &record.payload) {
                continue;
            }
            let handle = record.handle;
            found.push(self.materialize::<T>(record)?);
            self.activate(handle)?;
        }
        Ok(found)
    }

    /// Latest record for `handle` as this session sees it.
    fn record(&mut self, handle: Handle) -> EngineResult<Option<StoredObject>> {
        match self.staged.get(&handle) {
            Some(Staged::Put(record)) => return Ok(Some(record.clone())),
            Some(Staged::Delete) => return Ok(None),
            None => {}
        }
        if let Some(record) = self.activated.get(&handle) {
            return Ok(Some(record.clone()));
        }
        let loaded = self.store.load(handle)?;
        if let Some(record) = &loaded {
            self.activated.insert(handle, record.clone());
        }
        Ok(loaded)
    }

    /// Committed records of `kind` overlaid with this session's staged writes.
    fn kind_records(&mut self, kind: &str) -> EngineResult<Vec<StoredObject>> {
        let mut merged = BTreeMap::new();
        for record in self.store.load_kind(kind)? {
            if self.staged.contains_key(&record.handle) {
                continue;
            }
            self.activated.insert(record.handle, record.clone());
            merged.insert(record.handle, record);
        }
        for (handle, staged) in &self.staged {
            if let Staged::Put(record) = staged {
                if record.kind == kind {
                    merged.insert(*handle, record.clone());
                }
            }
        }
        Ok(merged.into_values().collect())
    }

    /// Reuse the cached instance when the record is unchanged, otherwise rebuild it.
    fn materialize<T: Persistent>(&mut self, record: StoredObject) -> EngineResult<Arc<T>> {
        if let Some(cached) = self.cache.get(&record.handle) {
            if cached.revision == record.revision {
                return Arc::clone(&cached.object).downcast::<T>().map_err(|_| {
                    StoreError::KindMismatch {
                        handle: record.handle,
                        expected: T::KIND,
                        found: record.kind.clone(),
                    }
                    .into()
                });
            }
        }

        let object = Arc::new(record.to_typed::<T>()?);
        self.cache.insert(
            record.handle,
            Cached {
                object: Arc::clone(&object) as Arc<dyn Any + Send + Sync>,
                revision: record.revision,
            },
        );
        Ok(object)
    }

    /// Breadth-first load of everything within the start kind's activation depth.
    fn activate(&mut self, start: Handle) -> EngineResult<()> {
        let Some(first) = self.record(start)? else {
            return Ok(());
        };
        let depth = self.policies.policy_for(&first.kind).depth();

        let mut visited = HashSet::from([start]);
        let mut frontier = VecDeque::from([(first, 0u32)]);
        while let Some((record, hops)) = frontier.pop_front() {
            if hops >= depth {
                continue;
            }
            if hops > 0 && self.policies.policy_for(&record.kind).is_leaf() {
                continue;
            }
            for next in &record.references {
                if !visited.insert(*next) {
                    continue;
                }
                match self.record(*next)? {
                    Some(neighbour) => frontier.push_back((neighbour, hops + 1)),
                    None => debug!(session = %self.id, from = %record.handle, to = %next, "dangling reference"),
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Transaction control
    // ---------------------------------------------------------------------

    pub fn savepoint(&self) -> Savepoint {
        Savepoint {
            staged: self.staged.clone(),
            root: self.staged_root,
        }
    }

    /// Discard staged writes made after `savepoint`.
    pub fn rollback_to(&mut self, savepoint: Savepoint) {
        for (handle, staged) in &self.staged {
            if savepoint.staged.get(handle) != Some(staged) {
                self.cache.remove(handle);
            }
        }
        self.staged = savepoint.staged;
        self.staged_root = savepoint.root;
    }

    /// Apply every staged write to the store as one atomic batch.
    ///
    /// On failure the staged writes are kept so the caller can decide to
    /// retry or roll back.
    pub fn commit(&mut self) -> EngineResult<Vec<Handle>> {
        self.ensure_writable()?;
        if !self.has_pending() {
            return Ok(Vec::new());
        }

        let mut batch = WriteBatch {
            root: self.staged_root,
            ..WriteBatch::default()
        };
        for (handle, staged) in &self.staged {
            match staged {
                Staged::Put(record) => batch.puts.push(record.clone()),
                Staged::Delete => batch.deletes.push(*handle),
            }
        }

        let receipt = self.store.apply(batch)?;
        let staged = std::mem::take(&mut self.staged);
        self.staged_root = None;

        for (handle, revision) in &receipt.written {
            if let Some(Staged::Put(mut record)) = staged.get(handle).cloned() {
                record.revision = *revision;
                self.activated.insert(*handle, record);
            }
            if let Some(cached) = self.cache.get_mut(handle) {
                cached.revision = *revision;
            }
        }
        for (handle, staged) in &staged {
            if matches!(staged, Staged::Delete) {
                self.activated.remove(handle);
            }
        }

        let handles = receipt.handles();
        debug!(session = %self.id, written = receipt.written.len(), deleted = receipt.deleted.len(), "committed");
        self.listeners.notify(&handles);
        Ok(handles)
    }

    /// Discard every staged write.
    pub fn rollback(&mut self) {
        for handle in self.staged.keys() {
            self.cache.remove(handle);
        }
        if !self.staged.is_empty() {
            debug!(session = %self.id, discarded = self.staged.len(), "rolled back");
        }
        self.staged.clear();
        self.staged_root = None;
    }

    /// Forget everything activated or cached so the next read goes to the store.
    ///
    /// Staged writes are kept.
    pub fn refresh(&mut self) {
        let staged = &self.staged;
        self.cache.retain(|handle, _| staged.contains_key(handle));
        self.activated.clear();
    }

    /// Roll back anything pending and refuse further use.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.has_pending() {
            warn!(session = %self.id, pending = self.staged.len(), "closing session with uncommitted changes");
        }
        self.rollback();
        self.cache.clear();
        self.activated.clear();
        self.closed = true;
    }
}
