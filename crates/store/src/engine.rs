//! Process-level engine: one store, a pool of sessions, shutdown hooks.
//!
//! The engine replaces any notion of a global "current store". Callers hold an
//! `Engine` (usually behind an `Arc`) and pass the sessions it hands out to the
//! code that needs them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tally_core::{ActivationPolicies, EngineError, EngineResult, Handle};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::hooks::{ChangeListeners, HookRegistry};
use crate::object_store::{InMemoryObjectStore, ObjectStore};
use crate::session::Session;

pub struct Engine {
    store: Arc<dyn ObjectStore>,
    config: EngineConfig,
    policies: Arc<ActivationPolicies>,
    listeners: Arc<ChangeListeners>,
    idle: Mutex<Vec<Session>>,
    hooks: HookRegistry,
    shut_down: AtomicBool,
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .field("shut_down", &self.shut_down.load(Ordering::Relaxed))
            .finish()
    }
}

impl Engine {
    pub fn new(store: impl ObjectStore + 'static, config: EngineConfig) -> Self {
        let policies = Arc::new(config.activation.clone());
        Self {
            store: Arc::new(store),
            config,
            policies,
            listeners: Arc::new(ChangeListeners::default()),
            idle: Mutex::new(Vec::new()),
            hooks: HookRegistry::default(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Engine over a fresh [`InMemoryObjectStore`].
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(InMemoryObjectStore::new(), config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn ensure_running(&self) -> EngineResult<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(EngineError::illegal_state("engine has been shut down"));
        }
        Ok(())
    }

    /// A writable session, reused from the idle pool when one is available.
    pub fn gain_client(&self) -> EngineResult<Session> {
        self.ensure_running()?;
        let pooled = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        match pooled {
            Some(mut session) => {
                session.refresh();
                Ok(session)
            }
            None => Ok(Session::new(
                Arc::clone(&self.store),
                Arc::clone(&self.policies),
                Arc::clone(&self.listeners),
            )),
        }
    }

    /// A session that refuses writes; never pooled.
    pub fn read_only_client(&self) -> EngineResult<Session> {
        self.ensure_running()?;
        Ok(Session::read_only(
            Arc::clone(&self.store),
            Arc::clone(&self.policies),
            Arc::clone(&self.listeners),
        ))
    }

    /// Hand a session back. Uncommitted changes are discarded.
    pub fn release_client(&self, mut session: Session) {
        if session.has_pending() {
            warn!(session = %session.id(), "released session had uncommitted changes; rolling back");
            session.rollback();
        }
        if session.is_read_only() || session.is_closed() || self.shut_down.load(Ordering::Acquire) {
            session.close();
            return;
        }

        match self.idle.lock() {
            Ok(mut idle) if idle.len() < self.config.pool_size => idle.push(session),
            _ => session.close(),
        }
    }

    /// Sessions currently waiting in the pool.
    pub fn idle_clients(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    /// Subscribe to the handles written by every successful commit.
    pub fn on_change(&self, listener: impl Fn(&[Handle]) + Send + Sync + 'static) {
        self.listeners.subscribe(Box::new(listener));
    }

    pub fn register_shutdown_hook(&self, name: impl Into<String>, hook: impl FnOnce() + Send + 'static) {
        self.hooks.register(name, hook);
    }

    /// Run shutdown hooks, close pooled sessions and the store. Idempotent.
    pub fn shutdown(&self) -> EngineResult<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("engine shutting down");
        self.hooks.run_all();

        if let Ok(mut idle) = self.idle.lock() {
            for mut session in idle.drain(..) {
                session.close();
            }
        }
        self.store.close()?;
        Ok(())
    }
}
