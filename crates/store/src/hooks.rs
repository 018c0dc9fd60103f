//! Shutdown hooks and change listeners owned by an [`Engine`](crate::Engine).

use std::sync::{Mutex, RwLock};

use tally_core::Handle;
use tracing::{info, warn};

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// Callback invoked with the handles written by each successful commit.
pub type ChangeListener = Box<dyn Fn(&[Handle]) + Send + Sync>;

/// Cleanup callbacks run once when the engine shuts down, newest first.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Mutex<Vec<(String, ShutdownHook)>>,
}

impl HookRegistry {
    pub fn register(&self, name: impl Into<String>, hook: impl FnOnce() + Send + 'static) {
        match self.hooks.lock() {
            Ok(mut hooks) => hooks.push((name.into(), Box::new(hook))),
            Err(_) => warn!("shutdown hook registry poisoned; hook dropped"),
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run and drain every hook in reverse registration order.
    pub fn run_all(&self) {
        let drained = match self.hooks.lock() {
            Ok(mut hooks) => std::mem::take(&mut *hooks),
            Err(_) => {
                warn!("shutdown hook registry poisoned; skipping hooks");
                return;
            }
        };
        for (name, hook) in drained.into_iter().rev() {
            info!(hook = %name, "running shutdown hook");
            hook();
        }
    }
}

impl core::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookRegistry").field("len", &self.len()).finish()
    }
}

/// Subscribers notified after every successful commit.
#[derive(Default)]
pub struct ChangeListeners {
    listeners: RwLock<Vec<ChangeListener>>,
}

impl ChangeListeners {
    pub fn subscribe(&self, listener: ChangeListener) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(_) => warn!("change listener registry poisoned; listener dropped"),
        }
    }

    pub fn notify(&self, handles: &[Handle]) {
        if handles.is_empty() {
            return;
        }
        match self.listeners.read() {
            Ok(listeners) => {
                for listener in listeners.iter() {
                    listener(handles);
                }
            }
            Err(_) => warn!("change listener registry poisoned; notification skipped"),
        }
    }
}

impl core::fmt::Debug for ChangeListeners {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let len = self.listeners.read().map(|l| l.len()).unwrap_or(0);
        f.debug_struct("ChangeListeners").field("len", &len).finish()
    }
}
