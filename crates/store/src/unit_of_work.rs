//! Unit of work: the only scope in which the object graph may be mutated.
//!
//! ```text
//! Open ──commit()──▶ Committed
//!   │
//!   └──cancel()──▶ Cancelled
//! ```
//!
//! Both end states are terminal. `commit` and `cancel` take `self` by value,
//! so a finished unit of work cannot be touched again. Dropping one that is
//! still open cancels it and logs a warning.
//!
//! A unit of work borrows its [`Session`] mutably for its whole life, which is
//! what keeps it single-threaded: nothing else can stage writes into the same
//! session while it is open.

use std::sync::Arc;

use tally_core::{AggregateRoot, EngineError, EngineResult, Handle, Persistent, Ref, UnitOfWorkId};
use tracing::{debug, info, warn};

use crate::session::{Savepoint, Session};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Open,
    Committed,
    Cancelled,
}

pub struct UnitOfWork<'s> {
    id: UnitOfWorkId,
    label: String,
    session: &'s mut Session,
    state: UnitOfWorkState,
    span: tracing::Span,
}

impl core::fmt::Debug for UnitOfWork<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state)
            .field("pending", &self.session.pending().len())
            .finish()
    }
}

impl<'s> UnitOfWork<'s> {
    /// Open a unit of work over `session`.
    ///
    /// The label is for diagnostics only but must not be blank. The session
    /// must be writable and must not carry writes left over from elsewhere.
    pub fn begin(session: &'s mut Session, label: impl Into<String>) -> EngineResult<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(EngineError::illegal_argument("a unit of work needs a label"));
        }
        session.ensure_writable()?;
        if session.has_pending() {
            return Err(EngineError::illegal_state(
                "session has uncommitted changes from outside this unit of work",
            ));
        }

        let id = UnitOfWorkId::new();
        let span = tracing::info_span!("unit_of_work", %id, label = %label, session = %session.id());
        span.in_scope(|| debug!("opened"));

        Ok(Self {
            id,
            label,
            session,
            state: UnitOfWorkState::Open,
            span,
        })
    }

    pub fn id(&self) -> UnitOfWorkId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.state
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// The underlying session, for reads that are not wrapped here.
    pub fn session(&mut self) -> &mut Session {
        self.session
    }

    /// Handles written so far.
    pub fn dirty(&self) -> Vec<Handle> {
        self.session.pending()
    }

    pub fn save<T: Persistent>(&mut self, object: &mut T) -> EngineResult<Handle> {
        self.session.save(object)
    }

    pub fn delete<T: Persistent>(&mut self, target: Ref<T>) -> EngineResult<()> {
        self.session.delete(target)
    }

    pub fn set_root<T: AggregateRoot>(&mut self, root: &mut T) -> EngineResult<Handle> {
        self.session.set_root(root)
    }

    pub fn root<T: AggregateRoot>(&mut self) -> EngineResult<Arc<T>> {
        self.session.root()
    }

    pub fn fetch<T: Persistent>(&mut self, target: Ref<T>) -> EngineResult<Arc<T>> {
        self.session.fetch(target)
    }

    pub fn try_fetch<T: Persistent>(&mut self, target: Ref<T>) -> EngineResult<Option<Arc<T>>> {
        self.session.try_fetch(target)
    }

    pub fn query<T, F>(&mut self, selector: F) -> EngineResult<Vec<Arc<T>>>
    where
        T: Persistent,
        F: Fn(&T) -> bool,
    {
        self.session.query(selector)
    }

    pub fn query_by_example<T: Persistent>(&mut self, prototype: &T) -> EngineResult<Vec<Arc<T>>> {
        self.session.query_by_example(prototype)
    }

    pub fn savepoint(&self) -> Savepoint {
        self.session.savepoint()
    }

    pub fn rollback_to(&mut self, savepoint: Savepoint) {
        self.session.rollback_to(savepoint);
    }

    /// Durably apply everything staged, all or nothing.
    ///
    /// Returns the handles written. If the store rejects the batch, nothing
    /// is applied, the staged writes are discarded and the unit of work ends
    /// cancelled.
    pub fn commit(mut self) -> EngineResult<Vec<Handle>> {
        let _entered = self.span.enter();
        match self.session.commit() {
            Ok(handles) => {
                self.state = UnitOfWorkState::Committed;
                info!(written = handles.len(), "committed");
                Ok(handles)
            }
            Err(e) => {
                self.session.rollback();
                self.state = UnitOfWorkState::Cancelled;
                warn!(error = %e, "commit failed; changes discarded");
                Err(e)
            }
        }
    }

    /// Discard everything staged.
    pub fn cancel(mut self) {
        let _entered = self.span.enter();
        self.session.rollback();
        self.state = UnitOfWorkState::Cancelled;
        info!("cancelled");
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if self.state == UnitOfWorkState::Open {
            let _entered = self.span.enter();
            warn!(pending = self.session.pending().len(), "unit of work dropped while open; cancelling");
            self.session.rollback();
            self.state = UnitOfWorkState::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use serde::{Deserialize, Serialize};
    use tally_core::Identity;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Note {
        #[serde(skip)]
        identity: Identity,
        text: String,
    }

    impl Persistent for Note {
        const KIND: &'static str = "note";

        fn identity(&self) -> Identity {
            self.identity
        }

        fn set_identity(&mut self, identity: Identity) {
            self.identity = identity;
        }
    }

    fn note(text: &str) -> Note {
        Note {
            text: text.to_string(),
            ..Note::default()
        }
    }

    #[test]
    fn blank_label_is_rejected() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();
        assert!(matches!(
            UnitOfWork::begin(&mut session, "  "),
            Err(EngineError::IllegalArgument(_))
        ));
    }

    #[test]
    fn commit_makes_writes_visible_to_other_sessions() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();

        let mut uow = UnitOfWork::begin(&mut session, "add note").unwrap();
        uow.save(&mut note("hello")).unwrap();
        assert_eq!(uow.state(), UnitOfWorkState::Open);
        let written = uow.commit().unwrap();
        assert_eq!(written.len(), 1);

        let mut other = engine.gain_client().unwrap();
        assert_eq!(other.query::<Note, _>(|_| true).unwrap().len(), 1);
    }

    #[test]
    fn cancel_discards_writes() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();

        let mut uow = UnitOfWork::begin(&mut session, "scratch").unwrap();
        uow.save(&mut note("draft")).unwrap();
        uow.cancel();

        assert!(!session.has_pending());
        assert!(session.query::<Note, _>(|_| true).unwrap().is_empty());
    }

    #[test]
    fn dropping_an_open_unit_of_work_cancels_it() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();
        {
            let mut uow = UnitOfWork::begin(&mut session, "leaked").unwrap();
            uow.save(&mut note("lost")).unwrap();
        }
        assert!(!session.has_pending());
        assert!(session.query::<Note, _>(|_| true).unwrap().is_empty());
    }

    #[test]
    fn session_with_stray_writes_cannot_open_a_unit_of_work() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();
        session.save(&mut note("stray")).unwrap();
        assert!(matches!(
            UnitOfWork::begin(&mut session, "late"),
            Err(EngineError::IllegalState(_))
        ));
    }

    #[test]
    fn commit_failure_ends_cancelled_with_nothing_applied() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();
        let mut uow = UnitOfWork::begin(&mut session, "doomed").unwrap();
        uow.save(&mut note("never")).unwrap();
        engine.shutdown().unwrap();

        assert!(matches!(uow.commit(), Err(EngineError::Storage(_))));
        assert!(!session.has_pending());
    }

    #[test]
    fn change_listeners_hear_about_commits() {
        let engine = Engine::in_memory(EngineConfig::default());
        let heard = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&heard);
        engine.on_change(move |handles| sink.lock().unwrap().extend_from_slice(handles));

        let mut session = engine.gain_client().unwrap();
        let mut uow = UnitOfWork::begin(&mut session, "notify").unwrap();
        let mut n = note("ping");
        let handle = uow.save(&mut n).unwrap();
        uow.commit().unwrap();

        assert_eq!(*heard.lock().unwrap(), vec![handle]);
    }
}
