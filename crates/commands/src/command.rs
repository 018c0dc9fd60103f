use tally_core::{EngineError, EngineResult};
use tally_store::UnitOfWork;
use tracing::{debug, warn};

/// Outcome of a command's readiness check.
///
/// Failing validation is an expected outcome, not an error: callers get a
/// reason string they can show or log, and nothing has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Ready,
    NotReady(String),
}

impl Validation {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady(reason.into())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// `Ready` if `condition` holds, otherwise `NotReady(reason())`.
    pub fn check(condition: bool, reason: impl FnOnce() -> String) -> Self {
        if condition { Self::Ready } else { Self::NotReady(reason()) }
    }

    /// First failure wins.
    pub fn and(self, next: impl FnOnce() -> EngineResult<Validation>) -> EngineResult<Validation> {
        match self {
            Self::Ready => next(),
            not_ready => Ok(not_ready),
        }
    }
}

/// One intended mutation of the object graph (command abstraction).
///
/// A command is built with its target objects and parameters, then executed
/// against a [`UnitOfWork`]. Its effects are staged in the unit of work and
/// only become durable when the caller commits it.
///
/// ## Execution Flow
///
/// ```text
/// execute(uow)
///   ↓
/// 1. validate(uow)     NotReady → Err(CommandNotReady), nothing written
///   ↓
/// 2. savepoint
///   ↓
/// 3. persist(uow)      Err → roll back to the savepoint, return the error
/// ```
///
/// So every single command is atomic. A batch of commands is not: if the
/// third of five fails, the first two remain staged and the caller has to
/// `cancel()` the unit of work to abandon the batch.
pub trait Command: core::fmt::Debug {
    /// Short human label, used in logs.
    fn name(&self) -> &'static str;

    /// Check preconditions without writing anything.
    fn validate(&self, uow: &mut UnitOfWork<'_>) -> EngineResult<Validation>;

    /// Stage the writes. Only called after `validate` returned `Ready`.
    fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()>;

    fn execute(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
        let span = tracing::debug_span!("command", name = self.name());
        let _entered = span.enter();

        debug!("checking readiness");
        if let Validation::NotReady(reason) = self.validate(uow)? {
            debug!(%reason, "not ready");
            return Err(EngineError::CommandNotReady(format!("{}: {reason}", self.name())));
        }

        let savepoint = uow.savepoint();
        debug!("persisting");
        if let Err(e) = self.persist(uow) {
            warn!(error = %e, "command failed; rolling back its writes");
            uow.rollback_to(savepoint);
            return Err(e);
        }
        Ok(())
    }
}

/// Execute `commands` in order, stopping at the first failure.
///
/// Earlier successful commands stay staged; cancel the unit of work to
/// abandon the whole batch.
pub fn execute_all(commands: &mut [&mut dyn Command], uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
    for command in commands.iter_mut() {
        command.execute(uow)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tally_core::{Identity, Persistent};
    use tally_store::{Engine, EngineConfig};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Counter {
        #[serde(skip)]
        identity: Identity,
        value: i64,
    }

    impl Persistent for Counter {
        const KIND: &'static str = "counter";

        fn identity(&self) -> Identity {
            self.identity
        }

        fn set_identity(&mut self, identity: Identity) {
            self.identity = identity;
        }
    }

    /// Saves one counter, then optionally fails after having staged it.
    #[derive(Debug)]
    struct AddCounter {
        value: i64,
        fail_after_save: bool,
    }

    impl Command for AddCounter {
        fn name(&self) -> &'static str {
            "Add Counter"
        }

        fn validate(&self, _uow: &mut UnitOfWork<'_>) -> EngineResult<Validation> {
            Ok(Validation::check(self.value >= 0, || "value must not be negative".to_string()))
        }

        fn persist(&mut self, uow: &mut UnitOfWork<'_>) -> EngineResult<()> {
            uow.save(&mut Counter {
                value: self.value,
                ..Counter::default()
            })?;
            if self.fail_after_save {
                return Err(EngineError::illegal_state("simulated failure"));
            }
            Ok(())
        }
    }

    fn add(value: i64) -> AddCounter {
        AddCounter {
            value,
            fail_after_save: false,
        }
    }

    #[test]
    fn not_ready_command_fails_without_writing() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();
        let mut uow = UnitOfWork::begin(&mut session, "test").unwrap();

        let err = add(-1).execute(&mut uow).unwrap_err();
        assert!(matches!(err, EngineError::CommandNotReady(ref msg) if msg.contains("negative")));
        assert!(uow.dirty().is_empty());
    }

    #[test]
    fn failing_persist_rolls_back_only_that_command() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();
        let mut uow = UnitOfWork::begin(&mut session, "test").unwrap();

        add(1).execute(&mut uow).unwrap();
        let mut broken = AddCounter {
            value: 2,
            fail_after_save: true,
        };
        assert!(broken.execute(&mut uow).is_err());

        assert_eq!(uow.dirty().len(), 1);
        uow.commit().unwrap();
        let values: Vec<i64> = session
            .query::<Counter, _>(|_| true)
            .unwrap()
            .iter()
            .map(|c| c.value)
            .collect();
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn batch_stops_at_first_failure_and_cancel_discards_the_rest() {
        let engine = Engine::in_memory(EngineConfig::default());
        let mut session = engine.gain_client().unwrap();
        let mut uow = UnitOfWork::begin(&mut session, "batch").unwrap();

        let (mut a, mut b, mut c) = (add(1), add(-5), add(3));
        let result = execute_all(&mut [&mut a, &mut b, &mut c], &mut uow);
        assert!(matches!(result, Err(EngineError::CommandNotReady(_))));
        assert_eq!(uow.dirty().len(), 1);

        uow.cancel();
        assert!(session.query::<Counter, _>(|_| true).unwrap().is_empty());
    }

    #[test]
    fn validation_and_short_circuits() {
        let ready = Validation::Ready.and(|| Ok(Validation::not_ready("second")));
        assert_eq!(ready.unwrap(), Validation::not_ready("second"));

        let first = Validation::not_ready("first").and(|| panic!("must not run"));
        assert_eq!(first.unwrap(), Validation::not_ready("first"));
    }
}
