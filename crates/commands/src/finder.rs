use tally_core::{EngineError, EngineResult};
use tally_store::Session;

/// A parameterised lookup that must resolve to something specific.
///
/// Finders are the read-side counterpart of commands: they are set up with
/// criteria, then `query` runs them against a session. Results are kept until
/// a criterion changes, so repeated accessors don't hit the store again.
pub trait Finder {
    type Output;

    /// Run the lookup; `NotFound` when nothing (or too much) matches.
    fn query(&mut self, session: &mut Session) -> EngineResult<Self::Output>;
}

/// The single element of `found`, or `NotFound` naming `what` was sought.
pub fn exactly_one<T>(mut found: Vec<T>, what: &str) -> EngineResult<T> {
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(EngineError::not_found(format!("no {what} matched"))),
        n => Err(EngineError::not_found(format!(
            "{n} {what} matched where exactly one was required"
        ))),
    }
}
