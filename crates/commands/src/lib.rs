//! Commands and finders: the mutation and lookup contracts of the engine.

pub mod command;
pub mod finder;

pub use command::{Command, Validation, execute_all};
pub use finder::{Finder, exactly_one};
