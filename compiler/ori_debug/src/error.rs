//! Errors surfaced by the debugger module table.
//!
//! Only growth of the table can fail. Lookups and removals report absence
//! through `Option`/`bool`, and lock-contract violations are assertions.

use std::fmt;

use thiserror::Error;

use crate::ModuleId;

/// Failure to insert into a [`ModuleTable`](crate::ModuleTable).
///
/// The table is left unchanged when this is returned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// The allocator could not provide room for more entries.
    #[error("module table out of memory: could not reserve {requested} more entries")]
    OutOfMemory { requested: usize },
}

/// A rejected insertion, handing the shadow object back to the caller.
///
/// The table never took ownership, so the caller decides whether to retry
/// or tear the shadow down.
#[derive(Error, PartialEq, Eq)]
#[error("debugger module not inserted: {error}")]
pub struct InsertError<M> {
    pub error: TableError,
    pub shadow: M,
}

impl<M> InsertError<M> {
    /// Take back the shadow object that was not inserted.
    pub fn into_shadow(self) -> M {
        self.shadow
    }
}

impl<M> fmt::Debug for InsertError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Failure to change the JIT flags of a shadow module.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum JitFlagsError {
    /// Code for the module has already been jitted with the current flags.
    #[error("JIT flags for {module:?} can no longer be changed")]
    Frozen { module: ModuleId },
}
