//! Debugger module table for the Ori runtime.
//!
//! The debugger keeps one shadow object per (runtime module, domain) pair so
//! it can track per-domain debugging state even when a module is shared by
//! several isolation domains. This crate owns those shadows and answers
//! lookups; it does not decide when modules come and go.
//!
//! - **Identities** ([`ModuleId`], [`DomainId`]) — opaque runtime handles.
//! - **Lock contract** ([`LockContract`], [`DebuggerLock`]) — the single
//!   coarse lock every caller must hold, relaxed on the process-exit path.
//! - **Table** ([`ModuleTable`]) — owns shadows, hashed on the module,
//!   scanned on the domain.
//! - **Shadow payload** ([`DebuggerModule`]) — per-domain JIT policy.
//!
//! # Failure Model
//!
//! Only insertion can fail, and only when the allocator is exhausted
//! ([`TableError::OutOfMemory`]). Lookups and removals report absence with
//! `None`/`false`. Touching the table without the lock, or dropping it while
//! it still owns shadows, is a bug and panics in debug builds.

mod error;
mod ids;
mod lock;
mod module;
mod table;

pub use error::{InsertError, JitFlagsError, TableError};
pub use ids::{DomainId, ModuleId};
pub use lock::{
    DebuggerLock, DebuggerLockGuard, ExitFlag, HostContract, LockContract, LockOwnership,
};
pub use module::{DebuggerModule, JitFlags, ShadowModule};
pub use table::{Iter, IterMut, ModuleEntry, ModuleTable, INITIAL_BUCKETS};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=ori_debug=debug` or `RUST_LOG=ori_debug=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // The host may have installed its own subscriber already.
            if let Err(err) = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init()
            {
                tracing::trace!(%err, "keeping the existing tracing subscriber");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_defers_to_host_subscriber() {
        std::env::set_var("RUST_LOG", "ori_debug=trace");
        let installed = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        assert!(installed.is_ok());

        init_tracing();
        init_tracing();
    }
}
