//! The coarse debugger data lock and the contract the module table checks.
//!
//! The module table does no synchronization of its own. Every call into it
//! must happen while the caller holds the debugger data lock, or while the
//! process is exiting (the surviving shutdown thread implicitly owns every
//! lock). The table verifies this through a [`LockContract`] it is given at
//! construction; it never consults process-wide state on its own.
//!
//! # Usage
//!
//! ```text
//! let ownership = Arc::new(LockOwnership::new());
//! let contract = HostContract::new(Arc::clone(&ownership), Arc::clone(&exit));
//! let lock = DebuggerLock::with_ownership(ownership, ModuleTable::new(contract));
//!
//! let mut table = lock.lock();
//! table.insert(module, domain, shadow)?;
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Token value meaning "no thread".
const NO_OWNER: usize = 0;

static NEXT_THREAD_TOKEN: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static THREAD_TOKEN: usize = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

/// Token identifying the calling thread, or `NO_OWNER` once its
/// thread-locals have been torn down.
#[inline]
fn current_thread_token() -> usize {
    THREAD_TOKEN.try_with(|token| *token).unwrap_or(NO_OWNER)
}

/// Predicates the module table asserts before touching its entries.
pub trait LockContract {
    /// Whether the calling thread holds the debugger data lock.
    fn lock_held(&self) -> bool;

    /// Whether the process is on its single-threaded exit path.
    fn process_exiting(&self) -> bool;

    /// Whether the calling thread may operate on the table.
    ///
    /// During process exit this is unconditionally true.
    #[inline]
    fn thread_holds_lock(&self) -> bool {
        self.process_exiting() || self.lock_held()
    }
}

impl<T: LockContract + ?Sized> LockContract for &T {
    #[inline]
    fn lock_held(&self) -> bool {
        (**self).lock_held()
    }

    #[inline]
    fn process_exiting(&self) -> bool {
        (**self).process_exiting()
    }
}

impl<T: LockContract + ?Sized> LockContract for Arc<T> {
    #[inline]
    fn lock_held(&self) -> bool {
        (**self).lock_held()
    }

    #[inline]
    fn process_exiting(&self) -> bool {
        (**self).process_exiting()
    }
}

/// Which thread currently holds a [`DebuggerLock`].
///
/// Shared between the lock, which updates it, and a [`HostContract`], which
/// reads it.
#[derive(Debug, Default)]
pub struct LockOwnership {
    owner: AtomicUsize,
}

impl LockOwnership {
    pub const fn new() -> Self {
        LockOwnership {
            owner: AtomicUsize::new(NO_OWNER),
        }
    }

    /// Whether the calling thread is the current holder.
    #[inline]
    pub fn held_by_current_thread(&self) -> bool {
        let token = current_thread_token();
        token != NO_OWNER && self.owner.load(Ordering::Acquire) == token
    }

    /// Whether any thread holds the lock.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.owner.load(Ordering::Acquire) != NO_OWNER
    }

    fn acquire(&self) {
        self.owner.store(current_thread_token(), Ordering::Release);
    }

    fn release(&self) {
        self.owner.store(NO_OWNER, Ordering::Release);
    }
}

/// Host-owned process-exit oracle.
///
/// The host flips this once concurrent execution has ceased and only the
/// shutdown thread remains. It is injected, never global.
#[derive(Debug, Default)]
pub struct ExitFlag {
    exiting: AtomicBool,
}

impl ExitFlag {
    pub const fn new() -> Self {
        ExitFlag {
            exiting: AtomicBool::new(false),
        }
    }

    /// Record that the process has entered its exit path. Irreversible.
    pub fn mark_exiting(&self) {
        tracing::debug!("process exit observed; lock contract relaxed");
        self.exiting.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }
}

/// [`LockContract`] backed by a [`DebuggerLock`]'s ownership record and the
/// host's [`ExitFlag`].
#[derive(Clone, Debug)]
pub struct HostContract {
    ownership: Arc<LockOwnership>,
    exit: Arc<ExitFlag>,
}

impl HostContract {
    pub fn new(ownership: Arc<LockOwnership>, exit: Arc<ExitFlag>) -> Self {
        HostContract { ownership, exit }
    }
}

impl LockContract for HostContract {
    #[inline]
    fn lock_held(&self) -> bool {
        self.ownership.held_by_current_thread()
    }

    #[inline]
    fn process_exiting(&self) -> bool {
        self.exit.is_exiting()
    }
}

/// The coarse debugger data lock.
///
/// Not reentrant. Acquiring it twice on one thread is a programming error
/// and is asserted in debug builds rather than left to deadlock.
pub struct DebuggerLock<T> {
    ownership: Arc<LockOwnership>,
    data: Mutex<T>,
}

impl<T> DebuggerLock<T> {
    /// Create a lock with its own ownership record.
    pub fn new(data: T) -> Self {
        Self::with_ownership(Arc::new(LockOwnership::new()), data)
    }

    /// Create a lock that reports into an existing ownership record.
    ///
    /// Use this when `data` already carries a [`HostContract`] built from
    /// the same record.
    pub fn with_ownership(ownership: Arc<LockOwnership>, data: T) -> Self {
        DebuggerLock {
            ownership,
            data: Mutex::new(data),
        }
    }

    /// Acquire the lock, blocking until it is available.
    pub fn lock(&self) -> DebuggerLockGuard<'_, T> {
        debug_assert!(
            !self.ownership.held_by_current_thread(),
            "debugger data lock is not reentrant"
        );
        let guard = self.data.lock();
        self.ownership.acquire();
        DebuggerLockGuard {
            guard,
            ownership: &self.ownership,
        }
    }

    /// Acquire the lock if it is free.
    pub fn try_lock(&self) -> Option<DebuggerLockGuard<'_, T>> {
        let guard = self.data.try_lock()?;
        self.ownership.acquire();
        Some(DebuggerLockGuard {
            guard,
            ownership: &self.ownership,
        })
    }

    #[inline]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.ownership.held_by_current_thread()
    }

    /// The ownership record this lock updates.
    pub fn ownership(&self) -> &Arc<LockOwnership> {
        &self.ownership
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

/// Scoped hold of a [`DebuggerLock`]. Releases on drop.
pub struct DebuggerLockGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    ownership: &'a LockOwnership,
}

impl<T> Deref for DebuggerLockGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for DebuggerLockGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for DebuggerLockGuard<'_, T> {
    fn drop(&mut self) {
        // Clear ownership before the mutex itself unlocks.
        self.ownership.release();
    }
}

#[cfg(test)]
mod tests;
