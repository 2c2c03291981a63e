//! The debugger module table.
//!
//! Maps each runtime module to the shadow objects the debugger keeps for it,
//! one per domain the module was loaded into. A module shared across domains
//! has several entries under the same key.
//!
//! # Indexing
//!
//! Entries are hashed on [`ModuleId`] only. The domain is found by a linear
//! scan of the module's bucket. Cross-domain sharing is rare, so buckets
//! almost always hold one entry (stored inline), and there is no second
//! index to allocate or keep in sync on the non-allocating paths.
//!
//! # Locking
//!
//! The table does no synchronization. Every operation asserts its
//! [`LockContract`] in debug builds (and with the `lock-contracts` feature).
//!
//! # Ownership
//!
//! The table owns every shadow object inserted into it. A shadow is dropped
//! exactly once: on [`remove`](ModuleTable::remove),
//! [`evict_domain`](ModuleTable::evict_domain), or
//! [`clear`](ModuleTable::clear). The table must be empty when it is
//! dropped.

use std::collections::hash_map;
use std::fmt;
use std::iter::FusedIterator;
use std::slice;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{DomainId, InsertError, LockContract, ModuleId, ShadowModule, TableError};

/// Bucket count the table is created with.
pub const INITIAL_BUCKETS: usize = 101;

/// Whether lock-contract assertions are compiled in.
const CHECK_CONTRACTS: bool = cfg!(any(debug_assertions, feature = "lock-contracts"));

/// One (module, domain) association and the shadow object it owns.
#[derive(Debug)]
pub struct ModuleEntry<M> {
    module: ModuleId,
    domain: DomainId,
    shadow: M,
}

impl<M> ModuleEntry<M> {
    #[inline]
    pub fn module(&self) -> ModuleId {
        self.module
    }

    #[inline]
    pub fn domain(&self) -> DomainId {
        self.domain
    }

    #[inline]
    pub fn shadow(&self) -> &M {
        &self.shadow
    }

    #[inline]
    pub fn shadow_mut(&mut self) -> &mut M {
        &mut self.shadow
    }
}

/// Entries for one module, in insertion order.
type Bucket<M> = SmallVec<[ModuleEntry<M>; 1]>;

/// Registry of shadow modules keyed by runtime module and domain.
pub struct ModuleTable<M, C: LockContract> {
    buckets: FxHashMap<ModuleId, Bucket<M>>,
    len: usize,
    contract: C,
}

impl<M, C: LockContract> ModuleTable<M, C> {
    /// Create an empty table pre-sized to [`INITIAL_BUCKETS`].
    pub fn new(contract: C) -> Self {
        Self::with_capacity(INITIAL_BUCKETS, contract)
    }

    pub fn with_capacity(capacity: usize, contract: C) -> Self {
        ModuleTable {
            buckets: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            len: 0,
            contract,
        }
    }

    /// The lock contract this table checks.
    pub fn contract(&self) -> &C {
        &self.contract
    }

    #[inline]
    #[track_caller]
    fn assert_lock_held(&self) {
        if CHECK_CONTRACTS {
            assert!(
                self.contract.thread_holds_lock(),
                "module table accessed without the debugger data lock"
            );
        }
    }

    /// Number of (module, domain) entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reserve hash slots for `additional` more distinct modules.
    ///
    /// Only the module index is sized. A module later added to a second
    /// domain still grows its own bucket on insert.
    pub fn reserve(&mut self, additional: usize) -> Result<(), TableError> {
        self.assert_lock_held();
        self.buckets
            .try_reserve(additional)
            .map_err(|_| TableError::OutOfMemory {
                requested: additional,
            })
    }

    /// Take ownership of `shadow` as the entry for `(module, domain)`.
    ///
    /// The caller guarantees no entry exists for the pair yet. On error the
    /// table is unchanged and `shadow` comes back in the [`InsertError`].
    pub fn insert(
        &mut self,
        module: ModuleId,
        domain: DomainId,
        shadow: M,
    ) -> Result<(), InsertError<M>> {
        self.assert_lock_held();
        debug_assert!(
            self.get(module, domain).is_none(),
            "duplicate debugger module for {module:?} in {domain:?}"
        );
        tracing::trace!(?module, ?domain, "adding debugger module");

        if let Err(error) = self.make_room(module) {
            tracing::debug!(?module, ?domain, %error, "debugger module not inserted");
            return Err(InsertError { error, shadow });
        }
        self.buckets.entry(module).or_default().push(ModuleEntry {
            module,
            domain,
            shadow,
        });
        self.len += 1;
        Ok(())
    }

    /// Ensure one more entry for `module` fits without allocating.
    ///
    /// Leaves the table's contents unchanged on failure.
    fn make_room(&mut self, module: ModuleId) -> Result<(), TableError> {
        match self.buckets.get_mut(&module) {
            Some(bucket) => bucket
                .try_reserve(1)
                .map_err(|_| TableError::OutOfMemory { requested: 1 }),
            // A new bucket holds its first entry inline.
            None => self.reserve(1),
        }
    }

    /// Insert a shadow object under the identities it carries.
    pub fn add_module(&mut self, shadow: M) -> Result<(), InsertError<M>>
    where
        M: ShadowModule,
    {
        let module = shadow.runtime_module();
        let domain = shadow.domain();
        self.insert(module, domain, shadow)
    }

    /// The first shadow recorded for `module`, in any domain.
    ///
    /// When the module is loaded into several domains, which one is
    /// returned is unspecified once entries have been added or removed.
    pub fn get_any(&self, module: ModuleId) -> Option<&M> {
        self.assert_lock_held();
        self.buckets
            .get(&module)
            .and_then(|bucket| bucket.first())
            .map(ModuleEntry::shadow)
    }

    pub fn get_any_mut(&mut self, module: ModuleId) -> Option<&mut M> {
        self.assert_lock_held();
        self.buckets
            .get_mut(&module)
            .and_then(|bucket| bucket.first_mut())
            .map(ModuleEntry::shadow_mut)
    }

    /// The shadow for `module` as loaded into `domain`.
    pub fn get(&self, module: ModuleId, domain: DomainId) -> Option<&M> {
        self.assert_lock_held();
        self.buckets
            .get(&module)?
            .iter()
            .find(|entry| entry.domain == domain)
            .map(ModuleEntry::shadow)
    }

    pub fn get_mut(&mut self, module: ModuleId, domain: DomainId) -> Option<&mut M> {
        self.assert_lock_held();
        self.buckets
            .get_mut(&module)?
            .iter_mut()
            .find(|entry| entry.domain == domain)
            .map(ModuleEntry::shadow_mut)
    }

    /// Drop the shadow for `(module, domain)`.
    ///
    /// Returns `false`, leaving the table untouched, if there is none.
    pub fn remove(&mut self, module: ModuleId, domain: DomainId) -> bool {
        self.assert_lock_held();
        tracing::debug!(?module, ?domain, "attempting to remove debugger module");

        let Some(bucket) = self.buckets.get_mut(&module) else {
            tracing::debug!(?module, ?domain, "no debugger module found");
            return false;
        };
        let Some(pos) = bucket.iter().position(|entry| entry.domain == domain) else {
            tracing::debug!(?module, ?domain, "no debugger module found");
            return false;
        };

        let entry = bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&module);
        }
        self.len -= 1;
        tracing::debug!(?module, ?domain, "removed debugger module");
        drop(entry);

        debug_assert!(self.get(module, domain).is_none());
        true
    }

    /// Drop every shadow belonging to `domain`, whatever its module.
    ///
    /// Catches modules whose unload was never reported before the domain
    /// went away (shared modules, typically). Returns how many were dropped.
    pub fn evict_domain(&mut self, domain: DomainId) -> usize {
        self.assert_lock_held();
        tracing::debug!(?domain, "removing all modules from domain");

        let mut removed = 0;
        self.buckets.retain(|&module, bucket| {
            bucket.retain(|entry| {
                if entry.domain == domain {
                    tracing::debug!(?module, ?domain, "removing debugger module");
                    removed += 1;
                    false
                } else {
                    true
                }
            });
            !bucket.is_empty()
        });
        self.len -= removed;
        tracing::debug!(?domain, removed, "done removing modules from domain");
        removed
    }

    /// Drop every shadow. Must be called before the table is dropped.
    pub fn clear(&mut self) {
        self.assert_lock_held();
        let dropped = self.len;
        // Keeps the allocated buckets.
        self.buckets.clear();
        self.len = 0;
        tracing::debug!(dropped, "module table cleared");
    }

    /// Cursor over every entry, in unspecified order.
    pub fn iter(&self) -> Iter<'_, M> {
        self.assert_lock_held();
        Iter {
            buckets: self.buckets.values(),
            current: slice::Iter::default(),
            remaining: self.len,
        }
    }

    /// Mutable cursor over every entry. Only the shadows can be changed.
    pub fn iter_mut(&mut self) -> IterMut<'_, M> {
        self.assert_lock_held();
        IterMut {
            buckets: self.buckets.values_mut(),
            current: slice::IterMut::default(),
            remaining: self.len,
        }
    }
}

impl<M, C: LockContract> Drop for ModuleTable<M, C> {
    fn drop(&mut self) {
        if CHECK_CONTRACTS && !std::thread::panicking() {
            assert!(
                self.is_empty(),
                "module table dropped with {} live modules; clear it first",
                self.len
            );
        }
    }
}

impl<M: fmt::Debug, C: LockContract> fmt::Debug for ModuleTable<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, M, C: LockContract> IntoIterator for &'a ModuleTable<M, C> {
    type Item = &'a ModuleEntry<M>;
    type IntoIter = Iter<'a, M>;

    fn into_iter(self) -> Iter<'a, M> {
        self.iter()
    }
}

impl<'a, M, C: LockContract> IntoIterator for &'a mut ModuleTable<M, C> {
    type Item = &'a mut ModuleEntry<M>;
    type IntoIter = IterMut<'a, M>;

    fn into_iter(self) -> IterMut<'a, M> {
        self.iter_mut()
    }
}

/// Forward-only cursor over a [`ModuleTable`].
///
/// Borrows the table, so it cannot outlive the lock guard it was created
/// under and no mutation can happen while it is live.
pub struct Iter<'a, M> {
    buckets: hash_map::Values<'a, ModuleId, Bucket<M>>,
    current: slice::Iter<'a, ModuleEntry<M>>,
    remaining: usize,
}

impl<'a, M> Iterator for Iter<'a, M> {
    type Item = &'a ModuleEntry<M>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                self.remaining -= 1;
                return Some(entry);
            }
            self.current = self.buckets.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<M> ExactSizeIterator for Iter<'_, M> {}

impl<M> FusedIterator for Iter<'_, M> {}

/// Forward-only mutable cursor over a [`ModuleTable`].
pub struct IterMut<'a, M> {
    buckets: hash_map::ValuesMut<'a, ModuleId, Bucket<M>>,
    current: slice::IterMut<'a, ModuleEntry<M>>,
    remaining: usize,
}

impl<'a, M> Iterator for IterMut<'a, M> {
    type Item = &'a mut ModuleEntry<M>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                self.remaining -= 1;
                return Some(entry);
            }
            self.current = self.buckets.next()?.iter_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<M> ExactSizeIterator for IterMut<'_, M> {}

impl<M> FusedIterator for IterMut<'_, M> {}
