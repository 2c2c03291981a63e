//! Opaque runtime identities for loaded modules and isolation domains.
//!
//! The debugger never looks inside these. A `ModuleId` is the hash key of
//! the module table; a `DomainId` only disambiguates modules that were
//! loaded into more than one domain.

use std::fmt;
use std::num::NonZeroU64;

/// Identity of a runtime-loaded module (code unit).
///
/// Never null: the runtime hands out module identities derived from live
/// module addresses, and the table refuses to key on zero.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ModuleId(NonZeroU64);

impl ModuleId {
    /// Create a `ModuleId` from a raw runtime identity.
    ///
    /// Returns `None` for the null identity.
    #[inline]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(raw) => Some(ModuleId(raw)),
            None => None,
        }
    }

    /// Get the raw identity value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId(0x{:x})", self.0.get())
    }
}

/// Identity of an isolation domain a module was loaded into.
///
/// Not `Hash`: domains are compared, never used as keys.
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct DomainId(u64);

impl DomainId {
    /// Create a `DomainId` from a raw runtime identity.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        DomainId(raw)
    }

    /// Get the raw identity value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainId(0x{:x})", self.0)
    }
}
