//! Debugger-side shadow of a runtime module loaded into one domain.

use bitflags::bitflags;

use crate::{DomainId, JitFlagsError, ModuleId};

/// A shadow object that knows which (module, domain) pair it stands for.
///
/// Lets [`ModuleTable::add_module`](crate::ModuleTable::add_module) key an
/// entry without the caller restating both identities.
pub trait ShadowModule {
    fn runtime_module(&self) -> ModuleId;
    fn domain(&self) -> DomainId;
}

bitflags! {
    /// JIT policy the debugger requested for a module.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct JitFlags: u32 {
        /// Generate unoptimized code so locals stay inspectable.
        const DISABLE_OPTIMIZATION = 1 << 0;
        /// Allow edit-and-continue on the module's methods.
        const ENABLE_ENC = 1 << 1;
        /// Keep IL-to-native maps for every jitted method.
        const TRACK_JIT_INFO = 1 << 2;
    }
}

/// Per-domain debugging state for one runtime module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebuggerModule {
    runtime_module: ModuleId,
    domain: DomainId,
    can_change_jit_flags: bool,
    jit_flags: JitFlags,
}

impl DebuggerModule {
    /// New shadow with default JIT policy. Flags stay changeable until the
    /// runtime starts jitting code from the module.
    pub fn new(runtime_module: ModuleId, domain: DomainId) -> Self {
        DebuggerModule {
            runtime_module,
            domain,
            can_change_jit_flags: true,
            jit_flags: JitFlags::empty(),
        }
    }

    #[inline]
    pub fn can_change_jit_flags(&self) -> bool {
        self.can_change_jit_flags
    }

    pub fn set_can_change_jit_flags(&mut self, can_change_jit_flags: bool) {
        self.can_change_jit_flags = can_change_jit_flags;
    }

    #[inline]
    pub fn jit_flags(&self) -> JitFlags {
        self.jit_flags
    }

    /// Replace the module's JIT policy.
    ///
    /// Fails once code has been generated under the current flags.
    pub fn set_jit_flags(&mut self, flags: JitFlags) -> Result<(), JitFlagsError> {
        if !self.can_change_jit_flags {
            return Err(JitFlagsError::Frozen {
                module: self.runtime_module,
            });
        }
        tracing::trace!(module = ?self.runtime_module, ?flags, "JIT flags updated");
        self.jit_flags = flags;
        Ok(())
    }
}

impl ShadowModule for DebuggerModule {
    #[inline]
    fn runtime_module(&self) -> ModuleId {
        self.runtime_module
    }

    #[inline]
    fn domain(&self) -> DomainId {
        self.domain
    }
}

#[cfg(test)]
mod tests;
