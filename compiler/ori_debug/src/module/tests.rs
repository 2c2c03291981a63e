use pretty_assertions::assert_eq;

use super::*;

fn module(raw: u64) -> ModuleId {
    ModuleId::new(raw).unwrap_or_else(|| panic!("null module id"))
}

#[test]
fn new_module_has_changeable_default_flags() {
    let shadow = DebuggerModule::new(module(0x10), DomainId::new(1));
    assert!(shadow.can_change_jit_flags());
    assert_eq!(shadow.jit_flags(), JitFlags::empty());
    assert_eq!(shadow.runtime_module(), module(0x10));
    assert_eq!(shadow.domain(), DomainId::new(1));
}

#[test]
fn jit_flags_change_while_allowed() {
    let mut shadow = DebuggerModule::new(module(0x10), DomainId::new(1));
    let flags = JitFlags::DISABLE_OPTIMIZATION | JitFlags::TRACK_JIT_INFO;

    assert_eq!(shadow.set_jit_flags(flags), Ok(()));
    assert_eq!(shadow.jit_flags(), flags);
}

#[test]
fn frozen_module_rejects_jit_flags() {
    let mut shadow = DebuggerModule::new(module(0x20), DomainId::new(1));
    shadow.set_can_change_jit_flags(false);

    assert_eq!(
        shadow.set_jit_flags(JitFlags::ENABLE_ENC),
        Err(JitFlagsError::Frozen {
            module: module(0x20)
        })
    );
    assert_eq!(shadow.jit_flags(), JitFlags::empty());
}

#[test]
fn unfreezing_allows_changes_again() {
    let mut shadow = DebuggerModule::new(module(0x30), DomainId::new(2));
    shadow.set_can_change_jit_flags(false);
    shadow.set_can_change_jit_flags(true);

    assert_eq!(shadow.set_jit_flags(JitFlags::ENABLE_ENC), Ok(()));
    assert_eq!(shadow.jit_flags(), JitFlags::ENABLE_ENC);
}
