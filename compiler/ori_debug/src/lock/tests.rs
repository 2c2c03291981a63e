use std::sync::Arc;
use std::thread;

use super::*;

fn host_contract() -> (Arc<LockOwnership>, Arc<ExitFlag>, HostContract) {
    let ownership = Arc::new(LockOwnership::new());
    let exit = Arc::new(ExitFlag::new());
    let contract = HostContract::new(Arc::clone(&ownership), Arc::clone(&exit));
    (ownership, exit, contract)
}

// === Ownership tracking ===

#[test]
fn guard_marks_current_thread_as_holder() {
    let lock = DebuggerLock::new(0u32);
    assert!(!lock.is_held_by_current_thread());

    {
        let _guard = lock.lock();
        assert!(lock.is_held_by_current_thread());
        assert!(lock.ownership().is_held());
    }

    assert!(!lock.is_held_by_current_thread());
    assert!(!lock.ownership().is_held());
}

#[test]
fn other_thread_does_not_hold_lock() {
    let lock = DebuggerLock::new(());
    let _guard = lock.lock();

    thread::scope(|s| {
        let seen = s.spawn(|| lock.is_held_by_current_thread()).join();
        assert!(matches!(seen, Ok(false)));
    });
}

#[test]
fn try_lock_fails_while_held_elsewhere() {
    let lock = DebuggerLock::new(());
    let _guard = lock.lock();

    thread::scope(|s| {
        let acquired = s.spawn(|| lock.try_lock().is_some()).join();
        assert!(matches!(acquired, Ok(false)));
    });
}

#[test]
fn guard_gives_access_to_data() {
    let lock = DebuggerLock::new(vec![1, 2]);
    lock.lock().push(3);
    assert_eq!(lock.into_inner(), vec![1, 2, 3]);
}

// === Host contract ===

#[test]
fn contract_follows_lock_ownership() {
    let (ownership, _exit, contract) = host_contract();
    let lock = DebuggerLock::with_ownership(ownership, ());

    assert!(!contract.thread_holds_lock());
    let guard = lock.lock();
    assert!(contract.lock_held());
    assert!(contract.thread_holds_lock());
    drop(guard);
    assert!(!contract.thread_holds_lock());
}

#[test]
fn process_exit_relaxes_contract() {
    let (_ownership, exit, contract) = host_contract();

    assert!(!contract.thread_holds_lock());
    exit.mark_exiting();
    assert!(contract.process_exiting());
    assert!(!contract.lock_held());
    assert!(contract.thread_holds_lock());
}

#[test]
fn contract_through_shared_references() {
    let (ownership, exit, contract) = host_contract();
    let lock = DebuggerLock::with_ownership(ownership, ());
    let shared = Arc::new(contract);
    let _guard = lock.lock();

    assert!(LockContract::thread_holds_lock(&shared));
    assert!(LockContract::thread_holds_lock(&&*shared));
    assert!(!exit.is_exiting());
}
