//! Single-active-session enforcement.
//!
//! The listener is deliberately non-reentrant: at most one session may be
//! `Listening` per process. Rather than an implicit global, the invariant
//! lives in a `SessionRegistry` — the process-wide default is
//! `SessionRegistry::global()`, and tests create isolated registries so
//! they can run in parallel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{ListenError, Result};

/// Tracks whether a session currently holds the single active slot.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    active: Arc<AtomicBool>,
}

impl SessionRegistry {
    /// A fresh registry with no active session (for tests and embedders
    /// that want their own scope).
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by `RecognitionSession` by default.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<SessionRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SessionRegistry::new).clone()
    }

    /// Claim the active slot.
    ///
    /// # Errors
    /// `ListenError::AlreadyInitialized` when another guard is outstanding.
    pub fn acquire(&self) -> Result<SessionLifecycleGuard> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(ListenError::AlreadyInitialized);
        }
        Ok(SessionLifecycleGuard {
            inner: Arc::new(GuardInner {
                registry: self.clone(),
                released: AtomicBool::new(false),
            }),
        })
    }
}

/// RAII handle on the single active-session slot.
///
/// Clones share one release state: the slot is freed by the first explicit
/// `release()` or, failing that, when the last clone drops. This lets the
/// worker thread free the slot immediately on a fatal stop while the
/// session object still exists.
#[derive(Clone)]
pub struct SessionLifecycleGuard {
    inner: Arc<GuardInner>,
}

struct GuardInner {
    registry: SessionRegistry,
    released: AtomicBool,
}

impl SessionLifecycleGuard {
    /// Free the slot. Idempotent.
    pub fn release(&self) {
        if !self.inner.released.swap(true, Ordering::SeqCst) {
            self.inner.registry.active.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for GuardInner {
    fn drop(&mut self) {
        if !self.released.load(Ordering::SeqCst) {
            self.registry.active.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_while_guard_held() {
        let registry = SessionRegistry::new();
        let guard = registry.acquire().expect("first acquire");
        assert!(matches!(
            registry.acquire(),
            Err(ListenError::AlreadyInitialized)
        ));
        drop(guard);
        assert!(registry.acquire().is_ok());
    }

    #[test]
    fn explicit_release_frees_the_slot_before_drop() {
        let registry = SessionRegistry::new();
        let guard = registry.acquire().expect("acquire");
        let clone = guard.clone();
        clone.release();
        // Slot is free even though both clones are still alive.
        let second = registry.acquire().expect("reacquire after release");
        drop(guard);
        drop(clone);
        // Dropping stale clones must not free the slot a second time.
        assert!(matches!(
            registry.acquire(),
            Err(ListenError::AlreadyInitialized)
        ));
        drop(second);
    }

    #[test]
    fn registries_are_independent() {
        let a = SessionRegistry::new();
        let b = SessionRegistry::new();
        let _guard_a = a.acquire().expect("acquire a");
        assert!(b.acquire().is_ok());
    }
}
