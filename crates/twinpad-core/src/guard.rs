//! Non-reentrant operation guards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A flag marking an operation as in progress.
#[derive(Debug, Clone, Default)]
pub struct OperationGuard {
    busy: Arc<AtomicBool>,
}

/// Proof that the guarded operation is running; released on drop.
#[derive(Debug)]
pub struct GuardToken {
    busy: Arc<AtomicBool>,
}

impl OperationGuard {
    /// Enter the operation, or `None` if it is already running.
    pub fn try_enter(&self) -> Option<GuardToken> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GuardToken {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Returns `true` while a token is alive.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_entry_is_refused_until_release() {
        let guard = OperationGuard::default();
        let token = guard.try_enter().unwrap();
        assert!(guard.try_enter().is_none());
        assert!(guard.is_busy());
        drop(token);
        assert!(guard.try_enter().is_some());
    }
}
