//! Single mutual-exclusion gate shared by every request-issuing operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Pending,
}

/// Cheap to clone; every clone observes the same flag
#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    pending: Arc<AtomicBool>,
}

/// Holds the flag at `Pending` until dropped
#[derive(Debug)]
#[must_use = "the flag returns to Idle as soon as the guard is dropped"]
pub struct BusyGuard {
    pending: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `Idle -> Pending`. Returns `None` if a request is already outstanding.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                pending: Arc::clone(&self.pending),
            })
    }

    pub fn state(&self) -> RequestState {
        if self.pending.load(Ordering::Acquire) {
            RequestState::Pending
        } else {
            RequestState::Idle
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == RequestState::Pending
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.pending.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let flag = BusyFlag::new();
        let shared = flag.clone();

        let guard = flag.try_acquire().unwrap();
        assert_eq!(shared.state(), RequestState::Pending);
        assert!(shared.try_acquire().is_none());

        drop(guard);
        assert_eq!(flag.state(), RequestState::Idle);
        assert!(shared.try_acquire().is_some());
    }
}
