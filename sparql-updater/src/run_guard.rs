//! Run-level mutual exclusion

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// At most one [`RunPermit`] exists at a time per guard (and its clones).
///
/// Acquisition never waits: a second caller is refused and expected to log
/// and drop its request.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    busy: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the permit, or `None` when a run is in progress.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof of holding the run guard; releases it on drop.
#[derive(Debug)]
pub struct RunPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().unwrap();
        assert!(guard.is_running());
        assert!(guard.clone().try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_released_on_panic() {
        let guard = RunGuard::new();
        let g = guard.clone();
        let result = std::panic::catch_unwind(move || {
            let _permit = g.try_acquire().unwrap();
            panic!("run failed");
        });
        assert!(result.is_err());
        assert!(!guard.is_running());
    }
}
