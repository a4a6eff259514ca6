use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::{Error, Result};

/// Opaque identifier of a render context.
///
/// Ids are never reused, so a handle kept past its context's destruction can
/// never alias a newer context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextHandle(NonZeroU64);

impl ContextHandle {
    pub fn as_raw(self) -> u64 {
        self.0.get()
    }

    /// Rebuilds a handle from a value previously returned by `as_raw`.
    /// Zero is the null sentinel and yields `None`.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }
}

/// Shared, lock-protected record of the live context handle.
#[derive(Debug, Default)]
pub struct ContextSlot {
    current: Mutex<Option<ContextHandle>>,
    issued: AtomicU64,
}

impl ContextSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh handle without publishing it.
    pub fn issue(&self) -> ContextHandle {
        let prev = self.issued.fetch_add(1, Ordering::Relaxed);
        ContextHandle(NonZeroU64::MIN.saturating_add(prev))
    }

    /// Publishes `handle` as the live context.
    pub fn publish(&self, handle: ContextHandle) {
        *self.lock() = Some(handle);
    }

    /// Withdraws `handle`. Returns false if it was not the live context.
    pub fn retire(&self, handle: ContextHandle) -> bool {
        let mut current = self.lock();
        if *current == Some(handle) {
            *current = None;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<ContextHandle> {
        *self.lock()
    }

    /// Fails with `ContextUnavailable` unless `handle` is the live context.
    pub fn check(&self, handle: ContextHandle) -> Result<()> {
        if self.current() == Some(handle) {
            Ok(())
        } else {
            Err(Error::ContextUnavailable)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ContextHandle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_non_null() {
        let slot = ContextSlot::new();
        let a = slot.issue();
        let b = slot.issue();
        assert_ne!(a, b);
        assert_ne!(a.as_raw(), 0);
        assert_eq!(ContextHandle::from_raw(a.as_raw()), Some(a));
        assert_eq!(ContextHandle::from_raw(0), None);
    }

    #[test]
    fn check_follows_publish_and_retire() {
        let slot = ContextSlot::new();
        let h = slot.issue();
        assert!(matches!(slot.check(h), Err(Error::ContextUnavailable)));

        slot.publish(h);
        assert!(slot.check(h).is_ok());
        assert_eq!(slot.current(), Some(h));

        assert!(slot.retire(h));
        assert!(!slot.retire(h));
        assert!(matches!(slot.check(h), Err(Error::ContextUnavailable)));
    }

    #[test]
    fn stale_handle_does_not_retire_newer_context() {
        let slot = ContextSlot::new();
        let old = slot.issue();
        slot.publish(old);
        let new = slot.issue();
        slot.publish(new);

        assert!(!slot.retire(old));
        assert!(slot.check(old).is_err());
        assert!(slot.check(new).is_ok());
    }
}
