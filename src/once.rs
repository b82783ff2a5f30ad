// Adapted from the teacher's `cht::oncebox::OnceBox`: create an atomic
// pointer once, never to be modified afterwards. Used to publish a node's
// `key` exactly once (§3 invariant 4).

use std::ptr::null_mut;
use std::sync::atomic::{AtomicPtr, Ordering};

#[derive(Debug, Default)]
pub(crate) struct OnceBox<T> {
    ptr: AtomicPtr<T>,
}

impl<T> OnceBox<T> {
    pub(crate) fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(null_mut()),
        }
    }

    pub(crate) fn get(&self) -> Option<&T> {
        let ptr = self.ptr.load(Ordering::Acquire);
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { &*ptr })
        }
    }

    /// Sets the value if it hasn't been set yet. Returns the winning value
    /// (ours if we won the race, the existing one otherwise) and whether we
    /// were the one who set it.
    pub(crate) fn get_or_init(&self, create: impl FnOnce() -> T) -> (&T, bool) {
        if let Some(res) = self.get() {
            return (res, false);
        }
        let ptr = Box::leak(Box::new(create()));
        match self.ptr.compare_exchange(
            null_mut(),
            ptr,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => (unsafe { &*ptr }, true),
            Err(current) => {
                // Someone else won the race; drop our candidate.
                debug_assert!(!current.is_null());
                let _ = unsafe { Box::from_raw(ptr) };
                (unsafe { &*current }, false)
            }
        }
    }
}

impl<T> Drop for OnceBox<T> {
    fn drop(&mut self) {
        let ptr = self.ptr.swap(null_mut(), Ordering::Relaxed);
        if !ptr.is_null() {
            let _ = unsafe { Box::from_raw(ptr) };
        }
    }
}

// Safety: `OnceBox<T>` only ever exposes `&T`, and the pointee is only ever
// written once via a successful compare_exchange, so it's safe to share
// across threads whenever `T` itself is.
unsafe impl<T: Send> Send for OnceBox<T> {}
unsafe impl<T: Sync> Sync for OnceBox<T> {}
