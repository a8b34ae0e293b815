//! One-shot deferred work with a cancel handle
//!
//! The runtime loop owns the clock: it asks for the next deadline, sleeps until
//! then and hands the task back once it is due.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cancels the deferred task it was created with. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Deferred<T> {
    due: Instant,
    payload: T,
    cancel: CancelHandle,
}

impl<T> Deferred<T> {
    pub fn new(due: Instant, payload: T) -> Self {
        Self {
            due,
            payload,
            cancel: CancelHandle::default(),
        }
    }

    pub fn due(&self) -> Instant {
        self.due
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }
}
