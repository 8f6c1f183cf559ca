use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Per-slot completion counter.
///
/// Holds the highest submission serial the GPU has finished for this slot.
/// Serials are issued by the pool from a monotonically increasing counter, so
/// "occupant finished" is a plain `completed >= serial` comparison.
#[derive(Debug, Default)]
pub struct SlotFence {
    completed: Mutex<u64>,
    cond: Condvar,
}

impl SlotFence {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        // The counter is a plain integer; a panicking signaller cannot leave it torn.
        self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Highest serial signaled so far.
    pub fn completed(&self) -> u64 {
        *self.lock()
    }

    #[inline]
    pub fn is_reached(&self, serial: u64) -> bool {
        self.completed() >= serial
    }

    /// Records completion of `serial` and wakes waiters.
    ///
    /// Out-of-order signals never move the counter backwards.
    pub fn signal(&self, serial: u64) {
        let mut completed = self.lock();
        if serial > *completed {
            *completed = serial;
        }
        drop(completed);
        self.cond.notify_all();
    }

    /// Blocks until `serial` is reached or `timeout` elapses.
    ///
    /// Returns `true` if the serial was reached.
    pub fn wait_for(&self, serial: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut completed = self.lock();

        while *completed < serial {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(completed, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            completed = guard;
        }

        true
    }
}

/// One-shot completion callback handed to the backend on submit.
///
/// The backend calls [`complete`](Self::complete) once the GPU has finished the
/// submitted command buffer. It is `Send + 'static` so it can be moved into a
/// driver callback running on any thread.
#[derive(Debug)]
#[must_use = "a dropped handler never signals its slot"]
pub struct CompletionHandler {
    fence: Arc<SlotFence>,
    serial: u64,
}

impl CompletionHandler {
    pub(crate) fn new(fence: Arc<SlotFence>, serial: u64) -> Self {
        Self { fence, serial }
    }

    /// Submission serial this handler will signal.
    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn complete(self) {
        self.fence.signal(self.serial);
    }
}
