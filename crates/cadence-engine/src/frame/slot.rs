use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::fence::{CompletionHandler, SlotFence};

/// Longest single blocking step while waiting on a slot.
///
/// Between steps the backend gets a chance to drive its completion callbacks.
const WAIT_SLICE: Duration = Duration::from_millis(4);

/// Observable state of one in-flight frame slot.
///
/// `Idle → Encoding → Submitted → Signaled → Idle`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotState {
    /// Free for the next frame.
    Idle,
    /// Commands for a new frame are being recorded into this slot.
    Encoding,
    /// Submitted; the GPU may still be reading the slot's resources.
    Submitted,
    /// The GPU finished the previous occupant; reusable once selected.
    Signaled,
}

/// Outcome of waiting for the current slot to drain.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum WaitOutcome {
    Ready,
    TimedOut,
}

struct FrameSlot<R> {
    resources: R,
    state: SlotState,
    fence: Arc<SlotFence>,
    /// Serial of the last frame submitted from this slot; 0 before first use.
    pending: u64,
}

impl<R> FrameSlot<R> {
    fn observed_state(&self) -> SlotState {
        match self.state {
            SlotState::Submitted if self.fence.is_reached(self.pending) => SlotState::Signaled,
            s => s,
        }
    }
}

/// Fixed-size pool of in-flight frame slots, selected round-robin.
///
/// Only the calling thread mutates the pool. GPU completion reaches it solely
/// through each slot's [`SlotFence`].
pub(crate) struct SlotPool<R> {
    slots: Vec<FrameSlot<R>>,
    cursor: usize,
    next_serial: u64,
}

impl<R> SlotPool<R> {
    /// Allocates `size` slots, building per-slot resources with `make`.
    pub(crate) fn try_new<E>(
        size: NonZeroUsize,
        mut make: impl FnMut(usize) -> Result<R, E>,
    ) -> Result<Self, E> {
        let slots = (0..size.get())
            .map(|i| {
                Ok(FrameSlot {
                    resources: make(i)?,
                    state: SlotState::Idle,
                    fence: Arc::new(SlotFence::new()),
                    pending: 0,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;

        Ok(Self {
            slots,
            cursor: 0,
            next_serial: 1,
        })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Index of the slot the next frame will use.
    #[inline]
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Serial the next submission will carry.
    #[inline]
    pub(crate) fn next_serial(&self) -> u64 {
        self.next_serial
    }

    /// Serial of the current slot's previous occupant.
    #[inline]
    pub(crate) fn current_pending(&self) -> u64 {
        self.slots[self.cursor].pending
    }

    pub(crate) fn states(&self) -> Vec<SlotState> {
        self.slots.iter().map(FrameSlot::observed_state).collect()
    }

    #[inline]
    pub(crate) fn current_resources(&self) -> &R {
        &self.slots[self.cursor].resources
    }

    /// Blocks until the current slot's previous occupant has completed, or
    /// `timeout` elapses.
    ///
    /// `drive` is called between wait steps with the serial being waited on and
    /// the remaining step budget; backends whose completion callbacks only fire
    /// while polled use it to make progress.
    pub(crate) fn wait_for_current<E>(
        &mut self,
        timeout: Duration,
        mut drive: impl FnMut(u64, Duration) -> Result<(), E>,
    ) -> Result<WaitOutcome, E> {
        let deadline = Instant::now() + timeout;
        let slot = &mut self.slots[self.cursor];

        loop {
            if slot.fence.is_reached(slot.pending) {
                if slot.state == SlotState::Submitted {
                    slot.state = SlotState::Idle;
                }
                return Ok(WaitOutcome::Ready);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(WaitOutcome::TimedOut);
            }

            let step = remaining.min(WAIT_SLICE);
            drive(slot.pending, step)?;
            slot.fence.wait_for(slot.pending, step);
        }
    }

    /// `Idle → Encoding` for the current slot.
    pub(crate) fn begin_encoding(&mut self) -> usize {
        let slot = &mut self.slots[self.cursor];
        debug_assert_eq!(slot.state, SlotState::Idle, "slot {} reused while busy", self.cursor);
        slot.state = SlotState::Encoding;
        self.cursor
    }

    /// `Encoding → Idle` after an aborted frame. The cursor stays put.
    pub(crate) fn rollback(&mut self) {
        let slot = &mut self.slots[self.cursor];
        if slot.state == SlotState::Encoding {
            slot.state = SlotState::Idle;
        }
    }

    /// Completion handler for the frame being encoded in the current slot.
    pub(crate) fn completion_handler(&self) -> CompletionHandler {
        CompletionHandler::new(self.slots[self.cursor].fence.clone(), self.next_serial)
    }

    /// `Encoding → Submitted`, then advances the cursor and the serial.
    pub(crate) fn mark_submitted(&mut self) {
        let slot = &mut self.slots[self.cursor];
        debug_assert_eq!(slot.state, SlotState::Encoding);
        slot.state = SlotState::Submitted;
        slot.pending = self.next_serial;

        self.next_serial += 1;
        self.cursor = (self.cursor + 1) % self.slots.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn pool(n: usize) -> SlotPool<usize> {
        SlotPool::try_new(NonZeroUsize::new(n).unwrap(), |i| Ok::<_, Infallible>(i)).unwrap()
    }

    fn no_drive(_: u64, _: Duration) -> Result<(), Infallible> {
        Ok(())
    }

    fn submit(p: &mut SlotPool<usize>) -> CompletionHandler {
        p.begin_encoding();
        let h = p.completion_handler();
        p.mark_submitted();
        h
    }

    #[test]
    fn resources_are_built_per_index() {
        let p = pool(3);
        assert_eq!(p.len(), 3);
        assert_eq!(*p.current_resources(), 0);
    }

    #[test]
    fn resource_failure_aborts_construction() {
        let r = SlotPool::try_new(NonZeroUsize::new(3).unwrap(), |i| {
            if i == 1 { Err("boom") } else { Ok(i) }
        });
        assert!(r.is_err());
    }

    #[test]
    fn fresh_slots_are_ready_immediately() {
        let mut p = pool(2);
        let out = p.wait_for_current(Duration::ZERO, no_drive).unwrap();
        assert_eq!(out, WaitOutcome::Ready);
    }

    #[test]
    fn submission_advances_cursor_and_serial() {
        let mut p = pool(2);
        let h = submit(&mut p);
        assert_eq!(h.serial(), 1);
        assert_eq!(p.cursor(), 1);
        assert_eq!(p.next_serial(), 2);
        assert_eq!(p.states(), vec![SlotState::Submitted, SlotState::Idle]);
    }

    #[test]
    fn signaled_state_is_observed_after_completion() {
        let mut p = pool(2);
        submit(&mut p).complete();
        assert_eq!(p.states()[0], SlotState::Signaled);
    }

    #[test]
    fn rollback_returns_slot_to_idle_without_advancing() {
        let mut p = pool(2);
        p.begin_encoding();
        p.rollback();
        assert_eq!(p.cursor(), 0);
        assert_eq!(p.states(), vec![SlotState::Idle, SlotState::Idle]);
    }

    #[test]
    fn busy_slot_times_out() {
        let mut p = pool(1);
        let _held = submit(&mut p);
        let out = p.wait_for_current(Duration::from_millis(10), no_drive).unwrap();
        assert_eq!(out, WaitOutcome::TimedOut);
        assert_eq!(p.states(), vec![SlotState::Submitted]);
    }

    #[test]
    fn drive_callback_can_complete_the_wait() {
        let mut p = pool(1);
        let held = std::cell::RefCell::new(Some(submit(&mut p)));

        let out = p
            .wait_for_current(Duration::from_secs(5), |serial, _| {
                assert_eq!(serial, 1);
                if let Some(h) = held.borrow_mut().take() {
                    h.complete();
                }
                Ok::<_, Infallible>(())
            })
            .unwrap();

        assert_eq!(out, WaitOutcome::Ready);
        assert_eq!(p.states(), vec![SlotState::Idle]);
    }

    #[test]
    fn drive_errors_propagate() {
        let mut p = pool(1);
        let _held = submit(&mut p);
        let r = p.wait_for_current(Duration::from_secs(5), |_, _| Err("lost"));
        assert_eq!(r, Err("lost"));
    }
}
