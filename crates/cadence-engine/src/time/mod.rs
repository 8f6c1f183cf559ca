//! Frame timing.
//!
//! - one `FrameClock` per view: clamped frame deltas and a frame index
//! - one `FrameStats` per view: presented/skipped counters, reported periodically

mod frame_clock;
mod stats;

pub use frame_clock::{FrameClock, FrameTime};
pub use stats::{FrameOutcome, FrameReport, FrameStats};
