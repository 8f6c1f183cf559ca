//! In-flight frame slots and their GPU completion fences.
//!
//! The pool caps how far the CPU may run ahead of the GPU: slot `i` is handed
//! out again only once the fence of its previous occupant has been signaled.

mod fence;
mod slot;

pub use fence::{CompletionHandler, SlotFence};
pub use slot::SlotState;

pub(crate) use slot::{SlotPool, WaitOutcome};
