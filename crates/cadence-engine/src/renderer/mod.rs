//! Frame renderer.
//!
//! Owns the device, the single-pass pipeline and the in-flight slot pool, and
//! exposes the three entry points the view shell calls: `initialize`,
//! `resize` and `render_frame`.

mod config;
mod pass;
mod renderer;

#[cfg(test)]
pub(crate) mod fake;

pub use config::{RendererConfig, DEFAULT_SLOT_POOL_SIZE};
pub use pass::PassDescriptor;
pub use renderer::FrameRenderer;
