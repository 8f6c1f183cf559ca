//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to a frame renderer
//! through a [`SurfaceView`](crate::view::SurfaceView).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
