//! View contracts.
//!
//! Decouples the frame renderer from any windowing toolkit. A toolkit shell
//! owns the presentation surface and forwards exactly two events:
//! drawable resizes and display ticks.

mod delegate;
mod surface_view;

pub use delegate::{PlatformView, PresentationSurface, ViewControl, ViewDelegate};
pub use surface_view::SurfaceView;
