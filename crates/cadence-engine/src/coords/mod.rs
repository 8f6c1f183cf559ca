//! Size and color types shared by the renderer and the view shell.
//!
//! Sizes are physical pixels of the presentation target. Colors are linear.

mod color;
mod size;
mod viewport;

pub use color::ColorRgba;
pub use size::DrawableSize;
pub use viewport::{ScissorRect, Viewport};
