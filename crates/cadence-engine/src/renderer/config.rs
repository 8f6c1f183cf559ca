use std::num::NonZeroUsize;
use std::time::Duration;

use crate::coords::ColorRgba;
use crate::device::{DepthFormat, PixelFormat};

/// Default number of in-flight frame slots (double buffering).
pub const DEFAULT_SLOT_POOL_SIZE: NonZeroUsize = NonZeroUsize::new(2).unwrap();

/// Construction-time renderer configuration.
///
/// Values are fixed for the lifetime of a renderer; the slot pool in particular
/// is never resized after `initialize`.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Number of in-flight frame slots (2 = double, 3 = triple buffering).
    pub slot_pool_size: NonZeroUsize,

    /// Preferred surface pixel format.
    ///
    /// If unsupported by the surface, the backend picks a supported one and the
    /// pipeline is compiled for that instead.
    pub pixel_format: Option<PixelFormat>,

    /// Background the render pass clears to.
    pub clear_color: ColorRgba,

    /// Depth attachment format; `None` renders without depth.
    pub depth_format: Option<DepthFormat>,

    /// Upper bound on the wait for a free slot.
    ///
    /// A GPU that fails to finish a frame within this budget is treated as lost.
    pub frame_timeout: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            slot_pool_size: DEFAULT_SLOT_POOL_SIZE,
            pixel_format: None,
            clear_color: ColorRgba::new(0.0, 0.5, 1.0, 1.0),
            depth_format: None,
            frame_timeout: Duration::from_secs(2),
        }
    }
}

impl RendererConfig {
    pub fn with_slot_pool_size(mut self, size: NonZeroUsize) -> Self {
        self.slot_pool_size = size;
        self
    }

    pub fn with_clear_color(mut self, color: ColorRgba) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_depth(mut self, format: DepthFormat) -> Self {
        self.depth_format = Some(format);
        self
    }
}
