use crate::coords::{ColorRgba, DrawableSize, ScissorRect, Viewport};

/// Description of the single render pass recorded each frame.
///
/// Built by the renderer from the current drawable size and handed to the
/// backend's `encode`; backends must not size anything from other sources.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassDescriptor {
    pub size: DrawableSize,
    pub viewport: Viewport,
    pub scissor: ScissorRect,
    pub clear_color: ColorRgba,
    /// Depth clear value, if the pass has a depth attachment.
    pub clear_depth: Option<f32>,
    /// Submission serial of this frame.
    pub serial: u64,
    /// Slot the frame is encoded into.
    pub slot: usize,
}

impl PassDescriptor {
    pub(crate) fn new(
        size: DrawableSize,
        clear_color: ColorRgba,
        with_depth: bool,
        serial: u64,
        slot: usize,
    ) -> Self {
        Self {
            size,
            viewport: Viewport::covering(size),
            scissor: ScissorRect::covering(size),
            clear_color,
            clear_depth: with_depth.then_some(1.0),
            serial,
            slot,
        }
    }
}
