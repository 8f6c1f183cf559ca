use super::DrawableSize;

/// Rasterization viewport in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering the whole drawable with the full depth range.
    #[inline]
    pub fn covering(size: DrawableSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width() as f32,
            height: size.height() as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    #[inline]
    pub fn covering(size: DrawableSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width(),
            height: size.height(),
        }
    }
}
