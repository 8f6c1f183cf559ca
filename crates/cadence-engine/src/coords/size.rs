use std::num::NonZeroU32;

/// Pixel dimensions of the presentation target.
///
/// Both dimensions are non-zero by construction; GPU APIs fault on zero-sized
/// render targets, so a zero-area size is unrepresentable here.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DrawableSize {
    width: NonZeroU32,
    height: NonZeroU32,
}

impl DrawableSize {
    /// Returns `None` if either dimension is zero.
    #[inline]
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
        })
    }

    #[inline]
    pub fn width(self) -> u32 {
        self.width.get()
    }

    #[inline]
    pub fn height(self) -> u32 {
        self.height.get()
    }
}

impl std::fmt::Display for DrawableSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}
