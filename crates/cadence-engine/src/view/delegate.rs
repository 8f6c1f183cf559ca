use crate::device::{Backend, Device, RendererError};
use crate::renderer::FrameRenderer;

/// Control directive returned by view callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViewControl {
    Continue,
    Exit,
}

/// Receiver of a view's resize and draw requests.
///
/// `S` is the presentation surface the view owns and lends out per call.
pub trait ViewDelegate<S: ?Sized> {
    /// The drawable backing the view changed size, in physical pixels.
    fn drawable_resize(&mut self, width: u32, height: u32);

    /// Draw one frame into `surface`.
    fn render_to_surface(&mut self, surface: &S) -> Result<(), RendererError>;
}

impl<B: Backend> ViewDelegate<<B::Device as Device>::Surface> for FrameRenderer<B> {
    #[inline]
    fn drawable_resize(&mut self, width: u32, height: u32) {
        self.resize(width, height);
    }

    #[inline]
    fn render_to_surface(
        &mut self,
        surface: &<B::Device as Device>::Surface,
    ) -> Result<(), RendererError> {
        self.render_frame(surface)
    }
}

/// Surface whose backing size the view shell keeps current.
pub trait PresentationSurface {
    fn set_backing_size(&mut self, width: u32, height: u32);
}

/// Platform-facing half of a view: what the toolkit's event loop calls.
pub trait PlatformView {
    /// Backing size changed (window resize, scale factor change).
    fn on_resize(&mut self, width: u32, height: u32);

    /// Display refresh tick.
    fn on_frame_tick(&mut self) -> ViewControl;
}
