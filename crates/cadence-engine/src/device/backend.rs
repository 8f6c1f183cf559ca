use std::time::Duration;

use crate::coords::DrawableSize;
use crate::frame::CompletionHandler;
use crate::renderer::{PassDescriptor, RendererConfig};

use super::{AcquireError, PixelFormat, RendererError};

/// What the renderer needs to know about a surface it is about to draw into.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceInfo {
    pub format: PixelFormat,
    /// Current backing size, if the surface has a non-zero area.
    pub size: Option<DrawableSize>,
}

/// Entry point of a graphics backend: turns a surface into an open device.
pub trait Backend {
    type Device: Device;

    /// Selects an adapter compatible with `surface` and opens a device + queue.
    ///
    /// Fails with [`RendererError::DeviceUnavailable`].
    fn open_device(
        &mut self,
        surface: &<Self::Device as Device>::Surface,
        config: &RendererConfig,
    ) -> Result<Self::Device, RendererError>;
}

/// An open logical device and its command queue.
///
/// The frame renderer drives a device through these operations only; it never
/// touches API objects directly. Every object created here is owned by the
/// renderer and dropped before the device itself.
pub trait Device {
    /// Presentation surface, borrowed from the view shell per call.
    type Surface: ?Sized;
    /// Compiled pipeline state for the single render pass.
    type Pipeline;
    /// Per-slot frame resources (uniform buffer, bind group, ...).
    type Slot;
    /// Size-derived attachments (depth buffer, ...).
    type Attachments;
    /// Frame token: the acquired presentable image.
    type Frame;
    /// Encoded, not yet submitted, commands.
    type Commands;

    /// Current format and size of `surface`.
    fn surface_info(&mut self, surface: &Self::Surface) -> SurfaceInfo;

    /// Fails with [`RendererError::PipelineCompilationFailed`].
    fn create_pipeline(
        &mut self,
        format: PixelFormat,
        config: &RendererConfig,
    ) -> Result<Self::Pipeline, RendererError>;

    fn create_slot(&mut self, index: usize) -> Result<Self::Slot, RendererError>;

    fn create_attachments(
        &mut self,
        size: DrawableSize,
        config: &RendererConfig,
    ) -> Result<Self::Attachments, RendererError>;

    /// Acquires the next presentable image, sized to `size` in `format`.
    ///
    /// Backends reconfigure the surface here when size or format changed.
    fn acquire(
        &mut self,
        surface: &Self::Surface,
        size: DrawableSize,
        format: PixelFormat,
    ) -> Result<Self::Frame, AcquireError>;

    /// Records the render pass for one frame.
    ///
    /// Fails with [`RendererError::EncodingFailed`].
    fn encode(
        &mut self,
        pass: &PassDescriptor,
        pipeline: &Self::Pipeline,
        slot: &Self::Slot,
        attachments: &Self::Attachments,
        frame: &Self::Frame,
    ) -> Result<Self::Commands, RendererError>;

    /// Submits `commands` and schedules presentation of `frame` after they
    /// finish executing. `on_complete` must be invoked once the GPU is done.
    fn submit(
        &mut self,
        commands: Self::Commands,
        frame: Self::Frame,
        on_complete: CompletionHandler,
    ) -> Result<(), RendererError>;

    /// Drives completion callbacks, blocking at most `timeout` for the
    /// submission carrying `serial`.
    ///
    /// Fails with [`RendererError::DeviceLost`].
    fn poll(&mut self, serial: u64, timeout: Duration) -> Result<(), RendererError>;

    /// Blocks until all submitted work has finished. Best effort.
    fn wait_idle(&mut self);
}
