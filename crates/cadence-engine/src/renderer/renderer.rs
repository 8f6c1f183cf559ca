use crate::coords::DrawableSize;
use crate::device::{Backend, Device, PixelFormat, RendererError};
use crate::frame::{SlotPool, SlotState, WaitOutcome};

use super::{PassDescriptor, RendererConfig};

type DeviceOf<B> = <B as Backend>::Device;
type SurfaceOf<B> = <DeviceOf<B> as Device>::Surface;

/// Frame renderer: owns the device, pipeline state and in-flight slot pool,
/// and turns each display tick into exactly one submitted frame.
///
/// Lifecycle:
/// - [`new`](Self::new) creates an uninitialized renderer
/// - [`initialize`](Self::initialize) opens the device once
/// - [`resize`](Self::resize) / [`render_frame`](Self::render_frame) run per event
///
/// Any fatal error releases all GPU objects and leaves the renderer unusable;
/// recovery means constructing a new renderer.
pub struct FrameRenderer<B: Backend> {
    backend: B,
    config: RendererConfig,
    drawable_size: Option<DrawableSize>,
    lifecycle: Lifecycle<DeviceOf<B>>,
    frames_submitted: u64,
}

enum Lifecycle<D: Device> {
    Uninitialized,
    Ready(GpuState<D>),
    Unusable,
}

/// Every GPU object of an initialized renderer.
///
/// Field order is drop order: per-size attachments, slots and pipeline are
/// released before the device that created them.
struct GpuState<D: Device> {
    attachments: Option<(DrawableSize, D::Attachments)>,
    slots: SlotPool<D::Slot>,
    pipeline: D::Pipeline,
    pipeline_format: PixelFormat,
    device: D,
    lost: bool,
}

impl<D: Device> Drop for GpuState<D> {
    fn drop(&mut self) {
        // Slot resources may still be referenced by in-flight command buffers.
        if !self.lost {
            self.device.wait_idle();
        }
    }
}

impl<D: Device> GpuState<D> {
    fn open<B>(
        backend: &mut B,
        surface: &D::Surface,
        config: &RendererConfig,
    ) -> Result<(Self, Option<DrawableSize>), RendererError>
    where
        B: Backend<Device = D>,
    {
        let mut device = backend.open_device(surface, config)?;
        let info = device.surface_info(surface);

        let pipeline = device.create_pipeline(info.format, config)?;
        let slots = SlotPool::try_new(config.slot_pool_size, |i| device.create_slot(i))?;

        let state = Self {
            attachments: None,
            slots,
            pipeline,
            pipeline_format: info.format,
            device,
            lost: false,
        };

        Ok((state, info.size))
    }

    /// Waits for a slot, then acquires, encodes and submits one frame.
    ///
    /// Returns the slot index used.
    fn render(
        &mut self,
        config: &RendererConfig,
        size: Option<DrawableSize>,
        surface: &D::Surface,
    ) -> Result<usize, RendererError> {
        let device = &mut self.device;
        let outcome = self
            .slots
            .wait_for_current(config.frame_timeout, |serial, step| device.poll(serial, step))?;

        if outcome == WaitOutcome::TimedOut {
            return Err(RendererError::DeviceLost(format!(
                "frame {} in slot {} did not complete within {:?}",
                self.slots.current_pending(),
                self.slots.cursor(),
                config.frame_timeout,
            )));
        }

        let Some(size) = size else {
            return Err(RendererError::DrawableUnavailable);
        };

        let info = self.device.surface_info(surface);
        let frame = self.device.acquire(surface, size, info.format)?;

        if info.format != self.pipeline_format {
            log::info!(
                "surface format changed {:?} -> {:?}; recompiling pipeline",
                self.pipeline_format,
                info.format
            );
            self.pipeline = self.device.create_pipeline(info.format, config)?;
            self.pipeline_format = info.format;
        }

        let attachments = match self.attachments.take() {
            Some((built_for, a)) if built_for == size => &self.attachments.insert((built_for, a)).1,
            stale => {
                drop(stale);
                log::debug!("building size-dependent attachments for {size}");
                let a = self.device.create_attachments(size, config)?;
                &self.attachments.insert((size, a)).1
            }
        };

        let slot = self.slots.begin_encoding();
        let pass = PassDescriptor::new(
            size,
            config.clear_color,
            config.depth_format.is_some(),
            self.slots.next_serial(),
            slot,
        );

        let encoded = self.device.encode(
            &pass,
            &self.pipeline,
            self.slots.current_resources(),
            attachments,
            &frame,
        );
        let commands = match encoded {
            Ok(c) => c,
            Err(e) => {
                self.slots.rollback();
                return Err(e);
            }
        };

        let on_complete = self.slots.completion_handler();
        if let Err(e) = self.device.submit(commands, frame, on_complete) {
            self.slots.rollback();
            return Err(e);
        }

        self.slots.mark_submitted();
        Ok(slot)
    }
}

impl<B: Backend> FrameRenderer<B> {
    /// Creates an uninitialized renderer.
    pub fn new(backend: B, config: RendererConfig) -> Self {
        Self {
            backend,
            config,
            drawable_size: None,
            lifecycle: Lifecycle::Uninitialized,
            frames_submitted: 0,
        }
    }

    /// Creates and initializes a renderer bound to `surface`.
    pub fn create(
        backend: B,
        surface: &SurfaceOf<B>,
        config: RendererConfig,
    ) -> Result<Self, RendererError> {
        let mut renderer = Self::new(backend, config);
        renderer.initialize(surface)?;
        Ok(renderer)
    }

    /// Opens the device, compiles the pipeline for the surface format and
    /// allocates the slot pool.
    ///
    /// May succeed at most once per instance; later calls fail with
    /// [`RendererError::AlreadyInitialized`]. A failed initialization leaves the
    /// renderer unusable.
    pub fn initialize(&mut self, surface: &SurfaceOf<B>) -> Result<(), RendererError> {
        if !matches!(self.lifecycle, Lifecycle::Uninitialized) {
            return Err(RendererError::AlreadyInitialized);
        }

        match GpuState::open(&mut self.backend, surface, &self.config) {
            Ok((state, surface_size)) => {
                // A resize delivered before initialization wins over the surface's report.
                if self.drawable_size.is_none() {
                    self.drawable_size = surface_size;
                }
                log::info!(
                    "renderer initialized: format={:?} slots={} size={}",
                    state.pipeline_format,
                    state.slots.len(),
                    self.drawable_size
                        .map_or_else(|| "unknown".to_string(), |s| s.to_string()),
                );
                self.lifecycle = Lifecycle::Ready(state);
                Ok(())
            }
            Err(e) => {
                log::error!("renderer initialization failed: {e}");
                self.lifecycle = Lifecycle::Unusable;
                Err(e)
            }
        }
    }

    /// Records a new drawable size for subsequent frames.
    ///
    /// Performs no GPU work and never blocks; size-derived resources are
    /// rebuilt by the next [`render_frame`](Self::render_frame). Zero-area
    /// sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        let Some(size) = DrawableSize::new(width, height) else {
            log::debug!("ignoring zero-area resize to {width}x{height}");
            return;
        };

        if self.drawable_size != Some(size) {
            log::trace!("drawable size -> {size}");
            self.drawable_size = Some(size);
        }
    }

    /// Encodes, submits and schedules presentation of one frame.
    ///
    /// Blocks only while waiting for a free in-flight slot. Returns once the
    /// frame is submitted, not when it is displayed.
    ///
    /// [`RendererError::DrawableUnavailable`] means "skip this tick". Fatal
    /// errors make the renderer unusable.
    pub fn render_frame(&mut self, surface: &SurfaceOf<B>) -> Result<(), RendererError> {
        let state = match &mut self.lifecycle {
            Lifecycle::Ready(state) => state,
            Lifecycle::Uninitialized => return Err(RendererError::NotInitialized),
            Lifecycle::Unusable => return Err(RendererError::Unusable),
        };

        match state.render(&self.config, self.drawable_size, surface) {
            Ok(slot) => {
                self.frames_submitted += 1;
                log::trace!("frame {} submitted from slot {slot}", self.frames_submitted);
                Ok(())
            }
            Err(e) => {
                if e.is_fatal() {
                    state.lost = matches!(e, RendererError::DeviceLost(_));
                    log::error!("renderer unusable: {e}");
                    self.lifecycle = Lifecycle::Unusable;
                }
                Err(e)
            }
        }
    }

    /// Size the next frame will be rendered at.
    #[inline]
    pub fn drawable_size(&self) -> Option<DrawableSize> {
        self.drawable_size
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Ready(_))
    }

    #[inline]
    pub fn is_unusable(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Unusable)
    }

    /// Pixel format the pipeline is currently compiled for.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        match &self.lifecycle {
            Lifecycle::Ready(state) => Some(state.pipeline_format),
            _ => None,
        }
    }

    /// Per-slot states; empty unless initialized.
    pub fn slot_states(&self) -> Vec<SlotState> {
        match &self.lifecycle {
            Lifecycle::Ready(state) => state.slots.states(),
            _ => Vec::new(),
        }
    }

    /// Number of frames successfully submitted.
    #[inline]
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Borrow of the open device, if initialized.
    pub fn device(&self) -> Option<&DeviceOf<B>> {
        match &self.lifecycle {
            Lifecycle::Ready(state) => Some(&state.device),
            _ => None,
        }
    }
}
