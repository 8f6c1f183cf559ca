//! Scriptable in-memory GPU used by renderer tests.
//!
//! Completion is either instant or held until the test releases it, which is
//! how the blocking behavior of the slot wait is observed.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::coords::DrawableSize;
use crate::device::{AcquireError, Backend, Device, PixelFormat, RendererError, SurfaceInfo};
use crate::frame::CompletionHandler;
use crate::renderer::{PassDescriptor, RendererConfig};
use crate::view::PresentationSurface;

pub(crate) struct FakeSurface {
    pub format: PixelFormat,
    pub size: Option<DrawableSize>,
    pub available: bool,
    pub lost: bool,
}

impl FakeSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            format: PixelFormat::Bgra8UnormSrgb,
            size: DrawableSize::new(width, height),
            available: true,
            lost: false,
        }
    }
}

impl PresentationSurface for FakeSurface {
    fn set_backing_size(&mut self, width: u32, height: u32) {
        self.size = DrawableSize::new(width, height);
    }
}

#[derive(Default)]
pub(crate) struct Controls {
    pub hold_completions: bool,
    pub fail_open: bool,
    pub fail_pipeline: bool,
    pub fail_encode_once: bool,
    pub lose_on_poll: bool,

    pub pipelines_built: Vec<PixelFormat>,
    pub slots_built: usize,
    pub attachments_built: Vec<DrawableSize>,
    pub acquired: Vec<(DrawableSize, PixelFormat)>,
    pub encoded: Vec<(PassDescriptor, Instant)>,
    pub released: Vec<(u64, Instant)>,
    pub presented: Vec<u64>,

    held: VecDeque<(usize, CompletionHandler)>,
    in_flight: HashSet<usize>,
    pub overlap_violations: usize,

    pub idle_waits: usize,
    pub device_dropped: bool,
}

impl Controls {
    /// Slot indices in encode order.
    pub fn slot_sequence(&self) -> Vec<usize> {
        self.encoded.iter().map(|(p, _)| p.slot).collect()
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    fn release_front(&mut self) -> Option<CompletionHandler> {
        let (slot, handler) = self.held.pop_front()?;
        self.in_flight.remove(&slot);
        self.released.push((handler.serial(), Instant::now()));
        self.presented.push(handler.serial());
        Some(handler)
    }
}

/// Handle shared between the test and the fake device.
#[derive(Clone, Default)]
pub(crate) struct FakeGpu(Arc<Mutex<Controls>>);

impl FakeGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding() -> Self {
        let gpu = Self::new();
        gpu.controls().hold_completions = true;
        gpu
    }

    pub fn controls(&self) -> MutexGuard<'_, Controls> {
        self.0.lock().unwrap()
    }

    /// Completes the oldest held submission. Returns `false` if none was held.
    pub fn release_next(&self) -> bool {
        // Signal outside the lock; a waiter may be polling the controls.
        let handler = self.controls().release_front();
        match handler {
            Some(h) => {
                h.complete();
                true
            }
            None => false,
        }
    }

    pub fn release_all(&self) {
        while self.release_next() {}
    }

    /// Releases the oldest held submission once at least `count` are held.
    pub fn release_after(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.controls().held_count() >= count {
                return self.release_next();
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }
}

impl Backend for FakeGpu {
    type Device = FakeDevice;

    fn open_device(
        &mut self,
        _surface: &FakeSurface,
        _config: &RendererConfig,
    ) -> Result<FakeDevice, RendererError> {
        if self.controls().fail_open {
            return Err(RendererError::DeviceUnavailable("no fake adapter".into()));
        }
        Ok(FakeDevice { gpu: self.clone() })
    }
}

pub(crate) struct FakeDevice {
    gpu: FakeGpu,
}

pub(crate) struct FakeFrame {
    size: DrawableSize,
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.gpu.controls().device_dropped = true;
    }
}

impl Device for FakeDevice {
    type Surface = FakeSurface;
    type Pipeline = PixelFormat;
    type Slot = usize;
    type Attachments = DrawableSize;
    type Frame = FakeFrame;
    type Commands = PassDescriptor;

    fn surface_info(&mut self, surface: &FakeSurface) -> SurfaceInfo {
        SurfaceInfo {
            format: surface.format,
            size: surface.size,
        }
    }

    fn create_pipeline(
        &mut self,
        format: PixelFormat,
        _config: &RendererConfig,
    ) -> Result<PixelFormat, RendererError> {
        let mut c = self.gpu.controls();
        if c.fail_pipeline {
            return Err(RendererError::PipelineCompilationFailed("fake shader error".into()));
        }
        c.pipelines_built.push(format);
        Ok(format)
    }

    fn create_slot(&mut self, index: usize) -> Result<usize, RendererError> {
        self.gpu.controls().slots_built += 1;
        Ok(index)
    }

    fn create_attachments(
        &mut self,
        size: DrawableSize,
        _config: &RendererConfig,
    ) -> Result<DrawableSize, RendererError> {
        self.gpu.controls().attachments_built.push(size);
        Ok(size)
    }

    fn acquire(
        &mut self,
        surface: &FakeSurface,
        size: DrawableSize,
        format: PixelFormat,
    ) -> Result<FakeFrame, AcquireError> {
        if surface.lost {
            return Err(AcquireError::Lost("fake surface lost".into()));
        }
        if !surface.available {
            return Err(AcquireError::Unavailable);
        }
        self.gpu.controls().acquired.push((size, format));
        Ok(FakeFrame { size })
    }

    fn encode(
        &mut self,
        pass: &PassDescriptor,
        pipeline: &PixelFormat,
        slot: &usize,
        attachments: &DrawableSize,
        frame: &FakeFrame,
    ) -> Result<PassDescriptor, RendererError> {
        assert_eq!(*slot, pass.slot, "encode received another slot's resources");
        assert_eq!(*attachments, pass.size, "stale attachments");
        assert_eq!(frame.size, pass.size, "frame token sized differently from pass");

        let mut c = self.gpu.controls();
        assert_eq!(c.pipelines_built.last(), Some(pipeline));
        if c.fail_encode_once {
            c.fail_encode_once = false;
            return Err(RendererError::EncodingFailed("fake encoder refused".into()));
        }
        c.encoded.push((*pass, Instant::now()));
        Ok(*pass)
    }

    fn submit(
        &mut self,
        commands: PassDescriptor,
        _frame: FakeFrame,
        on_complete: CompletionHandler,
    ) -> Result<(), RendererError> {
        let mut c = self.gpu.controls();
        assert_eq!(commands.serial, on_complete.serial());

        if !c.in_flight.insert(commands.slot) {
            c.overlap_violations += 1;
        }

        if c.hold_completions {
            c.held.push_back((commands.slot, on_complete));
        } else {
            c.in_flight.remove(&commands.slot);
            c.presented.push(on_complete.serial());
            drop(c);
            on_complete.complete();
        }
        Ok(())
    }

    fn poll(&mut self, _serial: u64, _timeout: Duration) -> Result<(), RendererError> {
        if self.gpu.controls().lose_on_poll {
            return Err(RendererError::DeviceLost("fake device removed".into()));
        }
        Ok(())
    }

    fn wait_idle(&mut self) {
        self.gpu.controls().idle_waits += 1;
        self.gpu.release_all();
    }
}
