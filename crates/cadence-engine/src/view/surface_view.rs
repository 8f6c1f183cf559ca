use std::time::Duration;

use crate::device::RendererError;
use crate::time::{FrameClock, FrameOutcome, FrameStats};

use super::{PlatformView, PresentationSurface, ViewControl, ViewDelegate};

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Toolkit-independent view: owns a surface, forwards events to a delegate.
///
/// Field order is drop order: the delegate (and every GPU object it holds)
/// goes before the surface it renders into.
pub struct SurfaceView<S, D> {
    delegate: D,
    surface: S,
    clock: FrameClock,
    stats: FrameStats,
}

impl<S, D> SurfaceView<S, D>
where
    S: PresentationSurface,
    D: ViewDelegate<S>,
{
    pub fn new(surface: S, delegate: D) -> Self {
        Self {
            delegate,
            surface,
            clock: FrameClock::new(),
            stats: FrameStats::new(STATS_INTERVAL),
        }
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn delegate(&self) -> &D {
        &self.delegate
    }
}

impl<S, D> PlatformView for SurfaceView<S, D>
where
    S: PresentationSurface,
    D: ViewDelegate<S>,
{
    fn on_resize(&mut self, width: u32, height: u32) {
        self.surface.set_backing_size(width, height);
        self.delegate.drawable_resize(width, height);
    }

    fn on_frame_tick(&mut self) -> ViewControl {
        let ft = self.clock.tick();

        let outcome = match self.delegate.render_to_surface(&self.surface) {
            Ok(()) => FrameOutcome::Presented,
            Err(RendererError::DrawableUnavailable) => {
                log::trace!("tick {}: no drawable, skipping", ft.frame_index);
                FrameOutcome::Skipped
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("tick {}: frame dropped: {e}", ft.frame_index);
                FrameOutcome::Failed
            }
            Err(e) => {
                log::error!("stopping view: {e}");
                return ViewControl::Exit;
            }
        };

        if let Some(report) = self.stats.record(outcome, ft.now) {
            log::info!(
                "{:.1} fps ({} presented, {} skipped, {} failed in {:.1?})",
                report.fps(),
                report.presented,
                report.skipped,
                report.failed,
                report.elapsed,
            );
        }

        ViewControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::DrawableSize;
    use crate::renderer::fake::{FakeGpu, FakeSurface};
    use crate::renderer::{FrameRenderer, RendererConfig};

    fn view(gpu: &FakeGpu) -> SurfaceView<FakeSurface, FrameRenderer<FakeGpu>> {
        let surface = FakeSurface::new(320, 240);
        let renderer =
            FrameRenderer::create(gpu.clone(), &surface, RendererConfig::default()).unwrap();
        SurfaceView::new(surface, renderer)
    }

    #[test]
    fn resize_reaches_surface_and_renderer() {
        let gpu = FakeGpu::new();
        let mut v = view(&gpu);

        v.on_resize(1024, 768);

        let size = DrawableSize::new(1024, 768);
        assert_eq!(v.surface().size, size);
        assert_eq!(v.delegate().drawable_size(), size);
    }

    #[test]
    fn tick_renders_one_frame() {
        let gpu = FakeGpu::new();
        let mut v = view(&gpu);

        assert_eq!(v.on_frame_tick(), ViewControl::Continue);
        assert_eq!(v.on_frame_tick(), ViewControl::Continue);
        assert_eq!(v.delegate().frames_submitted(), 2);
        assert_eq!(gpu.controls().presented, vec![1, 2]);
    }

    #[test]
    fn missing_drawable_skips_the_tick() {
        let gpu = FakeGpu::new();
        let mut v = view(&gpu);
        v.surface.available = false;

        assert_eq!(v.on_frame_tick(), ViewControl::Continue);
        assert_eq!(v.delegate().frames_submitted(), 0);
        assert!(v.delegate().is_ready());
    }

    #[test]
    fn encoding_failure_keeps_running() {
        let gpu = FakeGpu::new();
        gpu.controls().fail_encode_once = true;
        let mut v = view(&gpu);

        assert_eq!(v.on_frame_tick(), ViewControl::Continue);
        assert_eq!(v.on_frame_tick(), ViewControl::Continue);
        assert_eq!(v.delegate().frames_submitted(), 1);
    }

    #[test]
    fn fatal_error_exits() {
        let gpu = FakeGpu::new();
        let mut v = view(&gpu);
        v.surface.lost = true;

        assert_eq!(v.on_frame_tick(), ViewControl::Exit);
        assert!(v.delegate().is_unusable());
    }

    #[test]
    fn dropping_view_releases_device() {
        let gpu = FakeGpu::new();
        let v = view(&gpu);
        drop(v);

        let c = gpu.controls();
        assert!(c.device_dropped);
        assert_eq!(c.idle_waits, 1);
    }
}
