use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::{GpuInit, WgpuBackend, WindowSurface};
use crate::renderer::{FrameRenderer, RendererConfig};
use crate::view::{PlatformView, SurfaceView, ViewControl};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "cadence".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and renders into it until it is closed or the
    /// renderer hits a fatal error.
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, renderer: RendererConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = RuntimeState::new(config, gpu_init, renderer);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

type WindowView = SurfaceView<WindowSurface, FrameRenderer<WgpuBackend>>;

/// Field order is drop order: the view (renderer, then surface) goes before
/// the window it presents to.
struct WindowEntry {
    view: WindowView,
    window: Arc<Window>,
}

impl WindowEntry {
    fn open(
        event_loop: &ActiveEventLoop,
        config: &RuntimeConfig,
        gpu_init: GpuInit,
        renderer: RendererConfig,
    ) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        let PhysicalSize { width, height } = window.inner_size();

        let backend = WgpuBackend::new(gpu_init);
        let surface = WindowSurface::new(backend.instance(), window.clone(), width, height)?;
        let renderer = FrameRenderer::create(backend, &surface, renderer)
            .context("failed to initialize frame renderer")?;

        Ok(Self {
            view: SurfaceView::new(surface, renderer),
            window,
        })
    }

    fn resize_to(&mut self, size: PhysicalSize<u32>) {
        self.view.on_resize(size.width, size.height);
        self.window.request_redraw();
    }
}

struct RuntimeState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    renderer: RendererConfig,

    entry: Option<WindowEntry>,
    failure: Option<anyhow::Error>,
}

impl RuntimeState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, renderer: RendererConfig) -> Self {
        Self {
            config,
            gpu_init,
            renderer,
            entry: None,
            failure: None,
        }
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop, failure: Option<anyhow::Error>) {
        self.entry = None;
        if self.failure.is_none() {
            self.failure = failure;
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for RuntimeState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        match WindowEntry::open(
            event_loop,
            &self.config,
            self.gpu_init.clone(),
            self.renderer.clone(),
        ) {
            Ok(entry) => {
                entry.window.request_redraw();
                self.entry = Some(entry);
            }
            Err(e) => {
                log::error!("failed to open window: {e:#}");
                self.shut_down(event_loop, Some(e));
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: one tick per display refresh, paced by the
        // present mode and the slot wait.
        if let Some(entry) = &self.entry {
            entry.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(entry) = self.entry.as_mut().filter(|e| e.window.id() == window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => self.shut_down(event_loop, None),

            WindowEvent::Resized(size) => entry.resize_to(size),

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = entry.window.inner_size();
                entry.resize_to(size);
            }

            WindowEvent::RedrawRequested => {
                entry.window.pre_present_notify();
                if entry.view.on_frame_tick() == ViewControl::Exit {
                    let failure = anyhow!(
                        "rendering stopped after {} frames",
                        entry.view.delegate().frames_submitted()
                    );
                    self.shut_down(event_loop, Some(failure));
                }
            }

            _ => {}
        }
    }
}
