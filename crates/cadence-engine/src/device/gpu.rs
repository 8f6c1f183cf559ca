use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::DrawableSize;
use crate::frame::CompletionHandler;
use crate::renderer::{PassDescriptor, RendererConfig};

use super::backend::{Backend, Device, SurfaceInfo};
use super::error::{AcquireError, RendererError};
use super::format::{choose_surface_format, DepthFormat, PixelFormat};
use super::init::GpuInit;
use super::surface::{self, SurfaceErrorAction, WindowSurface};

/// Submissions remembered for targeted polling.
const TRACKED_SUBMISSIONS: usize = 8;

/// Bound on the teardown wait in `wait_idle`.
const IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// wgpu backend: owns the instance and opens devices for window surfaces.
pub struct WgpuBackend {
    instance: wgpu::Instance,
    init: GpuInit,
}

impl WgpuBackend {
    pub fn new(init: GpuInit) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });
        Self { instance, init }
    }

    /// Instance window surfaces must be created from.
    #[inline]
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }
}

impl Backend for WgpuBackend {
    type Device = WgpuDevice;

    fn open_device(
        &mut self,
        surface: &WindowSurface,
        config: &RendererConfig,
    ) -> Result<WgpuDevice, RendererError> {
        pollster::block_on(WgpuDevice::open(&self.instance, surface, &self.init, config))
    }
}

/// Compiled pipeline state for the frame pass.
pub struct WgpuPipeline {
    pipeline: wgpu::RenderPipeline,
}

/// Per-slot uniform buffer and its bind group.
pub struct WgpuSlot {
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Size-derived attachments.
pub struct WgpuAttachments {
    depth: Option<(wgpu::TextureView, DepthFormat)>,
}

/// Acquired surface texture plus its view.
pub struct WgpuFrame {
    view: wgpu::TextureView,
    texture: wgpu::SurfaceTexture,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FrameUniforms {
    viewport: [f32; 2],
    time: f32,
    /// Low 32 bits of the submission serial; wraps.
    frame: u32,
}

impl FrameUniforms {
    fn new(pass: &PassDescriptor, time: f32) -> Self {
        Self {
            viewport: [pass.viewport.width, pass.viewport.height],
            time,
            frame: (pass.serial & u64::from(u32::MAX)) as u32,
        }
    }
}

/// Stencil load/store for the depth attachment; `None` for depth-only formats.
fn stencil_ops(format: DepthFormat) -> Option<wgpu::Operations<u32>> {
    format.has_stencil().then_some(wgpu::Operations {
        load: wgpu::LoadOp::Clear(0),
        store: wgpu::StoreOp::Store,
    })
}

/// Turns the error captured by a validation scope into a renderer error.
fn check_scope(
    captured: Option<wgpu::Error>,
    wrap: impl FnOnce(String) -> RendererError,
) -> Result<(), RendererError> {
    match captured {
        Some(err) => Err(wrap(err.to_string())),
        None => Ok(()),
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Vertex {
    pos: [f32; 2],
    color: [f32; 3],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x3  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const TRIANGLE: [Vertex; 3] = [
    Vertex { pos: [0.5, -0.5], color: [1.0, 0.0, 0.0] },
    Vertex { pos: [-0.5, -0.5], color: [0.0, 1.0, 0.0] },
    Vertex { pos: [0.0, 0.5], color: [0.0, 0.0, 1.0] },
];

/// Open wgpu device + queue, plus the surface configuration it manages.
///
/// Field order is drop order: buffers and layouts go before the device.
pub struct WgpuDevice {
    vertex_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,

    /// Active surface configuration; `None` forces a reconfigure on next acquire.
    surface_config: Option<wgpu::SurfaceConfiguration>,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
    desired_maximum_frame_latency: u32,

    preferred_format: Option<PixelFormat>,
    prefer_srgb: bool,
    format: PixelFormat,
    /// Re-query surface capabilities before the next frame.
    refresh_format: bool,

    submissions: VecDeque<(u64, wgpu::SubmissionIndex)>,
    lost: Arc<Mutex<Option<String>>>,
    started: Instant,

    queue: wgpu::Queue,
    device: wgpu::Device,
    adapter: wgpu::Adapter,
}

impl WgpuDevice {
    async fn open(
        instance: &wgpu::Instance,
        surface: &WindowSurface,
        init: &GpuInit,
        config: &RendererConfig,
    ) -> Result<Self, RendererError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(surface.raw()),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RendererError::DeviceUnavailable(format!("no compatible adapter: {e}")))?;

        let info = adapter.get_info();
        log::info!("selected adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("cadence device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RendererError::DeviceUnavailable(format!("device request failed: {e}")))?;

        let lost = Arc::new(Mutex::new(None));
        {
            let lost = lost.clone();
            device.set_device_lost_callback(move |reason, message| {
                log::error!("wgpu device lost ({reason:?}): {message}");
                *lost.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(format!("{reason:?}: {message}"));
            });
        }

        let caps = surface.raw().get_capabilities(&adapter);
        let format = choose_surface_format(&caps.formats, config.pixel_format, init.prefer_srgb)
            .ok_or_else(|| {
                RendererError::DeviceUnavailable("adapter cannot present to this surface".into())
            })?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cadence frame bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cadence triangle vbo"),
            contents: bytemuck::cast_slice(&TRIANGLE),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            vertex_buffer,
            bind_group_layout,
            surface_config: None,
            present_mode: surface::choose_present_mode(&caps, init.present_mode),
            alpha_mode: surface::choose_alpha_mode(&caps, init.alpha_mode),
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
            preferred_format: config.pixel_format,
            prefer_srgb: init.prefer_srgb,
            format,
            refresh_format: false,
            submissions: VecDeque::with_capacity(TRACKED_SUBMISSIONS),
            lost,
            started: Instant::now(),
            queue,
            device,
            adapter,
        })
    }

    fn lost_reason(&self) -> Option<String> {
        self.lost.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Reconfigures the surface if size or format differ from the active config.
    fn ensure_configured(&mut self, surface: &WindowSurface, size: DrawableSize, format: PixelFormat) {
        let current = self.surface_config.as_ref().is_some_and(|c| {
            c.width == size.width() && c.height == size.height() && c.format == format.to_wgpu()
        });
        if current {
            return;
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: format.to_wgpu(),
            width: size.width(),
            height: size.height(),
            present_mode: self.present_mode,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: self.desired_maximum_frame_latency,
        };

        log::debug!("configuring surface {size} {format:?}");
        surface.raw().configure(&self.device, &config);
        self.surface_config = Some(config);
    }

    /// Compiles the frame shader; returns the module and any error messages.
    fn compile_shader(&self) -> (wgpu::ShaderModule, Vec<String>) {
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("cadence frame shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/frame.wgsl").into()),
        });

        let info = pollster::block_on(shader.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
            .map(|m| m.message.clone())
            .collect();

        (shader, errors)
    }
}

impl Device for WgpuDevice {
    type Surface = WindowSurface;
    type Pipeline = WgpuPipeline;
    type Slot = WgpuSlot;
    type Attachments = WgpuAttachments;
    type Frame = WgpuFrame;
    type Commands = wgpu::CommandBuffer;

    fn surface_info(&mut self, surface: &Self::Surface) -> SurfaceInfo {
        if self.refresh_format {
            self.refresh_format = false;
            let caps = surface.raw().get_capabilities(&self.adapter);
            match choose_surface_format(&caps.formats, self.preferred_format, self.prefer_srgb) {
                Some(f) => self.format = f,
                None => log::warn!("surface reports no presentable format; keeping {:?}", self.format),
            }
        }

        SurfaceInfo {
            format: self.format,
            size: surface.size(),
        }
    }

    fn create_pipeline(
        &mut self,
        format: PixelFormat,
        config: &RendererConfig,
    ) -> Result<WgpuPipeline, RendererError> {
        // Invalid shaders and pipeline descriptors are reported here instead
        // of reaching the device's uncaptured-error handler.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let (shader, compile_errors) = self.compile_shader();

        let layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("cadence frame pipeline layout"),
            bind_group_layouts: &[&self.bind_group_layout],
            immediate_size: 0,
        });

        let depth_stencil = config.depth_format.map(|d| wgpu::DepthStencilState {
            format: d.to_wgpu(),
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("cadence frame pipeline"),
            layout: Some(&layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: format.to_wgpu(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let captured = pollster::block_on(scope.pop());
        if !compile_errors.is_empty() {
            return Err(RendererError::PipelineCompilationFailed(compile_errors.join("; ")));
        }
        check_scope(captured, RendererError::PipelineCompilationFailed)?;

        Ok(WgpuPipeline { pipeline })
    }

    fn create_slot(&mut self, index: usize) -> Result<WgpuSlot, RendererError> {
        let uniforms = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("cadence slot {index} uniforms")),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("cadence slot {index} bind group")),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            }],
        });

        Ok(WgpuSlot { uniforms, bind_group })
    }

    fn create_attachments(
        &mut self,
        size: DrawableSize,
        config: &RendererConfig,
    ) -> Result<WgpuAttachments, RendererError> {
        let depth = config.depth_format.map(|format| {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("cadence depth"),
                size: wgpu::Extent3d {
                    width: size.width(),
                    height: size.height(),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: format.to_wgpu(),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            (texture.create_view(&wgpu::TextureViewDescriptor::default()), format)
        });

        Ok(WgpuAttachments { depth })
    }

    fn acquire(
        &mut self,
        surface: &Self::Surface,
        size: DrawableSize,
        format: PixelFormat,
    ) -> Result<WgpuFrame, AcquireError> {
        if let Some(reason) = self.lost_reason() {
            return Err(AcquireError::Lost(reason));
        }

        self.ensure_configured(surface, size, format);

        match surface.raw().get_current_texture() {
            Ok(texture) => {
                if texture.suboptimal {
                    // Presentable, but the next frame should pick up new capabilities.
                    self.refresh_format = true;
                    self.surface_config = None;
                }
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(WgpuFrame { view, texture })
            }
            Err(err) => match surface::classify_surface_error(&err) {
                SurfaceErrorAction::Reconfigure => {
                    log::debug!("surface {err}; reconfiguring next frame");
                    self.surface_config = None;
                    self.refresh_format = true;
                    Err(AcquireError::Unavailable)
                }
                SurfaceErrorAction::SkipFrame => {
                    log::debug!("surface {err}; skipping frame");
                    Err(AcquireError::Unavailable)
                }
                SurfaceErrorAction::Fatal => Err(AcquireError::Lost(err.to_string())),
            },
        }
    }

    fn encode(
        &mut self,
        pass: &PassDescriptor,
        pipeline: &WgpuPipeline,
        slot: &WgpuSlot,
        attachments: &WgpuAttachments,
        frame: &WgpuFrame,
    ) -> Result<wgpu::CommandBuffer, RendererError> {
        let target = &frame.texture.texture;
        if target.width() != pass.size.width() || target.height() != pass.size.height() {
            return Err(RendererError::EncodingFailed(format!(
                "drawable is {}x{} but pass expects {}",
                target.width(),
                target.height(),
                pass.size
            )));
        }

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniforms = FrameUniforms::new(pass, self.started.elapsed().as_secs_f32());
        self.queue.write_buffer(&slot.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("cadence frame encoder"),
        });

        let depth_stencil_attachment = match (&attachments.depth, pass.clear_depth) {
            (Some((view, format)), Some(clear)) => Some(wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: stencil_ops(*format),
            }),
            _ => None,
        };

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cadence frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pass.clear_color.into()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let vp = pass.viewport;
            rpass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);
            let sc = pass.scissor;
            rpass.set_scissor_rect(sc.x, sc.y, sc.width, sc.height);

            rpass.set_pipeline(&pipeline.pipeline);
            rpass.set_bind_group(0, &slot.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            rpass.draw(0..TRIANGLE.len() as u32, 0..1);
        }

        let commands = encoder.finish();
        check_scope(pollster::block_on(scope.pop()), RendererError::EncodingFailed)?;
        Ok(commands)
    }

    fn submit(
        &mut self,
        commands: wgpu::CommandBuffer,
        frame: WgpuFrame,
        on_complete: CompletionHandler,
    ) -> Result<(), RendererError> {
        let serial = on_complete.serial();

        let index = self.queue.submit(std::iter::once(commands));
        self.queue.on_submitted_work_done(move || on_complete.complete());

        if self.submissions.len() == TRACKED_SUBMISSIONS {
            self.submissions.pop_front();
        }
        self.submissions.push_back((serial, index));

        // Queued behind the submission above; displayed once it has executed.
        drop(frame.view);
        frame.texture.present();
        Ok(())
    }

    fn poll(&mut self, serial: u64, timeout: Duration) -> Result<(), RendererError> {
        if let Some(reason) = self.lost_reason() {
            return Err(RendererError::DeviceLost(reason));
        }

        let submission_index = self
            .submissions
            .iter()
            .find(|(s, _)| *s == serial)
            .map(|(_, index)| index.clone());

        let poll_type = match submission_index {
            Some(index) => wgpu::PollType::Wait {
                submission_index: Some(index),
                timeout: Some(timeout),
            },
            None => wgpu::PollType::Poll,
        };

        match self.device.poll(poll_type) {
            Ok(_) | Err(wgpu::PollError::Timeout) => Ok(()),
            Err(e) => Err(RendererError::DeviceLost(e.to_string())),
        }
    }

    fn wait_idle(&mut self) {
        let result = self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(IDLE_TIMEOUT),
        });
        if let Err(e) = result {
            log::warn!("device did not go idle before teardown: {e}");
        }
    }
}
