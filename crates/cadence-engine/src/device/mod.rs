//! GPU device layer.
//!
//! This module is responsible for:
//! - the `Backend`/`Device` seam the frame renderer drives
//! - the wgpu implementation of that seam (adapter/device/queue, pipeline,
//!   per-slot resources, surface configuration and presentation)
//! - pixel format selection and the renderer's error type

mod backend;
mod error;
mod format;
mod gpu;
mod init;
mod surface;

pub use backend::{Backend, Device, SurfaceInfo};
pub use error::{AcquireError, RendererError};
pub use format::{DepthFormat, PixelFormat};
pub use gpu::{WgpuAttachments, WgpuBackend, WgpuDevice, WgpuFrame, WgpuPipeline, WgpuSlot};
pub use init::GpuInit;
pub use surface::WindowSurface;
