use std::sync::Arc;

use anyhow::{Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::coords::DrawableSize;
use crate::view::PresentationSurface;

/// Presentation surface bound to a platform window.
///
/// Owned by the view shell and lent to the renderer per call. The surface
/// holds a reference on the window, so the window outlives it.
pub struct WindowSurface {
    surface: wgpu::Surface<'static>,
    size: Option<DrawableSize>,
}

impl WindowSurface {
    /// Creates a surface for any window exposing raw handles.
    pub fn new<W>(instance: &wgpu::Instance, window: Arc<W>, width: u32, height: u32) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        Ok(Self {
            surface,
            size: DrawableSize::new(width, height),
        })
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::Surface<'static> {
        &self.surface
    }

    /// Backing size last reported by the window system.
    #[inline]
    pub fn size(&self) -> Option<DrawableSize> {
        self.size
    }

    /// Records the window's new backing size. Does not reconfigure anything.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = DrawableSize::new(width, height);
    }
}

impl PresentationSurface for WindowSurface {
    #[inline]
    fn set_backing_size(&mut self, width: u32, height: u32) {
        self.set_size(width, height);
    }
}

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum SurfaceErrorAction {
    /// Surface configuration is stale; reconfigure and skip this frame.
    Reconfigure,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM).
    Fatal,
}

pub(crate) fn classify_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigure,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    if caps.present_modes.contains(&requested) {
        requested
    } else {
        log::warn!("present mode {requested:?} unsupported; using Fifo");
        wgpu::PresentMode::Fifo
    }
}
