//! Pixel formats understood by the renderer, and surface format selection.

/// Color format of the presentation target and the pipeline's color attachment.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rgb10a2Unorm,
}

impl PixelFormat {
    /// Returns `true` if writes to this format are sRGB-encoded by the GPU.
    #[inline]
    pub fn is_srgb(self) -> bool {
        matches!(self, PixelFormat::Bgra8UnormSrgb | PixelFormat::Rgba8UnormSrgb)
    }

    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            PixelFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            PixelFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            PixelFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            PixelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            PixelFormat::Rgb10a2Unorm => wgpu::TextureFormat::Rgb10a2Unorm,
        }
    }

    /// Maps a wgpu format; `None` for formats the renderer cannot present to.
    pub fn from_wgpu(format: wgpu::TextureFormat) -> Option<Self> {
        Some(match format {
            wgpu::TextureFormat::Bgra8Unorm => PixelFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb => PixelFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8Unorm => PixelFormat::Rgba8Unorm,
            wgpu::TextureFormat::Rgba8UnormSrgb => PixelFormat::Rgba8UnormSrgb,
            wgpu::TextureFormat::Rgba16Float => PixelFormat::Rgba16Float,
            wgpu::TextureFormat::Rgb10a2Unorm => PixelFormat::Rgb10a2Unorm,
            _ => return None,
        })
    }
}

/// Depth attachment format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DepthFormat {
    Depth32Float,
    Depth24Plus,
    Depth24PlusStencil8,
}

impl DepthFormat {
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            DepthFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
            DepthFormat::Depth24Plus => wgpu::TextureFormat::Depth24Plus,
            DepthFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
        }
    }

    /// Returns `true` if the format carries a stencil aspect that must be
    /// loaded/stored alongside depth.
    #[inline]
    pub fn has_stencil(self) -> bool {
        matches!(self, DepthFormat::Depth24PlusStencil8)
    }
}

/// Picks the surface format.
///
/// Order of preference:
/// 1. `preferred`, if the surface supports it
/// 2. the first supported sRGB format, if `prefer_srgb`
/// 3. the first supported format the renderer understands
pub(crate) fn choose_surface_format(
    supported: &[wgpu::TextureFormat],
    preferred: Option<PixelFormat>,
    prefer_srgb: bool,
) -> Option<PixelFormat> {
    if let Some(p) = preferred {
        if supported.contains(&p.to_wgpu()) {
            return Some(p);
        }
        log::warn!("preferred pixel format {p:?} not supported by surface; falling back");
    }

    let mut known = supported.iter().copied().filter_map(PixelFormat::from_wgpu);
    if prefer_srgb {
        if let Some(f) = known.clone().find(|f| f.is_srgb()) {
            return Some(f);
        }
    }

    known.next()
}
