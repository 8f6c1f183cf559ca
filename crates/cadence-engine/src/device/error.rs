use thiserror::Error;

/// Errors surfaced by the frame renderer.
///
/// Setup errors come from `initialize`. Per-frame errors come from
/// `render_frame`; only `DrawableUnavailable` is expected during normal
/// operation.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no suitable GPU device available: {0}")]
    DeviceUnavailable(String),

    #[error("pipeline compilation failed: {0}")]
    PipelineCompilationFailed(String),

    #[error("renderer is already initialized")]
    AlreadyInitialized,

    #[error("renderer has not been initialized")]
    NotInitialized,

    #[error("no drawable available this tick")]
    DrawableUnavailable,

    #[error("command encoding failed: {0}")]
    EncodingFailed(String),

    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    #[error("renderer is unusable after a fatal error")]
    Unusable,
}

impl RendererError {
    /// Returns `true` if the caller should simply retry on the next tick.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RendererError::DrawableUnavailable | RendererError::EncodingFailed(_))
    }

    /// Returns `true` if the renderer instance cannot be used any more.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RendererError::DeviceUnavailable(_)
                | RendererError::PipelineCompilationFailed(_)
                | RendererError::DeviceLost(_)
                | RendererError::Unusable
        )
    }
}

/// Result of acquiring a frame token from the surface.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AcquireError {
    /// No drawable this tick (resizing, occluded, timed out). Skip the frame.
    Unavailable,
    /// The device backing the surface is gone.
    Lost(String),
}

impl From<AcquireError> for RendererError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::Unavailable => RendererError::DrawableUnavailable,
            AcquireError::Lost(reason) => RendererError::DeviceLost(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawable_unavailable_is_recoverable_not_fatal() {
        let e = RendererError::DrawableUnavailable;
        assert!(e.is_recoverable());
        assert!(!e.is_fatal());
    }

    #[test]
    fn device_lost_is_fatal() {
        assert!(RendererError::DeviceLost("gone".into()).is_fatal());
        assert!(!RendererError::AlreadyInitialized.is_fatal());
    }

    #[test]
    fn acquire_errors_map_to_renderer_errors() {
        assert!(matches!(
            RendererError::from(AcquireError::Unavailable),
            RendererError::DrawableUnavailable
        ));
        assert!(matches!(
            RendererError::from(AcquireError::Lost("oom".into())),
            RendererError::DeviceLost(_)
        ));
    }
}
