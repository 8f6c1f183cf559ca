use std::num::NonZeroUsize;

use anyhow::Result;
use cadence_engine::device::{DepthFormat, GpuInit};
use cadence_engine::logging::{init_logging, LoggingConfig};
use cadence_engine::renderer::RendererConfig;
use cadence_engine::window::{Runtime, RuntimeConfig};
use clap::Parser;
use winit::dpi::LogicalSize;

/// Renders a spinning triangle with a bounded number of frames in flight.
#[derive(Parser, Debug)]
#[command(name = "cadence-demo", version, about)]
struct Args {
    /// Number of in-flight frame slots (default 2)
    #[arg(long)]
    slots: Option<NonZeroUsize>,

    /// Render with a depth attachment
    #[arg(long)]
    depth: bool,

    /// Present without waiting for vertical blank
    #[arg(long)]
    no_vsync: bool,
}

impl Args {
    fn renderer_config(&self) -> RendererConfig {
        let mut config = RendererConfig::default();
        if let Some(n) = self.slots {
            config = config.with_slot_pool_size(n);
        }
        if self.depth {
            config = config.with_depth(DepthFormat::Depth32Float);
        }
        config
    }

    fn gpu_init(&self) -> GpuInit {
        GpuInit {
            present_mode: if self.no_vsync {
                wgpu::PresentMode::AutoNoVsync
            } else {
                wgpu::PresentMode::Fifo
            },
            ..GpuInit::default()
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args = Args::parse();
    let renderer = args.renderer_config();

    log::info!(
        "starting with {} frame slot(s), depth={}, vsync={}",
        renderer.slot_pool_size,
        args.depth,
        !args.no_vsync
    );

    Runtime::run(
        RuntimeConfig {
            title: "Cadence".to_string(),
            initial_size: LogicalSize::new(960.0, 540.0),
        },
        args.gpu_init(),
        renderer,
    )
}
