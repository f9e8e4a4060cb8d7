//! # deint-render
//!
//! Feeds interlaced frames through the deinterlace stage on a headless wgpu
//! device and writes the last output frame.
//!
//! ```text
//! deint-render [config.json] [--frames N] [--output out.png]
//! ```

mod config;
mod frames;

use anyhow::{Context, Result};
use std::sync::Arc;

use deint_core::{DeinterlaceFilter, HeadlessSource, ModuleResources, RenderOutcome, WgpuHost};

use crate::config::RenderConfig;
use crate::frames::InterlacedFrames;

#[derive(Debug, Default)]
struct RenderStats {
    rendered: u32,
    skipped: u32,
    dropped: u32,
}

impl RenderStats {
    fn record(&mut self, outcome: RenderOutcome) {
        match outcome {
            RenderOutcome::Rendered => self.rendered += 1,
            RenderOutcome::Skipped => self.skipped += 1,
            RenderOutcome::Dropped => self.dropped += 1,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("deint_render=info".parse()?)
                .add_directive("deint_core=info".parse()?)
                .add_directive("wgpu=warn".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = RenderConfig::from_args(&args)?;

    tracing::info!("deint-render v{}", env!("CARGO_PKG_VERSION"));

    let material = match &config.input {
        Some(path) => InterlacedFrames::from_image(path)?,
        None => InterlacedFrames::synthetic(config.width, config.height),
    };
    let (width, height) = material.size();

    let host = Arc::new(WgpuHost::new_blocking().context("initializing wgpu")?);
    tracing::info!(
        "Rendering {} frames at {}x{} on {}",
        config.frames,
        width,
        height,
        host.adapter_name()
    );

    let source = Arc::new(HeadlessSource::new(Arc::clone(&host)));
    let filter = DeinterlaceFilter::create(
        host.clone(),
        source.clone(),
        &ModuleResources::from_env(),
        &config.settings,
    )?;

    let mut stats = RenderStats::default();
    for index in 0..config.frames {
        source.push_frame(&material.frame(index), width, height)?;
        stats.record(filter.video_render());
    }

    let pixels = source.read_output()?;
    let image = image::RgbaImage::from_raw(width, height, pixels)
        .context("output buffer does not match frame size")?;
    image
        .save(&config.output)
        .with_context(|| format!("writing {}", config.output.display()))?;

    tracing::info!(
        "Render complete: rendered={}, skipped={}, dropped={}, output={}",
        stats.rendered,
        stats.skipped,
        stats.dropped,
        config.output.display()
    );

    Ok(())
}
