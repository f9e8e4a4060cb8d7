//! Offscreen pipeline position for [`WgpuHost`].
//!
//! Frames are uploaded with [`HeadlessSource::push_frame`]; the filter
//! draws into a render target of the same size that can be read back.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::graphics::{
    ColorFormat, DirectRendering, Effect, FilterSource, GraphicsError, GraphicsGuard, GraphicsHost,
    Texture, TextureDesc, TextureRef, TextureUsage,
};
use crate::wgpu_host::WgpuHost;

#[derive(Default)]
struct Surfaces {
    frame: Option<Texture>,
    output: Option<Texture>,
    size: (u32, u32),
}

pub struct HeadlessSource {
    host: Arc<WgpuHost>,
    surfaces: Mutex<Surfaces>,
}

impl HeadlessSource {
    pub fn new(host: Arc<WgpuHost>) -> Self {
        Self {
            host,
            surfaces: Mutex::new(Surfaces::default()),
        }
    }

    /// Upload the next pre-filter frame as tightly packed RGBA.
    ///
    /// Reallocates both surfaces when the size changes.
    pub fn push_frame(&self, rgba: &[u8], width: u32, height: u32) -> Result<(), GraphicsError> {
        let _graphics = GraphicsGuard::enter(self.host.as_ref());
        let mut surfaces = self.surfaces.lock();

        if surfaces.size != (width, height) || surfaces.frame.is_none() {
            self.release(&mut surfaces);

            let desc = TextureDesc {
                width,
                height,
                format: ColorFormat::Rgba,
            };
            let frame = self.host.create_texture(desc, TextureUsage::Dynamic)?;
            let output = match self.host.create_texture(desc, TextureUsage::RenderTarget) {
                Ok(output) => output,
                Err(err) => {
                    self.host.destroy_texture(frame);
                    return Err(err);
                }
            };

            tracing::debug!("Headless surfaces allocated at {}x{}", width, height);
            surfaces.frame = Some(frame);
            surfaces.output = Some(output);
            surfaces.size = (width, height);
        }

        match surfaces.frame.as_ref() {
            Some(frame) => self.host.write_texture(frame.handle(), rgba),
            None => Err(GraphicsError::Allocation("no frame surface".into())),
        }
    }

    /// Read the last filtered frame back as tightly packed RGBA.
    pub fn read_output(&self) -> Result<Vec<u8>, GraphicsError> {
        let output = self
            .surfaces
            .lock()
            .output
            .as_ref()
            .map(Texture::handle)
            .ok_or_else(|| GraphicsError::Readback("no frame has been pushed".into()))?;
        self.host.read_texture(output)
    }

    fn release(&self, surfaces: &mut Surfaces) {
        if let Some(frame) = surfaces.frame.take() {
            self.host.destroy_texture(frame);
        }
        if let Some(output) = surfaces.output.take() {
            self.host.destroy_texture(output);
        }
        surfaces.size = (0, 0);
    }
}

impl FilterSource for HeadlessSource {
    fn process_filter_begin(&self, format: ColorFormat, _direct: DirectRendering) -> bool {
        if format != ColorFormat::Rgba {
            tracing::warn!("Headless source only renders RGBA, got {:?}", format);
            return false;
        }
        self.surfaces.lock().frame.is_some()
    }

    fn filter_texture(&self) -> Option<TextureRef> {
        self.surfaces.lock().frame.as_ref().map(Texture::handle)
    }

    fn target_size(&self) -> (u32, u32) {
        self.surfaces.lock().size
    }

    fn process_filter_end(&self, effect: &Effect, width: u32, height: u32) {
        let (frame, output) = {
            let surfaces = self.surfaces.lock();
            match (surfaces.frame.as_ref(), surfaces.output.as_ref()) {
                (Some(frame), Some(output)) => (frame.handle(), output.handle()),
                _ => return,
            }
        };

        if let Err(e) = self.host.draw_effect(effect, frame, output) {
            tracing::warn!("Headless draw at {}x{} failed: {}", width, height, e);
        }
    }

    fn skip_filter(&self) {
        tracing::trace!("Headless source skipped a frame");
    }
}

impl Drop for HeadlessSource {
    fn drop(&mut self) {
        let mut surfaces = std::mem::take(self.surfaces.get_mut());
        if surfaces.frame.is_none() && surfaces.output.is_none() {
            return;
        }
        let _graphics = GraphicsGuard::enter(self.host.as_ref());
        self.release(&mut surfaces);
    }
}
