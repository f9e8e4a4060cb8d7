//! # Temporal Deinterlace Filter
//!
//! One GPU pass per frame. The pass reads the current pre-filter image and a
//! private copy of the previous one, then the copy of the current image
//! becomes the next frame's history.
//!
//! Lifecycle:
//! - `create` compiles the bundled effect and resolves its parameters
//!   inside a graphics-context scope.
//! - `update` stores settings. No GPU work; safe from a control thread.
//! - `video_render` runs on the render thread. Calls for one instance are
//!   serialized on the previous-frame slot.
//! - Dropping the filter releases the effect and the held history texture.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::graphics::{
    ColorFormat, DirectRendering, Effect, EffectParam, FilterSource, GraphicsError, GraphicsGuard,
    GraphicsHost, Texture, TextureRef, TextureUsage, Vec2,
};
use crate::previous_frame::PreviousFrame;
use crate::resources::ModuleResources;
use crate::settings::{
    DeinterlaceSettings, DeinterlaceStrategy, Properties, SETTING_FIELD_ORDER,
};

/// Bundled effect compiled for every instance.
pub const EFFECT_FILE: &str = "deinterlace_filter.wgsl";

pub const PARAM_PREVIOUS_IMAGE: &str = "previous_image";
pub const PARAM_FIELD_ORDER: &str = "field_order";
pub const PARAM_PIXEL_SIZE: &str = "pixel_size";
pub const PARAM_DIMENSIONS: &str = "dimensions";

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Failed to compile effect {path}: {source}")]
    ShaderCompilation {
        path: PathBuf,
        #[source]
        source: GraphicsError,
    },
    #[error("Effect has no parameter named '{0}'")]
    MissingShaderParam(&'static str),
    #[error("Frame capture failed: {0}")]
    FrameCapture(#[source] GraphicsError),
}

/// What happened to one `video_render` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The effect ran and the history texture was replaced.
    Rendered,
    /// The host had nothing to render; no state changed.
    Skipped,
    /// Capturing the frame failed; the frame was dropped and the previous
    /// history texture kept.
    Dropped,
}

// ============================================================================
// Shader parameters
// ============================================================================

/// The four bindings the effect must expose.
#[derive(Debug, Clone, Copy)]
pub struct ShaderParams {
    pub previous_image: EffectParam,
    pub field_order: EffectParam,
    pub pixel_size: EffectParam,
    pub dimensions: EffectParam,
}

impl ShaderParams {
    pub fn resolve(host: &dyn GraphicsHost, effect: &Effect) -> Result<Self, FilterError> {
        let lookup = |name: &'static str| {
            host.effect_param_by_name(effect, name)
                .ok_or(FilterError::MissingShaderParam(name))
        };

        Ok(Self {
            previous_image: lookup(PARAM_PREVIOUS_IMAGE)?,
            field_order: lookup(PARAM_FIELD_ORDER)?,
            pixel_size: lookup(PARAM_PIXEL_SIZE)?,
            dimensions: lookup(PARAM_DIMENSIONS)?,
        })
    }
}

/// Per-frame vector uniforms derived from the target size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub pixel_size: Vec2,
    pub dimensions: Vec2,
}

impl FrameUniforms {
    pub fn for_target(width: u32, height: u32) -> Self {
        let width = width as f32;
        let height = height as f32;
        Self {
            pixel_size: Vec2::new(1.0 / width, 1.0 / height),
            dimensions: Vec2::new(width, height),
        }
    }
}

// ============================================================================
// Filter state
// ============================================================================

/// Scalar settings, stored the way the shader consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    /// Raw `deinterlacer` value as delivered by the host.
    pub deinterlacer: String,
    pub strategy: DeinterlaceStrategy,
    /// Inverse of the requested `field_order` setting.
    pub field_order: bool,
}

impl FilterState {
    pub fn from_settings(settings: &DeinterlaceSettings) -> Self {
        let strategy = DeinterlaceStrategy::from_name(&settings.deinterlacer).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown deinterlacer '{}', using {}",
                settings.deinterlacer,
                DeinterlaceStrategy::default().label()
            );
            DeinterlaceStrategy::default()
        });

        Self {
            deinterlacer: settings.deinterlacer.clone(),
            strategy,
            field_order: !settings.field_order,
        }
    }

    /// Value bound to the `field_order` uniform.
    pub fn field_order_uniform(&self) -> i32 {
        i32::from(self.field_order)
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::from_settings(&DeinterlaceSettings::default())
    }
}

struct Program {
    effect: Effect,
    params: ShaderParams,
}

// ============================================================================
// Filter
// ============================================================================

pub struct DeinterlaceFilter {
    host: Arc<dyn GraphicsHost>,
    source: Arc<dyn FilterSource>,
    program: Option<Program>,
    state: Mutex<FilterState>,
    previous: Mutex<PreviousFrame>,
}

impl DeinterlaceFilter {
    pub fn create(
        host: Arc<dyn GraphicsHost>,
        source: Arc<dyn FilterSource>,
        resources: &ModuleResources,
        settings: &DeinterlaceSettings,
    ) -> Result<Self, FilterError> {
        let mut filter = Self {
            host,
            source,
            program: None,
            state: Mutex::new(FilterState::default()),
            previous: Mutex::new(PreviousFrame::new()),
        };

        let path = resources.module_file(EFFECT_FILE).ok_or_else(|| {
            let path = resources.data_dir().join(EFFECT_FILE);
            FilterError::ShaderCompilation {
                source: GraphicsError::EffectNotFound(path.clone()),
                path,
            }
        })?;
        filter.load_program(&path)?;
        filter.update(settings);

        tracing::info!("Deinterlace filter created ({})", path.display());
        Ok(filter)
    }

    fn load_program(&mut self, path: &Path) -> Result<(), FilterError> {
        let host = Arc::clone(&self.host);
        let _graphics = GraphicsGuard::enter(host.as_ref());

        let effect = host
            .create_effect_from_file(path)
            .map_err(|source| FilterError::ShaderCompilation {
                path: path.to_path_buf(),
                source,
            })?;

        match ShaderParams::resolve(host.as_ref(), &effect) {
            Ok(params) => {
                self.program = Some(Program { effect, params });
                Ok(())
            }
            Err(err) => {
                host.destroy_effect(effect);
                Err(err)
            }
        }
    }

    /// Apply host settings. Pure state update.
    pub fn update(&self, settings: &DeinterlaceSettings) {
        let state = FilterState::from_settings(settings);
        tracing::debug!(
            "Deinterlace settings: mode={:?} field_order={}",
            state.strategy,
            state.field_order_uniform()
        );
        *self.state.lock() = state;
    }

    pub fn state(&self) -> FilterState {
        self.state.lock().clone()
    }

    /// Texture currently held as the previous frame.
    pub fn previous_texture(&self) -> Option<TextureRef> {
        self.previous.lock().texture()
    }

    pub fn frames_captured(&self) -> u64 {
        self.previous.lock().generation()
    }

    pub fn properties() -> Properties {
        let mut props = Properties::new();
        props.add_bool(SETTING_FIELD_ORDER, "Field Order");
        props
    }

    pub fn defaults() -> DeinterlaceSettings {
        DeinterlaceSettings::default()
    }

    /// Render one frame. Capture failures are logged and the frame is
    /// dropped; they never reach the caller as errors.
    pub fn video_render(&self) -> RenderOutcome {
        let Some(program) = self.program.as_ref() else {
            return RenderOutcome::Skipped;
        };

        let mut previous = self.previous.lock();
        match self.render_pass(program, &mut previous) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("Deinterlace frame dropped: {}", err);
                RenderOutcome::Dropped
            }
        }
    }

    fn render_pass(
        &self,
        program: &Program,
        previous: &mut PreviousFrame,
    ) -> Result<RenderOutcome, FilterError> {
        if !self
            .source
            .process_filter_begin(ColorFormat::Rgba, DirectRendering::Allow)
        {
            return Ok(RenderOutcome::Skipped);
        }

        let (width, height) = self.source.target_size();
        if width == 0 || height == 0 {
            self.source.skip_filter();
            return Ok(RenderOutcome::Skipped);
        }

        let state = self.state();
        let uniforms = FrameUniforms::for_target(width, height);
        let params = &program.params;

        match state.strategy {
            DeinterlaceStrategy::TemporalBlend => {
                self.host.set_texture(params.previous_image, previous.texture());
                self.host.set_int(params.field_order, state.field_order_uniform());
                self.host.set_vec2(params.pixel_size, uniforms.pixel_size);
                self.host.set_vec2(params.dimensions, uniforms.dimensions);
            }
        }

        let current = match self.capture_current() {
            Ok(texture) => texture,
            Err(err) => {
                self.source.skip_filter();
                return Err(err);
            }
        };

        self.source.process_filter_end(&program.effect, width, height);

        let host = &self.host;
        previous.swap_and_release(current, |old| host.destroy_texture(old));
        tracing::trace!("Deinterlaced frame {} ({}x{})", previous.generation(), width, height);

        Ok(RenderOutcome::Rendered)
    }

    /// Copy the pre-filter image into a texture this filter owns. The
    /// source's storage is recycled by the host between frames.
    fn capture_current(&self) -> Result<Texture, FilterError> {
        let source = self
            .source
            .filter_texture()
            .ok_or_else(|| {
                FilterError::FrameCapture(GraphicsError::Allocation("no filter texture".into()))
            })?;
        let desc = self
            .host
            .texture_desc(source)
            .ok_or(FilterError::FrameCapture(GraphicsError::InvalidTexture(source.id())))?;

        let texture = self
            .host
            .create_texture(desc, TextureUsage::Dynamic)
            .map_err(FilterError::FrameCapture)?;

        if let Err(err) = self.host.copy_texture(&texture, source) {
            self.host.destroy_texture(texture);
            return Err(FilterError::FrameCapture(err));
        }

        Ok(texture)
    }
}

impl Drop for DeinterlaceFilter {
    fn drop(&mut self) {
        let program = self.program.take();
        let previous = self.previous.get_mut().take();
        if program.is_none() && previous.is_none() {
            return;
        }

        let _graphics = GraphicsGuard::enter(self.host.as_ref());
        if let Some(program) = program {
            self.host.destroy_effect(program.effect);
        }
        if let Some(texture) = previous {
            self.host.destroy_texture(texture);
        }
        tracing::debug!("Deinterlace filter destroyed");
    }
}
