//! # Graphics Host Abstraction
//!
//! The filter never owns a GPU device. It borrows one from the host through
//! [`GraphicsHost`] and talks to the pipeline it is attached to through
//! [`FilterSource`]. Handles are opaque ids minted by the host.
//!
//! [`Texture`] and [`Effect`] are move-only: whoever holds one is responsible
//! for handing it back to `destroy_texture` / `destroy_effect`. Borrowed
//! access goes through the `Copy` handle [`TextureRef`].

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("No GPU adapter found")]
    NoAdapter,
    #[error("Device request failed: {0}")]
    Device(String),
    #[error("Effect file not found: {0}")]
    EffectNotFound(PathBuf),
    #[error("Shader error: {0}")]
    Shader(String),
    #[error("Unknown texture handle {0}")]
    InvalidTexture(u64),
    #[error("Unknown effect handle {0}")]
    InvalidEffect(u64),
    #[error("Texture size mismatch: {src_w}x{src_h} into {dst_w}x{dst_h}")]
    SizeMismatch {
        src_w: u32,
        src_h: u32,
        dst_w: u32,
        dst_h: u32,
    },
    #[error("Texture allocation failed: {0}")]
    Allocation(String),
    #[error("Texture readback failed: {0}")]
    Readback(String),
}

// ============================================================================
// Handles
// ============================================================================

/// An owned GPU texture.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    id: u64,
}

impl Texture {
    /// Wrap a host-allocated id. Only graphics hosts should mint these.
    pub fn from_raw(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handle(&self) -> TextureRef {
        TextureRef(self.id)
    }
}

/// Borrowed reference to a texture owned elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRef(u64);

impl TextureRef {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// An owned compiled effect (shader program).
#[derive(Debug, PartialEq, Eq)]
pub struct Effect {
    id: u64,
}

impl Effect {
    pub fn from_raw(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A named binding inside an effect, resolved once with
/// [`GraphicsHost::effect_param_by_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectParam {
    effect: u64,
    index: u32,
}

impl EffectParam {
    pub fn new(effect: u64, index: u32) -> Self {
        Self { effect, index }
    }

    pub fn effect_id(self) -> u64 {
        self.effect
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

// ============================================================================
// Descriptors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    Rgba,
    Bgra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: ColorFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Sampled and written by copies; what frame captures use.
    Dynamic,
    /// Additionally usable as a render pass attachment.
    RenderTarget,
}

/// Whether the host may skip its intermediate render target and draw the
/// upstream source straight through the filter's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectRendering {
    Allow,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Host traits
// ============================================================================

/// GPU services the host exposes to filters.
pub trait GraphicsHost: Send + Sync {
    /// Acquire exclusive access to the graphics context. Recursive on the
    /// owning thread.
    fn enter_graphics(&self);
    fn leave_graphics(&self);

    fn create_effect_from_file(&self, path: &Path) -> Result<Effect, GraphicsError>;
    fn destroy_effect(&self, effect: Effect);
    fn effect_param_by_name(&self, effect: &Effect, name: &str) -> Option<EffectParam>;

    /// Bind a texture, or the host's empty placeholder when `None`.
    fn set_texture(&self, param: EffectParam, texture: Option<TextureRef>);
    fn set_int(&self, param: EffectParam, value: i32);
    fn set_vec2(&self, param: EffectParam, value: Vec2);

    fn create_texture(&self, desc: TextureDesc, usage: TextureUsage) -> Result<Texture, GraphicsError>;
    fn texture_desc(&self, texture: TextureRef) -> Option<TextureDesc>;
    fn copy_texture(&self, dst: &Texture, src: TextureRef) -> Result<(), GraphicsError>;
    fn destroy_texture(&self, texture: Texture);
}

/// The pipeline position a filter instance is attached to.
pub trait FilterSource: Send + Sync {
    /// Start a filtered pass. Returns `false` when the host has nothing to
    /// render this frame.
    fn process_filter_begin(&self, format: ColorFormat, direct: DirectRendering) -> bool;
    /// The pre-filter image of the pass opened by `process_filter_begin`.
    fn filter_texture(&self) -> Option<TextureRef>;
    /// Size of the filter's upstream target.
    fn target_size(&self) -> (u32, u32);
    /// Draw `effect` over the pass input and finish the pass.
    fn process_filter_end(&self, effect: &Effect, width: u32, height: u32);
    /// Finish the pass without producing output.
    fn skip_filter(&self);
}

/// Scoped graphics context access. Leaves the context when dropped, on
/// every exit path.
pub struct GraphicsGuard<'a> {
    host: &'a dyn GraphicsHost,
}

impl<'a> GraphicsGuard<'a> {
    pub fn enter(host: &'a dyn GraphicsHost) -> Self {
        host.enter_graphics();
        Self { host }
    }
}

impl Drop for GraphicsGuard<'_> {
    fn drop(&mut self) {
        self.host.leave_graphics();
    }
}
