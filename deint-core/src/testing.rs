//! Recording collaborators for unit tests.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::graphics::{
    ColorFormat, DirectRendering, Effect, EffectParam, FilterSource, GraphicsError, GraphicsHost,
    Texture, TextureDesc, TextureRef, TextureUsage, Vec2,
};

/// Parameter names the fake effect exposes, in index order.
const EFFECT_PARAMS: &[&str] = &[
    "image",
    "previous_image",
    "field_order",
    "pixel_size",
    "dimensions",
];

#[derive(Default)]
struct Recorded {
    next_id: u64,
    textures: HashMap<u64, TextureDesc>,
    copies: HashMap<u64, u64>,
    effects: HashSet<u64>,
    destroyed_textures: usize,
    ints: HashMap<&'static str, i32>,
    vec2s: HashMap<&'static str, Vec2>,
    bound_textures: HashMap<&'static str, Option<TextureRef>>,
    fail_effects: bool,
    fail_allocations: bool,
    fail_copies: bool,
    context_depth: usize,
    context_entries: usize,
    calls: usize,
}

impl Recorded {
    fn mint(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct RecordingHost {
    missing_param: Option<&'static str>,
    inner: Mutex<Recorded>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            missing_param: None,
            inner: Mutex::new(Recorded::default()),
        }
    }

    /// A host whose effect lacks one parameter.
    pub fn without_param(name: &'static str) -> Self {
        Self {
            missing_param: Some(name),
            ..Self::new()
        }
    }

    pub fn fail_effects(&self, fail: bool) {
        self.inner.lock().fail_effects = fail;
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.inner.lock().fail_allocations = fail;
    }

    pub fn fail_copies(&self, fail: bool) {
        self.inner.lock().fail_copies = fail;
    }

    pub fn live_textures(&self) -> usize {
        self.inner.lock().textures.len()
    }

    pub fn live_effects(&self) -> usize {
        self.inner.lock().effects.len()
    }

    pub fn destroyed_textures(&self) -> usize {
        self.inner.lock().destroyed_textures
    }

    pub fn context_depth(&self) -> usize {
        self.inner.lock().context_depth
    }

    pub fn context_entries(&self) -> usize {
        self.inner.lock().context_entries
    }

    /// Number of GPU-side calls made so far.
    pub fn call_count(&self) -> usize {
        self.inner.lock().calls
    }

    pub fn bound_int(&self, name: &str) -> Option<i32> {
        self.inner.lock().ints.get(name).copied()
    }

    pub fn bound_vec2(&self, name: &str) -> Option<Vec2> {
        self.inner.lock().vec2s.get(name).copied()
    }

    /// `None` if never bound, `Some(None)` if bound to the placeholder.
    pub fn bound_texture(&self, name: &str) -> Option<Option<TextureRef>> {
        self.inner.lock().bound_textures.get(name).copied()
    }

    /// Source of the last copy into `texture`.
    pub fn copied_from(&self, texture: TextureRef) -> Option<TextureRef> {
        self.inner
            .lock()
            .copies
            .get(&texture.id())
            .copied()
            .map(TextureRef::from_raw)
    }

    fn param_name(param: EffectParam) -> &'static str {
        EFFECT_PARAMS[param.index() as usize]
    }
}

impl GraphicsHost for RecordingHost {
    fn enter_graphics(&self) {
        let mut inner = self.inner.lock();
        inner.context_depth += 1;
        inner.context_entries += 1;
    }

    fn leave_graphics(&self) {
        let mut inner = self.inner.lock();
        assert!(inner.context_depth > 0, "leave without enter");
        inner.context_depth -= 1;
    }

    fn create_effect_from_file(&self, path: &Path) -> Result<Effect, GraphicsError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        assert!(inner.context_depth > 0, "effect created outside graphics context");
        if inner.fail_effects {
            return Err(GraphicsError::Shader(format!("{}: syntax error", path.display())));
        }
        let id = inner.mint();
        inner.effects.insert(id);
        Ok(Effect::from_raw(id))
    }

    fn destroy_effect(&self, effect: Effect) {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        assert!(inner.context_depth > 0, "effect destroyed outside graphics context");
        assert!(inner.effects.remove(&effect.id()), "double destroy of effect");
    }

    fn effect_param_by_name(&self, effect: &Effect, name: &str) -> Option<EffectParam> {
        if self.missing_param == Some(name) {
            return None;
        }
        EFFECT_PARAMS
            .iter()
            .position(|p| *p == name)
            .map(|index| EffectParam::new(effect.id(), index as u32))
    }

    fn set_texture(&self, param: EffectParam, texture: Option<TextureRef>) {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if let Some(texture) = texture {
            assert!(inner.textures.contains_key(&texture.id()), "bound a freed texture");
        }
        inner.bound_textures.insert(Self::param_name(param), texture);
    }

    fn set_int(&self, param: EffectParam, value: i32) {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        inner.ints.insert(Self::param_name(param), value);
    }

    fn set_vec2(&self, param: EffectParam, value: Vec2) {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        inner.vec2s.insert(Self::param_name(param), value);
    }

    fn create_texture(&self, desc: TextureDesc, _usage: TextureUsage) -> Result<Texture, GraphicsError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if inner.fail_allocations {
            return Err(GraphicsError::Allocation("out of video memory".into()));
        }
        let id = inner.mint();
        inner.textures.insert(id, desc);
        Ok(Texture::from_raw(id))
    }

    fn texture_desc(&self, texture: TextureRef) -> Option<TextureDesc> {
        self.inner.lock().textures.get(&texture.id()).copied()
    }

    fn copy_texture(&self, dst: &Texture, src: TextureRef) -> Result<(), GraphicsError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if inner.fail_copies {
            return Err(GraphicsError::Allocation("copy rejected".into()));
        }
        let src_desc = *inner
            .textures
            .get(&src.id())
            .ok_or(GraphicsError::InvalidTexture(src.id()))?;
        let dst_desc = *inner
            .textures
            .get(&dst.id())
            .ok_or(GraphicsError::InvalidTexture(dst.id()))?;
        if src_desc != dst_desc {
            return Err(GraphicsError::SizeMismatch {
                src_w: src_desc.width,
                src_h: src_desc.height,
                dst_w: dst_desc.width,
                dst_h: dst_desc.height,
            });
        }
        inner.copies.insert(dst.id(), src.id());
        Ok(())
    }

    fn destroy_texture(&self, texture: Texture) {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        assert!(
            inner.textures.remove(&texture.id()).is_some(),
            "double destroy of texture {}",
            texture.id()
        );
        inner.destroyed_textures += 1;
    }
}

// ============================================================================
// Source
// ============================================================================

#[derive(Default)]
struct SourceCounters {
    begins: usize,
    ends: usize,
    skips: usize,
    last_end_size: Option<(u32, u32)>,
}

/// A pipeline position with one fixed pre-filter texture.
pub struct RecordingSource {
    host: Arc<RecordingHost>,
    texture: Option<Texture>,
    size: Mutex<(u32, u32)>,
    begin_result: Mutex<bool>,
    counters: Mutex<SourceCounters>,
}

impl RecordingSource {
    pub fn new(host: Arc<RecordingHost>, width: u32, height: u32) -> Self {
        let texture = host
            .create_texture(
                TextureDesc {
                    width,
                    height,
                    format: ColorFormat::Rgba,
                },
                TextureUsage::RenderTarget,
            )
            .expect("source texture");
        Self {
            host,
            texture: Some(texture),
            size: Mutex::new((width, height)),
            begin_result: Mutex::new(true),
            counters: Mutex::new(SourceCounters::default()),
        }
    }

    pub fn texture(&self) -> TextureRef {
        self.texture.as_ref().map(Texture::handle).expect("source texture")
    }

    pub fn set_begin_result(&self, result: bool) {
        *self.begin_result.lock() = result;
    }

    pub fn set_target_size(&self, width: u32, height: u32) {
        *self.size.lock() = (width, height);
    }

    pub fn ends(&self) -> usize {
        self.counters.lock().ends
    }

    pub fn skips(&self) -> usize {
        self.counters.lock().skips
    }

    pub fn last_end_size(&self) -> Option<(u32, u32)> {
        self.counters.lock().last_end_size
    }
}

impl FilterSource for RecordingSource {
    fn process_filter_begin(&self, format: ColorFormat, direct: DirectRendering) -> bool {
        assert_eq!(format, ColorFormat::Rgba);
        assert_eq!(direct, DirectRendering::Allow);
        self.counters.lock().begins += 1;
        *self.begin_result.lock()
    }

    fn filter_texture(&self) -> Option<TextureRef> {
        self.texture.as_ref().map(Texture::handle)
    }

    fn target_size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    fn process_filter_end(&self, _effect: &Effect, width: u32, height: u32) {
        let mut counters = self.counters.lock();
        counters.ends += 1;
        counters.last_end_size = Some((width, height));
    }

    fn skip_filter(&self) {
        self.counters.lock().skips += 1;
    }
}

impl Drop for RecordingSource {
    fn drop(&mut self) {
        if let Some(texture) = self.texture.take() {
            self.host.destroy_texture(texture);
        }
    }
}
