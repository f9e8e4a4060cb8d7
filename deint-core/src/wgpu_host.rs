//! # wgpu Graphics Host
//!
//! A [`GraphicsHost`] backed by a headless wgpu device. Effects are WGSL
//! files reflected with [`EffectLayout`]; each one owns a render pipeline
//! targeting RGBA8 and a uniform buffer staged on the CPU until draw time.
//!
//! Textures and effects live in handle tables keyed by the ids inside
//! [`Texture`] and [`Effect`]. Unbound texture parameters sample a 1x1
//! transparent placeholder.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use crate::effect::{EffectLayout, ParamKind, FRAGMENT_ENTRY, IMAGE_PARAM, VERTEX_ENTRY};
use crate::graphics::{
    ColorFormat, Effect, EffectParam, GraphicsError, GraphicsHost, Texture, TextureDesc,
    TextureRef, TextureUsage, Vec2,
};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn wgpu_format(format: ColorFormat) -> wgpu::TextureFormat {
    match format {
        ColorFormat::Rgba => wgpu::TextureFormat::Rgba8Unorm,
        ColorFormat::Bgra => wgpu::TextureFormat::Bgra8Unorm,
    }
}

fn color_format(format: wgpu::TextureFormat) -> Option<ColorFormat> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some(ColorFormat::Rgba),
        wgpu::TextureFormat::Bgra8Unorm => Some(ColorFormat::Bgra),
        _ => None,
    }
}

#[derive(Default)]
struct ContextOwner {
    thread: Option<ThreadId>,
    depth: usize,
}

struct WgpuEffect {
    path: PathBuf,
    layout: EffectLayout,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: Option<wgpu::Buffer>,
    uniform_data: Vec<u8>,
    /// Param index -> texture id.
    bound: HashMap<usize, u64>,
}

pub struct WgpuHost {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,

    context: Mutex<ContextOwner>,
    context_free: Condvar,

    next_id: AtomicU64,
    textures: Mutex<HashMap<u64, wgpu::Texture>>,
    effects: Mutex<HashMap<u64, WgpuEffect>>,

    placeholder: wgpu::Texture,
    sampler: wgpu::Sampler,
}

impl WgpuHost {
    pub async fn new() -> Result<Self, GraphicsError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GraphicsError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    label: Some("deint_device"),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| GraphicsError::Device(e.to_string()))?;

        let adapter_name = adapter.get_info().name;
        tracing::info!("Graphics host on {}", adapter_name);

        let placeholder = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("deint_placeholder"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            placeholder.as_image_copy(),
            &[0u8; 4],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            placeholder.size(),
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            device,
            queue,
            adapter_name,
            context: Mutex::new(ContextOwner::default()),
            context_free: Condvar::new(),
            next_id: AtomicU64::new(1),
            textures: Mutex::new(HashMap::new()),
            effects: Mutex::new(HashMap::new()),
            placeholder,
            sampler,
        })
    }

    pub fn new_blocking() -> Result<Self, GraphicsError> {
        pollster::block_on(Self::new())
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn live_textures(&self) -> usize {
        self.textures.lock().len()
    }

    fn mint(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Upload tightly packed 8-bit RGBA pixels.
    pub fn write_texture(&self, texture: TextureRef, pixels: &[u8]) -> Result<(), GraphicsError> {
        let textures = self.textures.lock();
        let target = textures
            .get(&texture.id())
            .ok_or(GraphicsError::InvalidTexture(texture.id()))?;

        let expected = target.width() as usize * target.height() as usize * 4;
        if pixels.len() != expected {
            return Err(GraphicsError::Allocation(format!(
                "expected {} bytes of pixel data, got {}",
                expected,
                pixels.len()
            )));
        }

        self.queue.write_texture(
            target.as_image_copy(),
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * target.width()),
                rows_per_image: Some(target.height()),
            },
            target.size(),
        );
        Ok(())
    }

    /// Read a texture back as tightly packed 8-bit pixels.
    pub fn read_texture(&self, texture: TextureRef) -> Result<Vec<u8>, GraphicsError> {
        let textures = self.textures.lock();
        let source = textures
            .get(&texture.id())
            .ok_or(GraphicsError::InvalidTexture(texture.id()))?;

        let width = source.width();
        let height = source.height();
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("deint_readback"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("deint_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            source.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            source.size(),
        );
        self.queue.submit(Some(encoder.finish()));
        drop(textures);

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| GraphicsError::Readback(e.to_string()))?
            .map_err(|e| GraphicsError::Readback(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity(unpadded as usize * height as usize);
        for row in mapped.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        buffer.unmap();

        Ok(pixels)
    }

    /// Run `effect` over a full-screen triangle into `target`, with `image`
    /// bound to the effect's `image` parameter.
    pub fn draw_effect(
        &self,
        effect: &Effect,
        image: TextureRef,
        target: TextureRef,
    ) -> Result<(), GraphicsError> {
        let mut effects = self.effects.lock();
        let state = effects
            .get_mut(&effect.id())
            .ok_or(GraphicsError::InvalidEffect(effect.id()))?;
        if let Some(index) = state.layout.param_index(IMAGE_PARAM) {
            state.bound.insert(index, image.id());
        }
        let state = &*state;

        let textures = self.textures.lock();
        let target_texture = textures
            .get(&target.id())
            .ok_or(GraphicsError::InvalidTexture(target.id()))?;
        if target_texture.format() != TARGET_FORMAT {
            return Err(GraphicsError::Shader(format!(
                "effect targets must be {:?}, got {:?}",
                TARGET_FORMAT,
                target_texture.format()
            )));
        }

        let views: Vec<(u32, wgpu::TextureView)> = state
            .layout
            .params
            .iter()
            .enumerate()
            .filter_map(|(index, param)| match param.kind {
                ParamKind::Texture { binding } => {
                    let texture = state
                        .bound
                        .get(&index)
                        .and_then(|id| textures.get(id))
                        .unwrap_or(&self.placeholder);
                    Some((binding, texture.create_view(&wgpu::TextureViewDescriptor::default())))
                }
                ParamKind::Uniform { .. } => None,
            })
            .collect();

        let mut entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        for binding in &state.layout.samplers {
            entries.push(wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            });
        }
        if let (Some(block), Some(buffer)) = (state.layout.uniform, state.uniform_buffer.as_ref()) {
            self.queue.write_buffer(buffer, 0, &state.uniform_data);
            entries.push(wgpu::BindGroupEntry {
                binding: block.binding,
                resource: buffer.as_entire_binding(),
            });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("deint_effect_bind_group"),
            layout: &state.bind_group_layout,
            entries: &entries,
        });
        let target_view = target_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("deint_effect_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("deint_effect_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&state.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));

        tracing::trace!("Drew effect {} into texture {}", state.path.display(), target.id());
        Ok(())
    }

    fn write_uniform(&self, param: EffectParam, bytes: &[u8]) {
        let mut effects = self.effects.lock();
        let Some(state) = effects.get_mut(&param.effect_id()) else {
            tracing::warn!("Uniform write to unknown effect {}", param.effect_id());
            return;
        };

        match state.layout.param(param.index() as usize).map(|p| p.kind) {
            Some(ParamKind::Uniform { offset, ty }) if ty.size() == bytes.len() => {
                let start = offset as usize;
                state.uniform_data[start..start + bytes.len()].copy_from_slice(bytes);
            }
            other => tracing::warn!(
                "Uniform write of {} bytes to incompatible parameter {:?}",
                bytes.len(),
                other
            ),
        }
    }

    fn build_effect(&self, path: &Path, source: &str) -> Result<WgpuEffect, GraphicsError> {
        let layout = EffectLayout::parse(source)?;

        let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let mut entries = Vec::new();
        for param in &layout.params {
            if let ParamKind::Texture { binding } = param.kind {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                });
            }
        }
        for binding in &layout.samplers {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: *binding,
                visibility,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        if let Some(block) = layout.uniform {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: block.binding,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("deint_effect"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("deint_effect_layout"),
                    entries: &entries,
                });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("deint_effect_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("deint_effect_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GraphicsError::Shader(err.to_string()));
        }

        let (uniform_buffer, uniform_data) = match layout.uniform {
            Some(block) => {
                let size = block.buffer_size();
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("deint_effect_uniforms"),
                    size: size as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (Some(buffer), vec![0u8; size as usize])
            }
            None => (None, Vec::new()),
        };

        Ok(WgpuEffect {
            path: path.to_path_buf(),
            layout,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            uniform_data,
            bound: HashMap::new(),
        })
    }
}

impl GraphicsHost for WgpuHost {
    fn enter_graphics(&self) {
        let current = thread::current().id();
        let mut context = self.context.lock();
        loop {
            match context.thread {
                None => {
                    context.thread = Some(current);
                    context.depth = 1;
                    return;
                }
                Some(owner) if owner == current => {
                    context.depth += 1;
                    return;
                }
                Some(_) => self.context_free.wait(&mut context),
            }
        }
    }

    fn leave_graphics(&self) {
        let current = thread::current().id();
        let mut context = self.context.lock();
        if context.thread != Some(current) {
            tracing::warn!("leave_graphics called by a thread that does not own the context");
            return;
        }
        context.depth -= 1;
        if context.depth == 0 {
            context.thread = None;
            self.context_free.notify_one();
        }
    }

    fn create_effect_from_file(&self, path: &Path) -> Result<Effect, GraphicsError> {
        let source = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GraphicsError::EffectNotFound(path.to_path_buf()),
            _ => GraphicsError::Shader(format!("{}: {}", path.display(), e)),
        })?;

        let effect = self.build_effect(path, &source)?;
        let id = self.mint();
        tracing::debug!(
            "Compiled effect {} ({} params)",
            path.display(),
            effect.layout.params.len()
        );
        self.effects.lock().insert(id, effect);
        Ok(Effect::from_raw(id))
    }

    fn destroy_effect(&self, effect: Effect) {
        if self.effects.lock().remove(&effect.id()).is_none() {
            tracing::warn!("Destroying unknown effect {}", effect.id());
        }
    }

    fn effect_param_by_name(&self, effect: &Effect, name: &str) -> Option<EffectParam> {
        let effects = self.effects.lock();
        let index = effects.get(&effect.id())?.layout.param_index(name)?;
        Some(EffectParam::new(effect.id(), index as u32))
    }

    fn set_texture(&self, param: EffectParam, texture: Option<TextureRef>) {
        let mut effects = self.effects.lock();
        let Some(state) = effects.get_mut(&param.effect_id()) else {
            return;
        };
        let index = param.index() as usize;
        match texture {
            Some(texture) => {
                state.bound.insert(index, texture.id());
            }
            None => {
                state.bound.remove(&index);
            }
        }
    }

    fn set_int(&self, param: EffectParam, value: i32) {
        self.write_uniform(param, bytemuck::bytes_of(&value));
    }

    fn set_vec2(&self, param: EffectParam, value: Vec2) {
        self.write_uniform(param, bytemuck::bytes_of(&value));
    }

    fn create_texture(&self, desc: TextureDesc, usage: TextureUsage) -> Result<Texture, GraphicsError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(GraphicsError::Allocation(format!(
                "{}x{} is outside 1..={}",
                desc.width, desc.height, max
            )));
        }

        let mut usages = wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;
        if usage == TextureUsage::RenderTarget {
            usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("deint_texture"),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_format(desc.format),
            usage: usages,
            view_formats: &[],
        });

        let id = self.mint();
        self.textures.lock().insert(id, texture);
        Ok(Texture::from_raw(id))
    }

    fn texture_desc(&self, texture: TextureRef) -> Option<TextureDesc> {
        let textures = self.textures.lock();
        let texture = textures.get(&texture.id())?;
        Some(TextureDesc {
            width: texture.width(),
            height: texture.height(),
            format: color_format(texture.format())?,
        })
    }

    fn copy_texture(&self, dst: &Texture, src: TextureRef) -> Result<(), GraphicsError> {
        let textures = self.textures.lock();
        let src_texture = textures
            .get(&src.id())
            .ok_or(GraphicsError::InvalidTexture(src.id()))?;
        let dst_texture = textures
            .get(&dst.id())
            .ok_or(GraphicsError::InvalidTexture(dst.id()))?;

        if src_texture.size() != dst_texture.size() || src_texture.format() != dst_texture.format() {
            return Err(GraphicsError::SizeMismatch {
                src_w: src_texture.width(),
                src_h: src_texture.height(),
                dst_w: dst_texture.width(),
                dst_h: dst_texture.height(),
            });
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("deint_copy_encoder"),
            });
        encoder.copy_texture_to_texture(
            src_texture.as_image_copy(),
            dst_texture.as_image_copy(),
            src_texture.size(),
        );
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn destroy_texture(&self, texture: Texture) {
        match self.textures.lock().remove(&texture.id()) {
            Some(texture) => texture.destroy(),
            None => tracing::warn!("Destroying unknown texture {}", texture.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DeinterlaceFilter, RenderOutcome, EFFECT_FILE};
    use crate::headless::HeadlessSource;
    use crate::resources::ModuleResources;
    use crate::settings::DeinterlaceSettings;
    use std::sync::Arc;

    fn host() -> Option<Arc<WgpuHost>> {
        match WgpuHost::new_blocking() {
            Ok(host) => Some(Arc::new(host)),
            Err(e) => {
                eprintln!("skipping wgpu test: {e}");
                None
            }
        }
    }

    /// Rows alternate between two grey levels, like a combed frame.
    fn striped(width: u32, height: u32, even: u8, odd: u8) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let v = if y % 2 == 0 { even } else { odd };
            for _ in 0..width {
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        pixels
    }

    fn row(pixels: &[u8], width: u32, y: u32) -> &[u8] {
        let stride = (width * 4) as usize;
        &pixels[y as usize * stride..(y as usize + 1) * stride]
    }

    #[test]
    fn bundled_effect_compiles() {
        let Some(host) = host() else { return };
        let path = ModuleResources::bundled().module_file(EFFECT_FILE).unwrap();
        host.enter_graphics();
        let effect = host.create_effect_from_file(&path).unwrap();
        for name in ["previous_image", "field_order", "pixel_size", "dimensions"] {
            assert!(host.effect_param_by_name(&effect, name).is_some(), "{name}");
        }
        host.destroy_effect(effect);
        host.leave_graphics();
    }

    #[test]
    fn missing_effect_file() {
        let Some(host) = host() else { return };
        let err = host
            .create_effect_from_file(Path::new("/nonexistent/deinterlace_filter.wgsl"))
            .unwrap_err();
        assert!(matches!(err, GraphicsError::EffectNotFound(_)));
    }

    #[test]
    fn copy_rejects_size_mismatch() {
        let Some(host) = host() else { return };
        let desc = |width, height| TextureDesc {
            width,
            height,
            format: ColorFormat::Rgba,
        };
        let a = host.create_texture(desc(8, 8), TextureUsage::Dynamic).unwrap();
        let b = host.create_texture(desc(4, 8), TextureUsage::Dynamic).unwrap();
        assert!(matches!(
            host.copy_texture(&b, a.handle()),
            Err(GraphicsError::SizeMismatch { .. })
        ));
        host.destroy_texture(a);
        host.destroy_texture(b);
        assert_eq!(host.live_textures(), 0);
    }

    #[test]
    fn oversized_texture_fails_allocation() {
        let Some(host) = host() else { return };
        let desc = TextureDesc {
            width: u32::MAX,
            height: 1,
            format: ColorFormat::Rgba,
        };
        assert!(matches!(
            host.create_texture(desc, TextureUsage::Dynamic),
            Err(GraphicsError::Allocation(_))
        ));
    }

    #[test]
    fn context_is_recursive_and_exclusive() {
        let Some(host) = host() else { return };
        host.enter_graphics();
        host.enter_graphics();
        host.leave_graphics();

        let other = {
            let host = Arc::clone(&host);
            std::thread::spawn(move || {
                host.enter_graphics();
                host.leave_graphics();
            })
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(!other.is_finished());
        host.leave_graphics();
        other.join().unwrap();
    }

    #[test]
    fn first_frame_passes_through_then_blends_history() {
        let Some(host) = host() else { return };
        let (width, height) = (16u32, 8u32);
        let source = Arc::new(HeadlessSource::new(Arc::clone(&host)));
        let filter = DeinterlaceFilter::create(
            host.clone(),
            source.clone(),
            &ModuleResources::bundled(),
            &DeinterlaceSettings::default(),
        )
        .unwrap();

        let first = striped(width, height, 200, 40);
        source.push_frame(&first, width, height).unwrap();
        assert_eq!(filter.video_render(), RenderOutcome::Rendered);
        assert_eq!(source.read_output().unwrap(), first);

        // Default settings keep odd rows and rebuild even ones.
        let second = striped(width, height, 100, 40);
        source.push_frame(&second, width, height).unwrap();
        assert_eq!(filter.video_render(), RenderOutcome::Rendered);
        let output = source.read_output().unwrap();
        assert_eq!(row(&output, width, 3), row(&second, width, 3));

        // Even row: mix(spatial 40, previous 200) = 120.
        let rebuilt = row(&output, width, 2)[0] as i32;
        assert!((rebuilt - 120).abs() <= 1, "rebuilt row value {rebuilt}");

        // Source textures plus one history texture.
        assert_eq!(host.live_textures(), 3);
        drop(filter);
        assert_eq!(host.live_textures(), 2);
    }

    #[test]
    fn single_column_source_is_deinterlaced() {
        let Some(host) = host() else { return };
        let (width, height) = (1u32, 8u32);
        let source = Arc::new(HeadlessSource::new(Arc::clone(&host)));
        let filter = DeinterlaceFilter::create(
            host.clone(),
            source.clone(),
            &ModuleResources::bundled(),
            &DeinterlaceSettings::default(),
        )
        .unwrap();

        source.push_frame(&striped(width, height, 200, 40), width, height).unwrap();
        assert_eq!(filter.video_render(), RenderOutcome::Rendered);

        let second = striped(width, height, 100, 40);
        source.push_frame(&second, width, height).unwrap();
        assert_eq!(filter.video_render(), RenderOutcome::Rendered);
        let output = source.read_output().unwrap();

        assert_eq!(row(&output, width, 5), row(&second, width, 5));
        let rebuilt = row(&output, width, 2)[0] as i32;
        assert!((rebuilt - 120).abs() <= 1, "rebuilt row value {rebuilt}");
    }
}
