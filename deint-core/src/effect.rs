//! # Effect Reflection
//!
//! Parses and validates WGSL effects with naga and builds the parameter
//! table hosts resolve names against.
//!
//! Parameters come from two places in bind group 0:
//! - every `texture_2d<f32>` global, by variable name
//! - every member of the single `var<uniform>` struct, by member name
//!
//! Samplers are recorded by binding but are not named parameters; the host
//! supplies its own.

use naga::{
    AddressSpace, ImageClass, ImageDimension, Scalar, ScalarKind, ShaderStage, TypeInner,
    VectorSize,
};

use crate::graphics::GraphicsError;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Name of the texture a host binds to the pass input.
pub const IMAGE_PARAM: &str = "image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Int,
    Float,
    Vec2,
    Vec4,
}

impl UniformType {
    pub fn size(self) -> usize {
        match self {
            UniformType::Int | UniformType::Float => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec4 => 16,
        }
    }

    fn from_inner(inner: &TypeInner) -> Option<Self> {
        const F32: Scalar = Scalar {
            kind: ScalarKind::Float,
            width: 4,
        };
        const I32: Scalar = Scalar {
            kind: ScalarKind::Sint,
            width: 4,
        };

        match *inner {
            TypeInner::Scalar(scalar) if scalar == I32 => Some(UniformType::Int),
            TypeInner::Scalar(scalar) if scalar == F32 => Some(UniformType::Float),
            TypeInner::Vector {
                size: VectorSize::Bi,
                scalar,
            } if scalar == F32 => Some(UniformType::Vec2),
            TypeInner::Vector {
                size: VectorSize::Quad,
                scalar,
            } if scalar == F32 => Some(UniformType::Vec4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Texture { binding: u32 },
    Uniform { offset: u32, ty: UniformType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: String,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBlock {
    pub binding: u32,
    pub span: u32,
}

impl UniformBlock {
    /// Buffer size, rounded up to the 16-byte uniform alignment.
    pub fn buffer_size(&self) -> u32 {
        self.span.div_ceil(16).max(1) * 16
    }
}

#[derive(Debug, Clone, Default)]
pub struct EffectLayout {
    pub params: Vec<ParamInfo>,
    pub uniform: Option<UniformBlock>,
    pub samplers: Vec<u32>,
}

impl EffectLayout {
    /// Parse, validate and reflect a WGSL effect.
    pub fn parse(source: &str) -> Result<Self, GraphicsError> {
        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| GraphicsError::Shader(e.emit_to_string(source)))?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| GraphicsError::Shader(e.emit_to_string(source)))?;

        for (entry, stage) in [
            (VERTEX_ENTRY, ShaderStage::Vertex),
            (FRAGMENT_ENTRY, ShaderStage::Fragment),
        ] {
            if !module
                .entry_points
                .iter()
                .any(|ep| ep.name == entry && ep.stage == stage)
            {
                return Err(GraphicsError::Shader(format!("missing entry point '{entry}'")));
            }
        }

        Self::reflect(&module)
    }

    fn reflect(module: &naga::Module) -> Result<Self, GraphicsError> {
        let mut layout = EffectLayout::default();

        for (_, var) in module.global_variables.iter() {
            let Some(binding) = var.binding.as_ref() else {
                continue;
            };
            let name = var.name.clone().unwrap_or_default();
            if binding.group != 0 {
                return Err(GraphicsError::Shader(format!(
                    "'{name}' uses bind group {}, only group 0 is supported",
                    binding.group
                )));
            }

            match (var.space, &module.types[var.ty].inner) {
                (
                    AddressSpace::Handle,
                    TypeInner::Image {
                        dim: ImageDimension::D2,
                        arrayed: false,
                        class: ImageClass::Sampled { multi: false, .. },
                    },
                ) => layout.params.push(ParamInfo {
                    name,
                    kind: ParamKind::Texture {
                        binding: binding.binding,
                    },
                }),
                (AddressSpace::Handle, TypeInner::Sampler { comparison: false }) => {
                    layout.samplers.push(binding.binding)
                }
                (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                    if layout.uniform.is_some() {
                        return Err(GraphicsError::Shader(
                            "effects may declare only one uniform block".into(),
                        ));
                    }
                    layout.uniform = Some(UniformBlock {
                        binding: binding.binding,
                        span: *span,
                    });
                    for member in members {
                        let member_name = member.name.clone().unwrap_or_default();
                        let ty = UniformType::from_inner(&module.types[member.ty].inner)
                            .ok_or_else(|| {
                                GraphicsError::Shader(format!(
                                    "uniform '{member_name}' has an unsupported type"
                                ))
                            })?;
                        layout.params.push(ParamInfo {
                            name: member_name,
                            kind: ParamKind::Uniform {
                                offset: member.offset,
                                ty,
                            },
                        });
                    }
                }
                _ => {
                    return Err(GraphicsError::Shader(format!(
                        "binding '{name}' has an unsupported type"
                    )))
                }
            }
        }

        Ok(layout)
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn param(&self, index: usize) -> Option<&ParamInfo> {
        self.params.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{
        EFFECT_FILE, PARAM_DIMENSIONS, PARAM_FIELD_ORDER, PARAM_PIXEL_SIZE, PARAM_PREVIOUS_IMAGE,
    };
    use crate::resources::ModuleResources;

    fn bundled_source() -> String {
        let path = ModuleResources::bundled().module_file(EFFECT_FILE).unwrap();
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn bundled_effect_exposes_the_shader_contract() {
        let layout = EffectLayout::parse(&bundled_source()).unwrap();

        let kind = |name: &str| layout.param(layout.param_index(name).unwrap()).unwrap().kind;
        assert!(matches!(kind(IMAGE_PARAM), ParamKind::Texture { .. }));
        assert!(matches!(kind(PARAM_PREVIOUS_IMAGE), ParamKind::Texture { .. }));
        assert_eq!(
            kind(PARAM_FIELD_ORDER),
            ParamKind::Uniform {
                offset: 0,
                ty: UniformType::Int
            }
        );
        assert_eq!(
            kind(PARAM_PIXEL_SIZE),
            ParamKind::Uniform {
                offset: 8,
                ty: UniformType::Vec2
            }
        );
        assert_eq!(
            kind(PARAM_DIMENSIONS),
            ParamKind::Uniform {
                offset: 16,
                ty: UniformType::Vec2
            }
        );

        let block = layout.uniform.unwrap();
        assert_eq!(block.buffer_size(), 32);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = EffectLayout::parse("fn vs_main( {").unwrap_err();
        assert!(matches!(err, GraphicsError::Shader(_)));
    }

    #[test]
    fn missing_entry_point_is_rejected() {
        let source = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}
"#;
        match EffectLayout::parse(source) {
            Err(GraphicsError::Shader(msg)) => assert!(msg.contains(FRAGMENT_ENTRY)),
            other => panic!("expected shader error, got {other:?}"),
        }
    }

    #[test]
    fn other_bind_groups_are_rejected() {
        let source = r#"
@group(1) @binding(0) var tex: texture_2d<f32>;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    return textureLoad(tex, vec2<i32>(pos.xy), 0);
}
"#;
        assert!(EffectLayout::parse(source).is_err());
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        let layout = EffectLayout::parse(&bundled_source()).unwrap();
        assert!(layout.param_index("color_matrix").is_none());
    }
}
