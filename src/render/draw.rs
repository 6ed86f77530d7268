//! Per-frame segment draw dispatch
//!
//! Segments describe a draw as a short sequence of bind/uniform/draw commands
//! against a [`DrawTarget`]. [`DrawRecorder`] captures them as [`DrawCall`]s,
//! which a GPU backend replays (see `WgpuBufferService::encode_draws`).

use crate::core::types::{Mat4, Result};
use crate::render::buffer::{BufferHandle, BufferService, GpuBuffer};
use crate::render::registry::GridRegistry;
use crate::segment::material::IDENTITY_TEX_BIAS;
use crate::segment::{LayerId, Segment, TextureHandle};

/// Vertex attribute slots a segment binds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexAttribute {
    Position,
    TextureCoord,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Triangles,
    Lines,
}

/// Uniform values segments set
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Uniform<'a> {
    TexBias([f32; 3]),
    Sampler(i32),
    TexBiasArray(&'a [f32]),
    SamplerArray(&'a [i32]),
    PmvMatrix(Mat4),
}

/// Owned copy of a [`Uniform`]
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    TexBias([f32; 3]),
    Sampler(i32),
    TexBiasArray(Vec<f32>),
    SamplerArray(Vec<i32>),
    PmvMatrix(Mat4),
}

impl From<Uniform<'_>> for UniformValue {
    fn from(uniform: Uniform<'_>) -> Self {
        match uniform {
            Uniform::TexBias(v) => UniformValue::TexBias(v),
            Uniform::Sampler(v) => UniformValue::Sampler(v),
            Uniform::TexBiasArray(v) => UniformValue::TexBiasArray(v.to_vec()),
            Uniform::SamplerArray(v) => UniformValue::SamplerArray(v.to_vec()),
            Uniform::PmvMatrix(m) => UniformValue::PmvMatrix(m),
        }
    }
}

/// Shader-side settings the dispatcher needs
#[derive(Clone, Copy, Debug)]
pub struct ShaderProgram {
    /// First texture unit used for overlay samplers
    pub texture_unit_base: u32,
    pub draw_mode: DrawMode,
}

impl Default for ShaderProgram {
    fn default() -> Self {
        Self {
            texture_unit_base: 0,
            draw_mode: DrawMode::Triangles,
        }
    }
}

/// Receiver of segment draw commands
pub trait DrawTarget {
    fn bind_attribute(&mut self, attribute: VertexAttribute, buffer: &GpuBuffer);
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);
    fn set_uniform(&mut self, uniform: Uniform<'_>);
    fn draw_elements(&mut self, mode: DrawMode, indices: &GpuBuffer);
}

/// Everything a segment touches while drawing
pub struct Frame<'a> {
    pub gpu: &'a mut dyn BufferService,
    pub registry: &'a mut GridRegistry,
    pub target: &'a mut dyn DrawTarget,
}

/// One captured indexed draw with the state bound before it
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub mode: DrawMode,
    pub positions: Option<BufferHandle>,
    pub texcoords: Option<BufferHandle>,
    pub indices: BufferHandle,
    pub index_count: u32,
    pub textures: Vec<(u32, TextureHandle)>,
    pub uniforms: Vec<UniformValue>,
}

/// [`DrawTarget`] that records calls for later replay or inspection
#[derive(Debug, Default)]
pub struct DrawRecorder {
    positions: Option<BufferHandle>,
    texcoords: Option<BufferHandle>,
    textures: Vec<(u32, TextureHandle)>,
    uniforms: Vec<UniformValue>,
    calls: Vec<DrawCall>,
}

impl DrawRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Take the recorded calls, leaving the recorder empty
    pub fn drain(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }
}

impl DrawTarget for DrawRecorder {
    fn bind_attribute(&mut self, attribute: VertexAttribute, buffer: &GpuBuffer) {
        match attribute {
            VertexAttribute::Position => self.positions = Some(buffer.handle),
            VertexAttribute::TextureCoord => self.texcoords = Some(buffer.handle),
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.textures.retain(|(u, _)| *u != unit);
        self.textures.push((unit, texture));
    }

    fn set_uniform(&mut self, uniform: Uniform<'_>) {
        self.uniforms.push(uniform.into());
    }

    fn draw_elements(&mut self, mode: DrawMode, indices: &GpuBuffer) {
        self.calls.push(DrawCall {
            mode,
            positions: self.positions.take(),
            texcoords: self.texcoords.take(),
            indices: indices.handle,
            index_count: indices.item_count,
            textures: std::mem::take(&mut self.textures),
            uniforms: std::mem::take(&mut self.uniforms),
        });
    }
}

/// Draw with the first visible layer as the only texture
///
/// Returns `false` when the segment has no buffers yet.
pub fn draw_single(
    frame: &mut Frame<'_>,
    shader: &ShaderProgram,
    segment: &mut Segment,
    visible_layers: &[LayerId],
) -> Result<bool> {
    if !segment.is_ready() {
        return Ok(false);
    }

    if let Some(material) = visible_layers.first().and_then(|&id| segment.material_by_layer(id)) {
        if let Some(texture) = material.texture {
            frame.target.bind_texture(0, texture);
        }
        frame.target.set_uniform(Uniform::TexBias(material.tex_bias));
        frame.target.set_uniform(Uniform::Sampler(0));
    }

    segment.draw(frame, shader)
}

/// Draw with one sampler per visible layer, up to the segment's overlay limit
///
/// Slot `i` always belongs to `visible_layers[i]`. A layer without a material
/// on this segment keeps its slot with the identity bias and no texture.
/// Slots past the last visible layer are reset.
pub fn draw_overlays(
    frame: &mut Frame<'_>,
    shader: &ShaderProgram,
    segment: &mut Segment,
    visible_layers: &[LayerId],
) -> Result<bool> {
    if !segment.is_ready() {
        return Ok(false);
    }

    let bound: Vec<([f32; 3], Option<TextureHandle>)> = visible_layers
        .iter()
        .take(segment.max_overlays())
        .map(|&id| match segment.material_by_layer(id) {
            Some(m) => (m.tex_bias, m.texture),
            None => (IDENTITY_TEX_BIAS, None),
        })
        .collect();

    let (tex_bias, samplers) = segment.overlay_arrays_mut();
    for (slot, sampler) in samplers.iter_mut().enumerate() {
        let bias = &mut tex_bias[slot * 3..slot * 3 + 3];
        match bound.get(slot) {
            Some((layer_bias, texture)) => {
                bias.copy_from_slice(layer_bias);
                *sampler = slot as i32;
                if let Some(texture) = texture {
                    frame.target.bind_texture(shader.texture_unit_base + slot as u32, *texture);
                }
            }
            None => {
                bias.fill(0.0);
                *sampler = 0;
            }
        }
    }
    frame.target.set_uniform(Uniform::TexBiasArray(tex_bias));
    frame.target.set_uniform(Uniform::SamplerArray(samplers));

    segment.draw(frame, shader)
}
