//! Overlay materials

/// Id of an overlay layer, assigned by the layer stack
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

/// Opaque texture handle from the texture pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
}

impl Layer {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: LayerId(id),
            name: name.into(),
        }
    }
}

/// Offset x, offset y, scale; identity samples the whole texture
pub const IDENTITY_TEX_BIAS: [f32; 3] = [0.0, 0.0, 1.0];

/// One layer's texture on one segment
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub layer: Layer,
    pub texture: Option<TextureHandle>,
    /// Sub-rectangle of `texture` covering this segment (parent textures are reused)
    pub tex_bias: [f32; 3],
}

impl Material {
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            texture: None,
            tex_bias: IDENTITY_TEX_BIAS,
        }
    }

    pub fn with_texture(mut self, texture: TextureHandle, tex_bias: [f32; 3]) -> Self {
        self.texture = Some(texture);
        self.tex_bias = tex_bias;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.texture.is_some()
    }

    /// Drop the texture reference
    pub fn clear(&mut self) {
        self.texture = None;
        self.tex_bias = IDENTITY_TEX_BIAS;
    }
}
