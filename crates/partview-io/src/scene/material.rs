//! Material types for SceneRoot.

use glam::Vec4;
use partview_core::{Color, MaterialPreset};
use serde::{Deserialize, Serialize};

/// PBR material imported from a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Base color factor (RGBA).
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: Vec4::ONE,
            metallic: 0.0,
            roughness: 0.5,
            emissive: [0.0, 0.0, 0.0],
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Alpha blending mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// Blinn-Phong surface driven by a part's color and material preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhongMaterial {
    pub color: Color,
    pub shininess: f32,
    pub specular: Color,
    pub opacity: f32,
    pub transparent: bool,
    /// Set when fields were mutated in place and the GPU state is stale.
    #[serde(skip)]
    pub needs_update: bool,
}

impl PhongMaterial {
    pub fn from_preset(color: Color, preset: MaterialPreset) -> Self {
        let params = preset.params();
        Self {
            color,
            shininess: params.shininess,
            specular: params.specular,
            opacity: params.opacity,
            transparent: params.transparent,
            needs_update: false,
        }
    }

    /// Overwrite color and preset parameters in place and flag the material
    /// for a render-state refresh.
    pub fn apply_preset(&mut self, color: Color, preset: MaterialPreset) {
        let params = preset.params();
        self.color = color;
        self.shininess = params.shininess;
        self.specular = params.specular;
        self.opacity = params.opacity;
        self.transparent = params.transparent;
        self.needs_update = true;
    }

    /// Equal visual parameters, ignoring the refresh flag.
    pub fn same_appearance(&self, other: &PhongMaterial) -> bool {
        self.color == other.color
            && self.shininess == other.shininess
            && self.specular == other.specular
            && self.opacity == other.opacity
            && self.transparent == other.transparent
    }
}

/// The surface a mesh node is drawn with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Surface {
    /// Renderer default material.
    #[default]
    Default,
    /// Index into [`SceneRoot::materials`](crate::SceneRoot::materials).
    Imported(usize),
    /// Part-driven Phong surface.
    Phong(PhongMaterial),
}

impl Surface {
    pub fn as_phong(&self) -> Option<&PhongMaterial> {
        match self {
            Surface::Phong(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_phong_mut(&mut self) -> Option<&mut PhongMaterial> {
        match self {
            Surface::Phong(m) => Some(m),
            _ => None,
        }
    }
}
