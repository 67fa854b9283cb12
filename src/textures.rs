//! Texture naming for brush faces.

use std::borrow::Cow;
use std::path::{Component, Path};

use bevy::prelude::*;
use chisel_geometry::BrushFaceData;

/// How a texture's display name is derived.
#[derive(Resource, Clone, Debug, Default, PartialEq, Eq)]
pub enum TextureNameStrategy {
    /// The name embedded in the texture file, as is.
    #[default]
    TextureName,
    /// The file path minus its first `prefix_length` components and its
    /// extension.
    PathSuffix { prefix_length: usize },
    /// Always this name.
    Static(String),
}

impl TextureNameStrategy {
    pub fn texture_name(&self, embedded_name: &str, path: &Path) -> String {
        match self {
            Self::TextureName => embedded_name.to_string(),
            Self::PathSuffix { prefix_length } => path_suffix_name(path, *prefix_length),
            Self::Static(name) => name.clone(),
        }
    }

    /// Display name of a face's texture, `None` for untextured faces.
    pub fn face_texture_name(&self, face: &BrushFaceData) -> Option<String> {
        let path = Path::new(face.texture_path.as_deref()?);
        let embedded = path.file_stem()?.to_string_lossy();
        Some(self.texture_name(&embedded, path))
    }

    /// Face texture name followed by its size, when the texture is loaded.
    /// Sizes the mip chain cannot hold are flagged.
    pub fn face_texture_label(&self, face: &BrushFaceData, size: Option<UVec2>) -> Option<String> {
        let name = self.face_texture_name(face)?;
        let Some(size) = size else {
            return Some(name);
        };
        if !check_texture_dimensions(size.x, size.y) {
            return Some(format!("{name} {}x{} (not a multiple of 16)", size.x, size.y));
        }
        let texels: usize = (0..MIP_LEVELS)
            .map(|level| mip_size(size.x, size.y, level))
            .sum();
        Some(format!("{name} {}x{}, {texels} texels", size.x, size.y))
    }
}

/// Mip levels stored per texture.
pub const MIP_LEVELS: u32 = 4;

fn path_suffix_name(path: &Path, prefix_length: usize) -> String {
    let components: Vec<Cow<'_, str>> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if components.len() <= prefix_length {
        return String::new();
    }

    let mut suffix = components[prefix_length..].join("/");
    if let Some(extension) = Path::new(&suffix).extension().and_then(|e| e.to_str()) {
        suffix.truncate(suffix.len() - extension.len() - 1);
    }
    suffix
}

/// Texture sizes must be non-zero multiples of 16.
pub fn check_texture_dimensions(width: u32, height: u32) -> bool {
    width > 0 && height > 0 && width % 16 == 0 && height % 16 == 0
}

/// Pixel count of mip `level`.
pub fn mip_size(width: u32, height: u32, level: u32) -> usize {
    let width = width.checked_shr(level).unwrap_or(0) as usize;
    let height = height.checked_shr(level).unwrap_or(0) as usize;
    width * height
}
