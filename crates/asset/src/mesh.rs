//! CPU-side mesh representation used by loaders.

use std::hash::{Hash, Hasher};

use bytemuck::{Pod, Zeroable};

use crate::error::{AssetError, AssetResult};
use crate::texture::Texture;

/// Vertex with uv/normal/position plus tangent frame. Values are in object space.
///
/// Field order is the GPU layout: 14 tightly packed `f32`s.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    pub tex_coord: [f32; 2],
    pub normal: [f32; 3],
    pub position: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex {
    /// Vertex with a zeroed tangent frame.
    pub fn new(position: [f32; 3], tex_coord: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            tex_coord,
            normal,
            position,
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
        }
    }

    fn key_bits(&self) -> [u32; 14] {
        let mut bits = [0u32; 14];
        let fields = self
            .tex_coord
            .iter()
            .chain(&self.normal)
            .chain(&self.position)
            .chain(&self.tangent)
            .chain(&self.bitangent);
        for (slot, value) in bits.iter_mut().zip(fields) {
            *slot = canonical_bits(*value);
        }
        bits
    }
}

/// `-0.0` and `0.0` share one key; NaN compares by bit pattern.
#[inline]
fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 { 0 } else { value.to_bits() }
}

// Structural identity over all five fields, consistent with `Hash`.
impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.key_bits() == other.key_bits()
    }
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_bits().hash(state);
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Triangle {
    pub indices: [u32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Quad {
    pub indices: [u32; 4],
}

impl Quad {
    /// Split into two triangles sharing the 0-2 diagonal.
    pub fn triangulate(&self) -> [Triangle; 2] {
        let [a, b, c, d] = self.indices;
        [
            Triangle { indices: [a, b, c] },
            Triangle { indices: [a, c, d] },
        ]
    }
}

/// Deduplicated geometry produced by the OBJ parser.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub quads: Vec<Quad>,
}

impl Geometry {
    /// Every face index must address an existing vertex.
    pub fn validate(&self) -> AssetResult<()> {
        let len = self.vertices.len();
        let tri = self.triangles.iter().flat_map(|t| t.indices);
        let quad = self.quads.iter().flat_map(|q| q.indices);
        match tri.chain(quad).find(|&i| i as usize >= len) {
            Some(bad) => Err(AssetError::InvalidMesh(format!(
                "face index {bad} out of range for {len} vertices"
            ))),
            None => Ok(()),
        }
    }

    /// Triangle list for indexed draws: triangles first, then split quads.
    pub fn triangle_indices(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.triangles.len() * 3 + self.quads.len() * 6);
        out.extend(self.triangles.iter().flat_map(|t| t.indices));
        out.extend(
            self.quads
                .iter()
                .flat_map(|q| q.triangulate())
                .flat_map(|t| t.indices),
        );
        out
    }
}

/// A loaded mesh: geometry plus the textures discovered for it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub geometry: Geometry,
    pub textures: Vec<Texture>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, geometry: Geometry, textures: Vec<Texture>) -> Self {
        Self {
            name: name.into(),
            geometry,
            textures,
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.geometry.vertices
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.geometry.triangles
    }

    #[inline]
    pub fn quads(&self) -> &[Quad] {
        &self.geometry.quads
    }

    /// Returns `true` if there is at least one vertex and one face.
    pub fn is_valid(&self) -> bool {
        !self.geometry.vertices.is_empty()
            && (!self.geometry.triangles.is_empty() || !self.geometry.quads.is_empty())
    }
}
